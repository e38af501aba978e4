//! Lists the operations a pipeline file may use.

use crate::pipeline::OPS;
use anyhow::Result;

pub fn run(verbose: bool) -> Result<()> {
    for (name, keys) in OPS {
        if verbose {
            println!("{name:<10} {}", keys.join(", "));
        } else {
            println!("{name}");
        }
    }
    Ok(())
}
