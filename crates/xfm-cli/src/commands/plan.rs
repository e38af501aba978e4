//! Plan command: shape prediction and pass grouping for a pipeline file.

use crate::PlanArgs;
use crate::pipeline::Pipeline;
use anyhow::{Context, Result};
use std::fmt::Display;
use xfm_ops::Transform;

fn opt<T: Display>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

pub fn run(args: PlanArgs, verbose: bool) -> Result<()> {
    let mut pipeline = Pipeline::from_file(&args.input)?;
    if let Some(seed) = args.seed {
        pipeline.seed = seed;
    }
    let ops = pipeline.build()?;

    println!("input       {}", pipeline.input.input_shape);
    if verbose {
        println!("  dtype {}, spacing {:?}", pipeline.input.dtype, pipeline.input.spacing);
    }
    for (i, op) in ops.iter().enumerate() {
        let kind = if op.is_matrix() { "matrix" } else { "grid" };
        println!("{i:>3} {:<8} {}  [{kind}]", op.name(), op.shape_override());
    }

    let stages = xfm_ops::plan(&ops).context("Failed to group operations")?;
    println!();
    println!("{} operation(s), {} resampling pass(es)", ops.len(), stages.len());

    for (i, stage) in stages.iter().enumerate() {
        println!("pass {i}: {} -> {}", stage.ops.join(" + "), stage.params.output_shape);
        if verbose {
            let p = &stage.params;
            println!(
                "  mode {}, padding {}, dtype {}, align_corners {}",
                opt(p.mode),
                opt(p.padding_mode),
                opt(p.dtype),
                p.align_corners
            );
        }
        match &stage.transform {
            Transform::Matrix(m) if args.matrices => print!("{m:.4}"),
            Transform::Matrix(_) => {}
            Transform::Field(f) => println!("  grid {:?}, {} components", f.spatial(), f.components()),
        }
    }

    Ok(())
}
