//! Analysis pipeline for flow graphs: boundary classification, rewriting
//! to a fixed point, parallelism-aware scheduling, and type inference.

pub mod analysis;
pub mod passes;
mod transform;

pub use transform::{Combination, Transformations, Transformer, Typer};

use flowc_ir::Flow;
use flowc_utils::FlowResult;
use passes::{InferBoundaries, InferTypes, Named, Rewrite, Schedule};
use std::time::Instant;

/// Run the full analysis pipeline over `flow`. Returns whether type
/// inference fully resolved the graph; unresolved types are reported as
/// warnings, not errors.
pub fn analyze(
    flow: &mut Flow,
    tx: &mut Transformations,
) -> FlowResult<bool> {
    let start = Instant::now();
    InferBoundaries::run(flow);
    log::info!(
        "{}: {}ms",
        InferBoundaries::name(),
        start.elapsed().as_millis()
    );

    let start = Instant::now();
    Rewrite::run(flow, tx);
    log::info!("{}: {}ms", Rewrite::name(), start.elapsed().as_millis());

    let start = Instant::now();
    Schedule::run(flow)?;
    log::info!("{}: {}ms", Schedule::name(), start.elapsed().as_millis());

    let start = Instant::now();
    let typed = InferTypes::run(flow, tx);
    log::info!(
        "{}: {}ms",
        InferTypes::name(),
        start.elapsed().as_millis()
    );

    Ok(typed)
}
