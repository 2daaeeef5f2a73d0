//! The analysis passes, in pipeline order.

mod boundary;
mod rewrite;
mod schedule;
mod type_infer;

pub use boundary::InferBoundaries;
pub use rewrite::Rewrite;
pub use schedule::Schedule;
pub use type_infer::InferTypes;

/// Name and description of a pass, used for logging and help text.
pub trait Named {
    fn name() -> &'static str;
    fn description() -> &'static str;
}
