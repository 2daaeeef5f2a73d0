//! Shared utilities for the flow graph compiler.
mod errors;
mod id;

pub use errors::{Error, FlowResult};
pub use id::{GSym, GetName, Id};
