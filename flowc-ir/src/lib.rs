//! In-memory representation for neural-network flow graphs.
//!
//! A flow is a dataflow graph of tensor [`Variable`]s connected by
//! [`Operation`]s, optionally grouped into [`Function`]s and
//! [`Connector`]s. The representation uses shared pointers for forward
//! edges and weak pointers for back-edges so the cyclic graph is released
//! when the owning [`Flow`] is dropped.

mod attribute;
mod common;
mod flow;
mod printer;
mod shape;
mod structure;
mod types;
mod verify;

/// Module to build a flow from the binary file format.
pub mod from_bytes;

pub use attribute::{Attribute, Attributes};
pub use common::{rrc, RRC, WRC};
pub use flow::{Flow, IdList};
pub use flowc_utils::{GetName, Id};
pub use from_bytes::{load_file, parse_bytes};
pub use printer::Printer;
pub use shape::Shape;
pub use structure::{Connector, Function, Operation, Variable};
pub use types::{Type, TypeTraits};
