//! Command-line front-end for the flow graph compiler.
pub mod cmdline;
pub mod driver;
