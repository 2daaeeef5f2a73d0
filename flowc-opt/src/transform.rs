//! Plug-in interfaces for graph rewriting and type inference, and the
//! registry bundling them for one analysis run.

use flowc_ir::{Flow, Operation, RRC};
use flowc_utils::Id;

/// A graph rewriter. May add, delete, retype, or rewire entities but must
/// leave the graph consistent. Transformers run once per rewrite round;
/// returning true re-triggers the round.
pub trait Transformer {
    /// Apply the transformation. Returns true iff the graph changed.
    fn transform(&mut self, flow: &mut Flow) -> bool;
}

/// Fills in output types and shapes for operation types it recognizes.
/// A typer is only invoked on operations whose inputs are fully typed.
pub trait Typer {
    /// Returns true iff this typer handled the operation.
    fn infer_types(&self, op: &RRC<Operation>) -> bool;
}

/// A pairwise fusion rule: an operation of type `first` feeding exactly
/// one operation of type `second` on the same task becomes one operation
/// of type `combined`.
#[derive(Clone, Debug)]
pub struct Combination {
    pub first: Id,
    pub second: Id,
    pub combined: Id,
}

/// The transformations applied during one analysis run.
#[derive(Default)]
pub struct Transformations {
    noops: Vec<Id>,
    combinations: Vec<Combination>,
    transformers: Vec<Box<dyn Transformer>>,
    typers: Vec<Box<dyn Typer>>,
}

impl Transformations {
    /// Declare an operation type to be a pass-through subject to
    /// elimination.
    pub fn add_noop<S: Into<Id>>(&mut self, kind: S) {
        self.noops.push(kind.into());
    }

    /// Declare a pairwise fusion rule.
    pub fn add_combination<S: Into<Id>>(
        &mut self,
        first: S,
        second: S,
        combined: S,
    ) {
        self.combinations.push(Combination {
            first: first.into(),
            second: second.into(),
            combined: combined.into(),
        });
    }

    /// Register a graph transformer. Transformers run in registration
    /// order.
    pub fn add_transformer(&mut self, t: Box<dyn Transformer>) {
        self.transformers.push(t);
    }

    /// Register a typer. Typers are consulted in registration order.
    pub fn add_typer(&mut self, t: Box<dyn Typer>) {
        self.typers.push(t);
    }

    pub fn noops(&self) -> &[Id] {
        &self.noops
    }

    pub fn combinations(&self) -> &[Combination] {
        &self.combinations
    }

    pub fn transformers_mut(
        &mut self,
    ) -> &mut Vec<Box<dyn Transformer>> {
        &mut self.transformers
    }

    pub fn typers(&self) -> &[Box<dyn Typer>] {
        &self.typers
    }
}
