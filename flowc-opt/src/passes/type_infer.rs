//! Drives the registered typers over the scheduled operations.

use crate::passes::Named;
use crate::transform::Transformations;
use flowc_ir::Flow;

/// Fills in missing output types and shapes. Assumes the operations are
/// already in topological order, so every input is resolved before its
/// consumer is visited.
pub struct InferTypes;

impl Named for InferTypes {
    fn name() -> &'static str {
        "infer-types"
    }

    fn description() -> &'static str {
        "resolve missing output types and shapes with the registered \
         typers"
    }
}

impl InferTypes {
    /// Returns true iff no operation was skipped or left unresolved.
    pub fn run(flow: &Flow, tx: &Transformations) -> bool {
        let mut num_unresolved = 0;
        let mut num_skipped = 0;
        for op in flow.ops.iter() {
            // Inference needs fully typed and shaped inputs.
            let mut missing = false;
            for input in &op.borrow().inputs {
                let v = input.borrow();
                if !v.dtype.valid() {
                    log::warn!(
                        "skipping type inference for {} because input {} \
                         is missing type",
                        op.borrow().name,
                        v.name
                    );
                    missing = true;
                }
                if v.shape.is_undefined() {
                    log::warn!(
                        "skipping type inference for {} because input {} \
                         is missing shape",
                        op.borrow().name,
                        v.name
                    );
                    missing = true;
                }
            }
            if missing {
                num_skipped += 1;
                continue;
            }

            // Nothing to do when the outputs are already resolved.
            let needs_inference =
                op.borrow().outputs.iter().any(|o| {
                    let v = o.borrow();
                    !v.dtype.valid() || v.shape.is_undefined()
                });
            if !needs_inference {
                continue;
            }

            for typer in tx.typers() {
                if typer.infer_types(op) {
                    break;
                }
            }

            let mut resolved = true;
            for output in &op.borrow().outputs {
                let v = output.borrow();
                if !v.dtype.valid() {
                    log::warn!("variable {} is missing type", v.name);
                    resolved = false;
                }
                if v.shape.is_undefined() {
                    log::warn!("variable {} is missing shape", v.name);
                    resolved = false;
                }
            }
            if !resolved {
                num_unresolved += 1;
            }
        }

        if num_unresolved > 0 || num_skipped > 0 {
            log::warn!(
                "{} ops with unresolved types, {} skipped",
                num_unresolved + num_skipped,
                num_skipped
            );
            return false;
        }
        true
    }
}
