//! Pattern-based rewriting: no-op elimination and pairwise fusion,
//! driven to a fixed point together with the user transformers.

use crate::passes::Named;
use crate::transform::{Combination, Transformations};
use flowc_ir::{Flow, Operation, RRC};
use itertools::Itertools;
use std::rc::Rc;

/// Rewrites the graph until a full round applies no change.
pub struct Rewrite;

impl Named for Rewrite {
    fn name() -> &'static str {
        "rewrite"
    }

    fn description() -> &'static str {
        "eliminate no-ops and fuse operation pairs until fixed point"
    }
}

impl Rewrite {
    pub fn run(flow: &mut Flow, tx: &mut Transformations) {
        let mut again = true;
        while again {
            again = false;

            // Collect the declared no-ops up front; elimination mutates
            // the operation list.
            let mut noops = Vec::new();
            for kind in tx.noops() {
                noops.extend(
                    flow.ops
                        .iter()
                        .filter(|op| op.borrow().kind == *kind)
                        .cloned(),
                );
            }
            for op in noops {
                Self::eliminate(flow, &op);
                again = true;
            }

            for c in tx.combinations().to_vec() {
                if Self::combine(flow, &c) {
                    again = true;
                }
            }

            for t in tx.transformers_mut() {
                if t.transform(flow) {
                    again = true;
                }
            }
        }
    }

    /// Remove a pass-through operation, splicing its input in place of
    /// its output everywhere. An operation with no inputs is simply
    /// deleted, leaving its outputs without a producer.
    fn eliminate(flow: &mut Flow, op: &RRC<Operation>) {
        if op.borrow().inputs.is_empty() {
            for output in op.borrow().outputs.iter() {
                output.borrow_mut().producer = None;
            }
            flow.delete_operation(op);
            return;
        }

        assert_eq!(
            op.borrow().inputs.len(),
            1,
            "eliminated operation `{}' must have exactly one input",
            op.borrow().name
        );
        assert_eq!(
            op.borrow().outputs.len(),
            1,
            "eliminated operation `{}' must have exactly one output",
            op.borrow().name
        );
        let input = Rc::clone(&op.borrow().inputs[0]);
        let output = Rc::clone(&op.borrow().outputs[0]);

        // The two variables must agree where both sides are known.
        {
            let i = input.borrow();
            let o = output.borrow();
            if i.dtype.valid() && o.dtype.valid() {
                assert_eq!(
                    i.dtype, o.dtype,
                    "type mismatch when eliminating `{}'",
                    op.borrow().name
                );
            }
            if !i.shape.is_undefined() && !o.shape.is_undefined() {
                assert_eq!(
                    i.shape, o.shape,
                    "shape mismatch when eliminating `{}'",
                    op.borrow().name
                );
            }
        }

        // The surviving variable takes over the boundary flags.
        {
            let o = output.borrow();
            let mut i = input.borrow_mut();
            if o.is_input {
                i.is_input = true;
            }
            if o.is_output {
                i.is_output = true;
            }
        }

        // Rewire every use of the output to the input.
        for target in flow.ops.iter() {
            let mut t = target.borrow_mut();
            for slot in t.inputs.iter_mut() {
                if Rc::ptr_eq(slot, &output) {
                    *slot = Rc::clone(&input);
                }
            }
        }

        // The eliminated op stops consuming the input, and the input
        // inherits the output's consumers.
        {
            let mut i = input.borrow_mut();
            let pos = i
                .consumers
                .iter()
                .position(|c| c.points_to(op))
                .expect("eliminated operation must consume its input");
            i.consumers.remove(pos);
            let inherited = output.borrow().consumers.clone();
            i.consumers.extend(inherited);
        }

        // The input answers to the output's names from now on.
        {
            let mut i = input.borrow_mut();
            let o = output.borrow();
            i.add_alias(o.name);
            for alias in &o.aliases {
                i.add_alias(*alias);
            }
        }

        for cnx in flow.connectors.iter() {
            cnx.borrow_mut().replace_link(&output, &input);
        }

        flow.delete_variable(&output);
        flow.delete_operation(op);
    }

    /// Fuse every occurrence of `first` feeding exactly one `second` on
    /// the same task into a single `combined` operation.
    fn combine(flow: &mut Flow, c: &Combination) -> bool {
        let mut again = false;
        let candidates = flow.ops.iter().cloned().collect_vec();
        for op in candidates {
            // A fusion earlier in this round may have deleted the op.
            let alive = flow
                .op(op.borrow().name)
                .map_or(false, |o| Rc::ptr_eq(&o, &op));
            if !alive {
                continue;
            }
            if op.borrow().kind != c.first {
                continue;
            }
            if op.borrow().outputs.len() != 1 {
                continue;
            }
            let var = Rc::clone(&op.borrow().outputs[0]);
            let consumer = {
                let v = var.borrow();
                if v.consumers.len() != 1 {
                    continue;
                }
                v.consumers[0].upgrade()
            };
            if consumer.borrow().kind != c.second {
                continue;
            }
            if consumer.borrow().task != op.borrow().task {
                continue;
            }

            flow.fuse(&op, &consumer, c.combined, true);
            again = true;
        }
        again
    }
}
