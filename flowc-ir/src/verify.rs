//! Audits the cross-entity back-pointers of a flow.

use crate::{Flow, Operation, Variable, RRC};
use std::rc::Rc;

impl Flow {
    /// Verify that every back-reference and containment relation holds:
    /// input/consumer and output/producer edges agree in both directions,
    /// function members point back at their function, and every entity
    /// reachable through a pointer is owned by this flow. Logs the first
    /// offender and returns false; true when the graph is consistent.
    pub fn is_consistent(&self) -> bool {
        for op in self.ops.iter() {
            let o = op.borrow();
            for input in &o.inputs {
                if !self.contains_var(input) {
                    log::warn!(
                        "input `{}' to `{}' is not in the flow",
                        input.borrow().name,
                        o.name
                    );
                    return false;
                }
                // Input multiplicity must match consumer multiplicity.
                let uses = o
                    .inputs
                    .iter()
                    .filter(|i| Rc::ptr_eq(i, input))
                    .count();
                let edges = input
                    .borrow()
                    .consumers
                    .iter()
                    .filter(|c| c.points_to(op))
                    .count();
                if uses != edges {
                    log::warn!(
                        "operation `{}' is consumer of `{}' {} times but \
                         has it as input {} times",
                        o.name,
                        input.borrow().name,
                        edges,
                        uses
                    );
                    return false;
                }
            }
            for output in &o.outputs {
                if !self.contains_var(output) {
                    log::warn!(
                        "output `{}' from `{}' is not in the flow",
                        output.borrow().name,
                        o.name
                    );
                    return false;
                }
                let is_producer = matches!(
                    &output.borrow().producer,
                    Some(p) if p.points_to(op)
                );
                if !is_producer {
                    log::warn!(
                        "operation `{}' is not the producer of `{}'",
                        o.name,
                        output.borrow().name
                    );
                    return false;
                }
            }
        }

        for var in self.vars.iter() {
            let v = var.borrow();
            if let Some(p) = &v.producer {
                let producer = p.upgrade();
                if !self.contains_op(&producer) {
                    log::warn!(
                        "producer of `{}' is not in the flow",
                        v.name
                    );
                    return false;
                }
                if !producer.borrow().is_output(var) {
                    log::warn!(
                        "variable `{}' is not an output of its producer \
                         `{}'",
                        v.name,
                        producer.borrow().name
                    );
                    return false;
                }
            }
            for c in &v.consumers {
                let consumer = c.upgrade();
                if !self.contains_op(&consumer) {
                    log::warn!(
                        "consumer of `{}' is not in the flow",
                        v.name
                    );
                    return false;
                }
                if !consumer.borrow().is_input(var) {
                    log::warn!(
                        "variable `{}' is not an input of its consumer \
                         `{}'",
                        v.name,
                        consumer.borrow().name
                    );
                    return false;
                }
            }
        }

        for func in self.funcs.iter() {
            for op in &func.borrow().ops {
                if !self.contains_op(op) {
                    log::warn!(
                        "operation `{}' is not in the flow",
                        op.borrow().name
                    );
                    return false;
                }
                let belongs = matches!(
                    &op.borrow().func,
                    Some(f) if f.points_to(func)
                );
                if !belongs {
                    log::warn!(
                        "operation `{}' does not belong to function `{}'",
                        op.borrow().name,
                        func.borrow().name
                    );
                    return false;
                }
            }
        }

        for cnx in self.connectors.iter() {
            for link in &cnx.borrow().links {
                if !self.contains_var(link) {
                    log::warn!(
                        "link `{}' of connector `{}' is not in the flow",
                        link.borrow().name,
                        cnx.borrow().name
                    );
                    return false;
                }
            }
        }

        true
    }

    fn contains_var(&self, var: &RRC<Variable>) -> bool {
        self.vars
            .find(var.borrow().name)
            .map_or(false, |v| Rc::ptr_eq(&v, var))
    }

    fn contains_op(&self, op: &RRC<Operation>) -> bool {
        self.ops
            .find(op.borrow().name)
            .map_or(false, |o| Rc::ptr_eq(&o, op))
    }
}
