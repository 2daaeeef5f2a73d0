//! Classifies variables as graph inputs and outputs.

use crate::passes::Named;
use flowc_ir::Flow;

/// Marks the boundary variables of the graph. An explicit `input` or
/// `output` attribute on the producing operation wins; otherwise a
/// variable with no producer (or whose producer has no inputs) is an
/// input, and a variable with no consumers is an output.
pub struct InferBoundaries;

impl Named for InferBoundaries {
    fn name() -> &'static str {
        "infer-boundaries"
    }

    fn description() -> &'static str {
        "classify variables as graph inputs and outputs"
    }
}

impl InferBoundaries {
    pub fn run(flow: &mut Flow) {
        for var in flow.vars.iter() {
            let mut input_set = false;
            let mut output_set = false;

            let producer =
                var.borrow().producer.as_ref().map(|p| p.upgrade());
            if let Some(producer) = &producer {
                let producer = producer.borrow();
                if let Some(value) = producer.attributes.get("input") {
                    if value == "1" || value == "true" {
                        var.borrow_mut().is_input = true;
                    }
                    input_set = true;
                }
                if let Some(value) = producer.attributes.get("output") {
                    if value == "1" || value == "true" {
                        var.borrow_mut().is_output = true;
                    }
                    output_set = true;
                }
            }

            if !input_set {
                let no_producer_inputs = producer
                    .as_ref()
                    .map_or(true, |p| p.borrow().inputs.is_empty());
                if no_producer_inputs {
                    var.borrow_mut().is_input = true;
                }
            }

            if !output_set && var.borrow().consumers.is_empty() {
                var.borrow_mut().is_output = true;
            }
        }
    }
}
