//! Tests for boundary inference, type inference, and the full pipeline.

use flowc_ir::{Flow, Operation, RRC, Shape, Type};
use flowc_opt::passes::InferBoundaries;
use flowc_opt::{Transformations, Typer};
use std::rc::Rc;

#[test]
fn boundary_defaults() {
    let mut flow = Flow::new();
    // No producer at all.
    let x = flow.add_variable("x", Type::Float32, Shape::new(&[2]));
    // Produced by an op without inputs.
    let k = flow.add_variable("k", Type::Float32, Shape::new(&[2]));
    let konst = flow.add_operation("konst", "Const");
    Operation::add_output(&konst, &k);
    // Intermediate and sink.
    let y = flow.add_variable("y", Type::Float32, Shape::new(&[2]));
    let z = flow.add_variable("z", Type::Float32, Shape::new(&[2]));
    let sq = flow.add_operation("sq", "Square");
    Operation::add_input(&sq, &x);
    Operation::add_output(&sq, &y);
    let neg = flow.add_operation("neg", "Neg");
    Operation::add_input(&neg, &y);
    Operation::add_input(&neg, &k);
    Operation::add_output(&neg, &z);

    InferBoundaries::run(&mut flow);

    assert!(x.borrow().is_input);
    assert!(k.borrow().is_input);
    assert!(!y.borrow().is_input && !y.borrow().is_output);
    assert!(z.borrow().is_output);
    assert!(!x.borrow().is_output);
}

#[test]
fn boundary_attributes_win_over_defaults() {
    let mut flow = Flow::new();
    let x = flow.add_variable("x", Type::Float32, Shape::new(&[2]));
    let v = flow.add_variable("v", Type::Float32, Shape::new(&[2]));
    let w = flow.add_variable("w", Type::Float32, Shape::new(&[2]));

    // Producer has inputs, but declares its output a graph input.
    let feed = flow.add_operation("feed", "Feed");
    feed.borrow_mut().attributes.set("input", "true");
    Operation::add_input(&feed, &x);
    Operation::add_output(&feed, &v);

    // Explicit `output = 0` suppresses the no-consumers default.
    let keep = flow.add_operation("keep", "Keep");
    keep.borrow_mut().attributes.set("output", "0");
    Operation::add_input(&keep, &v);
    Operation::add_output(&keep, &w);

    InferBoundaries::run(&mut flow);

    assert!(v.borrow().is_input);
    assert!(!w.borrow().is_output);
}

/// Propagates the input type and shape to all outputs of `Square` ops.
struct SquareTyper;

impl Typer for SquareTyper {
    fn infer_types(&self, op: &RRC<flowc_ir::Operation>) -> bool {
        if op.borrow().kind != "Square" {
            return false;
        }
        let (dtype, shape) = {
            let o = op.borrow();
            let v = o.inputs[0].borrow();
            (v.dtype, v.shape.clone())
        };
        for output in &op.borrow().outputs {
            let mut v = output.borrow_mut();
            v.dtype = dtype;
            v.shape = shape.clone();
        }
        true
    }
}

#[test]
fn analyze_runs_the_whole_pipeline() {
    // a -> Identity -> b -> Square -> c, with c untyped until inference.
    let mut flow = Flow::new();
    let a = flow.add_variable("a", Type::Float32, Shape::new(&[4]));
    let b = flow.add_variable("b", Type::Float32, Shape::new(&[4]));
    let c = flow.add_variable("c", Type::Invalid, Shape::undefined());
    let id = flow.add_operation("id", "Identity");
    Operation::add_input(&id, &a);
    Operation::add_output(&id, &b);
    let sq = flow.add_operation("sq", "Square");
    Operation::add_input(&sq, &b);
    Operation::add_output(&sq, &c);

    let mut tx = Transformations::default();
    tx.add_noop("Identity");
    tx.add_typer(Box::new(SquareTyper));

    let typed = flowc_opt::analyze(&mut flow, &mut tx).unwrap();
    assert!(typed);

    // The identity op is gone and the graph is fully typed.
    assert_eq!(flow.ops.len(), 1);
    assert!(Rc::ptr_eq(&sq.borrow().inputs[0], &a));
    assert_eq!(c.borrow().dtype, Type::Float32);
    assert_eq!(c.borrow().shape, Shape::new(&[4]));

    // Boundary flags: a feeds the graph, c leaves it.
    assert!(a.borrow().is_input);
    assert!(c.borrow().is_output);

    assert!(flow.is_consistent());
}

#[test]
fn inference_skips_untyped_inputs() {
    let mut flow = Flow::new();
    let x = flow.add_variable("x", Type::Invalid, Shape::undefined());
    let y = flow.add_variable("y", Type::Invalid, Shape::undefined());
    let sq = flow.add_operation("sq", "Square");
    Operation::add_input(&sq, &x);
    Operation::add_output(&sq, &y);

    let mut tx = Transformations::default();
    tx.add_typer(Box::new(SquareTyper));

    // The op is skipped, so analysis reports the graph partially typed.
    let typed = flowc_opt::analyze(&mut flow, &mut tx).unwrap();
    assert!(!typed);
    assert_eq!(y.borrow().dtype, Type::Invalid);
}

#[test]
fn inference_reports_unrecognized_ops() {
    let mut flow = Flow::new();
    let x = flow.add_variable("x", Type::Float32, Shape::new(&[2]));
    let y = flow.add_variable("y", Type::Invalid, Shape::undefined());
    let op = flow.add_operation("op", "Mystery");
    Operation::add_input(&op, &x);
    Operation::add_output(&op, &y);

    let mut tx = Transformations::default();
    tx.add_typer(Box::new(SquareTyper));

    let typed = flowc_opt::analyze(&mut flow, &mut tx).unwrap();
    assert!(!typed);
}
