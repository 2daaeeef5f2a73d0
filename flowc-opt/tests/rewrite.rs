//! Tests for no-op elimination and pairwise fusion.

use flowc_ir::{Flow, Operation, Shape, Type};
use flowc_opt::passes::Rewrite;
use flowc_opt::{Transformations, Transformer};
use std::rc::Rc;

#[test]
fn identity_elimination_splices_the_input() {
    // a -> Identity -> b -> Square -> c
    let mut flow = Flow::new();
    let a = flow.add_variable("a", Type::Float32, Shape::new(&[4]));
    let b = flow.add_variable("b", Type::Float32, Shape::new(&[4]));
    let c = flow.add_variable("c", Type::Float32, Shape::new(&[4]));
    b.borrow_mut().is_output = true;
    let id = flow.add_operation("id", "Identity");
    Operation::add_input(&id, &a);
    Operation::add_output(&id, &b);
    let sq = flow.add_operation("sq", "Square");
    Operation::add_input(&sq, &b);
    Operation::add_output(&sq, &c);

    let mut tx = Transformations::default();
    tx.add_noop("Identity");
    Rewrite::run(&mut flow, &mut tx);

    assert_eq!(flow.ops.len(), 1);
    assert!(flow.op("id").is_none());
    assert!(Rc::ptr_eq(&sq.borrow().inputs[0], &a));
    assert!(c.borrow().producer.as_ref().unwrap().points_to(&sq));

    // The survivor answers to the eliminated variable's name and keeps
    // its boundary flags.
    assert!(a.borrow().aliases.contains(&"b".into()));
    assert!(Rc::ptr_eq(&flow.var("b").unwrap(), &a));
    assert!(a.borrow().is_output);

    // Types and shapes of the surviving variables are untouched.
    assert_eq!(a.borrow().dtype, Type::Float32);
    assert_eq!(a.borrow().shape, Shape::new(&[4]));

    assert!(flow.is_consistent());
}

#[test]
fn identity_elimination_updates_connectors() {
    let mut flow = Flow::new();
    let a = flow.add_variable("a", Type::Float32, Shape::new(&[2]));
    let b = flow.add_variable("b", Type::Float32, Shape::new(&[2]));
    let id = flow.add_operation("id", "Identity");
    Operation::add_input(&id, &a);
    Operation::add_output(&id, &b);
    let cnx = flow.add_connector("state");
    cnx.borrow_mut().add_link(&b);

    let mut tx = Transformations::default();
    tx.add_noop("Identity");
    Rewrite::run(&mut flow, &mut tx);

    assert_eq!(cnx.borrow().links.len(), 1);
    assert!(Rc::ptr_eq(&cnx.borrow().links[0], &a));
    assert!(flow.is_consistent());
}

#[test]
fn sourceless_noop_orphans_its_outputs() {
    let mut flow = Flow::new();
    let v = flow.add_variable("v", Type::Float32, Shape::new(&[2]));
    let init = flow.add_operation("init", "Placeholder");
    Operation::add_output(&init, &v);

    let mut tx = Transformations::default();
    tx.add_noop("Placeholder");
    Rewrite::run(&mut flow, &mut tx);

    // The op is gone but the output survives without a producer.
    assert!(flow.op("init").is_none());
    let v = flow.var("v").unwrap();
    assert!(v.borrow().producer.is_none());
    assert!(flow.is_consistent());
}

#[test]
fn combination_fuses_matching_pairs() {
    // MatMul(x, w) -> m ; Add(m, bias) -> y
    let mut flow = Flow::new();
    let x = flow.add_variable("x", Type::Float32, Shape::new(&[1, 4]));
    let w = flow.add_variable("w", Type::Float32, Shape::new(&[4, 4]));
    let m = flow.add_variable("m", Type::Float32, Shape::new(&[1, 4]));
    let bias = flow.add_variable("bias", Type::Float32, Shape::new(&[4]));
    let y = flow.add_variable("y", Type::Float32, Shape::new(&[1, 4]));
    let matmul = flow.add_operation("matmul", "MatMul");
    Operation::add_input(&matmul, &x);
    Operation::add_input(&matmul, &w);
    Operation::add_output(&matmul, &m);
    let add = flow.add_operation("add", "Add");
    Operation::add_input(&add, &m);
    Operation::add_input(&add, &bias);
    Operation::add_output(&add, &y);

    let mut tx = Transformations::default();
    tx.add_combination("MatMul", "Add", "MatMulAdd");
    Rewrite::run(&mut flow, &mut tx);

    assert_eq!(flow.ops.len(), 1);
    let fused = flow.op("matmul").unwrap();
    assert_eq!(fused.borrow().kind, "MatMulAdd");
    assert_eq!(fused.borrow().inputs.len(), 3);
    assert!(flow.var("m").is_none());
    assert!(flow.is_consistent());
}

#[test]
fn combination_requires_matching_task() {
    let mut flow = Flow::new();
    let x = flow.add_variable("x", Type::Float32, Shape::new(&[2]));
    let m = flow.add_variable("m", Type::Float32, Shape::new(&[2]));
    let y = flow.add_variable("y", Type::Float32, Shape::new(&[2]));
    let first = flow.add_operation("first", "Square");
    Operation::add_input(&first, &x);
    Operation::add_output(&first, &m);
    let second = flow.add_operation("second", "Neg");
    Operation::add_input(&second, &m);
    Operation::add_output(&second, &y);
    second.borrow_mut().task = 1;

    let mut tx = Transformations::default();
    tx.add_combination("Square", "Neg", "NegSquare");
    Rewrite::run(&mut flow, &mut tx);

    // Different tasks; nothing fuses.
    assert_eq!(flow.ops.len(), 2);
    assert!(flow.var("m").is_some());
}

/// Rewrites every `Raw` operation to `Cooked` once.
struct Retype {
    done: bool,
}

impl Transformer for Retype {
    fn transform(&mut self, flow: &mut Flow) -> bool {
        if self.done {
            return false;
        }
        let mut changed = false;
        for op in flow.ops.iter() {
            if op.borrow().kind == "Raw" {
                op.borrow_mut().kind = "Cooked".into();
                changed = true;
            }
        }
        self.done = true;
        changed
    }
}

#[test]
fn transformers_drive_the_fixed_point() {
    let mut flow = Flow::new();
    let v = flow.add_variable("v", Type::Float32, Shape::new(&[2]));
    let op = flow.add_operation("op", "Raw");
    Operation::add_output(&op, &v);

    let mut tx = Transformations::default();
    tx.add_transformer(Box::new(Retype { done: false }));
    // The retyped op becomes eligible for elimination in the next round.
    tx.add_noop("Cooked");
    Rewrite::run(&mut flow, &mut tx);

    assert!(flow.ops.is_empty());
    assert!(flow.var("v").unwrap().borrow().producer.is_none());
}
