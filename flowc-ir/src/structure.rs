//! The entities making up a flow graph: variables, operations, functions,
//! and connectors.
//!
//! Linking helpers that touch both sides of an edge (inputs, outputs) are
//! associated functions taking the [`RRC`] handles so the back-edges can
//! be installed. Every helper leaves the graph bidirectionally consistent
//! on return; violations are programmer errors and panic.

use crate::{Attributes, Shape, Type, RRC, WRC};
use flowc_utils::{GetName, Id};
use std::collections::HashSet;
use std::rc::Rc;

/// A named tensor slot: a constant, a graph input or output, or an
/// intermediate result.
#[derive(Clone, Debug)]
pub struct Variable {
    /// Primary name of the variable.
    pub name: Id,
    /// Alternative lookup keys. The primary name need not appear here.
    pub aliases: Vec<Id>,
    /// Element type.
    pub dtype: Type,
    /// A reference variable holds a pointer to a tensor rather than the
    /// tensor itself.
    pub is_ref: bool,
    pub shape: Shape,
    /// Constant payload, if this variable is a constant tensor.
    pub data: Option<Rc<[u8]>>,
    /// True when the variable is an input to the graph.
    pub is_input: bool,
    /// True when the variable is an output of the graph.
    pub is_output: bool,
    /// The operation producing this variable, if any.
    pub producer: Option<WRC<Operation>>,
    /// Operations consuming this variable, in edge creation order.
    pub consumers: Vec<WRC<Operation>>,
}

impl Variable {
    pub fn new(name: Id, dtype: Type, shape: Shape) -> Self {
        Variable {
            name,
            aliases: Vec::new(),
            dtype,
            is_ref: false,
            shape,
            data: None,
            is_input: false,
            is_output: false,
            producer: None,
            consumers: Vec::new(),
        }
    }

    /// Register an alternative name unless it is already known.
    pub fn add_alias(&mut self, alias: Id) {
        if !self.aliases.contains(&alias) {
            self.aliases.push(alias);
        }
    }

    /// Byte size of the constant payload; zero for non-constants.
    pub fn byte_size(&self) -> u64 {
        self.data.as_ref().map_or(0, |d| d.len() as u64)
    }

    /// Type rendered as e.g. `&float32[2x?]`.
    pub fn type_string(&self) -> String {
        let mut s = String::new();
        if self.is_ref {
            s.push('&');
        }
        s.push_str(self.dtype.traits().name());
        if self.shape.rank() > 0 {
            s.push('[');
            s.push_str(&self.shape.to_string());
            s.push(']');
        }
        s
    }

    /// Transitive backward reachability: true when `op` produces this
    /// variable or any ancestor of it.
    pub fn depends_on(&self, op: &RRC<Operation>) -> bool {
        let mut visited: HashSet<Id> = HashSet::new();
        let mut pending: Vec<RRC<Operation>> =
            self.producer.iter().map(WRC::upgrade).collect();
        while let Some(prod) = pending.pop() {
            if Rc::ptr_eq(&prod, op) {
                return true;
            }
            if !visited.insert(prod.borrow().name) {
                continue;
            }
            for input in &prod.borrow().inputs {
                if let Some(p) = &input.borrow().producer {
                    pending.push(p.upgrade());
                }
            }
        }
        false
    }
}

impl GetName for Variable {
    fn name(&self) -> Id {
        self.name
    }
}

/// A typed node consuming input variables and producing output variables.
#[derive(Clone, Debug)]
pub struct Operation {
    pub name: Id,
    /// The operation type, e.g. `MatMul`.
    pub kind: Id,
    pub attributes: Attributes,
    /// Task id for parallel execution; zero runs on the main thread.
    pub task: i32,
    pub inputs: Vec<RRC<Variable>>,
    pub outputs: Vec<RRC<Variable>>,
    /// The function this operation belongs to, if any.
    pub func: Option<WRC<Function>>,
    /// Scheduling priority, assigned by the scheduler.
    pub priority: i32,
    /// Position in the scheduled order.
    pub order: i32,
    /// Scratch counter of not-yet-scheduled producers.
    pub missing: i32,
}

impl Operation {
    pub fn new(name: Id, kind: Id) -> Self {
        Operation {
            name,
            kind,
            attributes: Attributes::default(),
            task: 0,
            inputs: Vec::new(),
            outputs: Vec::new(),
            func: None,
            priority: 3,
            order: 0,
            missing: 0,
        }
    }

    /// Append `var` to the inputs and register the consumer back-edge.
    pub fn add_input(op: &RRC<Operation>, var: &RRC<Variable>) {
        op.borrow_mut().inputs.push(Rc::clone(var));
        var.borrow_mut().consumers.push(WRC::from(op));
    }

    /// Append `var` to the outputs and install the producer back-edge.
    /// The variable must not have a producer yet.
    pub fn add_output(op: &RRC<Operation>, var: &RRC<Variable>) {
        assert!(
            var.borrow().producer.is_none(),
            "variable `{}' already has a producer",
            var.borrow().name
        );
        op.borrow_mut().outputs.push(Rc::clone(var));
        var.borrow_mut().producer = Some(WRC::from(op));
    }

    /// Remove `var` from the inputs and drop the consumer back-edge.
    pub fn remove_input(op: &RRC<Operation>, var: &RRC<Variable>) {
        {
            let mut v = var.borrow_mut();
            let pos = v
                .consumers
                .iter()
                .position(|c| c.points_to(op))
                .unwrap_or_else(|| {
                    panic!(
                        "operation `{}' is not a consumer of `{}'",
                        op.borrow().name,
                        v.name
                    )
                });
            v.consumers.remove(pos);
        }
        let mut o = op.borrow_mut();
        let pos = o
            .inputs
            .iter()
            .position(|i| Rc::ptr_eq(i, var))
            .unwrap_or_else(|| {
                panic!(
                    "variable `{}' is not an input of `{}'",
                    var.borrow().name,
                    o.name
                )
            });
        o.inputs.remove(pos);
    }

    /// Remove `var` from the outputs and clear its producer. Panics when
    /// `var` is not in the outputs list.
    pub fn remove_output(op: &RRC<Operation>, var: &RRC<Variable>) {
        {
            let mut v = var.borrow_mut();
            let is_producer =
                matches!(&v.producer, Some(p) if p.points_to(op));
            assert!(
                is_producer,
                "operation `{}' is not the producer of `{}'",
                op.borrow().name,
                v.name
            );
            v.producer = None;
        }
        let mut o = op.borrow_mut();
        let pos = o
            .outputs
            .iter()
            .position(|x| Rc::ptr_eq(x, var))
            .unwrap_or_else(|| {
                panic!(
                    "variable `{}' is not an output of `{}'",
                    var.borrow().name,
                    o.name
                )
            });
        o.outputs.remove(pos);
    }

    /// Transfer the input edge for `var` from `from` to `to`, updating
    /// the consumer entry in place so the remaining order is kept.
    pub fn move_input(
        from: &RRC<Operation>,
        var: &RRC<Variable>,
        to: &RRC<Operation>,
    ) {
        {
            let mut f = from.borrow_mut();
            let pos = f
                .inputs
                .iter()
                .position(|i| Rc::ptr_eq(i, var))
                .unwrap_or_else(|| {
                    panic!(
                        "variable `{}' is not an input of `{}'",
                        var.borrow().name,
                        f.name
                    )
                });
            f.inputs.remove(pos);
        }
        to.borrow_mut().inputs.push(Rc::clone(var));
        let mut v = var.borrow_mut();
        if let Some(c) = v.consumers.iter_mut().find(|c| c.points_to(from)) {
            *c = WRC::from(to);
        }
    }

    /// Transfer the output edge for `var` from `from` to `to`.
    pub fn move_output(
        from: &RRC<Operation>,
        var: &RRC<Variable>,
        to: &RRC<Operation>,
    ) {
        {
            let mut f = from.borrow_mut();
            let pos = f
                .outputs
                .iter()
                .position(|x| Rc::ptr_eq(x, var))
                .unwrap_or_else(|| {
                    panic!(
                        "variable `{}' is not an output of `{}'",
                        var.borrow().name,
                        f.name
                    )
                });
            f.outputs.remove(pos);
        }
        to.borrow_mut().outputs.push(Rc::clone(var));
        let mut v = var.borrow_mut();
        let is_producer =
            matches!(&v.producer, Some(p) if p.points_to(from));
        assert!(
            is_producer,
            "operation `{}' is not the producer of `{}'",
            from.borrow().name,
            v.name
        );
        v.producer = Some(WRC::from(to));
    }

    /// True when `var` is an input of this operation.
    pub fn is_input(&self, var: &RRC<Variable>) -> bool {
        self.inputs.iter().any(|i| Rc::ptr_eq(i, var))
    }

    /// True when `var` is an output of this operation.
    pub fn is_output(&self, var: &RRC<Variable>) -> bool {
        self.outputs.iter().any(|o| Rc::ptr_eq(o, var))
    }
}

impl GetName for Operation {
    fn name(&self) -> Id {
        self.name
    }
}

/// A named subset of operations intended to execute as a unit.
#[derive(Debug)]
pub struct Function {
    pub name: Id,
    pub ops: Vec<RRC<Operation>>,
}

impl Function {
    pub fn new(name: Id) -> Self {
        Function {
            name,
            ops: Vec::new(),
        }
    }

    /// Add `op` to this function. The operation must not already belong
    /// to a function.
    pub fn add_operation(func: &RRC<Function>, op: &RRC<Operation>) {
        assert!(
            op.borrow().func.is_none(),
            "operation `{}' already belongs to a function",
            op.borrow().name
        );
        op.borrow_mut().func = Some(WRC::from(func));
        func.borrow_mut().ops.push(Rc::clone(op));
    }
}

impl GetName for Function {
    fn name(&self) -> Id {
        self.name
    }
}

/// An orthogonal grouping of variables that share identity, e.g.
/// loop-carried state. Links never create producer/consumer edges.
#[derive(Debug)]
pub struct Connector {
    pub name: Id,
    pub links: Vec<RRC<Variable>>,
}

impl Connector {
    pub fn new(name: Id) -> Self {
        Connector {
            name,
            links: Vec::new(),
        }
    }

    /// Link `var` unless it is already linked.
    pub fn add_link(&mut self, var: &RRC<Variable>) {
        if !self.links.iter().any(|l| Rc::ptr_eq(l, var)) {
            self.links.push(Rc::clone(var));
        }
    }

    /// Unlink `var`; false when it was not linked.
    pub fn remove_link(&mut self, var: &RRC<Variable>) -> bool {
        match self.links.iter().position(|l| Rc::ptr_eq(l, var)) {
            Some(pos) => {
                self.links.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Replace `old` with `new`, keeping unique membership. False when
    /// `old` was not linked.
    pub fn replace_link(
        &mut self,
        old: &RRC<Variable>,
        new: &RRC<Variable>,
    ) -> bool {
        if self.remove_link(old) {
            self.add_link(new);
            true
        } else {
            false
        }
    }
}

impl GetName for Connector {
    fn name(&self) -> Id {
        self.name
    }
}
