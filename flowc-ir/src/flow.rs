//! The top-level container owning every entity of one compilation unit.

use crate::{
    rrc, Connector, Function, Operation, Shape, Type, Variable, RRC,
};
use flowc_utils::{GetName, Id};
use itertools::Itertools;
use linked_hash_map::LinkedHashMap;
use std::rc::Rc;

/// An ordered collection of named entities with constant-time lookup on
/// the primary name. Assumes entity names never change after insertion.
#[derive(Debug)]
pub struct IdList<T: GetName>(LinkedHashMap<Id, RRC<T>>);

impl<T: GetName> Default for IdList<T> {
    fn default() -> Self {
        IdList(LinkedHashMap::new())
    }
}

impl<T, F> From<F> for IdList<T>
where
    T: GetName,
    F: IntoIterator<Item = RRC<T>>,
{
    fn from(list: F) -> Self {
        IdList(
            list.into_iter()
                .map(|item| {
                    let name = item.borrow().name();
                    (name, item)
                })
                .collect(),
        )
    }
}

impl<T: GetName> IdList<T> {
    pub fn add(&mut self, item: RRC<T>) {
        let name = item.borrow().name();
        self.0.insert(name, item);
    }

    /// Remove and return the entity with the given name.
    pub fn remove<S: Into<Id>>(&mut self, name: S) -> Option<RRC<T>> {
        self.0.remove(&name.into())
    }

    /// The entity with the given name, if present.
    pub fn find<S: Into<Id>>(&self, name: S) -> Option<RRC<T>> {
        self.0.get(&name.into()).map(Rc::clone)
    }

    pub fn iter(&self) -> impl Clone + Iterator<Item = &RRC<T>> {
        self.0.values()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a, T: GetName> IntoIterator for &'a IdList<T> {
    type Item = &'a RRC<T>;
    type IntoIter = linked_hash_map::Values<'a, Id, RRC<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.values()
    }
}

/// A flow graph: all variables, operations, functions, and connectors of
/// one compilation unit, in insertion (or, after scheduling, execution)
/// order.
#[derive(Default)]
pub struct Flow {
    pub vars: IdList<Variable>,
    pub ops: IdList<Operation>,
    pub funcs: IdList<Function>,
    pub connectors: IdList<Connector>,
    /// Substituted for dimensions recorded as unknown in flow files.
    pub batch_size: i32,
}

impl Flow {
    pub fn new() -> Self {
        Flow {
            batch_size: 1,
            ..Default::default()
        }
    }

    /* ==================== Factories ==================== */

    pub fn add_variable<S: Into<Id>>(
        &mut self,
        name: S,
        dtype: Type,
        shape: Shape,
    ) -> RRC<Variable> {
        let var = rrc(Variable::new(name.into(), dtype, shape));
        self.vars.add(Rc::clone(&var));
        var
    }

    pub fn add_operation<S: Into<Id>>(
        &mut self,
        name: S,
        kind: S,
    ) -> RRC<Operation> {
        let op = rrc(Operation::new(name.into(), kind.into()));
        self.ops.add(Rc::clone(&op));
        op
    }

    /// Create an operation inside `func` with the given inputs and
    /// outputs already linked.
    pub fn add_operation_in<S: Into<Id>>(
        &mut self,
        func: &RRC<Function>,
        name: S,
        kind: S,
        inputs: &[RRC<Variable>],
        outputs: &[RRC<Variable>],
    ) -> RRC<Operation> {
        let op = self.add_operation(name, kind);
        Function::add_operation(func, &op);
        for input in inputs {
            Operation::add_input(&op, input);
        }
        for output in outputs {
            Operation::add_output(&op, output);
        }
        op
    }

    pub fn add_function<S: Into<Id>>(&mut self, name: S) -> RRC<Function> {
        let func = rrc(Function::new(name.into()));
        self.funcs.add(Rc::clone(&func));
        func
    }

    pub fn add_connector<S: Into<Id>>(&mut self, name: S) -> RRC<Connector> {
        let cnx = rrc(Connector::new(name.into()));
        self.connectors.add(Rc::clone(&cnx));
        cnx
    }

    /* ==================== Lookup ==================== */

    /// Find a variable by name or by any of its aliases.
    pub fn var<S: Into<Id>>(&self, name: S) -> Option<RRC<Variable>> {
        let name = name.into();
        self.vars.find(name).or_else(|| {
            self.vars
                .iter()
                .find(|v| v.borrow().aliases.contains(&name))
                .map(Rc::clone)
        })
    }

    pub fn op<S: Into<Id>>(&self, name: S) -> Option<RRC<Operation>> {
        self.ops.find(name)
    }

    pub fn func<S: Into<Id>>(&self, name: S) -> Option<RRC<Function>> {
        self.funcs.find(name)
    }

    /* ==================== Deletion ==================== */

    /// Remove `var` from the flow. Edges referring to the variable must
    /// already have been cleared by the caller.
    pub fn delete_variable(&mut self, var: &RRC<Variable>) {
        let removed = self.vars.remove(var.borrow().name);
        debug_assert!(
            removed.map_or(true, |r| Rc::ptr_eq(&r, var)),
            "deleted variable `{}' shadowed by another entity",
            var.borrow().name
        );
    }

    /// Remove `op` from the flow and from its function, if any. Dangling
    /// input/output edges are the caller's responsibility.
    pub fn delete_operation(&mut self, op: &RRC<Operation>) {
        let func = op.borrow().func.as_ref().map(|f| f.upgrade());
        if let Some(func) = func {
            let mut f = func.borrow_mut();
            if let Some(pos) =
                f.ops.iter().position(|o| Rc::ptr_eq(o, op))
            {
                f.ops.remove(pos);
            }
        }
        self.ops.remove(op.borrow().name);
    }

    /* ==================== Rewriting support ==================== */

    /// Merge `second` into `first`, which takes over all of `second`'s
    /// edges and becomes an operation of type `combined`. Intermediate
    /// variables used only between the two operations are deleted.
    /// When `merge_inputs` is set, inputs shared by both operations are
    /// kept once instead of duplicated.
    pub fn fuse(
        &mut self,
        first: &RRC<Operation>,
        second: &RRC<Operation>,
        combined: Id,
        merge_inputs: bool,
    ) -> RRC<Operation> {
        // Move inputs from the second op to the combined op.
        loop {
            let v = match second.borrow().inputs.first() {
                Some(v) => Rc::clone(v),
                None => break,
            };
            if merge_inputs && first.borrow().is_input(&v) {
                // Shared input.
                Operation::remove_input(second, &v);
            } else if first.borrow().is_output(&v) {
                // Intermediate result between the two ops; delete it when
                // nothing else consumes it.
                Operation::remove_input(second, &v);
                if v.borrow().consumers.is_empty() {
                    Operation::remove_output(first, &v);
                    self.delete_variable(&v);
                    self.unlink_from_connectors(&v);
                }
            } else {
                // Additional input.
                Operation::move_input(second, &v, first);
            }
        }

        // Move outputs from the second op to the combined op.
        loop {
            let v = match second.borrow().outputs.first() {
                Some(v) => Rc::clone(v),
                None => break,
            };
            if first.borrow().is_input(&v) {
                if v.borrow().consumers.len() == 1 {
                    // Only fed back into the first op; eliminate.
                    Operation::remove_input(first, &v);
                    Operation::remove_output(second, &v);
                    self.delete_variable(&v);
                    self.unlink_from_connectors(&v);
                } else {
                    Operation::remove_input(first, &v);
                    Operation::move_output(second, &v, first);
                }
            } else if first.borrow().is_output(&v) {
                // Shared output.
                Operation::remove_output(second, &v);
            } else {
                // Additional output.
                Operation::move_output(second, &v, first);
            }
        }

        first.borrow_mut().kind = combined;

        // Keep attributes of the second op unless the first already has
        // them.
        {
            let s = second.borrow();
            let mut f = first.borrow_mut();
            for attr in &s.attributes {
                if !f.attributes.has(&attr.name) {
                    f.attributes.set(&attr.name, attr.value.clone());
                }
            }
        }

        self.delete_operation(second);
        Rc::clone(first)
    }

    /// Remove `var` from every connector's link list.
    pub fn unlink_from_connectors(&mut self, var: &RRC<Variable>) {
        for cnx in self.connectors.iter() {
            cnx.borrow_mut().remove_link(var);
        }
    }

    /// Find operations ending a chain of the given types, matched
    /// backwards through the first input of each operation.
    pub fn find_chain(&self, kinds: &[&str]) -> Vec<RRC<Operation>> {
        assert!(!kinds.is_empty());
        let last = Id::new(kinds[kinds.len() - 1]);
        let mut matches = Vec::new();
        for op in self.ops.iter() {
            if op.borrow().kind != last {
                continue;
            }
            let mut current = Rc::clone(op);
            let mut matched = true;
            for kind in kinds.iter().rev().skip(1) {
                let prev = {
                    let cur = current.borrow();
                    cur.inputs.first().and_then(|input| {
                        input
                            .borrow()
                            .producer
                            .as_ref()
                            .map(|p| p.upgrade())
                    })
                };
                match prev {
                    Some(prev) if prev.borrow().kind == *kind => {
                        current = prev;
                    }
                    _ => {
                        matched = false;
                        break;
                    }
                }
            }
            if matched {
                matches.push(Rc::clone(op));
            }
        }
        matches
    }

    /* ==================== Subgraph extraction ==================== */

    /// Clone the cone of operations reachable backwards from the
    /// `outputs` cut, stopping at the `inputs` cut, into `subflow` as a
    /// new function named `name`. Returns the new function.
    pub fn extract(
        &self,
        name: &str,
        inputs: &[RRC<Variable>],
        outputs: &[RRC<Variable>],
        subflow: &mut Flow,
    ) -> RRC<Function> {
        let func = subflow.add_function(name);

        // Walk backwards from the outputs, cloning variables and their
        // producers until an input is reached. The clones still point at
        // the original entities; the maps are used to rewrite the edges
        // afterwards.
        let mut queue: Vec<RRC<Variable>> = outputs.to_vec();
        let mut varmap: Vec<(RRC<Variable>, RRC<Variable>)> = Vec::new();
        let mut opmap: Vec<(RRC<Operation>, RRC<Operation>)> = Vec::new();
        while let Some(var) = queue.pop() {
            if varmap.iter().any(|(old, _)| Rc::ptr_eq(old, &var)) {
                continue;
            }
            let newvar = rrc(var.borrow().clone());
            subflow.vars.add(Rc::clone(&newvar));
            varmap.push((Rc::clone(&var), newvar));

            // Stop traversing at the input cut.
            if inputs.iter().any(|i| Rc::ptr_eq(i, &var)) {
                continue;
            }

            let producer = match &var.borrow().producer {
                Some(p) => p.upgrade(),
                None => continue,
            };
            if opmap.iter().any(|(old, _)| Rc::ptr_eq(old, &producer)) {
                continue;
            }
            let newop = {
                let mut clone = producer.borrow().clone();
                clone.priority = 3;
                clone.func = None;
                rrc(clone)
            };
            subflow.ops.add(Rc::clone(&newop));
            Function::add_operation(&func, &newop);
            opmap.push((Rc::clone(&producer), newop));

            for input in &producer.borrow().inputs {
                queue.push(Rc::clone(input));
            }
            for output in &producer.borrow().outputs {
                queue.push(Rc::clone(output));
            }
        }

        let mapped_op = |old: &RRC<Operation>| {
            opmap
                .iter()
                .find(|(o, _)| Rc::ptr_eq(o, old))
                .map(|(_, n)| Rc::clone(n))
        };
        let mapped_var = |old: &RRC<Variable>| {
            varmap
                .iter()
                .find(|(o, _)| Rc::ptr_eq(o, old))
                .map(|(_, n)| Rc::clone(n))
        };

        // Rewrite producers and consumers of the cloned variables,
        // dropping edges to operations outside the cone.
        for (_, newvar) in &varmap {
            let producer = newvar
                .borrow()
                .producer
                .as_ref()
                .map(|p| p.upgrade())
                .and_then(|p| mapped_op(&p));
            let consumers = newvar
                .borrow()
                .consumers
                .iter()
                .filter_map(|c| mapped_op(&c.upgrade()))
                .map(|c| (&c).into())
                .collect();
            let mut v = newvar.borrow_mut();
            v.producer = producer.as_ref().map(|p| p.into());
            v.consumers = consumers;
        }

        // Rewrite inputs and outputs of the cloned operations.
        for (_, newop) in &opmap {
            let inputs = newop
                .borrow()
                .inputs
                .iter()
                .map(|i| {
                    mapped_var(i).expect("extracted input not cloned")
                })
                .collect_vec();
            let outputs = newop
                .borrow()
                .outputs
                .iter()
                .map(|o| {
                    mapped_var(o).expect("extracted output not cloned")
                })
                .collect_vec();
            let mut o = newop.borrow_mut();
            o.inputs = inputs;
            o.outputs = outputs;
        }

        func
    }
}
