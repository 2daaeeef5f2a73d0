//! Computes scheduling priorities and a priority-aware topological
//! execution order for the operations of a flow.

use crate::analysis::OpGraph;
use crate::passes::Named;
use flowc_ir::{Flow, IdList, Operation, RRC};
use flowc_utils::{Error, FlowResult, Id};
use itertools::Itertools;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};
use std::rc::Rc;

/// Assigns a priority to each operation and orders them topologically.
///
/// Operations that parallel tasks depend on are scheduled early and
/// operations that depend on parallel tasks are scheduled late, so the
/// main thread overlaps with the parallel tasks as much as possible:
///
///   4: operations that parallel operations depend on
///   3: operations with no relation to parallel operations
///   2: parallel operations themselves
///   1: operations that depend on parallel operations
pub struct Schedule;

impl Named for Schedule {
    fn name() -> &'static str {
        "schedule"
    }

    fn description() -> &'static str {
        "compute a parallelism-aware topological execution order"
    }
}

/// Heap entry for the ready queue: higher priority first, then the
/// operation that became ready first.
struct Ready {
    priority: i32,
    order: i32,
    op: RRC<Operation>,
}

impl PartialEq for Ready {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ready {}

impl PartialOrd for Ready {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ready {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.order.cmp(&self.order))
    }
}

impl Schedule {
    pub fn run(flow: &mut Flow) -> FlowResult<()> {
        Self::assign_priorities(flow);

        // Variables with no producer come first in the final order.
        let mut ordered_vars = flow
            .vars
            .iter()
            .filter(|v| v.borrow().producer.is_none())
            .cloned()
            .collect_vec();
        let mut ordered_ops: Vec<RRC<Operation>> = Vec::new();

        // Kahn's algorithm over a ready heap. `order` is assigned when an
        // operation first becomes ready and breaks priority ties.
        let mut heap: BinaryHeap<Ready> = BinaryHeap::new();
        let mut order = 0;
        for op in flow.ops.iter() {
            let missing = op
                .borrow()
                .inputs
                .iter()
                .filter(|v| v.borrow().producer.is_some())
                .count() as i32;
            op.borrow_mut().missing = missing;
            if missing == 0 {
                op.borrow_mut().order = order;
                heap.push(Ready {
                    priority: op.borrow().priority,
                    order,
                    op: Rc::clone(op),
                });
                order += 1;
            }
        }

        while let Some(Ready { op, .. }) = heap.pop() {
            ordered_ops.push(Rc::clone(&op));
            let outputs = op.borrow().outputs.clone();
            for output in outputs {
                ordered_vars.push(Rc::clone(&output));
                let consumers = output
                    .borrow()
                    .consumers
                    .iter()
                    .map(|c| c.upgrade())
                    .collect_vec();
                for consumer in consumers {
                    let mut c = consumer.borrow_mut();
                    assert_ne!(
                        c.missing, 0,
                        "operation `{}' became ready twice",
                        c.name
                    );
                    c.missing -= 1;
                    if c.missing == 0 {
                        c.order = order;
                        let priority = c.priority;
                        drop(c);
                        heap.push(Ready {
                            priority,
                            order,
                            op: consumer,
                        });
                        order += 1;
                    }
                }
            }
        }

        // Operations left unordered never had their input count reach
        // zero, so the graph contains a dependency cycle.
        if ordered_ops.len() != flow.ops.len() {
            debug_assert!(OpGraph::from(&*flow).has_cycles());
            return Err(Error::malformed_structure(format!(
                "{} operations are stuck in a dependency cycle",
                flow.ops.len() - ordered_ops.len()
            )));
        }
        assert_eq!(
            ordered_vars.len(),
            flow.vars.len(),
            "scheduled variable count mismatch"
        );

        for (i, op) in ordered_ops.iter().enumerate() {
            op.borrow_mut().order = i as i32;
        }
        flow.ops = IdList::from(ordered_ops);
        flow.vars = IdList::from(ordered_vars);

        // Function bodies execute in scheduled order.
        for func in flow.funcs.iter() {
            func.borrow_mut().ops.sort_by_key(|op| op.borrow().order);
        }

        Ok(())
    }

    fn assign_priorities(flow: &mut Flow) {
        for op in flow.ops.iter() {
            let mut o = op.borrow_mut();
            o.priority = 3;
            o.order = 0;
            o.missing = 0;
        }

        // Seed: parallel operations run at priority 2, their main-thread
        // producers join the pre-parallel phase and their main-thread
        // consumers join the post-parallel phase.
        let mut pre: HashSet<Id> = HashSet::new();
        let mut post: HashSet<Id> = HashSet::new();
        let mut pre_work: Vec<RRC<Operation>> = Vec::new();
        let mut post_work: Vec<RRC<Operation>> = Vec::new();
        for op in flow.ops.iter() {
            if op.borrow().task == 0 {
                continue;
            }
            op.borrow_mut().priority = 2;

            for producer in Self::producers(op) {
                if producer.borrow().task == 0
                    && pre.insert(producer.borrow().name)
                {
                    producer.borrow_mut().priority = 4;
                    pre_work.push(producer);
                }
            }
            for consumer in Self::consumers(op) {
                if consumer.borrow().task == 0
                    && post.insert(consumer.borrow().name)
                {
                    consumer.borrow_mut().priority = 1;
                    post_work.push(consumer);
                }
            }
        }

        // Expand both phases to a fixed point: everything upstream of the
        // pre phase joins it, everything downstream of the post phase
        // joins it.
        while let Some(op) = pre_work.pop() {
            for producer in Self::producers(&op) {
                if pre.insert(producer.borrow().name) {
                    producer.borrow_mut().priority = 4;
                    pre_work.push(producer);
                }
            }
        }
        while let Some(op) = post_work.pop() {
            for consumer in Self::consumers(&op) {
                if post.insert(consumer.borrow().name) {
                    consumer.borrow_mut().priority = 1;
                    post_work.push(consumer);
                }
            }
        }
    }

    /// Producers of the operation's inputs.
    fn producers(op: &RRC<Operation>) -> Vec<RRC<Operation>> {
        op.borrow()
            .inputs
            .iter()
            .filter_map(|v| {
                v.borrow().producer.as_ref().map(|p| p.upgrade())
            })
            .collect_vec()
    }

    /// Consumers of the operation's outputs.
    fn consumers(op: &RRC<Operation>) -> Vec<RRC<Operation>> {
        op.borrow()
            .outputs
            .iter()
            .flat_map(|v| {
                v.borrow()
                    .consumers
                    .iter()
                    .map(|c| c.upgrade())
                    .collect_vec()
            })
            .collect_vec()
    }
}
