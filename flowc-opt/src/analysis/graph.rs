//! A petgraph-based view of the operation dependency structure.

use flowc_ir::{Flow, Operation, RRC};
use flowc_utils::Id;
use petgraph::algo;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;
use std::rc::Rc;

/// A directed graph where operations are the nodes and each edge
/// `X -> Y` means an output of `X` is consumed by `Y`. Useful for
/// graph-level queries the scheduler itself does not answer, such as
/// cycle diagnostics.
pub struct OpGraph {
    nodes: HashMap<Id, NodeIndex>,
    graph: DiGraph<RRC<Operation>, ()>,
}

impl From<&Flow> for OpGraph {
    fn from(flow: &Flow) -> Self {
        let mut graph = DiGraph::new();
        let mut nodes = HashMap::new();
        for op in flow.ops.iter() {
            let idx = graph.add_node(Rc::clone(op));
            nodes.insert(op.borrow().name, idx);
        }
        for op in flow.ops.iter() {
            let src = nodes[&op.borrow().name];
            for output in &op.borrow().outputs {
                for consumer in &output.borrow().consumers {
                    let dst = nodes[&consumer.upgrade().borrow().name];
                    graph.add_edge(src, dst, ());
                }
            }
        }
        OpGraph { nodes, graph }
    }
}

impl OpGraph {
    /// True when the dependency structure contains a cycle.
    pub fn has_cycles(&self) -> bool {
        algo::is_cyclic_directed(&self.graph)
    }

    /// A topological order over the operations; None when the graph is
    /// cyclic.
    pub fn toposort(&self) -> Option<Vec<RRC<Operation>>> {
        algo::toposort(&self.graph, None).ok().map(|order| {
            order
                .into_iter()
                .map(|idx| Rc::clone(&self.graph[idx]))
                .collect()
        })
    }

    /// The node index for the operation with the given name.
    pub fn node(&self, name: Id) -> Option<NodeIndex> {
        self.nodes.get(&name).copied()
    }
}
