//! Circular reference detection.
//!
//! Strongly connected components come from an iterative Tarjan walk, so deep
//! dependency chains cannot overflow the call stack. A component is a cycle
//! when it has more than one member or its single member references itself.

use std::collections::VecDeque;

use rustc_hash::FxHashMap;
use sheetaudit_common::CellCoord;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::graph::{DependencyGraph, NodeId};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cycle {
    /// Members in coordinate order.
    pub members: Vec<CellCoord>,
    /// A closed walk starting and ending at the smallest member, e.g.
    /// `[A1, B1, C1, A1]`; a self-reference is `[A1, A1]`.
    pub path: Vec<CellCoord>,
}

impl Cycle {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, coord: &CellCoord) -> bool {
        self.members.binary_search(coord).is_ok()
    }
}

/// Every cycle in a graph, with per-node membership.
#[derive(Debug, Clone, Default)]
pub struct CycleSet {
    cycles: Vec<Cycle>,
    membership: Vec<Option<usize>>,
}

impl CycleSet {
    /// Cycles ordered by their smallest member.
    pub fn cycles(&self) -> &[Cycle] {
        &self.cycles
    }

    pub fn cycle_of(&self, id: NodeId) -> Option<&Cycle> {
        self.membership
            .get(id.as_index())
            .copied()
            .flatten()
            .map(|idx| &self.cycles[idx])
    }

    pub fn is_cyclic(&self, id: NodeId) -> bool {
        self.cycle_of(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.cycles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cycles.is_empty()
    }

    pub fn into_cycles(self) -> Vec<Cycle> {
        self.cycles
    }
}

pub struct CycleDetector<'a> {
    graph: &'a DependencyGraph,
}

const UNVISITED: u32 = u32::MAX;

struct Frame {
    node: NodeId,
    next: usize,
}

impl<'a> CycleDetector<'a> {
    pub fn new(graph: &'a DependencyGraph) -> Self {
        Self { graph }
    }

    pub fn detect(&self) -> CycleSet {
        #[cfg(feature = "tracing")]
        let _span = tracing::info_span!("detect_cycles", nodes = self.graph.node_count()).entered();

        let mut components: Vec<Vec<NodeId>> = self
            .strongly_connected_components()
            .into_iter()
            .filter(|scc| scc.len() > 1 || self.graph.has_self_loop(scc[0]))
            .map(|mut scc| {
                scc.sort_unstable();
                scc
            })
            .collect();
        components.sort_unstable_by_key(|scc| scc[0]);

        let mut membership = vec![None; self.graph.node_count()];
        let mut cycles = Vec::with_capacity(components.len());
        for (idx, scc) in components.iter().enumerate() {
            for &member in scc {
                membership[member.as_index()] = Some(idx);
            }
            cycles.push(Cycle {
                members: scc.iter().map(|&id| self.graph.coord(id).clone()).collect(),
                path: self
                    .representative_path(scc, &membership, idx)
                    .into_iter()
                    .map(|id| self.graph.coord(id).clone())
                    .collect(),
            });
        }

        #[cfg(feature = "tracing")]
        if !cycles.is_empty() {
            tracing::info!(cycles = cycles.len(), "circular references found");
        }

        CycleSet { cycles, membership }
    }

    /// Tarjan's algorithm with an explicit call stack. Components are
    /// returned in reverse topological order.
    pub fn strongly_connected_components(&self) -> Vec<Vec<NodeId>> {
        let n = self.graph.node_count();
        let mut counter: u32 = 0;
        let mut index = vec![UNVISITED; n];
        let mut lowlink = vec![0u32; n];
        let mut on_stack = vec![false; n];
        let mut stack: Vec<NodeId> = Vec::new();
        let mut call: Vec<Frame> = Vec::new();
        let mut sccs = Vec::new();

        for root in self.graph.node_ids() {
            if index[root.as_index()] != UNVISITED {
                continue;
            }
            index[root.as_index()] = counter;
            lowlink[root.as_index()] = counter;
            counter += 1;
            stack.push(root);
            on_stack[root.as_index()] = true;
            call.push(Frame { node: root, next: 0 });

            while let Some(frame) = call.last_mut() {
                let v = frame.node;
                let deps = self.graph.dependencies(v);
                if frame.next < deps.len() {
                    let w = deps[frame.next];
                    frame.next += 1;
                    if index[w.as_index()] == UNVISITED {
                        index[w.as_index()] = counter;
                        lowlink[w.as_index()] = counter;
                        counter += 1;
                        stack.push(w);
                        on_stack[w.as_index()] = true;
                        call.push(Frame { node: w, next: 0 });
                    } else if on_stack[w.as_index()] {
                        lowlink[v.as_index()] = lowlink[v.as_index()].min(index[w.as_index()]);
                    }
                    continue;
                }

                call.pop();
                if let Some(parent) = call.last() {
                    let p = parent.node.as_index();
                    lowlink[p] = lowlink[p].min(lowlink[v.as_index()]);
                }
                if lowlink[v.as_index()] == index[v.as_index()] {
                    let mut scc = Vec::new();
                    while let Some(w) = stack.pop() {
                        on_stack[w.as_index()] = false;
                        scc.push(w);
                        if w == v {
                            break;
                        }
                    }
                    sccs.push(scc);
                }
            }
        }
        sccs
    }

    /// Shortest walk from the smallest member back to itself, staying inside
    /// the component. Breadth-first with neighbours in coordinate order, so
    /// the choice among equally short walks is fixed.
    fn representative_path(
        &self,
        scc: &[NodeId],
        membership: &[Option<usize>],
        component: usize,
    ) -> Vec<NodeId> {
        let start = scc[0];
        let in_component = |id: NodeId| membership[id.as_index()] == Some(component);

        let mut parent: FxHashMap<NodeId, NodeId> = FxHashMap::default();
        let mut queue = VecDeque::from([start]);
        while let Some(u) = queue.pop_front() {
            if self.graph.dependencies(u).binary_search(&start).is_ok() {
                let mut path = vec![u];
                let mut cur = u;
                while let Some(&p) = parent.get(&cur) {
                    path.push(p);
                    cur = p;
                }
                path.reverse();
                path.push(start);
                return path;
            }
            for &w in self.graph.dependencies(u) {
                if w != start && in_component(w) && !parent.contains_key(&w) {
                    parent.insert(w, u);
                    queue.push_back(w);
                }
            }
        }
        vec![start]
    }
}
