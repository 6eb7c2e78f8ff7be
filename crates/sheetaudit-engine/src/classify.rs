//! Error classification and propagation.
//!
//! Cycle members are seeded with `CircularReference` up front. Every other
//! node is resolved by a Kahn worklist once all of its dependencies are, so
//! propagation depth is bounded by the worklist rather than the call stack.

use std::collections::{BTreeMap, VecDeque};

use sheetaudit_common::{CellCoord, ErrorClass, SeverityOrder};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::cycles::CycleSet;
use crate::findings::StructuralFinding;
use crate::graph::{DependencyGraph, NodeId};
use crate::workbook::{Cell, CellValue, DeclaredType, Workbook};

/// Where a cell's error class came from.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErrorOrigin {
    /// The cell's own formula or stored value.
    Local,
    /// Inherited from the dependency holding the winning class.
    Propagated { from: CellCoord },
    /// The cell is part of a circular reference.
    Circular,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassifiedCell {
    pub class: ErrorClass,
    /// `None` when the class is `ErrorClass::None`.
    pub origin: Option<ErrorOrigin>,
}

impl ClassifiedCell {
    pub const CLEAN: ClassifiedCell = ClassifiedCell {
        class: ErrorClass::None,
        origin: None,
    };

    pub fn is_error(&self) -> bool {
        self.class.is_error()
    }
}

/// Local classes per cell: the most severe class among the cell's own
/// findings, plus stored error values (a cell declared as an error holding
/// `#N/A` and the like). Cells without a local error are absent.
pub fn local_classes(
    workbook: &Workbook,
    findings: &[StructuralFinding],
    order: &SeverityOrder,
) -> BTreeMap<CellCoord, ErrorClass> {
    let mut local: BTreeMap<CellCoord, ErrorClass> = BTreeMap::new();
    for finding in findings.iter().filter(|f| f.class.is_error()) {
        let slot = local.entry(finding.cell.clone()).or_default();
        *slot = order.max(*slot, finding.class);
    }
    for (coord, cell) in workbook.cells() {
        if let Some(class) = stored_error(cell) {
            local.insert(coord, class);
        }
    }
    local
}

fn stored_error(cell: &Cell) -> Option<ErrorClass> {
    match (&cell.value, cell.declared_type) {
        (CellValue::Text(text), Some(DeclaredType::Error)) => ErrorClass::from_error_literal(text),
        _ => None,
    }
}

pub struct ErrorClassifier<'a> {
    graph: &'a DependencyGraph,
    cycles: &'a CycleSet,
    order: &'a SeverityOrder,
}

impl<'a> ErrorClassifier<'a> {
    pub fn new(graph: &'a DependencyGraph, cycles: &'a CycleSet, order: &'a SeverityOrder) -> Self {
        Self {
            graph,
            cycles,
            order,
        }
    }

    /// Class of every graph node, indexed by [`NodeId`].
    pub fn classify_nodes(&self, local: &BTreeMap<CellCoord, ErrorClass>) -> Vec<ClassifiedCell> {
        #[cfg(feature = "tracing")]
        let _span = tracing::info_span!("classify_errors", nodes = self.graph.node_count()).entered();

        let n = self.graph.node_count();
        let mut resolved: Vec<Option<ClassifiedCell>> = vec![None; n];
        let mut pending = vec![0usize; n];
        let mut queue = VecDeque::new();

        for id in self.graph.node_ids() {
            if self.cycles.is_cyclic(id) {
                resolved[id.as_index()] = Some(ClassifiedCell {
                    class: ErrorClass::CircularReference,
                    origin: Some(ErrorOrigin::Circular),
                });
            }
        }
        for id in self.graph.node_ids() {
            if resolved[id.as_index()].is_some() {
                continue;
            }
            pending[id.as_index()] = self
                .graph
                .dependencies(id)
                .iter()
                .filter(|dep| resolved[dep.as_index()].is_none())
                .count();
            if pending[id.as_index()] == 0 {
                queue.push_back(id);
            }
        }

        while let Some(id) = queue.pop_front() {
            let local_class = local
                .get(self.graph.coord(id))
                .copied()
                .unwrap_or_default();
            let cell = self.combine(id, local_class, &resolved);
            resolved[id.as_index()] = Some(cell);

            for &dependent in self.graph.dependents(id) {
                if resolved[dependent.as_index()].is_some() {
                    continue;
                }
                let slot = &mut pending[dependent.as_index()];
                *slot = slot.saturating_sub(1);
                if *slot == 0 {
                    queue.push_back(dependent);
                }
            }
        }

        let classes: Vec<ClassifiedCell> = resolved
            .into_iter()
            .map(|c| c.unwrap_or(ClassifiedCell::CLEAN))
            .collect();

        #[cfg(feature = "tracing")]
        tracing::debug!(
            errored = classes.iter().filter(|c| c.is_error()).count(),
            "error classes resolved"
        );

        classes
    }

    /// Combine a node's local class with the worst resolved dependency.
    /// Dependencies are in coordinate order, so the smallest coordinate wins
    /// ties; the local class wins ties against inherited ones.
    fn combine(
        &self,
        id: NodeId,
        local: ErrorClass,
        resolved: &[Option<ClassifiedCell>],
    ) -> ClassifiedCell {
        let mut inherited = ErrorClass::None;
        let mut from: Option<NodeId> = None;
        for &dep in self.graph.dependencies(id) {
            let class = resolved[dep.as_index()]
                .as_ref()
                .map(|c| c.class)
                .unwrap_or_default();
            if self.order.rank(class) > self.order.rank(inherited) {
                inherited = class;
                from = Some(dep);
            }
        }

        let class = self.order.max(local, inherited);
        let origin = if !class.is_error() {
            None
        } else if class == local {
            Some(ErrorOrigin::Local)
        } else {
            from.map(|dep| ErrorOrigin::Propagated {
                from: self.graph.coord(dep).clone(),
            })
        };
        ClassifiedCell { class, origin }
    }

    /// Classes for every present cell of the workbook. Cells outside the
    /// graph only carry their stored error, if any.
    pub fn classify(
        &self,
        workbook: &Workbook,
        local: &BTreeMap<CellCoord, ErrorClass>,
    ) -> BTreeMap<CellCoord, ClassifiedCell> {
        let nodes = self.classify_nodes(local);
        let mut out = BTreeMap::new();
        for (coord, _) in workbook.cells() {
            let classified = match self.graph.id(&coord) {
                Some(id) => nodes[id.as_index()].clone(),
                None => match local.get(&coord) {
                    Some(&class) if class.is_error() => ClassifiedCell {
                        class,
                        origin: Some(ErrorOrigin::Local),
                    },
                    _ => ClassifiedCell::CLEAN,
                },
            };
            out.insert(coord, classified);
        }
        out
    }
}
