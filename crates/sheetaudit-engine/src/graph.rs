//! Dependency graph over cell coordinates.
//!
//! Nodes are identified by a dense [`NodeId`] index rather than by links
//! between cells, so cycles are ordinary data. Node ids follow coordinate
//! order, which makes every traversal that walks ids in order deterministic.

use std::collections::{BTreeMap, BTreeSet};

use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use sheetaudit_common::{CellCoord, ErrorClass};
use sheetaudit_parse::{Rect, ReferenceType};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::findings::{StructuralFinding, StructuralKind};
use crate::formulas::FormulaSet;
use crate::workbook::Workbook;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    #[inline]
    pub fn as_index(self) -> usize {
        self.0 as usize
    }
}

/// One "depends on" edge: `from`'s value depends on `to`'s value.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Edge {
    pub from: CellCoord,
    pub to: CellCoord,
}

#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: Vec<CellCoord>,
    index: FxHashMap<CellCoord, NodeId>,
    /// Outgoing edges, sorted and deduplicated.
    dependencies: Vec<SmallVec<[NodeId; 4]>>,
    /// Incoming edges, sorted and deduplicated.
    dependents: Vec<SmallVec<[NodeId; 4]>>,
    formula: Vec<bool>,
    edge_count: usize,
}

impl DependencyGraph {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All node ids in coordinate order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len() as u32).map(NodeId)
    }

    pub fn coord(&self, id: NodeId) -> &CellCoord {
        &self.nodes[id.as_index()]
    }

    pub fn id(&self, coord: &CellCoord) -> Option<NodeId> {
        self.index.get(coord).copied()
    }

    pub fn contains(&self, coord: &CellCoord) -> bool {
        self.index.contains_key(coord)
    }

    pub fn dependencies(&self, id: NodeId) -> &[NodeId] {
        &self.dependencies[id.as_index()]
    }

    pub fn dependents(&self, id: NodeId) -> &[NodeId] {
        &self.dependents[id.as_index()]
    }

    pub fn is_formula(&self, id: NodeId) -> bool {
        self.formula[id.as_index()]
    }

    pub fn has_self_loop(&self, id: NodeId) -> bool {
        self.dependencies(id).binary_search(&id).is_ok()
    }

    pub fn has_edge(&self, from: &CellCoord, to: &CellCoord) -> bool {
        match (self.id(from), self.id(to)) {
            (Some(a), Some(b)) => self.dependencies(a).binary_search(&b).is_ok(),
            _ => false,
        }
    }

    /// Every edge, ordered by source then target coordinate.
    pub fn edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.node_ids().flat_map(move |from| {
            self.dependencies(from).iter().map(move |&to| Edge {
                from: self.coord(from).clone(),
                to: self.coord(to).clone(),
            })
        })
    }

    fn from_adjacency(adjacency: BTreeMap<CellCoord, BTreeSet<CellCoord>>, formulas: &FormulaSet) -> Self {
        let mut all: BTreeSet<&CellCoord> = adjacency.keys().collect();
        all.extend(adjacency.values().flatten());

        let nodes: Vec<CellCoord> = all.into_iter().cloned().collect();
        let index: FxHashMap<CellCoord, NodeId> = nodes
            .iter()
            .enumerate()
            .map(|(i, c)| (c.clone(), NodeId(i as u32)))
            .collect();

        let mut dependencies = vec![SmallVec::new(); nodes.len()];
        let mut dependents: Vec<SmallVec<[NodeId; 4]>> = vec![SmallVec::new(); nodes.len()];
        let mut edge_count = 0;
        for (from, targets) in &adjacency {
            let from_id = index[from];
            for to in targets {
                let to_id = index[to];
                dependencies[from_id.as_index()].push(to_id);
                dependents[to_id.as_index()].push(from_id);
                edge_count += 1;
            }
        }
        // Targets come out of a BTreeSet in coordinate order, which is id
        // order; dependents are pushed in ascending source order.
        let formula = nodes.iter().map(|c| formulas.contains_key(c)).collect();

        DependencyGraph {
            nodes,
            index,
            dependencies,
            dependents,
            formula,
            edge_count,
        }
    }
}

/// Resolves parsed references against the workbook and builds the graph.
pub struct GraphBuilder<'a> {
    workbook: &'a Workbook,
    findings: Vec<StructuralFinding>,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(workbook: &'a Workbook) -> Self {
        Self {
            workbook,
            findings: Vec::new(),
        }
    }

    /// Build the graph. Returned findings cover references that could not be
    /// turned into edges (missing sheets, undefined names, other workbooks).
    pub fn build(mut self, formulas: &FormulaSet) -> (DependencyGraph, Vec<StructuralFinding>) {
        #[cfg(feature = "tracing")]
        let _span = tracing::info_span!("build_graph", formulas = formulas.len()).entered();

        let mut adjacency: BTreeMap<CellCoord, BTreeSet<CellCoord>> = BTreeMap::new();
        for (coord, parsed) in formulas {
            let mut targets = BTreeSet::new();
            for reference in parsed.references() {
                self.resolve(coord, reference, &mut targets);
            }
            adjacency.insert(coord.clone(), targets);
        }

        let graph = DependencyGraph::from_adjacency(adjacency, formulas);

        #[cfg(feature = "tracing")]
        tracing::debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            unresolved = self.findings.len(),
            "dependency graph built"
        );

        (graph, self.findings)
    }

    fn resolve(
        &mut self,
        source: &CellCoord,
        reference: &ReferenceType,
        targets: &mut BTreeSet<CellCoord>,
    ) {
        match reference {
            ReferenceType::Cell { .. } | ReferenceType::Range { .. } => {
                if let Some(rect) = reference.rect() {
                    self.expand(source, reference.sheet(), rect, reference, targets);
                }
            }
            ReferenceType::NamedRange(name) => match self.workbook.defined_name(name) {
                Some(defined) => {
                    let target = defined.target.clone();
                    if let Some(rect) = target.rect() {
                        self.expand(source, target.sheet(), rect, &target, targets);
                    }
                }
                None => self.findings.push(StructuralFinding::new(
                    source.clone(),
                    StructuralKind::UndefinedName,
                    ErrorClass::UnresolvedReference,
                    format!("'{name}' is not a defined name"),
                )),
            },
            ReferenceType::External { book, .. } => self.findings.push(StructuralFinding::new(
                source.clone(),
                StructuralKind::ExternalReference,
                ErrorClass::None,
                format!("{reference} points into external workbook '{book}'"),
            )),
        }
    }

    /// Add an edge to every non-empty cell of `rect` on the named sheet (or
    /// the source's own sheet).
    fn expand(
        &mut self,
        source: &CellCoord,
        sheet: Option<&str>,
        rect: Rect,
        reference: &ReferenceType,
        targets: &mut BTreeSet<CellCoord>,
    ) {
        let sheet_name = sheet.unwrap_or(&source.sheet);
        let Some(sheet) = self.workbook.sheet(sheet_name) else {
            self.findings.push(StructuralFinding::new(
                source.clone(),
                StructuralKind::UnresolvedSheet,
                ErrorClass::UnresolvedReference,
                format!("{reference} names sheet '{sheet_name}', which does not exist"),
            ));
            return;
        };
        for ((row, col), cell) in sheet.cells_in(rect) {
            if !cell.value.is_empty() {
                targets.insert(CellCoord::new(sheet.name(), row, col));
            }
        }
    }
}
