use std::collections::HashMap;

use log::debug;
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};

use crate::index::DeclarationIndex;
use crate::types::{DeclKind, DeclarationRef, Diagnostic, DiagnosticKind, LayerKind, NodeId, SourceLang};

/// Node in the dependency graph, one per declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyNode {
    pub id: NodeId,
    pub class_name: String,
    pub package: String,
    pub language: SourceLang,
    pub kind: DeclKind,
    pub layer: Option<LayerKind>,
}

/// Typed edge between two declarations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    Inheritance,
    Composition,
    Usage,
}

impl EdgeKind {
    /// Coupling weight hint: inheritance binds tighter than composition,
    /// composition tighter than plain usage.
    pub fn strength(&self) -> u32 {
        match self {
            EdgeKind::Inheritance => 3,
            EdgeKind::Composition => 2,
            EdgeKind::Usage => 1,
        }
    }
}

/// Edge payload. Repeated references between the same pair with the same
/// kind are merged into one edge with accumulated strength.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub kind: EdgeKind,
    pub strength: u32,
}

/// Directed dependency graph over declarations.
pub struct DependencyGraph {
    graph: DiGraph<DependencyNode, DependencyEdge>,
    index: HashMap<NodeId, NodeIndex>,
    edge_index: HashMap<(NodeIndex, NodeIndex, EdgeKind), EdgeIndex>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            index: HashMap::new(),
            edge_index: HashMap::new(),
        }
    }

    /// Add a node. Returns the existing index if the id is already present.
    pub fn add_node(&mut self, node: DependencyNode) -> NodeIndex {
        if let Some(&idx) = self.index.get(&node.id) {
            return idx;
        }
        let id = node.id.clone();
        let idx = self.graph.add_node(node);
        self.index.insert(id, idx);
        idx
    }

    /// Add a typed edge between existing nodes. Duplicate (from, to, kind)
    /// edges accumulate strength instead of multiplying. Returns false if
    /// either endpoint is missing.
    pub fn add_edge(&mut self, from: &NodeId, to: &NodeId, kind: EdgeKind) -> bool {
        let (Some(&from_idx), Some(&to_idx)) = (self.index.get(from), self.index.get(to)) else {
            return false;
        };
        match self.edge_index.get(&(from_idx, to_idx, kind)) {
            Some(&edge_idx) => {
                self.graph[edge_idx].strength += kind.strength();
            }
            None => {
                let edge_idx = self.graph.add_edge(
                    from_idx,
                    to_idx,
                    DependencyEdge {
                        kind,
                        strength: kind.strength(),
                    },
                );
                self.edge_index.insert((from_idx, to_idx, kind), edge_idx);
            }
        }
        true
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.index.contains_key(id)
    }

    pub fn node(&self, id: &NodeId) -> Option<&DependencyNode> {
        self.index.get(id).map(|&idx| &self.graph[idx])
    }

    pub fn nodes(&self) -> impl Iterator<Item = &DependencyNode> {
        self.graph.node_weights()
    }

    /// Set the inferred layer on a node.
    pub fn set_layer(&mut self, id: &NodeId, layer: Option<LayerKind>) {
        if let Some(&idx) = self.index.get(id) {
            self.graph[idx].layer = layer;
        }
    }

    /// Iterate over all edges with their source and target nodes.
    pub fn edges_with_nodes(&self) -> Vec<(&DependencyNode, &DependencyNode, &DependencyEdge)> {
        self.graph
            .edge_references()
            .map(|e| {
                let src = &self.graph[e.source()];
                let tgt = &self.graph[e.target()];
                (src, tgt, e.weight())
            })
            .collect()
    }

    pub(crate) fn inner(&self) -> &DiGraph<DependencyNode, DependencyEdge> {
        &self.graph
    }
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds the dependency graph from a declaration index. All nodes are
/// created before any edge so that resolution always sees the whole index.
pub struct DependencyGraphBuilder<'a> {
    index: &'a DeclarationIndex,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> DependencyGraphBuilder<'a> {
    pub fn new(index: &'a DeclarationIndex) -> Self {
        Self {
            index,
            diagnostics: Vec::new(),
        }
    }

    pub fn build(mut self) -> (DependencyGraph, Vec<Diagnostic>) {
        let mut graph = DependencyGraph::new();
        let index = self.index;

        for decl in index.iter() {
            graph.add_node(DependencyNode {
                id: decl.node_id(),
                class_name: decl.simple_name().to_string(),
                package: decl.package().to_string(),
                language: decl.language,
                kind: decl.kind,
                layer: None,
            });
        }

        for decl in index.iter() {
            let from = decl.node_id();

            for supertype in &decl.supertypes {
                self.link(&mut graph, &from, decl, supertype, EdgeKind::Inheritance);
            }
            for field in &decl.fields {
                self.link(&mut graph, &from, decl, &field.type_text, EdgeKind::Composition);
            }
            for method in &decl.methods {
                for param in &method.param_types {
                    self.link(&mut graph, &from, decl, param, EdgeKind::Usage);
                }
                self.link(&mut graph, &from, decl, &method.return_type, EdgeKind::Usage);
            }
        }

        (graph, self.diagnostics)
    }

    /// Resolve `raw` and add an edge if it names a known declaration.
    /// Unresolved references are dropped silently.
    fn link(
        &mut self,
        graph: &mut DependencyGraph,
        from: &NodeId,
        decl: &DeclarationRef,
        raw: &str,
        kind: EdgeKind,
    ) {
        let index = self.index;
        let Some(resolution) = index.resolve(raw, decl) else {
            return;
        };
        if resolution.ambiguous {
            debug!(
                "ambiguous reference '{raw}' in {}, resolved to {}",
                decl.qualified_name, resolution.decl.qualified_name
            );
            self.diagnostics.push(Diagnostic {
                kind: DiagnosticKind::AmbiguousReference,
                subject: decl.qualified_name.clone(),
                detail: format!(
                    "'{raw}' matched multiple declarations, using {}",
                    resolution.decl.qualified_name
                ),
            });
        }
        graph.add_edge(from, &resolution.decl.node_id(), kind);
    }
}
