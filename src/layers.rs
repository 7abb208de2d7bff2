use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::config::{AnalysisConfig, LayerNamingConfig};
use crate::cycles::DependencyCycle;
use crate::graph::DependencyGraph;
use crate::index::DeclarationIndex;
use crate::types::{
    ArchitectureViolation, DeclKind, LayerKind, NodeId, Severity, ViolationKind,
};

/// An inferred architectural layer with its member nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchitectureLayer {
    pub name: String,
    pub kind: LayerKind,
    pub level: u8,
    pub members: Vec<NodeId>,
}

/// Aggregated cross-layer dependency with its validity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerDependency {
    pub from_layer: LayerKind,
    pub to_layer: LayerKind,
    pub edge_count: usize,
    pub valid: bool,
}

/// Class-name suffixes checked when no package keyword matches.
const SUFFIX_RULES: &[(&str, LayerKind)] = &[
    ("Controller", LayerKind::Presentation),
    ("Endpoint", LayerKind::Presentation),
    ("Service", LayerKind::Application),
    ("Manager", LayerKind::Application),
    ("Repository", LayerKind::Data),
    ("DAO", LayerKind::Data),
    ("Entity", LayerKind::Domain),
    ("Model", LayerKind::Domain),
    ("Config", LayerKind::Infrastructure),
];

/// Assigns nodes to layers from naming conventions: package keywords first,
/// class-name suffix second, otherwise unclassified.
pub struct LayerClassifier {
    keywords: Vec<(LayerKind, Vec<String>)>,
}

impl LayerClassifier {
    pub fn new(config: &LayerNamingConfig) -> Self {
        let lower = |v: &[String]| v.iter().map(|s| s.to_lowercase()).collect();
        Self {
            keywords: vec![
                (LayerKind::Presentation, lower(&config.presentation)),
                (LayerKind::Application, lower(&config.application)),
                (LayerKind::Domain, lower(&config.domain)),
                (LayerKind::Data, lower(&config.data)),
                (LayerKind::Infrastructure, lower(&config.infrastructure)),
            ],
        }
    }

    /// Classify a single node by package and class name. A keyword matches
    /// a package segment by prefix, so "controllers" still counts as
    /// "controller" while "capital" does not count as "api".
    pub fn classify(&self, package: &str, class_name: &str) -> Option<LayerKind> {
        let package_lower = package.to_lowercase();
        let segments: Vec<&str> = package_lower.split('.').collect();
        for (layer, keywords) in &self.keywords {
            for keyword in keywords {
                if segments.iter().any(|seg| seg.starts_with(keyword.as_str())) {
                    return Some(*layer);
                }
            }
        }

        for (suffix, layer) in SUFFIX_RULES {
            if class_name.ends_with(suffix) {
                return Some(*layer);
            }
        }
        None
    }

    /// Annotate every node in the graph and return the populated layers.
    /// Unclassified nodes keep `layer = None` and belong to no layer.
    pub fn classify_graph(&self, graph: &mut DependencyGraph) -> Vec<ArchitectureLayer> {
        let assignments: Vec<(NodeId, Option<LayerKind>)> = graph
            .nodes()
            .map(|n| (n.id.clone(), self.classify(&n.package, &n.class_name)))
            .collect();

        let mut members: BTreeMap<u8, (LayerKind, Vec<NodeId>)> = BTreeMap::new();
        for (id, layer) in assignments {
            graph.set_layer(&id, layer);
            if let Some(kind) = layer {
                members
                    .entry(layer_sort_key(kind))
                    .or_insert_with(|| (kind, Vec::new()))
                    .1
                    .push(id);
            }
        }

        members
            .into_values()
            .map(|(kind, mut ids)| {
                ids.sort();
                ArchitectureLayer {
                    name: kind.to_string(),
                    kind,
                    level: kind.level(),
                    members: ids,
                }
            })
            .collect()
    }
}

/// Stable ordering for the layer list: by ordinal, data before
/// infrastructure within the shared level.
fn layer_sort_key(kind: LayerKind) -> u8 {
    match kind {
        LayerKind::Presentation => 1,
        LayerKind::Application => 2,
        LayerKind::Domain => 3,
        LayerKind::Data => 4,
        LayerKind::Infrastructure => 5,
    }
}

/// Checks every cross-layer edge against the allowed-direction policy and
/// turns cycles into violations.
pub struct LayerDependencyValidator<'a> {
    config: &'a AnalysisConfig,
}

impl<'a> LayerDependencyValidator<'a> {
    pub fn new(config: &'a AnalysisConfig) -> Self {
        Self { config }
    }

    /// Aggregate cross-layer edges into `LayerDependency` records. Edges
    /// with an unclassified endpoint cannot be judged and are excluded.
    pub fn layer_dependencies(&self, graph: &DependencyGraph) -> Vec<LayerDependency> {
        let mut counts: HashMap<(LayerKind, LayerKind), usize> = HashMap::new();
        for (src, tgt, _) in graph.edges_with_nodes() {
            let (Some(from), Some(to)) = (src.layer, tgt.layer) else {
                continue;
            };
            if from == to {
                continue;
            }
            *counts.entry((from, to)).or_insert(0) += 1;
        }

        let mut deps: Vec<LayerDependency> = counts
            .into_iter()
            .map(|((from, to), edge_count)| LayerDependency {
                from_layer: from,
                to_layer: to,
                edge_count,
                valid: from.allows_dependency_on(&to),
            })
            .collect();
        deps.sort_by_key(|d| (layer_sort_key(d.from_layer), layer_sort_key(d.to_layer)));
        deps
    }

    /// One violation per edge crossing layers in a disallowed direction,
    /// plus one per consecutive pair of every reported cycle.
    pub fn validate(
        &self,
        graph: &DependencyGraph,
        cycles: &[DependencyCycle],
    ) -> Vec<ArchitectureViolation> {
        let mut violations = Vec::new();
        self.check_layer_edges(graph, &mut violations);
        self.check_cycles(cycles, &mut violations);
        violations
    }

    fn check_layer_edges(&self, graph: &DependencyGraph, violations: &mut Vec<ArchitectureViolation>) {
        let severity = self
            .config
            .rules
            .severity_of("layer_violation", Severity::Error);

        for (src, tgt, _) in graph.edges_with_nodes() {
            let (Some(from_layer), Some(to_layer)) = (src.layer, tgt.layer) else {
                continue;
            };
            if from_layer == to_layer || from_layer.allows_dependency_on(&to_layer) {
                continue;
            }
            violations.push(ArchitectureViolation {
                kind: ViolationKind::LayerViolation {
                    from_layer,
                    to_layer,
                },
                from_class: src.id.clone(),
                to_class: tgt.id.clone(),
                severity,
                message: format!(
                    "{} ({from_layer}) depends on {} ({to_layer})",
                    src.class_name, tgt.class_name
                ),
                suggestion: Some(format!(
                    "The {from_layer} layer should not depend on the {to_layer} layer. \
                     Move the shared abstraction into the {from_layer} layer or invert the \
                     dependency through an interface."
                )),
            });
        }
    }

    fn check_cycles(&self, cycles: &[DependencyCycle], violations: &mut Vec<ArchitectureViolation>) {
        let severity = self
            .config
            .rules
            .severity_of("circular_dependency", Severity::Error);

        for cycle in cycles {
            if cycle.nodes.len() < 2 {
                continue;
            }
            let chain = cycle
                .nodes
                .iter()
                .map(|n| n.0.as_str())
                .collect::<Vec<_>>()
                .join(" -> ");
            for i in 0..cycle.nodes.len() {
                let from = &cycle.nodes[i];
                let to = &cycle.nodes[(i + 1) % cycle.nodes.len()];
                violations.push(ArchitectureViolation {
                    kind: ViolationKind::CircularDependency {
                        cycle: cycle.nodes.clone(),
                    },
                    from_class: from.clone(),
                    to_class: to.clone(),
                    severity,
                    message: format!("circular dependency: {chain}"),
                    suggestion: Some(
                        "Break the cycle by introducing an interface or reorganizing \
                         the dependencies."
                            .to_string(),
                    ),
                });
            }
        }
    }

    /// Presentation or application depending on a concrete data-layer class
    /// while the index holds an interface with a matching name suggests the
    /// dependency should be inverted.
    pub fn detect_dependency_inversions(
        &self,
        graph: &DependencyGraph,
        index: &DeclarationIndex,
    ) -> Vec<ArchitectureViolation> {
        let severity = self
            .config
            .rules
            .severity_of("dependency_inversion", Severity::Warning);

        let interfaces: Vec<&str> = index
            .iter()
            .filter(|d| d.kind == DeclKind::Interface)
            .map(|d| d.simple_name())
            .collect();

        let mut violations = Vec::new();
        for (src, tgt, _) in graph.edges_with_nodes() {
            let from_ok = matches!(
                src.layer,
                Some(LayerKind::Presentation) | Some(LayerKind::Application)
            );
            if !from_ok || tgt.layer != Some(LayerKind::Data) || tgt.kind != DeclKind::Class {
                continue;
            }
            let Some(interface) = interfaces
                .iter()
                .find(|name| tgt.class_name.contains(*name) && **name != tgt.class_name)
            else {
                continue;
            };
            violations.push(ArchitectureViolation {
                kind: ViolationKind::DependencyInversion {
                    concrete: tgt.class_name.clone(),
                    interface: interface.to_string(),
                },
                from_class: src.id.clone(),
                to_class: tgt.id.clone(),
                severity,
                message: format!(
                    "{} depends on concrete class {} although interface {} exists",
                    src.class_name, tgt.class_name, interface
                ),
                suggestion: Some(format!(
                    "Depend on the {interface} interface instead of the concrete \
                     {} implementation.",
                    tgt.class_name
                )),
            });
        }
        violations
    }
}
