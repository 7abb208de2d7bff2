use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::graph::DependencyGraph;
use crate::layers::{ArchitectureLayer, LayerDependency};
use crate::types::LayerKind;

/// Overall architecture pattern inferred from the layer set and the
/// aggregated inter-layer edge statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchitecturePattern {
    Layered,
    Hexagonal,
    Clean,
    Onion,
    Unknown,
}

impl std::fmt::Display for ArchitecturePattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArchitecturePattern::Layered => write!(f, "layered"),
            ArchitecturePattern::Hexagonal => write!(f, "hexagonal"),
            ArchitecturePattern::Clean => write!(f, "clean"),
            ArchitecturePattern::Onion => write!(f, "onion"),
            ArchitecturePattern::Unknown => write!(f, "unknown"),
        }
    }
}

pub struct ArchitecturePatternClassifier;

impl ArchitecturePatternClassifier {
    /// Decision order: hexagonal, clean, onion, layered, unknown.
    pub fn classify(
        layers: &[ArchitectureLayer],
        dependencies: &[LayerDependency],
        graph: &DependencyGraph,
    ) -> ArchitecturePattern {
        let present: HashSet<LayerKind> = layers.iter().map(|l| l.kind).collect();

        if has_port_adapter_markers(graph) && domain_outbound_layers(dependencies) <= 2 {
            return ArchitecturePattern::Hexagonal;
        }

        let has_use_cases = has_package_marker(graph, &["usecase", "interactor"]);
        if has_use_cases
            && present.contains(&LayerKind::Domain)
            && present.contains(&LayerKind::Infrastructure)
        {
            return ArchitecturePattern::Clean;
        }

        if present.contains(&LayerKind::Domain)
            && present.contains(&LayerKind::Application)
            && present.contains(&LayerKind::Infrastructure)
            && inward_edge_ratio(dependencies) >= 0.7
        {
            return ArchitecturePattern::Onion;
        }

        if present.len() >= 3 {
            return ArchitecturePattern::Layered;
        }

        ArchitecturePattern::Unknown
    }
}

fn has_port_adapter_markers(graph: &DependencyGraph) -> bool {
    has_package_marker(graph, &["port", "adapter"])
}

fn has_package_marker(graph: &DependencyGraph, markers: &[&str]) -> bool {
    // Prefix match: "adapters" counts as "adapter", "transport" is not "port"
    graph.nodes().any(|n| {
        let package = n.package.to_lowercase();
        package
            .split('.')
            .any(|seg| markers.iter().any(|m| seg.starts_with(m)))
    })
}

/// Number of distinct layers the domain layer depends on.
fn domain_outbound_layers(dependencies: &[LayerDependency]) -> usize {
    dependencies
        .iter()
        .filter(|d| d.from_layer == LayerKind::Domain)
        .map(|d| d.to_layer)
        .collect::<HashSet<_>>()
        .len()
}

/// Share of cross-layer edges pointing from the outermost ordinal toward
/// an inner one.
fn inward_edge_ratio(dependencies: &[LayerDependency]) -> f64 {
    let total: usize = dependencies.iter().map(|d| d.edge_count).sum();
    if total == 0 {
        return 0.0;
    }
    let inward: usize = dependencies
        .iter()
        .filter(|d| d.from_layer.level() == 4 && d.to_layer.level() < 4)
        .map(|d| d.edge_count)
        .sum();
    inward as f64 / total as f64
}
