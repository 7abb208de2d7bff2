use std::collections::BTreeMap;

use anyhow::Result;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::config::AnalysisConfig;
use crate::custom_rules::{compile_rules, evaluate_custom_rules, CompiledCustomRule};
use crate::cycles::{CycleDetector, DependencyCycle};
use crate::ddd::{DddAnalysis, DddRoleDetector};
use crate::graph::{DependencyGraph, DependencyGraphBuilder, DependencyNode, EdgeKind};
use crate::index::DeclarationIndex;
use crate::layers::{ArchitectureLayer, LayerClassifier, LayerDependency, LayerDependencyValidator};
use crate::pattern::{ArchitecturePattern, ArchitecturePatternClassifier};
use crate::types::{ArchitectureViolation, DeclarationRef, Diagnostic};

/// Flat edge record for reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub from: String,
    pub to: String,
    pub kind: EdgeKind,
    pub strength: u32,
}

/// Per-package statistics over the dependency graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageSummary {
    pub package: String,
    pub type_count: usize,
    pub internal_edges: usize,
    pub outgoing_edges: usize,
    pub incoming_edges: usize,
}

/// The dependency graph flattened for reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyGraphReport {
    pub nodes: Vec<DependencyNode>,
    pub edges: Vec<EdgeRecord>,
    pub cycles: Vec<DependencyCycle>,
    pub packages: Vec<PackageSummary>,
}

/// Layer inference, cross-layer edges, violations, and the inferred pattern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayeredArchitectureAnalysis {
    pub layers: Vec<ArchitectureLayer>,
    pub layer_dependencies: Vec<LayerDependency>,
    pub violations: Vec<ArchitectureViolation>,
    pub pattern: ArchitecturePattern,
}

/// Complete analysis result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchitectureAnalysisResult {
    pub graph: DependencyGraphReport,
    pub layering: LayeredArchitectureAnalysis,
    pub ddd: DddAnalysis,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

/// Runs the full pipeline: index, graph, cycles, layers, violations,
/// pattern, and DDD roles.
pub struct ArchitectureAnalyzer {
    config: AnalysisConfig,
    rules: Vec<CompiledCustomRule>,
}

impl ArchitectureAnalyzer {
    /// Compiles the configured custom rules up front; a bad pattern is the
    /// only way to fail, and it fails here, not during analysis.
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        let rules = compile_rules(&config.rules.custom_rules)?;
        Ok(Self { config, rules })
    }

    /// Analysis itself cannot fail: malformed declarations are skipped and
    /// recorded as diagnostics, never raised.
    pub fn analyze(&self, declarations: &[DeclarationRef]) -> ArchitectureAnalysisResult {
        let index = DeclarationIndex::build(declarations);
        info!(
            "analyzing {} declarations ({} skipped)",
            index.len(),
            declarations.len() - index.len()
        );

        let mut diagnostics: Vec<Diagnostic> = index.diagnostics().to_vec();

        let (mut graph, graph_diagnostics) = DependencyGraphBuilder::new(&index).build();
        diagnostics.extend(graph_diagnostics);
        debug!(
            "graph built: {} nodes, {} edges",
            graph.node_count(),
            graph.edge_count()
        );

        let classifier = LayerClassifier::new(&self.config.layers);
        let layers = classifier.classify_graph(&mut graph);

        let cycles = CycleDetector::detect(&graph);
        debug!("{} cycles detected", cycles.len());

        let validator = LayerDependencyValidator::new(&self.config);
        let layer_dependencies = validator.layer_dependencies(&graph);
        let mut violations = validator.validate(&graph, &cycles);
        violations.extend(validator.detect_dependency_inversions(&graph, &index));
        violations.extend(evaluate_custom_rules(&graph, &self.rules));

        let pattern = ArchitecturePatternClassifier::classify(&layers, &layer_dependencies, &graph);

        let ddd = DddRoleDetector::new(&index, &self.config.ddd).detect();

        ArchitectureAnalysisResult {
            graph: graph_report(&graph, cycles),
            layering: LayeredArchitectureAnalysis {
                layers,
                layer_dependencies,
                violations,
                pattern,
            },
            ddd,
            diagnostics: if self.config.diagnostics.collect {
                diagnostics
            } else {
                Vec::new()
            },
        }
    }
}

/// Analyze with default configuration. The default config carries no custom
/// rules, so there is nothing to compile and nothing to fail.
pub fn analyze(declarations: &[DeclarationRef]) -> ArchitectureAnalysisResult {
    ArchitectureAnalyzer {
        config: AnalysisConfig::default(),
        rules: Vec::new(),
    }
    .analyze(declarations)
}

fn graph_report(graph: &DependencyGraph, cycles: Vec<DependencyCycle>) -> DependencyGraphReport {
    let mut nodes: Vec<DependencyNode> = graph.nodes().cloned().collect();
    nodes.sort_by(|a, b| a.id.cmp(&b.id));

    let mut edges: Vec<EdgeRecord> = graph
        .edges_with_nodes()
        .iter()
        .map(|(src, tgt, edge)| EdgeRecord {
            from: src.id.0.clone(),
            to: tgt.id.0.clone(),
            kind: edge.kind,
            strength: edge.strength,
        })
        .collect();
    edges.sort_by(|a, b| (a.from.as_str(), a.to.as_str()).cmp(&(b.from.as_str(), b.to.as_str())));

    DependencyGraphReport {
        packages: package_summaries(graph),
        nodes,
        edges,
        cycles,
    }
}

fn package_summaries(graph: &DependencyGraph) -> Vec<PackageSummary> {
    let mut by_package: BTreeMap<String, PackageSummary> = BTreeMap::new();
    for node in graph.nodes() {
        by_package
            .entry(node.package.clone())
            .or_insert_with(|| PackageSummary {
                package: node.package.clone(),
                type_count: 0,
                internal_edges: 0,
                outgoing_edges: 0,
                incoming_edges: 0,
            })
            .type_count += 1;
    }

    for (src, tgt, _) in graph.edges_with_nodes() {
        if src.package == tgt.package {
            if let Some(summary) = by_package.get_mut(&src.package) {
                summary.internal_edges += 1;
            }
            continue;
        }
        if let Some(summary) = by_package.get_mut(&src.package) {
            summary.outgoing_edges += 1;
        }
        if let Some(summary) = by_package.get_mut(&tgt.package) {
            summary.incoming_edges += 1;
        }
    }

    by_package.into_values().collect()
}
