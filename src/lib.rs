pub mod analysis;
pub mod config;
pub mod custom_rules;
pub mod cycles;
pub mod ddd;
pub mod graph;
pub mod index;
pub mod layers;
pub mod pattern;
pub mod types;

pub use analysis::{analyze, ArchitectureAnalysisResult, ArchitectureAnalyzer};
pub use config::AnalysisConfig;
pub use cycles::{CycleSeverity, DependencyCycle};
pub use ddd::{DddAnalysis, DddRoleDetector};
pub use graph::{DependencyGraph, EdgeKind};
pub use index::DeclarationIndex;
pub use layers::LayerClassifier;
pub use pattern::ArchitecturePattern;
pub use types::*;
