use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::types::Severity;

/// Top-level configuration from `.strata.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub layers: LayerNamingConfig,
    #[serde(default)]
    pub ddd: DddConfig,
    #[serde(default)]
    pub rules: RulesConfig,
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,
}

/// Package-name keywords mapping declarations to architectural layers.
/// A keyword matches when a dot-separated package segment starts with it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerNamingConfig {
    #[serde(default = "default_presentation_keywords")]
    pub presentation: Vec<String>,
    #[serde(default = "default_application_keywords")]
    pub application: Vec<String>,
    #[serde(default = "default_domain_keywords")]
    pub domain: Vec<String>,
    #[serde(default = "default_data_keywords")]
    pub data: Vec<String>,
    #[serde(default = "default_infrastructure_keywords")]
    pub infrastructure: Vec<String>,
}

fn default_presentation_keywords() -> Vec<String> {
    ["presentation", "controller", "api", "web"]
        .map(String::from)
        .to_vec()
}

fn default_application_keywords() -> Vec<String> {
    ["application", "service"].map(String::from).to_vec()
}

fn default_domain_keywords() -> Vec<String> {
    ["domain", "model"].map(String::from).to_vec()
}

fn default_data_keywords() -> Vec<String> {
    ["repository", "dao", "data", "persistence"]
        .map(String::from)
        .to_vec()
}

fn default_infrastructure_keywords() -> Vec<String> {
    ["infrastructure", "config"].map(String::from).to_vec()
}

impl Default for LayerNamingConfig {
    fn default() -> Self {
        Self {
            presentation: default_presentation_keywords(),
            application: default_application_keywords(),
            domain: default_domain_keywords(),
            data: default_data_keywords(),
            infrastructure: default_infrastructure_keywords(),
        }
    }
}

/// Thresholds and path patterns for DDD role detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DddConfig {
    /// Minimum confidence for a role to appear in the result.
    #[serde(default = "default_report_threshold")]
    pub report_threshold: f64,
    /// Minimum entity confidence for the aggregate pass.
    #[serde(default = "default_aggregate_root_threshold")]
    pub aggregate_root_threshold: f64,
    /// Glob patterns marking files as domain code.
    #[serde(default = "default_domain_paths")]
    pub domain_paths: Vec<String>,
}

fn default_report_threshold() -> f64 {
    0.3
}

fn default_aggregate_root_threshold() -> f64 {
    0.7
}

fn default_domain_paths() -> Vec<String> {
    vec!["**/domain/**".to_string(), "**/model/**".to_string()]
}

impl Default for DddConfig {
    fn default() -> Self {
        Self {
            report_threshold: default_report_threshold(),
            aggregate_root_threshold: default_aggregate_root_threshold(),
            domain_paths: default_domain_paths(),
        }
    }
}

/// A custom deny rule over node ids, matched by regex.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomRuleConfig {
    pub name: String,
    pub from_pattern: String,
    pub to_pattern: String,
    #[serde(default = "default_custom_rule_severity")]
    pub severity: Severity,
    #[serde(default)]
    pub message: Option<String>,
}

fn default_custom_rule_severity() -> Severity {
    Severity::Error
}

/// Violation severities and custom rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulesConfig {
    #[serde(default = "default_severities")]
    pub severities: HashMap<String, Severity>,
    #[serde(default)]
    pub custom_rules: Vec<CustomRuleConfig>,
}

fn default_severities() -> HashMap<String, Severity> {
    let mut m = HashMap::new();
    m.insert("layer_violation".to_string(), Severity::Error);
    m.insert("circular_dependency".to_string(), Severity::Error);
    m.insert("dependency_inversion".to_string(), Severity::Warning);
    m
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            severities: default_severities(),
            custom_rules: Vec::new(),
        }
    }
}

impl RulesConfig {
    pub fn severity_of(&self, kind: &str, fallback: Severity) -> Severity {
        self.severities.get(kind).copied().unwrap_or(fallback)
    }
}

/// Diagnostic collection. Skips and ambiguous references are always logged;
/// they are only included in the result when `collect` is set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiagnosticsConfig {
    #[serde(default)]
    pub collect: bool,
}

impl AnalysisConfig {
    /// Load configuration from a `.strata.toml` file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file '{}'", path.display()))?;
        let config: AnalysisConfig = toml::from_str(&content)
            .with_context(|| format!("failed to parse '{}'", path.display()))?;
        Ok(config)
    }

    /// Load from `.strata.toml` in the given directory or any ancestor, or
    /// return defaults.
    pub fn load_or_default(dir: &Path) -> Self {
        let start = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
        let mut current = start.as_path();
        loop {
            let config_path = current.join(".strata.toml");
            if config_path.exists() {
                return match Self::load(&config_path) {
                    Ok(config) => config,
                    Err(e) => {
                        log::warn!(
                            "failed to load config from '{}': {e:#}, using defaults",
                            config_path.display()
                        );
                        Self::default()
                    }
                };
            }
            match current.parent() {
                Some(parent) => current = parent,
                None => break,
            }
        }
        Self::default()
    }

    /// Generate default TOML content for a starter config file.
    pub fn default_toml() -> String {
        r#"# Strata - Architecture Analysis Configuration

[layers]
# Package-name keywords classifying declarations into layers
presentation = ["presentation", "controller", "api", "web"]
application = ["application", "service"]
domain = ["domain", "model"]
data = ["repository", "dao", "data", "persistence"]
infrastructure = ["infrastructure", "config"]

[ddd]
# Minimum confidence for a role to be reported
report_threshold = 0.3
# Minimum entity confidence to qualify as an aggregate root
aggregate_root_threshold = 0.7
domain_paths = ["**/domain/**", "**/model/**"]

[rules.severities]
layer_violation = "error"
circular_dependency = "error"
dependency_inversion = "warning"

# Custom deny rules over node ids, matched by regex.
# [[rules.custom_rules]]
# name = "no-web-in-domain"
# from_pattern = ".*\\.domain\\..*"
# to_pattern = ".*\\.web\\..*"
# severity = "error"

[diagnostics]
collect = false
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AnalysisConfig::default();
        assert!((config.ddd.report_threshold - 0.3).abs() < f64::EPSILON);
        assert!((config.ddd.aggregate_root_threshold - 0.7).abs() < f64::EPSILON);
        assert!(config.layers.domain.contains(&"domain".to_string()));
        assert!(!config.diagnostics.collect);
    }

    #[test]
    fn test_deserialize_config() {
        let toml_str = r#"
[layers]
presentation = ["rest"]
domain = ["core"]

[ddd]
report_threshold = 0.5

[rules.severities]
layer_violation = "warning"

[diagnostics]
collect = true
"#;
        let config: AnalysisConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.layers.presentation, vec!["rest"]);
        assert_eq!(config.layers.domain, vec!["core"]);
        // Omitted sections keep their defaults
        assert_eq!(config.layers.application, vec!["application", "service"]);
        assert!((config.ddd.report_threshold - 0.5).abs() < f64::EPSILON);
        assert_eq!(
            config.rules.severity_of("layer_violation", Severity::Error),
            Severity::Warning
        );
        assert!(config.diagnostics.collect);
    }

    #[test]
    fn test_default_toml_is_valid() {
        let toml_str = AnalysisConfig::default_toml();
        let config: AnalysisConfig = toml::from_str(&toml_str).unwrap();
        assert!((config.ddd.report_threshold - 0.3).abs() < f64::EPSILON);
    }

    #[test]
    fn test_custom_rules_parse() {
        let toml_str = r#"
[[rules.custom_rules]]
name = "no-web-in-domain"
from_pattern = ".*\\.domain\\..*"
to_pattern = ".*\\.web\\..*"
"#;
        let config: AnalysisConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.rules.custom_rules.len(), 1);
        assert_eq!(config.rules.custom_rules[0].name, "no-web-in-domain");
        assert_eq!(config.rules.custom_rules[0].severity, Severity::Error);
    }

    #[test]
    fn test_load_or_default_walks_ancestors() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("a/b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(
            tmp.path().join(".strata.toml"),
            "[ddd]\nreport_threshold = 0.6\n",
        )
        .unwrap();

        let config = AnalysisConfig::load_or_default(&nested);
        assert!((config.ddd.report_threshold - 0.6).abs() < f64::EPSILON);
    }

    #[test]
    fn test_load_missing_file_errors() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(AnalysisConfig::load(&tmp.path().join("missing.toml")).is_err());
    }
}
