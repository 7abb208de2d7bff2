use anyhow::{Context, Result};
use regex::Regex;

use crate::config::CustomRuleConfig;
use crate::graph::{DependencyGraph, DependencyNode};
use crate::types::{ArchitectureViolation, ViolationKind};

/// A custom deny rule with its patterns compiled. Keeps the originating
/// config so violations carry the rule's name, severity, and message.
#[derive(Debug)]
pub struct CompiledCustomRule {
    rule: CustomRuleConfig,
    from: Regex,
    to: Regex,
}

impl CompiledCustomRule {
    pub fn compile(rule: &CustomRuleConfig) -> Result<Self> {
        let compile = |field: &str, pattern: &str| {
            Regex::new(pattern)
                .with_context(|| format!("rule '{}': invalid {field} '{pattern}'", rule.name))
        };
        Ok(Self {
            from: compile("from_pattern", &rule.from_pattern)?,
            to: compile("to_pattern", &rule.to_pattern)?,
            rule: rule.clone(),
        })
    }

    pub fn name(&self) -> &str {
        &self.rule.name
    }

    fn matches(&self, from_id: &str, to_id: &str) -> bool {
        self.from.is_match(from_id) && self.to.is_match(to_id)
    }

    fn violation(&self, src: &DependencyNode, tgt: &DependencyNode) -> ArchitectureViolation {
        let message = self.rule.message.clone().unwrap_or_else(|| {
            format!(
                "custom rule '{}' violated: {} -> {}",
                self.rule.name, src.id, tgt.id
            )
        });
        ArchitectureViolation {
            kind: ViolationKind::CustomRule {
                rule: self.rule.name.clone(),
            },
            from_class: src.id.clone(),
            to_class: tgt.id.clone(),
            severity: self.rule.severity,
            message,
            suggestion: Some(format!(
                "This dependency is forbidden by custom rule '{}'.",
                self.rule.name
            )),
        }
    }
}

/// Compile every configured rule, failing on the first bad pattern.
pub fn compile_rules(rules: &[CustomRuleConfig]) -> Result<Vec<CompiledCustomRule>> {
    rules.iter().map(CompiledCustomRule::compile).collect()
}

/// Match every edge's node-id pair against every rule.
pub fn evaluate_custom_rules(
    graph: &DependencyGraph,
    rules: &[CompiledCustomRule],
) -> Vec<ArchitectureViolation> {
    let mut violations = Vec::new();
    for (src, tgt, _) in graph.edges_with_nodes() {
        violations.extend(
            rules
                .iter()
                .filter(|rule| rule.matches(&src.id.0, &tgt.id.0))
                .map(|rule| rule.violation(src, tgt)),
        );
    }
    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::EdgeKind;
    use crate::types::{DeclKind, NodeId, Severity, SourceLang};

    fn rule(name: &str, from: &str, to: &str) -> CustomRuleConfig {
        CustomRuleConfig {
            name: name.to_string(),
            from_pattern: from.to_string(),
            to_pattern: to.to_string(),
            severity: Severity::Error,
            message: None,
        }
    }

    fn graph_with_edge(from: &str, to: &str) -> DependencyGraph {
        let mut graph = DependencyGraph::new();
        for id in [from, to] {
            graph.add_node(DependencyNode {
                id: NodeId(id.to_string()),
                class_name: id.rsplit('.').next().unwrap_or(id).to_string(),
                package: String::new(),
                language: SourceLang::Java,
                kind: DeclKind::Class,
                layer: None,
            });
        }
        graph.add_edge(
            &NodeId(from.to_string()),
            &NodeId(to.to_string()),
            EdgeKind::Usage,
        );
        graph
    }

    #[test]
    fn test_compile_and_evaluate() {
        let rules =
            compile_rules(&[rule("no-web-in-domain", r".*\.domain\..*", r".*\.web\..*")]).unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].name(), "no-web-in-domain");

        let graph = graph_with_edge("com.shop.domain.Order", "com.shop.web.HttpClient");
        let violations = evaluate_custom_rules(&graph, &rules);

        assert_eq!(violations.len(), 1);
        assert!(matches!(
            violations[0].kind,
            ViolationKind::CustomRule { .. }
        ));
        assert_eq!(violations[0].severity, Severity::Error);
    }

    #[test]
    fn test_no_match_no_violation() {
        let rules =
            compile_rules(&[rule("no-web-in-domain", r".*\.domain\..*", r".*\.web\..*")]).unwrap();
        let graph = graph_with_edge("com.shop.domain.Order", "com.shop.domain.OrderLine");
        assert!(evaluate_custom_rules(&graph, &rules).is_empty());
    }

    #[test]
    fn test_invalid_pattern_errors() {
        let result = compile_rules(&[rule("broken", "(", ".*")]);
        let err = format!("{:#}", result.unwrap_err());
        assert!(err.contains("broken"));
        assert!(err.contains("from_pattern"));
    }
}
