use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};

use crate::config::DddConfig;
use crate::index::DeclarationIndex;
use crate::types::{DeclKind, DeclarationRef};

/// A declaration recognized as a DDD entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DddEntity {
    pub class_name: String,
    pub file_name: String,
    pub has_unique_id: bool,
    pub has_mutable_state: bool,
    pub has_custom_equality: bool,
    pub confidence: f64,
}

/// A declaration recognized as a value object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DddValueObject {
    pub class_name: String,
    pub file_name: String,
    pub is_immutable: bool,
    pub has_value_equality: bool,
    pub confidence: f64,
}

/// A declaration recognized as a domain or application service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DddService {
    pub class_name: String,
    pub file_name: String,
    pub is_stateless: bool,
    pub is_interface: bool,
    pub confidence: f64,
}

/// A declaration recognized as a repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DddRepository {
    pub class_name: String,
    pub file_name: String,
    pub is_interface: bool,
    pub crud_method_count: usize,
    pub confidence: f64,
}

/// A declaration recognized as a domain event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DddDomainEvent {
    pub class_name: String,
    pub file_name: String,
    pub is_immutable: bool,
    pub has_timestamp: bool,
    pub confidence: f64,
}

/// A root entity together with the entities it owns through its fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DddAggregate {
    pub root_entity: String,
    pub related_entities: Vec<String>,
    pub confidence: f64,
}

/// All detected DDD roles, thresholded by the configured minimum confidence.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DddAnalysis {
    pub entities: Vec<DddEntity>,
    pub value_objects: Vec<DddValueObject>,
    pub services: Vec<DddService>,
    pub repositories: Vec<DddRepository>,
    pub domain_events: Vec<DddDomainEvent>,
    pub aggregates: Vec<DddAggregate>,
}

/// Raw role scores for one declaration, before thresholding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleScores {
    pub class_name: String,
    pub entity: f64,
    pub value_object: f64,
    pub service: f64,
    pub repository: f64,
    pub domain_event: f64,
}

const LIFECYCLE_VERBS: &[&str] = &["create", "update", "delete", "save", "activate", "deactivate"];

const BUSINESS_VERBS: &[&str] = &[
    "calculate",
    "validate",
    "process",
    "handle",
    "execute",
    "apply",
    "transform",
    "convert",
];

const MUTATOR_PREFIXES: &[&str] = &["set", "add", "remove", "clear", "put"];

const INJECTED_SUFFIXES: &[&str] = &[
    "service",
    "repository",
    "client",
    "gateway",
    "factory",
    "provider",
    "dao",
];

const TIMESTAMP_TYPES: &[&str] = &[
    "instant",
    "localdatetime",
    "localdate",
    "offsetdatetime",
    "zoneddatetime",
    "date",
    "timestamp",
];

/// Derived facts about one declaration. Computed once, shared by every
/// role rule so the rules themselves stay table-shaped.
struct DeclFacts<'a> {
    decl: &'a DeclarationRef,
    name_lower: String,
    package_lower: String,
    markers: Vec<String>,
    method_names: Vec<String>,
    has_mutable_field: bool,
    all_fields_immutable: bool,
    has_id_field: bool,
    has_orm_marker: bool,
    has_custom_equality: bool,
    has_timestamp_field: bool,
    has_lifecycle_method: bool,
    has_business_method: bool,
    is_interface: bool,
    is_abstract: bool,
    is_value_construct: bool,
    in_domain_path: bool,
    has_constructor_params: bool,
    injected_fields_only: bool,
    has_repository_supertype: bool,
}

impl DeclFacts<'_> {
    fn is_test(&self) -> bool {
        let path = self.decl.file.to_string_lossy().replace('\\', "/");
        self.name_lower.ends_with("test")
            || self.name_lower.ends_with("tests")
            || self.name_lower.ends_with("spec")
            || path.contains("/test/")
            || path.contains("/src/test/")
    }

    fn is_utility(&self) -> bool {
        ["util", "utils", "helper", "helpers", "constants"]
            .iter()
            .any(|s| self.name_lower.ends_with(s))
    }

    fn is_transfer_object(&self) -> bool {
        ["dto", "request", "response"]
            .iter()
            .any(|s| self.name_lower.ends_with(s))
    }

    fn has_marker(&self, name: &str) -> bool {
        self.markers.iter().any(|m| m == name)
    }

    fn name_ends_with_any(&self, suffixes: &[&str]) -> bool {
        suffixes.iter().any(|s| self.name_lower.ends_with(s))
    }

    fn method_starts_with_any(&self, prefixes: &[&str]) -> bool {
        self.method_names
            .iter()
            .any(|m| prefixes.iter().any(|p| m.starts_with(p)))
    }

    fn is_stateless(&self) -> bool {
        !self.has_mutable_field || self.injected_fields_only
    }
}

type Check = fn(&DeclFacts<'_>) -> bool;

const ENTITY_RULES: &[(f64, Check)] = &[
    (0.3, |f| f.has_id_field),
    (0.2, |f| f.has_mutable_field),
    (0.3, |f| f.has_custom_equality),
    (0.2, |f| f.name_ends_with_any(&["entity", "aggregate"])),
    (0.4, |f| f.has_orm_marker),
    (0.2, |f| f.in_domain_path),
    (0.2, |f| f.has_lifecycle_method),
    (0.3, |f| f.has_business_method),
];

const VALUE_OBJECT_RULES: &[(f64, Check)] = &[
    (0.4, |f| f.all_fields_immutable),
    (0.3, |f| f.has_custom_equality || f.is_value_construct),
    (0.3, |f| f.is_value_construct),
    (0.2, |f| f.name_ends_with_any(&["value", "vo", "valueobject"])),
    (0.1, |f| {
        !f.has_mutable_field && !f.method_starts_with_any(MUTATOR_PREFIXES)
    }),
    (0.1, |f| !f.has_business_method),
];

const DOMAIN_EVENT_RULES: &[(f64, Check)] = &[
    (0.4, |f| {
        f.name_lower.contains("event") || f.name_ends_with_any(&["occurred", "happened"])
    }),
    (0.2, |f| f.all_fields_immutable),
    (0.3, |f| f.has_timestamp_field),
    (0.1, |f| f.is_value_construct),
];

fn sum_rules(rules: &[(f64, Check)], facts: &DeclFacts<'_>) -> f64 {
    rules
        .iter()
        .filter(|(_, check)| check(facts))
        .map(|(weight, _)| weight)
        .sum()
}

fn clamp01(score: f64) -> f64 {
    score.clamp(0.0, 1.0)
}

fn build_globset(patterns: &[String]) -> GlobSet {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        if let Ok(glob) = Glob::new(pattern) {
            builder.add(glob);
        }
    }
    builder.build().unwrap_or_else(|_| GlobSet::empty())
}

/// Scores every declaration against the six role rule sets. Each scorer is
/// a pure function of one declaration; only the derived aggregate pass
/// looks at the detected-entity set.
pub struct DddRoleDetector<'a> {
    index: &'a DeclarationIndex,
    config: &'a DddConfig,
    domain_paths: GlobSet,
}

impl<'a> DddRoleDetector<'a> {
    pub fn new(index: &'a DeclarationIndex, config: &'a DddConfig) -> Self {
        Self {
            index,
            config,
            domain_paths: build_globset(&config.domain_paths),
        }
    }

    /// Run all role scorers and the aggregate pass, keeping results above
    /// the configured report threshold.
    pub fn detect(&self) -> DddAnalysis {
        let threshold = self.config.report_threshold;
        let mut analysis = DddAnalysis::default();
        let mut entity_decls: Vec<(&DeclarationRef, f64)> = Vec::new();

        for decl in self.index.iter() {
            let facts = self.facts(decl);
            let file_name = file_name_of(decl);

            let entity = self.score_entity(&facts);
            if entity > threshold {
                entity_decls.push((decl, entity));
                analysis.entities.push(DddEntity {
                    class_name: decl.simple_name().to_string(),
                    file_name: file_name.clone(),
                    has_unique_id: facts.has_id_field,
                    has_mutable_state: facts.has_mutable_field,
                    has_custom_equality: facts.has_custom_equality,
                    confidence: entity,
                });
            }

            let value_object = self.score_value_object(&facts);
            if value_object > threshold {
                analysis.value_objects.push(DddValueObject {
                    class_name: decl.simple_name().to_string(),
                    file_name: file_name.clone(),
                    is_immutable: facts.all_fields_immutable,
                    has_value_equality: facts.has_custom_equality || facts.is_value_construct,
                    confidence: value_object,
                });
            }

            let service = self.score_service(&facts);
            if service > threshold {
                analysis.services.push(DddService {
                    class_name: decl.simple_name().to_string(),
                    file_name: file_name.clone(),
                    is_stateless: facts.is_stateless(),
                    is_interface: facts.is_interface,
                    confidence: service,
                });
            }

            let repository = self.score_repository(&facts);
            if repository > threshold {
                analysis.repositories.push(DddRepository {
                    class_name: decl.simple_name().to_string(),
                    file_name: file_name.clone(),
                    is_interface: facts.is_interface,
                    crud_method_count: crud_method_count(&facts),
                    confidence: repository,
                });
            }

            let domain_event = self.score_domain_event(&facts);
            if domain_event > threshold {
                analysis.domain_events.push(DddDomainEvent {
                    class_name: decl.simple_name().to_string(),
                    file_name,
                    is_immutable: facts.all_fields_immutable,
                    has_timestamp: facts.has_timestamp_field,
                    confidence: domain_event,
                });
            }
        }

        analysis.aggregates = self.detect_aggregates(&entity_decls);
        analysis
    }

    /// Raw scores for every declaration, regardless of threshold.
    pub fn score_all(&self) -> Vec<RoleScores> {
        self.index
            .iter()
            .map(|decl| {
                let facts = self.facts(decl);
                RoleScores {
                    class_name: decl.simple_name().to_string(),
                    entity: self.score_entity(&facts),
                    value_object: self.score_value_object(&facts),
                    service: self.score_service(&facts),
                    repository: self.score_repository(&facts),
                    domain_event: self.score_domain_event(&facts),
                }
            })
            .collect()
    }

    fn facts(&self, decl: &'a DeclarationRef) -> DeclFacts<'a> {
        let name_lower = decl.simple_name().to_lowercase();
        let package_lower = decl.package().to_lowercase();
        let markers: Vec<String> = decl.markers.iter().map(|m| m.to_lowercase()).collect();
        let method_names: Vec<String> = decl.methods.iter().map(|m| m.name.to_lowercase()).collect();

        let has_mutable_field = decl.fields.iter().any(|f| f.mutable);
        let all_fields_immutable = !decl.fields.is_empty() && !has_mutable_field;
        // "orderId" and "ORDER_ID" qualify, "valid" does not
        let has_id_field = decl.fields.iter().any(|f| {
            f.name.eq_ignore_ascii_case("id")
                || f.name.ends_with("Id")
                || f.name.to_lowercase().ends_with("_id")
        }) || markers.iter().any(|m| m == "id");
        let has_orm_marker = ["entity", "table", "document", "mappedsuperclass"]
            .iter()
            .any(|m| markers.iter().any(|marker| marker == m));
        let has_custom_equality = method_names.iter().any(|m| m == "equals")
            && method_names.iter().any(|m| m == "hashcode");
        let has_timestamp_field = decl.fields.iter().any(|f| {
            let name = f.name.to_lowercase();
            let type_lower = f.type_text.to_lowercase();
            name.contains("time")
                || name.contains("date")
                || name.ends_with("at")
                || TIMESTAMP_TYPES.iter().any(|t| type_lower.contains(t))
        });
        let has_lifecycle_method = method_names
            .iter()
            .any(|m| LIFECYCLE_VERBS.iter().any(|v| m.starts_with(v)));
        let has_business_method = method_names.iter().any(|m| is_business_method(m));
        let is_interface = decl.kind == DeclKind::Interface;
        let is_abstract = markers.iter().any(|m| m == "abstract");
        let is_value_construct = markers.iter().any(|m| m == "data" || m == "record");
        let path = decl.file.to_string_lossy().replace('\\', "/");
        let in_domain_path = self.domain_paths.is_match(&path)
            || package_lower
                .split('.')
                .any(|seg| seg == "domain" || seg == "model");
        let simple_lower = name_lower.clone();
        let has_constructor_params = decl.methods.iter().any(|m| {
            let name = m.name.to_lowercase();
            (name == "<init>" || name == "constructor" || name == simple_lower)
                && !m.param_types.is_empty()
        });
        let injected_fields_only = !decl.fields.is_empty()
            && decl.fields.iter().all(|f| {
                let type_lower = f.type_text.to_lowercase();
                INJECTED_SUFFIXES.iter().any(|s| type_lower.ends_with(s))
            });
        let has_repository_supertype = decl
            .supertypes
            .iter()
            .any(|s| s.to_lowercase().contains("repository"));

        DeclFacts {
            decl,
            name_lower,
            package_lower,
            markers,
            method_names,
            has_mutable_field,
            all_fields_immutable,
            has_id_field,
            has_orm_marker,
            has_custom_equality,
            has_timestamp_field,
            has_lifecycle_method,
            has_business_method,
            is_interface,
            is_abstract,
            is_value_construct,
            in_domain_path,
            has_constructor_params,
            injected_fields_only,
            has_repository_supertype,
        }
    }

    fn score_entity(&self, f: &DeclFacts<'_>) -> f64 {
        if f.is_test()
            || f.is_utility()
            || f.is_transfer_object()
            || f.name_ends_with_any(&[
                "repository",
                "dao",
                "service",
                "manager",
                "handler",
                "controller",
                "factory",
            ])
            || f.has_marker("service")
            || f.has_marker("repository")
        {
            return 0.0;
        }
        clamp01(sum_rules(ENTITY_RULES, f))
    }

    fn score_value_object(&self, f: &DeclFacts<'_>) -> f64 {
        if f.is_test()
            || f.is_utility()
            || f.is_transfer_object()
            || f.name_ends_with_any(&["repository", "service", "manager", "controller", "entity"])
            || f.has_marker("entity")
            || f.has_marker("service")
            || f.has_marker("repository")
        {
            return 0.0;
        }
        clamp01(sum_rules(VALUE_OBJECT_RULES, f))
    }

    fn score_service(&self, f: &DeclFacts<'_>) -> f64 {
        if f.is_test()
            || f.is_utility()
            || f.is_transfer_object()
            || f.name_ends_with_any(&["repository", "dao", "entity", "event"])
            || f.has_marker("entity")
            || f.has_marker("repository")
        {
            return 0.0;
        }

        let mut score = 0.0;
        let stateless = f.is_stateless();
        if stateless {
            score += 0.3;
        }

        let verb_hits = BUSINESS_VERBS
            .iter()
            .filter(|v| f.method_names.iter().any(|m| m.starts_with(*v)))
            .count();
        score += 0.1 * verb_hits as f64;

        if f.name_lower.ends_with("service") {
            score += 0.4;
        } else if f.name_ends_with_any(&["manager", "handler"]) {
            score += 0.2;
        }

        if f.has_marker("service") {
            score += 0.6;
        } else if f.has_marker("component") {
            score += 0.2;
        }

        if f.is_interface || f.is_abstract {
            score += 0.2;
        }
        if f.has_constructor_params {
            score += 0.2;
        }
        if f
            .package_lower
            .split('.')
            .any(|seg| seg.starts_with("service") || seg.starts_with("domain"))
        {
            score += 0.2;
        }

        // A "service" with nothing to do, or with mutable state, is weak
        // evidence at best.
        if f.decl.methods.is_empty() || !stateless {
            score *= 0.5;
        }
        clamp01(score)
    }

    fn score_repository(&self, f: &DeclFacts<'_>) -> f64 {
        if f.is_test()
            || f.is_utility()
            || f.is_transfer_object()
            || f.name_ends_with_any(&["service", "controller", "event", "entity"])
            || f.has_marker("entity")
        {
            return 0.0;
        }

        let mut score = 0.0;
        if f.is_interface || f.is_abstract {
            score += 0.3;
        }
        if f.name_lower.ends_with("repository") {
            score += 0.4;
        } else if f.name_ends_with_any(&["dao", "dataaccess"]) {
            score += 0.3;
        }
        if f.has_marker("repository") {
            score += 0.6;
        }
        if f.has_repository_supertype {
            score += 0.3;
        }

        let crud_categories = [
            (&["find", "get"][..], 0.2),
            (&["save", "create", "update", "insert"][..], 0.2),
            (&["delete", "remove"][..], 0.2),
            (&["findall", "count", "exists"][..], 0.1),
        ];
        let mut matched_categories = 0;
        for (verbs, weight) in crud_categories {
            if f.method_starts_with_any(verbs) {
                score += weight;
                matched_categories += 1;
            }
        }

        if f
            .package_lower
            .split('.')
            .any(|seg| ["repository", "dao", "data", "persistence"].contains(&seg))
        {
            score += 0.2;
        }

        // Something named like a repository that exposes no data access at
        // all is probably not one.
        if matched_categories == 0 {
            score *= 0.3;
        }
        clamp01(score)
    }

    fn score_domain_event(&self, f: &DeclFacts<'_>) -> f64 {
        if f.is_test()
            || f.is_utility()
            || f.name_ends_with_any(&["repository", "service", "controller"])
            || f.has_marker("service")
            || f.has_marker("repository")
        {
            return 0.0;
        }
        clamp01(sum_rules(DOMAIN_EVENT_RULES, f))
    }

    /// Derived pass: entities above the root threshold whose own fields
    /// resolve to other detected entities become aggregates.
    fn detect_aggregates(&self, entities: &[(&DeclarationRef, f64)]) -> Vec<DddAggregate> {
        let mut aggregates = Vec::new();

        for (root, confidence) in entities {
            if *confidence <= self.config.aggregate_root_threshold {
                continue;
            }
            let mut related: Vec<String> = Vec::new();
            for field in &root.fields {
                let Some(resolution) = self.index.resolve(&field.type_text, root) else {
                    continue;
                };
                let target = resolution.decl;
                if target.qualified_name == root.qualified_name {
                    continue;
                }
                let is_entity = entities
                    .iter()
                    .any(|(e, _)| e.qualified_name == target.qualified_name);
                if is_entity && !related.contains(&target.simple_name().to_string()) {
                    related.push(target.simple_name().to_string());
                }
            }
            if !related.is_empty() {
                related.sort();
                aggregates.push(DddAggregate {
                    root_entity: root.simple_name().to_string(),
                    related_entities: related,
                    confidence: clamp01(confidence * 0.8),
                });
            }
        }

        aggregates
    }
}

fn is_business_method(name: &str) -> bool {
    if name.starts_with("get")
        || name.starts_with("set")
        || name.starts_with("is")
        || name.starts_with("component")
        || name == "equals"
        || name == "hashcode"
        || name == "tostring"
        || name == "copy"
        || name == "<init>"
        || name == "constructor"
    {
        return false;
    }
    !name.is_empty()
}

fn crud_method_count(f: &DeclFacts<'_>) -> usize {
    let verbs = [
        "find", "get", "save", "create", "update", "insert", "delete", "remove", "count", "exists",
    ];
    f.method_names
        .iter()
        .filter(|m| verbs.iter().any(|v| m.starts_with(v)))
        .count()
}

fn file_name_of(decl: &DeclarationRef) -> String {
    decl.file
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FieldDecl, MethodDecl, SourceLang};
    use std::path::PathBuf;

    fn decl(qualified: &str, file: &str) -> DeclarationRef {
        DeclarationRef {
            qualified_name: qualified.to_string(),
            file: PathBuf::from(file),
            language: SourceLang::Kotlin,
            kind: DeclKind::Class,
            supertypes: vec![],
            fields: vec![],
            methods: vec![],
            markers: vec![],
            imports: vec![],
        }
    }

    fn detect(decls: &[DeclarationRef]) -> DddAnalysis {
        let index = DeclarationIndex::build(decls);
        let config = DddConfig::default();
        DddRoleDetector::new(&index, &config).detect()
    }

    fn order_entity() -> DeclarationRef {
        let mut order = decl("com.shop.domain.Order", "Order.kt");
        order.fields = vec![
            FieldDecl::new("id", "UUID", false),
            FieldDecl::new("status", "String", true),
        ];
        order.methods = vec![
            MethodDecl::new("equals", &["Any"], "Boolean"),
            MethodDecl::new("hashCode", &[], "Int"),
            MethodDecl::new("complete", &[], "Unit"),
        ];
        order
    }

    #[test]
    fn test_entity_detected() {
        let analysis = detect(&[order_entity()]);

        assert_eq!(analysis.entities.len(), 1);
        let entity = &analysis.entities[0];
        assert_eq!(entity.class_name, "Order");
        assert!(entity.has_unique_id);
        assert!(entity.has_mutable_state);
        assert!(entity.has_custom_equality);
        assert!(entity.confidence >= 0.3);
        assert!(entity.confidence <= 1.0);
    }

    #[test]
    fn test_repository_detected() {
        let mut repo = decl("com.shop.data.OrderRepository", "OrderRepository.kt");
        repo.kind = DeclKind::Interface;
        repo.methods = vec![
            MethodDecl::new("findById", &["UUID"], "Order"),
            MethodDecl::new("save", &["Order"], "Order"),
        ];

        let analysis = detect(&[repo]);
        assert_eq!(analysis.repositories.len(), 1);
        let repository = &analysis.repositories[0];
        assert!(repository.is_interface);
        assert_eq!(repository.crud_method_count, 2);
        assert!(repository.confidence >= 0.3);
    }

    #[test]
    fn test_repository_excluded_from_entity_scoring() {
        let mut repo = decl("com.shop.data.OrderRepository", "OrderRepository.kt");
        repo.methods = vec![MethodDecl::new("findById", &["UUID"], "Order")];

        let analysis = detect(&[repo]);
        assert!(analysis.entities.is_empty());
    }

    #[test]
    fn test_value_object_detected() {
        let mut money = decl("com.shop.domain.Money", "Money.kt");
        money.markers = vec!["data".to_string()];
        money.fields = vec![
            FieldDecl::new("amount", "BigDecimal", false),
            FieldDecl::new("currency", "String", false),
        ];

        let analysis = detect(&[money]);
        assert_eq!(analysis.value_objects.len(), 1);
        assert!(analysis.value_objects[0].is_immutable);
        assert!(analysis.value_objects[0].has_value_equality);
    }

    #[test]
    fn test_service_detected() {
        let mut service = decl("com.shop.application.PricingService", "PricingService.kt");
        service.markers = vec!["Service".to_string()];
        service.fields = vec![FieldDecl::new("repository", "OrderRepository", false)];
        service.methods = vec![MethodDecl::new("calculateTotal", &["Order"], "BigDecimal")];

        let analysis = detect(&[service]);
        assert_eq!(analysis.services.len(), 1);
        assert!(analysis.services[0].is_stateless);
        assert!(analysis.services[0].confidence >= 0.3);
    }

    #[test]
    fn test_stateful_service_score_halved() {
        let mut stateless = decl("com.acme.app.TaxService", "TaxService.kt");
        stateless.methods = vec![MethodDecl::new("calculateTax", &["Money"], "Money")];

        let mut stateful = stateless.clone();
        stateful.qualified_name = "com.acme.app.CachingTaxService".to_string();
        stateful.fields = vec![FieldDecl::new("cache", "MutableMap<String, Money>", true)];

        let index = DeclarationIndex::build(&[stateless, stateful]);
        let config = DddConfig::default();
        let detector = DddRoleDetector::new(&index, &config);
        let scores = detector.score_all();

        let stateless_score = scores.iter().find(|s| s.class_name == "TaxService").unwrap();
        let stateful_score = scores
            .iter()
            .find(|s| s.class_name == "CachingTaxService")
            .unwrap();
        assert!(stateful_score.service < stateless_score.service);
    }

    #[test]
    fn test_domain_event_detected() {
        let mut event = decl("com.shop.domain.OrderPlacedEvent", "OrderPlacedEvent.kt");
        event.markers = vec!["data".to_string()];
        event.fields = vec![
            FieldDecl::new("orderId", "UUID", false),
            FieldDecl::new("occurredAt", "Instant", false),
        ];

        let analysis = detect(&[event]);
        assert_eq!(analysis.domain_events.len(), 1);
        assert!(analysis.domain_events[0].has_timestamp);
        assert!(analysis.domain_events[0].is_immutable);
    }

    #[test]
    fn test_empty_declaration_scores_near_zero_everywhere() {
        let empty = decl("com.shop.Thing", "Thing.kt");
        let index = DeclarationIndex::build(&[empty]);
        let config = DddConfig::default();
        let scores = DddRoleDetector::new(&index, &config).score_all();

        assert_eq!(scores.len(), 1);
        for score in [
            scores[0].entity,
            scores[0].value_object,
            scores[0].service,
            scores[0].repository,
            scores[0].domain_event,
        ] {
            assert!((0.0..=1.0).contains(&score));
            assert!(score <= 0.3, "empty declaration scored {score}");
        }
    }

    #[test]
    fn test_confidence_always_clamped() {
        // Stack every entity signal at once
        let mut overachiever = order_entity();
        overachiever.markers = vec!["Entity".to_string(), "Id".to_string()];
        overachiever.methods.push(MethodDecl::new("createDraft", &[], "Order"));

        let index = DeclarationIndex::build(&[overachiever]);
        let config = DddConfig::default();
        let scores = DddRoleDetector::new(&index, &config).score_all();
        assert!(scores[0].entity <= 1.0);
    }

    #[test]
    fn test_id_field_requires_identifier_shape() {
        let mut form = decl("com.shop.domain.Form", "Form.kt");
        form.fields = vec![FieldDecl::new("valid", "Boolean", false)];

        let mut receipt = decl("com.shop.domain.Receipt", "Receipt.kt");
        receipt.fields = vec![FieldDecl::new("receiptId", "UUID", false)];

        let index = DeclarationIndex::build(&[form, receipt]);
        let config = DddConfig::default();
        let scores = DddRoleDetector::new(&index, &config).score_all();

        let form_score = scores.iter().find(|s| s.class_name == "Form").unwrap();
        let receipt_score = scores.iter().find(|s| s.class_name == "Receipt").unwrap();
        // "valid" must not count as a unique identifier
        assert!(receipt_score.entity > form_score.entity);
        assert!((receipt_score.entity - form_score.entity - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_test_classes_excluded() {
        let mut test_class = decl("com.shop.domain.OrderTest", "OrderTest.kt");
        test_class.fields = vec![FieldDecl::new("id", "UUID", true)];
        test_class.methods = vec![
            MethodDecl::new("equals", &["Any"], "Boolean"),
            MethodDecl::new("hashCode", &[], "Int"),
        ];

        let analysis = detect(&[test_class]);
        assert!(analysis.entities.is_empty());
        assert!(analysis.value_objects.is_empty());
        assert!(analysis.services.is_empty());
    }

    #[test]
    fn test_aggregate_from_entity_field() {
        let mut order = order_entity();
        order.markers = vec!["Entity".to_string()];
        order
            .fields
            .push(FieldDecl::new("lines", "List<OrderLine>", true));

        let mut line = decl("com.shop.domain.OrderLine", "OrderLine.kt");
        line.markers = vec!["Entity".to_string()];
        line.fields = vec![
            FieldDecl::new("id", "UUID", false),
            FieldDecl::new("quantity", "Int", true),
        ];
        line.methods = vec![
            MethodDecl::new("equals", &["Any"], "Boolean"),
            MethodDecl::new("hashCode", &[], "Int"),
        ];

        let analysis = detect(&[order, line]);
        assert_eq!(analysis.aggregates.len(), 1);
        let aggregate = &analysis.aggregates[0];
        assert_eq!(aggregate.root_entity, "Order");
        assert_eq!(aggregate.related_entities, vec!["OrderLine".to_string()]);
        assert!(aggregate.confidence <= 1.0);
        assert!(aggregate.confidence > 0.0);
    }

    #[test]
    fn test_no_aggregate_without_entity_fields() {
        let mut order = order_entity();
        order.markers = vec!["Entity".to_string()];

        let analysis = detect(&[order]);
        assert!(analysis.aggregates.is_empty());
    }

    #[test]
    fn test_raw_scores_returned_below_threshold() {
        let weak = decl("com.shop.OrderManager", "OrderManager.kt");
        let index = DeclarationIndex::build(&[weak]);
        let config = DddConfig::default();
        let detector = DddRoleDetector::new(&index, &config);

        // Not reported...
        assert!(detector.detect().services.is_empty());
        // ...but still scored
        let scores = detector.score_all();
        assert_eq!(scores.len(), 1);
        assert!(scores[0].service > 0.0);
    }
}
