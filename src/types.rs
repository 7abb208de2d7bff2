use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Unique identifier for a graph node: "package.ClassName"
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(package: &str, name: &str) -> Self {
        if package.is_empty() {
            Self(name.to_string())
        } else {
            Self(format!("{package}.{name}"))
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Source language a declaration was extracted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceLang {
    Java,
    Kotlin,
}

impl fmt::Display for SourceLang {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceLang::Java => write!(f, "java"),
            SourceLang::Kotlin => write!(f, "kotlin"),
        }
    }
}

/// Kind of type declaration. Also used as the node type in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclKind {
    Class,
    Interface,
    Enum,
    Object,
}

/// A field on a declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDecl {
    pub name: String,
    pub type_text: String,
    pub mutable: bool,
}

impl FieldDecl {
    pub fn new(name: &str, type_text: &str, mutable: bool) -> Self {
        Self {
            name: name.to_string(),
            type_text: type_text.to_string(),
            mutable,
        }
    }
}

/// A method on a declaration. Constructors appear with the name `<init>`
/// or the simple class name, depending on the extractor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodDecl {
    pub name: String,
    pub param_types: Vec<String>,
    pub return_type: String,
}

impl MethodDecl {
    pub fn new(name: &str, param_types: &[&str], return_type: &str) -> Self {
        Self {
            name: name.to_string(),
            param_types: param_types.iter().map(|s| s.to_string()).collect(),
            return_type: return_type.to_string(),
        }
    }
}

/// Language-neutral snapshot of one type declaration, produced by the
/// upstream extractors. `markers` carries both annotation simple names
/// (`Entity`, `Id`, `Service`, ...) and language-level modifiers
/// (`data`, `record`, `abstract`, `sealed`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeclarationRef {
    pub qualified_name: String,
    pub file: PathBuf,
    pub language: SourceLang,
    pub kind: DeclKind,
    pub supertypes: Vec<String>,
    pub fields: Vec<FieldDecl>,
    pub methods: Vec<MethodDecl>,
    pub markers: Vec<String>,
    /// Qualified names imported by the declaring file.
    pub imports: Vec<String>,
}

impl DeclarationRef {
    /// Package portion of the qualified name ("" for the default package).
    pub fn package(&self) -> &str {
        match self.qualified_name.rsplit_once('.') {
            Some((pkg, _)) => pkg,
            None => "",
        }
    }

    /// Simple class name without the package.
    pub fn simple_name(&self) -> &str {
        match self.qualified_name.rsplit_once('.') {
            Some((_, name)) => name,
            None => &self.qualified_name,
        }
    }

    pub fn node_id(&self) -> NodeId {
        NodeId(self.qualified_name.clone())
    }

    /// Case-insensitive marker lookup.
    pub fn has_marker(&self, name: &str) -> bool {
        self.markers.iter().any(|m| m.eq_ignore_ascii_case(name))
    }
}

/// Architectural layer. `Data` and `Infrastructure` share the outermost
/// ordinal; `Domain` must stay free of dependencies on everything except
/// infrastructure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    Presentation,
    Application,
    Domain,
    Data,
    Infrastructure,
}

impl LayerKind {
    /// Ordinal level: presentation=1, application=2, domain=3, data=4,
    /// infrastructure=4.
    pub fn level(&self) -> u8 {
        match self {
            LayerKind::Presentation => 1,
            LayerKind::Application => 2,
            LayerKind::Domain => 3,
            LayerKind::Data => 4,
            LayerKind::Infrastructure => 4,
        }
    }

    /// Explicit allowed-direction matrix. Same-layer edges are always
    /// allowed; domain may only reach infrastructure.
    pub fn allows_dependency_on(&self, other: &LayerKind) -> bool {
        use LayerKind::*;
        if self == other {
            return true;
        }
        matches!(
            (self, other),
            (Presentation, Application | Domain | Infrastructure)
                | (Application, Domain | Data | Infrastructure)
                | (Domain, Infrastructure)
                | (Data, Domain | Application | Infrastructure)
                | (Infrastructure, Domain | Application | Data)
        )
    }

    pub const ALL: [LayerKind; 5] = [
        LayerKind::Presentation,
        LayerKind::Application,
        LayerKind::Domain,
        LayerKind::Data,
        LayerKind::Infrastructure,
    ];
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerKind::Presentation => write!(f, "presentation"),
            LayerKind::Application => write!(f, "application"),
            LayerKind::Domain => write!(f, "domain"),
            LayerKind::Data => write!(f, "data"),
            LayerKind::Infrastructure => write!(f, "infrastructure"),
        }
    }
}

/// Severity of a violation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "info" => Ok(Severity::Info),
            "warning" | "warn" => Ok(Severity::Warning),
            "error" => Ok(Severity::Error),
            _ => Err(anyhow::anyhow!("unknown severity: {s}")),
        }
    }
}

/// Kind of architectural violation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ViolationKind {
    LayerViolation {
        from_layer: LayerKind,
        to_layer: LayerKind,
    },
    CircularDependency {
        cycle: Vec<NodeId>,
    },
    DependencyInversion {
        concrete: String,
        interface: String,
    },
    CustomRule {
        rule: String,
    },
}

/// An architectural violation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchitectureViolation {
    pub kind: ViolationKind,
    pub from_class: NodeId,
    pub to_class: NodeId,
    pub severity: Severity,
    pub message: String,
    pub suggestion: Option<String>,
}

/// Kind of diagnostic recorded during analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    ExtractionSkip,
    AmbiguousReference,
}

/// Non-fatal finding about the input. Never aborts the analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub subject: String,
    pub detail: String,
}
