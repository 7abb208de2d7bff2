use std::collections::HashMap;

use log::{debug, warn};

use crate::types::{DeclarationRef, Diagnostic, DiagnosticKind};

/// Immutable, language-neutral snapshot of every discovered declaration,
/// built once per run. Carries the lookup tables all name resolution goes
/// through, so resolution is a whole-index concern rather than a per-call
/// re-collection of declaration lists.
pub struct DeclarationIndex {
    declarations: Vec<DeclarationRef>,
    by_qualified: HashMap<String, usize>,
    by_simple: HashMap<String, Vec<usize>>,
    diagnostics: Vec<Diagnostic>,
}

/// Outcome of resolving a raw type text against the index.
pub struct Resolution<'a> {
    pub decl: &'a DeclarationRef,
    /// More than one candidate matched by simple name; the
    /// lexicographically first one was chosen.
    pub ambiguous: bool,
}

impl DeclarationIndex {
    /// Build the index. Declarations with an empty qualified name are
    /// skipped; for duplicate qualified names the first one wins. Both
    /// cases are recorded as diagnostics, never as errors.
    pub fn build(declarations: &[DeclarationRef]) -> Self {
        let mut index = Self {
            declarations: Vec::with_capacity(declarations.len()),
            by_qualified: HashMap::new(),
            by_simple: HashMap::new(),
            diagnostics: Vec::new(),
        };

        for decl in declarations {
            if decl.qualified_name.is_empty() {
                warn!(
                    "skipping declaration with empty name from {}",
                    decl.file.display()
                );
                index.diagnostics.push(Diagnostic {
                    kind: DiagnosticKind::ExtractionSkip,
                    subject: decl.file.display().to_string(),
                    detail: "declaration has no qualified name".to_string(),
                });
                continue;
            }
            if index.by_qualified.contains_key(&decl.qualified_name) {
                debug!("duplicate declaration {}", decl.qualified_name);
                index.diagnostics.push(Diagnostic {
                    kind: DiagnosticKind::ExtractionSkip,
                    subject: decl.qualified_name.clone(),
                    detail: "duplicate qualified name, first declaration kept".to_string(),
                });
                continue;
            }

            let idx = index.declarations.len();
            index
                .by_qualified
                .insert(decl.qualified_name.clone(), idx);
            index
                .by_simple
                .entry(decl.simple_name().to_string())
                .or_default()
                .push(idx);
            index.declarations.push(decl.clone());
        }

        // Deterministic first-match for ambiguous simple names.
        let declarations = &index.declarations;
        for candidates in index.by_simple.values_mut() {
            candidates.sort_by(|&a, &b| {
                declarations[a]
                    .qualified_name
                    .cmp(&declarations[b].qualified_name)
            });
        }

        index
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DeclarationRef> {
        self.declarations.iter()
    }

    /// Diagnostics recorded while building the index.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Exact qualified-name lookup.
    pub fn get(&self, qualified_name: &str) -> Option<&DeclarationRef> {
        self.by_qualified
            .get(qualified_name)
            .map(|&idx| &self.declarations[idx])
    }

    /// Resolve a raw type text to a declaration, best effort. Search
    /// order: exact qualified match, the declaring file's imports, the
    /// declaring package, then a unique simple-name match anywhere. If the
    /// outer name cannot be resolved, generic arguments are tried in order
    /// (so `List<Order>` still reaches `Order`). Returns `None` when
    /// nothing matches; callers drop the reference silently.
    pub fn resolve<'a>(&'a self, raw: &str, from: &DeclarationRef) -> Option<Resolution<'a>> {
        let (outer, args) = split_type_text(raw);
        if outer.is_empty() {
            return None;
        }

        if let Some(res) = self.resolve_name(&outer, from) {
            return Some(res);
        }
        for arg in &args {
            if let Some(res) = self.resolve(arg, from) {
                return Some(res);
            }
        }
        None
    }

    fn resolve_name<'a>(&'a self, name: &str, from: &DeclarationRef) -> Option<Resolution<'a>> {
        // Already qualified
        if name.contains('.') {
            return self.get(name).map(|decl| Resolution {
                decl,
                ambiguous: false,
            });
        }

        // (a) imported by the declaring file
        for import in &from.imports {
            let matches = import == name
                || import
                    .rsplit_once('.')
                    .is_some_and(|(_, simple)| simple == name);
            if matches {
                if let Some(decl) = self.get(import) {
                    return Some(Resolution {
                        decl,
                        ambiguous: false,
                    });
                }
            }
        }

        // (b) same package
        let in_package = if from.package().is_empty() {
            name.to_string()
        } else {
            format!("{}.{name}", from.package())
        };
        if let Some(decl) = self.get(&in_package) {
            return Some(Resolution {
                decl,
                ambiguous: false,
            });
        }

        // (c) simple-name match across the whole index; first candidate
        // wins when ambiguous
        let candidates = self.by_simple.get(name)?;
        let decl = &self.declarations[*candidates.first()?];
        Some(Resolution {
            decl,
            ambiguous: candidates.len() > 1,
        })
    }
}

/// Split a raw type text into its outer name and top-level generic
/// arguments, stripping nullability markers and array suffixes.
/// `MutableList<Order?>` -> ("MutableList", ["Order"]).
pub fn split_type_text(raw: &str) -> (String, Vec<String>) {
    let mut text = raw.trim();
    loop {
        let stripped = text
            .trim_end_matches('?')
            .trim_end_matches('!')
            .trim_end_matches("[]")
            .trim_end();
        if stripped == text {
            break;
        }
        text = stripped;
    }

    let Some(open) = text.find('<') else {
        return (text.to_string(), Vec::new());
    };
    let outer = text[..open].trim().to_string();

    let inner = match text.rfind('>') {
        Some(close) if close > open => &text[open + 1..close],
        _ => return (outer, Vec::new()),
    };

    // Split on top-level commas only
    let mut args = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (i, c) in inner.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                let arg = inner[start..i].trim();
                if !arg.is_empty() {
                    args.push(arg.to_string());
                }
                start = i + 1;
            }
            _ => {}
        }
    }
    let last = inner[start..].trim();
    if !last.is_empty() {
        args.push(last.to_string());
    }

    (outer, args)
}
