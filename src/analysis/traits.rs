//! Core types shared by every language analyzer.

use std::path::Path;

use super::language::{is_manifest_name, Language};
use super::model::AnalysisModel;

/// One file handed to an analyzer. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUnit {
    /// Path relative to the analyzed root, `/`-separated.
    pub relative_path: String,
    pub language: Language,
    pub content: String,
}

impl SourceUnit {
    pub fn new(
        relative_path: impl Into<String>,
        language: Language,
        content: impl Into<String>,
    ) -> Self {
        Self {
            relative_path: relative_path.into(),
            language,
            content: content.into(),
        }
    }

    /// Final path component.
    pub fn file_name(&self) -> &str {
        self.relative_path
            .rsplit('/')
            .next()
            .unwrap_or(&self.relative_path)
    }

    /// File name without its last extension; used as the unit name in
    /// pattern hits and dependency edges.
    pub fn unit_name(&self) -> &str {
        let name = self.file_name();
        match name.rfind('.') {
            Some(dot) if dot > 0 => &name[..dot],
            _ => name,
        }
    }

    /// Directory part of the relative path, empty at the root.
    pub fn directory(&self) -> &str {
        match self.relative_path.rfind('/') {
            Some(slash) => &self.relative_path[..slash],
            None => "",
        }
    }

    /// Whether this is a build or dependency manifest rather than code.
    pub fn is_manifest(&self) -> bool {
        is_manifest_name(self.file_name())
    }

    pub fn path(&self) -> &Path {
        Path::new(&self.relative_path)
    }
}

/// How faithfully a unit was analyzed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fidelity {
    /// Type counts and declarations came from a syntax tree.
    Structured,
    /// Textual scanning only. Either the language has no grammar or the
    /// parse was unusable.
    Heuristic,
    /// Manifest file; dependency lines only.
    Manifest,
}

/// Per-language analysis capability.
///
/// Implementations are stateless across calls and must only add to `model`.
/// They never fail: an unparseable unit is scanned heuristically instead.
pub trait LanguageAnalyzer: Send + Sync {
    /// The language this analyzer handles.
    fn language(&self) -> Language;

    /// Whether a grammar-backed parse is attempted before heuristics.
    fn supports_structured_parsing(&self) -> bool {
        false
    }

    /// Extract facts from `unit` into `model`.
    fn analyze(&self, unit: &SourceUnit, model: &mut AnalysisModel) -> Fidelity;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_names() {
        let unit = SourceUnit::new("app/service/UserService.java", Language::Java, "");
        assert_eq!(unit.file_name(), "UserService.java");
        assert_eq!(unit.unit_name(), "UserService");
        assert_eq!(unit.directory(), "app/service");
        assert!(!unit.is_manifest());

        let unit = SourceUnit::new("Gemfile", Language::Ruby, "");
        assert_eq!(unit.unit_name(), "Gemfile");
        assert_eq!(unit.directory(), "");
        assert!(unit.is_manifest());
    }
}
