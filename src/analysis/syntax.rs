//! Grammar-backed structural scanning.
//!
//! Analyzers ask for a `SourceView` first. With the `tree-sitter` feature on
//! and a usable parse, they get type counts and the package declaration from
//! the syntax tree; otherwise they get `SourceView::Heuristic` and fall back
//! to textual scanning.

use std::fmt;

use tracing::debug;

/// Grammars bundled with the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grammar {
    Java,
    JavaScript,
    TypeScript,
    Tsx,
    C,
    Cpp,
    Rust,
    Python,
}

/// Node kinds an analyzer wants from the tree.
#[derive(Debug, Clone, Copy)]
pub struct StructureQuery {
    /// Kinds counted as type-like declarations. `*_specifier` kinds only
    /// count when they carry a body (a definition, not a reference).
    pub type_kinds: &'static [&'static str],
    /// Kind whose first identifier-like child names the package/namespace.
    pub package_kind: Option<&'static str>,
}

/// Facts read from a syntax tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructuralFacts {
    pub type_count: usize,
    pub packages: Vec<String>,
}

/// Result of trying to parse one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceView {
    Parsed(StructuralFacts),
    Heuristic,
}

impl SourceView {
    /// Parse `source`, logging and downgrading on any failure.
    pub fn of(grammar: Grammar, source: &str, query: &StructureQuery, unit: &str) -> SourceView {
        match scan(grammar, source, query) {
            Ok(facts) => SourceView::Parsed(facts),
            Err(e) => {
                debug!(unit, grammar = ?grammar, reason = %e, "falling back to heuristic scan");
                SourceView::Heuristic
            }
        }
    }
}

/// Why a structured parse was not usable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyntaxError {
    /// Built without the `tree-sitter` feature.
    Unavailable,
    /// The grammar could not be loaded into the parser.
    Grammar(String),
    /// The parser produced no tree.
    NoTree,
    /// The tree contains ERROR or MISSING nodes.
    Unparseable,
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyntaxError::Unavailable => write!(f, "structured parsing not compiled in"),
            SyntaxError::Grammar(e) => write!(f, "grammar failed to load: {}", e),
            SyntaxError::NoTree => write!(f, "parser returned no tree"),
            SyntaxError::Unparseable => write!(f, "source has syntax errors"),
        }
    }
}

impl std::error::Error for SyntaxError {}

#[cfg(feature = "tree-sitter")]
pub use self::ts::scan;

#[cfg(not(feature = "tree-sitter"))]
pub fn scan(
    _grammar: Grammar,
    _source: &str,
    _query: &StructureQuery,
) -> Result<StructuralFacts, SyntaxError> {
    Err(SyntaxError::Unavailable)
}

#[cfg(feature = "tree-sitter")]
mod ts {
    use tree_sitter::{Language, Node, Parser};

    use super::{Grammar, StructuralFacts, StructureQuery, SyntaxError};

    fn language(grammar: Grammar) -> Language {
        match grammar {
            Grammar::Java => tree_sitter_java::LANGUAGE.into(),
            Grammar::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
            Grammar::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Grammar::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
            Grammar::C => tree_sitter_c::LANGUAGE.into(),
            Grammar::Cpp => tree_sitter_cpp::LANGUAGE.into(),
            Grammar::Rust => tree_sitter_rust::LANGUAGE.into(),
            Grammar::Python => tree_sitter_python::LANGUAGE.into(),
        }
    }

    /// Parse `source` and collect what `query` asks for.
    ///
    /// A parser is created per call; `tree_sitter::Parser` is not `Sync`.
    pub fn scan(
        grammar: Grammar,
        source: &str,
        query: &StructureQuery,
    ) -> Result<StructuralFacts, SyntaxError> {
        let mut parser = Parser::new();
        parser
            .set_language(&language(grammar))
            .map_err(|e| SyntaxError::Grammar(e.to_string()))?;
        let tree = parser.parse(source, None).ok_or(SyntaxError::NoTree)?;

        // Tree-sitter recovers by wrapping bad input in ERROR nodes below a
        // normal root, so any error anywhere makes the tree untrustworthy.
        let root = tree.root_node();
        if root.has_error() {
            return Err(SyntaxError::Unparseable);
        }

        let mut facts = StructuralFacts::default();
        let bytes = source.as_bytes();
        let mut cursor = root.walk();

        // Preorder walk without recursion.
        loop {
            let node = cursor.node();
            if query.type_kinds.contains(&node.kind()) && is_definition(node) {
                facts.type_count += 1;
            }
            if query.package_kind == Some(node.kind()) {
                if let Some(name) = declared_name(node, bytes) {
                    facts.packages.push(name);
                }
            }

            if cursor.goto_first_child() || cursor.goto_next_sibling() {
                continue;
            }
            loop {
                if !cursor.goto_parent() {
                    return Ok(facts);
                }
                if cursor.goto_next_sibling() {
                    break;
                }
            }
        }
    }

    fn is_definition(node: Node) -> bool {
        !node.kind().ends_with("_specifier") || node.child_by_field_name("body").is_some()
    }

    fn declared_name(node: Node, source: &[u8]) -> Option<String> {
        if let Some(name) = node.child_by_field_name("name") {
            return name.utf8_text(source).ok().map(str::to_string);
        }
        (0..node.named_child_count())
            .filter_map(|i| node.named_child(i))
            .find(|child| {
                child.kind().ends_with("identifier") || child.kind() == "nested_namespace_specifier"
            })
            .and_then(|child| child.utf8_text(source).ok())
            .map(str::to_string)
    }
}

#[cfg(all(test, feature = "tree-sitter"))]
mod tests {
    use super::*;

    const JAVA_TYPES: StructureQuery = StructureQuery {
        type_kinds: &["class_declaration", "interface_declaration", "enum_declaration"],
        package_kind: Some("package_declaration"),
    };

    #[test]
    fn test_java_structure() {
        let source = r#"
package com.example.demo;

public class Outer {
    static class Inner {}
    interface Callback {}
}

enum Color { RED }
"#;
        let facts = scan(Grammar::Java, source, &JAVA_TYPES).unwrap();
        assert_eq!(facts.type_count, 4);
        assert_eq!(facts.packages, vec!["com.example.demo".to_string()]);
    }

    #[test]
    fn test_c_struct_references_are_not_definitions() {
        let query = StructureQuery {
            type_kinds: &["struct_specifier", "enum_specifier"],
            package_kind: None,
        };
        let source = r#"
struct point { int x; int y; };
enum mode { ON, OFF };
struct point origin(struct point p);
"#;
        let facts = scan(Grammar::C, source, &query).unwrap();
        assert_eq!(facts.type_count, 2);
    }

    #[test]
    fn test_view_never_fails() {
        let view = SourceView::of(Grammar::Python, "class A:\n    pass\n", &StructureQuery {
            type_kinds: &["class_definition"],
            package_kind: None,
        }, "a");
        assert_eq!(
            view,
            SourceView::Parsed(StructuralFacts {
                type_count: 1,
                packages: vec![]
            })
        );
    }

    const JUNK: &[&str] = &[
        "\u{7f}ELF\u{2}\u{1}",
        "<?php echo 1; ?>",
        "}}}} class {{{{ ;;; @@@",
        "{{{{{{{{",
        "SELECT * FROM orders WHERE id = ?;",
    ];

    #[test]
    fn test_java_recovered_errors_are_unparseable() {
        for source in JUNK {
            assert_eq!(
                scan(Grammar::Java, source, &JAVA_TYPES),
                Err(SyntaxError::Unparseable),
                "{:?}",
                source
            );
        }

        // One bad member is enough, even below a well-formed class.
        let source = "package a.b;\n\npublic class Ok {\n    <?php echo 1; ?>\n}\n";
        assert_eq!(scan(Grammar::Java, source, &JAVA_TYPES), Err(SyntaxError::Unparseable));
    }

    #[test]
    fn test_python_recovered_errors_fall_back() {
        let query = StructureQuery {
            type_kinds: &["class_definition"],
            package_kind: None,
        };
        for source in JUNK {
            assert_eq!(
                SourceView::of(Grammar::Python, source, &query, "junk"),
                SourceView::Heuristic,
                "{:?}",
                source
            );
        }

        let source = "class Broken(:\n    pass\n\nclass Ok:\n    pass\n";
        assert_eq!(
            SourceView::of(Grammar::Python, source, &query, "broken"),
            SourceView::Heuristic
        );
    }
}
