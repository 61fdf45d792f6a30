//! Java language analyzer.
//!
//! Types and the package declaration come from the tree-sitter grammar when
//! available; imports, frameworks, patterns, JPA tables and Spring endpoints
//! are recognized textually.

use lazy_static::lazy_static;
use regex::Regex;

use crate::analysis::language::Language;
use crate::analysis::model::AnalysisModel;
use crate::analysis::rules::{
    add_tables, count_matches, detect_frameworks, detect_patterns, to_snake_case, FrameworkRule,
    PatternRule,
};
use crate::analysis::syntax::{Grammar, SourceView, StructureQuery};
use crate::analysis::traits::{Fidelity, LanguageAnalyzer, SourceUnit};

const STRUCTURE: StructureQuery = StructureQuery {
    type_kinds: &[
        "class_declaration",
        "interface_declaration",
        "enum_declaration",
        "record_declaration",
        "annotation_type_declaration",
    ],
    package_kind: Some("package_declaration"),
};

lazy_static! {
    static ref PACKAGE: Regex = Regex::new(r"(?m)^\s*package\s+([A-Za-z0-9_.]+)\s*;").unwrap();
    static ref IMPORT: Regex =
        Regex::new(r"(?m)^\s*import\s+(?:static\s+)?([A-Za-z0-9_.]+)(?:\.\*)?\s*;").unwrap();
    static ref TYPE_LINE: Regex =
        Regex::new(r"(?m)^.*\b(?:class|interface|enum|record)\s+\w+.*$").unwrap();
    static ref TABLE_ANNOTATION: Regex =
        Regex::new(r#"@Table\s*\(\s*name\s*=\s*"([^"]+)""#).unwrap();
    static ref CLASS_NAME: Regex = Regex::new(r"\bclass\s+([A-Za-z0-9_]+)").unwrap();
    static ref CREATE_TABLE: Regex =
        Regex::new(r"(?i)CREATE\s+TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?([A-Za-z0-9_]+)").unwrap();
    static ref MAPPING: Regex = Regex::new(
        r#"@(Get|Post|Put|Delete|Patch|Request)Mapping\s*\(\s*(?:value\s*=\s*|path\s*=\s*)?["']([^"']+)["']"#
    )
    .unwrap();
    static ref METHOD_NAME: Regex =
        Regex::new(r"(?:public|private|protected)?\s*[\w<>\[\], ?]+\s+(\w+)\s*\(").unwrap();
}

const FRAMEWORKS: &[FrameworkRule] = &[
    FrameworkRule { name: "Spring Framework", markers: &["org.springframework"] },
    FrameworkRule { name: "Spring Boot", markers: &["@SpringBootApplication"] },
    FrameworkRule { name: "Spring MVC", markers: &["@RestController", "@Controller"] },
    FrameworkRule { name: "Spring Service", markers: &["@Service"] },
    FrameworkRule { name: "Spring Data", markers: &["@Repository", "JpaRepository"] },
    FrameworkRule { name: "Jakarta Servlet", markers: &["jakarta.servlet"] },
    FrameworkRule { name: "Jakarta Persistence (JPA)", markers: &["jakarta.persistence"] },
    FrameworkRule { name: "Java Servlet", markers: &["javax.servlet"] },
    FrameworkRule { name: "Java Persistence (JPA)", markers: &["javax.persistence"] },
    FrameworkRule { name: "Hibernate", markers: &["org.hibernate"] },
    FrameworkRule { name: "SLF4J", markers: &["org.slf4j"] },
    FrameworkRule { name: "Log4j", markers: &["org.apache.logging.log4j"] },
    FrameworkRule { name: "Java Util Logging", markers: &["java.util.logging"] },
    FrameworkRule { name: "JUnit", markers: &["org.junit"] },
    FrameworkRule { name: "TestNG", markers: &["org.testng"] },
    FrameworkRule { name: "Mockito", markers: &["org.mockito"] },
    FrameworkRule { name: "Jackson", markers: &["com.fasterxml.jackson"] },
    FrameworkRule { name: "Gson", markers: &["com.google.gson"] },
    FrameworkRule { name: "JDBC", markers: &["java.sql"] },
    FrameworkRule { name: "Apache Commons", markers: &["org.apache.commons"] },
    FrameworkRule { name: "Lombok", markers: &["lombok."] },
];

const PATTERNS: &[PatternRule] = &[
    PatternRule { name: "Factory", name_hints: &["factory"], content_markers: &["createInstance", "create("] },
    PatternRule { name: "Builder", name_hints: &["builder"], content_markers: &["public Builder", ".builder()"] },
    PatternRule {
        name: "Observer",
        name_hints: &["listener", "observer"],
        content_markers: &["addListener", "addObserver"],
    },
    PatternRule { name: "Strategy", name_hints: &["strategy"], content_markers: &[] },
    PatternRule { name: "Adapter", name_hints: &["adapter"], content_markers: &[] },
    PatternRule { name: "Decorator", name_hints: &["decorator"], content_markers: &[] },
    PatternRule { name: "Repository", name_hints: &["repository"], content_markers: &["@Repository"] },
    PatternRule { name: "Service Layer", name_hints: &["service"], content_markers: &["@Service"] },
    PatternRule { name: "DTO/VO", name_hints: &["dto", "vo"], content_markers: &[] },
];

pub struct JavaAnalyzer;

impl JavaAnalyzer {
    pub fn new() -> Self {
        Self
    }

    fn detect_special_patterns(&self, unit: &SourceUnit, model: &mut AnalysisModel) {
        let content = &unit.content;
        if content.contains("private static") && content.contains("getInstance()") {
            model.add_pattern("Singleton", unit.unit_name());
        }
        // Interface declaring an execute-style operation.
        if content.contains("interface") && content.to_ascii_lowercase().contains("execute") {
            model.add_pattern("Strategy", unit.unit_name());
        }
    }

    fn analyze_schemas(&self, content: &str, model: &mut AnalysisModel) {
        if content.contains("@Entity") {
            if let Some(table) = TABLE_ANNOTATION.captures(content).and_then(|c| c.get(1)) {
                model.add_schema(format!("Table: {} (JPA Entity)", table.as_str()));
            } else if let Some(class) = CLASS_NAME.captures(content).and_then(|c| c.get(1)) {
                model.add_schema(format!(
                    "Table: {} (JPA Entity)",
                    to_snake_case(class.as_str())
                ));
            }
        }
        add_tables(&CREATE_TABLE, content, "SQL DDL", model);
    }
}

impl Default for JavaAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageAnalyzer for JavaAnalyzer {
    fn language(&self) -> Language {
        Language::Java
    }

    fn supports_structured_parsing(&self) -> bool {
        cfg!(feature = "tree-sitter")
    }

    fn analyze(&self, unit: &SourceUnit, model: &mut AnalysisModel) -> Fidelity {
        let content = unit.content.as_str();
        let view = SourceView::of(Grammar::Java, content, &STRUCTURE, &unit.relative_path);

        let (package, type_count, fidelity) = match view {
            SourceView::Parsed(facts) => (
                facts.packages.into_iter().next(),
                facts.type_count,
                Fidelity::Structured,
            ),
            SourceView::Heuristic => (
                PACKAGE
                    .captures(content)
                    .and_then(|c| c.get(1))
                    .map(|m| m.as_str().to_string()),
                count_matches(&TYPE_LINE, content),
                Fidelity::Heuristic,
            ),
        };

        if let Some(package) = &package {
            model.add_package(package.as_str());
        }
        model.add_classes(type_count);

        if let Some(current) = &package {
            for caps in IMPORT.captures_iter(content) {
                let imported = &caps[1];
                if imported.starts_with("java.") || imported.starts_with("javax.") {
                    continue;
                }
                let target = owning_package(imported);
                if target != current {
                    model.add_dependency(current.as_str(), target, "import");
                }
            }
        }

        detect_frameworks(content, FRAMEWORKS, model);
        detect_patterns(unit.file_name(), unit.unit_name(), content, PATTERNS, model);
        self.detect_special_patterns(unit, model);
        self.analyze_schemas(content, model);
        spring_endpoints(content, model);

        fidelity
    }
}

/// `com.x.Foo` to `com.x`.
fn owning_package(class_name: &str) -> &str {
    match class_name.rfind('.') {
        Some(dot) if dot > 0 => &class_name[..dot],
        _ => class_name,
    }
}

/// Spring `@*Mapping` endpoints, prefixed by a class-level `@RequestMapping`.
fn spring_endpoints(content: &str, model: &mut AnalysisModel) {
    let lines: Vec<&str> = content.lines().collect();

    // A @RequestMapping before the class keyword is the class-level prefix.
    let class_line = lines
        .iter()
        .position(|l| CLASS_NAME.is_match(l))
        .unwrap_or(lines.len());
    let prefix = lines[..class_line]
        .iter()
        .find_map(|l| {
            MAPPING
                .captures(l)
                .filter(|c| &c[1] == "Request")
                .map(|c| c[2].to_string())
        })
        .unwrap_or_default();

    for (i, line) in lines.iter().enumerate().skip(class_line) {
        let Some(caps) = MAPPING.captures(line) else {
            continue;
        };
        let method = match &caps[1] {
            "Request" => request_method(&lines[i..lines.len().min(i + 3)]),
            other => other.to_ascii_uppercase(),
        };
        let handler = lines[i + 1..lines.len().min(i + 5)]
            .iter()
            .find_map(|l| METHOD_NAME.captures(l.trim()).map(|c| c[1].to_string()))
            .unwrap_or_else(|| "unknown".to_string());
        model.add_endpoint(format!("{} {}{} ({})", method, prefix, &caps[2], handler));
    }
}

fn request_method(window: &[&str]) -> String {
    for verb in ["GET", "POST", "PUT", "DELETE", "PATCH"] {
        let marker = format!("RequestMethod.{}", verb);
        if window.iter().any(|l| l.contains(&marker)) {
            return verb.to_string();
        }
    }
    "GET".to_string()
}
