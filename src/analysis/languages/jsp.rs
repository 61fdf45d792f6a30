//! JSP pages and fragments. Always heuristic.

use lazy_static::lazy_static;
use regex::Regex;

use crate::analysis::language::Language;
use crate::analysis::model::AnalysisModel;
use crate::analysis::rules::{add_tables, detect_frameworks, FrameworkRule};
use crate::analysis::traits::{Fidelity, LanguageAnalyzer, SourceUnit};

lazy_static! {
    static ref PAGE_DIRECTIVE: Regex = Regex::new(r"(?is)<%@\s*page\s+([^%]+)%>").unwrap();
    static ref PAGE_IMPORT: Regex = Regex::new(r#"(?i)import\s*=\s*"([^"]+)""#).unwrap();
    static ref TAGLIB: Regex = Regex::new(
        r#"(?i)<%@\s*taglib\s+[^%]*uri\s*=\s*"([^"]+)"[^%]*prefix\s*=\s*"([^"]+)""#
    )
    .unwrap();
    static ref INCLUDE_DIRECTIVE: Regex =
        Regex::new(r#"(?i)<%@\s*include\s+file\s*=\s*"([^"]+)""#).unwrap();
    static ref JSP_ACTION: Regex =
        Regex::new(r#"(?i)<jsp:(include|forward)\s+[^>]*page\s*=\s*"([^"]+)""#).unwrap();
    static ref FORM_ACTION: Regex =
        Regex::new(r#"(?i)<form\s+[^>]*action\s*=\s*["']([^"']+)["']"#).unwrap();
    static ref EXPRESSION: Regex = Regex::new(r"\$\{[^}]+\}").unwrap();
    static ref SCRIPTLET: Regex = Regex::new(r"(?s)<%[^@=!\-][^%]*%>").unwrap();
    static ref SQL_USAGE: Regex = Regex::new(
        r"(?i)<sql:(?:query|update)\b|\b(?:PreparedStatement|Statement|ResultSet)\s+\w+"
    )
    .unwrap();
    static ref CREATE_TABLE: Regex =
        Regex::new(r#"(?i)CREATE\s+TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?[`'"]?(\w+)"#).unwrap();
}

/// Matched against the lowercased page.
const FRAMEWORKS: &[FrameworkRule] = &[
    FrameworkRule {
        name: "JSTL",
        markers: &["http://java.sun.com/jsp/jstl", "jakarta.tags.core", "<c:", "<fmt:", "<fn:"],
    },
    FrameworkRule { name: "JSTL SQL", markers: &["<sql:", "jakarta.servlet.jsp.jstl.sql"] },
    FrameworkRule { name: "JSTL XML", markers: &["<x:", "jakarta.servlet.jsp.jstl.xml"] },
    FrameworkRule {
        name: "Spring MVC (View)",
        markers: &["<spring:", "http://www.springframework.org/tags"],
    },
    FrameworkRule {
        name: "Spring MVC Form Tags",
        markers: &["<form:", "http://www.springframework.org/tags/form"],
    },
    FrameworkRule {
        name: "Spring Security (JSP)",
        markers: &["<sec:", "http://www.springframework.org/security/tags"],
    },
    FrameworkRule { name: "Struts (View)", markers: &["/struts-tags", "org.apache.struts"] },
    FrameworkRule { name: "Apache Tiles", markers: &["<tiles:", "org.apache.tiles"] },
    FrameworkRule { name: "SiteMesh", markers: &["sitemesh", "<decorator:"] },
    FrameworkRule { name: "Jakarta EE Servlet", markers: &["javax.servlet", "jakarta.servlet"] },
    FrameworkRule {
        name: "JavaServer Faces (JSF)",
        markers: &["javax.faces", "jakarta.faces", "<h:", "<f:"],
    },
    FrameworkRule { name: "jQuery", markers: &["jquery"] },
    FrameworkRule { name: "Bootstrap", markers: &["bootstrap"] },
    FrameworkRule { name: "Apache Shiro (JSP)", markers: &["<shiro:", "org.apache.shiro"] },
    FrameworkRule { name: "MyBatis", markers: &["mybatis", "sqlmap"] },
];

/// Platform classes are not project dependencies.
fn is_platform_class(fqn: &str) -> bool {
    ["java.", "javax.", "jakarta.", "sun.", "com.sun."]
        .iter()
        .any(|p| fqn.starts_with(p))
}

pub struct JspAnalyzer;

impl JspAnalyzer {
    pub fn new() -> Self {
        Self
    }

    fn analyze_directives(&self, unit: &SourceUnit, model: &mut AnalysisModel) {
        let content = unit.content.as_str();
        let page = unit.unit_name();

        for directive in PAGE_DIRECTIVE.captures_iter(content) {
            for imports in PAGE_IMPORT.captures_iter(&directive[1]) {
                for class in imports[1].split(',').map(str::trim) {
                    if !class.is_empty() && !is_platform_class(class) {
                        model.add_dependency(page, class, "jsp-import");
                    }
                }
            }
        }

        for caps in TAGLIB.captures_iter(content) {
            let uri = caps[1].to_ascii_lowercase();
            model.add_dependency("taglib", format!("{} (prefix:{})", uri, &caps[2]), "taglib");
        }

        for caps in INCLUDE_DIRECTIVE.captures_iter(content) {
            model.add_package(format!("include:{}", &caps[1]));
        }
        for caps in JSP_ACTION.captures_iter(content) {
            model.add_package(format!("{}:{}", caps[1].to_ascii_lowercase(), &caps[2]));
        }
    }

    fn detect_patterns(&self, unit: &SourceUnit, lower: &str, model: &mut AnalysisModel) {
        let content = unit.content.as_str();
        let page = unit.unit_name();
        let has_expressions = content.contains("${");

        let hits = [
            (
                "MVC View",
                content.contains("<%@ page") || content.contains("<c:") || has_expressions,
            ),
            (
                "Front Controller",
                lower.contains("requestdispatcher") || lower.contains("jsp:forward"),
            ),
            (
                "Template Method (JSP include)",
                content.contains("<%@ include") || lower.contains("<jsp:include"),
            ),
            ("Filter/Decorator", lower.contains("filter")),
            ("Scriptlet (Anti-pattern)", SCRIPTLET.is_match(content)),
            (
                "Model Binding",
                has_expressions && (lower.contains("model.") || lower.contains("requestscope.")),
            ),
            (
                "Security (Authentication)",
                content.contains("<sec:") || lower.contains("authentication"),
            ),
            (
                "AJAX",
                lower.contains("xmlhttprequest") || lower.contains("$.ajax") || lower.contains("fetch("),
            ),
        ];
        for (pattern, hit) in hits {
            if hit {
                model.add_pattern(pattern, page);
            }
        }
    }

    fn analyze_endpoints(&self, content: &str, model: &mut AnalysisModel) {
        for caps in FORM_ACTION.captures_iter(content) {
            let action = caps[1].trim();
            if !action.is_empty() && !action.starts_with('#') {
                model.add_endpoint(format!("JSP:{}", action));
            }
        }
    }

    fn analyze_schemas(&self, content: &str, model: &mut AnalysisModel) {
        // One mention per page is enough to flag direct database access.
        if SQL_USAGE.is_match(content) {
            model.add_schema("Table: SQL Usage (JSP)");
        }
        add_tables(&CREATE_TABLE, content, "Raw SQL in JSP", model);
    }
}

impl Default for JspAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageAnalyzer for JspAnalyzer {
    fn language(&self) -> Language {
        Language::Jsp
    }

    fn analyze(&self, unit: &SourceUnit, model: &mut AnalysisModel) -> Fidelity {
        let content = unit.content.as_str();
        let lower = content.to_ascii_lowercase();

        self.analyze_directives(unit, model);
        detect_frameworks(&lower, FRAMEWORKS, model);
        self.detect_patterns(unit, &lower, model);
        self.analyze_endpoints(content, model);
        self.analyze_schemas(content, model);

        // A page carrying Java code compiles to a servlet class of its own.
        if SCRIPTLET.is_match(content) {
            model.add_classes(1);
        }
        if EXPRESSION.is_match(content) {
            model.add_package(format!("el_usage:{}", unit.unit_name()));
        }

        Fidelity::Heuristic
    }
}
