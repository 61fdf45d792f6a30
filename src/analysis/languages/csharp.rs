//! C# analyzer. No bundled grammar; always heuristic.

use lazy_static::lazy_static;
use regex::Regex;

use crate::analysis::language::Language;
use crate::analysis::model::AnalysisModel;
use crate::analysis::rules::{
    count_matches, detect_frameworks, detect_patterns, FrameworkRule, PatternRule,
};
use crate::analysis::traits::{Fidelity, LanguageAnalyzer, SourceUnit};

lazy_static! {
    static ref NAMESPACE: Regex = Regex::new(r"(?m)^\s*namespace\s+([A-Za-z0-9_.]+)").unwrap();
    static ref USING: Regex = Regex::new(r"(?m)^\s*using\s+([A-Za-z0-9_.]+)\s*;").unwrap();
    static ref TYPE_DECL: Regex =
        Regex::new(r"\b(?:class|interface|struct|enum|record)\s+\w+").unwrap();
    static ref SINGLETON_INSTANCE: Regex = Regex::new(r"\bInstance\b").unwrap();
    static ref TABLE_ATTR: Regex = Regex::new(r#"\[Table\("([^"]+)"\)"#).unwrap();
    static ref CLASS_NAME: Regex = Regex::new(r"\bclass\s+([A-Za-z0-9_]+)").unwrap();
    static ref CLASS_ROUTE: Regex = Regex::new(r#"\[Route\("([^"]+)"\)\]"#).unwrap();
    static ref HTTP_ATTR: Regex =
        Regex::new(r#"\[Http(Get|Post|Put|Delete|Patch)(?:\("([^"]*)"\))?\]"#).unwrap();
    static ref METHOD_NAME: Regex =
        Regex::new(r"(?:public|private|protected)?\s+[\w<>\[\],]+\s+(\w+)\s*\(").unwrap();
}

const FRAMEWORKS: &[FrameworkRule] = &[
    FrameworkRule { name: "ASP.NET Core", markers: &["Microsoft.AspNetCore"] },
    FrameworkRule { name: "ASP.NET Core Web API", markers: &["[ApiController]", "[Route"] },
    FrameworkRule {
        name: "Entity Framework Core",
        markers: &["Microsoft.EntityFrameworkCore", "DbContext"],
    },
    FrameworkRule { name: ".NET Framework", markers: &["System.Web"] },
    FrameworkRule { name: "Dependency Injection", markers: &["IServiceCollection", "[Inject]"] },
    FrameworkRule { name: "xUnit", markers: &["using Xunit", "[Fact]"] },
    FrameworkRule { name: "NUnit", markers: &["using NUnit", "[Test]"] },
    FrameworkRule { name: "Moq", markers: &["using Moq"] },
    FrameworkRule { name: "Microsoft.Extensions.Logging", markers: &["ILogger"] },
    FrameworkRule { name: "Json.NET (Newtonsoft)", markers: &["Newtonsoft.Json"] },
    FrameworkRule { name: "System.Text.Json", markers: &["System.Text.Json"] },
];

const PATTERNS: &[PatternRule] = &[
    PatternRule { name: "Factory", name_hints: &["factory"], content_markers: &["Create("] },
    PatternRule { name: "Builder", name_hints: &["builder"], content_markers: &[] },
    PatternRule { name: "Repository", name_hints: &["repository"], content_markers: &["IRepository"] },
    PatternRule { name: "Service Layer", name_hints: &["service"], content_markers: &["IService"] },
    PatternRule { name: "DTO/VO", name_hints: &["dto", "model"], content_markers: &[] },
    PatternRule {
        name: "MVC Controller",
        name_hints: &["controller"],
        content_markers: &["[ApiController]"],
    },
];

pub struct CSharpAnalyzer;

impl CSharpAnalyzer {
    pub fn new() -> Self {
        Self
    }

    fn analyze_schemas(&self, content: &str, model: &mut AnalysisModel) {
        if !(content.contains("DbSet<") || content.contains("[Table(")) {
            return;
        }
        let table = TABLE_ATTR
            .captures(content)
            .or_else(|| CLASS_NAME.captures(content))
            .and_then(|c| c.get(1));
        if let Some(table) = table {
            model.add_schema(format!("Table: {} (EF Core Entity)", table.as_str()));
        }
    }

    fn analyze_endpoints(&self, content: &str, model: &mut AnalysisModel) {
        let class_route = CLASS_ROUTE
            .captures(content)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim_matches('/'))
            .unwrap_or("");

        for caps in HTTP_ATTR.captures_iter(content) {
            let method = caps[1].to_ascii_uppercase();
            let path = caps.get(2).map(|m| m.as_str().trim_matches('/')).unwrap_or("");
            let full = match (class_route.is_empty(), path.is_empty()) {
                (false, false) => format!("{}/{}", class_route, path),
                (false, true) => class_route.to_string(),
                _ => path.to_string(),
            };

            let after = caps.get(0).map(|m| m.end()).unwrap_or(0);
            let handler = METHOD_NAME
                .captures(&content[after..])
                .and_then(|c| c.get(1))
                .map(|m| m.as_str())
                .unwrap_or("unknown");
            model.add_endpoint(format!("{} /{} ({})", method, full, handler));
        }
    }
}

impl Default for CSharpAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageAnalyzer for CSharpAnalyzer {
    fn language(&self) -> Language {
        Language::CSharp
    }

    fn analyze(&self, unit: &SourceUnit, model: &mut AnalysisModel) -> Fidelity {
        let content = unit.content.as_str();
        let namespace = NAMESPACE
            .captures(content)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str());

        if let Some(ns) = namespace {
            model.add_package(ns);
        }
        model.add_classes(count_matches(&TYPE_DECL, content));

        if let Some(ns) = namespace {
            for caps in USING.captures_iter(content) {
                let used = &caps[1];
                if !used.starts_with("System") {
                    model.add_dependency(ns, used, "using");
                }
            }
        }

        detect_frameworks(content, FRAMEWORKS, model);
        detect_patterns(unit.file_name(), unit.unit_name(), content, PATTERNS, model);
        if content.contains("private static") && SINGLETON_INSTANCE.is_match(content) {
            model.add_pattern("Singleton", unit.unit_name());
        }
        self.analyze_schemas(content, model);
        self.analyze_endpoints(content, model);

        Fidelity::Heuristic
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_controller_analysis() {
        let source = r#"
using System;
using Microsoft.AspNetCore.Mvc;
using Shop.Domain.Orders;

namespace Shop.Api.Controllers
{
    [ApiController]
    [Route("api/orders")]
    public class OrdersController : ControllerBase
    {
        [HttpGet("{id}")]
        public IActionResult Get(int id) => Ok();

        [HttpPost]
        public IActionResult Create(OrderDto dto) => Ok();
    }
}
"#;
        let unit = SourceUnit::new("Api/OrdersController.cs", Language::CSharp, source);
        let mut model = AnalysisModel::new();
        let fidelity = CSharpAnalyzer::new().analyze(&unit, &mut model);

        assert_eq!(fidelity, Fidelity::Heuristic);
        assert!(model.packages.contains("Shop.Api.Controllers"));
        assert_eq!(model.class_count, 1);
        assert_eq!(model.dependencies.len(), 2);
        assert!(model
            .dependencies
            .iter()
            .all(|d| d.kind == "using" && !d.to.starts_with("System")));
        assert_eq!(model.framework_count("ASP.NET Core"), 1);
        assert_eq!(model.framework_count("ASP.NET Core Web API"), 1);
        assert_eq!(
            model.endpoints,
            vec![
                "GET /api/orders/{id} (Get)".to_string(),
                "POST /api/orders (Create)".to_string(),
            ]
        );
        assert_eq!(model.patterns["MVC Controller"], vec!["OrdersController".to_string()]);
    }

    #[test]
    fn test_ef_table() {
        let source = "[Table(\"customers\")]\npublic class Customer { }\n";
        let unit = SourceUnit::new("Customer.cs", Language::CSharp, source);
        let mut model = AnalysisModel::new();
        CSharpAnalyzer::new().analyze(&unit, &mut model);
        assert_eq!(model.schemas, vec!["Table: customers (EF Core Entity)".to_string()]);
    }
}
