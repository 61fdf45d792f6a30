//! Rust analyzer, including `Cargo.toml` manifests.

use lazy_static::lazy_static;
use regex::Regex;

use crate::analysis::language::Language;
use crate::analysis::model::AnalysisModel;
use crate::analysis::rules::{
    count_matches, detect_frameworks, detect_patterns, parent_module, FrameworkRule, PatternRule,
};
use crate::analysis::syntax::{Grammar, SourceView, StructureQuery};
use crate::analysis::traits::{Fidelity, LanguageAnalyzer, SourceUnit};

const STRUCTURE: StructureQuery = StructureQuery {
    type_kinds: &["struct_item", "enum_item", "trait_item", "union_item"],
    package_kind: Some("mod_item"),
};

/// Path roots that never name an external crate.
const LOCAL_ROOTS: &[&str] = &["std", "core", "alloc", "self", "super", "crate"];

const DEPENDENCY_SECTIONS: &[&str] = &["dependencies", "dev-dependencies", "build-dependencies"];

lazy_static! {
    static ref USE: Regex = Regex::new(r"(?m)^\s*(?:pub(?:\([^)]*\))?\s+)?use\s+(?:::)?(\w+)").unwrap();
    static ref EXTERN_CRATE: Regex = Regex::new(r"(?m)^\s*extern\s+crate\s+(\w+)").unwrap();
    static ref MOD: Regex = Regex::new(r"(?m)^\s*(?:pub(?:\([^)]*\))?\s+)?mod\s+(\w+)").unwrap();
    static ref TYPE_DECL: Regex =
        Regex::new(r"(?m)^\s*(?:pub(?:\([^)]*\))?\s+)?(?:struct|enum|trait|union)\s+\w+").unwrap();
    static ref STATE_ENUM: Regex = Regex::new(r"enum\s+\w+State\b").unwrap();
    static ref CARGO_KEY: Regex = Regex::new(r"^([A-Za-z0-9_][\w-]*)\s*=").unwrap();
    static ref CARGO_SECTION: Regex = Regex::new(r"^\[([^\]]+)\]").unwrap();
    static ref ATTRIBUTE_ROUTE: Regex =
        Regex::new(r#"#\[(get|post|put|patch|delete)\(\s*"([^"]+)""#).unwrap();
    static ref AXUM_ROUTE: Regex =
        Regex::new(r#"\.route\(\s*"([^"]+)",\s*(get|post|put|patch|delete)\("#).unwrap();
    static ref WARP_PATH: Regex = Regex::new(r#"warp::path\(\s*"([^"]+)"\s*\)"#).unwrap();
    static ref DIESEL_TABLE: Regex =
        Regex::new(r"(?m)^\s*(?:diesel::)?table!\s*\{\s*(?:[\w.]+\.)?(\w+)\s*\(").unwrap();
    static ref SQL_TABLE: Regex = Regex::new(r"(?i)\b(?:FROM|INTO|UPDATE)\s+(\w+)").unwrap();
}

const FRAMEWORKS: &[FrameworkRule] = &[
    FrameworkRule { name: "Tokio (Async Runtime)", markers: &["tokio::", "use tokio", "#[tokio::main]"] },
    FrameworkRule { name: "async-std", markers: &["async_std"] },
    FrameworkRule { name: "Actix-Web", markers: &["actix_web"] },
    FrameworkRule { name: "Axum", markers: &["axum::", "use axum"] },
    FrameworkRule { name: "Rocket", markers: &["rocket::", "#[launch]", "use rocket"] },
    FrameworkRule { name: "Warp", markers: &["warp::"] },
    FrameworkRule { name: "Hyper (HTTP)", markers: &["hyper::"] },
    FrameworkRule { name: "Tide", markers: &["tide::"] },
    FrameworkRule {
        name: "Serde (Serialization)",
        markers: &["serde::", "use serde", "derive(Serialize", "derive(Deserialize"],
    },
    FrameworkRule { name: "serde_json", markers: &["serde_json"] },
    FrameworkRule { name: "Diesel (ORM)", markers: &["diesel::", "use diesel"] },
    FrameworkRule { name: "SQLx", markers: &["sqlx::", "use sqlx"] },
    FrameworkRule { name: "SeaORM", markers: &["sea_orm"] },
    FrameworkRule { name: "Rusqlite (SQLite)", markers: &["rusqlite"] },
    FrameworkRule { name: "MongoDB (Rust)", markers: &["mongodb::"] },
    FrameworkRule { name: "Redis (Rust)", markers: &["redis::"] },
    FrameworkRule { name: "Reqwest (HTTP Client)", markers: &["reqwest"] },
    FrameworkRule { name: "Ureq (HTTP Client)", markers: &["ureq::"] },
    FrameworkRule { name: "Clap (CLI)", markers: &["clap::", "use clap", "derive(Parser"] },
    FrameworkRule { name: "StructOpt (CLI)", markers: &["structopt", "StructOpt"] },
    FrameworkRule { name: "Rayon (Parallelism)", markers: &["rayon::", "use rayon"] },
    FrameworkRule { name: "Crossbeam (Concurrency)", markers: &["crossbeam"] },
    FrameworkRule { name: "Tonic (gRPC)", markers: &["tonic::"] },
    FrameworkRule { name: "Prost (Protocol Buffers)", markers: &["prost::"] },
    FrameworkRule { name: "Rust Built-in Test", markers: &["#[test]", "#[cfg(test)]"] },
    FrameworkRule { name: "Mockall (Mocking)", markers: &["mockall"] },
    FrameworkRule { name: "Proptest (Property Testing)", markers: &["proptest"] },
    FrameworkRule { name: "log (Logging Facade)", markers: &["log::", "use log;"] },
    FrameworkRule { name: "Tracing (Observability)", markers: &["tracing::", "use tracing"] },
    FrameworkRule { name: "env_logger", markers: &["env_logger"] },
    FrameworkRule { name: "Bevy (Game Engine)", markers: &["bevy::"] },
    FrameworkRule { name: "no_std (Embedded/Bare Metal)", markers: &["#![no_std]"] },
    FrameworkRule { name: "embedded-hal", markers: &["embedded_hal"] },
    FrameworkRule { name: "wasm-bindgen (WebAssembly)", markers: &["wasm_bindgen"] },
    FrameworkRule { name: "web-sys", markers: &["web_sys"] },
];

const PATTERNS: &[PatternRule] = &[
    PatternRule {
        name: "Builder",
        name_hints: &["builder"],
        content_markers: &["fn builder(", "fn build("],
    },
    PatternRule {
        name: "Strategy (Trait Object)",
        name_hints: &["strategy"],
        content_markers: &["dyn "],
    },
    PatternRule { name: "Command", name_hints: &["command", "cmd"], content_markers: &[] },
    PatternRule {
        name: "Observer / Event",
        name_hints: &["event", "listener"],
        content_markers: &["EventEmitter"],
    },
    PatternRule {
        name: "Singleton (OnceLock/once_cell)",
        name_hints: &[],
        content_markers: &["once_cell", "lazy_static", "OnceCell", "OnceLock"],
    },
    PatternRule { name: "Repository", name_hints: &["repository", "repo"], content_markers: &[] },
    PatternRule { name: "Service Layer", name_hints: &["service"], content_markers: &[] },
    PatternRule {
        name: "Middleware",
        name_hints: &["middleware"],
        content_markers: &["from_fn", "impl<S> Transform"],
    },
    PatternRule {
        name: "Iterator",
        name_hints: &[],
        content_markers: &["impl Iterator", "fn next("],
    },
    PatternRule {
        name: "Error Handling (thiserror/anyhow)",
        name_hints: &[],
        content_markers: &["thiserror", "anyhow", "impl std::error::Error", "impl Error for"],
    },
];

pub struct RustAnalyzer;

impl RustAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Keys of the dependency tables, including `[dependencies.name]` headers.
    fn analyze_cargo_manifest(&self, content: &str, model: &mut AnalysisModel) {
        let mut in_deps = false;
        for line in content.lines().map(str::trim) {
            if let Some(caps) = CARGO_SECTION.captures(line) {
                let header = caps[1].trim();
                in_deps = DEPENDENCY_SECTIONS.contains(&header);
                if let Some((section, name)) = header.split_once('.') {
                    if DEPENDENCY_SECTIONS.contains(&section) {
                        model.add_dependency("Cargo.toml", name.trim_matches('"'), "dependency");
                    }
                }
                continue;
            }
            if in_deps {
                if let Some(caps) = CARGO_KEY.captures(line) {
                    model.add_dependency("Cargo.toml", &caps[1], "dependency");
                }
            }
        }
    }

    fn detect_special_patterns(&self, unit: &SourceUnit, model: &mut AnalysisModel) {
        let content = unit.content.as_str();
        let name = unit.unit_name();
        let lower = unit.file_name().to_ascii_lowercase();

        if lower.contains("state") || STATE_ENUM.is_match(content) {
            model.add_pattern("State / Typestate", name);
        }
        if lower.contains("factory") || (content.contains("fn new(") && content.contains("-> Self"))
        {
            model.add_pattern("Factory", name);
        }
    }

    fn analyze_endpoints(&self, content: &str, model: &mut AnalysisModel) {
        let attribute_framework = if content.contains("rocket") {
            "Rocket"
        } else {
            "Actix-Web"
        };
        for caps in ATTRIBUTE_ROUTE.captures_iter(content) {
            model.add_endpoint(format!(
                "{} {} ({})",
                caps[1].to_ascii_uppercase(),
                &caps[2],
                attribute_framework
            ));
        }
        for caps in AXUM_ROUTE.captures_iter(content) {
            model.add_endpoint(format!("{} {} (Axum)", caps[2].to_ascii_uppercase(), &caps[1]));
        }
        for caps in WARP_PATH.captures_iter(content) {
            model.add_endpoint(format!("PATH /{} (Warp)", &caps[1]));
        }
    }

    fn analyze_schemas(&self, content: &str, model: &mut AnalysisModel) {
        for caps in DIESEL_TABLE.captures_iter(content) {
            model.add_schema(format!("Table: {} (Diesel)", &caps[1]));
        }
        if content.contains("sqlx::") {
            for caps in SQL_TABLE.captures_iter(content) {
                let table = &caps[1];
                if !matches!(table.to_ascii_lowercase().as_str(), "select" | "where" | "set") {
                    model.add_schema(format!("Table: {} (SQLx)", table));
                }
            }
        }
    }
}

impl Default for RustAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageAnalyzer for RustAnalyzer {
    fn language(&self) -> Language {
        Language::Rust
    }

    fn supports_structured_parsing(&self) -> bool {
        cfg!(feature = "tree-sitter")
    }

    fn analyze(&self, unit: &SourceUnit, model: &mut AnalysisModel) -> Fidelity {
        let content = unit.content.as_str();
        if unit.file_name().eq_ignore_ascii_case("cargo.toml") {
            self.analyze_cargo_manifest(content, model);
            return Fidelity::Manifest;
        }

        let krate = parent_module(unit.directory());
        let (first_mod, type_count, fidelity) =
            match SourceView::of(Grammar::Rust, content, &STRUCTURE, &unit.relative_path) {
                SourceView::Parsed(facts) => (
                    facts.packages.into_iter().next(),
                    facts.type_count,
                    Fidelity::Structured,
                ),
                SourceView::Heuristic => (
                    MOD.captures(content).map(|c| c[1].to_string()),
                    count_matches(&TYPE_DECL, content),
                    Fidelity::Heuristic,
                ),
            };
        model.add_package(first_mod.unwrap_or_else(|| krate.to_string()));
        model.add_classes(type_count);

        for caps in USE.captures_iter(content) {
            let root = &caps[1];
            if !LOCAL_ROOTS.contains(&root) {
                model.add_dependency(krate, root, "use");
            }
        }
        for caps in EXTERN_CRATE.captures_iter(content) {
            model.add_dependency(krate, &caps[1], "extern_crate");
        }

        detect_frameworks(content, FRAMEWORKS, model);
        detect_patterns(unit.file_name(), unit.unit_name(), content, PATTERNS, model);
        self.detect_special_patterns(unit, model);
        self.analyze_endpoints(content, model);
        self.analyze_schemas(content, model);

        fidelity
    }
}
