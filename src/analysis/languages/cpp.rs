//! C++ language analyzer.
//!
//! Namespaces become packages. Include edges originate from the containing
//! directory, the same way the C analyzer attributes them.

use lazy_static::lazy_static;
use regex::Regex;

use super::c::{CREATE_TABLE, LOCAL_INCLUDE};
use crate::analysis::language::Language;
use crate::analysis::model::AnalysisModel;
use crate::analysis::rules::{
    add_tables, count_matches, detect_frameworks, detect_patterns, parent_module, FrameworkRule,
    PatternRule,
};
use crate::analysis::syntax::{Grammar, SourceView, StructureQuery};
use crate::analysis::traits::{Fidelity, LanguageAnalyzer, SourceUnit};

const STRUCTURE: StructureQuery = StructureQuery {
    type_kinds: &[
        "class_specifier",
        "struct_specifier",
        "union_specifier",
        "enum_specifier",
    ],
    package_kind: Some("namespace_definition"),
};

/// Namespaces that say nothing about the project's architecture.
const IGNORED_NAMESPACES: &[&str] = &["std", "detail", "impl"];

lazy_static! {
    static ref NAMESPACE: Regex = Regex::new(r"\bnamespace\s+(\w+)\s*\{").unwrap();
    static ref TYPE_DECL: Regex =
        Regex::new(r"\b(?:class|struct|enum\s+class|enum|union|interface)\s+\w+").unwrap();
    static ref TEMPLATE: Regex = Regex::new(r"\btemplate\s*<").unwrap();
    static ref CREATE_CALL: Regex = Regex::new(r"\bCreate\w+\s*\(").unwrap();
    static ref CRTP: Regex = Regex::new(r"class\s+(\w+)\s*:\s*public\s+\w+<(\w+)>").unwrap();
    static ref CROW_ROUTE: Regex =
        Regex::new(r#"CROW_ROUTE\s*\(\s*app,\s*"([^"]+)"\)"#).unwrap();
    static ref PISTACHE_ROUTE: Regex =
        Regex::new(r#"Routes::(Get|Post|Put|Delete)\s*\(\s*router,\s*"([^"]+)""#).unwrap();
}

const FRAMEWORKS: &[FrameworkRule] = &[
    FrameworkRule {
        name: "C++ STL (Standard Template Library)",
        markers: &["<vector>", "<map>", "<unordered_map>", "<list>"],
    },
    FrameworkRule { name: "C++ I/O Streams", markers: &["<iostream>", "<fstream>"] },
    FrameworkRule {
        name: "C++ Concurrency (std::thread)",
        markers: &["<thread>", "<mutex>", "<future>"],
    },
    FrameworkRule { name: "C++ Algorithms (std::algorithm)", markers: &["<algorithm>"] },
    FrameworkRule { name: "Boost", markers: &["boost/", "boost::"] },
    FrameworkRule { name: "Boost.Asio (Networking)", markers: &["boost::asio"] },
    FrameworkRule { name: "Boost.Filesystem", markers: &["boost::filesystem"] },
    FrameworkRule {
        name: "Qt Framework",
        markers: &["#include <Q", "QApplication", "QObject", "Q_OBJECT"],
    },
    FrameworkRule { name: "Qt Widgets", markers: &["QWidget", "QMainWindow"] },
    FrameworkRule { name: "Qt QML", markers: &["QML", "QQuickView"] },
    FrameworkRule { name: "OpenCV", markers: &["<opencv", "cv::"] },
    FrameworkRule { name: "Eigen", markers: &["<Eigen/", "Eigen::"] },
    FrameworkRule { name: "gRPC", markers: &["<grpc++/", "grpc::"] },
    FrameworkRule { name: "Protocol Buffers", markers: &[".proto", "google::protobuf"] },
    FrameworkRule { name: "SQLite3", markers: &["<sqlite3.h>", "sqlite3_"] },
    FrameworkRule { name: "MySQL Connector/C++", markers: &["mysqlx::", "<mysql_driver.h>"] },
    FrameworkRule { name: "libpqxx (PostgreSQL)", markers: &["pqxx::", "<pqxx/"] },
    FrameworkRule { name: "Google Test (gtest)", markers: &["gtest/gtest.h", "TEST(", "EXPECT_"] },
    FrameworkRule { name: "Catch2", markers: &["catch2/", "CATCH_CONFIG_MAIN", "TEST_CASE"] },
    FrameworkRule { name: "doctest", markers: &["doctest.h", "DOCTEST_CONFIG"] },
    FrameworkRule { name: "spdlog", markers: &["spdlog"] },
    FrameworkRule { name: "log4cpp / log4cxx", markers: &["log4cpp", "log4cxx"] },
    FrameworkRule { name: "nlohmann/json", markers: &["nlohmann/json", "nlohmann::json"] },
    FrameworkRule { name: "RapidJSON", markers: &["rapidjson"] },
    FrameworkRule { name: "POCO C++ Libraries", markers: &["Poco::", "<Poco/"] },
    FrameworkRule { name: "CPR (C++ Requests)", markers: &["cpr::", "<cpr/"] },
    FrameworkRule { name: "SFML", markers: &["SFML"] },
    FrameworkRule { name: "SDL2", markers: &["SDL_", "<SDL2/"] },
    FrameworkRule { name: "OGRE 3D", markers: &["Ogre::", "<Ogre/"] },
    FrameworkRule { name: "OpenMP", markers: &["<omp.h>", "#pragma omp"] },
    FrameworkRule { name: "MPI", markers: &["<mpi.h>", "MPI_Init"] },
    FrameworkRule { name: "OpenGL", markers: &["<GL/gl.h>", "glBegin"] },
    FrameworkRule { name: "Vulkan", markers: &["<vulkan/vulkan.h>", "vkCreateInstance"] },
    FrameworkRule { name: "CUDA", markers: &["<cuda_runtime.h>", "__global__"] },
];

const PATTERNS: &[PatternRule] = &[
    PatternRule { name: "Factory", name_hints: &["factory"], content_markers: &[] },
    PatternRule { name: "Builder", name_hints: &["builder"], content_markers: &[".build()"] },
    PatternRule {
        name: "Observer",
        name_hints: &["observer", "listener"],
        content_markers: &["notify(", "subscribe("],
    },
    PatternRule { name: "Strategy", name_hints: &["strategy", "policy"], content_markers: &[] },
    PatternRule { name: "Decorator", name_hints: &["decorator", "wrapper"], content_markers: &[] },
    PatternRule { name: "Repository", name_hints: &["repository", "repo"], content_markers: &[] },
    PatternRule { name: "Service Layer", name_hints: &["service"], content_markers: &[] },
    PatternRule { name: "MVC Controller", name_hints: &["controller"], content_markers: &[] },
];

pub struct CppAnalyzer;

impl CppAnalyzer {
    pub fn new() -> Self {
        Self
    }

    fn detect_special_patterns(&self, unit: &SourceUnit, model: &mut AnalysisModel) {
        let content = unit.content.as_str();
        let name = unit.unit_name();
        let lower = unit.file_name().to_ascii_lowercase();

        if content.contains("static") && content.contains("getInstance") && content.contains("private:")
        {
            model.add_pattern("Singleton", name);
        }
        if !lower.contains("factory") && CREATE_CALL.is_match(content) {
            model.add_pattern("Factory", name);
        }
        if lower.contains("command") && content.contains("execute(") {
            model.add_pattern("Command", name);
        }
        if content.contains("Impl") && content.contains("unique_ptr") && content.contains("private:")
        {
            model.add_pattern("PIMPL (Pointer to Implementation)", name);
        }
        // Derived class passing itself as the base's template argument.
        if CRTP.captures_iter(content).any(|c| c[1] == c[2]) {
            model.add_pattern("CRTP (Template Pattern)", name);
        }
        if lower.ends_with(".hpp") && content.contains("#ifndef") && content.contains("#define") {
            model.add_pattern("Header Guard / Module", name);
        }
    }

    fn analyze_schemas(&self, content: &str, model: &mut AnalysisModel) {
        if content.contains("sqlite3_exec") || content.contains("sqlite3_prepare") {
            add_tables(&CREATE_TABLE, content, "SQLite3", model);
        }
        if content.contains("pqxx::") {
            add_tables(&CREATE_TABLE, content, "PostgreSQL", model);
        }
    }

    fn analyze_endpoints(&self, content: &str, model: &mut AnalysisModel) {
        if content.contains("boost::beast::http") || content.contains("beast::http::") {
            model.add_endpoint("HTTP Server (Boost.Beast)");
        }
        if content.contains("Poco::Net::HTTPServer") || content.contains("Poco::Net::ServerSocket") {
            model.add_endpoint("HTTP Server (POCO)");
        }
        if content.contains("grpc::Server") || content.contains("ServerBuilder") {
            model.add_endpoint("gRPC Server");
        }
        if content.contains("bind(") && content.contains("listen(") {
            model.add_endpoint("TCP Socket Server");
        }
        for caps in CROW_ROUTE.captures_iter(content) {
            model.add_endpoint(format!("GET/POST {} (Crow)", &caps[1]));
        }
        for caps in PISTACHE_ROUTE.captures_iter(content) {
            model.add_endpoint(format!(
                "{} {} (Pistache)",
                caps[1].to_ascii_uppercase(),
                &caps[2]
            ));
        }
    }
}

impl Default for CppAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageAnalyzer for CppAnalyzer {
    fn language(&self) -> Language {
        Language::Cpp
    }

    fn supports_structured_parsing(&self) -> bool {
        cfg!(feature = "tree-sitter")
    }

    fn analyze(&self, unit: &SourceUnit, model: &mut AnalysisModel) -> Fidelity {
        let content = unit.content.as_str();

        let (namespaces, type_count, fidelity) =
            match SourceView::of(Grammar::Cpp, content, &STRUCTURE, &unit.relative_path) {
                SourceView::Parsed(facts) => (facts.packages, facts.type_count, Fidelity::Structured),
                SourceView::Heuristic => (
                    NAMESPACE
                        .captures_iter(content)
                        .map(|c| c[1].to_string())
                        .collect(),
                    count_matches(&TYPE_DECL, content),
                    Fidelity::Heuristic,
                ),
            };

        for ns in namespaces
            .iter()
            .filter(|ns| !IGNORED_NAMESPACES.contains(&ns.as_str()))
        {
            model.add_package(ns.as_str());
        }
        model.add_classes(type_count);

        let module = parent_module(unit.directory());
        for caps in LOCAL_INCLUDE.captures_iter(content) {
            model.add_dependency(module, &caps[1], "#include");
        }

        detect_frameworks(content, FRAMEWORKS, model);
        if TEMPLATE.is_match(content) {
            model.add_framework("C++ Templates / Metaprogramming");
        }
        if content.contains("<memory>")
            && (content.contains("shared_ptr") || content.contains("unique_ptr"))
        {
            model.add_framework("C++ Smart Pointers");
        }
        detect_patterns(unit.file_name(), unit.unit_name(), content, PATTERNS, model);
        self.detect_special_patterns(unit, model);
        self.analyze_schemas(content, model);
        self.analyze_endpoints(content, model);

        fidelity
    }
}
