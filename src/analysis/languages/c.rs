//! C language analyzer.

use lazy_static::lazy_static;
use regex::Regex;

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
        "struct_specifier",
        "enum_specifier",
        "union_specifier",
        "type_definition",
    ],
    package_kind: None,
};

lazy_static! {
    pub(crate) static ref LOCAL_INCLUDE: Regex =
        Regex::new(r#"(?m)^\s*#\s*include\s*"([^"]+)""#).unwrap();
    static ref TYPE_BODY: Regex = Regex::new(r"\b(?:struct|enum|union)\s+\w+\s*\{").unwrap();
    static ref TYPEDEF: Regex = Regex::new(r"\btypedef\b").unwrap();
    static ref STATIC_INSTANCE: Regex = Regex::new(r"static\s+\w+\s*\*\s*instance\s*=").unwrap();
    static ref CREATE_FN: Regex = Regex::new(r"\w+\s*\*\s*create_\w+\s*\(").unwrap();
    static ref FN_POINTER: Regex = Regex::new(r"void\s*\(\*\w+\)\s*\(").unwrap();
    static ref STATE_CASE: Regex = Regex::new(r"case\s+\w+_STATE").unwrap();
    pub(crate) static ref CREATE_TABLE: Regex =
        Regex::new(r"(?i)CREATE\s+TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?(\w+)").unwrap();
    static ref CURL_URL: Regex = Regex::new(r#"CURLOPT_URL,\s*"([^"]+)""#).unwrap();
}

const FRAMEWORKS: &[FrameworkRule] = &[
    FrameworkRule { name: "C Standard I/O (stdio.h)", markers: &["<stdio.h>"] },
    FrameworkRule { name: "C Standard Library (stdlib.h)", markers: &["<stdlib.h>"] },
    FrameworkRule { name: "C String Library (string.h)", markers: &["<string.h>"] },
    FrameworkRule { name: "C Math Library (math.h)", markers: &["<math.h>"] },
    FrameworkRule { name: "POSIX Threads (pthread)", markers: &["<pthread.h>"] },
    FrameworkRule { name: "POSIX API (unistd.h)", markers: &["<unistd.h>"] },
    FrameworkRule { name: "Socket API", markers: &["<sys/socket.h>", "<winsock2.h>"] },
    FrameworkRule { name: "libcurl", markers: &["libcurl", "<curl/curl.h>"] },
    FrameworkRule { name: "libuv", markers: &["libuv", "<uv.h>"] },
    FrameworkRule { name: "SQLite3", markers: &["<sqlite3.h>"] },
    FrameworkRule { name: "MySQL C API", markers: &["<mysql.h>", "mysql_"] },
    FrameworkRule { name: "PostgreSQL (libpq)", markers: &["<libpq-fe.h>"] },
    FrameworkRule { name: "CUnit", markers: &["CUnit"] },
    FrameworkRule { name: "cmocka", markers: &["cmocka"] },
    FrameworkRule { name: "Check", markers: &["<check.h>", "START_TEST"] },
    FrameworkRule { name: "OpenMP", markers: &["<omp.h>", "#pragma omp"] },
    FrameworkRule { name: "MPI", markers: &["<mpi.h>", "MPI_Init"] },
    FrameworkRule { name: "OpenGL", markers: &["<GL/gl.h>", "<OpenGL/gl.h>"] },
    FrameworkRule { name: "Vulkan", markers: &["<vulkan/vulkan.h>"] },
];

const PATTERNS: &[PatternRule] = &[
    PatternRule { name: "Observer/Callback", name_hints: &[], content_markers: &["(*callback)", "callback_fn"] },
    PatternRule { name: "Utility", name_hints: &["util", "helper"], content_markers: &[] },
    PatternRule { name: "Test", name_hints: &["test", "spec"], content_markers: &[] },
];

pub struct CAnalyzer;

impl CAnalyzer {
    pub fn new() -> Self {
        Self
    }

    fn detect_special_patterns(&self, unit: &SourceUnit, model: &mut AnalysisModel) {
        let content = unit.content.as_str();
        let name = unit.unit_name();
        if (content.contains("static ") && content.contains("getInstance"))
            || STATIC_INSTANCE.is_match(content)
        {
            model.add_pattern("Singleton", name);
        }
        if CREATE_FN.is_match(content) {
            model.add_pattern("Factory", name);
        }
        // Function-pointer members without the usual callback spelling.
        if FN_POINTER.is_match(content)
            && !(content.contains("(*callback)") || content.contains("callback_fn"))
        {
            model.add_pattern("Observer/Callback", name);
        }
        if content.contains("switch") && content.contains("state") && STATE_CASE.is_match(content)
        {
            model.add_pattern("State Machine", name);
        }
        if unit.file_name().to_ascii_lowercase().ends_with(".h")
            && content.contains("#ifndef")
            && content.contains("#define")
        {
            model.add_pattern("Header Guard / Module", name);
        }
    }

    fn analyze_schemas(&self, content: &str, model: &mut AnalysisModel) {
        if content.contains("sqlite3_exec") || content.contains("sqlite3_prepare") {
            add_tables(&CREATE_TABLE, content, "SQLite3", model);
        }
        if content.contains("mysql_query") || content.contains("PQexec") {
            add_tables(&CREATE_TABLE, content, "C DB API", model);
        }
    }

    fn analyze_endpoints(&self, content: &str, model: &mut AnalysisModel) {
        if content.contains("curl_easy_setopt") {
            for caps in CURL_URL.captures_iter(content) {
                model.add_endpoint(format!("HTTP (libcurl): {}", &caps[1]));
            }
        }
        if content.contains("bind(") && content.contains("listen(") {
            model.add_endpoint("TCP Socket Server (C Socket API)");
        }
        if content.contains("mg_http_listen") || content.contains("mg_listen") {
            model.add_endpoint("HTTP Server (Mongoose C)");
        }
    }
}

impl Default for CAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageAnalyzer for CAnalyzer {
    fn language(&self) -> Language {
        Language::C
    }

    fn supports_structured_parsing(&self) -> bool {
        cfg!(feature = "tree-sitter")
    }

    fn analyze(&self, unit: &SourceUnit, model: &mut AnalysisModel) -> Fidelity {
        let content = unit.content.as_str();
        let module = parent_module(unit.directory());
        model.add_package(module);

        let fidelity = match SourceView::of(Grammar::C, content, &STRUCTURE, &unit.relative_path) {
            SourceView::Parsed(facts) => {
                model.add_classes(facts.type_count);
                Fidelity::Structured
            }
            SourceView::Heuristic => {
                model.add_classes(
                    count_matches(&TYPE_BODY, content) + count_matches(&TYPEDEF, content),
                );
                Fidelity::Heuristic
            }
        };

        // System headers only feed framework detection.
        for caps in LOCAL_INCLUDE.captures_iter(content) {
            model.add_dependency(module, &caps[1], "#include");
        }

        detect_frameworks(content, FRAMEWORKS, model);
        detect_patterns(unit.file_name(), unit.unit_name(), content, PATTERNS, model);
        self.detect_special_patterns(unit, model);
        self.analyze_schemas(content, model);
        self.analyze_endpoints(content, model);

        fidelity
    }
}
