//! Python analyzer, including the packaging manifests
//! (`requirements.txt`, `Pipfile`, `pyproject.toml`, `setup.py`, `setup.cfg`).

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
    type_kinds: &["class_definition"],
    package_kind: None,
};

/// Standard-library modules (plus the conventional numeric aliases) that are
/// never recorded as dependencies.
static STDLIB: phf::Set<&'static str> = phf::phf_set! {
    "abc", "argparse", "array", "ast", "asyncio", "atexit", "base64", "binascii",
    "bisect", "builtins", "bz2", "calendar", "cgi", "cmath", "cmd", "code", "codecs",
    "collections", "concurrent", "configparser", "contextlib", "contextvars", "copy",
    "copyreg", "cProfile", "csv", "ctypes", "curses", "dataclasses", "datetime", "dbm",
    "decimal", "difflib", "dis", "distutils", "doctest", "email", "encodings", "enum",
    "errno", "faulthandler", "fcntl", "filecmp", "fileinput", "fnmatch", "fractions",
    "ftplib", "functools", "gc", "getopt", "getpass", "gettext", "glob", "grp", "gzip",
    "hashlib", "heapq", "hmac", "html", "http", "imaplib", "importlib", "inspect", "io",
    "ipaddress", "itertools", "json", "keyword", "linecache", "locale", "logging", "lzma",
    "mailbox", "marshal", "math", "mimetypes", "mmap", "multiprocessing", "netrc",
    "numbers", "operator", "optparse", "os", "pathlib", "pdb", "pickle", "pkgutil",
    "platform", "plistlib", "poplib", "posix", "pprint", "profile", "pstats", "pty", "pwd",
    "py_compile", "pydoc", "queue", "random", "re", "readline", "reprlib", "resource",
    "runpy", "sched", "secrets", "select", "selectors", "shelve", "shlex", "shutil",
    "signal", "site", "smtplib", "socket", "socketserver", "sqlite3", "ssl", "stat",
    "statistics", "string", "struct", "subprocess", "symtable", "sys", "sysconfig",
    "syslog", "tarfile", "tempfile", "termios", "test", "textwrap", "threading", "time",
    "timeit", "tkinter", "token", "tokenize", "tomllib", "trace", "traceback",
    "tracemalloc", "tty", "types", "typing", "unicodedata", "unittest", "urllib", "uuid",
    "venv", "warnings", "wave", "weakref", "webbrowser", "winreg", "wsgiref", "xml",
    "xmlrpc", "zipapp", "zipfile", "zipimport", "zlib", "zoneinfo",
    "np", "pd", "tf", "plt",
};

lazy_static! {
    static ref IMPORT: Regex = Regex::new(r"(?m)^\s*import\s+([\w.]+)").unwrap();
    static ref FROM_IMPORT: Regex = Regex::new(r"(?m)^\s*from\s+([\w.]+)\s+import\b").unwrap();
    static ref CLASS: Regex = Regex::new(r"(?m)^class\s+\w+").unwrap();
    static ref REQUIREMENT_NAME: Regex = Regex::new(r"^([A-Za-z0-9][A-Za-z0-9._-]*)").unwrap();
    static ref QUOTED_REQUIREMENT: Regex =
        Regex::new(r#"["']([A-Za-z0-9][A-Za-z0-9._-]*)[^"']*["']"#).unwrap();
    static ref TOML_KEY: Regex = Regex::new(r#"^"?([A-Za-z0-9][A-Za-z0-9._-]*)"?\s*="#).unwrap();
    static ref TOML_SECTION: Regex = Regex::new(r"^\[([^\]]+)\]").unwrap();
    static ref PEP621_DEPENDENCIES: Regex =
        Regex::new(r"(?ms)^\s*dependencies\s*=\s*\[(.*?)\]\s*$").unwrap();
    static ref INSTALL_REQUIRES_LIST: Regex =
        Regex::new(r"(?s)install_requires\s*=\s*\[([^\]]*)\]").unwrap();
    static ref FLASK_ROUTE: Regex =
        Regex::new(r#"@(?:\w+)\.route\(\s*["']([^"']+)["']"#).unwrap();
    static ref VERB_DECORATOR: Regex =
        Regex::new(r#"@(?:\w+)\.(get|post|put|patch|delete)\(\s*["']([^"']+)["']"#).unwrap();
    static ref DJANGO_URL: Regex = Regex::new(r#"\b(?:re_)?path\(\s*r?["']([^"']*)["']"#).unwrap();
    static ref AIOHTTP_ROUTE: Regex =
        Regex::new(r#"router\.add_(?:get|post|put|patch|delete|route)\(\s*["']([^"']+)["']"#)
            .unwrap();
    static ref DJANGO_MODEL: Regex =
        Regex::new(r"(?m)^class\s+(\w+)\s*\([^)]*models\.Model[^)]*\)").unwrap();
    static ref SQLALCHEMY_TABLE: Regex =
        Regex::new(r#"__tablename__\s*=\s*["'](\w+)["']"#).unwrap();
    static ref ALEMBIC_TABLE: Regex =
        Regex::new(r#"op\.create_table\(\s*["'](\w+)["']"#).unwrap();
    static ref RAW_SQL_TABLE: Regex = Regex::new(r"\b(?:FROM|INTO|UPDATE)\s+(\w+)").unwrap();
}

const FRAMEWORKS: &[FrameworkRule] = &[
    FrameworkRule { name: "Django", markers: &["from django", "import django", "django"] },
    FrameworkRule { name: "Flask", markers: &["from flask", "import flask", "Flask(", "flask"] },
    FrameworkRule { name: "FastAPI", markers: &["from fastapi", "FastAPI(", "fastapi"] },
    FrameworkRule { name: "Tornado", markers: &["import tornado", "tornado.web"] },
    FrameworkRule { name: "Sanic", markers: &["from sanic", "Sanic("] },
    FrameworkRule { name: "Starlette", markers: &["from starlette"] },
    FrameworkRule { name: "aiohttp", markers: &["import aiohttp", "from aiohttp"] },
    FrameworkRule { name: "Falcon", markers: &["import falcon"] },
    FrameworkRule { name: "Bottle", markers: &["from bottle", "import bottle"] },
    FrameworkRule {
        name: "Django REST Framework (DRF)",
        markers: &["rest_framework", "APIView", "viewsets.ModelViewSet"],
    },
    FrameworkRule { name: "Pydantic", markers: &["pydantic", "BaseModel"] },
    FrameworkRule {
        name: "SQLAlchemy",
        markers: &["sqlalchemy", "SQLAlchemy", "declarative_base", "sessionmaker"],
    },
    FrameworkRule { name: "Peewee (ORM)", markers: &["peewee"] },
    FrameworkRule { name: "Tortoise ORM", markers: &["from tortoise", "Tortoise.init"] },
    FrameworkRule { name: "Alembic (DB Migration)", markers: &["alembic"] },
    FrameworkRule { name: "PyMongo (MongoDB)", markers: &["pymongo", "MongoClient"] },
    FrameworkRule { name: "Redis-py", markers: &["import redis", "from redis", "redis"] },
    FrameworkRule { name: "psycopg (PostgreSQL)", markers: &["psycopg"] },
    FrameworkRule { name: "asyncio", markers: &["import asyncio", "async def"] },
    FrameworkRule { name: "Celery", markers: &["celery", "Celery("] },
    FrameworkRule { name: "Kafka-python", markers: &["from kafka", "KafkaProducer", "KafkaConsumer"] },
    FrameworkRule { name: "Pika (RabbitMQ)", markers: &["import pika"] },
    FrameworkRule { name: "TensorFlow", markers: &["tensorflow", "tf.keras"] },
    FrameworkRule { name: "PyTorch", markers: &["import torch", "from torch", "torch"] },
    FrameworkRule { name: "scikit-learn", markers: &["sklearn", "scikit-learn"] },
    FrameworkRule { name: "Hugging Face Transformers", markers: &["transformers", "AutoTokenizer"] },
    FrameworkRule { name: "LangChain", markers: &["langchain"] },
    FrameworkRule { name: "OpenAI SDK", markers: &["import openai", "from openai"] },
    FrameworkRule { name: "NumPy", markers: &["numpy"] },
    FrameworkRule { name: "Pandas", markers: &["pandas"] },
    FrameworkRule { name: "Matplotlib", markers: &["matplotlib"] },
    FrameworkRule { name: "Graphene (GraphQL)", markers: &["graphene"] },
    FrameworkRule { name: "Strawberry (GraphQL)", markers: &["strawberry"] },
    FrameworkRule { name: "gRPC (Python)", markers: &["import grpc", "from grpc"] },
    FrameworkRule { name: "Scrapy", markers: &["scrapy"] },
    FrameworkRule { name: "BeautifulSoup", markers: &["from bs4", "BeautifulSoup("] },
    FrameworkRule { name: "Requests (HTTP)", markers: &["import requests", "from requests"] },
    FrameworkRule { name: "HTTPX (Async HTTP)", markers: &["import httpx", "from httpx"] },
    FrameworkRule { name: "Click (CLI)", markers: &["import click", "@click.command"] },
    FrameworkRule { name: "Typer (CLI)", markers: &["import typer", "typer.Typer("] },
    FrameworkRule { name: "argparse", markers: &["import argparse", "ArgumentParser"] },
    FrameworkRule {
        name: "pytest",
        markers: &["import pytest", "@pytest.mark", "@pytest.fixture", "pytest"],
    },
    FrameworkRule { name: "unittest", markers: &["import unittest", "from unittest", "TestCase"] },
    FrameworkRule { name: "Hypothesis (Property Testing)", markers: &["from hypothesis", "@given("] },
    FrameworkRule { name: "logging (stdlib)", markers: &["import logging", "logging.getLogger"] },
    FrameworkRule { name: "structlog", markers: &["structlog"] },
    FrameworkRule { name: "Loguru", markers: &["loguru"] },
    FrameworkRule { name: "python-dotenv", markers: &["load_dotenv", "python-dotenv"] },
    FrameworkRule { name: "dataclasses (stdlib)", markers: &["from dataclasses", "@dataclass"] },
];

const PATTERNS: &[PatternRule] = &[
    PatternRule {
        name: "Singleton",
        name_hints: &["singleton"],
        content_markers: &["_instance = None", "cls._instance"],
    },
    PatternRule {
        name: "Factory",
        name_hints: &["factory"],
        content_markers: &["def create(", "def make("],
    },
    PatternRule {
        name: "Abstract Factory",
        name_hints: &["abstract_factory", "abstractfactory"],
        content_markers: &[],
    },
    PatternRule {
        name: "Builder",
        name_hints: &["builder"],
        content_markers: &["def build(", "def with_"],
    },
    PatternRule { name: "Strategy", name_hints: &["strategy", "policy"], content_markers: &[] },
    PatternRule {
        name: "Observer / Event",
        name_hints: &["observer", "listener", "event"],
        content_markers: &["def notify(", "def subscribe(", "def publish("],
    },
    PatternRule {
        name: "Command",
        name_hints: &["command", "cmd"],
        content_markers: &["def execute("],
    },
    PatternRule { name: "Repository", name_hints: &["repository", "repo"], content_markers: &[] },
    PatternRule { name: "Service Layer", name_hints: &["service"], content_markers: &[] },
    PatternRule {
        name: "MVC Controller / View",
        name_hints: &["controller", "view"],
        content_markers: &["@app.route", "APIView"],
    },
    PatternRule { name: "Adapter", name_hints: &["adapter"], content_markers: &[] },
    PatternRule { name: "Facade", name_hints: &["facade"], content_markers: &[] },
    PatternRule { name: "Proxy", name_hints: &["proxy"], content_markers: &[] },
    PatternRule {
        name: "Iterator",
        name_hints: &[],
        content_markers: &["def __iter__(", "def __next__("],
    },
    PatternRule {
        name: "Context Manager",
        name_hints: &[],
        content_markers: &["def __enter__(", "def __exit__("],
    },
    PatternRule { name: "Mixin", name_hints: &["mixin"], content_markers: &[] },
    PatternRule { name: "Use Case", name_hints: &["usecase", "use_case"], content_markers: &[] },
    PatternRule {
        name: "DTO / Schema",
        name_hints: &["dto", "schema"],
        content_markers: &["@dataclass"],
    },
    PatternRule { name: "Mapper", name_hints: &["mapper"], content_markers: &[] },
];

/// Keywords the raw-SQL scan picks up after `FROM`/`INTO`/`UPDATE`.
const SQL_KEYWORDS: &[&str] = &["select", "where", "join", "set", "values", "table"];

pub struct PythonAnalyzer;

impl PythonAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Manifest mode. Returns false when `file_name` is ordinary source.
    fn analyze_manifest(&self, file_name: &str, content: &str, model: &mut AnalysisModel) -> bool {
        let names = match file_name.to_ascii_lowercase().as_str() {
            "requirements.txt" => requirement_lines(content),
            "pipfile" => pipfile_packages(content),
            "pyproject.toml" => pyproject_dependencies(content),
            "setup.py" => setup_py_requires(content),
            "setup.cfg" => setup_cfg_requires(content),
            _ => return false,
        };
        for name in names {
            model.add_dependency(file_name, name, "dependency");
        }
        detect_frameworks(content, FRAMEWORKS, model);
        true
    }

    fn detect_special_patterns(&self, unit: &SourceUnit, model: &mut AnalysisModel) {
        let content = unit.content.as_str();
        let lower = unit.file_name().to_ascii_lowercase();
        if content.contains('@')
            && (content.contains("functools.wraps")
                || lower.contains("decorator")
                || lower.contains("middleware"))
        {
            model.add_pattern("Decorator", unit.unit_name());
        }
        if lower.contains("template") && content.contains("def ") {
            model.add_pattern("Template Method", unit.unit_name());
        }
    }

    fn analyze_endpoints(&self, content: &str, model: &mut AnalysisModel) {
        for caps in FLASK_ROUTE.captures_iter(content) {
            model.add_endpoint(format!("ROUTE {} (Flask)", &caps[1]));
        }
        for caps in VERB_DECORATOR.captures_iter(content) {
            model.add_endpoint(format!("{} {} (FastAPI)", caps[1].to_ascii_uppercase(), &caps[2]));
        }
        if content.contains("urlpatterns") {
            for caps in DJANGO_URL.captures_iter(content) {
                model.add_endpoint(format!("URL /{} (Django)", &caps[1]));
            }
        }
        for caps in AIOHTTP_ROUTE.captures_iter(content) {
            model.add_endpoint(format!("ROUTE {} (aiohttp)", &caps[1]));
        }
    }

    fn analyze_schemas(&self, content: &str, model: &mut AnalysisModel) {
        add_tables(&DJANGO_MODEL, content, "Django Model", model);
        add_tables(&SQLALCHEMY_TABLE, content, "SQLAlchemy", model);
        add_tables(&ALEMBIC_TABLE, content, "Alembic Migration", model);
        for caps in RAW_SQL_TABLE.captures_iter(content) {
            let table = &caps[1];
            if !SQL_KEYWORDS.contains(&table.to_ascii_lowercase().as_str()) {
                model.add_schema(format!("Table: {} (Raw SQL)", table));
            }
        }
    }
}

impl Default for PythonAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageAnalyzer for PythonAnalyzer {
    fn language(&self) -> Language {
        Language::Python
    }

    fn supports_structured_parsing(&self) -> bool {
        cfg!(feature = "tree-sitter")
    }

    fn analyze(&self, unit: &SourceUnit, model: &mut AnalysisModel) -> Fidelity {
        let content = unit.content.as_str();
        if self.analyze_manifest(unit.file_name(), content, model) {
            return Fidelity::Manifest;
        }

        let module = if unit.file_name() == "__init__.py" {
            parent_module(unit.directory())
        } else {
            unit.unit_name()
        };
        model.add_package(module);

        let fidelity = match SourceView::of(Grammar::Python, content, &STRUCTURE, &unit.relative_path)
        {
            SourceView::Parsed(facts) => {
                model.add_classes(facts.type_count);
                Fidelity::Structured
            }
            SourceView::Heuristic => {
                model.add_classes(count_matches(&CLASS, content));
                Fidelity::Heuristic
            }
        };

        for (re, kind) in [(&*IMPORT, "import"), (&*FROM_IMPORT, "from-import")] {
            for caps in re.captures_iter(content) {
                let root = caps[1].split('.').next().unwrap_or_default();
                // Relative imports (`from . import x`) have an empty root.
                if !root.is_empty() && !STDLIB.contains(root) {
                    model.add_dependency(module, root, kind);
                }
            }
        }

        detect_frameworks(content, FRAMEWORKS, model);
        detect_patterns(unit.file_name(), unit.unit_name(), content, PATTERNS, model);
        self.detect_special_patterns(unit, model);
        self.analyze_endpoints(content, model);
        self.analyze_schemas(content, model);

        fidelity
    }
}

/// Distribution name at the start of a requirement specifier.
fn requirement_name(spec: &str) -> Option<&str> {
    REQUIREMENT_NAME
        .captures(spec.trim())
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

fn requirement_lines(content: &str) -> Vec<&str> {
    content
        .lines()
        .map(str::trim)
        .filter(|l| !l.starts_with('#') && !l.starts_with('-'))
        .filter_map(requirement_name)
        .collect()
}

fn pipfile_packages(content: &str) -> Vec<&str> {
    let mut names = Vec::new();
    let mut in_packages = false;
    for line in content.lines().map(str::trim) {
        if let Some(caps) = TOML_SECTION.captures(line) {
            in_packages = matches!(&caps[1], "packages" | "dev-packages");
            continue;
        }
        if in_packages {
            if let Some(m) = TOML_KEY.captures(line).and_then(|c| c.get(1)) {
                names.push(m.as_str());
            }
        }
    }
    names
}

/// PEP 621 `dependencies = [...]` arrays and Poetry dependency tables.
fn pyproject_dependencies(content: &str) -> Vec<&str> {
    let mut names = Vec::new();
    for block in PEP621_DEPENDENCIES.captures_iter(content) {
        if let Some(list) = block.get(1) {
            names.extend(
                QUOTED_REQUIREMENT
                    .captures_iter(list.as_str())
                    .filter_map(|c| c.get(1).map(|m| m.as_str())),
            );
        }
    }

    let mut in_poetry = false;
    for line in content.lines().map(str::trim) {
        if let Some(caps) = TOML_SECTION.captures(line) {
            let section = &caps[1];
            in_poetry = section.starts_with("tool.poetry") && section.ends_with("dependencies");
            continue;
        }
        if in_poetry {
            if let Some(m) = TOML_KEY.captures(line).and_then(|c| c.get(1)) {
                if m.as_str() != "python" {
                    names.push(m.as_str());
                }
            }
        }
    }
    names
}

fn setup_py_requires(content: &str) -> Vec<&str> {
    INSTALL_REQUIRES_LIST
        .captures(content)
        .and_then(|c| c.get(1))
        .map(|list| {
            QUOTED_REQUIREMENT
                .captures_iter(list.as_str())
                .filter_map(|c| c.get(1).map(|m| m.as_str()))
                .collect()
        })
        .unwrap_or_default()
}

/// `install_requires =` followed by indented continuation lines.
fn setup_cfg_requires(content: &str) -> Vec<&str> {
    let mut names = Vec::new();
    let mut in_block = false;
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("install_requires") && trimmed.contains('=') {
            in_block = true;
            let inline = trimmed.split_once('=').map(|(_, v)| v).unwrap_or("");
            names.extend(requirement_name(inline));
            continue;
        }
        if in_block {
            let continued = line.starts_with(' ') || line.starts_with('\t');
            if trimmed.is_empty() || !continued {
                in_block = false;
                continue;
            }
            names.extend(requirement_name(trimmed));
        }
    }
    names
}
