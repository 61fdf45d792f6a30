//! Language-specific analyzer implementations and the registry keyed by
//! [`Language`].

mod c;
mod cpp;
mod csharp;
mod java;
mod javascript;
mod jsp;
mod kotlin;
mod php;
mod python;
mod ruby;
mod rust_lang;

pub use c::CAnalyzer;
pub use cpp::CppAnalyzer;
pub use csharp::CSharpAnalyzer;
pub use java::JavaAnalyzer;
pub use javascript::JavaScriptAnalyzer;
pub use jsp::JspAnalyzer;
pub use kotlin::KotlinAnalyzer;
pub use php::PhpAnalyzer;
pub use python::PythonAnalyzer;
pub use ruby::RubyAnalyzer;
pub use rust_lang::RustAnalyzer;

use once_cell::sync::OnceCell;

use super::language::Language;
use super::traits::LanguageAnalyzer;

static C_ANALYZER: OnceCell<CAnalyzer> = OnceCell::new();
static CPP_ANALYZER: OnceCell<CppAnalyzer> = OnceCell::new();
static CSHARP_ANALYZER: OnceCell<CSharpAnalyzer> = OnceCell::new();
static JAVA_ANALYZER: OnceCell<JavaAnalyzer> = OnceCell::new();
static JAVASCRIPT_ANALYZER: OnceCell<JavaScriptAnalyzer> = OnceCell::new();
static TYPESCRIPT_ANALYZER: OnceCell<JavaScriptAnalyzer> = OnceCell::new();
static JSP_ANALYZER: OnceCell<JspAnalyzer> = OnceCell::new();
static KOTLIN_ANALYZER: OnceCell<KotlinAnalyzer> = OnceCell::new();
static PHP_ANALYZER: OnceCell<PhpAnalyzer> = OnceCell::new();
static PYTHON_ANALYZER: OnceCell<PythonAnalyzer> = OnceCell::new();
static RUBY_ANALYZER: OnceCell<RubyAnalyzer> = OnceCell::new();
static RUST_ANALYZER: OnceCell<RustAnalyzer> = OnceCell::new();

fn cached<A: LanguageAnalyzer + 'static>(
    cell: &'static OnceCell<A>,
    init: fn() -> A,
) -> &'static dyn LanguageAnalyzer {
    cell.get_or_init(init)
}

/// The analyzer for `language`, built on first use and shared afterwards.
///
/// Returns `None` only for [`Language::Unknown`]; every known language has
/// exactly one analyzer.
pub fn get_analyzer(language: Language) -> Option<&'static dyn LanguageAnalyzer> {
    let analyzer = match language {
        Language::Java => cached(&JAVA_ANALYZER, JavaAnalyzer::new),
        Language::CSharp => cached(&CSHARP_ANALYZER, CSharpAnalyzer::new),
        Language::JavaScript => cached(&JAVASCRIPT_ANALYZER, JavaScriptAnalyzer::javascript),
        Language::TypeScript => cached(&TYPESCRIPT_ANALYZER, JavaScriptAnalyzer::typescript),
        Language::C => cached(&C_ANALYZER, CAnalyzer::new),
        Language::Cpp => cached(&CPP_ANALYZER, CppAnalyzer::new),
        Language::Ruby => cached(&RUBY_ANALYZER, RubyAnalyzer::new),
        Language::Rust => cached(&RUST_ANALYZER, RustAnalyzer::new),
        Language::Kotlin => cached(&KOTLIN_ANALYZER, KotlinAnalyzer::new),
        Language::Python => cached(&PYTHON_ANALYZER, PythonAnalyzer::new),
        Language::Php => cached(&PHP_ANALYZER, PhpAnalyzer::new),
        Language::Jsp => cached(&JSP_ANALYZER, JspAnalyzer::new),
        Language::Unknown => return None,
    };
    Some(analyzer)
}
