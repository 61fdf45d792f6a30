//! PHP analyzer, including Composer manifests. Always heuristic.

use std::collections::BTreeMap;

use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use crate::analysis::language::Language;
use crate::analysis::model::AnalysisModel;
use crate::analysis::rules::{
    add_tables, count_matches, detect_frameworks, to_snake_case, FrameworkRule,
};
use crate::analysis::traits::{Fidelity, LanguageAnalyzer, SourceUnit};

/// Root namespaces of classes shipped with PHP itself.
static BUILTIN_NAMESPACES: phf::Set<&'static str> = phf::phf_set! {
    "Exception", "RuntimeException", "InvalidArgumentException", "LogicException",
    "BadMethodCallException", "OutOfRangeException", "OverflowException",
    "UnexpectedValueException", "DomainException", "LengthException",
    "ArrayAccess", "Countable", "Iterator", "IteratorAggregate", "Serializable",
    "Stringable", "Throwable", "Traversable",
    "DateTime", "DateTimeImmutable", "DateTimeInterface", "DateInterval", "DateTimeZone",
    "SplStack", "SplQueue", "SplHeap", "SplObjectStorage", "SplFixedArray",
    "stdClass", "Closure", "Generator", "Fiber",
    "ReflectionClass", "ReflectionMethod", "ReflectionProperty",
    "PDO", "PDOStatement", "PDOException",
};

lazy_static! {
    static ref NAMESPACE: Regex = Regex::new(r"(?m)^\s*namespace\s+([\w\\]+)\s*;").unwrap();
    static ref USE: Regex = Regex::new(r"(?m)^\s*use\s+\\?([\w\\]+)(?:\s+as\s+\w+)?\s*;").unwrap();
    static ref TYPE_DECL: Regex = Regex::new(
        r"(?mi)^\s*(?:abstract\s+|final\s+|readonly\s+)*(?:class|interface|trait|enum)\s+\w+"
    )
    .unwrap();
    static ref COMPOSER_LINE: Regex =
        Regex::new(r#""([a-zA-Z0-9_.-]+/[a-zA-Z0-9_.-]+)"\s*:\s*"[^"]*""#).unwrap();
    static ref LARAVEL_ROUTE: Regex = Regex::new(
        r#"(?i)Route\s*::\s*(?:get|post|put|patch|delete|any|match|resource|apiResource)\s*\(\s*['"]([^'"]+)['"]"#
    )
    .unwrap();
    static ref SYMFONY_ROUTE: Regex =
        Regex::new(r#"(?:#\[Route|@Route)\(\s*(?:path:\s*)?['"]([^'"]+)['"]"#).unwrap();
    static ref SLIM_ROUTE: Regex = Regex::new(
        r#"(?i)\$app\s*->\s*(?:get|post|put|patch|delete|any)\s*\(\s*['"]([^'"]+)['"]"#
    )
    .unwrap();
    static ref LARAVEL_SCHEMA: Regex =
        Regex::new(r#"Schema\s*::\s*create\s*\(\s*['"](\w+)['"]"#).unwrap();
    static ref DOCTRINE_TABLE: Regex =
        Regex::new(r#"(?:@(?:ORM\\)?Table|#\[ORM\\Table)\s*\(\s*name\s*[:=]\s*['"](\w+)['"]"#)
            .unwrap();
    static ref ELOQUENT_MODEL: Regex =
        Regex::new(r"(?m)^\s*class\s+(\w+)\s+extends\s+(?:Model|Eloquent|Authenticatable)\b")
            .unwrap();
    static ref CREATE_TABLE: Regex =
        Regex::new(r#"(?i)CREATE\s+TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?[`'"]?(\w+)"#).unwrap();
}

const FRAMEWORKS: &[FrameworkRule] = &[
    FrameworkRule {
        name: "Laravel",
        markers: &["laravel/framework", "Illuminate\\", "Route::", "artisan"],
    },
    FrameworkRule { name: "Symfony", markers: &["symfony/", "Symfony\\", "FrameworkBundle"] },
    FrameworkRule {
        name: "WordPress",
        markers: &["wp_enqueue", "add_action(", "add_filter(", "WP_Query", "wp-content"],
    },
    FrameworkRule {
        name: "CodeIgniter",
        markers: &["CodeIgniter\\", "CI_Controller", "CI_Model", "$this->load->"],
    },
    FrameworkRule { name: "Yii2", markers: &["yii\\", "Yii::$app", "yiisoft/yii2"] },
    FrameworkRule { name: "CakePHP", markers: &["cakephp", "Cake\\"] },
    FrameworkRule { name: "Slim Framework", markers: &["slim/slim", "Slim\\", "$app->get(", "$app->post("] },
    FrameworkRule { name: "Lumen", markers: &["laravel/lumen", "Laravel\\Lumen"] },
    FrameworkRule { name: "Phalcon", markers: &["Phalcon\\"] },
    FrameworkRule { name: "Laminas (Zend)", markers: &["laminas", "Laminas\\", "Zend\\"] },
    FrameworkRule {
        name: "Eloquent ORM",
        markers: &["Illuminate\\Database", "extends Model", "HasMany", "BelongsTo"],
    },
    FrameworkRule {
        name: "Doctrine ORM",
        markers: &["doctrine/orm", "Doctrine\\ORM", "#[ORM\\Entity", "@ORM\\Entity", "EntityManager"],
    },
    FrameworkRule { name: "PDO", markers: &["new PDO(", "PDO::FETCH", "PDO::ATTR"] },
    FrameworkRule { name: "MySQLi", markers: &["mysqli_connect", "new mysqli("] },
    FrameworkRule { name: "Redis (PHP)", markers: &["predis/predis", "Predis\\", "new Redis()"] },
    FrameworkRule { name: "MongoDB (PHP)", markers: &["mongodb/mongodb", "MongoDB\\"] },
    FrameworkRule { name: "Twig", markers: &["twig/twig", "Twig\\"] },
    FrameworkRule { name: "Smarty", markers: &["new Smarty", "$smarty->"] },
    FrameworkRule { name: "JWT Auth (PHP)", markers: &["tymon/jwt-auth", "firebase/php-jwt", "Firebase\\JWT"] },
    FrameworkRule { name: "Laravel Sanctum", markers: &["laravel/sanctum", "HasApiTokens"] },
    FrameworkRule { name: "Swoole", markers: &["Swoole\\"] },
    FrameworkRule { name: "ReactPHP", markers: &["react/event-loop", "React\\EventLoop"] },
    FrameworkRule { name: "Guzzle HTTP", markers: &["guzzlehttp/guzzle", "GuzzleHttp\\"] },
    FrameworkRule { name: "API Platform", markers: &["api-platform/core", "ApiPlatform\\", "#[ApiResource"] },
    FrameworkRule { name: "PHPUnit", markers: &["phpunit/phpunit", "PHPUnit\\", "extends TestCase"] },
    FrameworkRule { name: "Pest (PHP)", markers: &["pestphp/pest"] },
    FrameworkRule { name: "Mockery", markers: &["mockery/mockery", "Mockery::"] },
    FrameworkRule { name: "PHP Dotenv", markers: &["vlucas/phpdotenv", "Dotenv\\"] },
    FrameworkRule { name: "Monolog (Logging)", markers: &["monolog/monolog", "Monolog\\"] },
    FrameworkRule { name: "PHPMailer", markers: &["phpmailer/phpmailer", "PHPMailer\\"] },
    FrameworkRule { name: "Carbon (Date)", markers: &["nesbot/carbon", "Carbon\\", "Carbon::"] },
];

/// The parts of `composer.json` that list dependencies.
#[derive(Debug, Default, Deserialize)]
struct ComposerManifest {
    #[serde(default)]
    require: BTreeMap<String, serde_json::Value>,
    #[serde(default, rename = "require-dev")]
    require_dev: BTreeMap<String, serde_json::Value>,
}

/// The parts of `composer.lock` that list resolved packages.
#[derive(Debug, Default, Deserialize)]
struct ComposerLock {
    #[serde(default)]
    packages: Vec<LockedPackage>,
    #[serde(default, rename = "packages-dev")]
    packages_dev: Vec<LockedPackage>,
}

#[derive(Debug, Deserialize)]
struct LockedPackage {
    name: String,
}

/// `php` and `ext-*` constrain the platform, not the project.
fn is_platform_requirement(name: &str) -> bool {
    name == "php" || name.starts_with("ext-") || name.starts_with("lib-")
}

pub struct PhpAnalyzer;

impl PhpAnalyzer {
    pub fn new() -> Self {
        Self
    }

    fn analyze_composer(&self, unit: &SourceUnit, model: &mut AnalysisModel) {
        let file_name = unit.file_name();
        let content = unit.content.as_str();
        let parsed: Result<Vec<String>, serde_json::Error> =
            if file_name.eq_ignore_ascii_case("composer.lock") {
                serde_json::from_str::<ComposerLock>(content).map(|lock| {
                    lock.packages
                        .into_iter()
                        .chain(lock.packages_dev)
                        .map(|p| p.name)
                        .collect()
                })
            } else {
                serde_json::from_str::<ComposerManifest>(content)
                    .map(|m| m.require.into_keys().chain(m.require_dev.into_keys()).collect())
            };

        let names = match parsed {
            Ok(names) => names,
            Err(e) => {
                debug!(unit = %unit.relative_path, error = %e, "malformed composer file, scanning lines");
                COMPOSER_LINE
                    .captures_iter(content)
                    .map(|c| c[1].to_string())
                    .collect()
            }
        };

        for name in names.iter().filter(|n| !is_platform_requirement(n)) {
            model.add_dependency(file_name, name.as_str(), "dependency");
        }
        detect_frameworks(content, FRAMEWORKS, model);
    }

    fn detect_patterns(&self, unit: &SourceUnit, model: &mut AnalysisModel) {
        let content = unit.content.as_str();
        let lower = content.to_ascii_lowercase();
        let name = unit.unit_name();
        let declares_interface = content.contains("interface ");

        let hits = [
            (
                "Singleton",
                content.contains("private static $instance")
                    || content.contains("private static $_instance")
                    || content.contains("getInstance()"),
            ),
            (
                "Factory",
                content.contains("interface Factory")
                    || (lower.contains("factory") && content.contains("create(")),
            ),
            (
                "Repository",
                content.contains("interface Repository") || lower.contains("repository"),
            ),
            (
                "Service Layer",
                content.contains("interface ServiceInterface")
                    || (lower.contains("service") && declares_interface),
            ),
            (
                "Observer",
                (content.contains("attach(") && content.contains("notify("))
                    || content.contains("ShouldBroadcast"),
            ),
            (
                "Decorator",
                content.contains("extends Decorator")
                    || (lower.contains("decorator") && declares_interface),
            ),
            (
                "Strategy",
                content.contains("interface Strategy")
                    || (lower.contains("strategy") && declares_interface),
            ),
            (
                "Command",
                (content.contains("interface Command") || lower.contains("command"))
                    && content.contains("execute("),
            ),
            (
                "Builder",
                content.contains("interface Builder")
                    || (lower.contains("builder") && content.contains("build(")),
            ),
            ("Middleware", lower.contains("middleware") && content.contains("handle(")),
            (
                "MVC Controller",
                content.contains("abstract class Controller") || content.contains("extends Controller"),
            ),
            (
                "DTO/Request",
                content.contains("Request $request") || content.contains("FormRequest"),
            ),
            (
                "Resource/Transformer",
                content.contains("#[ApiResource")
                    || (lower.contains("resource") && content.contains("toArray(")),
            ),
            ("Trait/Mixin", content.contains("trait ")),
            (
                "Event/Listener",
                content.contains("extends Event") || content.contains("ShouldQueue"),
            ),
            ("Migration", content.contains("extends Migration")),
        ];
        for (pattern, hit) in hits {
            if hit {
                model.add_pattern(pattern, name);
            }
        }
    }

    fn analyze_endpoints(&self, content: &str, model: &mut AnalysisModel) {
        for re in [&*LARAVEL_ROUTE, &*SYMFONY_ROUTE, &*SLIM_ROUTE] {
            for caps in re.captures_iter(content) {
                model.add_endpoint(format!("PHP:{}", &caps[1]));
            }
        }
    }

    fn analyze_schemas(&self, content: &str, model: &mut AnalysisModel) {
        add_tables(&LARAVEL_SCHEMA, content, "Eloquent Migration", model);
        add_tables(&DOCTRINE_TABLE, content, "Doctrine Entity", model);
        for caps in ELOQUENT_MODEL.captures_iter(content) {
            model.add_schema(format!("Table: {} (Eloquent Model)", to_snake_case(&caps[1])));
        }
        add_tables(&CREATE_TABLE, content, "Raw SQL", model);
    }
}

impl Default for PhpAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageAnalyzer for PhpAnalyzer {
    fn language(&self) -> Language {
        Language::Php
    }

    fn analyze(&self, unit: &SourceUnit, model: &mut AnalysisModel) -> Fidelity {
        if unit.is_manifest() {
            self.analyze_composer(unit, model);
            return Fidelity::Manifest;
        }

        let content = unit.content.as_str();
        let namespace = NAMESPACE
            .captures(content)
            .map(|c| c[1].replace('\\', "."));
        if let Some(ns) = &namespace {
            model.add_package(ns.as_str());
        }
        model.add_classes(count_matches(&TYPE_DECL, content));

        let from = namespace.as_deref().unwrap_or_else(|| unit.unit_name());
        for caps in USE.captures_iter(content) {
            let fqn = &caps[1];
            let vendor = fqn.split('\\').next().unwrap_or(fqn);
            if !BUILTIN_NAMESPACES.contains(vendor) {
                model.add_dependency(from, fqn.replace('\\', "."), "use");
            }
        }

        detect_frameworks(content, FRAMEWORKS, model);
        self.detect_patterns(unit, model);
        self.analyze_endpoints(content, model);
        self.analyze_schemas(content, model);

        Fidelity::Heuristic
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyze(path: &str, source: &str) -> (AnalysisModel, Fidelity) {
        let unit = SourceUnit::new(path, Language::Php, source);
        let mut model = AnalysisModel::new();
        let fidelity = PhpAnalyzer::new().analyze(&unit, &mut model);
        (model, fidelity)
    }

    fn targets(model: &AnalysisModel) -> Vec<&str> {
        model.dependencies.iter().map(|d| d.to.as_str()).collect()
    }

    #[test]
    fn test_composer_json() {
        let source = r#"{
    "name": "acme/shop",
    "require": {
        "php": "^8.2",
        "ext-json": "*",
        "laravel/framework": "^11.0",
        "guzzlehttp/guzzle": "^7.8"
    },
    "require-dev": {
        "phpunit/phpunit": "^11.0"
    }
}"#;
        let (model, fidelity) = analyze("composer.json", source);
        assert_eq!(fidelity, Fidelity::Manifest);
        assert_eq!(
            targets(&model),
            vec!["guzzlehttp/guzzle", "laravel/framework", "phpunit/phpunit"]
        );
        assert!(model.dependencies.iter().all(|d| d.from == "composer.json"));
        assert_eq!(model.framework_count("Laravel"), 1);
    }

    #[test]
    fn test_malformed_composer_falls_back_to_lines() {
        let source = "{\n  \"require\": {\n    \"monolog/monolog\": \"^3.0\",\n    \"php\": \">=8.1\"\n";
        let (model, _) = analyze("composer.json", source);
        assert_eq!(targets(&model), vec!["monolog/monolog"]);
    }

    #[test]
    fn test_composer_lock() {
        let source = r#"{"packages": [{"name": "symfony/console"}], "packages-dev": [{"name": "mockery/mockery"}]}"#;
        let (model, _) = analyze("composer.lock", source);
        assert_eq!(targets(&model), vec!["symfony/console", "mockery/mockery"]);
        assert!(model.dependencies.iter().all(|d| d.from == "composer.lock"));
    }

    #[test]
    fn test_laravel_controller() {
        let source = r#"<?php

namespace App\Http\Controllers;

use Illuminate\Http\Request;
use App\Models\Invoice;
use Exception;

class InvoiceController extends Controller
{
    public function store(Request $request) {}
}
"#;
        let (model, fidelity) = analyze("app/Http/Controllers/InvoiceController.php", source);
        assert_eq!(fidelity, Fidelity::Heuristic);
        assert!(model.packages.contains("App.Http.Controllers"));
        assert_eq!(model.class_count, 1);
        assert_eq!(targets(&model), vec!["Illuminate.Http.Request", "App.Models.Invoice"]);
        assert_eq!(model.patterns["MVC Controller"], vec!["InvoiceController".to_string()]);
        assert_eq!(model.patterns["DTO/Request"], vec!["InvoiceController".to_string()]);
    }

    #[test]
    fn test_routes_and_tables() {
        let source = r#"<?php
Route::get('/invoices', [InvoiceController::class, 'index']);
Schema::create('invoices', function (Blueprint $table) {});

class LineItem extends Model {}
"#;
        let (model, _) = analyze("routes/web.php", source);
        assert_eq!(model.endpoints, vec!["PHP:/invoices".to_string()]);
        assert_eq!(
            model.schemas,
            vec![
                "Table: invoices (Eloquent Migration)".to_string(),
                "Table: line_item (Eloquent Model)".to_string(),
            ]
        );
    }
}
