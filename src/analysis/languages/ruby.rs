//! Ruby analyzer, including `Gemfile` manifests. Always heuristic.

use lazy_static::lazy_static;
use regex::Regex;

use crate::analysis::language::Language;
use crate::analysis::model::AnalysisModel;
use crate::analysis::rules::{
    add_tables, count_matches, detect_frameworks, detect_patterns, parent_module, FrameworkRule,
    PatternRule,
};
use crate::analysis::traits::{Fidelity, LanguageAnalyzer, SourceUnit};

lazy_static! {
    static ref REQUIRE: Regex = Regex::new(r#"(?m)^\s*require\s+['"]([^'"]+)['"]"#).unwrap();
    static ref REQUIRE_RELATIVE: Regex =
        Regex::new(r#"(?m)^\s*require_relative\s+['"]([^'"]+)['"]"#).unwrap();
    static ref DEFINITION: Regex =
        Regex::new(r"(?m)^\s*(class|module)\s+([A-Z][\w:]*)").unwrap();
    static ref GEM: Regex = Regex::new(r#"(?m)^\s*gem\s+['"]([^'"]+)['"]"#).unwrap();
    static ref SELF_CREATE: Regex = Regex::new(r"def\s+self\.create").unwrap();
    static ref BUILD_METHOD: Regex = Regex::new(r"def\s+build\b").unwrap();
    static ref CREATE_TABLE: Regex = Regex::new(r#"(?m)^\s*create_table\s+[:"'](\w+)"#).unwrap();
    static ref SEQUEL_TABLE: Regex = Regex::new(r#"DB\.create_table\s+[:"'](\w+)"#).unwrap();
    static ref MONGOID_CLASS: Regex =
        Regex::new(r"(?s)class\s+(\w+).*?include Mongoid::Document").unwrap();
    static ref VERB_ROUTE: Regex =
        Regex::new(r#"(?m)^\s*(get|post|put|patch|delete)\s+['"]([^'"]+)['"]"#).unwrap();
    static ref GRAPE_ROUTE: Regex =
        Regex::new(r#"(?m)^\s*(get|post|put|patch|delete)\s+['":]?([\w/:]+)['"]?\s+do"#).unwrap();
    static ref RESOURCES: Regex = Regex::new(r#"\bresources?\s+[:"'](\w+)"#).unwrap();
}

const FRAMEWORKS: &[FrameworkRule] = &[
    FrameworkRule {
        name: "Ruby on Rails",
        markers: &["Rails", "ActionController", "ActiveRecord", "ApplicationController"],
    },
    FrameworkRule { name: "ActiveRecord (ORM)", markers: &["ActiveRecord::Base", "ApplicationRecord"] },
    FrameworkRule { name: "ActionMailer", markers: &["ActionMailer", "ApplicationMailer"] },
    FrameworkRule { name: "ActionCable (WebSocket)", markers: &["ActionCable"] },
    FrameworkRule { name: "ActiveJob (Background Jobs)", markers: &["ActiveJob", "ApplicationJob"] },
    FrameworkRule {
        name: "Sinatra",
        markers: &["require 'sinatra'", "require \"sinatra\"", "Sinatra::Base", "Sinatra::Application"],
    },
    FrameworkRule { name: "Hanami", markers: &["Hanami::", "require 'hanami'"] },
    FrameworkRule { name: "Grape (API)", markers: &["Grape::API", "require 'grape'"] },
    FrameworkRule { name: "Rack", markers: &["Rack::", "require 'rack'"] },
    FrameworkRule { name: "Sequel (ORM)", markers: &["require 'sequel'", "Sequel::"] },
    FrameworkRule { name: "Mongoid (MongoDB)", markers: &["require 'mongoid'", "Mongoid::"] },
    FrameworkRule { name: "Redis", markers: &["require 'redis'", "Redis.new"] },
    FrameworkRule { name: "PostgreSQL (pg gem)", markers: &["require 'pg'", "PG.connect"] },
    FrameworkRule { name: "MySQL (mysql2 gem)", markers: &["require 'mysql2'"] },
    FrameworkRule { name: "SQLite3", markers: &["require 'sqlite3'"] },
    FrameworkRule { name: "RSpec", markers: &["require 'rspec'", "RSpec.describe"] },
    FrameworkRule {
        name: "Minitest",
        markers: &["require 'minitest'", "Minitest::Test", "def test_"],
    },
    FrameworkRule { name: "Test::Unit", markers: &["require 'test/unit'", "Test::Unit"] },
    FrameworkRule { name: "Capybara (Integration Testing)", markers: &["Capybara"] },
    FrameworkRule { name: "FactoryBot", markers: &["FactoryBot"] },
    FrameworkRule { name: "Faraday (HTTP Client)", markers: &["require 'faraday'", "Faraday.new"] },
    FrameworkRule { name: "HTTParty", markers: &["HTTParty", "require 'httparty'"] },
    FrameworkRule { name: "Devise (Authentication)", markers: &["Devise", "require 'devise'"] },
    FrameworkRule { name: "JWT", markers: &["JWT", "require 'jwt'"] },
    FrameworkRule { name: "OmniAuth", markers: &["OmniAuth", "require 'omniauth'"] },
    FrameworkRule { name: "Sidekiq (Background Jobs)", markers: &["Sidekiq"] },
    FrameworkRule { name: "Resque", markers: &["Resque"] },
    FrameworkRule {
        name: "ActiveModel Serializers",
        markers: &["ActiveModelSerializers", "ActiveModel::Serializer"],
    },
    FrameworkRule { name: "JSON (stdlib)", markers: &["require 'json'", "JSON.parse"] },
    FrameworkRule { name: "Ruby Logger", markers: &["require 'logger'", "Logger.new"] },
    FrameworkRule { name: "GraphQL Ruby", markers: &["GraphQL::Schema", "require 'graphql'"] },
    FrameworkRule { name: "Elasticsearch", markers: &["Elasticsearch::", "require 'elasticsearch'"] },
];

const PATTERNS: &[PatternRule] = &[
    PatternRule {
        name: "Singleton",
        name_hints: &[],
        content_markers: &["include Singleton", "require 'singleton'"],
    },
    PatternRule {
        name: "Observer",
        name_hints: &[],
        content_markers: &["include Observable", "require 'observer'"],
    },
    PatternRule {
        name: "Decorator",
        name_hints: &["decorator"],
        content_markers: &["SimpleDelegator", "Forwardable"],
    },
    PatternRule { name: "Strategy", name_hints: &["strategy", "policy"], content_markers: &[] },
    PatternRule { name: "Repository", name_hints: &["repository", "repo"], content_markers: &[] },
    PatternRule {
        name: "Presenter / View Model",
        name_hints: &["presenter", "view_model"],
        content_markers: &[],
    },
    PatternRule {
        name: "Concern (Mixin)",
        name_hints: &["concern"],
        content_markers: &["extend ActiveSupport::Concern"],
    },
    PatternRule {
        name: "MVC Controller",
        name_hints: &["controller"],
        content_markers: &["ApplicationController", "< ActionController"],
    },
    PatternRule {
        name: "ActiveRecord Model",
        name_hints: &[],
        content_markers: &["< ApplicationRecord", "< ActiveRecord::Base"],
    },
    PatternRule {
        name: "Interactor / Use Case",
        name_hints: &["interactor", "use_case"],
        content_markers: &[],
    },
    PatternRule { name: "Serializer", name_hints: &["serializer"], content_markers: &[] },
    PatternRule { name: "Background Worker", name_hints: &["worker", "job"], content_markers: &[] },
];

pub struct RubyAnalyzer;

impl RubyAnalyzer {
    pub fn new() -> Self {
        Self
    }

    fn analyze_gemfile(&self, content: &str, model: &mut AnalysisModel) {
        for caps in GEM.captures_iter(content) {
            model.add_dependency("Gemfile", &caps[1], "gem");
        }
        model.add_framework("Bundler (Dependency Management)");
    }

    fn detect_special_patterns(&self, unit: &SourceUnit, model: &mut AnalysisModel) {
        let content = unit.content.as_str();
        let name = unit.unit_name();
        let lower = unit.file_name().to_ascii_lowercase();

        if lower.contains("factory") || SELF_CREATE.is_match(content) {
            model.add_pattern("Factory", name);
        }
        if lower.contains("builder") || BUILD_METHOD.is_match(content) {
            model.add_pattern("Builder", name);
        }
        let callable = content.contains("def call");
        if lower.contains("command") && callable {
            model.add_pattern("Command", name);
        }
        if lower.contains("service") || (callable && !lower.contains("controller")) {
            model.add_pattern("Service Object", name);
        }
    }

    fn analyze_schemas(&self, content: &str, model: &mut AnalysisModel) {
        add_tables(&CREATE_TABLE, content, "ActiveRecord Migration", model);
        add_tables(&SEQUEL_TABLE, content, "Sequel", model);
        if content.contains("include Mongoid::Document") {
            if let Some(caps) = MONGOID_CLASS.captures(content) {
                model.add_schema(format!("Collection: {} (Mongoid)", &caps[1]));
            }
        }
    }

    /// Verb routes are attributed to whichever routing DSL the unit uses.
    fn analyze_endpoints(&self, content: &str, model: &mut AnalysisModel) {
        if content.contains("Grape::API") {
            for caps in GRAPE_ROUTE.captures_iter(content) {
                model.add_endpoint(format!("{} {} (Grape)", caps[1].to_ascii_uppercase(), &caps[2]));
            }
            return;
        }

        let framework = if content.contains("sinatra") || content.contains("Sinatra::") {
            "Sinatra"
        } else {
            "Rails Route"
        };
        for caps in VERB_ROUTE.captures_iter(content) {
            model.add_endpoint(format!(
                "{} {} ({})",
                caps[1].to_ascii_uppercase(),
                &caps[2],
                framework
            ));
        }
        if content.contains("routes.draw") {
            for caps in RESOURCES.captures_iter(content) {
                model.add_endpoint(format!("CRUD /api/{} (Rails resources)", &caps[1]));
            }
        }
    }
}

impl Default for RubyAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageAnalyzer for RubyAnalyzer {
    fn language(&self) -> Language {
        Language::Ruby
    }

    fn analyze(&self, unit: &SourceUnit, model: &mut AnalysisModel) -> Fidelity {
        let content = unit.content.as_str();
        if unit.file_name().eq_ignore_ascii_case("gemfile") {
            self.analyze_gemfile(content, model);
            return Fidelity::Manifest;
        }

        let module = parent_module(unit.directory());
        // The first `module` names the package; otherwise the directory does.
        let package = DEFINITION
            .captures_iter(content)
            .find(|c| &c[1] == "module")
            .map(|c| c[2].to_string())
            .unwrap_or_else(|| module.to_string());
        model.add_package(package);
        model.add_classes(count_matches(&DEFINITION, content));

        for caps in REQUIRE.captures_iter(content) {
            if !caps[1].starts_with('.') {
                model.add_dependency(module, &caps[1], "require");
            }
        }
        for caps in REQUIRE_RELATIVE.captures_iter(content) {
            model.add_dependency(module, &caps[1], "require_relative");
        }

        detect_frameworks(content, FRAMEWORKS, model);
        if unit.file_name().eq_ignore_ascii_case("rakefile")
            || content.contains("Rake::Task")
            || (content.contains("namespace :") && content.contains("task :"))
        {
            model.add_framework("Rake (Build Tool)");
        }
        detect_patterns(unit.file_name(), unit.unit_name(), content, PATTERNS, model);
        self.detect_special_patterns(unit, model);
        self.analyze_schemas(content, model);
        self.analyze_endpoints(content, model);

        Fidelity::Heuristic
    }
}
