//! JavaScript and TypeScript analyzer.
//!
//! One implementation serves both languages; the TypeScript instance parses
//! with the TypeScript (or TSX) grammar and counts interfaces, enums and
//! type aliases as types.

use lazy_static::lazy_static;
use regex::Regex;

use crate::analysis::language::Language;
use crate::analysis::model::AnalysisModel;
use crate::analysis::rules::{
    add_method_routes, count_matches, detect_frameworks, detect_patterns, parent_module,
    FrameworkRule, PatternRule,
};
use crate::analysis::syntax::{Grammar, SourceView, StructureQuery};
use crate::analysis::traits::{Fidelity, LanguageAnalyzer, SourceUnit};

const JS_STRUCTURE: StructureQuery = StructureQuery {
    type_kinds: &["class_declaration"],
    package_kind: None,
};

const TS_STRUCTURE: StructureQuery = StructureQuery {
    type_kinds: &[
        "class_declaration",
        "abstract_class_declaration",
        "interface_declaration",
        "enum_declaration",
        "type_alias_declaration",
    ],
    package_kind: None,
};

lazy_static! {
    static ref IMPORT: Regex =
        Regex::new(r#"(?m)^\s*import\s+(?:.*?\s+from\s+)?['"]([^'"]+)['"]"#).unwrap();
    static ref REQUIRE: Regex = Regex::new(r#"require\(\s*['"]([^'"]+)['"]\s*\)"#).unwrap();
    static ref TYPE_DECL: Regex = Regex::new(r"\b(?:class|interface|type|enum)\s+\w+").unwrap();
    static ref FUNCTION_VALUE: Regex =
        Regex::new(r"\b(?:const|let|var)\s+\w+\s*=\s*(?:async\s+)?(?:function\b|\()").unwrap();
    static ref COMPONENT: Regex =
        Regex::new(r"(?s)export\s+(?:default\s+)?function\s+\w+.*return.*<.*>").unwrap();
    static ref MIDDLEWARE_SIGNATURE: Regex = Regex::new(r"\(req,\s*res,\s*next\)").unwrap();
    static ref MONGOOSE_SCHEMA: Regex = Regex::new(r"const\s+(\w+)Schema\s*=").unwrap();
    static ref TYPEORM_ENTITY: Regex = Regex::new(r#"@Entity\(\s*['"]([^'"]+)['"]"#).unwrap();
    static ref EXPRESS_ROUTE: Regex =
        Regex::new(r#"\b(?:app|router)\.(get|post|put|delete|patch)\(\s*['"]([^'"]+)['"]"#)
            .unwrap();
    static ref NEST_ROUTE: Regex =
        Regex::new(r#"@(Get|Post|Put|Delete|Patch)\(\s*['"]([^'"]+)['"]\s*\)"#).unwrap();
}

const FRAMEWORKS: &[FrameworkRule] = &[
    FrameworkRule { name: "React", markers: &["from 'react'", "from \"react\""] },
    FrameworkRule { name: "React Hooks", markers: &["useState", "useEffect"] },
    FrameworkRule { name: "Vue.js", markers: &["from 'vue'", "from \"vue\""] },
    FrameworkRule { name: "Angular", markers: &["@angular/core", "@Component"] },
    FrameworkRule {
        name: "Express.js",
        markers: &["from 'express'", "from \"express\"", "require('express')", "require(\"express\")"],
    },
    FrameworkRule { name: "Next.js", markers: &["from 'next", "from \"next", "next/"] },
    FrameworkRule { name: "NestJS", markers: &["@nestjs/"] },
    FrameworkRule { name: "Jest", markers: &["from 'jest'", "describe(", "test("] },
    FrameworkRule { name: "Mocha", markers: &["from 'mocha'"] },
    FrameworkRule { name: "Redux", markers: &["from 'redux'", "useDispatch"] },
    FrameworkRule { name: "Zustand", markers: &["from 'zustand'"] },
    FrameworkRule { name: "Mongoose", markers: &["from 'mongoose'", "require('mongoose')"] },
    FrameworkRule { name: "TypeORM", markers: &["from 'typeorm'"] },
    FrameworkRule { name: "Prisma", markers: &["from 'prisma'", "@prisma/client"] },
];

const PATTERNS: &[PatternRule] = &[
    PatternRule { name: "Factory", name_hints: &["factory"], content_markers: &["create("] },
    PatternRule { name: "Repository", name_hints: &["repository", "repo"], content_markers: &[] },
    PatternRule { name: "Service Layer", name_hints: &["service"], content_markers: &[] },
    PatternRule { name: "MVC Controller", name_hints: &["controller"], content_markers: &[] },
    PatternRule { name: "Component", name_hints: &["component"], content_markers: &["@Component"] },
    PatternRule { name: "Middleware", name_hints: &["middleware"], content_markers: &[] },
];

pub struct JavaScriptAnalyzer {
    typescript: bool,
}

impl JavaScriptAnalyzer {
    pub fn javascript() -> Self {
        Self { typescript: false }
    }

    pub fn typescript() -> Self {
        Self { typescript: true }
    }

    fn view(&self, unit: &SourceUnit) -> SourceView {
        let (grammar, query) = if !self.typescript {
            (Grammar::JavaScript, &JS_STRUCTURE)
        } else if unit.file_name().to_ascii_lowercase().ends_with(".tsx") {
            (Grammar::Tsx, &TS_STRUCTURE)
        } else {
            (Grammar::TypeScript, &TS_STRUCTURE)
        };
        SourceView::of(grammar, &unit.content, query, &unit.relative_path)
    }

    fn detect_special_patterns(&self, unit: &SourceUnit, model: &mut AnalysisModel) {
        let content = &unit.content;
        let name = unit.unit_name();
        if content.contains("getInstance") && content.contains("static") {
            model.add_pattern("Singleton", name);
        }
        if COMPONENT.is_match(content) && !unit.file_name().to_ascii_lowercase().contains("component")
        {
            model.add_pattern("Component", name);
        }
        if name.to_ascii_lowercase().starts_with("use")
            && (content.contains("useState") || content.contains("useEffect"))
        {
            model.add_pattern("Custom Hook", name);
        }
        if MIDDLEWARE_SIGNATURE.is_match(content)
            && !unit.file_name().to_ascii_lowercase().contains("middleware")
        {
            model.add_pattern("Middleware", name);
        }
    }

    fn analyze_schemas(&self, content: &str, model: &mut AnalysisModel) {
        if content.contains("new Schema(") || content.contains("mongoose.Schema") {
            if let Some(c) = MONGOOSE_SCHEMA.captures(content) {
                model.add_schema(format!("Collection: {} (Mongoose)", &c[1]));
            }
        }
        if let Some(c) = TYPEORM_ENTITY.captures(content) {
            model.add_schema(format!("Table: {} (TypeORM)", &c[1]));
        }
        if content.contains("PrismaClient") {
            model.add_schema("Database: Prisma Client");
        }
    }

    fn analyze_endpoints(&self, content: &str, model: &mut AnalysisModel) {
        add_method_routes(&EXPRESS_ROUTE, content, "Express", model);
        add_method_routes(&NEST_ROUTE, content, "NestJS", model);
        if content.contains("export default") && content.contains("req") && content.contains("res")
        {
            model.add_endpoint("API Route (Next.js)");
        }
    }
}

impl LanguageAnalyzer for JavaScriptAnalyzer {
    fn language(&self) -> Language {
        if self.typescript {
            Language::TypeScript
        } else {
            Language::JavaScript
        }
    }

    fn supports_structured_parsing(&self) -> bool {
        cfg!(feature = "tree-sitter")
    }

    fn analyze(&self, unit: &SourceUnit, model: &mut AnalysisModel) -> Fidelity {
        let content = unit.content.as_str();

        // The containing directory names the module.
        let module = parent_module(unit.directory());
        model.add_package(module);

        let fidelity = match self.view(unit) {
            SourceView::Parsed(facts) => {
                model.add_classes(facts.type_count);
                Fidelity::Structured
            }
            SourceView::Heuristic => {
                model.add_classes(
                    count_matches(&TYPE_DECL, content) + count_matches(&FUNCTION_VALUE, content),
                );
                Fidelity::Heuristic
            }
        };

        // Only bare package specifiers; relative and scoped paths are local.
        for (re, kind) in [(&*IMPORT, "import"), (&*REQUIRE, "require")] {
            for caps in re.captures_iter(content) {
                let target = &caps[1];
                if !target.starts_with('.') && !target.starts_with('@') {
                    model.add_dependency(module, target, kind);
                }
            }
        }

        detect_frameworks(content, FRAMEWORKS, model);
        if self.typescript {
            model.add_framework("TypeScript");
        }
        detect_patterns(unit.file_name(), unit.unit_name(), content, PATTERNS, model);
        self.detect_special_patterns(unit, model);
        self.analyze_schemas(content, model);
        self.analyze_endpoints(content, model);

        fidelity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_express_module() {
        let source = r#"
const express = require('express');
const db = require('./db');
import lodash from 'lodash';

const router = express.Router();
router.get('/users', (req, res) => res.json([]));
router.post("/users", createUser);

module.exports = router;
"#;
        let unit = SourceUnit::new("server/routes/users.js", Language::JavaScript, source);
        let mut model = AnalysisModel::new();
        JavaScriptAnalyzer::javascript().analyze(&unit, &mut model);

        assert!(model.packages.contains("routes"));
        let targets: Vec<(&str, &str)> = model
            .dependencies
            .iter()
            .map(|d| (d.to.as_str(), d.kind.as_str()))
            .collect();
        assert_eq!(targets, vec![("lodash", "import"), ("express", "require")]);
        assert_eq!(model.framework_count("Express.js"), 1);
        assert_eq!(
            model.endpoints,
            vec!["GET /users (Express)".to_string(), "POST /users (Express)".to_string()]
        );
        assert_eq!(model.framework_count("TypeScript"), 0);
    }

    #[test]
    fn test_typescript_types_and_nest_routes() {
        let source = r#"
import { Controller, Get } from '@nestjs/common';

export interface UserDto { id: number }
export enum Role { Admin, User }

@Controller('users')
export class UsersController {
  @Get('/:id')
  find() {}
}
"#;
        let unit = SourceUnit::new("src/users.controller.ts", Language::TypeScript, source);
        let mut model = AnalysisModel::new();
        JavaScriptAnalyzer::typescript().analyze(&unit, &mut model);

        assert_eq!(model.class_count, 3);
        assert_eq!(model.framework_count("NestJS"), 1);
        assert_eq!(model.framework_count("TypeScript"), 1);
        assert_eq!(model.endpoints, vec!["GET /:id (NestJS)".to_string()]);
        assert_eq!(
            model.patterns["MVC Controller"],
            vec!["users.controller".to_string()]
        );
        // Scoped packages are not recorded as edges.
        assert!(model.dependencies.is_empty());
    }
}
