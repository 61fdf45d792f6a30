//! The aggregate every analyzer contributes to.
//!
//! All mutation is additive. Sets and counters merge commutatively; ordered
//! lists keep the order in which partial models are merged, which the
//! orchestrator arranges to be file-visitation order.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use super::language::Language;

/// A directed reference from one unit or package to another symbol.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DependencyEdge {
    pub from: String,
    pub to: String,
    /// Short tag such as `import`, `require`, `use`, `#include`.
    pub kind: String,
}

impl DependencyEdge {
    pub fn new(from: impl Into<String>, to: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            kind: kind.into(),
        }
    }
}

/// Packages grouped under a shared trailing segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleInfo {
    pub name: String,
    /// Lexicographically smallest package in the bucket.
    pub package_name: String,
    pub package_count: usize,
}

/// Structural facts accumulated over one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnalysisModel {
    pub packages: BTreeSet<String>,
    pub dependencies: Vec<DependencyEdge>,
    pub frameworks: BTreeMap<String, usize>,
    pub patterns: BTreeMap<String, Vec<String>>,
    pub schemas: Vec<String>,
    pub endpoints: Vec<String>,
    pub language_files: BTreeMap<Language, usize>,
    pub class_count: usize,
}

impl AnalysisModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_package(&mut self, name: impl Into<String>) {
        let name = name.into();
        let name = name.trim();
        if !name.is_empty() {
            self.packages.insert(name.to_string());
        }
    }

    pub fn add_dependency(
        &mut self,
        from: impl Into<String>,
        to: impl Into<String>,
        kind: impl Into<String>,
    ) {
        let edge = DependencyEdge::new(from, to, kind);
        if !edge.to.is_empty() {
            self.dependencies.push(edge);
        }
    }

    pub fn add_framework(&mut self, name: &str) {
        *self.frameworks.entry(name.to_string()).or_insert(0) += 1;
    }

    pub fn add_pattern(&mut self, pattern: &str, unit: impl Into<String>) {
        self.patterns
            .entry(pattern.to_string())
            .or_default()
            .push(unit.into());
    }

    pub fn add_schema(&mut self, mention: impl Into<String>) {
        self.schemas.push(mention.into());
    }

    pub fn add_endpoint(&mut self, mention: impl Into<String>) {
        self.endpoints.push(mention.into());
    }

    pub fn add_classes(&mut self, count: usize) {
        self.class_count += count;
    }

    /// Count one successfully analyzed file of `language`.
    pub fn record_file(&mut self, language: Language) {
        *self.language_files.entry(language).or_insert(0) += 1;
    }

    /// Files analyzed across all languages.
    pub fn total_file_count(&self) -> usize {
        self.language_files.values().sum()
    }

    pub fn file_count(&self, language: Language) -> usize {
        self.language_files.get(&language).copied().unwrap_or(0)
    }

    pub fn framework_count(&self, name: &str) -> usize {
        self.frameworks.get(name).copied().unwrap_or(0)
    }

    /// Fold `other` into `self`.
    ///
    /// Sets are unioned and counters summed, so those parts do not depend on
    /// merge order. Lists of `other` are appended after those of `self`.
    pub fn merge(&mut self, other: AnalysisModel) {
        self.packages.extend(other.packages);
        self.dependencies.extend(other.dependencies);
        for (name, count) in other.frameworks {
            *self.frameworks.entry(name).or_insert(0) += count;
        }
        for (pattern, units) in other.patterns {
            self.patterns.entry(pattern).or_default().extend(units);
        }
        self.schemas.extend(other.schemas);
        self.endpoints.extend(other.endpoints);
        for (language, count) in other.language_files {
            *self.language_files.entry(language).or_insert(0) += count;
        }
        self.class_count += other.class_count;
    }

    /// Group packages by their last path or namespace segment.
    ///
    /// Derived purely from the package set, so the result does not depend on
    /// the order in which packages were discovered.
    pub fn modules(&self) -> Vec<ModuleInfo> {
        let mut buckets: BTreeMap<&str, ModuleInfo> = BTreeMap::new();

        // BTreeSet iteration is sorted, so the first package seen per bucket
        // is the smallest.
        for package in &self.packages {
            let Some(segment) = last_segment(package) else {
                continue;
            };
            buckets
                .entry(segment)
                .and_modify(|m| m.package_count += 1)
                .or_insert_with(|| ModuleInfo {
                    name: segment.to_string(),
                    package_name: package.clone(),
                    package_count: 1,
                });
        }

        buckets.into_values().collect()
    }
}

fn last_segment(package: &str) -> Option<&str> {
    package
        .rsplit(|c| matches!(c, '.' | '/' | '\\' | ':'))
        .find(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn partial_a() -> AnalysisModel {
        let mut m = AnalysisModel::new();
        m.add_package("com.example.service");
        m.add_dependency("com.example.service", "com.example.repo", "import");
        m.add_framework("Spring Boot");
        m.add_pattern("Service Layer", "UserService");
        m.add_endpoint("GET /users (list)");
        m.add_classes(2);
        m.record_file(Language::Java);
        m
    }

    fn partial_b() -> AnalysisModel {
        let mut m = AnalysisModel::new();
        m.add_package("app.service");
        m.add_package("com.example.service");
        m.add_framework("Spring Boot");
        m.add_framework("Flask");
        m.add_pattern("Service Layer", "billing");
        m.add_schema("Table: users (SQL DDL)");
        m.add_classes(1);
        m.record_file(Language::Python);
        m.record_file(Language::Python);
        m
    }

    #[test]
    fn test_merge_sets_and_counts_are_order_independent() {
        let mut ab = partial_a();
        ab.merge(partial_b());
        let mut ba = partial_b();
        ba.merge(partial_a());

        assert_eq!(ab.packages, ba.packages);
        assert_eq!(ab.frameworks, ba.frameworks);
        assert_eq!(ab.language_files, ba.language_files);
        assert_eq!(ab.class_count, ba.class_count);
        assert_eq!(ab.modules(), ba.modules());

        assert_eq!(ab.packages.len(), 2);
        assert_eq!(ab.framework_count("Spring Boot"), 2);
        assert_eq!(ab.total_file_count(), 3);
        assert_eq!(ab.class_count, 3);
    }

    #[test]
    fn test_merge_appends_lists_in_merge_order() {
        let mut ab = partial_a();
        ab.merge(partial_b());
        assert_eq!(
            ab.patterns["Service Layer"],
            vec!["UserService".to_string(), "billing".to_string()]
        );

        let mut ba = partial_b();
        ba.merge(partial_a());
        assert_eq!(
            ba.patterns["Service Layer"],
            vec!["billing".to_string(), "UserService".to_string()]
        );
    }

    #[test]
    fn test_empty_values_are_ignored() {
        let mut m = AnalysisModel::new();
        m.add_package("  ");
        m.add_dependency("a", "", "import");
        assert!(m.packages.is_empty());
        assert!(m.dependencies.is_empty());
    }

    #[test]
    fn test_module_buckets() {
        let mut m = AnalysisModel::new();
        m.add_package("com.example.service");
        m.add_package("org.other.service");
        m.add_package("com.example.web");
        m.add_package("App\\Http\\Controllers");
        m.add_package("serde::de");

        let modules = m.modules();
        let names: Vec<&str> = modules.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Controllers", "de", "service", "web"]);

        let service = &modules[2];
        assert_eq!(service.package_count, 2);
        assert_eq!(service.package_name, "com.example.service");
    }
}
