//! Catalog-driven matching shared by the language analyzers.
//!
//! Each analyzer declares static tables of framework markers and design
//! pattern hints; the helpers here apply them to one unit.

use regex::Regex;

use super::model::AnalysisModel;

/// A framework recognized by any of its textual markers.
pub struct FrameworkRule {
    pub name: &'static str,
    pub markers: &'static [&'static str],
}

/// A design pattern recognized by the unit's file name or by content markers.
pub struct PatternRule {
    pub name: &'static str,
    /// Case-insensitive substrings of the file name.
    pub name_hints: &'static [&'static str],
    /// Case-sensitive substrings of the content.
    pub content_markers: &'static [&'static str],
}

/// Count each matching framework once for this unit.
pub fn detect_frameworks(content: &str, rules: &[FrameworkRule], model: &mut AnalysisModel) {
    for rule in rules {
        if rule.markers.iter().any(|m| content.contains(m)) {
            model.add_framework(rule.name);
        }
    }
}

/// Record a hit for every matching pattern, attributed to `unit_name`.
pub fn detect_patterns(
    file_name: &str,
    unit_name: &str,
    content: &str,
    rules: &[PatternRule],
    model: &mut AnalysisModel,
) {
    let lower = file_name.to_ascii_lowercase();
    for rule in rules {
        let by_name = rule.name_hints.iter().any(|h| lower.contains(h));
        let by_content = rule.content_markers.iter().any(|m| content.contains(m));
        if by_name || by_content {
            model.add_pattern(rule.name, unit_name);
        }
    }
}

/// Number of non-overlapping matches of `re`.
pub fn count_matches(re: &Regex, content: &str) -> usize {
    re.find_iter(content).count()
}

/// First capture group of every match, in order.
pub fn first_groups<'t>(re: &Regex, content: &'t str) -> Vec<&'t str> {
    re.captures_iter(content)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect()
}

/// `Table: <name> (<origin>)` for every first-group match.
pub fn add_tables(re: &Regex, content: &str, origin: &str, model: &mut AnalysisModel) {
    for table in first_groups(re, content) {
        model.add_schema(format!("Table: {} ({})", table, origin));
    }
}

/// `<METHOD> <path> (<framework>)` for regexes capturing method then path.
pub fn add_method_routes(re: &Regex, content: &str, framework: &str, model: &mut AnalysisModel) {
    for caps in re.captures_iter(content) {
        if let (Some(method), Some(path)) = (caps.get(1), caps.get(2)) {
            model.add_endpoint(format!(
                "{} {} ({})",
                method.as_str().to_ascii_uppercase(),
                path.as_str(),
                framework
            ));
        }
    }
}

/// `<label> <path> (<framework>)` for regexes capturing only the path.
pub fn add_path_routes(
    re: &Regex,
    content: &str,
    label: &str,
    framework: &str,
    model: &mut AnalysisModel,
) {
    for path in first_groups(re, content) {
        model.add_endpoint(format!("{} {} ({})", label, path, framework));
    }
}

/// `CamelCase` to `snake_case`, the way ORMs derive table names.
pub fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            if prev_lower {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
            prev_lower = false;
        } else {
            prev_lower = c.is_ascii_lowercase() || c.is_ascii_digit();
            out.push(c);
        }
    }
    out
}

/// Directory of a relative path rendered as a dotted module name, or the
/// unit name at the root.
pub fn module_name(directory: &str, unit_name: &str) -> String {
    if directory.is_empty() {
        unit_name.to_string()
    } else {
        directory.replace('/', ".")
    }
}

/// Name of the innermost directory, or `root` at the top level.
pub fn parent_module(directory: &str) -> &str {
    directory
        .rsplit('/')
        .next()
        .filter(|d| !d.is_empty())
        .unwrap_or("root")
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAMEWORKS: &[FrameworkRule] = &[
        FrameworkRule {
            name: "Spring Boot",
            markers: &["@SpringBootApplication", "org.springframework.boot"],
        },
        FrameworkRule {
            name: "JUnit",
            markers: &["org.junit"],
        },
    ];

    const PATTERNS: &[PatternRule] = &[PatternRule {
        name: "Factory",
        name_hints: &["factory"],
        content_markers: &["createInstance"],
    }];

    #[test]
    fn test_framework_counted_once_per_unit() {
        let mut model = AnalysisModel::new();
        let content = "import org.springframework.boot.X;\n@SpringBootApplication\n";
        detect_frameworks(content, FRAMEWORKS, &mut model);
        assert_eq!(model.framework_count("Spring Boot"), 1);
        assert_eq!(model.framework_count("JUnit"), 0);
    }

    #[test]
    fn test_pattern_by_name_or_content() {
        let mut model = AnalysisModel::new();
        detect_patterns("WidgetFactory.java", "WidgetFactory", "", PATTERNS, &mut model);
        detect_patterns("Pool.java", "Pool", "Pool.createInstance()", PATTERNS, &mut model);
        detect_patterns("Plain.java", "Plain", "", PATTERNS, &mut model);
        assert_eq!(
            model.patterns["Factory"],
            vec!["WidgetFactory".to_string(), "Pool".to_string()]
        );
    }

    #[test]
    fn test_snake_case() {
        assert_eq!(to_snake_case("UserAccount"), "user_account");
        assert_eq!(to_snake_case("Order2Item"), "order2_item");
        assert_eq!(to_snake_case("users"), "users");
    }

    #[test]
    fn test_module_name() {
        assert_eq!(module_name("src/net", "socket"), "src.net");
        assert_eq!(module_name("", "main"), "main");
        assert_eq!(parent_module("server/routes"), "routes");
        assert_eq!(parent_module(""), "root");
    }
}
