//! Optional run configuration loaded from YAML.
//!
//! A config file can tighten the resource ceilings, set the worker count, and
//! exclude paths from analysis. It can never loosen a ceiling.

use std::fs;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};

use crate::analysis::AnalysisOptions;
use crate::intake::ResourceLimits;

/// Config file names searched for in the working directory, in order.
pub const DEFAULT_CONFIG_NAMES: &[&str] = &["archlens.yaml", ".archlens.yaml"];

/// Top-level config file.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct Config {
    /// Ceilings to tighten; unset fields keep the built-in value.
    #[serde(default)]
    pub limits: LimitOverrides,
    /// Worker threads for analysis (default: available parallelism)
    #[serde(default)]
    pub jobs: Option<usize>,
    /// Glob patterns for workspace-relative paths to skip (e.g. "**/vendor/**")
    #[serde(default)]
    pub excluded_paths: Vec<String>,
}

/// Partial override of [`ResourceLimits`]. The extension whitelist is fixed.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct LimitOverrides {
    #[serde(default)]
    pub max_archive_size: Option<u64>,
    #[serde(default)]
    pub max_total_uncompressed_bytes: Option<u64>,
    #[serde(default)]
    pub max_file_count: Option<usize>,
    #[serde(default)]
    pub max_source_file_size: Option<u64>,
    #[serde(default)]
    pub max_compression_ratio: Option<u64>,
}

impl Config {
    /// Parse a config from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        // An empty file deserializes to null, which means "all defaults".
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Built-in ceilings with this config's overrides applied.
    pub fn effective_limits(&self) -> ResourceLimits {
        let d = ResourceLimits::DEFAULT;
        let o = &self.limits;
        ResourceLimits {
            max_archive_size: o.max_archive_size.unwrap_or(d.max_archive_size),
            max_total_uncompressed_bytes: o
                .max_total_uncompressed_bytes
                .unwrap_or(d.max_total_uncompressed_bytes),
            max_file_count: o.max_file_count.unwrap_or(d.max_file_count),
            max_source_file_size: o.max_source_file_size.unwrap_or(d.max_source_file_size),
            max_compression_ratio: o.max_compression_ratio.unwrap_or(d.max_compression_ratio),
        }
    }

    /// Compile `excluded_paths` into one matcher.
    pub fn excluded_globs(&self) -> anyhow::Result<GlobSet> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.excluded_paths {
            let glob = Glob::new(pattern).map_err(|e| {
                anyhow::anyhow!("invalid excluded_paths pattern {:?}: {}", pattern, e)
            })?;
            builder.add(glob);
        }
        Ok(builder.build()?)
    }

    /// Orchestrator options for this config.
    ///
    /// `jobs_override` (from the command line) wins over the file.
    pub fn analysis_options(&self, jobs_override: Option<usize>) -> anyhow::Result<AnalysisOptions> {
        let mut options =
            AnalysisOptions::new(&self.effective_limits()).with_excluded(self.excluded_globs()?);
        if let Some(jobs) = jobs_override.or(self.jobs) {
            options = options.with_jobs(jobs);
        }
        Ok(options)
    }
}

/// Find a config file in `dir`.
pub fn discover(dir: &Path) -> Option<PathBuf> {
    DEFAULT_CONFIG_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

/// Load the explicit config, or a discovered one, or the defaults.
///
/// Returns the config together with the file it came from, if any. The
/// result is validated.
pub fn load(explicit: Option<&Path>, search_dir: &Path) -> anyhow::Result<(Config, Option<PathBuf>)> {
    let source = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => discover(search_dir),
    };

    let config = match &source {
        Some(path) => Config::parse_file(path)
            .map_err(|e| anyhow::anyhow!("cannot parse config {}: {}", path.display(), e))?,
        None => Config::default(),
    };
    validate(&config)?;
    Ok((config, source))
}

/// Validate a config for correctness.
pub fn validate(config: &Config) -> anyhow::Result<()> {
    let d = ResourceLimits::DEFAULT;
    let o = &config.limits;
    let checks: [(&str, Option<u64>, u64); 5] = [
        ("max_archive_size", o.max_archive_size, d.max_archive_size),
        (
            "max_total_uncompressed_bytes",
            o.max_total_uncompressed_bytes,
            d.max_total_uncompressed_bytes,
        ),
        (
            "max_file_count",
            o.max_file_count.map(|n| n as u64),
            d.max_file_count as u64,
        ),
        ("max_source_file_size", o.max_source_file_size, d.max_source_file_size),
        ("max_compression_ratio", o.max_compression_ratio, d.max_compression_ratio),
    ];
    for (name, value, ceiling) in checks {
        match value {
            Some(0) => anyhow::bail!("limits.{} must be greater than zero", name),
            Some(v) if v > ceiling => anyhow::bail!(
                "limits.{} = {} exceeds the built-in ceiling of {}",
                name,
                v,
                ceiling
            ),
            _ => {}
        }
    }

    if config.jobs == Some(0) {
        anyhow::bail!("jobs must be at least 1");
    }

    config.excluded_globs()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_config() {
        let yaml = r#"
limits:
  max_file_count: 500
  max_source_file_size: 1048576
jobs: 2
excluded_paths:
  - "**/node_modules/**"
  - "vendor/**"
"#;
        let config = Config::from_yaml(yaml).unwrap();
        validate(&config).unwrap();

        let limits = config.effective_limits();
        assert_eq!(limits.max_file_count, 500);
        assert_eq!(limits.max_source_file_size, 1024 * 1024);
        assert_eq!(limits.max_archive_size, ResourceLimits::DEFAULT.max_archive_size);
        assert_eq!(limits.max_compression_ratio, 100);

        let globs = config.excluded_globs().unwrap();
        assert!(globs.is_match("web/node_modules/react/index.js"));
        assert!(globs.is_match("vendor/lib/a.php"));
        assert!(!globs.is_match("src/vendor.rs"));

        let options = config.analysis_options(None).unwrap();
        assert_eq!(options.jobs, 2);
        assert_eq!(options.max_source_file_size, 1024 * 1024);
        assert_eq!(config.analysis_options(Some(6)).unwrap().jobs, 6);
    }

    #[test]
    fn test_empty_config_is_default() {
        let config = Config::from_yaml("  \n").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.effective_limits(), ResourceLimits::DEFAULT);
    }

    #[test]
    fn test_limits_can_only_tighten() {
        let raised = Config::from_yaml("limits:\n  max_compression_ratio: 1000\n").unwrap();
        let err = validate(&raised).unwrap_err();
        assert!(err.to_string().contains("max_compression_ratio"));

        let zero = Config::from_yaml("limits:\n  max_file_count: 0\n").unwrap();
        assert!(validate(&zero).is_err());

        let at_default = Config::from_yaml("limits:\n  max_file_count: 10000\n").unwrap();
        assert!(validate(&at_default).is_ok());
    }

    #[test]
    fn test_invalid_jobs_and_globs() {
        let config = Config::from_yaml("jobs: 0\n").unwrap();
        assert!(validate(&config).is_err());

        let config = Config::from_yaml("excluded_paths:\n  - \"src/[\"\n").unwrap();
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("excluded_paths"));
    }

    #[test]
    fn test_discover_and_load() {
        let temp = TempDir::new().unwrap();
        assert!(discover(temp.path()).is_none());
        let (config, source) = load(None, temp.path()).unwrap();
        assert_eq!(config, Config::default());
        assert!(source.is_none());

        let path = temp.path().join(".archlens.yaml");
        fs::write(&path, "jobs: 3\n").unwrap();
        assert_eq!(discover(temp.path()), Some(path.clone()));

        let (config, source) = load(None, temp.path()).unwrap();
        assert_eq!(config.jobs, Some(3));
        assert_eq!(source, Some(path));
    }

    #[test]
    fn test_load_rejects_malformed_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("broken.yaml");
        fs::write(&path, "limits: [1, 2\n").unwrap();
        assert!(load(Some(&path), temp.path()).is_err());
    }
}
