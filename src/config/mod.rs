use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScanError};

/// Top-level configuration from `.pkgscan.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub summary: SummaryConfig,
}

/// What to walk and which handlers to run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Maximum directory depth below the scanned root.
    #[serde(default)]
    pub max_depth: Option<usize>,
    /// Files larger than this many bytes are not parsed.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    /// Glob patterns matched against codebase-relative paths and each of
    /// their components. Matching directories are not descended into.
    #[serde(default)]
    pub ignore: Vec<String>,
    /// Include hidden files and directories.
    #[serde(default = "default_true")]
    pub hidden: bool,
    /// Only run the handlers with these datasource ids.
    #[serde(default)]
    pub datasources: Option<Vec<String>>,
}

/// Copyright, holder and author summary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SummaryConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Attach a summary to every directory, not only the root.
    #[serde(default)]
    pub keep_details: bool,
}

fn default_max_file_size() -> u64 {
    50 * 1024 * 1024
}

fn default_true() -> bool {
    true
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_depth: None,
            max_file_size: default_max_file_size(),
            ignore: Vec::new(),
            hidden: true,
            datasources: None,
        }
    }
}

impl ScanConfig {
    pub fn ignore_patterns(&self) -> Result<Vec<glob::Pattern>> {
        self.ignore
            .iter()
            .map(|p| {
                glob::Pattern::new(p)
                    .map_err(|e| ScanError::Config(format!("invalid ignore pattern '{}': {}", p, e)))
            })
            .collect()
    }

    /// Whether the handler with this datasource id may run.
    pub fn allows(&self, datasource_id: &str) -> bool {
        match &self.datasources {
            Some(allowed) => allowed.iter().any(|d| d == datasource_id),
            None => true,
        }
    }
}

impl Config {
    /// Load config from a TOML file. Returns default if file doesn't exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Generate a starter config file.
    pub fn starter_toml() -> &'static str {
        r#"# pkgscan configuration

[scan]
# Maximum directory depth to walk (unlimited when unset).
# max_depth = 8

# Files larger than this (bytes) are not parsed.
max_file_size = 52428800

# Glob patterns of paths to skip, relative to the scanned directory.
# A pattern also matches any single path component, at any depth.
ignore = ["target", "node_modules", ".git"]

# Include hidden files and directories.
hidden = true

# Restrict scanning to these datasource ids (see `pkgscan list-handlers`).
# datasources = ["cargo_toml", "cargo_lock"]

[summary]
# Summarize copyrights, holders and authors.
enabled = false

# Also attach a summary to every directory.
keep_details = false
"#
    }
}
