//! pkgscan: package manifest scanner.
//!
//! Walks a codebase, parses package manifests, lockfiles and metadata files
//! into package data, assembles top-level packages and dependencies, and
//! records which files belong to which package.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::path::Path;
//! use pkgscan::{scan, ScanOptions};
//!
//! let options = ScanOptions::default();
//! let report = scan(Path::new("./my-project"), &options).unwrap();
//! println!("Packages: {}, Dependencies: {}", report.packages.len(), report.dependencies.len());
//! ```

pub mod analysis;
pub mod codebase;
pub mod config;
pub mod error;
pub mod golden;
pub mod handlers;
pub mod models;
pub mod output;
pub mod parser;

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use analysis::Summary;
use codebase::Codebase;
use config::Config;
use error::Result;
use handlers::HandlerRegistry;
use models::{Dependency, Package};
use output::json::ScanHeader;
use output::OutputFormat;

/// Default config file name, looked up in the scanned directory.
pub const CONFIG_FILE_NAME: &str = ".pkgscan.toml";

/// Options for a scan invocation.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Path to config file (defaults to `.pkgscan.toml` in scan dir).
    pub config_path: Option<PathBuf>,
    /// Output format.
    pub format: OutputFormat,
    /// CLI override for the datasource allow-list.
    pub datasources_override: Option<Vec<String>>,
    /// CLI override enabling the summary.
    pub summary_override: Option<bool>,
    /// Leave volatile header fields out, for reproducible output.
    pub test_mode: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            config_path: None,
            format: OutputFormat::Console,
            datasources_override: None,
            summary_override: None,
            test_mode: false,
        }
    }
}

/// Complete scan report.
#[derive(Debug)]
pub struct ScanReport {
    pub header: ScanHeader,
    pub codebase: Codebase,
    pub packages: Vec<Package>,
    pub dependencies: Vec<Dependency>,
    pub summary: Option<Summary>,
}

/// Run a complete scan: walk, parse datafiles, assemble, summarize.
pub fn scan(path: &Path, options: &ScanOptions) -> Result<ScanReport> {
    let start = chrono::Utc::now();

    // Load config
    let config_path = options
        .config_path
        .clone()
        .unwrap_or_else(|| path.join(CONFIG_FILE_NAME));
    let mut config = Config::load(&config_path)?;

    // Apply CLI overrides
    if let Some(datasources) = &options.datasources_override {
        config.scan.datasources = Some(datasources.clone());
    }
    if let Some(enabled) = options.summary_override {
        config.summary.enabled = enabled;
    }

    let registry = HandlerRegistry::for_config(&config.scan);
    let mut codebase = Codebase::collect(path, &config.scan)?;
    tracing::info!(
        root = %path.display(),
        resources = codebase.len(),
        "collected codebase"
    );

    parse_datafiles(&mut codebase, &registry, config.scan.max_file_size);
    let assembled = analysis::create_packages_and_dependencies(&mut codebase, &registry)?;

    let summary = config
        .summary
        .enabled
        .then(|| analysis::summarize_codebase(&mut codebase, config.summary.keep_details));

    let mut header = ScanHeader::new(header_options(path, &config, options));
    header.files_count = codebase.file_count();
    header.packages_count = assembled.packages.len();
    header.errors = codebase
        .resources()
        .flat_map(|r| r.scan_errors.iter().map(move |e| format!("{}: {}", r.path, e)))
        .collect();
    if !options.test_mode {
        header.set_timing(start, chrono::Utc::now());
    }

    Ok(ScanReport {
        header,
        codebase,
        packages: assembled.packages,
        dependencies: assembled.dependencies,
        summary,
    })
}

/// Parse every recognized datafile. A datafile that fails to parse gets a
/// scan error and the scan goes on.
fn parse_datafiles(codebase: &mut Codebase, registry: &HandlerRegistry, max_file_size: u64) {
    for id in codebase.walk_topdown(0) {
        let resource = codebase.get(id);
        let Some(handler) = registry.find_for(resource) else {
            continue;
        };
        if resource.size.is_some_and(|size| size > max_file_size) {
            tracing::debug!(path = %resource.path, "file too large, not parsed");
            continue;
        }

        tracing::debug!(
            path = %resource.path,
            datasource_id = handler.datasource_id(),
            "parsing datafile"
        );
        match handler.parse(&resource.location) {
            Ok(records) => codebase.get_mut(id).package_data = records,
            Err(e) => {
                tracing::warn!(path = %resource.path, error = %e, "cannot parse datafile");
                codebase.get_mut(id).scan_errors.push(e.to_string());
            }
        }
    }
}

fn header_options(path: &Path, config: &Config, options: &ScanOptions) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("input".into(), path.display().to_string().into());
    map.insert("--summary".into(), config.summary.enabled.into());
    if let Some(datasources) = &config.scan.datasources {
        map.insert("--datasource".into(), Value::from(datasources.clone()));
    }
    if options.test_mode {
        map.insert("--test-mode".into(), true.into());
    }
    map
}

/// Render a scan report in the specified format.
pub fn render_report(report: &ScanReport, format: OutputFormat) -> Result<String> {
    output::render(report, format)
}

#[cfg(test)]
mod integration_tests {
    use super::*;
    use std::path::Path;

    fn test_options() -> ScanOptions {
        ScanOptions {
            test_mode: true,
            ..Default::default()
        }
    }

    #[test]
    fn cargo_project_is_one_package() {
        let report = scan(Path::new("tests/fixtures/cargo/rustup"), &test_options()).unwrap();
        assert_eq!(report.packages.len(), 1);
        let package = &report.packages[0];
        assert_eq!(package.purl.as_deref(), Some("pkg:cargo/rustup@1.17.0"));

        let uids: Vec<&str> = report.packages.iter().map(|p| p.package_uid.as_str()).collect();
        for resource in report.codebase.resources() {
            for uid in &resource.for_packages {
                assert!(uids.contains(&uid.as_str()));
            }
        }
        for dependency in &report.dependencies {
            assert_eq!(
                dependency.for_package_uid.as_deref(),
                Some(package.package_uid.as_str())
            );
        }
    }

    #[test]
    fn bower_manifest_detected() {
        let report = scan(Path::new("tests/fixtures/bower/basic"), &test_options()).unwrap();
        assert_eq!(report.packages.len(), 1);
        assert_eq!(report.packages[0].purl.as_deref(), Some("pkg:bower/blue-leaf@1.0.0"));
        assert_eq!(report.dependencies.len(), 3);
    }

    #[test]
    fn datasource_override_restricts_handlers() {
        let options = ScanOptions {
            datasources_override: Some(vec!["cargo_lock".into()]),
            ..test_options()
        };
        let report = scan(Path::new("tests/fixtures/cargo/rustup"), &options).unwrap();
        assert!(report.packages.is_empty());
        assert!(report.dependencies.iter().all(|d| d.datasource_id == "cargo_lock"));
    }

    #[test]
    fn broken_datafile_is_a_scan_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bower.json"), "{ not json").unwrap();
        let report = scan(dir.path(), &test_options()).unwrap();
        assert!(report.packages.is_empty());
        assert_eq!(report.header.errors.len(), 1);
        let file = report.codebase.child_named(0, "bower.json").unwrap();
        assert_eq!(report.codebase.get(file).scan_errors.len(), 1);
    }

    #[test]
    fn summary_is_optional() {
        let report = scan(Path::new("tests/fixtures/about/zlib"), &test_options()).unwrap();
        assert!(report.summary.is_none());

        let options = ScanOptions {
            summary_override: Some(true),
            ..test_options()
        };
        let report = scan(Path::new("tests/fixtures/about/zlib"), &options).unwrap();
        let summary = report.summary.unwrap();
        // README and zlib.c have no holder
        let holders: Vec<(Option<&str>, usize)> = summary
            .holders
            .iter()
            .map(|e| (e.value.as_deref(), e.count))
            .collect();
        assert_eq!(holders, vec![(None, 2), (Some("Mark Adler"), 1)]);
    }

    /// Scan `tests/fixtures/<fixture>` and compare with `<fixture>-expected.json`.
    fn check_golden(fixture: &str) {
        let fixtures = Path::new("tests/fixtures");
        let report = scan(&fixtures.join(fixture), &test_options()).unwrap();
        let actual = output::json::to_value(&report).unwrap();
        let expected = fixtures.join(format!("{fixture}-expected.json"));
        if let Err(e) = golden::check_json_scan(&expected, actual, &golden::CheckOptions::from_env()) {
            panic!("{e}");
        }
    }

    #[test]
    fn golden_cargo_manifest_and_lock() {
        check_golden("cargo/rustup");
    }

    #[test]
    fn golden_bower_manifest() {
        check_golden("bower/basic");
    }

    #[test]
    fn golden_about_file() {
        check_golden("about/zlib");
    }

    #[test]
    fn golden_pkginfo() {
        check_golden("pypi/requests-2.31.0");
    }

    #[test]
    fn golden_sdist_archive() {
        check_golden("pypi/sdist");
    }

    #[test]
    fn test_mode_has_no_timestamps() {
        let report = scan(Path::new("tests/fixtures/bower/basic"), &test_options()).unwrap();
        assert!(report.header.start_timestamp.is_none());
        let json = render_report(&report, OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["headers"][0]["tool_name"], "pkgscan");
        assert!(value.get("summary").is_none());
    }
}
