pub mod about;
pub mod bower;
pub mod cargo;
pub mod pypi;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::codebase::{Codebase, Resource, ResourceId};
use crate::config::ScanConfig;
use crate::error::{Result, ScanError};
use crate::models::{Dependency, Package, PackageData};

/// One output of assembling a datafile's package data.
#[derive(Debug, Clone)]
pub enum AssemblyItem {
    Package(Package),
    Dependency(Dependency),
    /// A resource whose package data has been fully consumed and must not
    /// be assembled again.
    Resource(ResourceId),
}

/// A datafile handler recognizes one kind of package datafile, parses it
/// into package data and assembles that data into packages and
/// dependencies.
pub trait DatafileHandler: Send + Sync {
    /// Unique id stored in every record this handler produces.
    fn datasource_id(&self) -> &'static str;

    fn package_type(&self) -> &'static str;

    fn primary_language(&self) -> Option<&'static str> {
        None
    }

    fn description(&self) -> &'static str;

    /// Shell-style patterns matched against `/` + the resource path; `*`
    /// also matches `/`.
    fn path_patterns(&self) -> &'static [&'static str];

    /// Check if this handler can parse the given resource.
    fn is_datafile(&self, resource: &Resource) -> bool {
        resource.is_file() && matches_path_patterns(self.path_patterns(), &resource.path)
    }

    /// Parse the datafile at `location`.
    fn parse(&self, location: &Path) -> Result<Vec<PackageData>>;

    /// Turn one record of `resource` into packages and dependencies, and
    /// tag the files that belong to the package.
    fn assemble(
        &self,
        package_data: &PackageData,
        resource: ResourceId,
        codebase: &mut Codebase,
    ) -> Result<Vec<AssemblyItem>> {
        assemble_package(package_data, resource, codebase, PackageScope::Datafile)
    }

    fn info(&self) -> HandlerInfo {
        HandlerInfo {
            datasource_id: self.datasource_id().to_string(),
            package_type: self.package_type().to_string(),
            primary_language: self.primary_language().map(str::to_string),
            description: self.description().to_string(),
            path_patterns: self.path_patterns().iter().map(|p| p.to_string()).collect(),
        }
    }
}

/// Metadata about a handler, used for `list-handlers` output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandlerInfo {
    pub datasource_id: String,
    pub package_type: String,
    pub primary_language: Option<String>,
    pub description: String,
    pub path_patterns: Vec<String>,
}

/// All registered handlers, from the most to the least specific.
pub fn all_handlers() -> Vec<Box<dyn DatafileHandler>> {
    handlers_with_limits(&ScanConfig::default())
}

fn handlers_with_limits(config: &ScanConfig) -> Vec<Box<dyn DatafileHandler>> {
    vec![
        Box::new(about::AboutFileHandler),
        Box::new(cargo::CargoTomlHandler),
        Box::new(cargo::CargoLockHandler),
        Box::new(bower::BowerJsonHandler),
        Box::new(pypi::PkgInfoHandler),
        Box::new(pypi::SdistArchiveHandler::new(config.max_file_size)),
    ]
}

/// The handlers enabled for a scan.
pub struct HandlerRegistry {
    handlers: Vec<Box<dyn DatafileHandler>>,
}

impl HandlerRegistry {
    /// Create a registry with every built-in handler.
    pub fn new() -> Self {
        Self {
            handlers: all_handlers(),
        }
    }

    /// Create a registry restricted to the datasources allowed by `config`.
    pub fn for_config(config: &ScanConfig) -> Self {
        Self {
            handlers: handlers_with_limits(config)
                .into_iter()
                .filter(|h| config.allows(h.datasource_id()))
                .collect(),
        }
    }

    /// The first handler that recognizes `resource`.
    pub fn find_for(&self, resource: &Resource) -> Option<&dyn DatafileHandler> {
        self.handlers
            .iter()
            .find(|h| h.is_datafile(resource))
            .map(|h| h.as_ref())
    }

    /// The handler that produced records with this datasource id.
    pub fn by_datasource(&self, datasource_id: &str) -> Result<&dyn DatafileHandler> {
        self.handlers
            .iter()
            .find(|h| h.datasource_id() == datasource_id)
            .map(|h| h.as_ref())
            .ok_or_else(|| ScanError::UnknownDatasource(datasource_id.to_string()))
    }

    /// Handler metadata sorted by package type, then datasource id.
    pub fn list(&self) -> Vec<HandlerInfo> {
        let mut infos: Vec<HandlerInfo> = self.handlers.iter().map(|h| h.info()).collect();
        infos.sort_by(|a, b| {
            a.package_type
                .cmp(&b.package_type)
                .then_with(|| a.datasource_id.cmp(&b.datasource_id))
        });
        infos
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

pub fn matches_path_patterns(patterns: &[&str], path: &str) -> bool {
    let path = format!("/{}", path.trim_start_matches('/'));
    patterns.iter().any(|pattern| match glob::Pattern::new(pattern) {
        Ok(p) => p.matches(&path),
        Err(e) => {
            tracing::warn!(pattern, error = %e, "invalid handler path pattern");
            false
        }
    })
}

/// Which files a package created by assembly owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageScope {
    /// Only the datafile itself.
    Datafile,
    /// Everything under the datafile's directory.
    ParentTree,
}

/// Default assembly: create a package when the record has a purl, tag the
/// owned files, then yield the record's dependencies.
pub fn assemble_package(
    package_data: &PackageData,
    resource: ResourceId,
    codebase: &mut Codebase,
    scope: PackageScope,
) -> Result<Vec<AssemblyItem>> {
    let mut items = Vec::new();
    let datafile_path = codebase.get(resource).path.clone();
    let datasource_id = package_data
        .datasource_id
        .clone()
        .ok_or_else(|| ScanError::Internal(format!("package data without datasource in {datafile_path}")))?;

    let mut package_uid = None;
    if let Some(package) = Package::from_package_data(package_data, &datafile_path) {
        let uid = package.package_uid.clone();
        codebase.get_mut(resource).for_packages.push(uid.clone());

        if scope == PackageScope::ParentTree {
            tag_parent_tree(codebase, resource, &uid);
        }

        package_uid = Some(uid);
        items.push(AssemblyItem::Package(package));
    }

    items.extend(
        Dependency::from_dependent_packages(
            &package_data.dependencies,
            &datafile_path,
            &datasource_id,
            package_uid.as_deref(),
        )
        .into_iter()
        .map(AssemblyItem::Dependency),
    );
    items.push(AssemblyItem::Resource(resource));

    Ok(items)
}

/// Tag everything below the datafile's directory, the directory itself
/// excluded, as belonging to `package_uid`.
pub(crate) fn tag_parent_tree(codebase: &mut Codebase, datafile: ResourceId, package_uid: &str) {
    let Some(parent) = codebase.parent(datafile) else {
        return;
    };
    for id in codebase.walk_topdown(parent).into_iter().skip(1) {
        if id != datafile {
            codebase.get_mut(id).for_packages.push(package_uid.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn datasource_ids_are_unique_and_resolvable() {
        let registry = HandlerRegistry::new();
        let mut seen = HashSet::new();
        for info in registry.list() {
            assert!(seen.insert(info.datasource_id.clone()));
            let handler = registry.by_datasource(&info.datasource_id).unwrap();
            assert_eq!(handler.datasource_id(), info.datasource_id);
        }
    }

    #[test]
    fn unknown_datasource_is_an_error() {
        let registry = HandlerRegistry::new();
        assert!(matches!(
            registry.by_datasource("nope"),
            Err(ScanError::UnknownDatasource(_))
        ));
    }

    #[test]
    fn list_is_sorted_by_type_then_id() {
        let infos = HandlerRegistry::new().list();
        let keys: Vec<(String, String)> = infos
            .iter()
            .map(|i| (i.package_type.clone(), i.datasource_id.clone()))
            .collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
        assert_eq!(infos[0].datasource_id, "about_file");
    }

    #[test]
    fn path_patterns_match_anywhere_in_tree() {
        assert!(matches_path_patterns(&["*/Cargo.toml"], "project/Cargo.toml"));
        assert!(matches_path_patterns(&["*/Cargo.toml"], "project/crates/a/Cargo.toml"));
        assert!(!matches_path_patterns(&["*/Cargo.toml"], "project/Cargo.toml.orig"));
        assert!(matches_path_patterns(&["*.ABOUT"], "project/zlib.ABOUT"));
    }

    #[test]
    fn config_restricts_handlers() {
        let config = ScanConfig {
            datasources: Some(vec!["bower_json".into()]),
            ..Default::default()
        };
        let registry = HandlerRegistry::for_config(&config);
        assert_eq!(registry.list().len(), 1);
        assert!(registry.by_datasource("cargo_toml").is_err());
    }
}
