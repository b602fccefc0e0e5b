//! Rust crates: `Cargo.toml` manifests and `Cargo.lock` lockfiles.
//!
//! A manifest and the lockfile next to it are assembled together, so that
//! locked dependencies are attributed to the crate declared by the manifest.

use std::path::Path;

use toml::Value;

use super::{AssemblyItem, DatafileHandler};
use crate::codebase::{Codebase, ResourceId};
use crate::error::Result;
use crate::models::{purl, Dependency, DependentPackage, Package, PackageData, Party};
use crate::parser::{normalize_license, parse_person};

const CARGO_TOML: &str = "cargo_toml";
const CARGO_LOCK: &str = "cargo_lock";

pub struct CargoTomlHandler;

impl DatafileHandler for CargoTomlHandler {
    fn datasource_id(&self) -> &'static str {
        CARGO_TOML
    }

    fn package_type(&self) -> &'static str {
        "cargo"
    }

    fn primary_language(&self) -> Option<&'static str> {
        Some("Rust")
    }

    fn description(&self) -> &'static str {
        "Rust Cargo.toml package manifest"
    }

    fn path_patterns(&self) -> &'static [&'static str] {
        &["*/Cargo.toml"]
    }

    fn parse(&self, location: &Path) -> Result<Vec<PackageData>> {
        let content = std::fs::read_to_string(location)?;
        let manifest: Value = toml::from_str(&content)?;
        let package = manifest.get("package");

        let mut data = PackageData::new(self.datasource_id(), self.package_type());
        data.primary_language = self.primary_language().map(str::to_string);
        data.name = package.and_then(|p| str_field(p, "name"));
        data.version = package.and_then(|p| str_field(p, "version"));
        data.description = package.and_then(|p| str_field(p, "description"));

        if let Some(package) = package {
            data.parties = string_list(package, "authors")
                .iter()
                .map(|author| {
                    let (name, email) = parse_person(author);
                    Party::person("author", name, email)
                })
                .collect();

            if let Some(license) = str_field(package, "license") {
                data.license_expression = normalize_license(&license);
                data.declared_license = Some(license.into());
            }
            if let Some(license_file) = str_field(package, "license-file") {
                data.insert_extra("license_file", license_file);
            }
            if let Some(documentation) = str_field(package, "documentation") {
                data.insert_extra("documentation_url", documentation);
            }

            data.keywords = string_list(package, "keywords");
            data.keywords.extend(string_list(package, "categories"));
            data.homepage_url = str_field(package, "homepage");
            data.vcs_url = str_field(package, "repository");
        }

        // Dependencies can be declared in several top-level tables
        if let Some(tables) = manifest.as_table() {
            for (scope, deps) in tables {
                if scope.ends_with("dependencies") {
                    if let Some(deps) = deps.as_table() {
                        data.dependencies.extend(manifest_dependencies(deps, scope));
                    }
                }
            }
        }

        if let Some(name) = data.name.clone() {
            data.repository_homepage_url = Some(format!("https://crates.io/crates/{name}"));
            data.api_data_url = Some(format!("https://crates.io/api/v1/crates/{name}"));
            if let Some(version) = &data.version {
                data.repository_download_url = Some(format!(
                    "https://crates.io/api/v1/crates/{name}/{version}/download"
                ));
            }
        }

        Ok(vec![data.finish()])
    }

    fn assemble(
        &self,
        package_data: &PackageData,
        resource: ResourceId,
        codebase: &mut Codebase,
    ) -> Result<Vec<AssemblyItem>> {
        let lock = sibling_data(codebase, resource, "Cargo.lock", CARGO_LOCK);
        Ok(assemble_manifest_and_lock(
            codebase,
            Some((resource, package_data.clone())),
            lock,
        ))
    }
}

pub struct CargoLockHandler;

impl DatafileHandler for CargoLockHandler {
    fn datasource_id(&self) -> &'static str {
        CARGO_LOCK
    }

    fn package_type(&self) -> &'static str {
        "cargo"
    }

    fn primary_language(&self) -> Option<&'static str> {
        Some("Rust")
    }

    fn description(&self) -> &'static str {
        "Rust Cargo.lock dependencies lockfile"
    }

    fn path_patterns(&self) -> &'static [&'static str] {
        &["*/Cargo.lock"]
    }

    fn parse(&self, location: &Path) -> Result<Vec<PackageData>> {
        let content = std::fs::read_to_string(location)?;
        let lock: Value = toml::from_str(&content)?;

        let mut data = PackageData::new(self.datasource_id(), self.package_type());
        data.primary_language = self.primary_language().map(str::to_string);

        let packages = lock
            .get("package")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        for locked in packages {
            let Some(name) = str_field(locked, "name") else {
                continue;
            };
            let version = str_field(locked, "version");
            let Some(dep_purl) = purl::simple("cargo", &name, version.as_deref()) else {
                continue;
            };

            let mut dep = DependentPackage::new(dep_purl, "dependencies")
                .requirement(version)
                .resolved(true);
            if let Some(checksum) = str_field(locked, "checksum") {
                dep.extra_data.insert("checksum".into(), checksum.into());
            }
            data.dependencies.push(dep);
        }

        Ok(vec![data.finish()])
    }

    fn assemble(
        &self,
        package_data: &PackageData,
        resource: ResourceId,
        codebase: &mut Codebase,
    ) -> Result<Vec<AssemblyItem>> {
        let manifest = sibling_data(codebase, resource, "Cargo.toml", CARGO_TOML);
        Ok(assemble_manifest_and_lock(
            codebase,
            manifest,
            Some((resource, package_data.clone())),
        ))
    }
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn string_list(value: &Value, key: &str) -> Vec<String> {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn manifest_dependencies(deps: &toml::Table, scope: &str) -> Vec<DependentPackage> {
    let is_runtime = !(scope.ends_with("dev-dependencies") || scope.ends_with("build-dependencies"));

    deps.iter()
        .filter_map(|(name, requirement)| {
            let dep_purl = purl::simple("cargo", name, None)?;
            let (requirement, is_optional) = match requirement {
                Value::String(version) => (Some(version.clone()), false),
                Value::Table(table) => {
                    let is_optional = table
                        .get("optional")
                        .and_then(Value::as_bool)
                        .unwrap_or(false);
                    let details: toml::Table = table
                        .iter()
                        .filter(|(key, _)| key.as_str() != "optional")
                        .map(|(key, value)| (key.clone(), value.clone()))
                        .collect();
                    (table_requirement(&details), is_optional)
                }
                other => (Some(other.to_string()), false),
            };
            Some(
                DependentPackage::new(dep_purl, scope)
                    .requirement(requirement)
                    .runtime(is_runtime)
                    .optional(is_optional),
            )
        })
        .collect()
}

/// A detailed dependency is reduced to its version when that is all it
/// says, otherwise it is kept as a compact YAML dump.
fn table_requirement(table: &toml::Table) -> Option<String> {
    if table.is_empty() {
        return None;
    }
    if table.len() == 1 {
        if let Some(version) = table.get("version").and_then(Value::as_str) {
            return Some(version.to_string());
        }
    }
    match serde_yaml::to_string(table) {
        Ok(dump) => Some(dump.trim_end().to_string()),
        Err(e) => {
            tracing::debug!(error = %e, "cannot dump cargo dependency table");
            Some(Value::Table(table.clone()).to_string())
        }
    }
}

fn sibling_data(
    codebase: &Codebase,
    resource: ResourceId,
    name: &str,
    datasource_id: &str,
) -> Option<(ResourceId, PackageData)> {
    let sibling = codebase.sibling_named(resource, name)?;
    let data = codebase
        .get(sibling)
        .package_data
        .iter()
        .find(|d| d.datasource_id.as_deref() == Some(datasource_id))?
        .clone();
    Some((sibling, data))
}

/// Create the crate package from the manifest, owning the manifest's whole
/// directory, then yield manifest and lockfile dependencies.
fn assemble_manifest_and_lock(
    codebase: &mut Codebase,
    manifest: Option<(ResourceId, PackageData)>,
    lock: Option<(ResourceId, PackageData)>,
) -> Vec<AssemblyItem> {
    let mut items = Vec::new();
    let mut package_uid: Option<String> = None;

    if let Some((manifest_id, manifest_data)) = &manifest {
        let manifest_path = codebase.get(*manifest_id).path.clone();
        if let Some(package) = Package::from_package_data(manifest_data, &manifest_path) {
            let uid = package.package_uid.clone();
            codebase.get_mut(*manifest_id).for_packages.push(uid.clone());
            super::tag_parent_tree(codebase, *manifest_id, &uid);
            tracing::debug!(package_uid = %uid, path = %manifest_path, "assembled cargo package");
            package_uid = Some(uid);
            items.push(AssemblyItem::Package(package));
        }

        items.extend(
            Dependency::from_dependent_packages(
                &manifest_data.dependencies,
                &manifest_path,
                CARGO_TOML,
                package_uid.as_deref(),
            )
            .into_iter()
            .map(AssemblyItem::Dependency),
        );
        items.push(AssemblyItem::Resource(*manifest_id));
    }

    if let Some((lock_id, lock_data)) = &lock {
        let lock_path = codebase.get(*lock_id).path.clone();
        items.extend(
            Dependency::from_dependent_packages(
                &lock_data.dependencies,
                &lock_path,
                CARGO_LOCK,
                package_uid.as_deref(),
            )
            .into_iter()
            .map(AssemblyItem::Dependency),
        );
        items.push(AssemblyItem::Resource(*lock_id));
    }

    items
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_with(handler: &dyn DatafileHandler, file_name: &str, content: &str) -> PackageData {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(file_name);
        std::fs::write(&path, content).unwrap();
        handler.parse(&path).unwrap().remove(0)
    }

    const MANIFEST: &str = r#"
[package]
name = "rustup"
version = "1.17.0"
description = """
Manage multiple rust installations with ease
"""
authors = ["Diggory Blake <diggsey@googlemail.com>", "<anon@example.com>"]
license = "MIT OR Apache-2.0"
keywords = ["toolchain"]
categories = ["development-tools"]
repository = "https://github.com/rust-lang/rustup.rs"

[dependencies]
libc = "0.2"
serde = { version = "1.0", features = ["derive"] }
openssl = { version = "0.10", optional = true }

[dev-dependencies]
tempfile = { version = "3.0" }

[build-dependencies]
cc = "1"
"#;

    #[test]
    fn parses_package_table() {
        let data = parse_with(&CargoTomlHandler, "Cargo.toml", MANIFEST);
        assert_eq!(data.name.as_deref(), Some("rustup"));
        assert_eq!(
            data.description.as_deref(),
            Some("Manage multiple rust installations with ease")
        );
        assert_eq!(data.parties[0].name.as_deref(), Some("Diggory Blake"));
        assert_eq!(data.parties[0].email.as_deref(), Some("diggsey@googlemail.com"));
        assert_eq!(data.parties[1].name, None);
        assert_eq!(data.license_expression.as_deref(), Some("mit OR apache-2.0"));
        assert_eq!(data.keywords, vec!["toolchain", "development-tools"]);
        assert_eq!(data.vcs_url.as_deref(), Some("https://github.com/rust-lang/rustup.rs"));
        assert_eq!(
            data.repository_download_url.as_deref(),
            Some("https://crates.io/api/v1/crates/rustup/1.17.0/download")
        );
        assert_eq!(data.purl.as_deref(), Some("pkg:cargo/rustup@1.17.0"));
    }

    #[test]
    fn parses_dependency_tables() {
        let data = parse_with(&CargoTomlHandler, "Cargo.toml", MANIFEST);
        let by_name = |name: &str| {
            data.dependencies
                .iter()
                .find(|d| d.purl == format!("pkg:cargo/{name}"))
                .unwrap()
                .clone()
        };

        assert_eq!(data.dependencies.len(), 5);
        assert_eq!(by_name("libc").extracted_requirement.as_deref(), Some("0.2"));

        let openssl = by_name("openssl");
        assert!(openssl.is_optional);
        assert_eq!(openssl.extracted_requirement.as_deref(), Some("0.10"));

        let serde = by_name("serde");
        let requirement = serde.extracted_requirement.unwrap();
        assert!(requirement.contains("derive"));
        assert!(requirement.contains("version"));

        let tempfile = by_name("tempfile");
        assert_eq!(tempfile.scope.as_deref(), Some("dev-dependencies"));
        assert!(!tempfile.is_runtime);
        assert!(!by_name("cc").is_runtime);
        assert!(by_name("libc").is_runtime);
        assert!(data.dependencies.iter().all(|d| !d.is_resolved));
    }

    #[test]
    fn dependencies_keep_declaration_order() {
        let data = parse_with(
            &CargoTomlHandler,
            "Cargo.toml",
            "[package]\nname = \"demo\"\n\n[dependencies]\nzeta = \"1\"\nalpha = { version = \"2\", optional = true, features = [\"x\"] }\n\n[dev-dependencies]\nmid = \"3\"\n",
        );
        let purls: Vec<&str> = data.dependencies.iter().map(|d| d.purl.as_str()).collect();
        assert_eq!(purls, vec!["pkg:cargo/zeta", "pkg:cargo/alpha", "pkg:cargo/mid"]);

        let alpha = &data.dependencies[1];
        assert!(alpha.is_optional);
        let requirement = alpha.extracted_requirement.as_deref().unwrap();
        assert!(requirement.starts_with("version:"));
        assert!(requirement.contains("features:"));
        assert!(!requirement.contains("optional"));
    }

    #[test]
    fn workspace_manifest_has_no_purl() {
        let data = parse_with(
            &CargoTomlHandler,
            "Cargo.toml",
            "[workspace]\nmembers = [\"a\"]\n",
        );
        assert!(data.purl.is_none());
        assert!(data.repository_homepage_url.is_none());
    }

    #[test]
    fn parses_lockfile_packages() {
        let data = parse_with(
            &CargoLockHandler,
            "Cargo.lock",
            r#"
version = 3

[[package]]
name = "ansi_term"
version = "0.11.0"
source = "registry+https://github.com/rust-lang/crates.io-index"
checksum = "ee49baf6cb617b853aa8d93bf420db2383fab46d314482ca2803b40d5fde979b"
dependencies = ["winapi"]

[[package]]
name = "winapi"
version = "0.3.9"
"#,
        );
        assert!(data.purl.is_none());
        assert_eq!(data.dependencies.len(), 2);
        let first = &data.dependencies[0];
        assert_eq!(first.purl, "pkg:cargo/ansi_term@0.11.0");
        assert_eq!(first.extracted_requirement.as_deref(), Some("0.11.0"));
        assert!(first.is_resolved);
        assert!(first.is_runtime);
        assert_eq!(
            first.extra_data.get("checksum").and_then(|v| v.as_str()),
            Some("ee49baf6cb617b853aa8d93bf420db2383fab46d314482ca2803b40d5fde979b")
        );
    }
}
