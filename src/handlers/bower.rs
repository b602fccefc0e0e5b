use std::path::Path;

use serde_json::Value;

use super::{AssemblyItem, DatafileHandler, PackageScope};
use crate::codebase::{Codebase, ResourceId};
use crate::error::{Result, ScanError};
use crate::models::{purl, DependentPackage, PackageData, Party};
use crate::parser::license::{self, UNKNOWN};

/// Bower `bower.json` manifests.
pub struct BowerJsonHandler;

impl DatafileHandler for BowerJsonHandler {
    fn datasource_id(&self) -> &'static str {
        "bower_json"
    }

    fn package_type(&self) -> &'static str {
        "bower"
    }

    fn description(&self) -> &'static str {
        "Bower package"
    }

    fn path_patterns(&self) -> &'static [&'static str] {
        &["*/bower.json", "*/.bower.json"]
    }

    fn parse(&self, location: &Path) -> Result<Vec<PackageData>> {
        let content = std::fs::read_to_string(location)?;
        let manifest: Value = serde_json::from_str(&content)?;
        if !manifest.is_object() {
            return Err(ScanError::parse(
                location.display(),
                "bower.json is not a JSON object",
            ));
        }

        let mut data = PackageData::new(self.datasource_id(), self.package_type());
        // Private packages may have no name
        data.name = str_field(&manifest, "name");
        data.description = str_field(&manifest, "description");
        data.version = str_field(&manifest, "version");

        let declared = declared_licenses(manifest.get("license"));
        data.license_expression = normalized_license(&declared);
        if !declared.is_empty() {
            data.declared_license = Some(Value::from(declared));
        }

        if let Some(keywords) = manifest.get("keywords").and_then(Value::as_array) {
            data.keywords = keywords
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect();
        }

        if let Some(authors) = manifest.get("authors").and_then(Value::as_array) {
            data.parties = authors.iter().map(author_party).collect();
        }

        data.homepage_url = str_field(&manifest, "homepage");

        if let Some(repository) = manifest.get("repository") {
            let repo_type = str_field(repository, "type");
            let repo_url = str_field(repository, "url");
            if let (Some(repo_type), Some(repo_url)) = (repo_type, repo_url) {
                data.vcs_url = Some(format!("{repo_type}+{repo_url}"));
            }
        }

        data.dependencies = dependencies(&manifest, "dependencies", true)
            .chain(dependencies(&manifest, "devDependencies", false))
            .collect();

        Ok(vec![data.finish()])
    }

    fn assemble(
        &self,
        package_data: &PackageData,
        resource: ResourceId,
        codebase: &mut Codebase,
    ) -> Result<Vec<AssemblyItem>> {
        super::assemble_package(package_data, resource, codebase, PackageScope::ParentTree)
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

/// The `license` field as a list of declared license strings.
fn declared_licenses(license: Option<&Value>) -> Vec<String> {
    match license {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::String(s)) if s.trim().is_empty() => Vec::new(),
        Some(Value::String(s)) => vec![s.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .filter(|l| !l.trim().is_empty())
            .map(str::to_string)
            .collect(),
        Some(other) => vec![other.to_string()],
    }
}

/// Normalize each declared license, using `unknown` for unrecognized ones,
/// then combine them.
fn normalized_license(declared: &[String]) -> Option<String> {
    let detected: Vec<String> = declared
        .iter()
        .map(|d| license::normalize_license(d).unwrap_or_else(|| UNKNOWN.to_string()))
        .collect();
    license::combine_expressions(&detected)
}

fn author_party(author: &Value) -> Party {
    match author {
        Value::Object(_) => {
            let mut party = Party::untyped("author", str_field(author, "name"));
            party.email = str_field(author, "email");
            party.url = str_field(author, "homepage");
            party
        }
        Value::String(name) => Party::untyped("author", Some(name.clone())),
        other => Party::untyped("author", Some(other.to_string())),
    }
}

fn dependencies<'a>(
    manifest: &'a Value,
    scope: &'static str,
    is_runtime: bool,
) -> impl Iterator<Item = DependentPackage> + 'a {
    manifest
        .get(scope)
        .and_then(Value::as_object)
        .into_iter()
        .flatten()
        .filter_map(move |(name, requirement)| {
            let dep_purl = purl::simple("bower", name, None)?;
            let requirement = match requirement {
                Value::String(s) => Some(s.clone()),
                Value::Null => None,
                other => Some(other.to_string()),
            };
            Some(
                DependentPackage::new(dep_purl, scope)
                    .requirement(requirement)
                    .runtime(is_runtime)
                    .optional(!is_runtime),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_str(content: &str) -> PackageData {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bower.json");
        std::fs::write(&path, content).unwrap();
        BowerJsonHandler.parse(&path).unwrap().remove(0)
    }

    #[test]
    fn parses_bower_manifest() {
        let data = parse_str(
            r#"{
  "name": "blue-leaf",
  "description": "Physics-like animations for pretty particles",
  "version": "1.0.0",
  "license": "MIT",
  "keywords": ["motion", "physics"],
  "authors": [
    "Betty Beta <bbeta@example.com>",
    {"name": "John Doe", "email": "john@doe.com", "homepage": "http://johndoe.com"}
  ],
  "homepage": "https://example.com/blue-leaf",
  "repository": {"type": "git", "url": "git://github.com/example/blue-leaf.git"},
  "dependencies": {"get-size": "~1.2.2", "eventEmitter": "~4.2.11"},
  "devDependencies": {"qunit": "~1.16.0"}
}"#,
        );
        assert_eq!(data.name.as_deref(), Some("blue-leaf"));
        assert_eq!(data.license_expression.as_deref(), Some("mit"));
        assert_eq!(data.declared_license, Some(serde_json::json!(["MIT"])));
        assert_eq!(data.keywords, vec!["motion", "physics"]);
        assert_eq!(data.parties.len(), 2);
        assert_eq!(data.parties[1].name.as_deref(), Some("John Doe"));
        assert_eq!(data.parties[1].url.as_deref(), Some("http://johndoe.com"));
        assert_eq!(
            data.vcs_url.as_deref(),
            Some("git+git://github.com/example/blue-leaf.git")
        );
        assert_eq!(data.purl.as_deref(), Some("pkg:bower/blue-leaf@1.0.0"));

        assert_eq!(data.dependencies.len(), 3);
        let dev = data
            .dependencies
            .iter()
            .find(|d| d.scope.as_deref() == Some("devDependencies"))
            .unwrap();
        assert_eq!(dev.purl, "pkg:bower/qunit");
        assert!(!dev.is_runtime);
        assert!(dev.is_optional);
    }

    #[test]
    fn dependencies_keep_declaration_order() {
        let data = parse_str(
            r#"{"name": "x", "dependencies": {"zeta": "1", "alpha": "2"}, "devDependencies": {"beta": "3"}}"#,
        );
        let purls: Vec<&str> = data.dependencies.iter().map(|d| d.purl.as_str()).collect();
        assert_eq!(purls, vec!["pkg:bower/zeta", "pkg:bower/alpha", "pkg:bower/beta"]);
    }

    #[test]
    fn license_lists_combine_with_unknowns() {
        let data = parse_str(r#"{"name": "x", "license": ["MIT", " ", "Weird-License"]}"#);
        assert_eq!(
            data.declared_license,
            Some(serde_json::json!(["MIT", "Weird-License"]))
        );
        assert_eq!(data.license_expression.as_deref(), Some("mit AND unknown"));
    }

    #[test]
    fn nameless_package_has_no_purl() {
        let data = parse_str(r#"{"version": "1.0.0"}"#);
        assert!(data.name.is_none());
        assert!(data.purl.is_none());
    }
}
