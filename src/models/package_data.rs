use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::dependency::DependentPackage;
use super::party::Party;
use super::purl::{self, PurlParts};

/// Package metadata as found in a single datafile (manifest, lockfile,
/// metadata file or archive).
///
/// Field order is the serialization order of the JSON output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackageData {
    #[serde(rename = "type")]
    pub package_type: Option<String>,
    pub namespace: Option<String>,
    pub name: Option<String>,
    pub version: Option<String>,
    pub qualifiers: BTreeMap<String, String>,
    pub subpath: Option<String>,
    pub primary_language: Option<String>,
    pub description: Option<String>,
    pub release_date: Option<String>,
    pub parties: Vec<Party>,
    pub keywords: Vec<String>,
    pub homepage_url: Option<String>,
    pub download_url: Option<String>,
    pub size: Option<u64>,
    pub sha1: Option<String>,
    pub md5: Option<String>,
    pub sha256: Option<String>,
    pub sha512: Option<String>,
    pub bug_tracking_url: Option<String>,
    pub code_view_url: Option<String>,
    pub vcs_url: Option<String>,
    pub copyright: Option<String>,
    pub license_expression: Option<String>,
    /// License data exactly as declared: a string, list or mapping.
    pub declared_license: Option<Value>,
    pub notice_text: Option<String>,
    pub source_packages: Vec<String>,
    pub file_references: Vec<Value>,
    pub extra_data: Map<String, Value>,
    pub dependencies: Vec<DependentPackage>,
    pub repository_homepage_url: Option<String>,
    pub repository_download_url: Option<String>,
    pub api_data_url: Option<String>,
    pub datasource_id: Option<String>,
    pub purl: Option<String>,
}

impl PackageData {
    pub fn new(datasource_id: &str, package_type: &str) -> Self {
        Self {
            datasource_id: Some(datasource_id.to_string()),
            package_type: Some(package_type.to_string()),
            ..Default::default()
        }
    }

    /// The purl computed from the identifying fields.
    pub fn compute_purl(&self) -> Option<String> {
        purl::build(PurlParts {
            package_type: self.package_type.as_deref(),
            namespace: self.namespace.as_deref(),
            name: self.name.as_deref(),
            version: self.version.as_deref(),
            qualifiers: Some(&self.qualifiers),
            subpath: self.subpath.as_deref(),
        })
    }

    /// Recompute `purl` after the identifying fields changed. Every handler
    /// calls this last.
    pub fn finish(mut self) -> Self {
        self.purl = self.compute_purl();
        self
    }

    pub fn insert_extra(&mut self, key: &str, value: impl Into<Value>) {
        self.extra_data.insert(key.to_string(), value.into());
    }

    pub fn extra_str(&self, key: &str) -> Option<&str> {
        self.extra_data.get(key).and_then(Value::as_str)
    }

    /// Party names with the given role, in declaration order.
    pub fn party_names(&self, role: &str) -> impl Iterator<Item = &str> {
        let role = role.to_string();
        self.parties
            .iter()
            .filter(move |p| p.has_role(&role))
            .filter_map(|p| p.name.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_absent_values_like_golden_files() {
        let data = PackageData::new("cargo_toml", "cargo");
        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json["type"], "cargo");
        assert_eq!(json["name"], Value::Null);
        assert_eq!(json["qualifiers"], serde_json::json!({}));
        assert_eq!(json["parties"], serde_json::json!([]));
        assert_eq!(json["extra_data"], serde_json::json!({}));
        assert_eq!(json["purl"], Value::Null);
    }

    #[test]
    fn keys_keep_record_order() {
        let data = PackageData::new("about_file", "about");
        let text = serde_json::to_string(&data).unwrap();
        let type_pos = text.find("\"type\"").unwrap();
        let name_pos = text.find("\"name\"").unwrap();
        let purl_pos = text.find("\"purl\"").unwrap();
        assert!(type_pos < name_pos && name_pos < purl_pos);
    }

    #[test]
    fn finish_sets_purl_from_identity() {
        let mut data = PackageData::new("pypi_sdist_pkginfo", "pypi");
        data.name = Some("requests".into());
        data.version = Some("2.31.0".into());
        let data = data.finish();
        assert_eq!(data.purl.as_deref(), Some("pkg:pypi/requests@2.31.0"));
    }

    #[test]
    fn deserializes_partial_records() {
        let data: PackageData =
            serde_json::from_str(r#"{"type": "bower", "name": "x", "extra": 1}"#).unwrap();
        assert_eq!(data.name.as_deref(), Some("x"));
        assert!(data.dependencies.is_empty());
    }
}
