use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::package_data::PackageData;
use super::party::Party;
use super::purl;

/// A top-level package assembled from one or more datafiles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Package {
    #[serde(rename = "type")]
    pub package_type: Option<String>,
    pub namespace: Option<String>,
    pub name: Option<String>,
    pub version: Option<String>,
    #[serde(default)]
    pub qualifiers: BTreeMap<String, String>,
    pub subpath: Option<String>,
    pub primary_language: Option<String>,
    pub description: Option<String>,
    pub release_date: Option<String>,
    #[serde(default)]
    pub parties: Vec<Party>,
    #[serde(default)]
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
    pub declared_license: Option<Value>,
    pub notice_text: Option<String>,
    #[serde(default)]
    pub source_packages: Vec<String>,
    #[serde(default)]
    pub file_references: Vec<Value>,
    #[serde(default)]
    pub extra_data: Map<String, Value>,
    pub repository_homepage_url: Option<String>,
    pub repository_download_url: Option<String>,
    pub api_data_url: Option<String>,
    pub package_uid: String,
    #[serde(default)]
    pub datafile_paths: Vec<String>,
    #[serde(default)]
    pub datasource_ids: Vec<String>,
    pub purl: Option<String>,
}

impl Package {
    /// Create a package from a datafile's data. Returns `None` when the data
    /// has no purl, as there is no identity to build a uid from.
    pub fn from_package_data(data: &PackageData, datafile_path: &str) -> Option<Self> {
        let package_purl = data.purl.clone().or_else(|| data.compute_purl())?;
        let package_uid = purl::with_uuid(&package_purl);

        Some(Self {
            package_type: data.package_type.clone(),
            namespace: data.namespace.clone(),
            name: data.name.clone(),
            version: data.version.clone(),
            qualifiers: data.qualifiers.clone(),
            subpath: data.subpath.clone(),
            primary_language: data.primary_language.clone(),
            description: data.description.clone(),
            release_date: data.release_date.clone(),
            parties: data.parties.clone(),
            keywords: data.keywords.clone(),
            homepage_url: data.homepage_url.clone(),
            download_url: data.download_url.clone(),
            size: data.size,
            sha1: data.sha1.clone(),
            md5: data.md5.clone(),
            sha256: data.sha256.clone(),
            sha512: data.sha512.clone(),
            bug_tracking_url: data.bug_tracking_url.clone(),
            code_view_url: data.code_view_url.clone(),
            vcs_url: data.vcs_url.clone(),
            copyright: data.copyright.clone(),
            license_expression: data.license_expression.clone(),
            declared_license: data.declared_license.clone(),
            notice_text: data.notice_text.clone(),
            source_packages: data.source_packages.clone(),
            file_references: data.file_references.clone(),
            extra_data: data.extra_data.clone(),
            repository_homepage_url: data.repository_homepage_url.clone(),
            repository_download_url: data.repository_download_url.clone(),
            api_data_url: data.api_data_url.clone(),
            package_uid,
            datafile_paths: vec![datafile_path.to_string()],
            datasource_ids: data.datasource_id.iter().cloned().collect(),
            purl: Some(package_purl),
        })
    }
}
