//! Python source distributions: `PKG-INFO` files and `.tar.gz` sdists.

use std::io::Read;
use std::path::Path;

use flate2::read::GzDecoder;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use super::{AssemblyItem, DatafileHandler, PackageScope};
use crate::codebase::{Codebase, ResourceId};
use crate::error::{Result, ScanError};
use crate::models::{purl, DependentPackage, PackageData, Party};
use crate::parser::checksum::Checksums;
use crate::parser::license::{combine_expressions, normalize_license};
use crate::parser::rfc822::{self, Rfc822Metadata};

const PACKAGE_TYPE: &str = "pypi";
const UNKNOWN_VALUE: &str = "UNKNOWN";

static REQUIREMENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?P<name>[A-Za-z0-9][A-Za-z0-9._-]*)\s*(?P<extras>\[[^\]]*\])?\s*(?P<spec>.*?)\s*$")
        .unwrap()
});

static EXTRA_MARKER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bextra\s*==").unwrap());

pub struct PkgInfoHandler;

impl DatafileHandler for PkgInfoHandler {
    fn datasource_id(&self) -> &'static str {
        "pypi_sdist_pkginfo"
    }

    fn package_type(&self) -> &'static str {
        PACKAGE_TYPE
    }

    fn primary_language(&self) -> Option<&'static str> {
        Some("Python")
    }

    fn description(&self) -> &'static str {
        "PyPI extracted sdist PKG-INFO"
    }

    fn path_patterns(&self) -> &'static [&'static str] {
        &["*/PKG-INFO"]
    }

    fn parse(&self, location: &Path) -> Result<Vec<PackageData>> {
        let content = decode(&std::fs::read(location)?);
        let metadata = rfc822::parse(&content);
        Ok(vec![package_data_from_pkginfo(&metadata, self.datasource_id())])
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

/// A gzipped source distribution with a `<name>-<version>/PKG-INFO` member.
pub struct SdistArchiveHandler {
    /// Archive members larger than this are not read.
    pub max_member_size: u64,
}

impl SdistArchiveHandler {
    pub fn new(max_member_size: u64) -> Self {
        Self { max_member_size }
    }

    fn read_pkginfo(&self, location: &Path) -> Result<Option<String>> {
        let file = std::fs::File::open(location)?;
        let mut archive = tar::Archive::new(GzDecoder::new(file));

        for entry in archive.entries()? {
            let mut entry = entry?;
            let is_pkginfo = {
                let path = entry.path()?;
                let components: Vec<_> = path.components().collect();
                components.len() == 2
                    && components[1].as_os_str() == "PKG-INFO"
            };
            if !is_pkginfo {
                continue;
            }

            let size = entry.header().size()?;
            if size > self.max_member_size {
                tracing::warn!(
                    archive = %location.display(),
                    size,
                    "PKG-INFO member is too large, skipping"
                );
                return Ok(None);
            }

            let mut content = Vec::new();
            entry
                .read_to_end(&mut content)
                .map_err(|e| ScanError::parse(location.display(), format!("bad PKG-INFO: {e}")))?;
            return Ok(Some(decode(&content)));
        }

        Ok(None)
    }
}

impl Default for SdistArchiveHandler {
    fn default() -> Self {
        Self::new(crate::config::ScanConfig::default().max_file_size)
    }
}

impl DatafileHandler for SdistArchiveHandler {
    fn datasource_id(&self) -> &'static str {
        "pypi_sdist"
    }

    fn package_type(&self) -> &'static str {
        PACKAGE_TYPE
    }

    fn primary_language(&self) -> Option<&'static str> {
        Some("Python")
    }

    fn description(&self) -> &'static str {
        "Python source distribution"
    }

    fn path_patterns(&self) -> &'static [&'static str] {
        &["*.tar.gz"]
    }

    fn parse(&self, location: &Path) -> Result<Vec<PackageData>> {
        let Some(content) = self.read_pkginfo(location)? else {
            tracing::debug!(archive = %location.display(), "no PKG-INFO in archive");
            return Ok(Vec::new());
        };

        let metadata = rfc822::parse(&content);
        let mut data = package_data_from_pkginfo(&metadata, self.datasource_id());
        Checksums::of_file(location)?.apply_to(&mut data);
        Ok(vec![data])
    }
}

/// Older sdists often carry Latin-1 names; undecodable bytes are replaced
/// rather than failing the whole record.
fn decode(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Header value, with `UNKNOWN` placeholders treated as absent.
fn header<'a>(metadata: &'a Rfc822Metadata, name: &str) -> Option<&'a str> {
    metadata
        .first(name)
        .map(str::trim)
        .filter(|v| !v.is_empty() && *v != UNKNOWN_VALUE)
}

fn headers<'a>(metadata: &'a Rfc822Metadata, name: &str) -> impl Iterator<Item = &'a str> {
    metadata
        .all(name)
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty() && *v != UNKNOWN_VALUE)
}

/// Build a record from the headers of a PKG-INFO document.
pub fn package_data_from_pkginfo(metadata: &Rfc822Metadata, datasource_id: &str) -> PackageData {
    let mut data = PackageData::new(datasource_id, PACKAGE_TYPE);
    data.primary_language = Some("Python".into());
    data.name = header(metadata, "Name").map(str::to_string);
    data.version = header(metadata, "Version").map(str::to_string);

    let long_description = if metadata.body.trim().is_empty() {
        header(metadata, "Description").unwrap_or_default()
    } else {
        metadata.body.trim()
    };
    data.description = join_description(header(metadata, "Summary"), long_description);

    data.homepage_url = header(metadata, "Home-page").map(str::to_string);
    data.download_url = header(metadata, "Download-URL").map(str::to_string);

    for (role, name_header, email_header) in [
        ("author", "Author", "Author-email"),
        ("maintainer", "Maintainer", "Maintainer-email"),
    ] {
        let name = header(metadata, name_header).map(str::to_string);
        let email = header(metadata, email_header).map(str::to_string);
        if name.is_some() || email.is_some() {
            data.parties.push(Party::person(role, name, email));
        }
    }

    if let Some(keywords) = header(metadata, "Keywords") {
        data.keywords = split_keywords(keywords);
    }
    let (license_classifiers, other_classifiers): (Vec<&str>, Vec<&str>) =
        headers(metadata, "Classifier").partition(|c| c.starts_with("License ::"));
    data.keywords
        .extend(other_classifiers.iter().map(|c| c.to_string()));

    let license = header(metadata, "License");
    let mut declared = Map::new();
    if let Some(license) = license {
        declared.insert("license".into(), license.into());
    }
    if !license_classifiers.is_empty() {
        declared.insert("classifiers".into(), Value::from(license_classifiers.clone()));
    }
    if !declared.is_empty() {
        data.declared_license = Some(Value::Object(declared));
    }
    data.license_expression = match license.and_then(normalize_license) {
        Some(expression) => Some(expression),
        None => {
            let from_classifiers: Vec<String> = license_classifiers
                .iter()
                .filter_map(|c| classifier_license(c))
                .collect();
            combine_expressions(&from_classifiers)
        }
    };

    apply_project_urls(&mut data, metadata);

    if let Some(requires_python) = header(metadata, "Requires-Python") {
        data.insert_extra("requires_python", requires_python);
    }
    if let Some(platform) = header(metadata, "Platform") {
        data.insert_extra("platform", platform);
    }

    data.dependencies = headers(metadata, "Requires-Dist")
        .filter_map(requirement_dependency)
        .collect();

    if let Some(name) = data.name.clone() {
        data.repository_homepage_url = Some(format!("https://pypi.org/project/{name}"));
        match &data.version {
            Some(version) => {
                let initial: String = name.chars().take(1).collect();
                data.repository_download_url = Some(format!(
                    "https://pypi.org/packages/source/{initial}/{name}/{name}-{version}.tar.gz"
                ));
                data.api_data_url = Some(format!("https://pypi.org/pypi/{name}/{version}/json"));
            }
            None => data.api_data_url = Some(format!("https://pypi.org/pypi/{name}/json")),
        }
    }

    data.finish()
}

fn join_description(summary: Option<&str>, body: &str) -> Option<String> {
    let parts: Vec<&str> = summary
        .into_iter()
        .chain(std::iter::once(body))
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("\n"))
    }
}

fn split_keywords(keywords: &str) -> Vec<String> {
    let parts: Vec<&str> = if keywords.contains(',') {
        keywords.split(',').collect()
    } else {
        keywords.split_whitespace().collect()
    };
    parts
        .into_iter()
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}

/// `License :: OSI Approved :: MIT License` -> `mit`
fn classifier_license(classifier: &str) -> Option<String> {
    let last = classifier.rsplit("::").next()?.trim();
    normalize_license(last)
}

fn apply_project_urls(data: &mut PackageData, metadata: &Rfc822Metadata) {
    let mut project_urls = Map::new();

    for entry in headers(metadata, "Project-URL") {
        let Some((label, url)) = entry.split_once(',') else {
            continue;
        };
        let (label, url) = (label.trim(), url.trim());
        if label.is_empty() || url.is_empty() {
            continue;
        }
        project_urls.insert(label.to_string(), url.into());
        // Only absolute URLs fill the record's URL fields
        if let Err(e) = url::Url::parse(url) {
            tracing::debug!(label, url, error = %e, "project URL is not absolute");
            continue;
        }

        let slot = match label.to_lowercase().as_str() {
            "tracker" | "bug reports" | "bug tracker" | "issues" | "issue tracker"
            | "github: issues" => &mut data.bug_tracking_url,
            "source" | "source code" | "code" => &mut data.code_view_url,
            "github" | "gitlab" | "github: repo" | "repository" => &mut data.vcs_url,
            "website" | "homepage" | "home" => &mut data.homepage_url,
            _ => continue,
        };
        if slot.is_none() {
            *slot = Some(url.to_string());
        }
    }

    if !project_urls.is_empty() {
        data.insert_extra("project_urls", Value::Object(project_urls));
    }
}

/// A `Requires-Dist` value such as `requests (>=2.0) ; extra == "socks"`.
fn requirement_dependency(requirement: &str) -> Option<DependentPackage> {
    let (spec, marker) = match requirement.split_once(';') {
        Some((spec, marker)) => (spec, Some(marker.trim())),
        None => (requirement, None),
    };
    let captures = REQUIREMENT_RE.captures(spec)?;
    let name = captures.name("name")?.as_str();
    let specifier = captures
        .name("spec")
        .map(|m| m.as_str().trim_start_matches('(').trim_end_matches(')').trim())
        .filter(|s| !s.is_empty());

    let pinned = specifier
        .and_then(|s| s.strip_prefix("=="))
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.contains([',', '*']));
    let dep_purl = purl::simple(PACKAGE_TYPE, name, pinned)?;
    let is_optional = marker.is_some_and(|m| EXTRA_MARKER_RE.is_match(m));

    let mut dep = DependentPackage::new(dep_purl, "install")
        .requirement(specifier.map(str::to_string))
        .optional(is_optional)
        .resolved(pinned.is_some());
    if let Some(marker) = marker.filter(|m| !m.is_empty()) {
        dep.extra_data.insert("marker".into(), marker.into());
    }
    Some(dep)
}
