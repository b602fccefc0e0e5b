use std::path::Path;

use serde_yaml::Value;

use super::{AssemblyItem, DatafileHandler, PackageScope};
use crate::codebase::{Codebase, ResourceId};
use crate::error::{Result, ScanError};
use crate::models::{PackageData, Party};

/// AboutCode `.ABOUT` files: YAML documents describing a third-party
/// component that sits next to them.
pub struct AboutFileHandler;

impl DatafileHandler for AboutFileHandler {
    fn datasource_id(&self) -> &'static str {
        "about_file"
    }

    fn package_type(&self) -> &'static str {
        "about"
    }

    fn description(&self) -> &'static str {
        "AboutCode ABOUT file"
    }

    fn path_patterns(&self) -> &'static [&'static str] {
        &["*.ABOUT"]
    }

    fn parse(&self, location: &Path) -> Result<Vec<PackageData>> {
        let content = std::fs::read_to_string(location)?;
        let doc: Value = serde_yaml::from_str(&content)?;
        if !doc.is_mapping() {
            return Err(ScanError::parse(
                location.display(),
                "ABOUT file is not a YAML mapping",
            ));
        }

        let mut data = PackageData::new(self.datasource_id(), self.package_type());
        data.name = text(&doc, "name");
        data.version = text(&doc, "version");
        data.homepage_url = text(&doc, "home_url").or_else(|| text(&doc, "homepage_url"));
        data.download_url = text(&doc, "download_url");
        data.license_expression = text(&doc, "license_expression");
        data.declared_license = data.license_expression.clone().map(Into::into);
        data.copyright = text(&doc, "copyright");

        if let Some(owner) = doc.get("owner").filter(|v| !v.is_null()) {
            let owner = scalar_text(owner).unwrap_or_else(|| compact(owner));
            data.parties.push(Party::person("owner", Some(owner), None));
        }

        if let Some(about_resource) = text(&doc, "about_resource") {
            data.insert_extra("about_resource", about_resource);
        }

        Ok(vec![data.finish()])
    }

    fn assemble(
        &self,
        package_data: &PackageData,
        resource: ResourceId,
        codebase: &mut Codebase,
    ) -> Result<Vec<AssemblyItem>> {
        let items = super::assemble_package(package_data, resource, codebase, PackageScope::Datafile)?;

        // The described file is a sibling of the ABOUT file
        let package_uid = items.iter().find_map(|item| match item {
            AssemblyItem::Package(p) => Some(p.package_uid.clone()),
            _ => None,
        });
        if let (Some(uid), Some(about_resource)) =
            (package_uid, package_data.extra_str("about_resource"))
        {
            if let Some(described) = codebase.sibling_named(resource, about_resource) {
                codebase.get_mut(described).for_packages.push(uid);
            }
        }

        Ok(items)
    }
}

/// Scalar YAML values as text; YAML may type `version: 1.0` as a number.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn text(doc: &Value, key: &str) -> Option<String> {
    doc.get(key).and_then(scalar_text)
}

fn compact(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("{:?}", value))
}
