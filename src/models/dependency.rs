use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::purl;

/// A dependency as declared inside one datafile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DependentPackage {
    pub purl: String,
    pub extracted_requirement: Option<String>,
    pub scope: Option<String>,
    pub is_runtime: bool,
    pub is_optional: bool,
    pub is_resolved: bool,
    pub resolved_package: Map<String, Value>,
    pub extra_data: Map<String, Value>,
}

impl DependentPackage {
    pub fn new(purl: String, scope: &str) -> Self {
        Self {
            purl,
            scope: Some(scope.to_string()),
            is_runtime: true,
            ..Default::default()
        }
    }

    pub fn requirement(mut self, requirement: Option<String>) -> Self {
        self.extracted_requirement = requirement;
        self
    }

    pub fn runtime(mut self, is_runtime: bool) -> Self {
        self.is_runtime = is_runtime;
        self
    }

    pub fn optional(mut self, is_optional: bool) -> Self {
        self.is_optional = is_optional;
        self
    }

    pub fn resolved(mut self, is_resolved: bool) -> Self {
        self.is_resolved = is_resolved;
        self
    }
}

/// A top-level dependency, tied to the datafile it came from and to the
/// package that declares it (when there is one).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dependency {
    pub purl: String,
    pub extracted_requirement: Option<String>,
    pub scope: Option<String>,
    pub is_runtime: bool,
    pub is_optional: bool,
    pub is_resolved: bool,
    #[serde(default)]
    pub resolved_package: Map<String, Value>,
    pub dependency_uid: String,
    pub for_package_uid: Option<String>,
    pub datafile_path: String,
    pub datasource_id: String,
    #[serde(default)]
    pub extra_data: Map<String, Value>,
}

impl Dependency {
    pub fn from_dependent_package(
        dependent: &DependentPackage,
        datafile_path: &str,
        datasource_id: &str,
        package_uid: Option<&str>,
    ) -> Self {
        Self {
            purl: dependent.purl.clone(),
            extracted_requirement: dependent.extracted_requirement.clone(),
            scope: dependent.scope.clone(),
            is_runtime: dependent.is_runtime,
            is_optional: dependent.is_optional,
            is_resolved: dependent.is_resolved,
            resolved_package: dependent.resolved_package.clone(),
            dependency_uid: purl::with_uuid(&dependent.purl),
            for_package_uid: package_uid.map(str::to_string),
            datafile_path: datafile_path.to_string(),
            datasource_id: datasource_id.to_string(),
            extra_data: dependent.extra_data.clone(),
        }
    }

    /// Top-level dependencies for every dependency of a datafile.
    pub fn from_dependent_packages(
        dependents: &[DependentPackage],
        datafile_path: &str,
        datasource_id: &str,
        package_uid: Option<&str>,
    ) -> Vec<Self> {
        dependents
            .iter()
            .map(|d| Self::from_dependent_package(d, datafile_path, datasource_id, package_uid))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dependency_keeps_declared_flags() {
        let dep = DependentPackage::new("pkg:bower/jquery".into(), "devDependencies")
            .requirement(Some("~3.1".into()))
            .runtime(false)
            .optional(true);
        let top = Dependency::from_dependent_package(
            &dep,
            "project/bower.json",
            "bower_json",
            Some("pkg:bower/app?uuid=0f1e2d3c-4b5a-6978-8796-a5b4c3d2e1f0"),
        );
        assert_eq!(top.purl, "pkg:bower/jquery");
        assert!(top.dependency_uid.starts_with("pkg:bower/jquery?uuid="));
        assert!(!top.is_runtime);
        assert!(top.is_optional);
        assert_eq!(top.extracted_requirement.as_deref(), Some("~3.1"));
        assert_eq!(top.datafile_path, "project/bower.json");
    }
}
