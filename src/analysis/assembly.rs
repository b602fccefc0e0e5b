//! Assembly of parsed package data into top-level packages and dependencies.

use std::collections::HashSet;

use crate::codebase::{Codebase, ResourceId};
use crate::error::{Result, ScanError};
use crate::handlers::{AssemblyItem, HandlerRegistry};
use crate::models::{Dependency, Package};

/// Top-level packages and dependencies, in the order they were assembled.
#[derive(Debug, Clone, Default)]
pub struct Assembled {
    pub packages: Vec<Package>,
    pub dependencies: Vec<Dependency>,
}

/// Walk the codebase bottom-up and let each record's handler assemble it.
///
/// A resource consumed by an earlier assembly (for instance a `Cargo.lock`
/// assembled together with its `Cargo.toml`) is not assembled again.
pub fn create_packages_and_dependencies(
    codebase: &mut Codebase,
    registry: &HandlerRegistry,
) -> Result<Assembled> {
    let mut assembled = Assembled::default();
    let mut seen: HashSet<ResourceId> = HashSet::new();

    for id in codebase.walk_bottomup(0) {
        if codebase.get(id).package_data.is_empty() || seen.contains(&id) {
            continue;
        }

        let records = codebase.get(id).package_data.clone();
        for record in &records {
            let datasource_id = record.datasource_id.as_deref().ok_or_else(|| {
                ScanError::Internal(format!(
                    "package data without datasource in {}",
                    codebase.get(id).path
                ))
            })?;
            let handler = registry.by_datasource(datasource_id)?;
            tracing::debug!(path = %codebase.get(id).path, datasource_id, "assembling");

            for item in handler.assemble(record, id, codebase)? {
                match item {
                    AssemblyItem::Package(package) => assembled.packages.push(package),
                    AssemblyItem::Dependency(dependency) => {
                        assembled.dependencies.push(dependency)
                    }
                    AssemblyItem::Resource(resource) => {
                        seen.insert(resource);
                    }
                }
            }
        }
    }

    tracing::info!(
        packages = assembled.packages.len(),
        dependencies = assembled.dependencies.len(),
        "assembly complete"
    );
    Ok(assembled)
}
