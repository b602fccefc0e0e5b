//! In-memory tree of the scanned files and directories.
//!
//! Resources live in an arena indexed by `ResourceId`; parents and children
//! are stored as ids so handlers can update any resource during assembly.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::ScanConfig;
use crate::error::{Result, ScanError};
use crate::models::PackageData;
use crate::analysis::summary::Summary;

pub type ResourceId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    File,
    Directory,
}

/// A file or directory of the codebase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    /// Path relative to the codebase root's parent, with `/` separators.
    pub path: String,
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
    pub name: String,
    pub size: Option<u64>,
    pub package_data: Vec<PackageData>,
    pub for_packages: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub summary: Option<Summary>,
    pub scan_errors: Vec<String>,
    #[serde(skip)]
    pub location: PathBuf,
    #[serde(skip)]
    pub parent: Option<ResourceId>,
    #[serde(skip)]
    pub children: Vec<ResourceId>,
}

impl Resource {
    pub fn is_file(&self) -> bool {
        self.resource_type == ResourceType::File
    }

    fn new(location: &Path, path: String, resource_type: ResourceType) -> Self {
        let name = location
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.clone());
        Self {
            path,
            resource_type,
            name,
            size: None,
            package_data: Vec::new(),
            for_packages: Vec::new(),
            summary: None,
            scan_errors: Vec::new(),
            location: location.to_path_buf(),
            parent: None,
            children: Vec::new(),
        }
    }
}

/// The scanned tree. Resource 0 is the root.
#[derive(Debug, Clone)]
pub struct Codebase {
    resources: Vec<Resource>,
}

impl Codebase {
    /// Collect every file and directory under `root`.
    ///
    /// Resource paths start with the root's own name, as in `project/Cargo.toml`.
    /// A single file can be scanned too; it is then the only resource.
    pub fn collect(root: &Path, config: &ScanConfig) -> Result<Self> {
        if !root.exists() {
            return Err(ScanError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} does not exist", root.display()),
            )));
        }

        let root_name = root
            .canonicalize()
            .ok()
            .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .unwrap_or_else(|| "codebase".into());

        let root_type = if root.is_dir() {
            ResourceType::Directory
        } else {
            ResourceType::File
        };
        let mut root_resource = Resource::new(root, root_name.clone(), root_type);
        root_resource.name = root_name.clone();
        if root_type == ResourceType::File {
            root_resource.size = std::fs::metadata(root).ok().map(|m| m.len());
        }

        let mut codebase = Self {
            resources: vec![root_resource],
        };
        if root_type == ResourceType::File {
            return Ok(codebase);
        }

        let ignore_set = config.ignore_patterns()?;
        let walk_root = root.to_path_buf();
        let mut walker = ignore::WalkBuilder::new(root);
        walker
            .hidden(!config.hidden)
            .git_ignore(false)
            .ignore(false)
            .parents(false)
            .git_global(false)
            .git_exclude(false)
            .max_depth(config.max_depth)
            .sort_by_file_name(|a, b| a.cmp(b))
            // Ignored directories are pruned, never descended into
            .filter_entry(move |entry| {
                let Ok(relative) = entry.path().strip_prefix(&walk_root) else {
                    return true;
                };
                if entry.depth() == 0 || !is_ignored(&ignore_set, &to_posix(relative)) {
                    return true;
                }
                tracing::debug!(path = %entry.path().display(), "ignored by configuration");
                false
            });

        // Directory path -> resource id, for parent lookups. The walk is
        // depth-first so a parent is always seen before its children.
        let mut dir_ids: std::collections::HashMap<PathBuf, ResourceId> =
            std::collections::HashMap::new();
        dir_ids.insert(root.to_path_buf(), 0);

        for entry in walker.build() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(error = %e, "cannot read directory entry, skipping");
                    continue;
                }
            };
            let location = entry.path();
            if entry.depth() == 0 {
                continue;
            }

            let relative = match location.strip_prefix(root) {
                Ok(rel) => rel,
                Err(_) => continue,
            };
            let relative = to_posix(relative);

            let parent_location = location.parent().unwrap_or(root);
            let Some(&parent) = dir_ids.get(parent_location) else {
                // parent directory was skipped
                continue;
            };

            let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
            let resource_type = if is_dir {
                ResourceType::Directory
            } else {
                ResourceType::File
            };
            let mut resource = Resource::new(
                location,
                format!("{root_name}/{relative}"),
                resource_type,
            );
            if !is_dir {
                resource.size = entry.metadata().ok().map(|m| m.len());
            }
            resource.parent = Some(parent);

            let id = codebase.resources.len();
            codebase.resources.push(resource);
            codebase.resources[parent].children.push(id);
            if is_dir {
                dir_ids.insert(location.to_path_buf(), id);
            }
        }

        Ok(codebase)
    }

    pub fn root(&self) -> &Resource {
        &self.resources[0]
    }

    pub fn get(&self, id: ResourceId) -> &Resource {
        &self.resources[id]
    }

    pub fn get_mut(&mut self, id: ResourceId) -> &mut Resource {
        &mut self.resources[id]
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn parent(&self, id: ResourceId) -> Option<ResourceId> {
        self.resources[id].parent
    }

    pub fn children(&self, id: ResourceId) -> &[ResourceId] {
        &self.resources[id].children
    }

    /// The child of `id` with the given name.
    pub fn child_named(&self, id: ResourceId, name: &str) -> Option<ResourceId> {
        self.children(id)
            .iter()
            .copied()
            .find(|&child| self.resources[child].name == name)
    }

    /// The sibling of `id` with the given name.
    pub fn sibling_named(&self, id: ResourceId, name: &str) -> Option<ResourceId> {
        self.parent(id)
            .and_then(|parent| self.child_named(parent, name))
    }

    /// `id` and everything below it, parents before children.
    pub fn walk_topdown(&self, id: ResourceId) -> Vec<ResourceId> {
        let mut order = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            order.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        order
    }

    /// `id` and everything below it, children before parents.
    pub fn walk_bottomup(&self, id: ResourceId) -> Vec<ResourceId> {
        let mut order = Vec::new();
        self.push_bottomup(id, &mut order);
        order
    }

    fn push_bottomup(&self, id: ResourceId, order: &mut Vec<ResourceId>) {
        for &child in self.children(id) {
            self.push_bottomup(child, order);
        }
        order.push(id);
    }

    /// Every resource, in path order.
    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.walk_topdown(0).into_iter().map(move |id| &self.resources[id])
    }

    pub fn file_count(&self) -> usize {
        self.resources.iter().filter(|r| r.is_file()).count()
    }
}

/// A codebase-relative path is ignored when a pattern matches the whole
/// path or any one of its components.
fn is_ignored(patterns: &[glob::Pattern], relative: &str) -> bool {
    patterns
        .iter()
        .any(|p| p.matches(relative) || relative.split('/').any(|c| p.matches(c)))
}

fn to_posix(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
