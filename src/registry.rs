//! Maps a module (assembly) name to the directory that defines it.
//!
//! The build tool names each generated project file after its assembly;
//! assemblies themselves are declared by `*.asmdef` manifests somewhere under
//! the source root. The processor asks this registry where an assembly lives
//! so it can look for analyzer configuration next to the manifest.

use std::collections::HashMap;
use std::path::Path;

use ignore::WalkBuilder;
use tracing::debug;

use crate::paths;

/// Top-level source directory of the project; the fallback module directory
/// when an assembly has no manifest of its own.
pub const DEFAULT_SOURCE_DIRECTORY: &str = "Assets";

const MANIFEST_EXTENSION: &str = "asmdef";

pub trait ModuleRegistry {
    /// Directory of the named module, relative to the project root with
    /// canonical separators, or `None` when the module is unknown.
    fn module_directory(&self, module_name: &str) -> Option<String>;
}

/// Registry backed by a one-shot scan of the source tree for assembly
/// manifests. Construct a fresh one per processing batch: manifests added or
/// removed on disk are then honored on the next cycle.
pub struct AssemblyDefinitionRegistry {
    directories_by_name: HashMap<String, String>,
}

impl AssemblyDefinitionRegistry {
    pub fn scan(project_root: &Path) -> Self {
        let mut directories_by_name = HashMap::new();

        let source_root = project_root.join(DEFAULT_SOURCE_DIRECTORY);
        if !source_root.is_dir() {
            debug!("no {DEFAULT_SOURCE_DIRECTORY} directory; module registry is empty");
            return Self { directories_by_name };
        }

        let walker = WalkBuilder::new(&source_root).standard_filters(true).build();

        for item in walker {
            let Ok(entry) = item else { continue };

            if !entry.file_type().map(|ft| ft.is_file()).unwrap_or(false) {
                continue;
            }

            let path = entry.into_path();
            if path.extension().and_then(|e| e.to_str()) != Some(MANIFEST_EXTENSION) {
                continue;
            }

            let Some(directory) = path
                .parent()
                .and_then(|parent| parent.strip_prefix(project_root).ok())
            else {
                continue;
            };

            let name = manifest_assembly_name(&path);
            let directory = paths::normalize_separators(&directory.to_string_lossy());
            directories_by_name.insert(name, directory);
        }

        Self { directories_by_name }
    }

    pub fn len(&self) -> usize {
        self.directories_by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.directories_by_name.is_empty()
    }
}

impl ModuleRegistry for AssemblyDefinitionRegistry {
    fn module_directory(&self, module_name: &str) -> Option<String> {
        self.directories_by_name.get(module_name).cloned()
    }
}

/// The assembly name declared in the manifest JSON, falling back to the
/// manifest's file stem when the field is absent or unreadable.
fn manifest_assembly_name(path: &Path) -> String {
    if let Ok(text) = std::fs::read_to_string(path) {
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(&text) {
            if let Some(name) = value.get("name").and_then(|name| name.as_str()) {
                if !name.is_empty() {
                    return name.to_string();
                }
            }
        }
    }

    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}
