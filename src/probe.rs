//! Override-path search
//!
//! The first resolution tier: an operator can point the process at an
//! already-installed native library through an override environment variable,
//! or through the platform's generic library-search-path variable. Absence is
//! the expected outcome for most deployments and advances resolution to the
//! bundled-artifact tier.

use crate::config::LoadConfig;
use crate::platform::mapped_library_name;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Searches environment-configured roots for the mapped library file.
#[derive(Debug)]
pub struct PathProbe {
    env_vars: Vec<String>,
    mapped_name: String,
}

impl PathProbe {
    pub fn new(config: &LoadConfig) -> Self {
        Self {
            env_vars: vec![config.override_var.clone(), config.search_path_var.clone()],
            mapped_name: mapped_library_name(&config.lib_name),
        }
    }

    /// Search the override variable, then the generic search-path variable,
    /// for the mapped library file. Each variable holds a platform path list;
    /// the first root that yields the file wins and no further roots are
    /// checked. `None` means no override is configured, which is not an
    /// error.
    pub fn find_override(&self) -> Option<PathBuf> {
        for var in &self.env_vars {
            let Ok(value) = std::env::var(var) else {
                continue;
            };
            for root in std::env::split_paths(&value) {
                if let Some(hit) = self.check_root(&root) {
                    debug!(var, path = %hit.display(), "native library override found");
                    return Some(hit);
                }
            }
        }
        None
    }

    /// A root matches if it is itself a file named after the mapped library,
    /// or if it is a directory containing the mapped library file.
    fn check_root(&self, root: &Path) -> Option<PathBuf> {
        if root.is_file() {
            let name = root.file_name()?.to_string_lossy();
            if name.ends_with(&self.mapped_name) {
                return Some(root.to_path_buf());
            }
            return None;
        }
        let candidate = root.join(&self.mapped_name);
        candidate.is_file().then_some(candidate)
    }
}
