use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::constants::{MANIFEST_GEMFILE, NODE_BIN_PREFIX};

/// Files looked up at the top of each fallback root instead of under `src/`.
const ROOT_LEVEL_FILES: &[&str] = &[MANIFEST_GEMFILE];

#[derive(Debug, Error, PartialEq, Eq)]
#[error("no fallback for file '{file_name}' (searched: {})", display_paths(.searched))]
pub struct NoFallbackFileError {
    pub file_name: String,
    pub searched: Vec<PathBuf>,
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Locates companion tool configuration files.
///
/// An extension's own copy always wins. Otherwise the roots are searched in
/// order: the project working directory first, then the tool's installation root.
#[derive(Debug, Clone)]
pub struct FallbackResolver {
    roots: Vec<PathBuf>,
}

impl FallbackResolver {
    pub fn new(working_dir: impl Into<PathBuf>, tool_root: impl Into<PathBuf>) -> Self {
        Self {
            roots: vec![working_dir.into(), tool_root.into()],
        }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    pub fn resolve(
        &self,
        file_name: &str,
        preferred_dir: &Path,
    ) -> Result<PathBuf, NoFallbackFileError> {
        let preferred = preferred_dir.join(file_name);
        if preferred.exists() {
            return Ok(preferred);
        }

        let mut searched = vec![preferred];
        for root in &self.roots {
            let candidate = candidate_path(root, file_name);
            if candidate.exists() {
                debug!("fallback for {} resolved to {}", file_name, candidate.display());
                return Ok(candidate);
            }
            searched.push(candidate);
        }

        Err(NoFallbackFileError {
            file_name: file_name.to_string(),
            searched,
        })
    }
}

fn candidate_path(root: &Path, file_name: &str) -> PathBuf {
    if file_name.starts_with(NODE_BIN_PREFIX) || ROOT_LEVEL_FILES.contains(&file_name) {
        root.join(file_name)
    } else {
        root.join("src").join(file_name)
    }
}
