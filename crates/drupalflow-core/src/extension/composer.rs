//! Composer collaborators: the lock file and the package path resolver.

use std::path::{Path, PathBuf};
use std::process::Command;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::constants::DRUPAL_PACKAGE_TYPE_PREFIX;

/// One entry of a `composer.lock` package section.
#[derive(Debug, Clone, Deserialize)]
pub struct LockedPackage {
    pub name: String,
    #[serde(default, rename = "type")]
    pub package_type: String,
}

impl LockedPackage {
    pub fn is_drupal_package(&self) -> bool {
        self.package_type.starts_with(DRUPAL_PACKAGE_TYPE_PREFIX)
    }
}

/// The two equally weighted sections of `composer.lock`, keyed by package id.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ComposerLock {
    #[serde(default, deserialize_with = "by_name")]
    pub packages: IndexMap<String, LockedPackage>,
    #[serde(default, rename = "packages-dev", deserialize_with = "by_name")]
    pub packages_dev: IndexMap<String, LockedPackage>,
}

#[derive(Debug, Error)]
pub enum LockError {
    #[error("failed to read lock file: {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse lock file: {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl ComposerLock {
    pub fn load(path: &Path) -> Result<Self, LockError> {
        let text = std::fs::read_to_string(path).map_err(|source| LockError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| LockError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Lock entries for `package_id`, runtime section first.
    pub fn entries(&self, package_id: &str) -> impl Iterator<Item = &LockedPackage> {
        self.packages
            .get(package_id)
            .into_iter()
            .chain(self.packages_dev.get(package_id))
    }
}

fn by_name<'de, D>(deserializer: D) -> Result<IndexMap<String, LockedPackage>, D::Error>
where
    D: Deserializer<'de>,
{
    let list = Vec::<LockedPackage>::deserialize(deserializer)?;
    Ok(list
        .into_iter()
        .map(|package| (package.name.clone(), package))
        .collect())
}

#[derive(Debug, Error)]
pub enum ResolverError {
    #[error("failed to start '{program}'")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("'{program}' exited with code {code:?}: {stderr}")]
    Failed {
        program: String,
        code: Option<i32>,
        stderr: String,
    },
}

/// Resolves every installed package to its real on-disk location.
pub trait PackagePathResolver: std::fmt::Debug {
    fn resolve_all_package_paths(&self) -> Result<IndexMap<String, PathBuf>, ResolverError>;
}

/// Runs `composer show -P`, which follows the symlinks Composer creates for
/// path repositories.
#[derive(Debug, Clone)]
pub struct ComposerPathResolver {
    composer_executable: String,
    working_dir: PathBuf,
}

impl ComposerPathResolver {
    pub fn new(composer_executable: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            composer_executable: composer_executable.into(),
            working_dir: working_dir.into(),
        }
    }
}

impl PackagePathResolver for ComposerPathResolver {
    #[instrument]
    fn resolve_all_package_paths(&self) -> Result<IndexMap<String, PathBuf>, ResolverError> {
        let output = Command::new(&self.composer_executable)
            .args(["show", "-P", "--no-interaction"])
            .current_dir(&self.working_dir)
            .output()
            .map_err(|source| ResolverError::Spawn {
                program: self.composer_executable.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(ResolverError::Failed {
                program: self.composer_executable.clone(),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let paths = parse_package_paths(&String::from_utf8_lossy(&output.stdout));
        debug!("composer resolved {} package paths", paths.len());
        Ok(paths)
    }
}

/// Parses `vendor/name /absolute/path` lines. Packages without an install
/// path (metapackages) are skipped.
pub fn parse_package_paths(stdout: &str) -> IndexMap<String, PathBuf> {
    stdout
        .lines()
        .filter_map(|line| {
            let (name, path) = line.trim().split_once(char::is_whitespace)?;
            let path = path.trim();
            if path.is_empty() || path == "null" {
                return None;
            }
            Some((name.to_string(), PathBuf::from(path)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_show_paths_output() {
        let paths = parse_package_paths(
            "drupal/core /srv/app/drupal_root/core\n\
             drupal/foo   /home/dev/foo\n\
             acme/meta null\n\n",
        );
        assert_eq!(paths.len(), 2);
        assert_eq!(paths["drupal/foo"], PathBuf::from("/home/dev/foo"));
    }

    #[test]
    fn indexes_lock_sections_by_name() {
        let lock: ComposerLock = serde_json::from_str(
            r#"{
                "packages": [{"name": "drupal/foo", "type": "drupal-module", "version": "1.0.0"}],
                "packages-dev": [{"name": "phpunit/phpunit", "type": "library"}]
            }"#,
        )
        .unwrap();
        assert!(lock.packages["drupal/foo"].is_drupal_package());
        assert!(!lock.packages_dev["phpunit/phpunit"].is_drupal_package());
        assert_eq!(lock.entries("drupal/foo").count(), 1);
        assert_eq!(lock.entries("drupal/bar").count(), 0);
    }

    #[test]
    fn missing_sections_default_to_empty() {
        let lock: ComposerLock = serde_json::from_str("{}").unwrap();
        assert!(lock.packages.is_empty());
        assert!(lock.packages_dev.is_empty());
    }
}
