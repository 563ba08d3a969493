use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::config::{DrupalExtensionConfig, ProjectConfig};
use crate::ids::{self, IdKind, UnknownIdError};
use crate::project::{has_marker, Marker};

pub mod composer;

use composer::{ComposerLock, LockError, PackagePathResolver, ResolverError};

/// Discovery could not determine the managed extensions at all. This is
/// distinct from discovering none.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("failed to resolve package paths")]
    Resolver(#[from] ResolverError),
    #[error(transparent)]
    Lock(#[from] LockError),
    #[error("malformed package id '{0}', expected 'vendor/name'")]
    PackageId(String),
}

/// Owns the discovery caches for one process: resolved package paths and
/// the `initialized` flag that makes discovery run once.
#[derive(Debug)]
pub struct ExtensionRegistry<R> {
    resolver: R,
    lock_path: PathBuf,
    working_dir: PathBuf,
    package_paths: Option<IndexMap<String, PathBuf>>,
    initialized: bool,
}

impl<R: PackagePathResolver> ExtensionRegistry<R> {
    pub fn new(
        resolver: R,
        lock_path: impl Into<PathBuf>,
        working_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            resolver,
            lock_path: lock_path.into(),
            working_dir: working_dir.into(),
            package_paths: None,
            initialized: false,
        }
    }

    /// Forgets cached package paths and discovery state.
    pub fn reset(&mut self) {
        self.package_paths = None;
        self.initialized = false;
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// All package paths known to the resolver. The resolver runs at most once
    /// until [`reset`](Self::reset).
    pub fn package_paths(&mut self) -> Result<&IndexMap<String, PathBuf>, DiscoveryError> {
        if self.package_paths.is_none() {
            let paths = self.resolver.resolve_all_package_paths()?;
            self.package_paths = Some(paths);
        }
        Ok(self.package_paths.get_or_insert_with(IndexMap::new))
    }

    pub fn package_path(&mut self, package_id: &str) -> Result<Option<&Path>, DiscoveryError> {
        Ok(self.package_paths()?.get(package_id).map(PathBuf::as_path))
    }

    /// Packages that are locked, typed as Drupal packages, and installed
    /// outside the working directory.
    pub fn collect_candidates(&mut self) -> Result<IndexMap<String, PathBuf>, DiscoveryError> {
        let lock = ComposerLock::load(&self.lock_path)?;
        let working_dir = self.working_dir.clone();
        let paths = self.package_paths()?;

        let candidates = paths
            .iter()
            .filter(|(package_id, path)| {
                !path.starts_with(&working_dir)
                    && lock
                        .entries(package_id)
                        .any(|entry| entry.is_drupal_package())
            })
            .map(|(package_id, path)| (package_id.clone(), path.clone()))
            .collect::<IndexMap<_, _>>();

        debug!("{} managed extension candidates", candidates.len());
        Ok(candidates)
    }

    /// Merges discovered extensions into `cfg.managed_drupal_extensions`.
    ///
    /// Existing entries are fetched and only their detected fields are
    /// overwritten, so statically configured `enabled` and `phpcs` values survive.
    #[instrument(skip_all)]
    pub fn discover<'c>(
        &mut self,
        cfg: &'c mut ProjectConfig,
    ) -> Result<&'c IndexMap<String, DrupalExtensionConfig>, DiscoveryError> {
        if !cfg.autodetect_managed_drupal_extensions || self.initialized {
            return Ok(&cfg.managed_drupal_extensions);
        }

        for (package_id, path) in self.collect_candidates()? {
            let (vendor, name) = package_id
                .split_once('/')
                .ok_or_else(|| DiscoveryError::PackageId(package_id.clone()))?;

            let extension = cfg
                .managed_drupal_extensions
                .entry(name.to_string())
                .or_default();

            extension.id = name.to_string();
            extension.package_vendor = vendor.to_string();
            extension.package_name = name.to_string();
            extension.has_git = has_marker(&path, Marker::Git);
            extension.has_scss = has_marker(&path, Marker::Scss);
            extension.has_type_script = has_marker(&path, Marker::TypeScript);
            extension.path = path;

            if extension.phpcs.paths.is_empty() {
                extension.phpcs.paths = vec![".".to_string()];
            }
        }

        self.initialized = true;
        info!(
            "managed extensions: {}",
            cfg.managed_drupal_extensions.len()
        );
        Ok(&cfg.managed_drupal_extensions)
    }

    /// Enabled managed extensions, discovering them first if needed.
    pub fn managed_extensions<'c>(
        &mut self,
        cfg: &'c mut ProjectConfig,
    ) -> Result<Vec<&'c DrupalExtensionConfig>, DiscoveryError> {
        let all = self.discover(cfg)?;
        Ok(all.values().filter(|extension| extension.enabled).collect())
    }

    /// Validates extension names against the enabled managed extensions.
    /// No names means every enabled extension.
    pub fn validate_extension_names<S: AsRef<str>>(
        &mut self,
        cfg: &mut ProjectConfig,
        names: &[S],
    ) -> Result<Vec<String>, ExtensionLookupError> {
        self.discover(cfg)?;
        let enabled: IndexMap<String, &DrupalExtensionConfig> = cfg
            .enabled_extensions()
            .map(|extension| (extension.id.clone(), extension))
            .collect();

        let selected = ids::select(IdKind::Extension, names, &enabled)?;
        Ok(selected.into_iter().map(|extension| extension.id.clone()).collect())
    }
}

#[derive(Debug, Error)]
pub enum ExtensionLookupError {
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
    #[error(transparent)]
    UnknownId(#[from] UnknownIdError),
}
