use std::path::{Path, PathBuf};

use drupalflow_core::constants::{COMPOSER_LOCK, ENV_TOOL_ROOT};
use drupalflow_core::{ComposerPathResolver, ExtensionRegistry, FallbackResolver, ProjectConfig};
use tracing::debug;

/// Registry reading `composer.lock` and `composer show -P` in `working_dir`.
pub fn composer_registry(
    cfg: &ProjectConfig,
    working_dir: &Path,
) -> ExtensionRegistry<ComposerPathResolver> {
    let resolver = ComposerPathResolver::new(cfg.composer_executable.as_str(), working_dir);
    ExtensionRegistry::new(resolver, working_dir.join(COMPOSER_LOCK), working_dir)
}

/// Installation root holding the bundled fallback files.
///
/// `DRUPALFLOW_ROOT` wins; otherwise the directory above the one holding the
/// running binary, so `<root>/bin/dfl` finds `<root>/src/...`.
pub fn tool_root(working_dir: &Path) -> PathBuf {
    if let Some(root) = std::env::var_os(ENV_TOOL_ROOT) {
        return PathBuf::from(root);
    }

    let root = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().and_then(Path::parent).map(Path::to_path_buf))
        .unwrap_or_else(|| working_dir.to_path_buf());
    debug!("tool root: {}", root.display());
    root
}

pub fn fallback_resolver(working_dir: &Path) -> FallbackResolver {
    FallbackResolver::new(working_dir, tool_root(working_dir))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_reads_the_lock_next_to_the_project() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg =
            ProjectConfig::from_toml_str("autodetect_managed_drupal_extensions = false\n")
                .unwrap();
        let mut registry = composer_registry(&cfg, dir.path());

        // Neither composer nor the missing lock file is touched.
        assert!(registry.discover(&mut cfg).unwrap().is_empty());
    }

    #[test]
    fn fallback_resolver_searches_the_working_dir_first() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = fallback_resolver(dir.path());
        assert_eq!(resolver.roots()[0], dir.path());
    }
}
