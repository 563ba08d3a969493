//! Site lifecycle: file cleanup, deletion and installation.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use toml_edit::DocumentMut;
use tracing::{debug, info, instrument};

use crate::ids::{self, IdKind, UnknownIdError};
use crate::config::{ProjectConfig, SiteConfig};
use crate::pipeline::{ExternalCommand, Pipeline};

/// Files of `sites/default` shipped by Drupal core, kept on delete.
const DEFAULT_SITE_KEEP: &[&str] = &["default.services.yml", "default.settings.php"];

#[derive(Debug, Error)]
pub enum SiteError {
    #[error(transparent)]
    UnknownId(#[from] UnknownIdError),
    #[error("failed to remove {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to edit {}", path.display())]
    ConfigEdit {
        path: PathBuf,
        #[source]
        source: toml_edit::TomlError,
    },
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> SiteError + '_ {
    move |source| SiteError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Ensures `dir` exists and is empty.
pub fn clean_directory(dir: &Path) -> io::Result<()> {
    fs::create_dir_all(dir)?;
    for entry in fs::read_dir(dir)? {
        remove_path(&entry?.path())?;
    }
    Ok(())
}

fn remove_path(path: &Path) -> io::Result<()> {
    if path.is_dir() && !path.is_symlink() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

fn remove_if_exists(path: &Path) -> Result<(), SiteError> {
    if path.symlink_metadata().is_err() {
        return Ok(());
    }
    debug!("removing {}", path.display());
    remove_path(path).map_err(io_error(path))
}

/// Resolved on-disk locations of one site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitePaths {
    pub site_id: String,
    /// `{outer_sites_sub_dir}/{id}`, outside the web root.
    pub outer_dir: PathBuf,
    /// `{drupal_root}/sites/{id}`.
    pub drupal_dir: PathBuf,
}

impl SitePaths {
    pub fn new(cfg: &ProjectConfig, working_dir: &Path, site_id: &str) -> Self {
        Self {
            site_id: site_id.to_string(),
            outer_dir: working_dir.join(&cfg.outer_sites_sub_dir).join(site_id),
            drupal_dir: working_dir
                .join(&cfg.drupal_root_dir)
                .join("sites")
                .join(site_id),
        }
    }

    pub fn public_files_dir(&self) -> PathBuf {
        self.drupal_dir.join("files")
    }

    pub fn private_files_dir(&self) -> PathBuf {
        self.outer_dir.join("private")
    }

    pub fn config_sync_dir(&self) -> PathBuf {
        self.outer_dir.join("config").join("sync")
    }

    fn has_config_to_import(&self) -> bool {
        fs::read_dir(self.config_sync_dir())
            .map(|entries| {
                entries.filter_map(Result::ok).any(|entry| {
                    entry.path().extension().is_some_and(|ext| ext == "yml")
                })
            })
            .unwrap_or(false)
    }
}

fn lookup_site<'a>(
    cfg: &'a ProjectConfig,
    site_id: &str,
) -> Result<&'a SiteConfig, UnknownIdError> {
    ids::get(IdKind::Site, site_id, &cfg.sites)
}

/// Removes the site's directories. The core-shipped files of `sites/default`
/// survive.
pub fn delete_site_files(paths: &SitePaths) -> Result<(), SiteError> {
    remove_if_exists(&paths.outer_dir)?;

    if paths.site_id != "default" {
        return remove_if_exists(&paths.drupal_dir);
    }

    let entries = match fs::read_dir(&paths.drupal_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(io_error(&paths.drupal_dir)(e)),
    };
    for entry in entries {
        let path = entry.map_err(io_error(&paths.drupal_dir))?.path();
        let keep = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| DEFAULT_SITE_KEEP.contains(&name));
        if !keep {
            remove_if_exists(&path)?;
        }
    }
    Ok(())
}

/// Drops the `[sites.<id>]` table from a config file, leaving the rest of
/// the document untouched. Returns whether the file changed.
pub fn remove_site_from_config_file(path: &Path, site_id: &str) -> Result<bool, SiteError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(io_error(path)(e)),
    };
    let mut doc: DocumentMut = content.parse().map_err(|source| SiteError::ConfigEdit {
        path: path.to_path_buf(),
        source,
    })?;

    let removed = doc
        .get_mut("sites")
        .and_then(|sites| sites.as_table_like_mut())
        .and_then(|sites| sites.remove(site_id))
        .is_some();

    if removed {
        fs::write(path, doc.to_string()).map_err(io_error(path))?;
    }
    Ok(removed)
}

/// Deletes a site from disk, from the config file and from `cfg`.
#[instrument(skip(cfg, working_dir, config_file))]
pub fn delete_site(
    cfg: &mut ProjectConfig,
    working_dir: &Path,
    config_file: &Path,
    site_id: &str,
) -> Result<(), SiteError> {
    let site_id = lookup_site(cfg, site_id)?.id.clone();
    let paths = SitePaths::new(cfg, working_dir, &site_id);

    delete_site_files(&paths)?;
    if remove_site_from_config_file(config_file, &site_id)? {
        debug!("removed [sites.{}] from {}", site_id, config_file.display());
    }
    cfg.remove_site(&site_id);

    info!(target: "drupalflow", "site {} deleted", site_id);
    Ok(())
}

/// The `drush site-install` invocation for a site, run from the Drupal root.
pub fn site_install_command(
    cfg: &ProjectConfig,
    working_dir: &Path,
    site_id: &str,
) -> Result<ExternalCommand, SiteError> {
    let site = lookup_site(cfg, site_id)?;
    let site_id = site.id.as_str();
    let paths = SitePaths::new(cfg, working_dir, site_id);
    let profile = site.install_profile_name.as_str();

    let drush = working_dir.join(&cfg.bin_dir).join("drush");
    let mut command = ExternalCommand::new(drush.to_string_lossy())
        .args(["--yes".to_string(), format!("--sites-subdir={site_id}")])
        .current_dir(working_dir.join(&cfg.drupal_root_dir));

    if paths.has_config_to_import() {
        command = command.arg(format!("--config-dir={}", paths.config_sync_dir().display()));
    }

    Ok(command.args(["site-install", profile]))
}

/// Cleans public and private files, then installs the site.
pub fn site_install_pipeline(
    cfg: &ProjectConfig,
    working_dir: &Path,
    site_id: &str,
) -> Result<Pipeline, SiteError> {
    let site_id = lookup_site(cfg, site_id)?.id.as_str();
    let install = site_install_command(cfg, working_dir, site_id)?;
    let paths = SitePaths::new(cfg, working_dir, site_id);
    let (public, private) = (paths.public_files_dir(), paths.private_files_dir());

    Ok(Pipeline::new()
        .add_code(format!("clean.public.{site_id}"), move || {
            Ok(clean_directory(&public)?)
        })
        .add_code(format!("clean.private.{site_id}"), move || {
            Ok(clean_directory(&private)?)
        })
        .add_task(format!("install.{site_id}"), install))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"# project settings
drupal_root_dir = "web"

[sites.default]
install_profile_name = "minimal" # keep me

[sites.blog]
install_profile_name = "standard"

[php_variants.php7]
"#;

    fn project(dir: &Path) -> (ProjectConfig, PathBuf) {
        let config_file = dir.join("drupalflow.toml");
        fs::write(&config_file, CONFIG).unwrap();
        let cfg = ProjectConfig::load_from_file(&config_file).unwrap();
        (cfg, config_file)
    }

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    #[test]
    fn clean_directory_creates_and_empties() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("files");
        clean_directory(&target).unwrap();
        assert!(target.is_dir());

        touch(&target.join("a.txt"));
        touch(&target.join("styles/thumb/b.png"));
        clean_directory(&target).unwrap();
        assert_eq!(fs::read_dir(&target).unwrap().count(), 0);
    }

    #[test]
    fn deleting_a_site_removes_its_directories_and_config() {
        let dir = tempfile::tempdir().unwrap();
        let (mut cfg, config_file) = project(dir.path());
        touch(&dir.path().join("sites/blog/private/x"));
        touch(&dir.path().join("web/sites/blog/settings.php"));
        touch(&dir.path().join("web/sites/default/settings.php"));

        delete_site(&mut cfg, dir.path(), &config_file, "blog").unwrap();

        assert!(!dir.path().join("sites/blog").exists());
        assert!(!dir.path().join("web/sites/blog").exists());
        assert!(dir.path().join("web/sites/default/settings.php").exists());
        assert_eq!(cfg.sites.keys().collect::<Vec<_>>(), vec!["default"]);

        let text = fs::read_to_string(&config_file).unwrap();
        assert!(!text.contains("[sites.blog]"));
        assert!(text.contains("# project settings"));
        assert!(text.contains("install_profile_name = \"minimal\" # keep me"));
        assert!(text.contains("[php_variants.php7]"));
    }

    #[test]
    fn deleting_the_default_site_keeps_core_files() {
        let dir = tempfile::tempdir().unwrap();
        let (mut cfg, config_file) = project(dir.path());
        let default_dir = dir.path().join("web/sites/default");
        touch(&default_dir.join("default.settings.php"));
        touch(&default_dir.join("default.services.yml"));
        touch(&default_dir.join("settings.php"));
        touch(&default_dir.join("files/logo.png"));

        delete_site(&mut cfg, dir.path(), &config_file, "default").unwrap();

        let mut left: Vec<_> = fs::read_dir(&default_dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        left.sort();
        assert_eq!(left, vec!["default.services.yml", "default.settings.php"]);
        assert!(!cfg.sites.contains_key("default"));
    }

    #[test]
    fn unknown_site_is_rejected_before_touching_anything() {
        let dir = tempfile::tempdir().unwrap();
        let (mut cfg, config_file) = project(dir.path());
        let err = delete_site(&mut cfg, dir.path(), &config_file, "shop").unwrap_err();
        match err {
            SiteError::UnknownId(e) => assert_eq!(e.known, vec!["default", "blog"]),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(fs::read_to_string(&config_file).unwrap(), CONFIG);
    }

    #[test]
    fn blank_or_joined_site_ids_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (mut cfg, config_file) = project(dir.path());
        touch(&dir.path().join("web/sites/default/settings.php"));

        for id in ["", "blog,default"] {
            let err = delete_site(&mut cfg, dir.path(), &config_file, id).unwrap_err();
            assert!(matches!(err, SiteError::UnknownId(ref e) if e.unknown == vec![id]));
            assert!(matches!(
                site_install_pipeline(&cfg, dir.path(), id),
                Err(SiteError::UnknownId(_))
            ));
        }

        assert_eq!(cfg.sites.keys().collect::<Vec<_>>(), vec!["default", "blog"]);
        assert!(dir.path().join("web/sites/default/settings.php").exists());
        assert_eq!(fs::read_to_string(&config_file).unwrap(), CONFIG);
    }

    #[test]
    fn missing_config_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!remove_site_from_config_file(&dir.path().join("nope.toml"), "blog").unwrap());
    }

    #[test]
    fn install_command_uses_the_site_profile() {
        let dir = tempfile::tempdir().unwrap();
        let (cfg, _) = project(dir.path());

        let command = site_install_command(&cfg, dir.path(), "default").unwrap();
        assert_eq!(
            command.program,
            dir.path().join("vendor/bin/drush").to_string_lossy()
        );
        assert_eq!(
            command.args,
            vec!["--yes", "--sites-subdir=default", "site-install", "minimal"]
        );
        assert_eq!(command.working_dir, Some(dir.path().join("web")));
    }

    #[test]
    fn install_command_imports_existing_config() {
        let dir = tempfile::tempdir().unwrap();
        let (cfg, _) = project(dir.path());
        touch(&dir.path().join("sites/blog/config/sync/system.site.yml"));

        let command = site_install_command(&cfg, dir.path(), "blog").unwrap();
        let expected = format!(
            "--config-dir={}",
            dir.path().join("sites/blog/config/sync").display()
        );
        assert_eq!(command.args[2], expected);
        assert_eq!(command.args[3..], ["site-install", "standard"]);
    }

    #[test]
    fn install_pipeline_cleans_before_installing() {
        let dir = tempfile::tempdir().unwrap();
        let (cfg, _) = project(dir.path());
        let pipeline = site_install_pipeline(&cfg, dir.path(), "blog").unwrap();
        assert_eq!(
            pipeline.names().collect::<Vec<_>>(),
            vec!["clean.public.blog", "clean.private.blog", "install.blog"]
        );
    }
}
