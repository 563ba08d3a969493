//! Typed project configuration.
//!
//! A [`ProjectConfig`] is built from layered TOML input: built-in defaults for
//! the project type, then `drupalflow.toml`, then `drupalflow.local.toml`.
//! Layers are deep-merged before population, so later layers win field by field.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use toml::Table;
use tracing::{debug, instrument};

use crate::constants::{ENV_ENVIRONMENT, LOCAL_CONFIG_FILE};
use crate::runtime::Environment;
use crate::template::{self, TemplateError};

pub mod populate;

pub use populate::{ConfigError, Entity, EntityKind, Field, FieldRule};
use populate::{assign, assign_map, assign_sub, merge_tables};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectType {
    /// Hosts extensions under development, tested across PHP and database variants.
    #[default]
    Incubator,
    /// A single customer site.
    Customer,
}

impl ProjectType {
    pub fn default_dir_pattern(self) -> &'static str {
        match self {
            Self::Incubator => "{siteBranch}.{php}.{db}",
            Self::Customer => "{siteBranch}",
        }
    }

    pub fn default_url_pattern(self) -> &'static str {
        match self {
            Self::Incubator => "{siteBranch}.{php}.{db}.{baseHost}",
            Self::Customer => "{siteBranch}.{baseHost}",
        }
    }
}

/// Severity at which a linter run counts as failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailOn {
    Never,
    #[default]
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectConfig {
    pub project_type: ProjectType,
    pub drupal_root_dir: PathBuf,
    pub outer_sites_sub_dir: PathBuf,
    pub reports_dir: PathBuf,
    pub release_dir: PathBuf,
    pub bin_dir: PathBuf,
    pub composer_executable: String,
    pub base_host_name: String,
    pub default_site_id: String,
    pub site_variant_url_pattern: String,
    pub site_variant_dir_pattern: String,
    pub autodetect_managed_drupal_extensions: bool,
    pub environment: Environment,
    pub sites: IndexMap<String, SiteConfig>,
    pub php_variants: IndexMap<String, PhpVariantConfig>,
    pub database_servers: IndexMap<String, DatabaseServerConfig>,
    pub managed_drupal_extensions: IndexMap<String, DrupalExtensionConfig>,
    pub sass_roots: IndexMap<String, SassRootConfig>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self::for_project_type(ProjectType::default())
    }
}

impl ProjectConfig {
    /// Built-in defaults for a project type.
    pub fn for_project_type(project_type: ProjectType) -> Self {
        Self {
            project_type,
            drupal_root_dir: PathBuf::from("drupal_root"),
            outer_sites_sub_dir: PathBuf::from("sites"),
            reports_dir: PathBuf::from("reports"),
            release_dir: PathBuf::from("release"),
            bin_dir: PathBuf::from("vendor/bin"),
            composer_executable: "composer".to_string(),
            base_host_name: "localhost".to_string(),
            default_site_id: "default".to_string(),
            site_variant_url_pattern: project_type.default_url_pattern().to_string(),
            site_variant_dir_pattern: project_type.default_dir_pattern().to_string(),
            autodetect_managed_drupal_extensions: true,
            environment: Environment::default(),
            sites: IndexMap::new(),
            php_variants: IndexMap::new(),
            database_servers: IndexMap::new(),
            managed_drupal_extensions: IndexMap::new(),
            sass_roots: IndexMap::new(),
        }
    }

    /// Loads `path` and, when present, the local override file next to it.
    /// `DRUPALFLOW_ENVIRONMENT` overrides the configured environment.
    #[instrument]
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let mut layers = vec![read_layer(path)?];

        let local = path
            .parent()
            .map(|dir| dir.join(LOCAL_CONFIG_FILE))
            .unwrap_or_else(|| PathBuf::from(LOCAL_CONFIG_FILE));
        if local.is_file() {
            debug!("layering local overrides from {}", local.display());
            layers.push(read_layer(&local)?);
        }

        let mut cfg = Self::from_layers(layers)?;
        if let Ok(value) = std::env::var(ENV_ENVIRONMENT) {
            cfg.environment = Environment::from_str(&value).map_err(|e| ConfigError::Shape {
                path: ENV_ENVIRONMENT.to_string(),
                reason: e.to_string(),
            })?;
        }
        Ok(cfg)
    }

    /// Builds a configuration from override layers applied over the
    /// defaults of the project type they select.
    pub fn from_layers(layers: impl IntoIterator<Item = Table>) -> Result<Self, ConfigError> {
        let mut merged = Table::new();
        for layer in layers {
            merge_tables(&mut merged, layer);
        }

        let mut project_type = ProjectType::default();
        if let Some(value) = merged.get("project_type") {
            assign(&mut project_type, value, "project_type")?;
        }

        let mut cfg = Self::for_project_type(project_type);
        populate::populate_into(&mut cfg, &merged, "")?;
        Ok(cfg)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let table = toml::from_str::<Table>(text).map_err(|source| ConfigError::Parse {
            path: PathBuf::from("<inline>"),
            source,
        })?;
        Self::from_layers([table])
    }

    /// Directory name of a site variant.
    pub fn site_variant_dir(
        &self,
        site_id: &str,
        php: Option<&str>,
        db: Option<&str>,
    ) -> Result<String, TemplateError> {
        template::render(
            &self.site_variant_dir_pattern,
            &self.placeholders(site_id, php, db),
        )
    }

    /// Host name of a site variant, without protocol.
    pub fn site_variant_url(
        &self,
        site_id: &str,
        php: Option<&str>,
        db: Option<&str>,
    ) -> Result<String, TemplateError> {
        template::render(
            &self.site_variant_url_pattern,
            &self.placeholders(site_id, php, db),
        )
    }

    fn placeholders<'a>(
        &'a self,
        site_id: &'a str,
        php: Option<&'a str>,
        db: Option<&'a str>,
    ) -> Vec<(&'static str, &'a str)> {
        let mut values = vec![
            ("siteBranch", site_id),
            ("baseHost", self.base_host_name.as_str()),
        ];
        if let Some(php) = php {
            values.push(("php", php));
        }
        if let Some(db) = db {
            values.push(("db", db));
        }
        values
    }

    /// Enabled managed extensions, in declaration order.
    pub fn enabled_extensions(&self) -> impl Iterator<Item = &DrupalExtensionConfig> {
        self.managed_drupal_extensions
            .values()
            .filter(|extension| extension.enabled)
    }

    /// Removes a site, keeping the order of the remaining ones.
    pub fn remove_site(&mut self, site_id: &str) -> Option<SiteConfig> {
        self.sites.shift_remove(site_id)
    }
}

impl Entity for ProjectConfig {
    const KIND: EntityKind = EntityKind::Project;
    const FIELDS: &'static [Field<Self>] = &[
        Field::direct("project_type", |c: &mut Self, v, p| assign(&mut c.project_type, v, p)),
        Field::direct("drupal_root_dir", |c: &mut Self, v, p| {
            assign(&mut c.drupal_root_dir, v, p)
        }),
        Field::direct("outer_sites_sub_dir", |c: &mut Self, v, p| {
            assign(&mut c.outer_sites_sub_dir, v, p)
        }),
        Field::direct("reports_dir", |c: &mut Self, v, p| assign(&mut c.reports_dir, v, p)),
        Field::direct("release_dir", |c: &mut Self, v, p| assign(&mut c.release_dir, v, p)),
        Field::direct("bin_dir", |c: &mut Self, v, p| assign(&mut c.bin_dir, v, p)),
        Field::direct("composer_executable", |c: &mut Self, v, p| {
            assign(&mut c.composer_executable, v, p)
        }),
        Field::direct("base_host_name", |c: &mut Self, v, p| {
            assign(&mut c.base_host_name, v, p)
        }),
        Field::direct("default_site_id", |c: &mut Self, v, p| {
            assign(&mut c.default_site_id, v, p)
        }),
        Field::direct("site_variant_url_pattern", |c: &mut Self, v, p| {
            assign(&mut c.site_variant_url_pattern, v, p)
        }),
        Field::direct("site_variant_dir_pattern", |c: &mut Self, v, p| {
            assign(&mut c.site_variant_dir_pattern, v, p)
        }),
        Field::direct("autodetect_managed_drupal_extensions", |c: &mut Self, v, p| {
            assign(&mut c.autodetect_managed_drupal_extensions, v, p)
        }),
        Field::direct("environment", |c: &mut Self, v, p| assign(&mut c.environment, v, p)),
        Field::sub_config_map("sites", EntityKind::Site, |c: &mut Self, v, p| {
            assign_map(&mut c.sites, v, p)
        }),
        Field::sub_config_map("php_variants", EntityKind::PhpVariant, |c: &mut Self, v, p| {
            assign_map(&mut c.php_variants, v, p)
        }),
        Field::sub_config_map(
            "database_servers",
            EntityKind::DatabaseServer,
            |c: &mut Self, v, p| assign_map(&mut c.database_servers, v, p),
        ),
        Field::sub_config_map(
            "managed_drupal_extensions",
            EntityKind::DrupalExtension,
            |c: &mut Self, v, p| assign_map(&mut c.managed_drupal_extensions, v, p),
        ),
        Field::sub_config_map("sass_roots", EntityKind::SassRoot, |c: &mut Self, v, p| {
            assign_map(&mut c.sass_roots, v, p)
        }),
    ];

    fn populate_defaults(&mut self) {
        for (id, site) in &mut self.sites {
            site.id.clone_from(id);
        }
        for (id, variant) in &mut self.php_variants {
            variant.id.clone_from(id);
        }
        for (id, server) in &mut self.database_servers {
            server.id.clone_from(id);
        }
        for (id, extension) in &mut self.managed_drupal_extensions {
            extension.id.clone_from(id);
        }
        for (id, sass_root) in &mut self.sass_roots {
            sass_root.id.clone_from(id);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteConfig {
    pub id: String,
    pub install_profile_name: String,
    pub machine_name_long: String,
    pub machine_name_short: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            id: String::new(),
            install_profile_name: "standard".to_string(),
            machine_name_long: String::new(),
            machine_name_short: String::new(),
        }
    }
}

impl Entity for SiteConfig {
    const KIND: EntityKind = EntityKind::Site;
    const FIELDS: &'static [Field<Self>] = &[
        Field::direct("install_profile_name", |c: &mut Self, v, p| {
            assign(&mut c.install_profile_name, v, p)
        }),
        Field::direct("machine_name_long", |c: &mut Self, v, p| {
            assign(&mut c.machine_name_long, v, p)
        }),
        Field::direct("machine_name_short", |c: &mut Self, v, p| {
            assign(&mut c.machine_name_short, v, p)
        }),
    ];
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PhpVariantConfig {
    pub id: String,
    pub bin_dir: PathBuf,
    pub php_executable: String,
    pub phpdbg_executable: String,
    pub version: String,
    pub cli_ini_file: String,
    pub fast_cgi_pass: String,
    pub ignore_testing: bool,
}

impl PhpVariantConfig {
    pub fn php_executable(&self) -> PathBuf {
        self.resolve_executable(&self.php_executable, "php")
    }

    pub fn phpdbg_executable(&self) -> PathBuf {
        self.resolve_executable(&self.phpdbg_executable, "phpdbg")
    }

    fn resolve_executable(&self, configured: &str, basename: &str) -> PathBuf {
        if Path::new(configured).is_absolute() {
            return PathBuf::from(configured);
        }
        let name = if configured.is_empty() { basename } else { configured };
        self.bin_dir.join(name)
    }
}

impl Entity for PhpVariantConfig {
    const KIND: EntityKind = EntityKind::PhpVariant;
    const FIELDS: &'static [Field<Self>] = &[
        Field::direct("bin_dir", |c: &mut Self, v, p| assign(&mut c.bin_dir, v, p)),
        Field::direct("php_executable", |c: &mut Self, v, p| {
            assign(&mut c.php_executable, v, p)
        }),
        Field::direct("phpdbg_executable", |c: &mut Self, v, p| {
            assign(&mut c.phpdbg_executable, v, p)
        }),
        Field::direct("version", |c: &mut Self, v, p| assign(&mut c.version, v, p)),
        Field::direct("cli_ini_file", |c: &mut Self, v, p| assign(&mut c.cli_ini_file, v, p)),
        Field::direct("fast_cgi_pass", |c: &mut Self, v, p| {
            assign(&mut c.fast_cgi_pass, v, p)
        }),
        Field::direct("ignore_testing", |c: &mut Self, v, p| {
            assign(&mut c.ignore_testing, v, p)
        }),
    ];
}

/// Connection parameters are opaque to the orchestrator; they are carried for
/// the external tools that talk to the database.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatabaseServerConfig {
    pub id: String,
    pub driver: String,
    pub host: String,
    pub port: Option<u16>,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
}

impl Default for DatabaseServerConfig {
    fn default() -> Self {
        Self {
            id: String::new(),
            driver: "mysql".to_string(),
            host: "127.0.0.1".to_string(),
            port: None,
            username: String::new(),
            password: String::new(),
        }
    }
}

impl Entity for DatabaseServerConfig {
    const KIND: EntityKind = EntityKind::DatabaseServer;
    const FIELDS: &'static [Field<Self>] = &[
        Field::direct("driver", |c: &mut Self, v, p| assign(&mut c.driver, v, p)),
        Field::direct("host", |c: &mut Self, v, p| assign(&mut c.host, v, p)),
        Field::direct("port", |c: &mut Self, v, p| assign(&mut c.port, v, p)),
        Field::direct("username", |c: &mut Self, v, p| assign(&mut c.username, v, p)),
        Field::direct("password", |c: &mut Self, v, p| assign(&mut c.password, v, p)),
    ];
}

/// A Drupal extension whose lint and test lifecycle this project controls.
///
/// `has_git`, `has_scss` and `has_type_script` are detected during discovery
/// and are never read from configuration input.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrupalExtensionConfig {
    pub id: String,
    pub enabled: bool,
    pub path: PathBuf,
    pub package_vendor: String,
    pub package_name: String,
    pub has_git: bool,
    pub has_scss: bool,
    pub has_type_script: bool,
    pub phpcs: PhpcsConfig,
}

impl Default for DrupalExtensionConfig {
    fn default() -> Self {
        Self {
            id: String::new(),
            enabled: true,
            path: PathBuf::new(),
            package_vendor: String::new(),
            package_name: String::new(),
            has_git: false,
            has_scss: false,
            has_type_script: false,
            phpcs: PhpcsConfig::default(),
        }
    }
}

impl DrupalExtensionConfig {
    /// `vendor/name`, the key used in the dependency lock.
    pub fn package_id(&self) -> String {
        format!("{}/{}", self.package_vendor, self.package_name)
    }
}

impl Entity for DrupalExtensionConfig {
    const KIND: EntityKind = EntityKind::DrupalExtension;
    const FIELDS: &'static [Field<Self>] = &[
        Field::direct("enabled", |c: &mut Self, v, p| assign(&mut c.enabled, v, p)),
        Field::direct("path", |c: &mut Self, v, p| assign(&mut c.path, v, p)),
        Field::direct("package_vendor", |c: &mut Self, v, p| {
            assign(&mut c.package_vendor, v, p)
        }),
        Field::direct("package_name", |c: &mut Self, v, p| {
            assign(&mut c.package_name, v, p)
        }),
        Field::sub_config("phpcs", EntityKind::Phpcs, |c: &mut Self, v, p| {
            assign_sub(&mut c.phpcs, v, p)
        }),
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhpcsConfig {
    pub paths: Vec<String>,
    pub standard: String,
    pub fail_on: FailOn,
    pub reporters: Vec<String>,
    pub ignore: Vec<String>,
    pub extensions: Vec<String>,
}

impl Default for PhpcsConfig {
    fn default() -> Self {
        Self {
            paths: Vec::new(),
            standard: "Drupal".to_string(),
            fail_on: FailOn::Warning,
            reporters: vec!["verbose".to_string()],
            ignore: Vec::new(),
            extensions: Vec::new(),
        }
    }
}

impl Entity for PhpcsConfig {
    const KIND: EntityKind = EntityKind::Phpcs;
    const FIELDS: &'static [Field<Self>] = &[
        Field::direct("paths", |c: &mut Self, v, p| assign(&mut c.paths, v, p)),
        Field::direct("standard", |c: &mut Self, v, p| assign(&mut c.standard, v, p)),
        Field::direct("fail_on", |c: &mut Self, v, p| assign(&mut c.fail_on, v, p)),
        Field::direct("reporters", |c: &mut Self, v, p| assign(&mut c.reporters, v, p)),
        Field::direct("ignore", |c: &mut Self, v, p| assign(&mut c.ignore, v, p)),
        Field::direct("extensions", |c: &mut Self, v, p| assign(&mut c.extensions, v, p)),
    ];
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SassRootConfig {
    pub id: String,
    pub path: PathBuf,
    pub config_file: String,
}

impl Entity for SassRootConfig {
    const KIND: EntityKind = EntityKind::SassRoot;
    const FIELDS: &'static [Field<Self>] = &[
        Field::direct("path", |c: &mut Self, v, p| assign(&mut c.path, v, p)),
        Field::direct("config_file", |c: &mut Self, v, p| assign(&mut c.config_file, v, p)),
    ];
}

fn read_layer(path: &Path) -> Result<Table, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str::<Table>(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"
        drupal_root_dir = "web"
        base_host_name = "test"

        [sites.default]
        install_profile_name = "minimal"

        [sites.blog]

        [php_variants.php7]
        bin_dir = "/opt/php7/bin"

        [php_variants.php8]
        bin_dir = "/opt/php8/bin"
        php_executable = "/usr/local/bin/php8"

        [database_servers.pgsql]
        driver = "pgsql"

        [database_servers.mysql]

        [managed_drupal_extensions.foo]
        enabled = false

        [managed_drupal_extensions.bar.phpcs]
        standard = "PSR2"
        fail_on = "never"

        [sass_roots.theme]
        path = "themes/custom/theme"
    "#;

    #[test]
    fn populates_defaults_and_overrides() {
        let cfg = ProjectConfig::from_toml_str(FIXTURE).expect("fixture should populate");
        assert_eq!(cfg.drupal_root_dir, PathBuf::from("web"));
        assert_eq!(cfg.reports_dir, PathBuf::from("reports"));
        assert_eq!(cfg.project_type, ProjectType::Incubator);
        assert_eq!(cfg.site_variant_url_pattern, "{siteBranch}.{php}.{db}.{baseHost}");
        assert_eq!(cfg.sites["default"].install_profile_name, "minimal");
        assert_eq!(cfg.sites["blog"].install_profile_name, "standard");
        assert_eq!(cfg.database_servers["mysql"].driver, "mysql");
        assert_eq!(cfg.database_servers["pgsql"].driver, "pgsql");
    }

    #[test]
    fn mappings_keep_declaration_order() {
        let cfg = ProjectConfig::from_toml_str(FIXTURE).unwrap();
        let servers: Vec<_> = cfg.database_servers.keys().cloned().collect();
        assert_eq!(servers, vec!["pgsql", "mysql"]);
    }

    #[test]
    fn every_mapping_entry_carries_its_key_as_id() {
        let cfg = ProjectConfig::from_toml_str(FIXTURE).unwrap();
        assert!(cfg.sites.iter().all(|(k, v)| *k == v.id));
        assert!(cfg.php_variants.iter().all(|(k, v)| *k == v.id));
        assert!(cfg.database_servers.iter().all(|(k, v)| *k == v.id));
        assert!(cfg.managed_drupal_extensions.iter().all(|(k, v)| *k == v.id));
        assert!(cfg.sass_roots.iter().all(|(k, v)| *k == v.id));
    }

    #[test]
    fn sub_configs_are_populated_even_when_absent() {
        let cfg = ProjectConfig::from_toml_str(FIXTURE).unwrap();
        let foo = &cfg.managed_drupal_extensions["foo"];
        assert!(!foo.enabled);
        assert_eq!(foo.phpcs, PhpcsConfig::default());

        let bar = &cfg.managed_drupal_extensions["bar"];
        assert!(bar.enabled);
        assert_eq!(bar.phpcs.standard, "PSR2");
        assert_eq!(bar.phpcs.fail_on, FailOn::Never);
        assert_eq!(bar.phpcs.reporters, vec!["verbose"]);
    }

    #[test]
    fn detected_fields_are_not_read_from_input() {
        let cfg = ProjectConfig::from_toml_str(
            "[managed_drupal_extensions.foo]\nhas_git = true\nhas_scss = true\n",
        )
        .unwrap();
        let foo = &cfg.managed_drupal_extensions["foo"];
        assert!(!foo.has_git);
        assert!(!foo.has_scss);
    }

    #[test]
    fn customer_projects_get_their_own_patterns() {
        let cfg = ProjectConfig::from_toml_str("project_type = \"customer\"\n").unwrap();
        assert_eq!(cfg.site_variant_dir_pattern, "{siteBranch}");
        assert_eq!(
            cfg.site_variant_url("foo", None, None).unwrap(),
            "foo.localhost"
        );
    }

    #[test]
    fn site_variant_dirs_follow_the_project_type() {
        let incubator = ProjectConfig::from_toml_str("").unwrap();
        assert_eq!(
            incubator
                .site_variant_dir("default", Some("php7"), Some("mysql"))
                .unwrap(),
            "default.php7.mysql"
        );
        assert!(matches!(
            incubator.site_variant_dir("default", None, Some("mysql")),
            Err(TemplateError::Unresolved { ref placeholder, .. }) if placeholder == "php"
        ));

        let customer = ProjectConfig::from_toml_str("project_type = \"customer\"\n").unwrap();
        assert_eq!(
            customer
                .site_variant_dir("blog", Some("php7"), Some("mysql"))
                .unwrap(),
            "blog"
        );
    }

    #[test]
    fn later_layers_win_field_by_field() {
        let base = toml::from_str::<Table>("reports_dir = 'a'\n[sites.default]\nmachine_name_long = 'x'\n").unwrap();
        let overlay = toml::from_str::<Table>("[sites.default]\ninstall_profile_name = 'minimal'\n").unwrap();
        let cfg = ProjectConfig::from_layers([base, overlay]).unwrap();
        assert_eq!(cfg.reports_dir, PathBuf::from("a"));
        assert_eq!(cfg.sites["default"].machine_name_long, "x");
        assert_eq!(cfg.sites["default"].install_profile_name, "minimal");
    }

    #[test]
    fn malformed_sub_config_is_a_shape_error() {
        let err = ProjectConfig::from_toml_str("[managed_drupal_extensions.foo]\nphpcs = 'Drupal'\n")
            .unwrap_err();
        match err {
            ConfigError::Shape { path, .. } => {
                assert_eq!(path, "managed_drupal_extensions.foo.phpcs")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn resolves_php_executables() {
        let cfg = ProjectConfig::from_toml_str(FIXTURE).unwrap();
        assert_eq!(
            cfg.php_variants["php7"].php_executable(),
            PathBuf::from("/opt/php7/bin/php")
        );
        assert_eq!(
            cfg.php_variants["php7"].phpdbg_executable(),
            PathBuf::from("/opt/php7/bin/phpdbg")
        );
        assert_eq!(
            cfg.php_variants["php8"].php_executable(),
            PathBuf::from("/usr/local/bin/php8")
        );
    }

    #[test]
    fn loads_local_overrides_next_to_the_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drupalflow.toml");
        std::fs::write(&path, "reports_dir = 'reports'\nbin_dir = 'bin'\n").unwrap();
        std::fs::write(dir.path().join(LOCAL_CONFIG_FILE), "reports_dir = 'out'\n").unwrap();

        let cfg = ProjectConfig::load_from_file(&path).unwrap();
        assert_eq!(cfg.reports_dir, PathBuf::from("out"));
        assert_eq!(cfg.bin_dir, PathBuf::from("bin"));
    }

    #[test]
    fn missing_config_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ProjectConfig::load_from_file(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn remove_site_keeps_order() {
        let mut cfg = ProjectConfig::from_toml_str("[sites.a]\n[sites.b]\n[sites.c]\n").unwrap();
        assert!(cfg.remove_site("b").is_some());
        assert!(cfg.remove_site("b").is_none());
        let ids: Vec<_> = cfg.sites.keys().cloned().collect();
        assert_eq!(ids, vec!["a", "c"]);
    }
}
