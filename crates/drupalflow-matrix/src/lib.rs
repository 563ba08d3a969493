//! Expansion of the site × PHP variant × database server test matrix.
//!
//! [`expand`] turns a [`MatrixRequest`] into an ordered list of [`WorkItem`]s:
//! database servers outermost, PHP variants innermost, with one setup item
//! ahead of the first test run on each database server.

use std::path::PathBuf;

use drupalflow_core::constants::TEST_SUPPORT_MODULE;
use drupalflow_core::ids::{self, IdKind};
use drupalflow_core::{ProjectConfig, TemplateError, UnknownIdError};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, instrument};

pub mod runner;

/// User input for one `test:drupal` run. Empty id lists select everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatrixRequest {
    pub site: Option<String>,
    pub php_variants: Vec<String>,
    pub database_servers: Vec<String>,
    pub subjects: Vec<String>,
}

/// Enables the test support module on one database server's site variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SetupItem {
    pub id: String,
    pub database_server: String,
    pub url: String,
    pub modules: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestRunItem {
    pub id: String,
    pub site_id: String,
    pub php_variant: String,
    pub database_server: String,
    pub url: String,
    pub php_executable: PathBuf,
    pub subjects: Vec<String>,
    /// Scoped to the (php, db) pair; relative to the working directory.
    pub report_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum WorkItem {
    Setup(SetupItem),
    TestRun(TestRunItem),
}

impl WorkItem {
    pub fn id(&self) -> &str {
        match self {
            Self::Setup(item) => &item.id,
            Self::TestRun(item) => &item.id,
        }
    }

    pub fn url(&self) -> &str {
        match self {
            Self::Setup(item) => &item.url,
            Self::TestRun(item) => &item.url,
        }
    }
}

#[derive(Debug, Error)]
pub enum MatrixError {
    #[error(transparent)]
    UnknownId(#[from] UnknownIdError),
    #[error("at least one test subject is required")]
    NoSubjects,
    #[error(transparent)]
    Template(#[from] TemplateError),
}

/// Flattens comma-separated subject arguments, dropping blanks.
pub fn split_subjects<S: AsRef<str>>(args: &[S]) -> Vec<String> {
    args.iter()
        .flat_map(|arg| arg.as_ref().split(','))
        .map(str::trim)
        .filter(|subject| !subject.is_empty())
        .map(str::to_string)
        .collect()
}

/// Validates the request and expands it. Nothing is built when any id is
/// unknown or no subject is given.
#[instrument(skip(cfg))]
pub fn expand(cfg: &ProjectConfig, req: &MatrixRequest) -> Result<Vec<WorkItem>, MatrixError> {
    let site_id = match req.site.as_deref().map(str::trim) {
        Some(site) if !site.is_empty() => ids::get(IdKind::Site, site, &cfg.sites)?.id.clone(),
        _ => cfg.default_site_id.clone(),
    };
    let php_variants = ids::select(IdKind::PhpVariant, &req.php_variants, &cfg.php_variants)?;
    let database_servers = ids::select(
        IdKind::DatabaseServer,
        &req.database_servers,
        &cfg.database_servers,
    )?;

    let subjects = split_subjects(&req.subjects);
    if subjects.is_empty() {
        return Err(MatrixError::NoSubjects);
    }

    let mut items = Vec::with_capacity(database_servers.len() * (php_variants.len() + 1));
    for db in &database_servers {
        for (index, php) in php_variants.iter().enumerate() {
            let url =
                cfg.site_variant_url(&site_id, Some(php.id.as_str()), Some(db.id.as_str()))?;

            if index == 0 {
                items.push(WorkItem::Setup(SetupItem {
                    id: format!("enable.{}.{}", TEST_SUPPORT_MODULE, db.id),
                    database_server: db.id.clone(),
                    url: url.clone(),
                    modules: vec![TEST_SUPPORT_MODULE.to_string()],
                }));
            }

            items.push(WorkItem::TestRun(TestRunItem {
                id: format!("run-tests.{}.{}", php.id, db.id),
                site_id: site_id.clone(),
                php_variant: php.id.clone(),
                database_server: db.id.clone(),
                url,
                php_executable: php.php_executable(),
                subjects: subjects.clone(),
                report_dir: cfg
                    .reports_dir
                    .join("tests")
                    .join(format!("{}.{}", php.id, db.id)),
            }));
        }
    }

    debug!("expanded {} work items", items.len());
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> ProjectConfig {
        ProjectConfig::from_toml_str(
            r#"
            base_host_name = "localhost"

            [sites.default]
            [sites.blog]

            [php_variants.php7]
            bin_dir = "/opt/php7/bin"
            [php_variants.php8]
            bin_dir = "/opt/php8/bin"

            [database_servers.mysql]
            [database_servers.pgsql]
            driver = "pgsql"
            "#,
        )
        .expect("fixture config should parse")
    }

    fn request(subjects: &[&str]) -> MatrixRequest {
        MatrixRequest {
            subjects: subjects.iter().map(|s| s.to_string()).collect(),
            ..MatrixRequest::default()
        }
    }

    #[test]
    fn expands_database_major_with_one_setup_per_server() {
        let items = expand(&fixture(), &request(&["Foo"])).unwrap();
        let ids: Vec<_> = items.iter().map(WorkItem::id).collect();
        assert_eq!(
            ids,
            vec![
                "enable.simpletest.mysql",
                "run-tests.php7.mysql",
                "run-tests.php8.mysql",
                "enable.simpletest.pgsql",
                "run-tests.php7.pgsql",
                "run-tests.php8.pgsql",
            ]
        );
    }

    #[test]
    fn test_runs_carry_url_executable_and_report_dir() {
        let items = expand(&fixture(), &request(&["Foo,Bar", "Baz"])).unwrap();
        let WorkItem::TestRun(run) = &items[4] else {
            panic!("expected a test run, got {:?}", items[4]);
        };
        assert_eq!(run.url, "default.php7.pgsql.localhost");
        assert_eq!(run.php_executable, PathBuf::from("/opt/php7/bin/php"));
        assert_eq!(run.subjects, vec!["Foo", "Bar", "Baz"]);
        assert_eq!(run.report_dir, PathBuf::from("reports/tests/php7.pgsql"));

        let WorkItem::Setup(setup) = &items[3] else {
            panic!("expected a setup item, got {:?}", items[3]);
        };
        assert_eq!(setup.url, "default.php7.pgsql.localhost");
        assert_eq!(setup.modules, vec!["simpletest"]);
    }

    #[test]
    fn explicit_ids_keep_request_order() {
        let req = MatrixRequest {
            site: Some("blog".to_string()),
            php_variants: vec!["php8".to_string()],
            database_servers: vec!["pgsql,mysql".to_string()],
            ..request(&["Foo"])
        };
        let items = expand(&fixture(), &req).unwrap();
        let ids: Vec<_> = items.iter().map(WorkItem::id).collect();
        assert_eq!(
            ids,
            vec![
                "enable.simpletest.pgsql",
                "run-tests.php8.pgsql",
                "enable.simpletest.mysql",
                "run-tests.php8.mysql",
            ]
        );
        assert_eq!(items[1].url(), "blog.php8.pgsql.localhost");
    }

    #[test]
    fn unknown_ids_are_rejected_with_the_known_set() {
        let req = MatrixRequest {
            database_servers: vec!["oracle".to_string()],
            ..request(&["Foo"])
        };
        match expand(&fixture(), &req).unwrap_err() {
            MatrixError::UnknownId(e) => {
                assert_eq!(e.kind, IdKind::DatabaseServer);
                assert_eq!(e.unknown, vec!["oracle"]);
                assert_eq!(e.known, vec!["mysql", "pgsql"]);
            }
            other => panic!("unexpected error: {other}"),
        }

        let req = MatrixRequest {
            site: Some("shop".to_string()),
            ..request(&["Foo"])
        };
        assert!(matches!(
            expand(&fixture(), &req),
            Err(MatrixError::UnknownId(UnknownIdError {
                kind: IdKind::Site,
                ..
            }))
        ));
    }

    #[test]
    fn site_must_name_exactly_one_site() {
        let req = MatrixRequest {
            site: Some("default,blog".to_string()),
            ..request(&["Foo"])
        };
        match expand(&fixture(), &req).unwrap_err() {
            MatrixError::UnknownId(e) => {
                assert_eq!(e.kind, IdKind::Site);
                assert_eq!(e.unknown, vec!["default,blog"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_subjects_fail_before_expansion() {
        assert!(matches!(
            expand(&fixture(), &request(&[])),
            Err(MatrixError::NoSubjects)
        ));
        assert!(matches!(
            expand(&fixture(), &request(&[" , "])),
            Err(MatrixError::NoSubjects)
        ));
    }

    #[test]
    fn unresolved_url_placeholders_are_errors() {
        let mut cfg = fixture();
        cfg.site_variant_url_pattern = "{siteBranch}.{region}.{baseHost}".to_string();
        assert!(matches!(
            expand(&cfg, &request(&["Foo"])),
            Err(MatrixError::Template(_))
        ));
    }

    #[test]
    fn customer_pattern_uses_site_and_host_only() {
        let mut cfg = fixture();
        cfg.site_variant_url_pattern = "{siteBranch}.{baseHost}".to_string();
        let items = expand(&cfg, &request(&["Foo"])).unwrap();
        assert!(items.iter().all(|item| item.url() == "default.localhost"));
    }
}
