//! Drupal core test runner invocations for expanded work items.

use std::path::{Path, PathBuf};

use drupalflow_core::constants::{ENV_PHP_EXECUTABLE, RUN_TESTS_SCRIPT};
use drupalflow_core::{ExternalCommand, Pipeline, ProjectConfig};
use tracing::debug;

use crate::{SetupItem, TestRunItem, WorkItem};

/// Where commands run and which PHP interpreter hosts `run-tests.sh`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerContext {
    pub working_dir: PathBuf,
    pub host_php: String,
}

impl RunnerContext {
    /// Uses `DRUPALFLOW_PHP_EXECUTABLE` as host interpreter, `php` otherwise.
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        let host_php = std::env::var(ENV_PHP_EXECUTABLE).unwrap_or_else(|_| "php".to_string());
        Self::with_host_php(working_dir, host_php)
    }

    pub fn with_host_php(working_dir: impl Into<PathBuf>, host_php: impl Into<String>) -> Self {
        Self {
            working_dir: working_dir.into(),
            host_php: host_php.into(),
        }
    }

    fn drupal_root(&self, cfg: &ProjectConfig) -> PathBuf {
        drupal_root(cfg, &self.working_dir)
    }

    fn run_tests(&self, cfg: &ProjectConfig) -> ExternalCommand {
        ExternalCommand::new(self.host_php.as_str())
            .arg(RUN_TESTS_SCRIPT)
            .current_dir(self.drupal_root(cfg))
    }
}

fn drush(cfg: &ProjectConfig, ctx: &RunnerContext) -> String {
    ctx.working_dir
        .join(&cfg.bin_dir)
        .join("drush")
        .to_string_lossy()
        .into_owned()
}

/// `drush pm-enable` for the setup item's site variant.
pub fn setup_command(
    cfg: &ProjectConfig,
    ctx: &RunnerContext,
    item: &SetupItem,
) -> ExternalCommand {
    ExternalCommand::new(drush(cfg, ctx))
        .arg(format!("--root={}", ctx.drupal_root(cfg).display()))
        .arg(format!("--uri={}", item.url))
        .args(["--yes", "pm-enable"])
        .args(item.modules.iter().cloned())
        .current_dir(&ctx.working_dir)
}

pub fn test_run_command(
    cfg: &ProjectConfig,
    ctx: &RunnerContext,
    item: &TestRunItem,
) -> ExternalCommand {
    ctx.run_tests(cfg)
        .args([
            "--php".to_string(),
            item.php_executable.to_string_lossy().into_owned(),
            "--url".to_string(),
            format!("http://{}", item.url),
            "--xml".to_string(),
            report_dir(ctx, item).to_string_lossy().into_owned(),
            "--color".to_string(),
            "--non-html".to_string(),
        ])
        .args(item.subjects.iter().cloned())
}

fn report_dir(ctx: &RunnerContext, item: &TestRunItem) -> PathBuf {
    ctx.working_dir.join(&item.report_dir)
}

pub fn command_for(cfg: &ProjectConfig, ctx: &RunnerContext, item: &WorkItem) -> ExternalCommand {
    match item {
        WorkItem::Setup(setup) => setup_command(cfg, ctx, setup),
        WorkItem::TestRun(run) => test_run_command(cfg, ctx, run),
    }
}

/// One step per work item, preceded by creation of the report directories.
pub fn test_pipeline(cfg: &ProjectConfig, ctx: &RunnerContext, items: &[WorkItem]) -> Pipeline {
    let report_dirs: Vec<PathBuf> = items
        .iter()
        .filter_map(|item| match item {
            WorkItem::TestRun(run) => Some(report_dir(ctx, run)),
            WorkItem::Setup(_) => None,
        })
        .collect();

    let mut pipeline = Pipeline::new().add_code("prepare.reports", move || {
        for dir in &report_dirs {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    });

    for item in items {
        let command = command_for(cfg, ctx, item);
        debug!("{}: {}", item.id(), command.command_line());
        pipeline.push_task(item.id(), command);
    }
    pipeline
}

/// `run-tests.sh --clean`: removes leftovers of interrupted test runs.
pub fn clean_command(cfg: &ProjectConfig, ctx: &RunnerContext) -> ExternalCommand {
    ctx.run_tests(cfg).arg("--clean")
}

/// `run-tests.sh --list`: prints the available test groups and classes.
pub fn list_command(cfg: &ProjectConfig, ctx: &RunnerContext) -> ExternalCommand {
    ctx.run_tests(cfg).arg("--list")
}

/// Path of the Drupal root as seen from `working_dir`.
pub fn drupal_root(cfg: &ProjectConfig, working_dir: &Path) -> PathBuf {
    working_dir.join(&cfg.drupal_root_dir)
}
