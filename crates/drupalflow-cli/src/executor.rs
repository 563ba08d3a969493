use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use drupalflow_core::{
    site, CommandRef, DrupalExtensionConfig, ExternalCommand, Pipeline, PipelineError,
    PrimaryCommand, ProjectConfig,
};
use drupalflow_lint::LintSelection;
use drupalflow_matrix::runner::{self, RunnerContext};
use drupalflow_matrix::MatrixRequest;
use tracing::{info, instrument};

use crate::discovery;
use crate::styles as s;

/// A parsed command line, independent of clap.
#[derive(Debug, Clone, Default)]
pub struct Invocation {
    pub command: Option<CommandRef>,
    pub args: Vec<String>,
    pub site: Option<String>,
    pub php: Vec<String>,
    pub db: Vec<String>,
    pub extensions: Vec<String>,
    pub dry_run: bool,
}

/// Loaded project state for one process.
#[derive(Debug)]
pub struct Session {
    pub cfg: ProjectConfig,
    pub working_dir: PathBuf,
    pub config_file: PathBuf,
}

/// What a command resolves to before anything is executed.
#[derive(Debug)]
pub enum Action {
    Pipeline(Pipeline),
    Print(String),
    DeleteSite(String),
}

/// Runs a Drupalflow command.
#[instrument(skip(session))]
pub fn run(session: &mut Session, invocation: &Invocation) -> Result<()> {
    match plan(session, invocation)? {
        Action::Print(text) => {
            println!("{text}");
            Ok(())
        }
        Action::Pipeline(pipeline) => run_pipeline(pipeline, invocation.dry_run),
        Action::DeleteSite(site_id) if invocation.dry_run => {
            println!("site:delete {site_id} (dry run)");
            Ok(())
        }
        Action::DeleteSite(site_id) => {
            site::delete_site(
                &mut session.cfg,
                &session.working_dir,
                &session.config_file,
                &site_id,
            )?;
            Ok(())
        }
    }
}

pub fn plan(session: &mut Session, invocation: &Invocation) -> Result<Action> {
    let command = invocation
        .command
        .as_ref()
        .ok_or_else(|| anyhow!("no command given"))?;
    let selector = command.effective_selector();

    match (command.primary, selector) {
        (PrimaryCommand::Lint, selector) => {
            let selection: LintSelection = selector.parse()?;
            lint(session, invocation, selection).map(Action::Pipeline)
        }
        (PrimaryCommand::Test, "drupal") => test_drupal(session, invocation).map(Action::Pipeline),
        (PrimaryCommand::Test, "clean") => {
            let ctx = RunnerContext::new(&session.working_dir);
            Ok(single_step(
                "test.clean",
                runner::clean_command(&session.cfg, &ctx),
            ))
        }
        (PrimaryCommand::Test, "list") => {
            let ctx = RunnerContext::new(&session.working_dir);
            Ok(single_step("test.list", runner::list_command(&session.cfg, &ctx)))
        }
        (PrimaryCommand::Site, "install") => {
            let site_id = site_argument(session, invocation);
            let pipeline =
                site::site_install_pipeline(&session.cfg, &session.working_dir, &site_id)?;
            Ok(Action::Pipeline(pipeline))
        }
        (PrimaryCommand::Site, "delete") => {
            Ok(Action::DeleteSite(site_argument(session, invocation)))
        }
        (PrimaryCommand::Extensions, "list") => {
            let mut registry = discovery::composer_registry(&session.cfg, &session.working_dir);
            let extensions = registry
                .managed_extensions(&mut session.cfg)
                .context("managed extension discovery failed")?;
            Ok(Action::Print(render_extensions(&extensions)))
        }
        (PrimaryCommand::Config, "show") => {
            let json = serde_json::to_string_pretty(&session.cfg)?;
            Ok(Action::Print(json))
        }
        _ => bail!("unsupported command '{}'", command.canonical()),
    }
}

fn single_step(name: &str, command: ExternalCommand) -> Action {
    Action::Pipeline(Pipeline::new().add_task(name, command))
}

/// First positional argument, then `--site`, then the default site.
fn site_argument(session: &Session, invocation: &Invocation) -> String {
    invocation
        .args
        .first()
        .or(invocation.site.as_ref())
        .cloned()
        .unwrap_or_else(|| session.cfg.default_site_id.clone())
}

fn lint(
    session: &mut Session,
    invocation: &Invocation,
    selection: LintSelection,
) -> Result<Pipeline> {
    let names: Vec<&String> = invocation
        .extensions
        .iter()
        .chain(invocation.args.iter())
        .collect();

    let mut registry = discovery::composer_registry(&session.cfg, &session.working_dir);
    let names = registry.validate_extension_names(&mut session.cfg, &names)?;
    let extensions: Vec<&DrupalExtensionConfig> = names
        .iter()
        .filter_map(|name| session.cfg.managed_drupal_extensions.get(name))
        .collect();

    let fallback = discovery::fallback_resolver(&session.working_dir);
    let plan = drupalflow_lint::plan(
        &session.cfg,
        &session.working_dir,
        &fallback,
        &extensions,
        selection,
    );
    Ok(plan.into_pipeline())
}

fn test_drupal(session: &Session, invocation: &Invocation) -> Result<Pipeline> {
    let request = MatrixRequest {
        site: invocation.site.clone(),
        php_variants: invocation.php.clone(),
        database_servers: invocation.db.clone(),
        subjects: invocation.args.clone(),
    };
    let items = drupalflow_matrix::expand(&session.cfg, &request)?;
    let ctx = RunnerContext::new(&session.working_dir);
    Ok(runner::test_pipeline(&session.cfg, &ctx, &items))
}

fn render_extensions(extensions: &[&DrupalExtensionConfig]) -> String {
    extensions
        .iter()
        .map(|extension| {
            format!(
                "{}\t{}\t{}",
                extension.id,
                extension.package_id(),
                extension.path.display()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Runs `pipeline`, printing the failing step's captured output on failure.
pub fn run_pipeline(pipeline: Pipeline, dry_run: bool) -> Result<()> {
    if dry_run {
        for name in pipeline.names() {
            println!("{}{}{:#}", s::STEP, name, s::STEP);
        }
        return Ok(());
    }

    match pipeline.run() {
        Ok(report) => {
            info!(target: "drupalflow", "{} steps succeeded", report.steps.len());
            Ok(())
        }
        Err(PipelineError::StepFailed { step, outcome }) => {
            let payload = outcome.payload();
            if !payload.is_empty() {
                eprintln!("{}{}{:#}", s::DIM, payload.trim_end(), s::DIM);
            }
            eprintln!("{}{} failed{:#}", s::ERROR, step, s::ERROR);
            Err(anyhow!(
                "step '{}' failed with exit code {:?}",
                step,
                outcome.exit_code()
            ))
        }
        Err(err) => Err(err.into()),
    }
}
