use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use clap::Parser;

use drupalflow_core::constants::CONFIG_FILE;
use drupalflow_core::{CommandRef, Environment, ProjectConfig};
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod discovery;
mod executor;
mod styles;

use executor::{Invocation, Session};
use styles as s;

/// The command-line interface for Drupalflow.
#[derive(Debug, Parser)]
#[command(name = "dfl")]
#[command(version)]
#[command(styles = s::get_clap_styles())]
#[command(
    help_template = "{bin} {version}\n\n{about-with-newline}{usage-heading} {usage}\n\n{all-args}{after-help}"
)]
#[command(about = "Lint, test and site orchestration for Drupal projects")]
#[command(
    long_about = "Drupalflow drives the lint, test and site lifecycle of a Drupal project
that hosts managed extensions, several PHP variants and several database servers.

Commands:
  lint[:all|phpcs|scss|ts|es]   Lint managed extensions
  test:drupal <subjects>        Run Drupal tests across the PHP x database matrix
  test:clean                    Clean up leftovers of interrupted test runs
  test:list                     List available test groups and classes
  site:install [id]             Reinstall a site
  site:delete [id]              Delete a site from disk and from the config
  extensions:list               List discovered managed extensions
  config:show                   Print the effective configuration as JSON
"
)]
#[command(
    after_help = "\x1b[1;32mExamples:\x1b[0m\n  \x1b[36mdfl lint\x1b[0m                         \x1b[2m# Lint every managed extension\x1b[0m\n  \x1b[36mdfl lint:phpcs --ext foo\x1b[0m         \x1b[2m# Run phpcs on one extension\x1b[0m\n  \x1b[36mdfl test:drupal Foo --php php8\x1b[0m   \x1b[2m# Test group Foo on PHP 8 against every database\x1b[0m\n  \x1b[36mdfl site install blog\x1b[0m            \x1b[2m# Reinstall the blog site\x1b[0m"
)]
pub(crate) struct Cli {
    /// Command in canonical form, for example: `lint:phpcs`, `test:drupal`
    command: Option<String>,
    /// Optional selector (`dfl site install` style) followed by arguments.
    /// The first value is a selector only when the command has none yet and
    /// the value is one of its selectors.
    args: Vec<String>,
    /// Path to the project config file.
    #[arg(long, default_value = CONFIG_FILE)]
    config: PathBuf,
    /// Site id for test and site commands.
    #[arg(long)]
    site: Option<String>,
    /// PHP variant ids, comma separated. Defaults to all.
    #[arg(long, value_delimiter = ',')]
    php: Vec<String>,
    /// Database server ids, comma separated. Defaults to all.
    #[arg(long, value_delimiter = ',')]
    db: Vec<String>,
    /// Managed extension names for lint commands. Defaults to all enabled.
    #[arg(long = "ext")]
    extensions: Vec<String>,
    /// Execution environment; overrides the config and DRUPALFLOW_ENVIRONMENT.
    #[arg(long)]
    environment: Option<Environment>,
    /// Print the steps that would run instead of running them.
    #[arg(long, default_value_t = false)]
    dry_run: bool,
}

impl Cli {
    /// Splits positionals into the command reference and its arguments.
    ///
    /// `dfl site delete blog` reads `delete` as the selector because it is one
    /// of `site`'s selectors; `dfl test Foo` keeps `Foo` as an argument.
    fn invocation(&self) -> Result<Invocation> {
        let mut args = self.args.clone();
        let command = self
            .command
            .as_deref()
            .map(|text| {
                CommandRef::from_str(text)
                    .map_err(|e| anyhow!("failed to parse command '{}': {e}", text))
            })
            .transpose()?
            .map(|mut command| {
                let joins = command.selector.is_none()
                    && args
                        .first()
                        .is_some_and(|first| command.primary.is_selector(first));
                if joins {
                    command.selector = Some(args.remove(0));
                }
                command
            });

        Ok(Invocation {
            command,
            args,
            site: self.site.clone(),
            php: self.php.clone(),
            db: self.db.clone(),
            extensions: self.extensions.clone(),
            dry_run: self.dry_run,
        })
    }
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let cli = Cli::parse();
    debug!("parsed cli arguments: {:?}", cli);

    if cli.command.is_none() {
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    }

    let invocation = cli.invocation()?;
    let working_dir = std::env::current_dir().context("unable to read the working directory")?;
    let mut session = load_session(&cli, &working_dir)?;

    executor::run(&mut session, &invocation)
}

fn load_session(cli: &Cli, working_dir: &Path) -> Result<Session> {
    let config_file = working_dir.join(&cli.config);
    let mut cfg = ProjectConfig::load_from_file(&config_file)
        .with_context(|| format!("unable to load config '{}'", config_file.display()))?;
    if let Some(environment) = cli.environment {
        cfg.environment = environment;
    }
    debug!("environment: {}", cfg.environment);

    Ok(Session {
        cfg,
        working_dir: working_dir.to_path_buf(),
        config_file,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use drupalflow_core::PrimaryCommand;

    fn parse(argv: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("dfl").chain(argv.iter().copied())).unwrap()
    }

    #[test]
    fn separate_selector_is_joined_to_the_command() {
        let invocation = parse(&["test", "drupal", "Foo,Bar"]).invocation().unwrap();
        let command = invocation.command.unwrap();
        assert_eq!(command.canonical(), "test:drupal");
        assert_eq!(invocation.args, vec!["Foo,Bar"]);
    }

    #[test]
    fn canonical_command_keeps_every_argument() {
        let invocation = parse(&["lint:phpcs", "foo", "bar"]).invocation().unwrap();
        assert_eq!(invocation.command.unwrap().primary, PrimaryCommand::Lint);
        assert_eq!(invocation.args, vec!["foo", "bar"]);
    }

    #[test]
    fn variant_lists_are_comma_separated() {
        let cli = parse(&[
            "test:drupal",
            "Foo",
            "--php",
            "php7,php8",
            "--db",
            "mysql",
            "--environment",
            "ci",
            "--dry-run",
        ]);
        assert_eq!(cli.php, vec!["php7", "php8"]);
        assert_eq!(cli.db, vec!["mysql"]);
        assert_eq!(cli.environment, Some(Environment::Ci));
        assert!(cli.invocation().unwrap().dry_run);
    }

    #[test]
    fn non_selector_positionals_stay_arguments() {
        let invocation = parse(&["test", "Foo"]).invocation().unwrap();
        assert_eq!(invocation.command.unwrap().effective_selector(), "drupal");
        assert_eq!(invocation.args, vec!["Foo"]);

        let invocation = parse(&["lint", "myext"]).invocation().unwrap();
        assert_eq!(invocation.command.unwrap().effective_selector(), "all");
        assert_eq!(invocation.args, vec!["myext"]);

        let invocation = parse(&["site", "delete", "blog"]).invocation().unwrap();
        assert_eq!(invocation.command.unwrap().canonical(), "site:delete");
        assert_eq!(invocation.args, vec!["blog"]);
    }

    #[test]
    fn unknown_commands_are_rejected() {
        let err = parse(&["deploy"]).invocation().unwrap_err();
        assert!(err.to_string().contains("failed to parse command 'deploy'"));
    }

    #[test]
    fn environment_flag_overrides_the_config() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "environment = \"dev\"\n").unwrap();
        let cli = parse(&["config", "--environment", "git-hook"]);
        let session = load_session(&cli, dir.path()).unwrap();
        assert_eq!(session.cfg.environment, Environment::GitHook);
        assert_eq!(session.config_file, dir.path().join(CONFIG_FILE));
    }
}
