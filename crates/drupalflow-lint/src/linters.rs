//! Per-tool lint specifications and their command lines.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

use drupalflow_core::constants::NODE_BIN_PREFIX;
use drupalflow_core::{
    DrupalExtensionConfig, Environment, ExternalCommand, FailOn, FallbackResolver,
    NoFallbackFileError, ProjectConfig,
};
use serde::Serialize;
use tracing::warn;

/// Ignore patterns every phpcs run starts from.
const PHPCS_DEFAULT_IGNORE: &[&str] =
    &["node_modules/", ".nvmrc", ".gitignore", "*.json", "*.scss"];

/// Staged-file runs never see compiled-from sources.
const PHPCS_GIT_HOOK_IGNORE: &[&str] = &["*.ts", "*.rb"];

const PHPCS_BASE_EXTENSIONS: &[&str] = &["php/PHP", "inc/PHP"];

const PHPCS_DRUPAL_EXTENSIONS: &[&str] = &[
    "engine/PHP",
    "install/PHP",
    "module/PHP",
    "profile/PHP",
    "theme/PHP",
    "js/JS",
    "css/CSS",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Linter {
    Phpcs,
    ScssLint,
    TsLint,
    EsLint,
}

impl Linter {
    /// Short name used in step ids and selectors.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Phpcs => "phpcs",
            Self::ScssLint => "scss",
            Self::TsLint => "ts",
            Self::EsLint => "es",
        }
    }
}

impl Display for Linter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Reporter {
    /// Human readable output on the terminal.
    Verbose,
    /// Checkstyle XML written to `destination`.
    Checkstyle { destination: PathBuf },
}

/// Everything needed to run one linter over one extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LintSpec {
    pub linter: Linter,
    pub extension: String,
    pub working_dir: PathBuf,
    pub executable: String,
    pub paths: Vec<String>,
    pub ignore: Vec<String>,
    pub extensions: Vec<String>,
    pub standard: Option<String>,
    pub fail_on: FailOn,
    pub reporters: Vec<Reporter>,
    pub config_file: Option<PathBuf>,
    pub env: BTreeMap<String, String>,
}

impl LintSpec {
    fn new(linter: Linter, extension: &DrupalExtensionConfig, executable: String) -> Self {
        Self {
            linter,
            extension: extension.id.clone(),
            working_dir: extension.path.clone(),
            executable,
            paths: Vec::new(),
            ignore: Vec::new(),
            extensions: Vec::new(),
            standard: None,
            fail_on: FailOn::Warning,
            reporters: vec![Reporter::Verbose],
            config_file: None,
            env: BTreeMap::new(),
        }
    }

    pub fn step_name(&self) -> String {
        format!("lint.{}.{}", self.linter, self.extension)
    }

    pub fn to_command(&self) -> ExternalCommand {
        let command = match self.linter {
            Linter::Phpcs => self.phpcs_command(),
            Linter::ScssLint => ExternalCommand::new(self.executable.as_str())
                .args(["exec", "scss-lint", "--format=Default"])
                .args(self.ignore.iter().map(|pattern| format!("--exclude={pattern}")))
                .args(self.paths.iter().cloned()),
            // tslint exits 0 on warnings and prints nothing when clean.
            Linter::TsLint => ExternalCommand::new(self.executable.as_str())
                .args(self.config_arg())
                .args(["--format", "verbose"])
                .args(self.paths.iter().cloned())
                .fail_on_output(self.fail_on == FailOn::Warning),
            Linter::EsLint => {
                let mut command = ExternalCommand::new(self.executable.as_str())
                    .args(self.config_arg())
                    .args(["--format", "stylish"]);
                if self.fail_on == FailOn::Warning {
                    command = command.args(["--max-warnings", "0"]);
                }
                command.args(self.paths.iter().cloned())
            }
        };

        let command = self
            .env
            .iter()
            .fold(command, |command, (key, value)| command.env(key.as_str(), value.as_str()));

        command
            .current_dir(&self.working_dir)
            .capture_output(true)
            .ignore_failure(self.fail_on == FailOn::Never)
    }

    fn config_arg(&self) -> Vec<String> {
        match &self.config_file {
            Some(file) => vec!["--config".to_string(), file.to_string_lossy().into_owned()],
            None => Vec::new(),
        }
    }

    fn phpcs_command(&self) -> ExternalCommand {
        let mut command = ExternalCommand::new(self.executable.as_str());
        if let Some(standard) = &self.standard {
            command = command.arg(format!("--standard={standard}"));
        }
        if !self.extensions.is_empty() {
            command = command.arg(format!("--extensions={}", self.extensions.join(",")));
        }
        if !self.ignore.is_empty() {
            command = command.arg(format!("--ignore={}", self.ignore.join(",")));
        }
        if self.fail_on == FailOn::Error {
            command = command.args(["--runtime-set", "ignore_warnings_on_exit", "1"]);
        }
        for reporter in &self.reporters {
            command = match reporter {
                Reporter::Verbose => command.arg("--report=full"),
                Reporter::Checkstyle { destination } => command.arg(format!(
                    "--report-checkstyle={}",
                    destination.display()
                )),
            };
        }
        command.args(self.paths.iter().cloned())
    }
}

fn push_unique(list: &mut Vec<String>, items: impl IntoIterator<Item = impl Into<String>>) {
    for item in items {
        let item = item.into();
        if !list.contains(&item) {
            list.push(item);
        }
    }
}

/// Builds [`LintSpec`]s for one project.
#[derive(Debug)]
pub struct SpecBuilder<'a> {
    cfg: &'a ProjectConfig,
    working_dir: &'a Path,
    fallback: &'a FallbackResolver,
}

impl<'a> SpecBuilder<'a> {
    pub fn new(
        cfg: &'a ProjectConfig,
        working_dir: &'a Path,
        fallback: &'a FallbackResolver,
    ) -> Self {
        Self {
            cfg,
            working_dir,
            fallback,
        }
    }

    fn bin(&self, name: &str) -> String {
        self.working_dir
            .join(&self.cfg.bin_dir)
            .join(name)
            .to_string_lossy()
            .into_owned()
    }

    pub fn phpcs(&self, extension: &DrupalExtensionConfig) -> LintSpec {
        let phpcs = &extension.phpcs;
        let mut spec = LintSpec::new(Linter::Phpcs, extension, self.bin("phpcs"));

        spec.paths = if phpcs.paths.is_empty() {
            vec![".".to_string()]
        } else {
            phpcs.paths.clone()
        };
        spec.standard = Some(phpcs.standard.clone());
        spec.fail_on = phpcs.fail_on;

        push_unique(&mut spec.ignore, phpcs.ignore.iter().cloned());
        push_unique(&mut spec.ignore, PHPCS_DEFAULT_IGNORE.iter().copied());
        if extension.has_scss {
            push_unique(&mut spec.ignore, ["*.css"]);
        }
        if extension.has_type_script {
            push_unique(&mut spec.ignore, ["*.js"]);
        }

        push_unique(&mut spec.extensions, phpcs.extensions.iter().cloned());
        push_unique(&mut spec.extensions, PHPCS_BASE_EXTENSIONS.iter().copied());
        if phpcs.standard == "Drupal" {
            push_unique(&mut spec.extensions, PHPCS_DRUPAL_EXTENSIONS.iter().copied());
        }

        let checkstyle = Reporter::Checkstyle {
            destination: self
                .working_dir
                .join(&self.cfg.reports_dir)
                .join("checkstyle")
                .join(format!("phpcs.{}.xml", phpcs.standard.to_lowercase())),
        };
        spec.reporters = Vec::new();
        for name in &phpcs.reporters {
            match name.as_str() {
                "verbose" => spec.reporters.push(Reporter::Verbose),
                "checkstyle" => spec.reporters.push(checkstyle.clone()),
                other => warn!("unknown phpcs reporter '{}' ignored", other),
            }
        }

        match self.cfg.environment {
            Environment::Ci => {
                spec.fail_on = FailOn::Never;
                if !spec.reporters.contains(&checkstyle) {
                    spec.reporters.push(checkstyle);
                }
            }
            Environment::GitHook => {
                push_unique(&mut spec.ignore, PHPCS_GIT_HOOK_IGNORE.iter().copied());
            }
            Environment::Dev => {}
        }
        spec
    }

    pub fn scss_lint(
        &self,
        extension: &DrupalExtensionConfig,
    ) -> Result<LintSpec, NoFallbackFileError> {
        let gemfile = self.fallback.resolve("Gemfile", &extension.path)?;
        let mut spec = LintSpec::new(Linter::ScssLint, extension, "bundle".to_string());
        spec.paths = vec!["css/".to_string()];
        spec.ignore = vec!["*.css".to_string()];
        spec.env.insert(
            "BUNDLE_GEMFILE".to_string(),
            gemfile.to_string_lossy().into_owned(),
        );
        Ok(spec)
    }

    pub fn ts_lint(
        &self,
        extension: &DrupalExtensionConfig,
    ) -> Result<LintSpec, NoFallbackFileError> {
        let config = self.fallback.resolve("tslint.json", &extension.path)?;
        let executable = self
            .working_dir
            .join(NODE_BIN_PREFIX)
            .join("tslint")
            .to_string_lossy()
            .into_owned();
        let mut spec = LintSpec::new(Linter::TsLint, extension, executable);
        spec.paths = vec!["js/**/*.ts".to_string()];
        spec.config_file = Some(config);
        Ok(spec)
    }

    pub fn es_lint(
        &self,
        extension: &DrupalExtensionConfig,
    ) -> Result<LintSpec, NoFallbackFileError> {
        let executable = self
            .fallback
            .resolve(&format!("{NODE_BIN_PREFIX}eslint"), &extension.path)?;
        let config = self.fallback.resolve(".eslintrc", &extension.path)?;
        let mut spec = LintSpec::new(
            Linter::EsLint,
            extension,
            executable.to_string_lossy().into_owned(),
        );
        spec.paths = vec!["js/**/*.js".to_string()];
        spec.config_file = Some(config);
        Ok(spec)
    }
}
