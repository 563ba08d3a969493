//! Lint units for managed Drupal extensions.
//!
//! `lint` runs phpcs on every extension, scss-lint where the extension has
//! SCSS sources, and tslint or eslint depending on whether it has TypeScript
//! sources. A unit whose companion file cannot be found is skipped with a
//! warning; the rest of the plan still runs.

use std::path::Path;
use std::str::FromStr;

use drupalflow_core::{
    DrupalExtensionConfig, FallbackResolver, NoFallbackFileError, Pipeline, ProjectConfig,
};
use thiserror::Error;
use tracing::{debug, instrument, warn};

pub mod linters;

pub use linters::{LintSpec, Linter, Reporter, SpecBuilder};

/// The `lint` selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LintSelection {
    #[default]
    All,
    Phpcs,
    Scss,
    Ts,
    Es,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown lint selector '{0}', expected one of: all, phpcs, scss, ts, es")]
pub struct UnknownLintSelector(pub String);

impl FromStr for LintSelection {
    type Err = UnknownLintSelector;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "all" => Ok(Self::All),
            "phpcs" => Ok(Self::Phpcs),
            "scss" => Ok(Self::Scss),
            "ts" => Ok(Self::Ts),
            "es" => Ok(Self::Es),
            other => Err(UnknownLintSelector(other.to_string())),
        }
    }
}

impl LintSelection {
    /// Linters that apply to `extension` under this selection, in run order.
    pub fn linters_for(self, extension: &DrupalExtensionConfig) -> Vec<Linter> {
        let script = if extension.has_type_script {
            Linter::TsLint
        } else {
            Linter::EsLint
        };

        match self {
            Self::All => {
                let mut linters = vec![Linter::Phpcs];
                if extension.has_scss {
                    linters.push(Linter::ScssLint);
                }
                linters.push(script);
                linters
            }
            Self::Phpcs => vec![Linter::Phpcs],
            Self::Scss if extension.has_scss => vec![Linter::ScssLint],
            Self::Ts if extension.has_type_script => vec![Linter::TsLint],
            Self::Es if !extension.has_type_script => vec![Linter::EsLint],
            Self::Scss | Self::Ts | Self::Es => Vec::new(),
        }
    }
}

/// A unit dropped from the plan because a companion file is missing.
#[derive(Debug)]
pub struct SkippedUnit {
    pub step: String,
    pub reason: NoFallbackFileError,
}

#[derive(Debug, Default)]
pub struct LintPlan {
    pub specs: Vec<LintSpec>,
    pub skipped: Vec<SkippedUnit>,
}

impl LintPlan {
    pub fn step_names(&self) -> Vec<String> {
        self.specs.iter().map(LintSpec::step_name).collect()
    }

    pub fn into_pipeline(self) -> Pipeline {
        self.specs.into_iter().fold(Pipeline::new(), |pipeline, spec| {
            let name = spec.step_name();
            pipeline.add_task(name, spec.to_command())
        })
    }
}

/// Plans lint units for `extensions`, in the given order.
#[instrument(skip_all, fields(selection = ?selection))]
pub fn plan(
    cfg: &ProjectConfig,
    working_dir: &Path,
    fallback: &FallbackResolver,
    extensions: &[&DrupalExtensionConfig],
    selection: LintSelection,
) -> LintPlan {
    let builder = SpecBuilder::new(cfg, working_dir, fallback);
    let mut plan = LintPlan::default();

    for extension in extensions {
        for linter in selection.linters_for(extension) {
            let spec = match linter {
                Linter::Phpcs => Ok(builder.phpcs(extension)),
                Linter::ScssLint => builder.scss_lint(extension),
                Linter::TsLint => builder.ts_lint(extension),
                Linter::EsLint => builder.es_lint(extension),
            };

            match spec {
                Ok(spec) => plan.specs.push(spec),
                Err(reason) => {
                    let step = format!("lint.{}.{}", linter, extension.id);
                    warn!("skip {}: {}", step, reason);
                    plan.skipped.push(SkippedUnit { step, reason });
                }
            }
        }
    }

    debug!(
        "{} lint units planned, {} skipped",
        plan.specs.len(),
        plan.skipped.len()
    );
    plan
}
