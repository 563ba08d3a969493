//! Fail-fast sequential execution of named steps.
//!
//! A [`Pipeline`] runs its steps strictly in order. The first step that fails
//! or errors stops the run; steps already run are not rolled back.

use std::fmt::{Debug, Formatter};

use thiserror::Error;
use tracing::{debug, info, instrument};

pub mod subprocess;

pub use subprocess::ExternalCommand;

/// Structured result of a unit that reports more than an exit status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskResult {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub payload: String,
}

/// What a step produced. Both shapes answer the same success question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Report(TaskResult),
    Status(i32),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        match self {
            Self::Report(result) => result.success,
            Self::Status(code) => *code == 0,
        }
    }

    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Report(result) => result.exit_code,
            Self::Status(code) => Some(*code),
        }
    }

    /// Captured output, empty for plain exit statuses.
    pub fn payload(&self) -> &str {
        match self {
            Self::Report(result) => &result.payload,
            Self::Status(_) => "",
        }
    }
}

/// A unit of work. `Err` means the unit could not produce an outcome at all.
pub trait Task: Debug {
    fn run(&mut self) -> anyhow::Result<Outcome>;
}

struct Code<F> {
    f: F,
}

impl<F> Debug for Code<F> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("Code")
    }
}

impl<F> Task for Code<F>
where
    F: FnMut() -> anyhow::Result<()>,
{
    fn run(&mut self) -> anyhow::Result<Outcome> {
        (self.f)()?;
        Ok(Outcome::Status(0))
    }
}

#[derive(Debug)]
struct Step {
    name: String,
    task: Box<dyn Task>,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("step '{step}' failed with exit code {:?}", .outcome.exit_code())]
    StepFailed { step: String, outcome: Outcome },
    #[error("step '{step}' errored: {error:#}")]
    Errored { step: String, error: anyhow::Error },
}

impl PipelineError {
    pub fn step(&self) -> &str {
        match self {
            Self::StepFailed { step, .. } | Self::Errored { step, .. } => step,
        }
    }
}

/// Outcomes of every step of a successful run, in execution order.
#[derive(Debug, Default)]
pub struct PipelineReport {
    pub steps: Vec<(String, Outcome)>,
}

#[derive(Debug, Default)]
pub struct Pipeline {
    steps: Vec<Step>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_task(mut self, name: impl Into<String>, task: impl Task + 'static) -> Self {
        self.push_task(name, task);
        self
    }

    pub fn add_code<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: FnMut() -> anyhow::Result<()> + 'static,
    {
        self.push_task(name, Code { f });
        self
    }

    pub fn push_task(&mut self, name: impl Into<String>, task: impl Task + 'static) {
        self.steps.push(Step {
            name: name.into(),
            task: Box::new(task),
        });
    }

    /// Appends the steps of `other` after the steps of `self`.
    pub fn extend(&mut self, other: Pipeline) {
        self.steps.extend(other.steps);
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().map(|step| step.name.as_str())
    }

    #[instrument(skip(self), fields(steps = self.steps.len()))]
    pub fn run(mut self) -> Result<PipelineReport, PipelineError> {
        let mut report = PipelineReport::default();

        for step in &mut self.steps {
            info!(target: "drupalflow", "run {}", step.name);
            let outcome = step.task.run().map_err(|error| PipelineError::Errored {
                step: step.name.clone(),
                error,
            })?;

            if !outcome.is_success() {
                return Err(PipelineError::StepFailed {
                    step: step.name.clone(),
                    outcome,
                });
            }

            debug!("step {} succeeded", step.name);
            report.steps.push((step.name.clone(), outcome));
        }

        Ok(report)
    }
}
