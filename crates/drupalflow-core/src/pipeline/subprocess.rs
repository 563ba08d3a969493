use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::pipeline::{Outcome, Task, TaskResult};

/// An external program run as one pipeline step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalCommand {
    /// The executable program (e.g. `phpcs`, `drush`).
    pub program: String,
    pub args: Vec<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
    /// Capture stdout and stderr as the report payload instead of
    /// streaming them to the terminal.
    #[serde(default)]
    pub capture: bool,
    /// Any exit status counts as success.
    #[serde(default)]
    pub ignore_failure: bool,
    /// Captured stdout counts as failure even on a zero exit status, for
    /// tools that report findings without a failing exit code.
    #[serde(default)]
    pub fail_on_output: bool,
}

impl ExternalCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
            working_dir: None,
            capture: false,
            ignore_failure: false,
            fail_on_output: false,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn capture_output(mut self, capture: bool) -> Self {
        self.capture = capture;
        self
    }

    pub fn ignore_failure(mut self, ignore: bool) -> Self {
        self.ignore_failure = ignore;
        self
    }

    pub fn fail_on_output(mut self, fail: bool) -> Self {
        self.fail_on_output = fail;
        self
    }

    /// The command line as a shell would show it.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args).envs(&self.env);
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }
        command
    }
}

impl Task for ExternalCommand {
    #[instrument(skip(self), fields(program = %self.program))]
    fn run(&mut self) -> anyhow::Result<Outcome> {
        debug!("exec {}", self.command_line());

        if !self.capture {
            let status = self
                .command()
                .status()
                .with_context(|| format!("failed to start command '{}'", self.command_line()))?;
            let code = status.code().unwrap_or(-1);
            if self.ignore_failure {
                return Ok(Outcome::Report(TaskResult {
                    success: true,
                    exit_code: status.code(),
                    payload: String::new(),
                }));
            }
            return Ok(Outcome::Status(code));
        }

        let output = self
            .command()
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("failed to start command '{}'", self.command_line()))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let reported = self.fail_on_output && !stdout.trim().is_empty();
        let mut payload = stdout.into_owned();
        payload.push_str(&String::from_utf8_lossy(&output.stderr));

        Ok(Outcome::Report(TaskResult {
            success: self.ignore_failure || (output.status.success() && !reported),
            exit_code: output.status.code(),
            payload,
        }))
    }
}
