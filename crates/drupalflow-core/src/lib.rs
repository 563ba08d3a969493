//! Core logic and abstractions for the Drupalflow system.
//!
//! This crate defines the project configuration, command structures, the
//! managed extension registry, the fail-fast pipeline and site operations
//! used across the Drupalflow workspace.

pub mod command;
pub mod config;
pub mod constants;
pub mod extension;
pub mod fallback;
pub mod ids;
pub mod pipeline;
pub mod project;
pub mod runtime;
pub mod site;
pub mod template;

pub use command::{CommandRef, PrimaryCommand};
pub use config::{ConfigError, DrupalExtensionConfig, FailOn, ProjectConfig, ProjectType};
pub use extension::composer::{ComposerPathResolver, PackagePathResolver};
pub use extension::{DiscoveryError, ExtensionRegistry};
pub use fallback::{FallbackResolver, NoFallbackFileError};
pub use ids::{IdKind, UnknownIdError};
pub use pipeline::{ExternalCommand, Outcome, Pipeline, PipelineError, Task, TaskResult};
pub use runtime::Environment;
pub use template::TemplateError;
