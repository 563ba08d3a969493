//! Constants used across the Drupalflow workspace.

/// The filename for Drupalflow's primary configuration.
pub const CONFIG_FILE: &str = "drupalflow.toml";

/// Optional developer-local overrides, layered on top of [`CONFIG_FILE`].
pub const LOCAL_CONFIG_FILE: &str = "drupalflow.local.toml";

/// The Composer dependency lock file.
pub const COMPOSER_LOCK: &str = "composer.lock";

/// Marker files probed inside a managed extension.
pub const MARKER_GIT: &str = ".git";
pub const MARKER_SCSS: &str = "config.rb";
pub const MARKER_TSC: &str = "tsconfig.json";

/// Bundler manifest, looked up at the root of each fallback directory.
pub const MANIFEST_GEMFILE: &str = "Gemfile";

/// Composer package types starting with this prefix are Drupal packages.
pub const DRUPAL_PACKAGE_TYPE_PREFIX: &str = "drupal-";

/// Executables installed by npm live under this prefix.
pub const NODE_BIN_PREFIX: &str = "node_modules/.bin/";

/// Environment variables read at startup.
pub const ENV_ENVIRONMENT: &str = "DRUPALFLOW_ENVIRONMENT";
pub const ENV_TOOL_ROOT: &str = "DRUPALFLOW_ROOT";
pub const ENV_PHP_EXECUTABLE: &str = "DRUPALFLOW_PHP_EXECUTABLE";

/// Module enabled once per database server before the test runner starts.
pub const TEST_SUPPORT_MODULE: &str = "simpletest";

/// Drupal's test runner, relative to the Drupal root.
pub const RUN_TESTS_SCRIPT: &str = "core/scripts/run-tests.sh";
