use std::fmt::{Display, Formatter};
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimaryCommand {
    Lint,
    Test,
    Site,
    Extensions,
    Config,
}

impl PrimaryCommand {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lint => "lint",
            Self::Test => "test",
            Self::Site => "site",
            Self::Extensions => "extensions",
            Self::Config => "config",
        }
    }

    /// Selector used when the command is given without one.
    pub fn default_selector(self) -> &'static str {
        match self {
            Self::Lint => "all",
            Self::Test => "drupal",
            Self::Site => "install",
            Self::Extensions => "list",
            Self::Config => "show",
        }
    }

    /// Every selector the primary accepts, the default first.
    pub fn selectors(self) -> &'static [&'static str] {
        match self {
            Self::Lint => &["all", "phpcs", "scss", "ts", "es"],
            Self::Test => &["drupal", "clean", "list"],
            Self::Site => &["install", "delete"],
            Self::Extensions => &["list"],
            Self::Config => &["show"],
        }
    }

    pub fn is_selector(self, text: &str) -> bool {
        self.selectors().contains(&text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CommandRef {
    pub primary: PrimaryCommand,
    pub selector: Option<String>,
}

impl CommandRef {
    pub fn canonical(&self) -> String {
        match &self.selector {
            Some(selector) => format!("{}:{}", self.primary.as_str(), selector),
            None => self.primary.as_str().to_string(),
        }
    }

    /// Returns the explicit selector, falling back to the primary's default.
    pub fn effective_selector(&self) -> &str {
        self.selector
            .as_deref()
            .unwrap_or_else(|| self.primary.default_selector())
    }
}

impl Display for CommandRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.canonical())
    }
}

#[derive(Debug, Error)]
pub enum CommandParseError {
    #[error("unknown primary command '{0}'")]
    UnknownPrimary(String),
}

impl FromStr for CommandRef {
    type Err = CommandParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let mut parts = value.splitn(2, ':');
        let primary_text = parts.next().unwrap_or_default();
        let selector = parts.next().map(ToOwned::to_owned);

        let primary = match primary_text {
            "lint" => PrimaryCommand::Lint,
            "test" => PrimaryCommand::Test,
            "site" => PrimaryCommand::Site,
            "extensions" | "self" => PrimaryCommand::Extensions,
            "config" => PrimaryCommand::Config,
            _ => return Err(CommandParseError::UnknownPrimary(primary_text.to_string())),
        };

        Ok(Self { primary, selector })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_primary_only_command() {
        let cmd = CommandRef::from_str("lint").expect("lint should parse");
        assert_eq!(cmd.primary, PrimaryCommand::Lint);
        assert_eq!(cmd.selector, None);
        assert_eq!(cmd.effective_selector(), "all");
    }

    #[test]
    fn parses_selector_command() {
        let cmd = CommandRef::from_str("test:drupal").expect("test:drupal should parse");
        assert_eq!(cmd.primary, PrimaryCommand::Test);
        assert_eq!(cmd.selector.as_deref(), Some("drupal"));
        assert_eq!(cmd.to_string(), "test:drupal");
    }

    #[test]
    fn knows_its_selectors() {
        for primary in [
            PrimaryCommand::Lint,
            PrimaryCommand::Test,
            PrimaryCommand::Site,
            PrimaryCommand::Extensions,
            PrimaryCommand::Config,
        ] {
            assert_eq!(primary.selectors()[0], primary.default_selector());
        }
        assert!(PrimaryCommand::Site.is_selector("delete"));
        assert!(!PrimaryCommand::Test.is_selector("Foo"));
        assert!(!PrimaryCommand::Lint.is_selector("myext"));
    }

    #[test]
    fn rejects_unknown_primary() {
        let err = CommandRef::from_str("deploy:prod").expect_err("must fail");
        assert!(matches!(err, CommandParseError::UnknownPrimary(_)));
    }
}
