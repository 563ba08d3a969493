//! `{name}` placeholder substitution for site-variant names and URLs.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unresolved placeholder '{{{placeholder}}}' in pattern '{pattern}'")]
    Unresolved { placeholder: String, pattern: String },
}

/// Replaces every `{name}` in `pattern` with its value in one left-to-right
/// pass. Substituted values are never scanned again.
///
/// Placeholders without a value are an error, never passed through. A `{`
/// with no closing brace is literal text.
pub fn render(pattern: &str, values: &[(&str, &str)]) -> Result<String, TemplateError> {
    let mut rendered = String::with_capacity(pattern.len());
    let mut rest = pattern;

    while let Some(open) = rest.find('{') {
        let Some(close) = rest[open + 1..].find('}') else {
            break;
        };
        let name = &rest[open + 1..open + 1 + close];
        let value = values
            .iter()
            .find_map(|(key, value)| (*key == name).then_some(*value))
            .ok_or_else(|| TemplateError::Unresolved {
                placeholder: name.to_string(),
                pattern: pattern.to_string(),
            })?;

        rendered.push_str(&rest[..open]);
        rendered.push_str(value);
        rest = &rest[open + close + 2..];
    }

    rendered.push_str(rest);
    Ok(rendered)
}
