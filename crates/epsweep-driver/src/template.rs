use epsweep_core::errors::{ErrorInfo, SweepError};

use crate::grid::Combination;

/// Extracts the `{placeholder}` names referenced by a pattern, in order of
/// appearance and with duplicates preserved.
pub fn placeholders(pattern: &str) -> Result<Vec<String>, SweepError> {
    let mut names = Vec::new();
    let mut rest = pattern;
    while let Some(open) = rest.find('{') {
        let tail = &rest[open + 1..];
        let close = tail.find('}').ok_or_else(|| {
            SweepError::Config(
                ErrorInfo::new("template-unclosed", "unclosed `{` in template")
                    .with_context("pattern", pattern.to_string()),
            )
        })?;
        let name = &tail[..close];
        if name.is_empty() {
            return Err(SweepError::Config(
                ErrorInfo::new("template-empty-placeholder", "`{}` names no parameter")
                    .with_context("pattern", pattern.to_string()),
            ));
        }
        names.push(name.to_string());
        rest = &tail[close + 1..];
    }
    Ok(names)
}

/// Substitutes every `{placeholder}` in the pattern with the combination's
/// rendered value for that name.
pub fn substitute(pattern: &str, combination: &Combination) -> Result<String, SweepError> {
    let mut rendered = String::with_capacity(pattern.len());
    let mut rest = pattern;
    while let Some(open) = rest.find('{') {
        rendered.push_str(&rest[..open]);
        let tail = &rest[open + 1..];
        let close = tail.find('}').ok_or_else(|| {
            SweepError::Config(
                ErrorInfo::new("template-unclosed", "unclosed `{` in template")
                    .with_context("pattern", pattern.to_string()),
            )
        })?;
        let name = &tail[..close];
        let value = combination.lookup(name).ok_or_else(|| {
            SweepError::Config(
                ErrorInfo::new(
                    "template-unknown-placeholder",
                    format!("`{{{name}}}` does not name a dimension or fixed parameter"),
                )
                .with_context("pattern", pattern.to_string()),
            )
        })?;
        rendered.push_str(value);
        rest = &tail[close + 1..];
    }
    rendered.push_str(rest);
    Ok(rendered)
}
