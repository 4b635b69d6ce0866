//! Macro expansion of job environment variables
//!
//! Recognizes `${NAME}` (name may contain `.`) and bare `$NAME`. Placeholders
//! without a matching variable are left verbatim.

use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::LazyLock;

static MACRO_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\$(?:\{([A-Za-z0-9_.]+)\}|([A-Za-z0-9_]+))").ok());

/// Expand every recognized placeholder in `template` from `env`
#[must_use]
pub fn expand(template: &str, env: &HashMap<String, String>) -> String {
    let Some(pattern) = MACRO_PATTERN.as_ref() else {
        return template.to_string();
    };
    if !template.contains('$') {
        return template.to_string();
    }

    pattern
        .replace_all(template, |caps: &Captures<'_>| {
            let name = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map_or("", |m| m.as_str());
            env.get(name).map_or_else(
                || caps.get(0).map_or("", |m| m.as_str()).to_string(),
                Clone::clone,
            )
        })
        .into_owned()
}
