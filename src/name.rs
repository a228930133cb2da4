//! Hook name grammar: `["<group>@"]<pattern>`.

/// Splits an optional `group@` prefix off `name`.
///
/// Only the first `@` separates the group; the remainder is the pattern.
/// Names without `@` belong to `default_group`.
#[must_use]
pub fn split_group<'a>(name: &'a str, default_group: &'a str) -> (&'a str, &'a str) {
    match name.split_once('@') {
        Some((group, rest)) => (group, rest),
        None => (default_group, name),
    }
}

/// Renders the statistics key of a pattern: `name` in the default group,
/// `group@name` elsewhere.
#[must_use]
pub fn qualified_name(group: &str, name: &str, default_group: &str) -> String {
    if group == default_group {
        name.to_string()
    } else {
        format!("{group}@{name}")
    }
}
