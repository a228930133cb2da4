//! Wildcard pattern matching.
//!
//! Patterns are matched literally except for `*`, which matches any run of
//! characters (including none). Wildcard patterns are compiled to anchored
//! regexes once and cached for the lifetime of the matcher.

use std::collections::HashMap;
use std::sync::RwLock;

use regex::Regex;

use crate::error::{HookError, HookResult};

/// Wildcard character accepted in patterns.
pub const WILDCARD: char = '*';

/// Lazy "any characters" group substituted for each wildcard.
const WILDCARD_REGEX: &str = "(?s:.*?)";

/// Returns true if `pattern` contains a wildcard.
#[must_use]
pub fn is_wildcard(pattern: &str) -> bool {
    pattern.contains(WILDCARD)
}

/// Builds the anchored regex source for a wildcard pattern.
#[must_use]
pub fn wildcard_to_regex(pattern: &str) -> String {
    let body = pattern
        .split(WILDCARD)
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(WILDCARD_REGEX);
    format!("^{body}$")
}

/// Matches fired names against registered patterns, caching compiled
/// wildcard patterns.
#[derive(Debug, Default)]
pub struct PatternMatcher {
    cache: RwLock<HashMap<String, Regex>>,
}

impl PatternMatcher {
    /// Creates a matcher with an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if `trigger` matches `pattern`.
    pub fn is_match(&self, pattern: &str, trigger: &str) -> HookResult<bool> {
        if pattern == trigger {
            return Ok(true);
        }
        if !is_wildcard(pattern) {
            return Ok(false);
        }
        let re = self.compiled(pattern)?;
        Ok(re.is_match(trigger))
    }

    /// Compiles and caches `pattern` if it holds a wildcard.
    ///
    /// Fails with [`HookError::Pattern`] when the pattern cannot be compiled.
    pub fn validate(&self, pattern: &str) -> HookResult<()> {
        if is_wildcard(pattern) {
            self.compiled(pattern)?;
        }
        Ok(())
    }

    /// Number of compiled patterns held in the cache.
    pub fn cached_len(&self) -> HookResult<usize> {
        let guard = self
            .cache
            .read()
            .map_err(|_| HookError::internal("pattern cache lock poisoned"))?;
        Ok(guard.len())
    }

    fn compiled(&self, pattern: &str) -> HookResult<Regex> {
        {
            let guard = self
                .cache
                .read()
                .map_err(|_| HookError::internal("pattern cache lock poisoned"))?;
            if let Some(re) = guard.get(pattern) {
                return Ok(re.clone());
            }
        }

        let compiled = Regex::new(&wildcard_to_regex(pattern)).map_err(|e| HookError::Pattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;

        let mut guard = self
            .cache
            .write()
            .map_err(|_| HookError::internal("pattern cache lock poisoned"))?;

        // Another thread may have inserted it while we compiled.
        guard
            .entry(pattern.to_string())
            .or_insert_with(|| compiled.clone());
        Ok(compiled)
    }
}
