//! Queue building: fired name → ordered events.
//!
//! Matching bindings are ordered by priority (descending), then by
//! registration id (ascending) across every matching pattern. Bindings whose
//! events called `off()` are dropped from the registry here. A stored pattern
//! that cannot be compiled is skipped so it never hides the other bindings.

use tracing::{trace, warn};

use crate::binding::BindingType;
use crate::error::HookResult;
use crate::event::Event;
use crate::name::split_group;
use crate::pattern::PatternMatcher;
use crate::registry::Registry;

/// Builds the ordered event sequence for `trigger` in `binding_type`.
///
/// Returns an empty sequence when nothing matches.
pub fn build_queue(
    registry: &mut Registry,
    matcher: &PatternMatcher,
    trigger: &str,
    binding_type: BindingType,
) -> HookResult<Vec<Event>> {
    let (group, name) = split_group(trigger, registry.default_group());
    let (group, name) = (group.to_string(), name.to_string());

    let Some(patterns) = registry.patterns_mut(&group, binding_type) else {
        return Ok(Vec::new());
    };

    let mut events = Vec::new();
    let mut pruned = 0usize;
    let mut failure = None;
    for (pattern, bindings) in patterns.iter_mut() {
        match matcher.is_match(pattern, &name) {
            Ok(true) => {}
            Ok(false) => continue,
            Err(e) if e.is_pattern() => {
                warn!(
                    group = %group,
                    pattern = %pattern,
                    error = %e,
                    "Skipping uncompilable hook pattern"
                );
                continue;
            }
            Err(e) => {
                failure = Some(e);
                break;
            }
        }

        let before = bindings.len();
        bindings.retain(|b| !b.is_unsubscribed());
        pruned += before - bindings.len();

        events.extend(
            bindings
                .iter()
                .map(|b| Event::from_binding(binding_type, &group, pattern, b, &name)),
        );
    }

    if pruned > 0 {
        trace!(
            group = %group,
            binding_type = %binding_type,
            pruned,
            "Dropped unsubscribed bindings"
        );
        registry.prune(&group, binding_type);
    }
    if let Some(e) = failure {
        return Err(e);
    }

    // Registration ids are unique, so this is a total order.
    events.sort_by(|a, b| {
        b.priority()
            .cmp(&a.priority())
            .then_with(|| a.binding_id().cmp(&b.binding_id()))
    });

    trace!(
        group = %group,
        trigger = %name,
        binding_type = %binding_type,
        matched = events.len(),
        "Built hook queue"
    );
    Ok(events)
}
