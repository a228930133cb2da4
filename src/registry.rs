//! Binding registry.
//!
//! Bindings are indexed group → type → pattern → registration-ordered list.
//! Containers emptied by a removal are pruned in the same call.

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::binding::{Bag, Binding, BindingId, BindingType};
use crate::handler::Handler;
use crate::name::split_group;

pub(crate) type PatternMap = BTreeMap<String, Vec<Binding>>;
type TypeMap = HashMap<BindingType, PatternMap>;

/// In-memory index of registered bindings.
#[derive(Debug)]
pub struct Registry {
    default_group: String,
    groups: HashMap<String, TypeMap>,
    next_seq: u64,
}

impl Registry {
    /// Creates an empty registry using `default_group` for unprefixed names.
    #[must_use]
    pub fn new(default_group: impl Into<String>) -> Self {
        Self {
            default_group: default_group.into(),
            groups: HashMap::new(),
            next_seq: 0,
        }
    }

    /// Group applied to names without a `group@` prefix.
    #[must_use]
    pub fn default_group(&self) -> &str {
        &self.default_group
    }

    /// Appends a binding under `[group@]pattern`.
    pub fn register(
        &mut self,
        pattern: &str,
        handler: Handler,
        bag: Bag,
        priority: i32,
        binding_type: BindingType,
    ) -> BindingId {
        let (group, name) = split_group(pattern, &self.default_group);
        let id = BindingId::from_seq(self.next_seq);
        self.next_seq += 1;

        debug!(
            group = %group,
            pattern = %name,
            binding_type = %binding_type,
            priority,
            binding_id = %id,
            "Registered hook binding"
        );

        self.groups
            .entry(group.to_string())
            .or_default()
            .entry(binding_type)
            .or_default()
            .entry(name.to_string())
            .or_default()
            .push(Binding::new(id, handler, bag, priority));
        id
    }

    /// Removes every binding stored under the exact `[group@]pattern`.
    ///
    /// Returns the number of bindings removed.
    pub fn unregister(&mut self, pattern: &str, binding_type: BindingType) -> usize {
        let (group, name) = split_group(pattern, &self.default_group);
        let (group, name) = (group.to_string(), name.to_string());

        let removed = self
            .patterns_mut(&group, binding_type)
            .and_then(|patterns| patterns.remove(&name))
            .map_or(0, |list| list.len());
        self.prune(&group, binding_type);

        if removed > 0 {
            debug!(
                group = %group,
                pattern = %name,
                binding_type = %binding_type,
                removed,
                "Unregistered hook pattern"
            );
        }
        removed
    }

    /// Removes the bindings of `handler` under the exact `[group@]pattern`.
    ///
    /// Returns the number of bindings removed.
    pub fn unregister_handler(
        &mut self,
        pattern: &str,
        handler: &Handler,
        binding_type: BindingType,
    ) -> usize {
        let (group, name) = split_group(pattern, &self.default_group);
        let (group, name) = (group.to_string(), name.to_string());

        let mut removed = 0;
        if let Some(patterns) = self.patterns_mut(&group, binding_type) {
            if let Some(list) = patterns.get_mut(&name) {
                let before = list.len();
                list.retain(|b| &b.handler != handler);
                removed = before - list.len();
                if list.is_empty() {
                    patterns.remove(&name);
                }
            }
        }
        self.prune(&group, binding_type);

        if removed > 0 {
            debug!(
                group = %group,
                pattern = %name,
                binding_type = %binding_type,
                handler = %handler.label(),
                removed,
                "Unregistered hook handler"
            );
        }
        removed
    }

    /// Removes every pattern of `binding_type` in `group`.
    ///
    /// Returns the number of bindings removed.
    pub fn unregister_group(&mut self, group: &str, binding_type: BindingType) -> usize {
        let removed = self
            .groups
            .get_mut(group)
            .and_then(|types| types.remove(&binding_type))
            .map_or(0, |patterns| patterns.values().map(Vec::len).sum());
        self.prune(group, binding_type);

        if removed > 0 {
            debug!(
                group = %group,
                binding_type = %binding_type,
                removed,
                "Unregistered hook group"
            );
        }
        removed
    }

    /// Patterns registered for `group` and `binding_type`, in sorted order.
    #[must_use]
    pub fn patterns(&self, group: &str, binding_type: BindingType) -> Vec<String> {
        self.groups
            .get(group)
            .and_then(|types| types.get(&binding_type))
            .map(|patterns| patterns.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Bindings stored under the exact `[group@]pattern`.
    #[must_use]
    pub fn bindings(&self, pattern: &str, binding_type: BindingType) -> &[Binding] {
        let (group, name) = split_group(pattern, &self.default_group);
        self.groups
            .get(group)
            .and_then(|types| types.get(&binding_type))
            .and_then(|patterns| patterns.get(name))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Total number of stored bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups
            .values()
            .flat_map(HashMap::values)
            .flat_map(BTreeMap::values)
            .map(Vec::len)
            .sum()
    }

    /// True if no binding is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Number of groups holding at least one binding.
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub(crate) fn patterns_mut(
        &mut self,
        group: &str,
        binding_type: BindingType,
    ) -> Option<&mut PatternMap> {
        self.groups.get_mut(group)?.get_mut(&binding_type)
    }

    /// Drops empty containers along the (group, type) path.
    pub(crate) fn prune(&mut self, group: &str, binding_type: BindingType) {
        let Some(types) = self.groups.get_mut(group) else {
            return;
        };
        if let Some(patterns) = types.get_mut(&binding_type) {
            patterns.retain(|_, list| !list.is_empty());
            if patterns.is_empty() {
                types.remove(&binding_type);
            }
        }
        if types.is_empty() {
            self.groups.remove(group);
        }
    }
}
