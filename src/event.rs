//! Per-firing event record handed to handlers.
//!
//! An `Event` is materialized from a binding each time its pattern matches a
//! fired name. Handlers may stop propagation, unsubscribe the binding, or edit
//! the event's own copy of the bag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::Value;

use crate::binding::{Bag, Binding, BindingId, BindingType};
use crate::handler::Handler;
use crate::name::qualified_name;

/// Runtime record of one matched binding during one firing.
#[derive(Debug, Clone)]
pub struct Event {
    binding_type: BindingType,
    group: String,
    name: String,
    binding_id: BindingId,
    handler: Handler,
    bag: Bag,
    priority: i32,
    trigger: String,
    propagation_stopped: bool,
    unsubscribed: Arc<AtomicBool>,
}

impl Event {
    pub(crate) fn from_binding(
        binding_type: BindingType,
        group: &str,
        name: &str,
        binding: &Binding,
        trigger: &str,
    ) -> Self {
        Self {
            binding_type,
            group: group.to_string(),
            name: name.to_string(),
            binding_id: binding.id,
            handler: binding.handler.clone(),
            bag: binding.bag.clone(),
            priority: binding.priority,
            trigger: trigger.to_string(),
            propagation_stopped: false,
            unsubscribed: Arc::clone(&binding.unsubscribed),
        }
    }

    /// Stops the events ordered after this one in the current round.
    ///
    /// Takes effect once the current handler returns.
    pub fn stop_propagation(&mut self) -> &mut Self {
        self.propagation_stopped = true;
        self
    }

    /// Unbinds this event's binding for every later firing.
    ///
    /// The current round still runs to its end; the binding is dropped the
    /// next time its pattern is queued.
    pub fn off(&mut self) -> &mut Self {
        self.unsubscribed.store(true, Ordering::Release);
        self
    }

    /// Binding type.
    #[must_use]
    pub const fn binding_type(&self) -> BindingType {
        self.binding_type
    }

    /// Group the binding was registered under.
    #[must_use]
    pub fn group(&self) -> &str {
        &self.group
    }

    /// Registered pattern, without group prefix.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registration id of the underlying binding.
    #[must_use]
    pub const fn binding_id(&self) -> BindingId {
        self.binding_id
    }

    /// Handler reference.
    #[must_use]
    pub const fn handler(&self) -> &Handler {
        &self.handler
    }

    /// This event's copy of the bag.
    #[must_use]
    pub const fn bag(&self) -> &Bag {
        &self.bag
    }

    /// Priority.
    #[must_use]
    pub const fn priority(&self) -> i32 {
        self.priority
    }

    /// Fired name (group prefix stripped) that matched this event.
    #[must_use]
    pub fn trigger(&self) -> &str {
        &self.trigger
    }

    /// True if a handler stopped propagation during this firing.
    #[must_use]
    pub const fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }

    /// True if `off()` has been called for this binding.
    #[must_use]
    pub fn is_off(&self) -> bool {
        self.unsubscribed.load(Ordering::Acquire)
    }

    /// Statistics key of the binding's pattern.
    #[must_use]
    pub fn qualified_name(&self, default_group: &str) -> String {
        qualified_name(&self.group, &self.name, default_group)
    }

    /// Bag value for `key`.
    #[must_use]
    pub fn bag_value(&self, key: &str) -> Option<&Value> {
        self.bag.get(key)
    }

    /// Bag value for `key`, or `default` when absent.
    #[must_use]
    pub fn bag_value_or(&self, key: &str, default: Value) -> Value {
        self.bag.get(key).cloned().unwrap_or(default)
    }

    /// Sets a bag value on this event only.
    pub fn set_bag(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.bag.insert(key.into(), value.into());
        self
    }

    /// Removes a bag value from this event only.
    pub fn remove_bag(&mut self, key: &str) -> &mut Self {
        self.bag.remove(key);
        self
    }

    /// True if the bag holds a non-null value for `key`.
    #[must_use]
    pub fn has_bag(&self, key: &str) -> bool {
        self.bag.get(key).is_some_and(|v| !v.is_null())
    }

    #[cfg(test)]
    pub(crate) fn for_test(
        binding_type: BindingType,
        group: &str,
        name: &str,
        id: BindingId,
        handler: Handler,
        bag: Bag,
        priority: i32,
    ) -> Self {
        let binding = Binding::new(id, handler, bag, priority);
        Self::from_binding(binding_type, group, name, &binding, name)
    }
}
