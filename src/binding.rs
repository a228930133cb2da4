//! Binding types: what gets stored in the registry.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::handler::Handler;

/// Extra data attached to a binding and copied into each event.
pub type Bag = serde_json::Map<String, serde_json::Value>;

/// The four binding categories. Each type is an independent dispatch queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingType {
    /// Primary type, used by `bind` when no other type is chosen.
    #[default]
    When,
    /// Fired while an action runs.
    On,
    /// Fired ahead of an action.
    Before,
    /// Fired once an action is done.
    After,
}

impl BindingType {
    /// All binding types in declaration order.
    pub const ALL: [Self; 4] = [Self::When, Self::On, Self::Before, Self::After];

    /// Lowercase name of the type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::When => "when",
            Self::On => "on",
            Self::Before => "before",
            Self::After => "after",
        }
    }
}

impl fmt::Display for BindingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Registration sequence number of a binding.
///
/// Ids increase monotonically per registry and break priority ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BindingId(u64);

impl BindingId {
    #[must_use]
    pub(crate) const fn from_seq(seq: u64) -> Self {
        Self(seq)
    }

    /// The raw sequence number.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for BindingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Optional registration settings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BindOptions {
    /// Extra data copied into every event of the binding.
    pub bag: Bag,
    /// Priority; `None` uses the dispatcher's default priority.
    pub priority: Option<i32>,
}

impl BindOptions {
    /// Creates empty options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an explicit priority.
    #[must_use]
    pub const fn priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Replaces the bag.
    #[must_use]
    pub fn bag(mut self, bag: Bag) -> Self {
        self.bag = bag;
        self
    }

    /// Adds one bag entry.
    #[must_use]
    pub fn bag_entry(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.bag.insert(key.into(), value.into());
        self
    }
}

/// One registered (handler, bag, priority) tuple.
#[derive(Debug, Clone)]
pub struct Binding {
    pub(crate) id: BindingId,
    pub(crate) handler: Handler,
    pub(crate) bag: Bag,
    pub(crate) priority: i32,
    pub(crate) unsubscribed: Arc<AtomicBool>,
}

impl Binding {
    pub(crate) fn new(id: BindingId, handler: Handler, bag: Bag, priority: i32) -> Self {
        Self {
            id,
            handler,
            bag,
            priority,
            unsubscribed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Registration id.
    #[must_use]
    pub const fn id(&self) -> BindingId {
        self.id
    }

    /// Handler reference.
    #[must_use]
    pub const fn handler(&self) -> &Handler {
        &self.handler
    }

    /// Default bag.
    #[must_use]
    pub const fn bag(&self) -> &Bag {
        &self.bag
    }

    /// Priority.
    #[must_use]
    pub const fn priority(&self) -> i32 {
        self.priority
    }

    /// True once an event of this binding called `off()`.
    #[must_use]
    pub fn is_unsubscribed(&self) -> bool {
        self.unsubscribed.load(Ordering::Acquire)
    }
}
