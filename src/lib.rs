//! # kyrohook - In-process hook dispatcher
//!
//! kyrohook lets callers bind handlers to named, optionally wildcarded hook
//! patterns and fire them by name. Matching handlers run one after another in
//! a deterministic order, and each one can stop propagation, unbind itself, or
//! return a value that suspends the whole round until the caller resumes it.
//!
//! ## Core Concepts
//!
//! - **Group**: namespace chosen with an optional `group@` prefix
//! - **BindingType**: one of `when`, `on`, `before`, `after`; independent queues
//! - **Pattern**: registered name where `*` matches any run of characters
//! - **Event**: per-firing record handed to a handler
//! - **TriggerInterrupt**: a suspended round that can be inspected and resumed
//!
//! ## Usage
//!
//! ```rust
//! use kyrohook::{BindOptions, BindingType, Dispatcher, Handler, TriggerOutcome};
//! use serde_json::Value;
//!
//! let hooks = Dispatcher::default();
//! hooks.on("user/*", Handler::callable(|event, _data| {
//!     assert_eq!(event.trigger(), "user/login");
//!     None
//! }), BindOptions::new())?;
//!
//! match hooks.trigger("user/login", Value::Null, BindingType::On)? {
//!     TriggerOutcome::Completed(report) => assert_eq!(report.invoked, 1),
//!     TriggerOutcome::Interrupted(interrupt) => {
//!         let _ = interrupt.resume(true)?;
//!     }
//! }
//! # Ok::<(), kyrohook::HookError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod binding;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod handler;
pub mod interrupt;
pub mod name;
pub mod pattern;
pub mod queue;
pub mod registry;
pub mod stats;

// Re-export primary types at crate root for convenience
pub use binding::{Bag, BindOptions, Binding, BindingId, BindingType};
pub use config::{DispatcherConfig, DEFAULT_GROUP, DEFAULT_PRIORITY};
pub use dispatcher::{Dispatcher, WeakDispatcher};
pub use error::{ConfigError, DispatchError, HookError, HookResult};
pub use event::Event;
pub use handler::{
    DirectInvoker, Handler, HandlerFn, HandlerResolver, Invoker, NamedHandlers, ResolvingInvoker,
};
pub use interrupt::{RoundReport, TriggerInterrupt, TriggerOutcome};
pub use pattern::PatternMatcher;
pub use registry::Registry;
pub use stats::{RoundState, TriggerStats};
