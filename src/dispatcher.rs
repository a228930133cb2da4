//! Hook dispatcher.
//!
//! Owns the registry, the pattern cache, the call-adapter and the trigger
//! statistics. Dispatch is synchronous: a round walks its ordered events one
//! step at a time and either completes or hands back a [`TriggerInterrupt`].
//!
//! No lock is held while a handler runs, so handlers may bind, unbind or fire
//! nested events through a [`WeakDispatcher`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, RwLock, Weak};

use serde_json::Value;
use tracing::{debug, warn};

use crate::binding::{BindOptions, BindingId, BindingType};
use crate::config::DispatcherConfig;
use crate::error::{HookError, HookResult};
use crate::event::Event;
use crate::handler::{DirectInvoker, Handler, Invoker};
use crate::interrupt::{RoundReport, TriggerInterrupt, TriggerOutcome};
use crate::name::split_group;
use crate::pattern::PatternMatcher;
use crate::queue::build_queue;
use crate::registry::Registry;
use crate::stats::{RoundState, TriggerStats};

struct Inner {
    config: DispatcherConfig,
    registry: RwLock<Registry>,
    matcher: PatternMatcher,
    stats: RwLock<TriggerStats>,
    invoker: RwLock<Arc<dyn Invoker>>,
}

/// In-process hook dispatcher.
///
/// Cloning is cheap; clones share the same registry and statistics.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

/// Non-owning handle to a [`Dispatcher`], for use inside handlers.
#[derive(Clone)]
pub struct WeakDispatcher {
    inner: Weak<Inner>,
}

impl WeakDispatcher {
    /// Returns the dispatcher if it is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<Dispatcher> {
        self.inner.upgrade().map(|inner| Dispatcher { inner })
    }
}

impl fmt::Debug for WeakDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakDispatcher").finish_non_exhaustive()
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::build(DispatcherConfig::default(), Arc::new(DirectInvoker))
    }
}

impl Dispatcher {
    /// Creates a dispatcher that invokes callables directly.
    pub fn new(config: DispatcherConfig) -> HookResult<Self> {
        Self::with_invoker(config, Arc::new(DirectInvoker))
    }

    /// Creates a dispatcher with a custom call-adapter.
    pub fn with_invoker(config: DispatcherConfig, invoker: Arc<dyn Invoker>) -> HookResult<Self> {
        config.validate()?;
        Ok(Self::build(config, invoker))
    }

    fn build(config: DispatcherConfig, invoker: Arc<dyn Invoker>) -> Self {
        let registry = Registry::new(config.default_group.clone());
        Self {
            inner: Arc::new(Inner {
                config,
                registry: RwLock::new(registry),
                matcher: PatternMatcher::new(),
                stats: RwLock::new(TriggerStats::default()),
                invoker: RwLock::new(invoker),
            }),
        }
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &DispatcherConfig {
        &self.inner.config
    }

    /// Non-owning handle for handlers that fire nested events.
    #[must_use]
    pub fn downgrade(&self) -> WeakDispatcher {
        WeakDispatcher {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Replaces the call-adapter used by later rounds.
    pub fn set_invoker(&self, invoker: Arc<dyn Invoker>) -> HookResult<()> {
        let mut guard = self
            .inner
            .invoker
            .write()
            .map_err(|_| HookError::internal("invoker lock poisoned"))?;
        *guard = invoker;
        Ok(())
    }

    /// Binds `handler` to `[group@]pattern` for `binding_type`.
    ///
    /// Wildcard patterns are compiled here; a pattern that cannot be
    /// compiled is rejected and nothing is stored.
    pub fn bind(
        &self,
        pattern: &str,
        handler: impl Into<Handler>,
        options: BindOptions,
        binding_type: BindingType,
    ) -> HookResult<BindingId> {
        let (_, name) = split_group(pattern, &self.inner.config.default_group);
        if let Err(e) = self.inner.matcher.validate(name) {
            warn!(binding_type = %binding_type, error = %e, "Rejected hook pattern");
            return Err(e);
        }

        let priority = options.priority.unwrap_or(self.inner.config.default_priority);
        let mut registry = self.registry_mut()?;
        Ok(registry.register(pattern, handler.into(), options.bag, priority, binding_type))
    }

    /// Binds an `on` handler.
    pub fn on(
        &self,
        pattern: &str,
        handler: impl Into<Handler>,
        options: BindOptions,
    ) -> HookResult<BindingId> {
        self.bind(pattern, handler, options, BindingType::On)
    }

    /// Binds a `before` handler.
    pub fn before(
        &self,
        pattern: &str,
        handler: impl Into<Handler>,
        options: BindOptions,
    ) -> HookResult<BindingId> {
        self.bind(pattern, handler, options, BindingType::Before)
    }

    /// Binds an `after` handler.
    pub fn after(
        &self,
        pattern: &str,
        handler: impl Into<Handler>,
        options: BindOptions,
    ) -> HookResult<BindingId> {
        self.bind(pattern, handler, options, BindingType::After)
    }

    /// Removes every binding of the exact `[group@]pattern`.
    pub fn off(&self, pattern: &str, binding_type: BindingType) -> HookResult<usize> {
        Ok(self.registry_mut()?.unregister(pattern, binding_type))
    }

    /// Removes the bindings of `handler` under the exact `[group@]pattern`.
    pub fn off_handler(
        &self,
        pattern: &str,
        handler: &Handler,
        binding_type: BindingType,
    ) -> HookResult<usize> {
        Ok(self.registry_mut()?.unregister_handler(pattern, handler, binding_type))
    }

    /// Removes every binding of `binding_type` in `group`.
    pub fn off_group(&self, group: &str, binding_type: BindingType) -> HookResult<usize> {
        Ok(self.registry_mut()?.unregister_group(group, binding_type))
    }

    /// Total number of stored bindings.
    pub fn binding_count(&self) -> HookResult<usize> {
        let registry = self
            .inner
            .registry
            .read()
            .map_err(|_| HookError::internal("registry lock poisoned"))?;
        Ok(registry.len())
    }

    /// Ordered events that firing `[group@]trigger` would run.
    ///
    /// Drops bindings that unsubscribed during an earlier round.
    pub fn queue(&self, trigger: &str, binding_type: BindingType) -> HookResult<Vec<Event>> {
        let mut registry = self.registry_mut()?;
        build_queue(&mut registry, &self.inner.matcher, trigger, binding_type)
    }

    /// Fires `[group@]trigger`, starting a new round.
    pub fn trigger(
        &self,
        trigger: &str,
        data: Value,
        binding_type: BindingType,
    ) -> HookResult<TriggerOutcome> {
        let events = self.queue(trigger, binding_type)?;
        debug!(
            trigger = %trigger,
            binding_type = %binding_type,
            matched = events.len(),
            "Triggering hook"
        );
        self.run_round(events, data, binding_type, 0, true, RoundState::default())
    }

    /// Runs `events` from `step` as a new round.
    ///
    /// With `halt_on_abnormal` unset, abnormal returns are ignored.
    pub fn trigger_events(
        &self,
        events: Vec<Event>,
        data: Value,
        binding_type: BindingType,
        step: usize,
        halt_on_abnormal: bool,
    ) -> HookResult<TriggerOutcome> {
        self.run_round(events, data, binding_type, step, halt_on_abnormal, RoundState::default())
    }

    /// Completed-round counts per `(group@)pattern` for `binding_type`.
    pub fn triggered(&self, binding_type: BindingType) -> HookResult<BTreeMap<String, u64>> {
        let stats = self
            .inner
            .stats
            .read()
            .map_err(|_| HookError::internal("stats lock poisoned"))?;
        Ok(stats.get(binding_type))
    }

    /// Resets every trigger count.
    pub fn clear_triggered(&self) -> HookResult<()> {
        self.stats_mut()?.clear();
        Ok(())
    }

    pub(crate) fn run_round(
        &self,
        mut events: Vec<Event>,
        data: Value,
        binding_type: BindingType,
        mut step: usize,
        halt_on_abnormal: bool,
        mut round: RoundState,
    ) -> HookResult<TriggerOutcome> {
        let invoker = self.invoker()?;
        let default_group = self.inner.config.default_group.as_str();

        while step < events.len() {
            let event = &mut events[step];
            round.visit(event.qualified_name(default_group));

            let receive = match invoker.invoke(event, &data) {
                Ok(receive) => receive,
                Err(e) => {
                    warn!(
                        pattern = %event.name(),
                        handler = %event.handler().label(),
                        binding_type = %binding_type,
                        step,
                        error = %e,
                        "Hook invocation failed"
                    );
                    return Err(e);
                }
            };
            round.record_invocation();
            let stopped = event.is_propagation_stopped();

            if let Some(receive) = receive.filter(|v| !v.is_null()) {
                if halt_on_abnormal {
                    debug!(
                        binding_type = %binding_type,
                        step,
                        receive = %receive,
                        "Hook round suspended"
                    );
                    return Ok(TriggerOutcome::Interrupted(TriggerInterrupt::new(
                        self.clone(),
                        binding_type,
                        events,
                        step,
                        receive,
                        data,
                        round,
                    )));
                }
                debug!(
                    binding_type = %binding_type,
                    step,
                    receive = %receive,
                    "Ignoring abnormal hook return"
                );
            }

            if stopped {
                return self.complete(binding_type, &round, Some(step));
            }
            step += 1;
        }

        self.complete(binding_type, &round, None)
    }

    fn complete(
        &self,
        binding_type: BindingType,
        round: &RoundState,
        stopped_at: Option<usize>,
    ) -> HookResult<TriggerOutcome> {
        self.stats_mut()?.record(binding_type, round);
        Ok(TriggerOutcome::Completed(RoundReport {
            invoked: round.invoked(),
            stopped_at,
        }))
    }

    fn invoker(&self) -> HookResult<Arc<dyn Invoker>> {
        let guard = self
            .inner
            .invoker
            .read()
            .map_err(|_| HookError::internal("invoker lock poisoned"))?;
        Ok(Arc::clone(&*guard))
    }

    fn registry_mut(&self) -> HookResult<std::sync::RwLockWriteGuard<'_, Registry>> {
        self.inner
            .registry
            .write()
            .map_err(|_| HookError::internal("registry lock poisoned"))
    }

    fn stats_mut(&self) -> HookResult<std::sync::RwLockWriteGuard<'_, TriggerStats>> {
        self.inner
            .stats
            .write()
            .map_err(|_| HookError::internal("stats lock poisoned"))
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("config", &self.inner.config)
            .field("registry", &self.inner.registry)
            .finish_non_exhaustive()
    }
}
