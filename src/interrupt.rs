//! Suspended dispatch rounds.
//!
//! A handler that returns a value other than `None`/`null` suspends its round.
//! The dispatcher hands back a [`TriggerInterrupt`] holding everything needed to
//! continue: the ordered events, the step that produced the value, the data
//! payload and the round's statistics state.

use std::fmt;

use serde_json::Value;

use crate::binding::BindingType;
use crate::dispatcher::Dispatcher;
use crate::error::{DispatchError, HookResult};
use crate::event::Event;
use crate::stats::RoundState;

/// Summary of a round that reached its terminal state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoundReport {
    /// Handlers invoked over the whole round, including steps run before any
    /// suspension.
    pub invoked: usize,
    /// Step whose handler stopped propagation, if any.
    pub stopped_at: Option<usize>,
}

/// Result of running a round.
#[must_use]
#[derive(Debug)]
pub enum TriggerOutcome {
    /// Every step ran, or propagation was stopped.
    Completed(RoundReport),
    /// A handler returned an abnormal value and the round is suspended.
    Interrupted(TriggerInterrupt),
}

impl TriggerOutcome {
    /// True if the round reached its terminal state.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    /// True if the round is suspended.
    #[must_use]
    pub const fn is_interrupted(&self) -> bool {
        matches!(self, Self::Interrupted(_))
    }

    /// The completion report, if the round completed.
    #[must_use]
    pub const fn report(&self) -> Option<&RoundReport> {
        match self {
            Self::Completed(report) => Some(report),
            Self::Interrupted(_) => None,
        }
    }

    /// The suspension, if the round was interrupted.
    #[must_use]
    pub fn into_interrupt(self) -> Option<TriggerInterrupt> {
        match self {
            Self::Completed(_) => None,
            Self::Interrupted(interrupt) => Some(interrupt),
        }
    }
}

/// A suspended round that can be inspected and resumed.
///
/// Dropping it abandons the round; nothing is recorded in the statistics.
pub struct TriggerInterrupt {
    dispatcher: Dispatcher,
    binding_type: BindingType,
    events: Vec<Event>,
    step: usize,
    receive: Value,
    data: Value,
    round: RoundState,
}

impl TriggerInterrupt {
    pub(crate) fn new(
        dispatcher: Dispatcher,
        binding_type: BindingType,
        events: Vec<Event>,
        step: usize,
        receive: Value,
        data: Value,
        round: RoundState,
    ) -> Self {
        Self {
            dispatcher,
            binding_type,
            events,
            step,
            receive,
            data,
            round,
        }
    }

    /// Dispatcher that ran the round.
    #[must_use]
    pub const fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Binding type being dispatched.
    #[must_use]
    pub const fn binding_type(&self) -> BindingType {
        self.binding_type
    }

    /// Full ordered event sequence of the round.
    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Index of the event whose handler returned the abnormal value.
    #[must_use]
    pub const fn step(&self) -> usize {
        self.step
    }

    /// The abnormal value.
    #[must_use]
    pub const fn receive(&self) -> &Value {
        &self.receive
    }

    /// Data payload of the round.
    #[must_use]
    pub const fn data(&self) -> &Value {
        &self.data
    }

    /// Statistics state accumulated before the suspension.
    #[must_use]
    pub const fn round(&self) -> &RoundState {
        &self.round
    }

    /// The event that produced the abnormal value.
    pub fn event(&self) -> HookResult<&Event> {
        self.events.get(self.step).ok_or_else(|| {
            DispatchError::EventOutOfRange {
                step: self.step,
                len: self.events.len(),
            }
            .into()
        })
    }

    /// Continues the round after the suspended step.
    ///
    /// With `ignore_further_abnormal` set, later abnormal returns are ignored
    /// and the round runs to its end. Otherwise the next abnormal return
    /// suspends again.
    pub fn resume(self, ignore_further_abnormal: bool) -> HookResult<TriggerOutcome> {
        let Self {
            dispatcher,
            binding_type,
            events,
            step,
            data,
            round,
            ..
        } = self;
        dispatcher.run_round(events, data, binding_type, step + 1, !ignore_further_abnormal, round)
    }
}

impl fmt::Debug for TriggerInterrupt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TriggerInterrupt")
            .field("binding_type", &self.binding_type)
            .field("events", &self.events.len())
            .field("step", &self.step)
            .field("receive", &self.receive)
            .field("data", &self.data)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for TriggerInterrupt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hook {} step {} of {} returned {} instead of nothing",
            self.binding_type,
            self.step,
            self.events.len(),
            self.receive
        )
    }
}
