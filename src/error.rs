//! Error types for kyrohook.
//!
//! All errors are strongly typed using thiserror. Abnormal handler returns are
//! not errors: they surface as [`crate::TriggerOutcome::Interrupted`].

use thiserror::Error;

/// Errors raised while building or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Default group cannot be empty")]
    EmptyDefaultGroup,

    #[error("Default group '{group}' must not contain '@'")]
    InvalidDefaultGroup {
        group: String,
    },

    #[error("Failed to read config file '{path}': {message}")]
    Read {
        path: String,
        message: String,
    },

    #[error("Failed to parse config: {message}")]
    Parse {
        message: String,
    },
}

/// Errors raised while dispatching events.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Hook handler '{handler}' is not invocable: {reason}")]
    HandlerNotInvocable {
        handler: String,
        reason: String,
    },

    #[error("Current event does not exist: step {step} of {len} events")]
    EventOutOfRange {
        step: usize,
        len: usize,
    },
}

/// Top-level error type for kyrohook.
#[derive(Debug, Error)]
pub enum HookError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("Invalid pattern '{pattern}': {reason}")]
    Pattern {
        pattern: String,
        reason: String,
    },

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl HookError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a configuration error.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Returns true if this is a dispatch error.
    #[must_use]
    pub const fn is_dispatch(&self) -> bool {
        matches!(self, Self::Dispatch(_))
    }

    /// Returns true if this is a pattern compilation error.
    #[must_use]
    pub const fn is_pattern(&self) -> bool {
        matches!(self, Self::Pattern { .. })
    }

    /// Returns true if this is an internal error.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }

    /// Returns true if the error is a programmer error that no retry or
    /// resumption can fix.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        match self {
            Self::Config(_) | Self::Pattern { .. } => true,
            Self::Dispatch(e) => matches!(
                e,
                DispatchError::HandlerNotInvocable { .. } | DispatchError::EventOutOfRange { .. }
            ),
            Self::Internal { .. } => false,
        }
    }
}

/// Result type alias for kyrohook operations.
pub type HookResult<T> = Result<T, HookError>;
