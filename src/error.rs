//! Error types used by the replaybus registry and delivery paths.
//!
//! This module defines two main error enums:
//!
//! - [`RegistryError`] — structural errors raised by registration calls.
//! - [`HandlerError`] — per-handler delivery outcomes.
//!
//! Both types provide helper methods (`as_label`, `as_message`) for logging/metrics.
//! A truncated replay is **not** an error: it is reported as a boolean flag on the
//! replay result, because the caller decides whether partial history is acceptable.

use thiserror::Error;

use crate::registry::{HandlerId, HandlerKind};

/// # Errors produced by registry mutations.
///
/// These are surfaced synchronously to the caller of the mutating call and
/// never leave the registry in a partially-updated state.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RegistryError {
    /// The code set does not match the registration kind: a single-code handler
    /// needs exactly one code, a multi-code handler at least one, a default
    /// handler none.
    #[error("invalid code set for {kind:?} registration: got {got} codes")]
    InvalidCodes {
        /// The requested registration kind.
        kind: HandlerKind,
        /// How many codes the caller supplied.
        got: usize,
    },

    /// No live registration carries this identifier.
    #[error("no registration with id {0}")]
    NotFound(HandlerId),
}

impl RegistryError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use replaybus::{HandlerKind, RegistryError};
    ///
    /// let err = RegistryError::InvalidCodes { kind: HandlerKind::Single, got: 0 };
    /// assert_eq!(err.as_label(), "registry_invalid_codes");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RegistryError::InvalidCodes { .. } => "registry_invalid_codes",
            RegistryError::NotFound(_) => "registry_not_found",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RegistryError::InvalidCodes { kind, got } => {
                format!("code-set cardinality mismatch: kind={kind:?} codes={got}")
            }
            RegistryError::NotFound(id) => format!("unknown handler id {id}"),
        }
    }
}

/// # Per-handler delivery outcomes.
///
/// A failing handler is isolated: its error is recorded in the aggregate
/// [`DeliveryReport`](crate::DeliveryReport) and logged, but it never blocks
/// delivery to other handlers and never affects the replay cache.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandlerError {
    /// The callback returned an error for this event.
    #[error("handler failed: {0}")]
    Failed(String),

    /// The callback panicked; the panic was caught and the worker kept running.
    #[error("handler panicked: {0}")]
    Panicked(String),

    /// The event was dropped before reaching the callback (queue `"full"` or
    /// `"closed"`).
    #[error("delivery dropped: queue {0}")]
    Dropped(&'static str),

    /// The acknowledgment channel was dropped before the callback completed.
    #[error("delivery was not acknowledged")]
    Unacknowledged,
}

impl HandlerError {
    /// Shorthand for [`HandlerError::Failed`].
    pub fn failed(msg: impl Into<String>) -> Self {
        HandlerError::Failed(msg.into())
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use replaybus::HandlerError;
    ///
    /// let err = HandlerError::failed("boom");
    /// assert_eq!(err.as_label(), "handler_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            HandlerError::Failed(_) => "handler_failed",
            HandlerError::Panicked(_) => "handler_panicked",
            HandlerError::Dropped(_) => "delivery_dropped",
            HandlerError::Unacknowledged => "delivery_unacknowledged",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            HandlerError::Failed(e) => format!("error: {e}"),
            HandlerError::Panicked(e) => format!("panic: {e}"),
            HandlerError::Dropped(reason) => format!("dropped: queue {reason}"),
            HandlerError::Unacknowledged => "not acknowledged".to_string(),
        }
    }
}
