//! # Actor System Error Types
//!
//! This module defines the error types used throughout the Kestrel actor
//! system. Failures never cross the send/receive boundary as unwinding
//! panics; they are reified into `ActorError` values and routed through the
//! supervision protocol.

use thiserror::Error;

/// Core error type for the actor system.
///
/// This enum represents all possible failure conditions a behavior can
/// produce. It travels from the failing cell to its supervisor as part of
/// the failure report and is handed to the configured decider.
#[derive(Error, Debug)]
pub enum ActorError {
    /// Error during actor initialization.
    ///
    /// Raised when the behavior factory or the `pre_start` hook fails.
    /// Initialization failures are treated as non-restartable by the
    /// default supervision policy.
    #[error("Actor initialization failed: {0}")]
    InitializationError(String),

    /// Error during message processing.
    #[error("Message handling failed: {0}")]
    MessageHandlingError(String),

    /// A panic escaped the behavior while it was processing a message.
    ///
    /// The panic payload is captured as text; the worker thread survives.
    #[error("Panic in actor: {0}")]
    Panic(String),

    /// The actor was terminated through a `Kill` command.
    #[error("Actor was killed")]
    Killed,

    /// A watched actor terminated and the watcher did not handle the
    /// `Terminated` notification.
    #[error("Death pact with {0} was triggered")]
    DeathPact(String),

    /// Operation timeout.
    #[error("Timeout")]
    Timeout,

    /// Catch-all for other errors.
    ///
    /// Preserves the original error context through source chaining.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ActorError {
    /// Whether this failure occurred before the actor finished starting.
    pub fn is_initialization(&self) -> bool {
        matches!(self, ActorError::InitializationError(_))
    }
}
