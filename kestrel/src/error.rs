use thiserror::Error;

/// Errors related to mailbox operations.
///
/// These never surface to message senders; a rejected envelope is redirected
/// to dead letters by the sending reference.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MailboxError {
    #[error("Mailbox is full (capacity: {capacity})")]
    Full { capacity: usize },
    #[error("Mailbox is closed")]
    Closed,
}

/// Errors related to spawning actors.
///
/// Structural problems are rejected synchronously at the spawn call, never
/// deferred into a mailbox.
#[derive(Error, Debug, Clone)]
pub enum SpawnError {
    #[error("Invalid actor name {name:?}: {reason}")]
    InvalidName { name: String, reason: String },
    #[error("Actor name already in use: {0}")]
    NameAlreadyInUse(String),
    #[error("Parent actor is stopping, cannot spawn {0:?}")]
    ParentStopping(String),
    #[error("Actor system is shutting down")]
    SystemShuttingDown,
}

/// Errors related to the actor system itself.
#[derive(Error, Debug)]
pub enum SystemError {
    #[error("Actor system is not running")]
    NotRunning,
    #[error("Actor system is already shutting down")]
    ShuttingDown,
    #[error("Internal system error: {0}")]
    Other(#[from] anyhow::Error),
}
