//! Internal control messages processed with higher priority than user
//! traffic.

use crate::local::reference::ActorRef;
use kestrel_api::errors::ActorError;
use std::fmt;
use std::sync::Arc;

/// Control messages driving the cell lifecycle state machine.
///
/// System messages jump the user queue: every dispatch pass drains all of
/// them before touching user envelopes. Failure causes are shared behind an
/// `Arc` because the same cause travels to the supervisor, the restart hooks
/// and the event stream.
pub enum SystemMessage {
    /// Instantiate the behavior and run its `pre_start` hook.
    Create,
    /// Suspend user message processing, recursively through the subtree.
    Suspend,
    /// Resume user message processing. `caused_by_failure` carries the fault
    /// being recovered from when this resume is a supervision directive.
    Resume {
        caused_by_failure: Option<Arc<ActorError>>,
    },
    /// Replace the behavior instance after a failure.
    Recreate { cause: Arc<ActorError> },
    /// Irreversibly stop the actor, children first.
    Terminate,
    /// Register `watcher` for a termination notification from the receiver.
    Watch { watcher: ActorRef },
    /// Remove a previously registered watcher.
    Unwatch { watcher: ActorRef },
    /// Termination notice delivered to a registered watcher.
    DeathWatchNotification {
        actor: ActorRef,
        existence_confirmed: bool,
        address_terminated: bool,
    },
    /// A child reports a failure to its supervisor.
    Failed {
        child: ActorRef,
        cause: Arc<ActorError>,
    },
}

impl fmt::Debug for SystemMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SystemMessage::Create => write!(f, "Create"),
            SystemMessage::Suspend => write!(f, "Suspend"),
            SystemMessage::Resume { caused_by_failure } => f
                .debug_struct("Resume")
                .field("caused_by_failure", &caused_by_failure.is_some())
                .finish(),
            SystemMessage::Recreate { cause } => {
                f.debug_struct("Recreate").field("cause", cause).finish()
            }
            SystemMessage::Terminate => write!(f, "Terminate"),
            SystemMessage::Watch { watcher } => {
                f.debug_struct("Watch").field("watcher", watcher).finish()
            }
            SystemMessage::Unwatch { watcher } => {
                f.debug_struct("Unwatch").field("watcher", watcher).finish()
            }
            SystemMessage::DeathWatchNotification {
                actor,
                existence_confirmed,
                address_terminated,
            } => f
                .debug_struct("DeathWatchNotification")
                .field("actor", actor)
                .field("existence_confirmed", existence_confirmed)
                .field("address_terminated", address_terminated)
                .finish(),
            SystemMessage::Failed { child, cause } => f
                .debug_struct("Failed")
                .field("child", child)
                .field("cause", cause)
                .finish(),
        }
    }
}
