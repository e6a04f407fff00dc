//! Messages with runtime-defined semantics that user code can send or
//! receive like any other payload.

use crate::local::reference::ActorRef;

/// Notification that a watched actor has terminated.
///
/// Delivered to every watcher registered at termination time. A behavior
/// that leaves this unhandled breaks its death pact and fails.
#[derive(Debug, Clone)]
pub struct Terminated {
    /// The terminated actor.
    pub actor: ActorRef,
    /// False when the watch target never existed (placeholder references);
    /// true when a real incarnation was observed.
    pub existence_confirmed: bool,
    /// True when the notification was synthesized because the target's
    /// whole address became unreachable rather than the actor stopping.
    pub address_terminated: bool,
}

/// Graceful stop command, processed in FIFO order with ordinary messages.
///
/// Messages queued behind the pill are redirected to dead letters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoisonPill;

/// Forces a supervised failure of the receiving actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Kill;

/// Identity query answered automatically by every reference variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identify {
    pub correlation_id: u64,
}

/// Reply to [`Identify`]. `subject` is `None` when the queried reference
/// does not point at a live actor.
#[derive(Debug, Clone)]
pub struct ActorIdentity {
    pub correlation_id: u64,
    pub subject: Option<ActorRef>,
}

/// Idle notification delivered when no message arrived within the duration
/// configured through `ActorContext::set_receive_timeout`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiveTimeout;

/// Internal timer tick backing [`ReceiveTimeout`]. Carries the timeout
/// generation so a stale tick that raced with new activity is dropped.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ReceiveTimeoutTick {
    pub generation: u64,
}
