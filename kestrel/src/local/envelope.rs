use crate::local::reference::ActorRef;
use kestrel_api::types::BoxedMessage;
use std::fmt;

/// Pairs a message payload with its sender for delivery.
///
/// Immutable after construction. A missing sender is resolved to the
/// system's dead-letter reference at the point where the envelope is bound
/// to a concrete actor, so replies always have somewhere to go.
pub struct Envelope {
    pub message: BoxedMessage,
    pub sender: Option<ActorRef>,
}

impl Envelope {
    pub fn new(message: BoxedMessage, sender: Option<ActorRef>) -> Self {
        Self { message, sender }
    }
}

impl fmt::Debug for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Envelope")
            .field("message", &"<boxed-message>")
            .field("sender", &self.sender)
            .finish()
    }
}
