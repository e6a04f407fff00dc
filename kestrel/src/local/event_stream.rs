use crate::local::messages::{ReceiveTimeout, ReceiveTimeoutTick, Terminated};
use crate::local::reference::ActorRef;
use kestrel_api::types::BoxedMessage;
use lazy_static::lazy_static;
use std::any::TypeId;
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::debug;

lazy_static! {
    // Message kinds that land on the low-noise stream instead of the main
    // dead-letter stream when undeliverable.
    static ref SUPPRESSED_KINDS: HashSet<TypeId> = {
        let mut kinds = HashSet::new();
        kinds.insert(TypeId::of::<Terminated>());
        kinds.insert(TypeId::of::<ReceiveTimeout>());
        kinds.insert(TypeId::of::<ReceiveTimeoutTick>());
        kinds
    };
}

pub(crate) fn is_suppressed(message: &BoxedMessage) -> bool {
    SUPPRESSED_KINDS.contains(&message.as_ref().type_id())
}

/// Undeliverable or unhandled message record.
pub struct DeadLetter {
    pub message: BoxedMessage,
    pub sender: Option<ActorRef>,
    pub recipient: ActorRef,
}

impl fmt::Debug for DeadLetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeadLetter")
            .field("message", &"<boxed-message>")
            .field("sender", &self.sender)
            .field("recipient", &self.recipient)
            .finish()
    }
}

/// Telemetry and dead-letter events produced by the runtime.
///
/// The core only publishes these records; it never depends on anyone
/// consuming them.
#[derive(Debug)]
pub enum StreamEvent {
    DeadLetter(DeadLetter),
    SuppressedDeadLetter(DeadLetter),
    UnhandledMessage(DeadLetter),
    ActorStarted { actor: ActorRef },
    ActorStopped { actor: ActorRef },
    ActorRestarted { actor: ActorRef, reason: String },
}

/// Receives every event published on the stream.
///
/// Callbacks run synchronously on the publishing task, so implementations
/// must hand off any heavy work.
pub trait EventStreamSubscriber: Send + Sync {
    fn on_event(&self, event: &StreamEvent);
}

/// Synchronous fan-out channel for runtime telemetry.
pub struct EventStream {
    subscribers: Mutex<Vec<Arc<dyn EventStreamSubscriber>>>,
}

impl EventStream {
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }

    pub fn subscribe(&self, subscriber: Arc<dyn EventStreamSubscriber>) {
        self.subscribers.lock().unwrap().push(subscriber);
    }

    pub fn publish(&self, event: StreamEvent) {
        match &event {
            StreamEvent::DeadLetter(letter) => {
                debug!(recipient = %letter.recipient.path(), "dead letter");
            }
            StreamEvent::UnhandledMessage(letter) => {
                debug!(recipient = %letter.recipient.path(), "unhandled message");
            }
            _ => {}
        }
        let subscribers = self.subscribers.lock().unwrap();
        for subscriber in subscribers.iter() {
            subscriber.on_event(&event);
        }
    }

    /// Publishes an undeliverable message on the stream matching its kind.
    pub fn publish_dead_letter(&self, letter: DeadLetter) {
        if is_suppressed(&letter.message) {
            self.publish(StreamEvent::SuppressedDeadLetter(letter));
        } else {
            self.publish(StreamEvent::DeadLetter(letter));
        }
    }
}

impl Default for EventStream {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventStream")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Tally {
        dead: Mutex<usize>,
        suppressed: Mutex<usize>,
    }

    impl EventStreamSubscriber for Tally {
        fn on_event(&self, event: &StreamEvent) {
            match event {
                StreamEvent::DeadLetter(_) => *self.dead.lock().unwrap() += 1,
                StreamEvent::SuppressedDeadLetter(_) => *self.suppressed.lock().unwrap() += 1,
                _ => {}
            }
        }
    }

    #[test]
    fn dead_letters_split_by_suppression() {
        let stream = EventStream::new();
        let tally = Arc::new(Tally {
            dead: Mutex::new(0),
            suppressed: Mutex::new(0),
        });
        stream.subscribe(tally.clone());

        let recipient = ActorRef::empty(crate::local::path::ActorPath::root("test"));
        stream.publish_dead_letter(DeadLetter {
            message: Box::new("plain"),
            sender: None,
            recipient: recipient.clone(),
        });
        stream.publish_dead_letter(DeadLetter {
            message: Box::new(ReceiveTimeout),
            sender: None,
            recipient,
        });

        assert_eq!(*tally.dead.lock().unwrap(), 1);
        assert_eq!(*tally.suppressed.lock().unwrap(), 1);
    }
}
