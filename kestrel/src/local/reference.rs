use crate::local::cell::ActorCell;
use crate::local::envelope::Envelope;
use crate::local::event_stream::{DeadLetter, EventStream};
use crate::local::messages::{ActorIdentity, Identify};
use crate::local::path::ActorPath;
use crate::local::system_message::SystemMessage;
use kestrel_api::types::BoxedMessage;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tracing::trace;
use uuid::Uuid;

/// Transport seam used by remote placeholder references.
///
/// The core treats remote and local actors uniformly; everything past this
/// trait (framing, addressing, delivery guarantees) belongs to a transport
/// layer that is not part of the runtime core.
pub trait Transport: Send + Sync + fmt::Debug {
    fn deliver(&self, path: &ActorPath, envelope: Envelope);
    fn deliver_system(&self, path: &ActorPath, message: SystemMessage);
}

/// Addressable handle to an actor.
///
/// The variant set is closed: a live local actor, a placeholder for a
/// nonexistent or terminated actor, the dead-letter sink, and a remote
/// placeholder forwarding to a [`Transport`]. Every variant accepts `tell`
/// and system messages, so callers never test liveness before sending.
#[derive(Clone)]
pub enum ActorRef {
    Local(LocalRef),
    Empty(Arc<EmptyRef>),
    DeadLetter(Arc<DeadLetterRef>),
    Remote(Arc<RemoteRef>),
}

/// Reference backed by a live cell. The cell is owned by exactly one
/// `LocalRef` lineage and survives until its terminal transition.
#[derive(Clone)]
pub struct LocalRef {
    pub(crate) cell: Arc<ActorCell>,
}

/// Placeholder for an actor that does not exist (any more). Answers
/// identity and watch traffic locally.
pub struct EmptyRef {
    path: ActorPath,
    event_stream: Option<Arc<EventStream>>,
}

/// Terminal sink for undeliverable messages.
pub struct DeadLetterRef {
    path: ActorPath,
    event_stream: Arc<EventStream>,
}

/// Placeholder for an actor on another transport.
pub struct RemoteRef {
    path: ActorPath,
    transport: Arc<dyn Transport>,
}

impl ActorRef {
    pub(crate) fn local(cell: Arc<ActorCell>) -> Self {
        ActorRef::Local(LocalRef { cell })
    }

    /// A reference to nowhere. Useful as a watch target for actors that
    /// were never created and in tests.
    pub fn empty(path: ActorPath) -> Self {
        ActorRef::Empty(Arc::new(EmptyRef {
            path,
            event_stream: None,
        }))
    }

    pub(crate) fn empty_with_stream(path: ActorPath, event_stream: Arc<EventStream>) -> Self {
        ActorRef::Empty(Arc::new(EmptyRef {
            path,
            event_stream: Some(event_stream),
        }))
    }

    pub(crate) fn dead_letter(path: ActorPath, event_stream: Arc<EventStream>) -> Self {
        ActorRef::DeadLetter(Arc::new(DeadLetterRef { path, event_stream }))
    }

    pub fn remote(path: ActorPath, transport: Arc<dyn Transport>) -> Self {
        ActorRef::Remote(Arc::new(RemoteRef { path, transport }))
    }

    pub fn path(&self) -> &ActorPath {
        match self {
            ActorRef::Local(r) => r.cell.path(),
            ActorRef::Empty(r) => &r.path,
            ActorRef::DeadLetter(r) => &r.path,
            ActorRef::Remote(r) => &r.path,
        }
    }

    /// Incarnation id. Placeholder variants share the nil uid so equality
    /// degrades to path equality for them.
    pub(crate) fn uid(&self) -> Uuid {
        match self {
            ActorRef::Local(r) => r.cell.uid(),
            _ => Uuid::nil(),
        }
    }

    pub(crate) fn local_cell(&self) -> Option<&Arc<ActorCell>> {
        match self {
            ActorRef::Local(r) => Some(&r.cell),
            _ => None,
        }
    }

    pub fn is_terminated(&self) -> bool {
        match self {
            ActorRef::Local(r) => r.cell.is_terminated(),
            ActorRef::Empty(_) => true,
            ActorRef::DeadLetter(_) | ActorRef::Remote(_) => false,
        }
    }

    /// Sends a message, correlating it with `sender`.
    ///
    /// Never fails from the caller's point of view: undeliverable messages
    /// are redirected to dead letters.
    pub fn tell<M: Send + 'static>(&self, message: M, sender: Option<ActorRef>) {
        self.tell_boxed(Box::new(message), sender);
    }

    pub fn tell_boxed(&self, message: BoxedMessage, sender: Option<ActorRef>) {
        match self {
            ActorRef::Local(r) => r.cell.post(Envelope::new(message, sender)),
            ActorRef::Empty(r) => r.handle_tell(self, Envelope::new(message, sender)),
            ActorRef::DeadLetter(r) => r.handle_tell(self, Envelope::new(message, sender)),
            ActorRef::Remote(r) => r.transport.deliver(&r.path, Envelope::new(message, sender)),
        }
    }

    pub(crate) fn send_system(&self, message: SystemMessage) {
        match self {
            ActorRef::Local(r) => r.cell.post_system(message),
            ActorRef::Empty(r) => r.handle_system(self, message),
            ActorRef::DeadLetter(r) => r.handle_system(self, message),
            ActorRef::Remote(r) => r.transport.deliver_system(&r.path, message),
        }
    }
}

impl PartialEq for ActorRef {
    fn eq(&self, other: &Self) -> bool {
        self.uid() == other.uid() && self.path() == other.path()
    }
}

impl Eq for ActorRef {}

impl Hash for ActorRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path().hash(state);
        self.uid().hash(state);
    }
}

impl fmt::Debug for ActorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActorRef::Local(r) => write!(f, "ActorRef({})", r.cell.path()),
            ActorRef::Empty(r) => write!(f, "ActorRef(empty:{})", r.path),
            ActorRef::DeadLetter(r) => write!(f, "ActorRef(deadLetters:{})", r.path),
            ActorRef::Remote(r) => write!(f, "ActorRef(remote:{})", r.path),
        }
    }
}

impl fmt::Display for ActorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path())
    }
}

// Shared interception for the non-live variants. `Identify` is answered with
// a null subject, watch traffic is answered with an immediate termination
// notice, everything else becomes a dead letter.

impl EmptyRef {
    fn handle_tell(&self, self_ref: &ActorRef, envelope: Envelope) {
        if answer_identify(self_ref, &envelope) {
            return;
        }
        if let Some(stream) = &self.event_stream {
            stream.publish_dead_letter(DeadLetter {
                message: envelope.message,
                sender: envelope.sender,
                recipient: self_ref.clone(),
            });
        } else {
            trace!(path = %self.path, "message to empty reference dropped");
        }
    }

    fn handle_system(&self, self_ref: &ActorRef, message: SystemMessage) {
        answer_system_for_dead(self_ref, message, false);
    }
}

impl DeadLetterRef {
    fn handle_tell(&self, self_ref: &ActorRef, envelope: Envelope) {
        if answer_identify(self_ref, &envelope) {
            return;
        }
        self.event_stream.publish_dead_letter(DeadLetter {
            message: envelope.message,
            sender: envelope.sender,
            recipient: self_ref.clone(),
        });
    }

    fn handle_system(&self, self_ref: &ActorRef, message: SystemMessage) {
        answer_system_for_dead(self_ref, message, false);
    }
}

/// Replies to an `Identify` query with a null subject. Returns true when the
/// envelope was consumed.
fn answer_identify(self_ref: &ActorRef, envelope: &Envelope) -> bool {
    let Some(identify) = envelope.message.downcast_ref::<Identify>() else {
        return false;
    };
    if let Some(sender) = &envelope.sender {
        sender.tell(
            ActorIdentity {
                correlation_id: identify.correlation_id,
                subject: None,
            },
            Some(self_ref.clone()),
        );
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct RecordingTransport {
        deliveries: Mutex<Vec<String>>,
    }

    impl Transport for RecordingTransport {
        fn deliver(&self, path: &ActorPath, _envelope: Envelope) {
            self.deliveries.lock().unwrap().push(format!("{path}:tell"));
        }

        fn deliver_system(&self, path: &ActorPath, _message: SystemMessage) {
            self.deliveries.lock().unwrap().push(format!("{path}:system"));
        }
    }

    #[test]
    fn remote_reference_forwards_to_its_transport() {
        let transport = Arc::new(RecordingTransport::default());
        let path = ActorPath::root("remote").child("user").child("far");
        let actor = ActorRef::remote(path.clone(), transport.clone());

        actor.tell("ping", None);
        actor.send_system(SystemMessage::Terminate);

        let deliveries = transport.deliveries.lock().unwrap();
        assert_eq!(
            *deliveries,
            vec![format!("{path}:tell"), format!("{path}:system")]
        );
    }

    #[test]
    fn placeholder_references_expose_terminal_state() {
        let nobody = ActorRef::empty(ActorPath::root("test").child("nobody"));
        assert!(nobody.is_terminated());
        assert_eq!(nobody.uid(), Uuid::nil());
    }
}

/// System-message protocol of references without a live cell: watchers get
/// an immediate termination notice, everything else is dropped.
pub(crate) fn answer_system_for_dead(
    self_ref: &ActorRef,
    message: SystemMessage,
    existence_confirmed: bool,
) {
    match message {
        SystemMessage::Watch { watcher } => {
            watcher.send_system(SystemMessage::DeathWatchNotification {
                actor: self_ref.clone(),
                existence_confirmed,
                address_terminated: false,
            });
        }
        SystemMessage::Unwatch { .. } | SystemMessage::DeathWatchNotification { .. } => {}
        other => {
            trace!(path = %self_ref.path(), message = ?other, "system message to dead reference dropped");
        }
    }
}
