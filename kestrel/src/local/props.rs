use crate::config::MailboxConfig;
use crate::local::context::ActorContext;
use kestrel_api::actor::Actor;
use kestrel_api::supervisor::SupervisorStrategyKind;
use std::fmt;
use std::sync::Arc;

/// Behavior instances as the runtime stores them.
pub type BoxedActor = Box<dyn Actor<Context = ActorContext>>;

/// Recipe for creating (and re-creating) an actor.
///
/// The factory runs inside the cell's own turn, both at first start and on
/// every restart, so a restarted actor always begins from a fresh instance.
#[derive(Clone)]
pub struct Props {
    factory: Arc<dyn Fn() -> BoxedActor + Send + Sync>,
    pub(crate) mailbox: Option<MailboxConfig>,
    pub(crate) supervisor_strategy: Option<SupervisorStrategyKind>,
}

impl Props {
    pub fn new<A, F>(factory: F) -> Self
    where
        A: Actor<Context = ActorContext>,
        F: Fn() -> A + Send + Sync + 'static,
    {
        Self {
            factory: Arc::new(move || Box::new(factory())),
            mailbox: None,
            supervisor_strategy: None,
        }
    }

    /// Bounds the actor's user queue; overflow goes to dead letters.
    pub fn with_mailbox(mut self, mailbox: MailboxConfig) -> Self {
        self.mailbox = Some(mailbox);
        self
    }

    /// Strategy this actor applies to its own children.
    pub fn with_supervisor_strategy(mut self, strategy: SupervisorStrategyKind) -> Self {
        self.supervisor_strategy = Some(strategy);
        self
    }

    pub(crate) fn produce(&self) -> BoxedActor {
        (self.factory)()
    }
}

impl fmt::Debug for Props {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Props")
            .field("mailbox", &self.mailbox)
            .field("supervisor_strategy", &self.supervisor_strategy)
            .finish()
    }
}
