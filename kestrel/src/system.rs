use crate::config::SystemConfig;
use crate::error::SpawnError;
use crate::local::cell::ActorCell;
use crate::local::context::ActorContext;
use crate::local::dispatcher::Dispatcher;
use crate::local::event_stream::EventStream;
use crate::local::path::ActorPath;
use crate::local::props::Props;
use crate::local::reference::ActorRef;
use crate::local::scheduler::Scheduler;
use crate::local::system_message::SystemMessage;
use kestrel_api::actor::{Actor, Handled};
use kestrel_api::types::{ActorResult, BoxedFuture, BoxedMessage};
use std::fmt;
use std::sync::{Arc, OnceLock};
use tokio::sync::watch;
use tracing::info;

/// State shared by every cell of one actor system.
pub(crate) struct SystemShared {
    name: String,
    config: SystemConfig,
    dispatcher: Dispatcher,
    scheduler: Scheduler,
    event_stream: Arc<EventStream>,
    dead_letters: OnceLock<ActorRef>,
    guardian: OnceLock<ActorRef>,
    terminated_tx: watch::Sender<bool>,
}

impl SystemShared {
    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn config(&self) -> &SystemConfig {
        &self.config
    }

    pub(crate) fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub(crate) fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub(crate) fn event_stream(&self) -> &Arc<EventStream> {
        &self.event_stream
    }

    pub(crate) fn dead_letters(&self) -> ActorRef {
        self.dead_letters
            .get()
            .expect("dead letters initialized at system construction")
            .clone()
    }

    pub(crate) fn mark_terminated(&self) {
        info!(system = %self.name, "actor system terminated");
        self.terminated_tx.send_replace(true);
    }
}

/// Root of the user hierarchy. Top-level actors are its children; a failure
/// that escalates past it has nowhere to go, so the cell shuts the system
/// down.
struct Guardian;

impl Actor for Guardian {
    type Context = ActorContext;

    fn receive<'a>(
        &'a mut self,
        _msg: &'a BoxedMessage,
        _ctx: &'a mut ActorContext,
    ) -> BoxedFuture<'a, ActorResult<Handled>> {
        Box::pin(async { Ok(Handled::No) })
    }
}

/// Handle to a running actor system.
///
/// Cheap to clone; all clones share the same runtime core. Dropping the
/// handle does not stop the system, `terminate` does.
#[derive(Clone)]
pub struct ActorSystem {
    shared: Arc<SystemShared>,
    terminated_rx: watch::Receiver<bool>,
}

impl ActorSystem {
    pub fn new(name: &str) -> Self {
        Self::with_config(name, SystemConfig::default())
    }

    pub fn with_config(name: &str, config: SystemConfig) -> Self {
        let dispatcher = Dispatcher::new(config.worker_threads);
        let scheduler = Scheduler::new(dispatcher.handle().clone());
        let event_stream = Arc::new(EventStream::new());
        let (terminated_tx, terminated_rx) = watch::channel(false);

        let shared = Arc::new(SystemShared {
            name: name.to_string(),
            config,
            dispatcher,
            scheduler,
            event_stream: event_stream.clone(),
            dead_letters: OnceLock::new(),
            guardian: OnceLock::new(),
            terminated_tx,
        });

        let root = ActorPath::root(name);
        shared
            .dead_letters
            .set(ActorRef::dead_letter(root.child("deadLetters"), event_stream))
            .expect("dead letters set exactly once");

        let guardian = ActorCell::spawn(
            shared.clone(),
            None,
            Props::new(|| Guardian),
            root.child("user"),
        );
        shared
            .guardian
            .set(guardian)
            .expect("guardian set exactly once");

        info!(system = %name, "actor system started");
        Self {
            shared,
            terminated_rx,
        }
    }

    pub fn name(&self) -> &str {
        self.shared.name()
    }

    /// Spawns a top-level actor as a child of the user guardian.
    pub async fn spawn(&self, props: Props, name: &str) -> Result<ActorRef, SpawnError> {
        if self.is_terminated() {
            return Err(SpawnError::SystemShuttingDown);
        }
        let guardian = self.user_guardian();
        let cell = guardian
            .local_cell()
            .expect("guardian is a local actor")
            .clone();
        let mut state = cell.state.lock().await;
        state.ctx.spawn(props, name)
    }

    pub fn user_guardian(&self) -> ActorRef {
        self.shared
            .guardian
            .get()
            .expect("guardian initialized at system construction")
            .clone()
    }

    pub fn dead_letters(&self) -> ActorRef {
        self.shared.dead_letters()
    }

    /// Reference to a path with no live actor behind it. Messages are
    /// published as dead letters; watches resolve immediately as
    /// unconfirmed terminations.
    pub fn empty_ref(&self, path: ActorPath) -> ActorRef {
        ActorRef::empty_with_stream(path, self.shared.event_stream().clone())
    }

    pub fn event_stream(&self) -> &Arc<EventStream> {
        self.shared.event_stream()
    }

    pub fn scheduler(&self) -> &Scheduler {
        self.shared.scheduler()
    }

    /// Requests an irreversible stop of `actor`, jumping its user queue.
    pub fn stop(&self, actor: &ActorRef) {
        actor.send_system(SystemMessage::Terminate);
    }

    /// Stops the guardian (and with it the whole hierarchy, children first)
    /// and waits for the terminal transition.
    pub async fn terminate(&self) {
        self.user_guardian().send_system(SystemMessage::Terminate);
        self.terminated().await;
    }

    /// Resolves once the system has fully terminated.
    pub async fn terminated(&self) {
        let mut rx = self.terminated_rx.clone();
        if *rx.borrow() {
            return;
        }
        while rx.changed().await.is_ok() {
            if *rx.borrow() {
                return;
            }
        }
    }

    pub fn is_terminated(&self) -> bool {
        *self.terminated_rx.borrow()
    }
}

impl fmt::Debug for ActorSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorSystem")
            .field("name", &self.shared.name)
            .field("terminated", &self.is_terminated())
            .finish()
    }
}
