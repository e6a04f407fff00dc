use crate::error::SpawnError;
use crate::local::cell::ActorCell;
use crate::local::children::ChildrenContainer;
use crate::local::messages::ReceiveTimeoutTick;
use crate::local::path::{self, ActorPath};
use crate::local::props::Props;
use crate::local::reference::ActorRef;
use crate::local::scheduler::TimerHandle;
use crate::local::system_message::SystemMessage;
use crate::system::SystemShared;
use kestrel_api::supervisor::SupervisorStrategyKind;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Execution context handed to a behavior while one of its hooks runs.
///
/// The context is part of the cell's single-writer state: it is only ever
/// touched from the owning cell's turn, so none of these operations need
/// further synchronization.
pub struct ActorContext {
    system: Arc<SystemShared>,
    self_ref: Option<ActorRef>,
    parent: Option<ActorRef>,
    sender: Option<ActorRef>,
    children: ChildrenContainer,
    supervisor_strategy: SupervisorStrategyKind,
    watching: HashSet<ActorRef>,
    watched_by: HashSet<ActorRef>,
    receive_timeout: Option<Duration>,
    timeout_generation: u64,
    timeout_timer: Option<TimerHandle>,
    timeout_fired: bool,
}

impl ActorContext {
    pub(crate) fn new(
        system: Arc<SystemShared>,
        parent: Option<ActorRef>,
        supervisor_strategy: SupervisorStrategyKind,
    ) -> Self {
        Self {
            system,
            self_ref: None,
            parent,
            sender: None,
            children: ChildrenContainer::new(),
            supervisor_strategy,
            watching: HashSet::new(),
            watched_by: HashSet::new(),
            receive_timeout: None,
            timeout_generation: 0,
            timeout_timer: None,
            timeout_fired: false,
        }
    }

    /// Reference to the actor this context belongs to.
    pub fn self_ref(&self) -> ActorRef {
        self.self_ref
            .as_ref()
            .expect("self reference not yet attached")
            .clone()
    }

    pub fn parent(&self) -> Option<ActorRef> {
        self.parent.clone()
    }

    pub fn path(&self) -> &ActorPath {
        self.self_ref
            .as_ref()
            .expect("self reference not yet attached")
            .path()
    }

    /// Sender of the message currently being processed. Falls back to the
    /// dead-letter reference when the message carried no sender.
    pub fn sender(&self) -> ActorRef {
        self.sender
            .clone()
            .unwrap_or_else(|| self.system.dead_letters())
    }

    pub fn dead_letters(&self) -> ActorRef {
        self.system.dead_letters()
    }

    /// Creates a child actor under the given name.
    ///
    /// Structural problems (bad or duplicate name, stopping parent) are
    /// reported synchronously to the caller.
    pub fn spawn(&mut self, props: Props, name: &str) -> Result<ActorRef, SpawnError> {
        path::validate_name(name)?;
        self.children.reserve(name)?;

        let parent = self.self_ref();
        let child_path = parent.path().child(name);
        let child = ActorCell::spawn(self.system.clone(), Some(parent), props, child_path);
        self.children.commit(name, child.clone());
        // The parent is an implicit watcher: the child was registered at
        // cell construction, so its termination always reports back here.
        Ok(child)
    }

    /// Requests an irreversible stop of `target`, jumping the user queue.
    /// For a stop that respects queued messages, send a `PoisonPill`.
    pub fn stop(&mut self, target: &ActorRef) {
        target.send_system(SystemMessage::Terminate);
    }

    /// Registers this actor for a `Terminated` notification from `target`.
    /// Watching the same target twice has no additional effect.
    pub fn watch(&mut self, target: &ActorRef) -> ActorRef {
        let me = self.self_ref();
        if *target == me {
            warn!(path = %me.path(), "actor attempted to watch itself, ignoring");
            return target.clone();
        }
        if self.watching.insert(target.clone()) {
            target.send_system(SystemMessage::Watch { watcher: me });
        }
        target.clone()
    }

    /// Removes a watch registration. A no-op when the relation is absent or
    /// the notification already fired.
    pub fn unwatch(&mut self, target: &ActorRef) {
        if self.watching.remove(target) {
            target.send_system(SystemMessage::Unwatch {
                watcher: self.self_ref(),
            });
        }
    }

    /// Configures the idle duration after which a single `ReceiveTimeout`
    /// is delivered. `None` disables the timeout.
    pub fn set_receive_timeout(&mut self, timeout: Option<Duration>) {
        self.receive_timeout = timeout;
        self.note_activity();
    }

    pub fn receive_timeout(&self) -> Option<Duration> {
        self.receive_timeout
    }

    /// Living children of this actor.
    pub fn children(&self) -> Vec<ActorRef> {
        self.children.refs()
    }

    pub fn child(&self, name: &str) -> Option<ActorRef> {
        match self.children.get(name) {
            Some(crate::local::children::ChildEntry::Living { actor, .. }) => Some(actor.clone()),
            _ => None,
        }
    }

    // Cell-internal surface below.

    pub(crate) fn attach_self_ref(&mut self, self_ref: ActorRef) {
        self.self_ref = Some(self_ref);
    }

    pub(crate) fn parent_ref(&self) -> Option<&ActorRef> {
        self.parent.as_ref()
    }

    pub(crate) fn set_sender(&mut self, sender: Option<ActorRef>) {
        self.sender = sender;
    }

    pub(crate) fn clear_sender(&mut self) {
        self.sender = None;
    }

    pub(crate) fn children_container(&mut self) -> &mut ChildrenContainer {
        &mut self.children
    }

    pub(crate) fn supervisor_strategy(&self) -> SupervisorStrategyKind {
        self.supervisor_strategy.clone()
    }

    pub(crate) fn add_watcher(&mut self, watcher: ActorRef) {
        self.watched_by.insert(watcher);
    }

    pub(crate) fn remove_watcher(&mut self, watcher: &ActorRef) {
        self.watched_by.remove(watcher);
    }

    pub(crate) fn remove_watching(&mut self, target: &ActorRef) -> bool {
        self.watching.remove(target)
    }

    pub(crate) fn drain_watching(&mut self) -> Vec<ActorRef> {
        self.watching.drain().collect()
    }

    pub(crate) fn drain_watchers(&mut self) -> Vec<ActorRef> {
        self.watched_by.drain().collect()
    }

    /// Invalidates any in-flight receive-timeout tick and re-enables the
    /// timer. Called for every real user message.
    pub(crate) fn note_activity(&mut self) {
        self.timeout_generation = self.timeout_generation.wrapping_add(1);
        self.timeout_fired = false;
        if let Some(timer) = self.timeout_timer.take() {
            timer.cancel();
        }
    }

    pub(crate) fn timeout_generation(&self) -> u64 {
        self.timeout_generation
    }

    /// Marks the current idle period as notified; no further timer is armed
    /// until new activity arrives.
    pub(crate) fn mark_timeout_fired(&mut self) {
        self.timeout_fired = true;
        self.timeout_timer = None;
    }

    pub(crate) fn cancel_receive_timeout(&mut self) {
        if let Some(timer) = self.timeout_timer.take() {
            timer.cancel();
        }
    }

    /// Arms the one-shot idle timer when configured, the user queue is
    /// empty and the current idle period has not fired yet.
    pub(crate) fn maybe_arm_receive_timeout(&mut self, user_queue_empty: bool) {
        let Some(duration) = self.receive_timeout else {
            return;
        };
        if self.timeout_fired || !user_queue_empty || self.timeout_timer.is_some() {
            return;
        }
        let tick = ReceiveTimeoutTick {
            generation: self.timeout_generation,
        };
        let handle = self.system.scheduler().schedule_once(
            duration,
            self.self_ref(),
            Box::new(tick),
            None,
        );
        self.timeout_timer = Some(handle);
    }

    /// Breaks reference cycles once the cell has fully terminated.
    pub(crate) fn release_after_terminate(&mut self) {
        self.self_ref = None;
        self.parent = None;
        self.sender = None;
        self.children.clear();
        self.watching.clear();
        self.watched_by.clear();
    }
}

impl fmt::Debug for ActorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorContext")
            .field("self_ref", &self.self_ref)
            .field("children", &self.children.len())
            .field("watching", &self.watching.len())
            .field("watched_by", &self.watched_by.len())
            .finish()
    }
}
