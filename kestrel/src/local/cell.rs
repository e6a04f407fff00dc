use crate::local::context::ActorContext;
use crate::local::envelope::Envelope;
use crate::local::event_stream::{DeadLetter, StreamEvent};
use crate::local::mailbox::{Mailbox, RejectedEnvelope};
use crate::local::messages::{
    ActorIdentity, Identify, Kill, PoisonPill, ReceiveTimeout, ReceiveTimeoutTick, Terminated,
};
use crate::local::path::ActorPath;
use crate::local::props::{BoxedActor, Props};
use crate::local::reference::{ActorRef, answer_system_for_dead};
use crate::local::system_message::SystemMessage;
use crate::system::SystemShared;
use futures::FutureExt;
use kestrel_api::actor::Handled;
use kestrel_api::errors::ActorError;
use kestrel_api::types::BoxedMessage;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tracing::{debug, error, warn};
use uuid::Uuid;

/// Structural operation waiting for all children to confirm termination.
#[derive(Debug)]
pub(crate) enum PendingOp {
    Terminate,
    Recreate { cause: Arc<ActorError> },
}

/// Fault captured while it travels through the supervision protocol.
pub(crate) struct FailureInfo {
    pub(crate) cause: Arc<ActorError>,
    pub(crate) message: Option<BoxedMessage>,
}

/// Cell-owned mutable state.
///
/// Only ever accessed inside the mailbox's run-exclusivity window, which is
/// what makes the actor an effectively single-threaded state machine.
pub(crate) struct CellState {
    pub(crate) props: Props,
    pub(crate) behavior: Option<BoxedActor>,
    pub(crate) ctx: ActorContext,
    pub(crate) failure: Option<FailureInfo>,
    pub(crate) pending: Option<PendingOp>,
    pub(crate) pending_terminated: Vec<Terminated>,
    pub(crate) terminating: bool,
}

/// Live execution context of one actor.
///
/// The cell owns the mailbox and the behavior instance and drives the
/// lifecycle state machine. Producers on arbitrary threads only touch the
/// mailbox; whoever wins the idle-to-busy transition schedules a dispatch
/// pass on the shared pool.
pub struct ActorCell {
    path: ActorPath,
    uid: Uuid,
    pub(crate) mailbox: Mailbox,
    pub(crate) system: Arc<SystemShared>,
    terminated: AtomicBool,
    pub(crate) state: Mutex<CellState>,
}

impl ActorCell {
    /// Creates a cell, attaches its reference and queues the `Create`
    /// message that will run `pre_start` inside the cell's first turn.
    pub(crate) fn spawn(
        system: Arc<SystemShared>,
        parent: Option<ActorRef>,
        props: Props,
        path: ActorPath,
    ) -> ActorRef {
        let mailbox_config = props
            .mailbox
            .clone()
            .unwrap_or_else(|| system.config().default_mailbox.clone());
        let strategy = props
            .supervisor_strategy
            .clone()
            .unwrap_or_else(|| system.config().default_supervisor_strategy.clone());

        let ctx = ActorContext::new(system.clone(), parent.clone(), strategy);
        let cell = Arc::new(ActorCell {
            path,
            uid: Uuid::new_v4(),
            mailbox: Mailbox::new(&mailbox_config),
            system,
            terminated: AtomicBool::new(false),
            state: Mutex::new(CellState {
                props,
                behavior: None,
                ctx,
                failure: None,
                pending: None,
                pending_terminated: Vec::new(),
                terminating: false,
            }),
        });

        let self_ref = ActorRef::local(cell.clone());
        {
            // The cell is not schedulable yet, so the lock is uncontended.
            let mut state = cell.state.try_lock().expect("fresh cell state is uncontended");
            state.ctx.attach_self_ref(self_ref.clone());
            if let Some(parent) = parent {
                // The parent is an implicit watcher of every child.
                state.ctx.add_watcher(parent);
            }
        }

        cell.mailbox
            .enqueue_system(SystemMessage::Create)
            .expect("fresh mailbox accepts system messages");
        cell.schedule();
        self_ref
    }

    pub fn path(&self) -> &ActorPath {
        &self.path
    }

    pub(crate) fn uid(&self) -> Uuid {
        self.uid
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::Acquire)
    }

    fn self_ref(self: &Arc<Self>) -> ActorRef {
        ActorRef::local(self.clone())
    }

    /// User-message entry point, callable from any thread.
    pub(crate) fn post(self: &Arc<Self>, envelope: Envelope) {
        match self.mailbox.enqueue_user(envelope) {
            Ok(()) => {
                if self.is_terminated() {
                    // Lost the race against the final pass; reroute.
                    self.drain_stranded();
                }
                self.schedule();
            }
            Err(rejected) => self.publish_rejected(rejected),
        }
    }

    /// System-message entry point, callable from any thread.
    pub(crate) fn post_system(self: &Arc<Self>, message: SystemMessage) {
        if self.is_terminated() {
            answer_system_for_dead(&self.self_ref(), message, true);
            return;
        }
        match self.mailbox.enqueue_system(message) {
            Ok(()) => {
                if self.is_terminated() {
                    self.drain_stranded();
                }
                self.schedule();
            }
            Err(message) => answer_system_for_dead(&self.self_ref(), message, true),
        }
    }

    /// Schedules a dispatch pass when there is work and nobody else claimed
    /// the mailbox. The producer that flips idle to busy never runs the
    /// pass itself.
    pub(crate) fn schedule(self: &Arc<Self>) {
        if self.mailbox.has_work() && self.mailbox.set_as_scheduled() {
            let cell = self.clone();
            self.system.dispatcher().execute(async move {
                cell.run().await;
            });
        }
    }

    /// One dispatch pass: drain every system message, then up to
    /// `throughput` user messages with a system drain between each.
    async fn run(self: Arc<Self>) {
        {
            let mut state = self.state.lock().await;
            self.process_all_system_messages(&mut state).await;

            let throughput = self.system.config().throughput.max(1);
            let mut processed = 0;
            while processed < throughput
                && !self.mailbox.is_closed()
                && !self.mailbox.is_suspended()
            {
                let Some(envelope) = self.mailbox.pop_user() else {
                    break;
                };
                self.process_envelope(&mut state, envelope).await;
                processed += 1;
                self.process_all_system_messages(&mut state).await;
            }

            if !state.terminating {
                state
                    .ctx
                    .maybe_arm_receive_timeout(self.mailbox.user_is_empty());
            }
        }
        self.mailbox.set_as_idle();
        // Work may have arrived while this pass held the token.
        self.schedule();
    }

    async fn process_all_system_messages(self: &Arc<Self>, state: &mut CellState) {
        while let Some(message) = self.mailbox.pop_system() {
            self.handle_system_message(state, message).await;
        }
    }

    async fn handle_system_message(self: &Arc<Self>, state: &mut CellState, message: SystemMessage) {
        if self.is_terminated() {
            answer_system_for_dead(&self.self_ref(), message, true);
            return;
        }
        match message {
            SystemMessage::Create => self.handle_create(state).await,
            SystemMessage::Suspend => {
                self.mailbox.suspend();
                for child in state.ctx.children() {
                    child.send_system(SystemMessage::Suspend);
                }
            }
            SystemMessage::Resume { caused_by_failure } => {
                self.handle_resume(state, caused_by_failure).await;
            }
            SystemMessage::Recreate { cause } => self.handle_recreate(state, cause).await,
            SystemMessage::Terminate => self.start_terminate(state).await,
            SystemMessage::Watch { watcher } => {
                state.ctx.add_watcher(watcher);
            }
            SystemMessage::Unwatch { watcher } => {
                state.ctx.remove_watcher(&watcher);
            }
            SystemMessage::DeathWatchNotification {
                actor,
                existence_confirmed,
                address_terminated,
            } => {
                self.handle_death_notification(state, actor, existence_confirmed, address_terminated)
                    .await;
            }
            SystemMessage::Failed { child, cause } => {
                self.handle_failed(state, child, cause).await;
            }
        }
    }

    async fn handle_create(self: &Arc<Self>, state: &mut CellState) {
        let produced = panic::catch_unwind(AssertUnwindSafe(|| state.props.produce()));
        let mut behavior = match produced {
            Ok(behavior) => behavior,
            Err(payload) => {
                let cause = ActorError::InitializationError(panic_message(payload));
                self.fail(state, Arc::new(cause), None).await;
                return;
            }
        };

        let started = AssertUnwindSafe(behavior.pre_start(&mut state.ctx))
            .catch_unwind()
            .await;
        state.behavior = Some(behavior);
        match started {
            Ok(Ok(())) => {
                debug!(path = %self.path, "actor started");
                self.system.event_stream().publish(StreamEvent::ActorStarted {
                    actor: state.ctx.self_ref(),
                });
            }
            Ok(Err(e)) => {
                let cause = ActorError::InitializationError(e.to_string());
                self.fail(state, Arc::new(cause), None).await;
            }
            Err(payload) => {
                let cause = ActorError::InitializationError(panic_message(payload));
                self.fail(state, Arc::new(cause), None).await;
            }
        }
    }

    async fn process_envelope(self: &Arc<Self>, state: &mut CellState, envelope: Envelope) {
        let Envelope { message, sender } = envelope;

        if message.downcast_ref::<PoisonPill>().is_some() {
            self.start_terminate(state).await;
            return;
        }
        if message.downcast_ref::<Kill>().is_some() {
            self.fail(state, Arc::new(ActorError::Killed), Some(message)).await;
            return;
        }
        if let Some(identify) = message.downcast_ref::<Identify>() {
            let reply_to = sender.unwrap_or_else(|| self.system.dead_letters());
            reply_to.tell(
                ActorIdentity {
                    correlation_id: identify.correlation_id,
                    subject: Some(state.ctx.self_ref()),
                },
                Some(state.ctx.self_ref()),
            );
            return;
        }
        if let Some(tick) = message.downcast_ref::<ReceiveTimeoutTick>() {
            // A tick that raced with new activity or a reconfiguration is
            // dropped without effect.
            if tick.generation == state.ctx.timeout_generation()
                && state.ctx.receive_timeout().is_some()
                && self.mailbox.user_is_empty()
            {
                state.ctx.mark_timeout_fired();
                self.invoke_behavior(state, Box::new(ReceiveTimeout), None).await;
            }
            return;
        }

        state.ctx.note_activity();
        self.invoke_behavior(state, message, sender).await;
    }

    /// Runs the behavior on one message, converting errors and panics into
    /// supervised failures. Nothing escapes to the worker thread.
    async fn invoke_behavior(
        self: &Arc<Self>,
        state: &mut CellState,
        message: BoxedMessage,
        sender: Option<ActorRef>,
    ) {
        if state.behavior.is_none() {
            self.publish_rejected(RejectedEnvelope {
                envelope: Envelope::new(message, sender),
                error: crate::error::MailboxError::Closed,
            });
            return;
        }

        state.ctx.set_sender(sender);
        let outcome = {
            let CellState { behavior, ctx, .. } = state;
            let behavior = behavior.as_mut().expect("behavior checked above");
            AssertUnwindSafe(behavior.receive(&message, ctx))
                .catch_unwind()
                .await
        };
        state.ctx.clear_sender();

        match outcome {
            Ok(Ok(Handled::Yes)) => {}
            Ok(Ok(Handled::No)) => {
                if let Some(terminated) = message.downcast_ref::<Terminated>() {
                    // Death pact: an unhandled termination notice is a
                    // protocol violation of the watcher.
                    let cause = ActorError::DeathPact(terminated.actor.path().to_string());
                    self.fail(state, Arc::new(cause), Some(message)).await;
                } else if message.downcast_ref::<ReceiveTimeout>().is_none() {
                    self.system
                        .event_stream()
                        .publish(StreamEvent::UnhandledMessage(DeadLetter {
                            message,
                            sender: None,
                            recipient: state.ctx.self_ref(),
                        }));
                }
            }
            Ok(Err(e)) => self.fail(state, Arc::new(e), Some(message)).await,
            Err(payload) => {
                let cause = ActorError::Panic(panic_message(payload));
                self.fail(state, Arc::new(cause), Some(message)).await;
            }
        }
    }

    async fn handle_resume(
        self: &Arc<Self>,
        state: &mut CellState,
        caused_by_failure: Option<Arc<ActorError>>,
    ) {
        if state.terminating {
            return;
        }
        if let Some(failure) = state.failure.take() {
            debug!(path = %self.path, error = %failure.cause, "resuming after failure");
        }
        self.mailbox.resume();
        for child in state.ctx.children() {
            child.send_system(SystemMessage::Resume {
                caused_by_failure: caused_by_failure.clone(),
            });
        }
        self.replay_pending_terminated(state).await;
    }

    /// Restart sequence: old-instance cleanup hook, stop and unwatch all
    /// children, then recreate once the last child confirmed termination.
    async fn handle_recreate(self: &Arc<Self>, state: &mut CellState, cause: Arc<ActorError>) {
        // A second directive while a restart is already waiting on children
        // would unbalance the suspend count; the restart in flight wins.
        if state.terminating || state.pending.is_some() {
            return;
        }
        // Keep user messages queued while the restart is in flight. A cell
        // that failed already suspended itself.
        let failure = state.failure.take();
        if failure.is_none() {
            self.mailbox.suspend();
        }
        let failed_message = failure.and_then(|info| info.message);

        if state.behavior.is_some() {
            let CellState { behavior, ctx, .. } = state;
            let behavior = behavior.as_mut().expect("behavior checked above");
            let hook = AssertUnwindSafe(behavior.pre_restart(&cause, failed_message.as_ref(), ctx))
                .catch_unwind()
                .await;
            match hook {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(path = %self.path, error = %e, "pre_restart hook failed"),
                Err(_) => warn!(path = %self.path, "pre_restart hook panicked"),
            }
        }

        for child in state.ctx.children() {
            state.ctx.remove_watching(&child);
            child.send_system(SystemMessage::Terminate);
        }

        state.pending = Some(PendingOp::Recreate { cause });
        if state.ctx.children_container().is_empty() {
            self.finish_recreate(state).await;
        }
    }

    async fn finish_recreate(self: &Arc<Self>, state: &mut CellState) {
        let cause = match state.pending.take() {
            Some(PendingOp::Recreate { cause }) => cause,
            Some(other) => {
                state.pending = Some(other);
                return;
            }
            None => return,
        };

        let produced = panic::catch_unwind(AssertUnwindSafe(|| state.props.produce()));
        let mut behavior = match produced {
            Ok(behavior) => behavior,
            Err(payload) => {
                state.behavior = None;
                let error = ActorError::InitializationError(panic_message(payload));
                self.fail(state, Arc::new(error), None).await;
                return;
            }
        };

        let hook = AssertUnwindSafe(behavior.post_restart(&cause, &mut state.ctx))
            .catch_unwind()
            .await;
        state.behavior = Some(behavior);
        match hook {
            Ok(Ok(())) => {
                debug!(path = %self.path, "actor restarted");
                self.system
                    .event_stream()
                    .publish(StreamEvent::ActorRestarted {
                        actor: state.ctx.self_ref(),
                        reason: cause.to_string(),
                    });
                state.ctx.note_activity();
                self.mailbox.resume();
                self.replay_pending_terminated(state).await;
            }
            Ok(Err(e)) => {
                let error = ActorError::InitializationError(e.to_string());
                self.fail(state, Arc::new(error), None).await;
            }
            Err(payload) => {
                let error = ActorError::InitializationError(panic_message(payload));
                self.fail(state, Arc::new(error), None).await;
            }
        }
    }

    /// Irreversible stop. Children are stopped first; the cell reaches its
    /// terminal state only after every child confirmed termination.
    pub(crate) async fn start_terminate(self: &Arc<Self>, state: &mut CellState) {
        if state.terminating {
            return;
        }
        state.terminating = true;
        state.ctx.children_container().set_terminating();
        state.ctx.cancel_receive_timeout();
        self.mailbox.suspend();

        let children = state.ctx.children();
        if children.is_empty() {
            self.finish_terminate(state).await;
        } else {
            // A stop overrides a restart that was waiting on children.
            state.pending = Some(PendingOp::Terminate);
            for child in children {
                child.send_system(SystemMessage::Terminate);
            }
        }
    }

    async fn finish_terminate(self: &Arc<Self>, state: &mut CellState) {
        let self_ref = state.ctx.self_ref();

        if let Some(mut behavior) = state.behavior.take() {
            let hook = AssertUnwindSafe(behavior.post_stop(&mut state.ctx))
                .catch_unwind()
                .await;
            match hook {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(path = %self.path, error = %e, "post_stop hook failed"),
                Err(_) => warn!(path = %self.path, "post_stop hook panicked"),
            }
        }

        state.ctx.cancel_receive_timeout();
        self.mailbox.close();
        self.terminated.store(true, Ordering::Release);

        // Everything still queued is undeliverable now.
        while let Some(envelope) = self.mailbox.pop_user() {
            self.system.event_stream().publish_dead_letter(DeadLetter {
                message: envelope.message,
                sender: envelope.sender,
                recipient: self_ref.clone(),
            });
        }
        while let Some(message) = self.mailbox.pop_system() {
            answer_system_for_dead(&self_ref, message, true);
        }

        for target in state.ctx.drain_watching() {
            target.send_system(SystemMessage::Unwatch {
                watcher: self_ref.clone(),
            });
        }
        for watcher in state.ctx.drain_watchers() {
            watcher.send_system(SystemMessage::DeathWatchNotification {
                actor: self_ref.clone(),
                existence_confirmed: true,
                address_terminated: false,
            });
        }

        debug!(path = %self.path, "actor stopped");
        self.system.event_stream().publish(StreamEvent::ActorStopped {
            actor: self_ref,
        });

        let is_root = state.ctx.parent_ref().is_none();
        state.pending = None;
        state.pending_terminated.clear();
        state.ctx.release_after_terminate();

        if is_root {
            self.system.mark_terminated();
        }
    }

    async fn handle_death_notification(
        self: &Arc<Self>,
        state: &mut CellState,
        actor: ActorRef,
        existence_confirmed: bool,
        address_terminated: bool,
    ) {
        let was_watching = state.ctx.remove_watching(&actor);
        let was_child = state.ctx.children_container().remove(&actor).is_some();

        if was_watching && !state.terminating {
            let notice = Terminated {
                actor: actor.clone(),
                existence_confirmed,
                address_terminated,
            };
            if state.failure.is_some() || state.pending.is_some() {
                // Replayed once the supervisor's directive has been applied.
                state.pending_terminated.push(notice);
            } else {
                self.invoke_behavior(state, Box::new(notice), None).await;
            }
        }

        if was_child && state.ctx.children_container().is_empty() {
            let pending_terminate = matches!(state.pending, Some(PendingOp::Terminate));
            let pending_recreate = matches!(state.pending, Some(PendingOp::Recreate { .. }));
            if pending_terminate {
                self.finish_terminate(state).await;
            } else if pending_recreate {
                self.finish_recreate(state).await;
            }
        }
    }

    async fn replay_pending_terminated(self: &Arc<Self>, state: &mut CellState) {
        while !state.pending_terminated.is_empty() {
            if state.failure.is_some() || state.terminating {
                break;
            }
            let notice = state.pending_terminated.remove(0);
            self.invoke_behavior(state, Box::new(notice), None).await;
        }
    }

    /// Reifies a fault: suspend the subtree and report to the supervisor.
    /// At the root there is no supervisor left, so the system shuts down.
    pub(crate) async fn fail(
        self: &Arc<Self>,
        state: &mut CellState,
        cause: Arc<ActorError>,
        message: Option<BoxedMessage>,
    ) {
        if state.terminating {
            return;
        }
        if state.failure.is_some() {
            warn!(path = %self.path, error = %cause, "failure while already failed, keeping first cause");
            return;
        }

        error!(path = %self.path, error = %cause, "actor failed");
        state.failure = Some(FailureInfo {
            cause: cause.clone(),
            message,
        });
        self.mailbox.suspend();
        for child in state.ctx.children() {
            child.send_system(SystemMessage::Suspend);
        }

        let parent = state.ctx.parent_ref().cloned();
        match parent {
            Some(parent) => {
                parent.send_system(SystemMessage::Failed {
                    child: state.ctx.self_ref(),
                    cause,
                });
            }
            None => {
                error!(path = %self.path, "failure reached the root guardian, shutting the system down");
                self.start_terminate(state).await;
            }
        }
    }

    /// Reroutes messages that slipped into the queues while the final pass
    /// was closing them. Safe from any thread: only queue operations and
    /// sends, never cell state.
    fn drain_stranded(self: &Arc<Self>) {
        let self_ref = self.self_ref();
        while let Some(envelope) = self.mailbox.pop_user() {
            self.system.event_stream().publish_dead_letter(DeadLetter {
                message: envelope.message,
                sender: envelope.sender,
                recipient: self_ref.clone(),
            });
        }
        while let Some(message) = self.mailbox.pop_system() {
            answer_system_for_dead(&self_ref, message, true);
        }
    }

    fn publish_rejected(self: &Arc<Self>, rejected: RejectedEnvelope) {
        debug!(path = %self.path, error = %rejected.error, "redirecting undeliverable message");
        self.system.event_stream().publish_dead_letter(DeadLetter {
            message: rejected.envelope.message,
            sender: rejected.envelope.sender,
            recipient: self.self_ref(),
        });
    }
}

pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(text) = payload.downcast_ref::<&'static str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "opaque panic payload".to_string()
    }
}
