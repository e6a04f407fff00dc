use crate::errors::ActorError;
use crate::types::{ActorResult, BoxedFuture, BoxedMessage};

/// Outcome of a single message delivery.
///
/// Behaviors report whether they recognized the message. Unhandled ordinary
/// messages are published to the event stream; an unhandled `Terminated`
/// notification is a death-pact failure of the receiving actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handled {
    Yes,
    No,
}

impl Handled {
    pub fn is_handled(self) -> bool {
        matches!(self, Handled::Yes)
    }
}

/// Core Actor trait.
///
/// An actor is an isolated unit of state driven by its cell: the runtime
/// guarantees that at most one of these methods runs at any time for a given
/// instance, so implementations are free to mutate `self` without further
/// synchronization. Messages arrive type-erased; handlers downcast to the
/// types they understand.
pub trait Actor: Send + 'static {
    /// Execution context type supplied by the runtime.
    type Context: Send;

    /// Called once before the first message is processed.
    fn pre_start<'a>(&'a mut self, _ctx: &'a mut Self::Context) -> BoxedFuture<'a, ActorResult<()>> {
        Box::pin(async { Ok(()) })
    }

    /// Handle an incoming message.
    ///
    /// The message stays owned by the cell so that a failing delivery can be
    /// reported to `pre_restart` together with its cause.
    fn receive<'a>(
        &'a mut self,
        msg: &'a BoxedMessage,
        ctx: &'a mut Self::Context,
    ) -> BoxedFuture<'a, ActorResult<Handled>>;

    /// Cleanup hook invoked on the old instance before a restart replaces it.
    ///
    /// `message` is the delivery that triggered the failure, when there was
    /// one. The cell stops all children during the restart sequence; the
    /// default implementation therefore only delegates to `post_stop`.
    fn pre_restart<'a>(
        &'a mut self,
        _cause: &'a ActorError,
        _message: Option<&'a BoxedMessage>,
        ctx: &'a mut Self::Context,
    ) -> BoxedFuture<'a, ActorResult<()>> {
        self.post_stop(ctx)
    }

    /// Invoked on the fresh instance created by a restart.
    fn post_restart<'a>(
        &'a mut self,
        _cause: &'a ActorError,
        ctx: &'a mut Self::Context,
    ) -> BoxedFuture<'a, ActorResult<()>> {
        self.pre_start(ctx)
    }

    /// Cleanup work after the actor has stopped processing messages.
    fn post_stop<'a>(&'a mut self, _ctx: &'a mut Self::Context) -> BoxedFuture<'a, ActorResult<()>> {
        Box::pin(async { Ok(()) })
    }
}
