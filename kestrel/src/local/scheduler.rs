use crate::local::reference::ActorRef;
use kestrel_api::types::BoxedMessage;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Cancelable handle for a scheduled delivery.
///
/// Cancellation races with an already-fired timer are tolerated: the target
/// must treat a late message as a no-op, which the cell does through its
/// timeout generation counter.
pub struct TimerHandle {
    cancelled: Arc<AtomicBool>,
    join: JoinHandle<()>,
}

impl TimerHandle {
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.join.abort();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerHandle")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Timer facade: delay a single message delivery, never touch actor state.
///
/// Timers only ever inject messages through the regular send path, which
/// keeps the single-writer discipline intact.
#[derive(Clone, Debug)]
pub struct Scheduler {
    handle: Handle,
}

impl Scheduler {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Delivers `message` to `target` after `delay`, at most once.
    pub fn schedule_once(
        &self,
        delay: Duration,
        target: ActorRef,
        message: BoxedMessage,
        sender: Option<ActorRef>,
    ) -> TimerHandle {
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = cancelled.clone();
        let join = self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            if !flag.load(Ordering::SeqCst) {
                target.tell_boxed(message, sender);
            }
        });
        TimerHandle { cancelled, join }
    }
}
