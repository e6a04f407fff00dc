use crate::config::MailboxConfig;
use crate::error::MailboxError;
use crate::local::envelope::Envelope;
use crate::local::system_message::SystemMessage;
use crossbeam_queue::SegQueue;
use std::sync::atomic::{AtomicUsize, Ordering};

// Status word layout: low bits are flags, the rest is the suspend count.
const SCHEDULED: usize = 0b01;
const CLOSED: usize = 0b10;
const SUSPEND_UNIT: usize = 0b100;

/// Envelope bounced by a mailbox, handed back to the sending reference for
/// dead-letter publication.
#[derive(Debug)]
pub struct RejectedEnvelope {
    pub envelope: Envelope,
    pub error: MailboxError,
}

/// Per-actor queue pair plus scheduling state.
///
/// The system queue always outranks the user queue: a dispatch pass drains
/// every pending system message before it dequeues a single user envelope.
/// The status word carries the run-exclusivity claim (`SCHEDULED`), the
/// terminal `CLOSED` flag and a nestable suspend count; all scheduling
/// decisions reduce to CAS loops on that one atomic.
pub struct Mailbox {
    system_queue: SegQueue<SystemMessage>,
    user_tx: flume::Sender<Envelope>,
    user_rx: flume::Receiver<Envelope>,
    status: AtomicUsize,
    capacity: Option<usize>,
}

impl Mailbox {
    pub fn new(config: &MailboxConfig) -> Self {
        let (user_tx, user_rx) = match config.capacity {
            Some(capacity) => flume::bounded(capacity),
            None => flume::unbounded(),
        };
        Self {
            system_queue: SegQueue::new(),
            user_tx,
            user_rx,
            status: AtomicUsize::new(0),
            capacity: config.capacity,
        }
    }

    /// Enqueues a user envelope, bouncing it when the mailbox is closed or
    /// over capacity. Per-producer FIFO order is preserved by the channel.
    pub fn enqueue_user(&self, envelope: Envelope) -> Result<(), RejectedEnvelope> {
        if self.is_closed() {
            return Err(RejectedEnvelope {
                envelope,
                error: MailboxError::Closed,
            });
        }
        match self.user_tx.try_send(envelope) {
            Ok(()) => Ok(()),
            Err(flume::TrySendError::Full(envelope)) => Err(RejectedEnvelope {
                envelope,
                error: MailboxError::Full {
                    capacity: self.capacity.unwrap_or(0),
                },
            }),
            Err(flume::TrySendError::Disconnected(envelope)) => Err(RejectedEnvelope {
                envelope,
                error: MailboxError::Closed,
            }),
        }
    }

    /// Enqueues a system message. Returns the message when the mailbox has
    /// already closed so the caller can run the terminated-reference
    /// protocol (watch replies, dead letters) instead.
    pub fn enqueue_system(&self, message: SystemMessage) -> Result<(), SystemMessage> {
        if self.is_closed() {
            return Err(message);
        }
        self.system_queue.push(message);
        Ok(())
    }

    pub fn pop_system(&self) -> Option<SystemMessage> {
        self.system_queue.pop()
    }

    pub fn pop_user(&self) -> Option<Envelope> {
        self.user_rx.try_recv().ok()
    }

    pub fn has_system_messages(&self) -> bool {
        !self.system_queue.is_empty()
    }

    pub fn user_is_empty(&self) -> bool {
        self.user_rx.is_empty()
    }

    pub fn user_len(&self) -> usize {
        self.user_rx.len()
    }

    pub fn suspend(&self) {
        self.status.fetch_add(SUSPEND_UNIT, Ordering::AcqRel);
    }

    /// Decrements the suspend count. Returns true when the mailbox is no
    /// longer suspended.
    pub fn resume(&self) -> bool {
        let mut current = self.status.load(Ordering::Acquire);
        loop {
            if current < SUSPEND_UNIT {
                return true;
            }
            match self.status.compare_exchange_weak(
                current,
                current - SUSPEND_UNIT,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return current < 2 * SUSPEND_UNIT,
                Err(actual) => current = actual,
            }
        }
    }

    pub fn is_suspended(&self) -> bool {
        self.status.load(Ordering::Acquire) >= SUSPEND_UNIT
    }

    /// Marks the mailbox closed. Already-queued messages stay in place for
    /// the final drain; new sends bounce.
    pub fn close(&self) {
        self.status.fetch_or(CLOSED, Ordering::AcqRel);
    }

    pub fn is_closed(&self) -> bool {
        self.status.load(Ordering::Acquire) & CLOSED != 0
    }

    /// Claims the run-exclusivity token. Exactly one caller wins an
    /// idle-to-busy transition; the winner is responsible for scheduling
    /// the dispatch pass.
    pub fn set_as_scheduled(&self) -> bool {
        let mut current = self.status.load(Ordering::Acquire);
        loop {
            if current & (SCHEDULED | CLOSED) != 0 {
                return false;
            }
            match self.status.compare_exchange_weak(
                current,
                current | SCHEDULED,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    pub fn set_as_idle(&self) {
        self.status.fetch_and(!SCHEDULED, Ordering::AcqRel);
    }

    pub fn is_scheduled(&self) -> bool {
        self.status.load(Ordering::Acquire) & SCHEDULED != 0
    }

    /// Whether a dispatch pass would find something to do right now.
    pub fn has_work(&self) -> bool {
        self.has_system_messages() || (!self.is_suspended() && !self.user_is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mailbox(capacity: Option<usize>) -> Mailbox {
        Mailbox::new(&MailboxConfig { capacity })
    }

    fn envelope(tag: &'static str) -> Envelope {
        Envelope::new(Box::new(tag), None)
    }

    #[test]
    fn user_fifo_is_preserved() {
        let mb = mailbox(None);
        mb.enqueue_user(envelope("a")).unwrap();
        mb.enqueue_user(envelope("b")).unwrap();

        let first = mb.pop_user().unwrap();
        assert_eq!(*first.message.downcast::<&str>().unwrap(), "a");
        let second = mb.pop_user().unwrap();
        assert_eq!(*second.message.downcast::<&str>().unwrap(), "b");
        assert!(mb.pop_user().is_none());
    }

    #[test]
    fn bounded_mailbox_bounces_overflow() {
        let mb = mailbox(Some(1));
        mb.enqueue_user(envelope("a")).unwrap();
        let rejected = mb.enqueue_user(envelope("b")).unwrap_err();
        assert_eq!(rejected.error, MailboxError::Full { capacity: 1 });
    }

    #[test]
    fn closed_mailbox_bounces_user_but_drains_system() {
        let mb = mailbox(None);
        mb.enqueue_system(SystemMessage::Terminate).unwrap();
        mb.close();

        let rejected = mb.enqueue_user(envelope("late")).unwrap_err();
        assert_eq!(rejected.error, MailboxError::Closed);
        assert!(mb.enqueue_system(SystemMessage::Suspend).is_err());
        // The message queued before the close is still drainable.
        assert!(mb.pop_system().is_some());
    }

    #[test]
    fn scheduling_token_is_exclusive() {
        let mb = mailbox(None);
        assert!(mb.set_as_scheduled());
        assert!(!mb.set_as_scheduled());
        mb.set_as_idle();
        assert!(mb.set_as_scheduled());
    }

    #[test]
    fn closed_mailbox_cannot_be_scheduled() {
        let mb = mailbox(None);
        mb.close();
        assert!(!mb.set_as_scheduled());
    }

    #[test]
    fn suspend_count_nests() {
        let mb = mailbox(None);
        mb.suspend();
        mb.suspend();
        assert!(mb.is_suspended());
        assert!(!mb.resume());
        assert!(mb.resume());
        assert!(!mb.is_suspended());
    }

    #[test]
    fn suspended_mailbox_only_has_system_work() {
        let mb = mailbox(None);
        mb.enqueue_user(envelope("a")).unwrap();
        mb.suspend();
        assert!(!mb.has_work());
        mb.enqueue_system(SystemMessage::Suspend).unwrap();
        assert!(mb.has_work());
    }
}
