use kestrel_api::supervisor::SupervisorStrategyKind;
use std::time::Duration;

/// Mailbox tuning for one actor.
#[derive(Debug, Clone, Default)]
pub struct MailboxConfig {
    /// Upper bound on queued user messages. `None` means unbounded.
    /// Overflowing envelopes are redirected to dead letters.
    pub capacity: Option<usize>,
}

impl MailboxConfig {
    pub fn bounded(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
        }
    }
}

/// System-wide runtime configuration.
#[derive(Debug, Clone)]
pub struct SystemConfig {
    /// Maximum user messages one dispatch pass processes before the cell
    /// yields its worker.
    pub throughput: usize,
    /// Worker threads for a dispatcher-owned runtime. Ignored when the
    /// system adopts the runtime it was created in. Defaults to the number
    /// of CPUs.
    pub worker_threads: Option<usize>,
    /// Mailbox settings applied when a spawn does not override them.
    pub default_mailbox: MailboxConfig,
    /// Strategy applied by supervisors that do not configure their own.
    pub default_supervisor_strategy: SupervisorStrategyKind,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            throughput: 16,
            worker_threads: None,
            default_mailbox: MailboxConfig::default(),
            default_supervisor_strategy: SupervisorStrategyKind::one_for_one(
                10,
                Duration::from_secs(60),
            ),
        }
    }
}
