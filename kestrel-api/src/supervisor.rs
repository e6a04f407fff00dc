use crate::errors::ActorError;
use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Supervision decision for handling actor failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisionDecision {
    /// Resume the child, keeping its state and queued messages
    Resume,
    /// Restart the child, replacing its behavior instance
    Restart,
    /// Stop the child
    Stop,
    /// Escalate the failure to the supervisor's own parent
    Escalate,
}

/// Decision function trait
pub trait DecisionFn: Send + Sync + Debug + 'static {
    fn decide(&self, error: &ActorError) -> SupervisionDecision;
}

/// Basic decision function implementation
#[derive(Clone)]
pub struct BasicDecisionFn(Arc<dyn Fn(&ActorError) -> SupervisionDecision + Send + Sync>);

impl Debug for BasicDecisionFn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BasicDecisionFn(<function>)")
    }
}

impl BasicDecisionFn {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&ActorError) -> SupervisionDecision + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }
}

impl DecisionFn for BasicDecisionFn {
    fn decide(&self, error: &ActorError) -> SupervisionDecision {
        (self.0)(error)
    }
}

/// Default decider: restart ordinary processing failures, stop actors that
/// never managed to initialize, stop killed actors and broken death pacts.
pub fn default_decider() -> BasicDecisionFn {
    BasicDecisionFn::new(|error| match error {
        ActorError::InitializationError(_) => SupervisionDecision::Stop,
        ActorError::Killed => SupervisionDecision::Stop,
        ActorError::DeathPact(_) => SupervisionDecision::Stop,
        _ => SupervisionDecision::Restart,
    })
}

/// Restart bookkeeping for one supervised child.
///
/// The window is anchored at the first observed failure; a failure arriving
/// after the window has elapsed resets the count and re-anchors.
#[derive(Debug, Clone, Copy, Default)]
pub struct RestartStatistics {
    restart_count: u32,
    window_start: Option<Instant>,
}

impl RestartStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a failure at `now` and returns the failure count inside the
    /// current window.
    pub fn record_failure(&mut self, now: Instant, window: Duration) -> u32 {
        match self.window_start {
            Some(start) if now.duration_since(start) <= window => {}
            _ => {
                self.window_start = Some(now);
                self.restart_count = 0;
            }
        }
        self.restart_count += 1;
        self.restart_count
    }

    pub fn restart_count(&self) -> u32 {
        self.restart_count
    }

    pub fn window_start(&self) -> Option<Instant> {
        self.window_start
    }
}

/// Supervisor strategy trait
///
/// Consulted by a cell when one of its children reports a failure. The
/// statistics belong to the failing child and are updated as part of the
/// decision.
#[async_trait]
pub trait SupervisorStrategy: Send + Sync + Debug + 'static {
    async fn decide(&self, error: &ActorError, stats: &mut RestartStatistics) -> SupervisionDecision;

    /// Whether the decision applies to every child of the supervisor or only
    /// to the one that failed.
    fn applies_to_all_children(&self) -> bool {
        false
    }
}

/// Fixed supervision strategies
#[derive(Debug, Clone, Copy)]
pub enum DefaultStrategy {
    /// Always stop on failure
    StopOnFailure,
    /// Always restart on failure
    RestartOnFailure,
    /// Always resume on failure
    ResumeOnFailure,
    /// Always escalate failure
    EscalateFailure,
}

#[async_trait]
impl SupervisorStrategy for DefaultStrategy {
    async fn decide(&self, _error: &ActorError, _stats: &mut RestartStatistics) -> SupervisionDecision {
        match self {
            DefaultStrategy::StopOnFailure => SupervisionDecision::Stop,
            DefaultStrategy::RestartOnFailure => SupervisionDecision::Restart,
            DefaultStrategy::ResumeOnFailure => SupervisionDecision::Resume,
            DefaultStrategy::EscalateFailure => SupervisionDecision::Escalate,
        }
    }
}

/// One-for-one supervision strategy: the decision is applied to the failing
/// child only. Restarts are budgeted within a sliding time window; once the
/// budget is exhausted the failure escalates.
#[derive(Clone)]
pub struct OneForOneStrategy {
    /// Maximum restart count
    pub max_restarts: u32,
    /// Restart time window
    pub within: Duration,
    /// Custom decision function
    pub decider: BasicDecisionFn,
}

impl OneForOneStrategy {
    pub fn new(max_restarts: u32, within: Duration) -> Self {
        Self {
            max_restarts,
            within,
            decider: default_decider(),
        }
    }

    pub fn with_decider(mut self, decider: BasicDecisionFn) -> Self {
        self.decider = decider;
        self
    }
}

impl Debug for OneForOneStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OneForOneStrategy")
            .field("max_restarts", &self.max_restarts)
            .field("within", &self.within)
            .field("decider", &self.decider)
            .finish()
    }
}

#[async_trait]
impl SupervisorStrategy for OneForOneStrategy {
    async fn decide(&self, error: &ActorError, stats: &mut RestartStatistics) -> SupervisionDecision {
        match self.decider.decide(error) {
            SupervisionDecision::Restart => {
                if stats.record_failure(Instant::now(), self.within) > self.max_restarts {
                    SupervisionDecision::Escalate
                } else {
                    SupervisionDecision::Restart
                }
            }
            other => other,
        }
    }
}

/// All-for-one supervision strategy: Restart and Stop decisions are applied
/// to every child of the supervisor, not just the one that failed.
#[derive(Clone)]
pub struct AllForOneStrategy {
    /// Maximum restart count
    pub max_restarts: u32,
    /// Restart time window
    pub within: Duration,
    /// Custom decision function
    pub decider: BasicDecisionFn,
}

impl AllForOneStrategy {
    pub fn new(max_restarts: u32, within: Duration) -> Self {
        Self {
            max_restarts,
            within,
            decider: default_decider(),
        }
    }

    pub fn with_decider(mut self, decider: BasicDecisionFn) -> Self {
        self.decider = decider;
        self
    }
}

impl Debug for AllForOneStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AllForOneStrategy")
            .field("max_restarts", &self.max_restarts)
            .field("within", &self.within)
            .field("decider", &self.decider)
            .finish()
    }
}

#[async_trait]
impl SupervisorStrategy for AllForOneStrategy {
    async fn decide(&self, error: &ActorError, stats: &mut RestartStatistics) -> SupervisionDecision {
        match self.decider.decide(error) {
            SupervisionDecision::Restart => {
                if stats.record_failure(Instant::now(), self.within) > self.max_restarts {
                    SupervisionDecision::Escalate
                } else {
                    SupervisionDecision::Restart
                }
            }
            other => other,
        }
    }

    fn applies_to_all_children(&self) -> bool {
        true
    }
}

/// Closed set of supervisor strategies accepted by the runtime.
#[derive(Debug, Clone)]
pub enum SupervisorStrategyKind {
    Default(DefaultStrategy),
    OneForOne(OneForOneStrategy),
    AllForOne(AllForOneStrategy),
}

impl SupervisorStrategyKind {
    pub fn one_for_one(max_restarts: u32, within: Duration) -> Self {
        Self::OneForOne(OneForOneStrategy::new(max_restarts, within))
    }

    pub fn all_for_one(max_restarts: u32, within: Duration) -> Self {
        Self::AllForOne(AllForOneStrategy::new(max_restarts, within))
    }
}

#[async_trait]
impl SupervisorStrategy for SupervisorStrategyKind {
    async fn decide(&self, error: &ActorError, stats: &mut RestartStatistics) -> SupervisionDecision {
        match self {
            Self::Default(s) => s.decide(error, stats).await,
            Self::OneForOne(s) => s.decide(error, stats).await,
            Self::AllForOne(s) => s.decide(error, stats).await,
        }
    }

    fn applies_to_all_children(&self) -> bool {
        match self {
            Self::Default(s) => s.applies_to_all_children(),
            Self::OneForOne(s) => s.applies_to_all_children(),
            Self::AllForOne(s) => s.applies_to_all_children(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restart_statistics_window_resets_after_expiry() {
        let mut stats = RestartStatistics::new();
        let window = Duration::from_millis(100);
        let t0 = Instant::now();

        assert_eq!(stats.record_failure(t0, window), 1);
        assert_eq!(stats.record_failure(t0 + Duration::from_millis(10), window), 2);
        // A failure past the window re-anchors and counts from one again.
        assert_eq!(stats.record_failure(t0 + Duration::from_millis(500), window), 1);
    }

    #[tokio::test]
    async fn one_for_one_escalates_when_budget_is_exhausted() {
        let strategy = OneForOneStrategy::new(3, Duration::from_secs(1));
        let mut stats = RestartStatistics::new();
        let error = ActorError::MessageHandlingError("boom".into());

        for _ in 0..3 {
            assert_eq!(
                strategy.decide(&error, &mut stats).await,
                SupervisionDecision::Restart
            );
        }
        assert_eq!(
            strategy.decide(&error, &mut stats).await,
            SupervisionDecision::Escalate
        );
    }

    #[tokio::test]
    async fn default_decider_stops_initialization_failures() {
        let strategy = OneForOneStrategy::new(10, Duration::from_secs(1));
        let mut stats = RestartStatistics::new();
        let error = ActorError::InitializationError("no database".into());

        assert_eq!(
            strategy.decide(&error, &mut stats).await,
            SupervisionDecision::Stop
        );
    }
}
