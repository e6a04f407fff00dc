//! Abstract actor programming model for the Kestrel runtime.
//!
//! This crate defines the contract between user code and the runtime: the
//! [`actor::Actor`] behavior trait with its lifecycle hooks, the supervision
//! policy types in [`supervisor`], the [`errors::ActorError`] failure
//! taxonomy and the shared type aliases in [`types`]. It contains no
//! runtime machinery of its own.

pub mod actor;
pub mod errors;
pub mod supervisor;
pub mod types;

pub use actor::{Actor, Handled};
pub use errors::ActorError;
pub use supervisor::{
    AllForOneStrategy, BasicDecisionFn, DecisionFn, DefaultStrategy, OneForOneStrategy,
    RestartStatistics, SupervisionDecision, SupervisorStrategy, SupervisorStrategyKind,
};
pub use types::{ActorResult, BoxedFuture, BoxedMessage};
