// Kestrel Actor Runtime
//
// Runtime core of the Kestrel actor framework: actor cells, mailboxes,
// references, supervision and death watch on top of a Tokio worker pool.
// The programming contract (behavior trait, supervision policies, errors)
// lives in the `kestrel-api` crate.

pub mod config;
pub mod error;
pub mod local;
pub mod logging;
pub mod system;

// Re-export the programming contract crate and commonly used types
pub use kestrel_api as api;

pub use config::{MailboxConfig, SystemConfig};
pub use error::{MailboxError, SpawnError, SystemError};
pub use kestrel_api::{
    Actor, ActorError, ActorResult, BoxedFuture, BoxedMessage, Handled, SupervisorStrategyKind,
};
pub use local::context::ActorContext;
pub use local::event_stream::{DeadLetter, EventStream, EventStreamSubscriber, StreamEvent};
pub use local::messages::{ActorIdentity, Identify, Kill, PoisonPill, ReceiveTimeout, Terminated};
pub use local::path::ActorPath;
pub use local::props::Props;
pub use local::reference::{ActorRef, Transport};
pub use system::ActorSystem;
