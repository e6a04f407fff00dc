//! The in-process actor runtime: references, mailboxes, cells and the
//! machinery that keeps each actor an effectively single-threaded state
//! machine under concurrent message arrival.

pub mod cell;
pub mod children;
pub mod context;
pub mod dispatcher;
pub mod envelope;
pub mod event_stream;
pub mod mailbox;
pub mod messages;
pub mod path;
pub mod props;
pub mod reference;
pub mod scheduler;
pub mod supervision;
pub mod system_message;
