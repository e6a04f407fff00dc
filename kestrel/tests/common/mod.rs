//! Shared helpers for the integration tests: a probe actor that forwards
//! typed payloads into a flume channel, plus timeout-bounded expectations.

#![allow(dead_code)]

use kestrel::{Actor, ActorContext, ActorRef, ActorResult, ActorSystem, BoxedMessage, Handled, Props};
use kestrel::BoxedFuture;
use std::time::Duration;

pub fn init() {
    kestrel::logging::init_test();
}

/// Forwards every message of type `T` into a channel the test can drain.
pub struct Probe<T> {
    tx: flume::Sender<T>,
}

impl<T: Clone + Send + 'static> Actor for Probe<T> {
    type Context = ActorContext;

    fn receive<'a>(
        &'a mut self,
        msg: &'a BoxedMessage,
        _ctx: &'a mut ActorContext,
    ) -> BoxedFuture<'a, ActorResult<Handled>> {
        Box::pin(async move {
            if let Some(value) = msg.downcast_ref::<T>() {
                let _ = self.tx.send(value.clone());
                Ok(Handled::Yes)
            } else {
                Ok(Handled::No)
            }
        })
    }
}

/// Spawns a probe for payloads of type `T` under the user guardian.
pub async fn spawn_probe<T: Clone + Send + 'static>(
    system: &ActorSystem,
    name: &str,
) -> (ActorRef, flume::Receiver<T>) {
    let (tx, rx) = flume::unbounded();
    let actor = system
        .spawn(Props::new(move || Probe { tx: tx.clone() }), name)
        .await
        .expect("probe spawn");
    (actor, rx)
}

/// Receives the next probe value or panics after five seconds.
pub async fn expect_msg<T: Send + 'static>(rx: &flume::Receiver<T>) -> T {
    tokio::time::timeout(Duration::from_secs(5), rx.recv_async())
        .await
        .expect("timed out waiting for message")
        .expect("probe channel closed")
}

/// Asserts that nothing arrives within `window`.
pub async fn expect_no_msg<T: Send + 'static>(rx: &flume::Receiver<T>, window: Duration) {
    if tokio::time::timeout(window, rx.recv_async()).await.is_ok() {
        panic!("received a message while none was expected");
    }
}
