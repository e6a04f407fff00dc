mod common;

use common::{expect_msg, expect_no_msg};
use kestrel::{
    Actor, ActorContext, ActorResult, ActorSystem, BoxedMessage, Handled, Props, ReceiveTimeout,
};
use kestrel::BoxedFuture;
use std::time::{Duration, Instant};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct Ping;

struct IdleSentinel {
    timeout: Duration,
    fired_at: flume::Sender<Instant>,
}

impl Actor for IdleSentinel {
    type Context = ActorContext;

    fn pre_start<'a>(&'a mut self, ctx: &'a mut ActorContext) -> BoxedFuture<'a, ActorResult<()>> {
        ctx.set_receive_timeout(Some(self.timeout));
        Box::pin(async { Ok(()) })
    }

    fn receive<'a>(
        &'a mut self,
        msg: &'a BoxedMessage,
        _ctx: &'a mut ActorContext,
    ) -> BoxedFuture<'a, ActorResult<Handled>> {
        Box::pin(async move {
            if msg.downcast_ref::<ReceiveTimeout>().is_some() {
                let _ = self.fired_at.send(Instant::now());
                return Ok(Handled::Yes);
            }
            if msg.downcast_ref::<Ping>().is_some() {
                return Ok(Handled::Yes);
            }
            Ok(Handled::No)
        })
    }
}

// Exactly one ReceiveTimeout per idle period, never before the configured
// duration has elapsed.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn idle_actor_gets_exactly_one_timeout() {
    common::init();
    let system = ActorSystem::new("timeout-single");
    let (fired_tx, fired_rx) = flume::unbounded();

    let started = Instant::now();
    let _actor = system
        .spawn(
            Props::new(move || IdleSentinel {
                timeout: Duration::from_millis(100),
                fired_at: fired_tx.clone(),
            }),
            "sentinel",
        )
        .await
        .unwrap();

    let fired = expect_msg(&fired_rx).await;
    assert!(
        fired.duration_since(started) >= Duration::from_millis(100),
        "timeout fired too early: {:?}",
        fired.duration_since(started)
    );
    // No re-arm without new activity.
    expect_no_msg(&fired_rx, Duration::from_millis(400)).await;

    system.terminate().await;
}

// Any user message cancels the pending timer and starts a fresh idle period.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn activity_resets_the_idle_timer() {
    common::init();
    let system = ActorSystem::new("timeout-reset");
    let (fired_tx, fired_rx) = flume::unbounded();

    let actor = system
        .spawn(
            Props::new(move || IdleSentinel {
                timeout: Duration::from_millis(150),
                fired_at: fired_tx.clone(),
            }),
            "sentinel",
        )
        .await
        .unwrap();

    let mut last_ping = Instant::now();
    for _ in 0..4 {
        tokio::time::sleep(Duration::from_millis(50)).await;
        actor.tell(Ping, None);
        last_ping = Instant::now();
    }

    let fired = expect_msg(&fired_rx).await;
    assert!(
        fired.duration_since(last_ping) >= Duration::from_millis(150),
        "timer was not reset by activity: {:?}",
        fired.duration_since(last_ping)
    );

    system.terminate().await;
}
