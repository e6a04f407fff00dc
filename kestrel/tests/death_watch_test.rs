mod common;

use common::{expect_msg, expect_no_msg, spawn_probe};
use kestrel::{
    Actor, ActorContext, ActorPath, ActorRef, ActorResult, ActorSystem, BoxedMessage, Handled,
    Props, Terminated,
};
use kestrel::BoxedFuture;
use std::time::Duration;

/// Watches every reference it is told and reports termination notices.
struct Watcher {
    notices: flume::Sender<(String, bool)>,
}

#[derive(Clone)]
struct UnwatchCmd(ActorRef);

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct Ping;

impl Actor for Watcher {
    type Context = ActorContext;

    fn receive<'a>(
        &'a mut self,
        msg: &'a BoxedMessage,
        ctx: &'a mut ActorContext,
    ) -> BoxedFuture<'a, ActorResult<Handled>> {
        Box::pin(async move {
            if let Some(target) = msg.downcast_ref::<ActorRef>() {
                ctx.watch(target);
                return Ok(Handled::Yes);
            }
            if let Some(UnwatchCmd(target)) = msg.downcast_ref::<UnwatchCmd>() {
                ctx.unwatch(target);
                return Ok(Handled::Yes);
            }
            if let Some(ping) = msg.downcast_ref::<Ping>() {
                ctx.sender().tell(*ping, None);
                return Ok(Handled::Yes);
            }
            if let Some(notice) = msg.downcast_ref::<Terminated>() {
                let _ = self.notices.send((
                    notice.actor.path().to_string(),
                    notice.existence_confirmed,
                ));
                return Ok(Handled::Yes);
            }
            Ok(Handled::No)
        })
    }
}

async fn spawn_watcher(
    system: &ActorSystem,
    name: &str,
) -> (ActorRef, flume::Receiver<(String, bool)>) {
    let (tx, rx) = flume::unbounded();
    let watcher = system
        .spawn(Props::new(move || Watcher { notices: tx.clone() }), name)
        .await
        .unwrap();
    (watcher, rx)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn termination_notifies_watcher() {
    common::init();
    let system = ActorSystem::new("watch-basic");
    let (watcher, notices) = spawn_watcher(&system, "watcher").await;
    let (target, _rx) = spawn_probe::<u32>(&system, "target").await;

    watcher.tell(target.clone(), None);
    // Give the watch registration a moment to reach the target.
    tokio::time::sleep(Duration::from_millis(50)).await;
    system.stop(&target);

    let (path, confirmed) = expect_msg(&notices).await;
    assert_eq!(path, target.path().to_string());
    assert!(confirmed, "a live incarnation was observed");

    system.terminate().await;
}

// Watching something that never existed resolves immediately with
// existence_confirmed = false.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn watching_a_placeholder_yields_unconfirmed_terminated() {
    common::init();
    let system = ActorSystem::new("watch-placeholder");
    let (watcher, notices) = spawn_watcher(&system, "watcher").await;

    let nobody = ActorRef::empty(ActorPath::root("watch-placeholder").child("nobody"));
    watcher.tell(nobody.clone(), None);

    let (path, confirmed) = expect_msg(&notices).await;
    assert_eq!(path, nobody.path().to_string());
    assert!(!confirmed, "nonexistent target cannot be confirmed");

    system.terminate().await;
}

// Watch is idempotent: two registrations produce exactly one notification.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn duplicate_watch_notifies_once() {
    common::init();
    let system = ActorSystem::new("watch-idempotent");
    let (watcher, notices) = spawn_watcher(&system, "watcher").await;
    let (target, _rx) = spawn_probe::<u32>(&system, "target").await;

    watcher.tell(target.clone(), None);
    watcher.tell(target.clone(), None);
    tokio::time::sleep(Duration::from_millis(50)).await;
    system.stop(&target);

    let _ = expect_msg(&notices).await;
    expect_no_msg(&notices, Duration::from_millis(300)).await;

    system.terminate().await;
}

// Unwatch after the notification already fired is a harmless no-op.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unwatch_after_termination_is_a_noop() {
    common::init();
    let system = ActorSystem::new("watch-unwatch");
    let (watcher, notices) = spawn_watcher(&system, "watcher").await;
    let (pong, pong_rx) = spawn_probe::<Ping>(&system, "pong").await;
    let (target, _rx) = spawn_probe::<u32>(&system, "target").await;

    watcher.tell(target.clone(), None);
    tokio::time::sleep(Duration::from_millis(50)).await;
    system.stop(&target);
    let _ = expect_msg(&notices).await;

    watcher.tell(UnwatchCmd(target), None);
    watcher.tell(Ping, Some(pong.clone()));
    assert_eq!(expect_msg(&pong_rx).await, Ping, "watcher is still healthy");

    system.terminate().await;
}

struct Oblivious;

impl Actor for Oblivious {
    type Context = ActorContext;

    fn receive<'a>(
        &'a mut self,
        msg: &'a BoxedMessage,
        ctx: &'a mut ActorContext,
    ) -> BoxedFuture<'a, ActorResult<Handled>> {
        Box::pin(async move {
            if let Some(target) = msg.downcast_ref::<ActorRef>() {
                ctx.watch(target);
                return Ok(Handled::Yes);
            }
            // Terminated falls through unhandled on purpose.
            Ok(Handled::No)
        })
    }
}

// An unhandled Terminated is a broken death pact: the watcher itself fails
// and is stopped by the default policy.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unhandled_terminated_breaks_the_death_pact() {
    common::init();
    let system = ActorSystem::new("watch-pact");
    let watcher = system
        .spawn(Props::new(|| Oblivious), "oblivious")
        .await
        .unwrap();
    let (target, _rx) = spawn_probe::<u32>(&system, "target").await;

    watcher.tell(target.clone(), None);
    tokio::time::sleep(Duration::from_millis(50)).await;
    system.stop(&target);

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !watcher.is_terminated() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "death pact did not stop the watcher"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    system.terminate().await;
}
