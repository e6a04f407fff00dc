mod common;

use common::{expect_msg, spawn_probe};
use kestrel::{ActorSystem, DeadLetter, EventStreamSubscriber, StreamEvent};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn delivery_order_matches_send_order_per_producer() {
    common::init();
    let system = ActorSystem::new("ordering");
    let (actor, rx) = spawn_probe::<(u8, u32)>(&system, "collector").await;

    let mut producers = Vec::new();
    for tag in 0u8..3 {
        let actor = actor.clone();
        producers.push(tokio::spawn(async move {
            for seq in 0u32..200 {
                actor.tell((tag, seq), None);
            }
        }));
    }
    for producer in producers {
        producer.await.unwrap();
    }

    let mut last_seen = [None::<u32>; 3];
    for _ in 0..600 {
        let (tag, seq) = expect_msg(&rx).await;
        let slot = &mut last_seen[tag as usize];
        if let Some(prev) = *slot {
            assert!(
                seq == prev + 1,
                "producer {tag} reordered: {seq} after {prev}"
            );
        } else {
            assert_eq!(seq, 0, "producer {tag} did not start at its first message");
        }
        *slot = Some(seq);
    }

    system.terminate().await;
}

struct DeadLetterTap {
    tx: flume::Sender<u32>,
}

impl EventStreamSubscriber for DeadLetterTap {
    fn on_event(&self, event: &StreamEvent) {
        if let StreamEvent::DeadLetter(DeadLetter { message, .. }) = event {
            if let Some(value) = message.downcast_ref::<u32>() {
                let _ = self.tx.send(*value);
            }
        }
    }
}

// A system-level stop jumps the user queue. Whatever was still queued when
// the stop lands is redirected to dead letters, never silently dropped, and
// the messages that were processed form a strict send-order prefix.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stop_redirects_queued_messages_to_dead_letters() {
    common::init();
    let system = ActorSystem::new("ordering-stop");
    let (dead_tx, dead_rx) = flume::unbounded();
    system
        .event_stream()
        .subscribe(Arc::new(DeadLetterTap { tx: dead_tx }));

    let (actor, rx) = spawn_probe::<u32>(&system, "victim").await;
    for seq in 0u32..50 {
        actor.tell(seq, None);
    }
    system.stop(&actor);

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !actor.is_terminated() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "actor did not terminate"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    // Give in-flight dead-letter publications a moment to land.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let processed: Vec<u32> = rx.drain().collect();
    let dead: Vec<u32> = dead_rx.drain().collect();

    assert_eq!(
        processed.len() + dead.len(),
        50,
        "every message is either processed or dead-lettered"
    );
    for (index, seq) in processed.iter().enumerate() {
        assert_eq!(*seq as usize, index, "processed messages form a FIFO prefix");
    }

    system.terminate().await;
}
