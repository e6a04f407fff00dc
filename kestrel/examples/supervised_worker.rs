// A supervisor restarting a crash-prone worker, with lifecycle telemetry
// printed from the event stream.

use kestrel::{
    Actor, ActorContext, ActorError, ActorResult, ActorSystem, BoxedMessage, EventStreamSubscriber,
    Handled, Props, StreamEvent,
};
use kestrel::BoxedFuture;
use std::sync::Arc;
use std::time::Duration;

struct Worker;

impl Actor for Worker {
    type Context = ActorContext;

    fn receive<'a>(
        &'a mut self,
        msg: &'a BoxedMessage,
        _ctx: &'a mut ActorContext,
    ) -> BoxedFuture<'a, ActorResult<Handled>> {
        Box::pin(async move {
            if let Some(job) = msg.downcast_ref::<&str>() {
                if *job == "boom" {
                    return Err(ActorError::MessageHandlingError("job exploded".into()));
                }
                println!("worker handled job: {job}");
                return Ok(Handled::Yes);
            }
            Ok(Handled::No)
        })
    }
}

struct Telemetry;

impl EventStreamSubscriber for Telemetry {
    fn on_event(&self, event: &StreamEvent) {
        match event {
            StreamEvent::ActorStarted { actor } => println!("started:   {actor}"),
            StreamEvent::ActorRestarted { actor, reason } => {
                println!("restarted: {actor} ({reason})");
            }
            StreamEvent::ActorStopped { actor } => println!("stopped:   {actor}"),
            _ => {}
        }
    }
}

#[tokio::main]
async fn main() {
    kestrel::logging::init_default();
    let system = ActorSystem::new("supervised");
    system.event_stream().subscribe(Arc::new(Telemetry));

    // The guardian supervises top-level actors; its default one-for-one
    // policy restarts the worker when a job explodes.
    let worker = system
        .spawn(Props::new(|| Worker), "worker")
        .await
        .expect("spawn worker");

    worker.tell("resize-images", None);
    worker.tell("boom", None);
    worker.tell("send-emails", None);
    tokio::time::sleep(Duration::from_millis(300)).await;

    system.terminate().await;
}
