// Two actors bouncing a counter back and forth until it reaches zero.

use kestrel::{
    Actor, ActorContext, ActorResult, ActorSystem, BoxedMessage, Handled, Props,
};
use kestrel::BoxedFuture;
use std::time::Duration;

#[derive(Clone, Copy, Debug)]
struct Ball {
    bounces: u32,
}

struct Player {
    name: &'static str,
}

impl Actor for Player {
    type Context = ActorContext;

    fn receive<'a>(
        &'a mut self,
        msg: &'a BoxedMessage,
        ctx: &'a mut ActorContext,
    ) -> BoxedFuture<'a, ActorResult<Handled>> {
        Box::pin(async move {
            let Some(ball) = msg.downcast_ref::<Ball>() else {
                return Ok(Handled::No);
            };
            println!("{} got the ball, {} bounces left", self.name, ball.bounces);
            if ball.bounces > 0 {
                ctx.sender().tell(
                    Ball {
                        bounces: ball.bounces - 1,
                    },
                    Some(ctx.self_ref()),
                );
            }
            Ok(Handled::Yes)
        })
    }
}

#[tokio::main]
async fn main() {
    kestrel::logging::init_default();
    let system = ActorSystem::new("ping-pong");

    let ping = system
        .spawn(Props::new(|| Player { name: "ping" }), "ping")
        .await
        .expect("spawn ping");
    let pong = system
        .spawn(Props::new(|| Player { name: "pong" }), "pong")
        .await
        .expect("spawn pong");

    ping.tell(Ball { bounces: 10 }, Some(pong));
    tokio::time::sleep(Duration::from_millis(200)).await;

    system.terminate().await;
}
