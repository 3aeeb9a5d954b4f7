//! Late registration and replay.
//!
//! Events are submitted before any handler exists, then a handler registers
//! and catches up from the replay cache.
//!
//! Run with: `cargo run --example replay`

use replaybus::{
    Attribute, Config, DeliveryMode, EventRecord, HandlerError, HandlerFn, JobId, JobScope,
    Notifier,
};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let hub = Notifier::new(Config { cache_capacity: 8 });

    // Nobody is listening yet; the cache still retains every event.
    for attempt in 1..=3 {
        let attrs = vec![Attribute::new("attempt", attempt.to_string())];
        let report = hub
            .submit(
                -17,
                Some(JobId::from("job-7")),
                attrs,
                DeliveryMode::FireAndForget,
            )
            .await;
        println!("submitted seq={} (matched {})", report.sequence, report.matched);
    }

    // A monitor shows up late and wants the history it missed.
    let monitor = HandlerFn::arc("monitor", |ev: EventRecord| async move {
        let attempt = ev.attribute("attempt").unwrap_or("?");
        println!("[monitor] seq={} code={} attempt={}", ev.seq, ev.code, attempt);
        Ok::<_, HandlerError>(())
    });
    let id = hub
        .register_single(-17, JobScope::Any, monitor, Some("demo"))
        .await
        .expect("valid registration");

    let replayed = hub.replay_to(id, 0).await.expect("handler is live");
    println!(
        "replayed {} records (truncated: {})",
        replayed.delivered, replayed.truncated
    );

    // Live traffic now reaches the monitor directly.
    hub.submit(-17, Some(JobId::from("job-7")), Vec::new(), DeliveryMode::Synchronous)
        .await;

    hub.shutdown().await;
}
