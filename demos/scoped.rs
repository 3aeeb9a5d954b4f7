//! Specificity tiers and job scoping.
//!
//! A single-code handler claims code 3 for one job, a multi-code handler
//! watches a set of codes everywhere, and a default handler picks up whatever
//! nobody else claimed.
//!
//! Run with: `cargo run --example scoped`

use replaybus::{DeliveryMode, EventRecord, HandlerError, HandlerFn, JobId, JobScope, Notifier};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let hub = Notifier::default();

    let failures = HandlerFn::arc("failures", |ev: EventRecord| async move {
        println!("[failures] seq={} job={:?}", ev.seq, ev.job);
        Ok::<_, HandlerError>(())
    });
    hub.register_single(3, JobScope::Job(JobId::from("batch-1")), failures, Some("demo"))
        .await
        .expect("valid registration");

    let transitions = HandlerFn::arc("transitions", |ev: EventRecord| async move {
        println!("[transitions] seq={} code={}", ev.seq, ev.code);
        Ok::<_, HandlerError>(())
    });
    hub.register_multi(vec![3, 4, 5], JobScope::Any, transitions, Some("demo"))
        .await
        .expect("valid registration");

    let catch_all = HandlerFn::arc("catch-all", |ev: EventRecord| async move {
        println!("[catch-all] seq={} code={}", ev.seq, ev.code);
        Ok::<_, HandlerError>(())
    });
    hub.register_default(JobScope::Any, catch_all, Some("demo"))
        .await
        .expect("valid registration");

    // code 3 on batch-1: single + multi fire, the default stays quiet
    hub.submit(3, Some(JobId::from("batch-1")), Vec::new(), DeliveryMode::Synchronous)
        .await;

    // code 3 on another job: only the multi handler's scope admits it
    hub.submit(3, Some(JobId::from("batch-2")), Vec::new(), DeliveryMode::Synchronous)
        .await;

    // code 9 is claimed by nobody: the default handler picks it up
    let report = hub
        .submit(9, None, Vec::new(), DeliveryMode::Synchronous)
        .await;
    println!("code 9 matched {} handler(s)", report.matched);

    hub.deregister_owner("demo").await;
    hub.shutdown().await;
}
