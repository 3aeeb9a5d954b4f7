//! # Notifier: the owned registration/dispatch context.
//!
//! The [`Notifier`] owns the handler table, the job index, and the replay
//! cache. The embedding system constructs it, threads it through all calls,
//! and tears it down — there is no hidden process-wide singleton.
//!
//! ## Dispatch path
//! ```text
//! submit(code, job, attrs, mode)
//!   │
//!   ├─ table.read()                         (matching never blocks matching)
//!   ├─ sequenced.lock()                     (single serialization point)
//!   │    ├─ seq = last_seq + 1
//!   │    ├─ cache.append(record)            (unconditional, even if 0 matches)
//!   │    ├─ match: JobIndex ∩ code rules    (single > multi > default)
//!   │    └─ try_send to each matched queue  (per-handler ordering barrier)
//!   ├─ locks released
//!   └─ Synchronous: await acknowledgments ──► DeliveryReport
//!      FireAndForget: return immediately  ──► DeliveryReport (drops only)
//! ```
//!
//! Because sequence assignment, cache append, and queue enqueue happen under
//! one short-held exclusive section, cache order always equals sequence order
//! and every handler observes strictly increasing sequence numbers, no matter
//! how many callers submit concurrently.
//!
//! ## Registration path
//! Register/deregister take the table's write lock; the job index mutates
//! under the same lock, so the pair is atomic for any observer. Deregistration
//! is the cancellation primitive: it cancels the registration's token and
//! closes its queue — after it returns, no subsequent event reaches the
//! handler, though an invocation already in flight may still complete.

use std::sync::Arc;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{oneshot, Mutex, RwLock};
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::dispatch::delivery::{
    self, Delivery, DeliveryMode, DeliveryOutcome, DeliveryReport,
};
use crate::error::{HandlerError, RegistryError};
use crate::events::{Attribute, EventRecord, JobId, ReplayCache, StatusCode};
use crate::registry::{
    HandlerId, HandlerKind, HandlerRef, HandlerTable, JobScope, Registration, RegistrationParams,
};

/// Result of a directed replay into one handler's queue.
#[derive(Debug, Clone, Copy)]
pub struct Replayed {
    /// How many cached records were enqueued.
    pub delivered: usize,
    /// True if the request predated the oldest retained record.
    pub truncated: bool,
}

/// Sequence counter and cache, guarded together: the serialization point.
struct Sequenced {
    last_seq: u64,
    cache: ReplayCache,
}

/// Event notification registry with bounded replay.
///
/// Cheap to share behind an `Arc`; all methods take `&self`.
pub struct Notifier {
    cfg: Config,
    table: RwLock<HandlerTable>,
    sequenced: Mutex<Sequenced>,
    runtime: CancellationToken,
}

impl Notifier {
    /// Creates a notifier with the given configuration.
    pub fn new(cfg: Config) -> Self {
        let capacity = cfg.cache_capacity_clamped();
        Self {
            cfg,
            table: RwLock::new(HandlerTable::new()),
            sequenced: Mutex::new(Sequenced {
                last_seq: 0,
                cache: ReplayCache::new(capacity),
            }),
            runtime: CancellationToken::new(),
        }
    }

    /// Configured replay-cache capacity (fixed for the notifier's lifetime).
    #[inline]
    pub fn capacity(&self) -> usize {
        self.cfg.cache_capacity_clamped()
    }

    /// Registers a handler and spawns its delivery worker.
    ///
    /// Fails with [`RegistryError::InvalidCodes`] when the code set does not
    /// match `kind`; the registry is unchanged in that case. Duplicate
    /// registrations of the same shape are permitted and independent.
    pub async fn register(
        &self,
        kind: HandlerKind,
        codes: Vec<StatusCode>,
        scope: JobScope,
        handler: HandlerRef,
        owner: Option<&str>,
    ) -> Result<HandlerId, RegistryError> {
        // Validate before spawning so a rejected registration leaves nothing behind.
        HandlerTable::validate(kind, &codes)?;

        let name: Arc<str> = handler.name().into();
        let capacity = handler.queue_capacity();
        let cancel = self.runtime.child_token();
        let (feed, worker) = delivery::spawn_worker(handler, cancel.clone(), capacity);

        let mut table = self.table.write().await;
        table.insert(
            RegistrationParams {
                kind,
                codes,
                scope,
                owner: owner.map(Into::into),
                name,
            },
            feed,
            cancel,
            worker,
        )
    }

    /// Registers a handler for exactly one status code.
    pub async fn register_single(
        &self,
        code: StatusCode,
        scope: JobScope,
        handler: HandlerRef,
        owner: Option<&str>,
    ) -> Result<HandlerId, RegistryError> {
        self.register(HandlerKind::Single, vec![code], scope, handler, owner)
            .await
    }

    /// Registers a handler for an explicit set of status codes.
    pub async fn register_multi(
        &self,
        codes: Vec<StatusCode>,
        scope: JobScope,
        handler: HandlerRef,
        owner: Option<&str>,
    ) -> Result<HandlerId, RegistryError> {
        self.register(HandlerKind::Multi, codes, scope, handler, owner)
            .await
    }

    /// Registers a handler for any code not claimed by a more specific one.
    pub async fn register_default(
        &self,
        scope: JobScope,
        handler: HandlerRef,
        owner: Option<&str>,
    ) -> Result<HandlerId, RegistryError> {
        self.register(HandlerKind::Default, Vec::new(), scope, handler, owner)
            .await
    }

    /// Deregisters one handler.
    ///
    /// After this returns `Ok`, no subsequent event is delivered to the
    /// handler; queued-but-undelivered records are abandoned.
    pub async fn deregister(&self, id: HandlerId) -> Result<(), RegistryError> {
        let removed = {
            let mut table = self.table.write().await;
            table.remove(id)
        };
        match removed {
            Some(reg) => {
                reg.cancel.cancel();
                tracing::debug!(id = %reg.id, kind = ?reg.kind, "handler deregistered");
                Ok(())
            }
            None => Err(RegistryError::NotFound(id)),
        }
    }

    /// Deregisters every handler carrying the given owner tag, atomically.
    ///
    /// Used when a module releases all its interests at shutdown. Returns how
    /// many registrations were removed; an unknown tag removes none.
    pub async fn deregister_owner(&self, owner: &str) -> usize {
        let removed = {
            let mut table = self.table.write().await;
            table.remove_owner(owner)
        };
        let count = removed.len();
        for reg in removed {
            reg.cancel.cancel();
        }
        if count > 0 {
            tracing::debug!(owner, count, "owner deregistered");
        }
        count
    }

    /// Handler ids whose job scope admits the given job association.
    ///
    /// Reflects completed register/deregister calls exactly — there is no
    /// staleness window.
    pub async fn handlers_for(&self, job: Option<&JobId>) -> Vec<HandlerId> {
        let table = self.table.read().await;
        let mut ids: Vec<HandlerId> = table.candidates(job).into_iter().collect();
        ids.sort_unstable();
        ids
    }

    /// Submits one event: assigns its sequence number, caches it, and
    /// delivers it to every matching handler.
    ///
    /// The record is cached even when zero handlers match, so a future late
    /// registration can still replay it. See [`DeliveryMode`] for how the
    /// returned [`DeliveryReport`] relates to handler completion.
    pub async fn submit(
        &self,
        code: StatusCode,
        job: Option<JobId>,
        attributes: Vec<Attribute>,
        mode: DeliveryMode,
    ) -> DeliveryReport {
        let mut pending = Vec::new();
        let mut outcomes = Vec::new();

        let (sequence, matched) = {
            let table = self.table.read().await;
            let mut seq = self.sequenced.lock().await;

            seq.last_seq += 1;
            let record = Arc::new(EventRecord::new(seq.last_seq, code, job, attributes));
            seq.cache.append(Arc::clone(&record));

            let targets = table.match_event(code, record.job.as_ref());
            let matched = targets.len();

            for reg in targets {
                let (ack_tx, ack_rx) = match mode {
                    DeliveryMode::Synchronous => {
                        let (tx, rx) = oneshot::channel();
                        (Some(tx), Some(rx))
                    }
                    DeliveryMode::FireAndForget => (None, None),
                };
                match reg.feed.try_send(Delivery {
                    record: Arc::clone(&record),
                    ack: ack_tx,
                }) {
                    Ok(()) => {
                        if let Some(rx) = ack_rx {
                            pending.push((reg.id, Arc::clone(&reg.name), rx));
                        }
                    }
                    Err(TrySendError::Full(_)) => {
                        tracing::warn!(
                            handler = %reg.id,
                            seq = record.seq,
                            "delivery queue full; event dropped"
                        );
                        outcomes.push(DeliveryOutcome {
                            handler: reg.id,
                            name: Arc::clone(&reg.name),
                            result: Err(HandlerError::Dropped("full")),
                        });
                    }
                    Err(TrySendError::Closed(_)) => {
                        outcomes.push(DeliveryOutcome {
                            handler: reg.id,
                            name: Arc::clone(&reg.name),
                            result: Err(HandlerError::Dropped("closed")),
                        });
                    }
                }
            }
            (record.seq, matched)
        };

        // Locks are released here; awaiting acknowledgments cannot block
        // concurrent submissions or registry mutations.
        for (id, name, rx) in pending {
            let result = match rx.await {
                Ok(res) => res,
                Err(_) => Err(HandlerError::Unacknowledged),
            };
            outcomes.push(DeliveryOutcome {
                handler: id,
                name,
                result,
            });
        }

        DeliveryReport {
            sequence,
            matched,
            outcomes,
        }
    }

    /// Returns all cached records with `seq > since`, oldest-first, and a
    /// truncation flag.
    ///
    /// `truncated = true` means records the caller asked for were already
    /// evicted; the caller decides whether partial history is acceptable.
    pub async fn replay_since(&self, since: u64) -> (Vec<Arc<EventRecord>>, bool) {
        let guard = self.sequenced.lock().await;
        guard.cache.since(since)
    }

    /// Redelivers cached records with `seq > since` into one handler's queue.
    ///
    /// Intended for a handler that just (re-)registered and wants to catch
    /// up. Records submitted concurrently with the replay may interleave with
    /// the replayed backlog, so call this before live traffic matters or
    /// dedupe by sequence number (delivery is at-least-once either way).
    /// Stops at the first queue-full record to preserve per-handler order.
    pub async fn replay_to(&self, id: HandlerId, since: u64) -> Result<Replayed, RegistryError> {
        let table = self.table.read().await;
        let Some(reg) = table.find(id) else {
            return Err(RegistryError::NotFound(id));
        };

        let (records, truncated) = {
            let guard = self.sequenced.lock().await;
            guard.cache.since(since)
        };

        let mut delivered = 0;
        for record in records {
            match reg.feed.try_send(Delivery { record, ack: None }) {
                Ok(()) => delivered += 1,
                Err(_) => {
                    tracing::warn!(handler = %id, delivered, "replay stopped: queue unavailable");
                    break;
                }
            }
        }
        Ok(Replayed {
            delivered,
            truncated,
        })
    }

    /// Tears the notifier down: cancels every worker and awaits them.
    pub async fn shutdown(self) {
        self.runtime.cancel();
        let drained = {
            let mut table = self.table.write().await;
            table.drain_all()
        };
        for reg in drained {
            let Registration { worker, .. } = reg;
            let _ = worker.await;
        }
    }
}

impl Default for Notifier {
    /// A notifier with the default configuration (cache capacity 256).
    fn default() -> Self {
        Self::new(Config::default())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::registry::Handle;

    use super::*;

    struct Recorder {
        seen: StdMutex<Vec<u64>>,
        fail: bool,
    }

    impl Recorder {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                seen: StdMutex::new(Vec::new()),
                fail: false,
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                seen: StdMutex::new(Vec::new()),
                fail: true,
            })
        }

        fn seqs(&self) -> Vec<u64> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Handle for Recorder {
        async fn on_event(&self, event: &EventRecord) -> Result<(), HandlerError> {
            self.seen.lock().unwrap().push(event.seq);
            if self.fail {
                return Err(HandlerError::failed("boom"));
            }
            Ok(())
        }

        fn name(&self) -> &str {
            "recorder"
        }
    }

    struct Panicker;

    #[async_trait]
    impl Handle for Panicker {
        async fn on_event(&self, _event: &EventRecord) -> Result<(), HandlerError> {
            panic!("kaboom")
        }

        fn name(&self) -> &str {
            "panicker"
        }
    }

    async fn submit_sync(hub: &Notifier, code: StatusCode, job: Option<&str>) -> DeliveryReport {
        hub.submit(
            code,
            job.map(JobId::from),
            Vec::new(),
            DeliveryMode::Synchronous,
        )
        .await
    }

    async fn wait_until(mut cond: impl FnMut() -> bool) {
        for _ in 0..400 {
            if cond() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not met within 2s");
    }

    #[tokio::test]
    async fn test_invalid_codes_leave_registry_unchanged() {
        let hub = Notifier::default();
        let rec = Recorder::new();

        let err = hub
            .register(HandlerKind::Single, vec![], JobScope::Any, rec.clone(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidCodes { got: 0, .. }));

        let err = hub
            .register(HandlerKind::Multi, vec![], JobScope::Any, rec.clone(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidCodes { .. }));

        let err = hub
            .register(HandlerKind::Default, vec![1], JobScope::Any, rec, None)
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidCodes { got: 1, .. }));

        assert!(hub.handlers_for(None).await.is_empty());
    }

    #[tokio::test]
    async fn test_sequences_increase_and_match_cache_order() {
        let hub = Notifier::default();
        for expect in 1..=5u64 {
            let report = submit_sync(&hub, 7, None).await;
            assert_eq!(report.sequence, expect);
            assert_eq!(report.matched, 0);
        }
        let (records, truncated) = hub.replay_since(0).await;
        let seqs: Vec<u64> = records.iter().map(|r| r.seq).collect();
        assert_eq!(seqs, vec![1, 2, 3, 4, 5]);
        assert!(!truncated);
    }

    #[tokio::test]
    async fn test_capacity_bound_reports_truncation() {
        let hub = Notifier::new(Config { cache_capacity: 4 });
        for _ in 0..10 {
            submit_sync(&hub, 7, None).await;
        }
        let (records, truncated) = hub.replay_since(0).await;
        let seqs: Vec<u64> = records.iter().map(|r| r.seq).collect();
        assert_eq!(seqs, vec![7, 8, 9, 10]);
        assert!(truncated);
    }

    #[tokio::test]
    async fn test_single_beats_default() {
        let hub = Notifier::default();
        let single = Recorder::new();
        let fallback = Recorder::new();
        let sid = hub
            .register_single(5, JobScope::Any, single.clone(), None)
            .await
            .unwrap();
        hub.register_default(JobScope::Any, fallback.clone(), None)
            .await
            .unwrap();

        let report = submit_sync(&hub, 5, None).await;
        assert_eq!(report.matched, 1);
        assert_eq!(report.outcomes[0].handler, sid);
        assert_eq!(single.seqs(), vec![1]);
        assert!(fallback.seqs().is_empty());

        // unclaimed code falls through to the default handler
        submit_sync(&hub, 9, None).await;
        assert_eq!(fallback.seqs(), vec![2]);
        assert_eq!(single.seqs(), vec![1]);
    }

    #[tokio::test]
    async fn test_multi_code_containment() {
        let hub = Notifier::default();
        let multi = Recorder::new();
        let single = Recorder::new();
        hub.register_multi(vec![3, 5], JobScope::Any, multi.clone(), None)
            .await
            .unwrap();
        hub.register_single(5, JobScope::Any, single.clone(), None)
            .await
            .unwrap();

        submit_sync(&hub, 3, None).await;
        submit_sync(&hub, 5, None).await;
        submit_sync(&hub, 4, None).await;

        // multi sees both of its codes; a matching single does not suppress it
        assert_eq!(multi.seqs(), vec![1, 2]);
        assert_eq!(single.seqs(), vec![2]);
    }

    #[tokio::test]
    async fn test_synchronous_outcomes_follow_specificity_order() {
        let hub = Notifier::default();
        let m = hub
            .register_multi(vec![5], JobScope::Any, Recorder::new(), None)
            .await
            .unwrap();
        let s1 = hub
            .register_single(5, JobScope::Any, Recorder::new(), None)
            .await
            .unwrap();
        let s2 = hub
            .register_single(5, JobScope::Any, Recorder::new(), None)
            .await
            .unwrap();

        let report = submit_sync(&hub, 5, None).await;
        let order: Vec<HandlerId> = report.outcomes.iter().map(|o| o.handler).collect();
        assert_eq!(order, vec![s1, s2, m]);
    }

    #[tokio::test]
    async fn test_job_scoping() {
        let hub = Notifier::default();
        let scoped = Recorder::new();
        let everywhere = Recorder::new();
        hub.register_single(5, JobScope::Job(JobId::from("j1")), scoped.clone(), None)
            .await
            .unwrap();
        hub.register_single(5, JobScope::Any, everywhere.clone(), None)
            .await
            .unwrap();

        submit_sync(&hub, 5, Some("j1")).await; // seq 1
        submit_sync(&hub, 5, Some("j2")).await; // seq 2
        submit_sync(&hub, 5, None).await; // seq 3

        assert_eq!(scoped.seqs(), vec![1]);
        assert_eq!(everywhere.seqs(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_jobless_events_reach_unscoped_handlers_only() {
        let hub = Notifier::default();
        let unscoped = Recorder::new();
        let scoped = Recorder::new();
        hub.register_single(5, JobScope::Unscoped, unscoped.clone(), None)
            .await
            .unwrap();
        hub.register_single(5, JobScope::Job(JobId::from("j1")), scoped.clone(), None)
            .await
            .unwrap();

        submit_sync(&hub, 5, None).await; // seq 1
        submit_sync(&hub, 5, Some("j1")).await; // seq 2

        assert_eq!(unscoped.seqs(), vec![1]);
        assert_eq!(scoped.seqs(), vec![2]);
    }

    #[tokio::test]
    async fn test_replay_completeness_under_capacity() {
        let hub = Notifier::default();
        for _ in 0..5 {
            submit_sync(&hub, 7, Some("j1")).await;
        }
        let (records, truncated) = hub.replay_since(0).await;
        assert_eq!(records.len(), 5);
        assert!(!truncated);
        assert!(records.windows(2).all(|w| w[0].seq < w[1].seq));
    }

    #[tokio::test]
    async fn test_deregistration_takes_effect() {
        let hub = Notifier::default();
        let rec = Recorder::new();
        let id = hub
            .register_single(5, JobScope::Any, rec.clone(), None)
            .await
            .unwrap();

        submit_sync(&hub, 5, None).await;
        hub.deregister(id).await.unwrap();
        let report = submit_sync(&hub, 5, None).await;

        assert_eq!(report.matched, 0);
        assert_eq!(rec.seqs(), vec![1]);

        // the event still reached the cache
        let (records, _) = hub.replay_since(0).await;
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn test_deregister_unknown_is_not_found() {
        let hub = Notifier::default();
        let err = hub.deregister(HandlerId(42)).await.unwrap_err();
        assert!(matches!(err, RegistryError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_failing_handler_is_isolated() {
        let hub = Notifier::default();
        let bad = Recorder::failing();
        let good = Recorder::new();
        hub.register_single(5, JobScope::Any, bad.clone(), None)
            .await
            .unwrap();
        hub.register_single(5, JobScope::Any, good.clone(), None)
            .await
            .unwrap();

        let report = submit_sync(&hub, 5, None).await;
        assert_eq!(report.matched, 2);
        assert_eq!(report.failures(), 1);
        assert_eq!(good.seqs(), vec![1]);

        let (records, _) = hub.replay_since(0).await;
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn test_panicking_handler_is_isolated() {
        let hub = Notifier::default();
        let good = Recorder::new();
        hub.register_single(5, JobScope::Any, Arc::new(Panicker), None)
            .await
            .unwrap();
        hub.register_single(5, JobScope::Any, good.clone(), None)
            .await
            .unwrap();

        let report = submit_sync(&hub, 5, None).await;
        assert_eq!(report.failures(), 1);
        assert!(report
            .outcomes
            .iter()
            .any(|o| matches!(o.result, Err(HandlerError::Panicked(_)))));
        assert_eq!(good.seqs(), vec![1]);
    }

    #[tokio::test]
    async fn test_owner_bulk_deregistration() {
        let hub = Notifier::default();
        let a1 = Recorder::new();
        let a2 = Recorder::new();
        let b = Recorder::new();
        hub.register_single(5, JobScope::Any, a1.clone(), Some("mod-a"))
            .await
            .unwrap();
        hub.register_default(JobScope::Any, a2.clone(), Some("mod-a"))
            .await
            .unwrap();
        hub.register_single(5, JobScope::Any, b.clone(), Some("mod-b"))
            .await
            .unwrap();

        assert_eq!(hub.deregister_owner("mod-a").await, 2);
        assert_eq!(hub.deregister_owner("mod-a").await, 0);

        let report = submit_sync(&hub, 5, None).await;
        assert_eq!(report.matched, 1);
        assert_eq!(b.seqs(), vec![1]);
        assert!(a1.seqs().is_empty());
    }

    #[tokio::test]
    async fn test_fire_and_forget_preserves_per_handler_order() {
        let hub = Notifier::default();
        let rec = Recorder::new();
        hub.register_single(5, JobScope::Any, rec.clone(), None)
            .await
            .unwrap();

        for _ in 0..30 {
            hub.submit(5, None, Vec::new(), DeliveryMode::FireAndForget)
                .await;
        }
        let probe = rec.clone();
        wait_until(move || probe.seqs().len() == 30).await;
        let expect: Vec<u64> = (1..=30).collect();
        assert_eq!(rec.seqs(), expect);
    }

    #[tokio::test]
    async fn test_replay_to_catches_up_late_handler() {
        let hub = Notifier::default();
        for _ in 0..3 {
            submit_sync(&hub, 5, Some("j1")).await;
        }

        let late = Recorder::new();
        let id = hub
            .register_single(5, JobScope::Any, late.clone(), None)
            .await
            .unwrap();
        assert!(late.seqs().is_empty());

        let replayed = hub.replay_to(id, 0).await.unwrap();
        assert_eq!(replayed.delivered, 3);
        assert!(!replayed.truncated);

        let probe = late.clone();
        wait_until(move || probe.seqs().len() == 3).await;
        assert_eq!(late.seqs(), vec![1, 2, 3]);

        let missing = hub.replay_to(HandlerId(99), 0).await;
        assert!(missing.is_err());
    }

    #[tokio::test]
    async fn test_handlers_for_reflects_registry() {
        let hub = Notifier::default();
        let j1 = JobId::from("j1");
        let scoped = hub
            .register_single(5, JobScope::Job(j1.clone()), Recorder::new(), None)
            .await
            .unwrap();
        let any = hub
            .register_default(JobScope::Any, Recorder::new(), None)
            .await
            .unwrap();

        assert_eq!(hub.handlers_for(Some(&j1)).await, vec![scoped, any]);
        assert_eq!(hub.handlers_for(None).await, vec![any]);

        hub.deregister(scoped).await.unwrap();
        assert_eq!(hub.handlers_for(Some(&j1)).await, vec![any]);
    }

    #[tokio::test]
    async fn test_shutdown_joins_workers() {
        let hub = Notifier::default();
        let rec = Recorder::new();
        hub.register_single(5, JobScope::Any, rec.clone(), None)
            .await
            .unwrap();
        submit_sync(&hub, 5, None).await;
        hub.shutdown().await;
        assert_eq!(rec.seqs(), vec![1]);
    }
}
