//! # Handler table: the three registration collections plus the job index.
//!
//! Registrations live in three independently-ordered collections — single-code,
//! multi-code, and default handlers — mirroring the three interest shapes the
//! dispatcher distinguishes. Insertion order within a collection is the
//! invocation order within that specificity tier, which keeps dispatch
//! deterministic and testable.
//!
//! ## Architecture
//! ```text
//! match_event(code, job)
//!     │
//!     ├─ JobIndex.candidates(job) ──► HashSet<HandlerId>   (scope narrowing)
//!     │
//!     ├─ singles: code == registered code          ┐ specificity
//!     ├─ multis:  code ∈ registered code set       │ single > multi > default
//!     └─ defaults: only if nothing above matched   ┘
//! ```
//!
//! ## Rules
//! - The table owns each registration's queue sender, cancellation token, and
//!   worker join handle; dropping a `Registration` closes its queue.
//! - Table and index mutate together under the caller's write lock — an
//!   external observer never sees one without the other.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::dispatch::delivery::Delivery;
use crate::error::RegistryError;
use crate::events::{JobId, StatusCode};

use super::handler::{HandlerId, HandlerKind, JobScope};
use super::job_index::JobIndex;

/// One live registration and the wiring of its delivery worker.
pub(crate) struct Registration {
    pub(crate) id: HandlerId,
    pub(crate) kind: HandlerKind,
    pub(crate) codes: Vec<StatusCode>,
    pub(crate) scope: JobScope,
    pub(crate) owner: Option<Arc<str>>,
    pub(crate) name: Arc<str>,
    /// Sequential delivery queue; dropping the sender closes the worker.
    pub(crate) feed: mpsc::Sender<Delivery>,
    /// Cancelled on deregistration so the worker abandons queued backlog.
    pub(crate) cancel: CancellationToken,
    /// Worker join handle, awaited during shutdown.
    pub(crate) worker: JoinHandle<()>,
}

/// Caller-supplied registration fields (the worker wiring travels separately).
pub(crate) struct RegistrationParams {
    pub(crate) kind: HandlerKind,
    pub(crate) codes: Vec<StatusCode>,
    pub(crate) scope: JobScope,
    pub(crate) owner: Option<Arc<str>>,
    pub(crate) name: Arc<str>,
}

/// Registry of live handler registrations, indexed by job scope.
pub(crate) struct HandlerTable {
    singles: Vec<Registration>,
    multis: Vec<Registration>,
    defaults: Vec<Registration>,
    index: JobIndex,
    next_id: u64,
}

impl HandlerTable {
    pub(crate) fn new() -> Self {
        Self {
            singles: Vec::new(),
            multis: Vec::new(),
            defaults: Vec::new(),
            index: JobIndex::new(),
            next_id: 0,
        }
    }

    /// Checks code-set cardinality against the registration kind.
    pub(crate) fn validate(kind: HandlerKind, codes: &[StatusCode]) -> Result<(), RegistryError> {
        let got = codes.len();
        let ok = match kind {
            HandlerKind::Single => got == 1,
            HandlerKind::Multi => got >= 1,
            HandlerKind::Default => got == 0,
        };
        if ok {
            Ok(())
        } else {
            Err(RegistryError::InvalidCodes { kind, got })
        }
    }

    /// Inserts a registration into its collection and the job index, returning
    /// a fresh unique id. The table is unchanged on validation failure.
    pub(crate) fn insert(
        &mut self,
        params: RegistrationParams,
        feed: mpsc::Sender<Delivery>,
        cancel: CancellationToken,
        worker: JoinHandle<()>,
    ) -> Result<HandlerId, RegistryError> {
        Self::validate(params.kind, &params.codes)?;

        self.next_id += 1;
        let id = HandlerId(self.next_id);
        self.index.insert(id, &params.scope);

        let reg = Registration {
            id,
            kind: params.kind,
            codes: params.codes,
            scope: params.scope,
            owner: params.owner,
            name: params.name,
            feed,
            cancel,
            worker,
        };
        match reg.kind {
            HandlerKind::Single => self.singles.push(reg),
            HandlerKind::Multi => self.multis.push(reg),
            HandlerKind::Default => self.defaults.push(reg),
        }
        Ok(id)
    }

    /// Removes one registration from its collection and the index.
    pub(crate) fn remove(&mut self, id: HandlerId) -> Option<Registration> {
        for list in [&mut self.singles, &mut self.multis, &mut self.defaults] {
            if let Some(pos) = list.iter().position(|r| r.id == id) {
                let reg = list.remove(pos);
                self.index.remove(reg.id, &reg.scope);
                return Some(reg);
            }
        }
        None
    }

    /// Removes every registration carrying the given owner tag, in one pass.
    pub(crate) fn remove_owner(&mut self, owner: &str) -> Vec<Registration> {
        let mut removed = Vec::new();
        for list in [&mut self.singles, &mut self.multis, &mut self.defaults] {
            let mut kept = Vec::with_capacity(list.len());
            for reg in list.drain(..) {
                if reg.owner.as_deref() == Some(owner) {
                    removed.push(reg);
                } else {
                    kept.push(reg);
                }
            }
            *list = kept;
        }
        for reg in &removed {
            self.index.remove(reg.id, &reg.scope);
        }
        removed
    }

    /// Drains every registration (shutdown path).
    pub(crate) fn drain_all(&mut self) -> Vec<Registration> {
        let mut all = Vec::new();
        all.extend(self.singles.drain(..));
        all.extend(self.multis.drain(..));
        all.extend(self.defaults.drain(..));
        self.index.clear();
        all
    }

    /// Looks up a live registration by id.
    pub(crate) fn find(&self, id: HandlerId) -> Option<&Registration> {
        self.singles
            .iter()
            .chain(self.multis.iter())
            .chain(self.defaults.iter())
            .find(|r| r.id == id)
    }

    /// Handler ids whose job scope admits the given job association.
    pub(crate) fn candidates(&self, job: Option<&JobId>) -> HashSet<HandlerId> {
        self.index.candidates(job)
    }

    /// Computes the ordered matching set for one event.
    ///
    /// Candidates are narrowed by the job index first, then filtered by the
    /// per-tier code rule. Default handlers are consulted only when no
    /// single/multi handler matched this (code, job) pair. Within a tier the
    /// order is registration order.
    pub(crate) fn match_event(&self, code: StatusCode, job: Option<&JobId>) -> Vec<&Registration> {
        let candidates = self.index.candidates(job);
        let mut out: Vec<&Registration> = Vec::new();
        out.extend(
            self.singles
                .iter()
                .filter(|r| candidates.contains(&r.id) && r.codes.first() == Some(&code)),
        );
        out.extend(
            self.multis
                .iter()
                .filter(|r| candidates.contains(&r.id) && r.codes.contains(&code)),
        );
        if out.is_empty() {
            out.extend(self.defaults.iter().filter(|r| candidates.contains(&r.id)));
        }
        out
    }
}
