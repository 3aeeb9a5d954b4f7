//! # Job index: job identifier → interested handler ids.
//!
//! Dispatch would otherwise scan the full registry for every event to apply
//! job-scope filters. The index keeps one id set per job plus two shared sets
//! ("all jobs", "explicitly job-less") so candidate narrowing is a set union.
//!
//! ## Rules
//! - Membership always matches the live registrations: the index is updated
//!   under the same write lock as the handler table, so no caller observes a
//!   partially-updated state.
//! - Empty per-job sets are pruned on removal.

use std::collections::{HashMap, HashSet};

use crate::events::JobId;

use super::handler::{HandlerId, JobScope};

/// Reverse index from job scope to handler ids.
#[derive(Default)]
pub(crate) struct JobIndex {
    by_job: HashMap<JobId, HashSet<HandlerId>>,
    any_job: HashSet<HandlerId>,
    unscoped: HashSet<HandlerId>,
}

impl JobIndex {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Records a registration under its scope.
    pub(crate) fn insert(&mut self, id: HandlerId, scope: &JobScope) {
        match scope {
            JobScope::Any => {
                self.any_job.insert(id);
            }
            JobScope::Job(job) => {
                self.by_job.entry(job.clone()).or_default().insert(id);
            }
            JobScope::Unscoped => {
                self.unscoped.insert(id);
            }
        }
    }

    /// Removes a registration, pruning empty per-job entries.
    pub(crate) fn remove(&mut self, id: HandlerId, scope: &JobScope) {
        match scope {
            JobScope::Any => {
                self.any_job.remove(&id);
            }
            JobScope::Job(job) => {
                if let Some(set) = self.by_job.get_mut(job) {
                    set.remove(&id);
                    if set.is_empty() {
                        self.by_job.remove(job);
                    }
                }
            }
            JobScope::Unscoped => {
                self.unscoped.remove(&id);
            }
        }
    }

    pub(crate) fn clear(&mut self) {
        self.by_job.clear();
        self.any_job.clear();
        self.unscoped.clear();
    }

    /// Handler ids whose scope admits an event with the given job association.
    ///
    /// For a job-associated event: the job's set union "all jobs". For a
    /// job-less event: "all jobs" union "explicitly job-less".
    pub(crate) fn candidates(&self, job: Option<&JobId>) -> HashSet<HandlerId> {
        let mut out = self.any_job.clone();
        match job {
            Some(job) => {
                if let Some(set) = self.by_job.get(job) {
                    out.extend(set.iter().copied());
                }
            }
            None => out.extend(self.unscoped.iter().copied()),
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u64) -> HandlerId {
        HandlerId(n)
    }

    #[test]
    fn test_candidates_union_job_and_any() {
        let mut index = JobIndex::new();
        let j1 = JobId::from("j1");
        index.insert(id(1), &JobScope::Job(j1.clone()));
        index.insert(id(2), &JobScope::Any);
        index.insert(id(3), &JobScope::Job(JobId::from("j2")));

        let got = index.candidates(Some(&j1));
        assert!(got.contains(&id(1)));
        assert!(got.contains(&id(2)));
        assert!(!got.contains(&id(3)));
    }

    #[test]
    fn test_unscoped_only_for_jobless_events() {
        let mut index = JobIndex::new();
        index.insert(id(1), &JobScope::Unscoped);
        index.insert(id(2), &JobScope::Any);

        let jobless = index.candidates(None);
        assert!(jobless.contains(&id(1)));
        assert!(jobless.contains(&id(2)));

        let scoped = index.candidates(Some(&JobId::from("j1")));
        assert!(!scoped.contains(&id(1)));
        assert!(scoped.contains(&id(2)));
    }

    #[test]
    fn test_remove_prunes_empty_job_entries() {
        let mut index = JobIndex::new();
        let j1 = JobId::from("j1");
        let scope = JobScope::Job(j1.clone());
        index.insert(id(1), &scope);
        index.remove(id(1), &scope);

        assert!(index.by_job.is_empty());
        assert!(index.candidates(Some(&j1)).is_empty());
    }
}
