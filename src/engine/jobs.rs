// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use tokio::sync::watch;

/// Where a submitted job stands, as far as the live channel has told us.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub fn is_finished(&self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }
}

/// A job the engine accepted.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmittedJob {
    pub prompt_id: String,
    /// Queue number assigned by the engine
    pub number: Option<i64>,
    /// Ids of the nodes emitted into the job, as sent to the engine
    pub node_ids: Vec<String>,
    pub status: JobStatus,
}

#[derive(Debug, Default)]
struct LedgerState {
    jobs: BTreeMap<String, SubmittedJob>,
    /// Lifecycle updates that arrived before the submission response
    early: HashMap<String, JobStatus>,
}

/// Jobs submitted by this client, keyed by prompt id.
///
/// The queue driver records jobs; the execution tracker moves them through
/// their lifecycle. Cloning shares the ledger.
#[derive(Debug, Clone)]
pub struct JobLedger {
    state: Arc<Mutex<LedgerState>>,
    outstanding: Arc<watch::Sender<usize>>,
}

impl Default for JobLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl JobLedger {
    pub fn new() -> Self {
        let (outstanding, _) = watch::channel(0);
        Self {
            state: Arc::new(Mutex::new(LedgerState::default())),
            outstanding: Arc::new(outstanding),
        }
    }

    /// Record an accepted job.
    pub fn record(&self, prompt_id: &str, number: Option<i64>, node_ids: Vec<String>) {
        let mut state = self.lock();
        let status = state.early.remove(prompt_id).unwrap_or(JobStatus::Queued);
        state.jobs.insert(
            prompt_id.to_string(),
            SubmittedJob {
                prompt_id: prompt_id.to_string(),
                number,
                node_ids,
                status,
            },
        );
        self.publish(&state);
    }

    /// Move a job to `status`. Updates for unknown prompt ids are held until
    /// the job is recorded. Finished jobs stay finished.
    pub fn update(&self, prompt_id: &str, status: JobStatus) {
        let mut guard = self.lock();
        let state = &mut *guard;
        match state.jobs.get_mut(prompt_id) {
            Some(job) if job.status.is_finished() => return,
            Some(job) => job.status = status,
            None => {
                let held = state.early.entry(prompt_id.to_string()).or_insert(status);
                if !held.is_finished() {
                    *held = status;
                }
                return;
            }
        }
        self.publish(state);
    }

    pub fn get(&self, prompt_id: &str) -> Option<SubmittedJob> {
        self.lock().jobs.get(prompt_id).cloned()
    }

    /// Every recorded job, ordered by prompt id.
    pub fn jobs(&self) -> Vec<SubmittedJob> {
        self.lock().jobs.values().cloned().collect()
    }

    /// Recorded jobs that have not finished.
    pub fn outstanding(&self) -> usize {
        *self.outstanding.borrow()
    }

    /// Wait until every recorded job has finished.
    pub async fn wait_finished(&self) {
        let mut rx = self.outstanding.subscribe();
        // The sender lives as long as self, so this cannot fail
        let _ = rx.wait_for(|count| *count == 0).await;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn publish(&self, state: &LedgerState) {
        let count = state.jobs.values().filter(|j| !j.status.is_finished()).count();
        self.outstanding.send_replace(count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jobs_move_through_their_lifecycle() {
        let ledger = JobLedger::new();
        ledger.record("p1", Some(3), vec!["1".into()]);
        assert_eq!(ledger.outstanding(), 1);

        ledger.update("p1", JobStatus::Running);
        assert_eq!(ledger.get("p1").unwrap().status, JobStatus::Running);

        ledger.update("p1", JobStatus::Succeeded);
        assert_eq!(ledger.outstanding(), 0);

        // Late events do not reopen a finished job
        ledger.update("p1", JobStatus::Running);
        assert_eq!(ledger.get("p1").unwrap().status, JobStatus::Succeeded);
    }

    #[test]
    fn completion_before_recording_is_kept() {
        let ledger = JobLedger::new();
        ledger.update("fast", JobStatus::Succeeded);
        ledger.update("fast", JobStatus::Running);
        assert!(ledger.get("fast").is_none());

        ledger.record("fast", None, vec![]);
        assert_eq!(ledger.get("fast").unwrap().status, JobStatus::Succeeded);
        assert_eq!(ledger.outstanding(), 0);
    }

    #[tokio::test]
    async fn wait_finished_returns_once_everything_completes() {
        let ledger = JobLedger::new();
        ledger.record("a", None, vec![]);
        ledger.record("b", None, vec![]);

        let waiter = {
            let ledger = ledger.clone();
            tokio::spawn(async move { ledger.wait_finished().await })
        };
        ledger.update("a", JobStatus::Failed);
        assert!(!waiter.is_finished());
        ledger.update("b", JobStatus::Succeeded);
        waiter.await.unwrap();
    }
}
