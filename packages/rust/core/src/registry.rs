//! In-process registry of background research runs.
//!
//! `submit` starts a run on the tokio runtime and hands back its id; callers
//! poll `status`/`result` or await `wait`. State lives only in memory.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tracing::{error, info};

use deepresearch_shared::{Report, RunId, RunProgress, Stage};

use crate::pipeline::Researcher;
use crate::progress::ProgressReporter;

/// Where a submitted run stands.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    Pending,
    Completed(Report),
    /// The run failed with this message.
    Failed(String),
}

struct RunSlot {
    progress: Arc<watch::Sender<RunProgress>>,
    outcome: RunOutcome,
}

/// Forwards intermediate milestones; terminal ones are published by the
/// registry after the outcome is stored.
struct ChannelProgress(Arc<watch::Sender<RunProgress>>);

impl ProgressReporter for ChannelProgress {
    fn report(&self, progress: &RunProgress) {
        if !progress.stage.is_terminal() {
            self.0.send_replace(progress.clone());
        }
    }
}

/// Tracks runs submitted to a shared [`Researcher`].
#[derive(Clone)]
pub struct RunRegistry {
    researcher: Arc<Researcher>,
    runs: Arc<Mutex<HashMap<RunId, RunSlot>>>,
}

impl RunRegistry {
    pub fn new(researcher: Arc<Researcher>) -> Self {
        Self {
            researcher,
            runs: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<RunId, RunSlot>> {
        self.runs.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Start researching `topic` in the background. Must be called within a
    /// tokio runtime.
    pub fn submit(&self, topic: impl Into<String>) -> RunId {
        let topic = topic.into();
        let id = RunId::new();
        let (tx, _rx) = watch::channel(RunProgress::new(0, Stage::Init, ""));
        let tx = Arc::new(tx);

        self.lock().insert(
            id,
            RunSlot {
                progress: tx.clone(),
                outcome: RunOutcome::Pending,
            },
        );
        info!(run_id = %id, topic = %topic, "run submitted");

        let researcher = self.researcher.clone();
        let reporter = ChannelProgress(tx.clone());
        let run = tokio::spawn(async move {
            researcher
                .run(&topic, &reporter)
                .await
                .map_err(|e| e.to_string())
        });

        // a panicking run must still settle its slot
        let runs = self.runs.clone();
        tokio::spawn(async move {
            let result = run.await.unwrap_or_else(|e| {
                error!(run_id = %id, error = %e, "run task aborted");
                Err(format!("run task failed: {e}"))
            });

            let terminal = match &result {
                Ok(_) => RunProgress::new(100, Stage::Done, ""),
                Err(message) => RunProgress::new(tx.borrow().percent, Stage::Error, message.clone()),
            };
            let outcome = match result {
                Ok(report) => RunOutcome::Completed(report),
                Err(message) => RunOutcome::Failed(message),
            };

            if let Some(slot) = runs
                .lock()
                .unwrap_or_else(|p| p.into_inner())
                .get_mut(&id)
            {
                slot.outcome = outcome;
            }
            tx.send_replace(terminal);
            info!(run_id = %id, "run finished");
        });

        id
    }

    /// Latest progress of a run, `None` for an unknown id.
    pub fn status(&self, id: &RunId) -> Option<RunProgress> {
        self.lock().get(id).map(|slot| slot.progress.borrow().clone())
    }

    /// Outcome of a run, `None` for an unknown id.
    pub fn result(&self, id: &RunId) -> Option<RunOutcome> {
        self.lock().get(id).map(|slot| slot.outcome.clone())
    }

    /// Wait until a run reaches `done` or `error`, then return its outcome.
    pub async fn wait(&self, id: &RunId) -> Option<RunOutcome> {
        let mut rx = self.lock().get(id)?.progress.subscribe();
        // the sender lives in the slot, so the channel cannot close first
        let _ = rx.wait_for(|p| p.stage.is_terminal()).await;
        self.result(id)
    }

    /// Ids of every run still tracked.
    pub fn runs(&self) -> Vec<RunId> {
        self.lock().keys().copied().collect()
    }

    /// Drop a finished run and hand back its outcome. Pending runs stay.
    pub fn remove(&self, id: &RunId) -> Option<RunOutcome> {
        let mut runs = self.lock();
        if matches!(runs.get(id)?.outcome, RunOutcome::Pending) {
            return None;
        }
        runs.remove(id).map(|slot| slot.outcome)
    }
}
