use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use super::domain::CandidateId;
use super::error::{CandidateFailure, HomeworkError};
use super::ports::{SourceForge, TrackingSystem};
use super::processor::{HomeworkProcessor, ProcessOutcome};

/// Tally of one batch pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub candidates: usize,
    pub sent: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl BatchSummary {
    fn record(&mut self, result: &Result<ProcessOutcome, CandidateFailure>) {
        match result {
            Ok(ProcessOutcome::Sent(_)) => self.sent += 1,
            Ok(ProcessOutcome::Skipped(_)) => self.skipped += 1,
            Err(_) => self.failed += 1,
        }
    }
}

/// Runs the processor over every candidate in scope, one task per candidate.
pub struct BatchRunner<T, F> {
    processor: Arc<HomeworkProcessor<T, F>>,
}

impl<T, F> Clone for BatchRunner<T, F> {
    fn clone(&self) -> Self {
        Self {
            processor: self.processor.clone(),
        }
    }
}

impl<T, F> BatchRunner<T, F>
where
    T: TrackingSystem + 'static,
    F: SourceForge + 'static,
{
    pub fn new(processor: Arc<HomeworkProcessor<T, F>>) -> Self {
        Self { processor }
    }

    /// One pass over all candidates. Only failing to list candidates fails the pass;
    /// per-candidate failures end up as notes on the candidate.
    pub async fn run(&self) -> Result<BatchSummary, HomeworkError> {
        let offer_tag = self.processor.settings().offer_tag.clone();
        let candidates = self
            .processor
            .tracking()
            .candidates(offer_tag.as_deref())
            .await?;

        let mut summary = BatchSummary {
            candidates: candidates.len(),
            ..BatchSummary::default()
        };

        let mut running = JoinSet::new();
        let mut spawned = HashMap::new();
        for candidate in candidates {
            let id = candidate.id;
            let processor = self.processor.clone();
            let handle = running.spawn(async move {
                let result = processor.process(&candidate).await;
                if let Err(failure) = &result {
                    report_failure(processor.tracking().as_ref(), failure).await;
                }
                result
            });
            spawned.insert(handle.id(), id);
        }

        while let Some(joined) = running.join_next().await {
            match joined {
                Ok(result) => summary.record(&result),
                Err(join_error) => {
                    summary.failed += 1;
                    let Some(candidate) = spawned.get(&join_error.id()).copied() else {
                        error!(error = %join_error, "unknown candidate task aborted");
                        continue;
                    };
                    let failure = CandidateFailure::new(
                        candidate,
                        HomeworkError::Other(join_error.to_string()),
                    );
                    report_failure(self.processor.tracking().as_ref(), &failure).await;
                }
            }
        }

        info!(
            candidates = summary.candidates,
            sent = summary.sent,
            skipped = summary.skipped,
            failed = summary.failed,
            "homework pass finished"
        );
        Ok(summary)
    }

    /// Processes a single candidate with the same failure reporting as a pass.
    pub async fn run_candidate(
        &self,
        candidate: CandidateId,
    ) -> Result<ProcessOutcome, CandidateFailure> {
        let result = self.processor.process_by_id(candidate).await;
        if let Err(failure) = &result {
            report_failure(self.processor.tracking().as_ref(), failure).await;
        }
        result
    }
}

/// Logs the full failure and leaves a recruiter-facing note on the candidate.
pub async fn report_failure<T>(tracking: &T, failure: &CandidateFailure)
where
    T: TrackingSystem + ?Sized,
{
    error!(
        candidate_id = %failure.candidate,
        service = ?failure.service(),
        orphaned_fork = failure.orphaned_fork.as_ref().map(|fork| fork.web_url.as_str()),
        error = %failure.error,
        "homework cycle failed"
    );

    if let Err(note_error) = tracking.add_note(failure.candidate, &failure.note()).await {
        warn!(candidate_id = %failure.candidate, error = %note_error, "could not record failure note");
    }
}
