use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info};

use super::domain::CandidateId;
use super::error::{DataError, HomeworkError};
use super::locks::CandidateLocks;
use super::ports::TrackingSystem;
use super::settings::HomeworkSettings;
use super::stages::resolve_stage;

/// GitLab issue webhook payload, reduced to what the listener reads.
#[derive(Debug, Clone, Deserialize)]
pub struct IssueEvent {
    #[serde(default)]
    pub object_kind: Option<String>,
    pub project: EventProject,
    pub object_attributes: EventAttributes,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventProject {
    pub id: u64,
    pub web_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventAttributes {
    #[serde(default)]
    pub action: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// Not an issue close event.
    Ignored,
    /// No candidate references the repository.
    UnknownRepository,
    Received(CandidateId),
}

/// Moves a candidate to the "received" stage once they close their homework issue.
pub struct SubmissionListener<T> {
    tracking: Arc<T>,
    settings: Arc<HomeworkSettings>,
    locks: CandidateLocks,
}

impl<T> SubmissionListener<T>
where
    T: TrackingSystem + 'static,
{
    pub fn new(tracking: Arc<T>, settings: HomeworkSettings, locks: CandidateLocks) -> Self {
        Self {
            tracking,
            settings: Arc::new(settings),
            locks,
        }
    }

    pub async fn handle(&self, event: &IssueEvent) -> Result<SubmissionOutcome, HomeworkError> {
        let is_issue = event.object_kind.as_deref().map_or(true, |kind| kind == "issue");
        if !is_issue || event.object_attributes.action.as_deref() != Some("close") {
            debug!(project_id = event.project.id, action = ?event.object_attributes.action, "ignoring issue event");
            return Ok(SubmissionOutcome::Ignored);
        }

        let repository_url = event.project.web_url.trim_end_matches('/');
        let found = self
            .tracking
            .find_candidate_by_field(&self.settings.repository_field, repository_url)
            .await?;
        let Some(candidate) = found else {
            info!(project_id = event.project.id, %repository_url, "closed issue belongs to no candidate");
            return Ok(SubmissionOutcome::UnknownRepository);
        };

        // Waits for an in-flight cycle so "received" always lands after "sent".
        let _guard = self.locks.lock(candidate.id).await;

        let placement = candidate.placement().ok_or(DataError::NoPlacement)?;
        let stage =
            resolve_stage(self.tracking.as_ref(), placement, &self.settings.received_stage).await?;
        self.tracking.change_stage(placement.id, stage.id).await?;
        self.tracking
            .add_note(candidate.id, &format!("Hausaufgabe abgegeben: {repository_url}"))
            .await?;

        info!(candidate_id = %candidate.id, project_id = event.project.id, "homework received");
        Ok(SubmissionOutcome::Received(candidate.id))
    }
}
