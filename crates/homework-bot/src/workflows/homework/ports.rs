//! Collaborator contracts for the applicant-tracking system and the source forge.
//!
//! The workflow only talks to these traits; `crate::integrations` provides the
//! HTTP-backed implementations and the tests provide in-memory ones.

use async_trait::async_trait;
use chrono::NaiveDate;

use super::domain::{
    Candidate, CandidateId, ForgeUser, ForkRequest, Issue, NewIssue, OfferId, OutgoingMail,
    PlacementId, Project, ProjectId, Stage, StageId, Task, TaskId, UserId,
};

/// Which remote system a [`ClientError`] originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Recruitee,
    Gitlab,
}

impl std::fmt::Display for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Service::Recruitee => f.write_str("Recruitee"),
            Service::Gitlab => f.write_str("GitLab"),
        }
    }
}

/// Failure talking to one of the collaborators.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("{service} answered {status}: {body}")]
    UnexpectedStatus {
        service: Service,
        status: u16,
        body: String,
    },
    #[error("{service} request failed: {message}")]
    Transport { service: Service, message: String },
    #[error("{service} returned an unexpected payload: {message}")]
    Decode { service: Service, message: String },
    #[error("mail template '{0}' does not exist")]
    UnknownMailTemplate(String),
    #[error("mail template '{name}' failed to render: {message}")]
    Template { name: String, message: String },
    #[error("fork {project} was not ready after {attempts} checks")]
    ForkNotReady { project: ProjectId, attempts: u32 },
}

pub type ClientResult<T> = Result<T, ClientError>;

/// Applicant-tracking system operations used by the homework workflow.
#[async_trait]
pub trait TrackingSystem: Send + Sync {
    /// Candidates placed on offers carrying `offer_tag`, or every candidate when `None`.
    async fn candidates(&self, offer_tag: Option<&str>) -> ClientResult<Vec<Candidate>>;

    async fn candidate(&self, id: CandidateId) -> ClientResult<Candidate>;

    /// First candidate whose field `name` holds exactly `value`.
    async fn find_candidate_by_field(
        &self,
        name: &str,
        value: &str,
    ) -> ClientResult<Option<Candidate>>;

    async fn tasks(&self, candidate: CandidateId) -> ClientResult<Vec<Task>>;

    async fn complete_task(&self, task: TaskId) -> ClientResult<()>;

    /// Pipeline stages of an offer, in pipeline order.
    async fn stages(&self, offer: OfferId) -> ClientResult<Vec<Stage>>;

    async fn change_stage(&self, placement: PlacementId, stage: StageId) -> ClientResult<()>;

    async fn add_note(&self, candidate: CandidateId, body: &str) -> ClientResult<()>;

    /// Creates the single-line value of field `name`, or overwrites it when present.
    async fn set_field(&self, candidate: &Candidate, name: &str, value: &str)
        -> ClientResult<()>;

    /// Removes every value of field `name`; absent fields are left alone.
    async fn clear_field(&self, candidate: &Candidate, name: &str) -> ClientResult<()>;

    async fn send_mail(&self, candidate: CandidateId, mail: &OutgoingMail) -> ClientResult<()>;
}

/// Source-forge operations used to hand out homework repositories.
#[async_trait]
pub trait SourceForge: Send + Sync {
    /// Project called `name` (case-insensitive) directly inside `namespace`.
    async fn find_project(&self, namespace: &str, name: &str) -> ClientResult<Option<Project>>;

    /// Forks `project` and returns once the fork's import has finished.
    async fn fork_project(&self, project: ProjectId, fork: &ForkRequest) -> ClientResult<Project>;

    async fn branches(&self, project: ProjectId) -> ClientResult<Vec<String>>;

    async fn find_user(&self, username: &str) -> ClientResult<Option<ForgeUser>>;

    async fn add_member(
        &self,
        project: ProjectId,
        user: UserId,
        access_level: u8,
        expires_at: NaiveDate,
    ) -> ClientResult<()>;

    async fn create_issue(&self, project: ProjectId, issue: &NewIssue) -> ClientResult<Issue>;

    async fn delete_project(&self, project: ProjectId) -> ClientResult<()>;
}
