use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::domain::{Candidate, CandidateId, Issue, Placement, Project, StageId, Task};
use super::due_date::format_due_date;
use super::error::{CandidateFailure, DataError, HomeworkError};
use super::fields::{dropdown, single_line};
use super::locks::CandidateLocks;
use super::mail;
use super::ports::{SourceForge, TrackingSystem};
use super::provisioner::{ProvisionedHomework, RepositoryProvisioner, SuffixSource};
use super::settings::{FieldMode, HomeworkSettings};
use super::stages::resolve_stage;

/// What happened to a candidate during one pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    Sent(SentHomework),
    Skipped(SkipReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    MissingTag,
    NoOpenTask,
    /// Another cycle for the same candidate is still running.
    Busy,
    /// Lenient mode: data is missing, try again next pass.
    Incomplete(DataError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SentHomework {
    pub candidate: CandidateId,
    pub homework: String,
    pub fork: Project,
    pub issue: Issue,
    pub due_date: NaiveDate,
    pub fork_deleted: bool,
}

/// Validated inputs of a homework cycle.
struct Eligible<'a> {
    task: Task,
    homework: String,
    account: String,
    placement: &'a Placement,
}

/// Drives a single candidate from "has an open homework task" to "homework sent".
pub struct HomeworkProcessor<T, F> {
    tracking: Arc<T>,
    forge: Arc<F>,
    provisioner: RepositoryProvisioner<T, F>,
    settings: Arc<HomeworkSettings>,
    locks: CandidateLocks,
}

impl<T, F> HomeworkProcessor<T, F>
where
    T: TrackingSystem + 'static,
    F: SourceForge + 'static,
{
    pub fn new(
        tracking: Arc<T>,
        forge: Arc<F>,
        suffixes: Arc<dyn SuffixSource>,
        settings: HomeworkSettings,
        locks: CandidateLocks,
    ) -> Self {
        let settings = Arc::new(settings);
        let provisioner = RepositoryProvisioner::new(
            tracking.clone(),
            forge.clone(),
            suffixes,
            settings.clone(),
        );
        Self {
            tracking,
            forge,
            provisioner,
            settings,
            locks,
        }
    }

    pub fn settings(&self) -> &HomeworkSettings {
        &self.settings
    }

    pub fn tracking(&self) -> &Arc<T> {
        &self.tracking
    }

    /// Loads the candidate first; used by manual triggers.
    pub async fn process_by_id(
        &self,
        id: CandidateId,
    ) -> Result<ProcessOutcome, CandidateFailure> {
        let candidate = self
            .tracking
            .candidate(id)
            .await
            .map_err(|err| CandidateFailure::new(id, err))?;
        self.process(&candidate).await
    }

    pub async fn process(
        &self,
        candidate: &Candidate,
    ) -> Result<ProcessOutcome, CandidateFailure> {
        if let Some(tag) = &self.settings.required_tag {
            if !candidate.has_tag(tag) {
                debug!(candidate_id = %candidate.id, %tag, "candidate lacks required tag");
                return Ok(ProcessOutcome::Skipped(SkipReason::MissingTag));
            }
        }

        let Some(_guard) = self.locks.try_lock(candidate.id) else {
            debug!(candidate_id = %candidate.id, "candidate already in progress");
            return Ok(ProcessOutcome::Skipped(SkipReason::Busy));
        };

        let eligible = match self.check_eligibility(candidate).await {
            Ok(Ok(eligible)) => eligible,
            Ok(Err(reason)) => return Ok(ProcessOutcome::Skipped(reason)),
            Err(error) => return Err(CandidateFailure::new(candidate.id, error)),
        };

        let Some(user) = self
            .forge
            .find_user(&eligible.account)
            .await
            .map_err(|err| CandidateFailure::new(candidate.id, err))?
        else {
            return self
                .data_gap(candidate, DataError::AccountNotFound(eligible.account))
                .map(ProcessOutcome::Skipped)
                .map_err(|gap| CandidateFailure::new(candidate.id, gap));
        };

        // Resolved before provisioning so a broken pipeline never leaves a fork behind.
        let sent_stage = resolve_stage(
            self.tracking.as_ref(),
            eligible.placement,
            &self.settings.sent_stage,
        )
        .await
        .map_err(|err| CandidateFailure::new(candidate.id, err))?;

        let provisioned = self
            .provisioner
            .provision(candidate, &user, &eligible.homework, &eligible.task)
            .await?;

        let fork_deleted = self
            .complete_cycle(candidate, &eligible, sent_stage.id, &provisioned)
            .await
            .map_err(|error| {
                CandidateFailure::new(candidate.id, error)
                    .with_orphaned_fork(Some(provisioned.fork.clone()))
            })?;

        info!(
            candidate_id = %candidate.id,
            homework = %eligible.homework,
            project_id = %provisioned.fork.id,
            "homework sent"
        );

        let ProvisionedHomework {
            fork,
            issue,
            due_date,
        } = provisioned;
        Ok(ProcessOutcome::Sent(SentHomework {
            candidate: candidate.id,
            homework: eligible.homework,
            fork,
            issue,
            due_date,
            fork_deleted,
        }))
    }

    /// `Ok(Err(_))` means "skip quietly", `Err(_)` means "report".
    async fn check_eligibility<'a>(
        &self,
        candidate: &'a Candidate,
    ) -> Result<Result<Eligible<'a>, SkipReason>, HomeworkError> {
        let tasks = self.tracking.tasks(candidate.id).await?;
        let mut open: Vec<Task> = tasks
            .into_iter()
            .filter(|task| task.is_open_homework(&self.settings.task_title))
            .collect();

        let task = match open.len() {
            0 => return Ok(Err(SkipReason::NoOpenTask)),
            1 => open.remove(0),
            count => return Err(DataError::DuplicateHomeworkTasks { count }.into()),
        };

        if candidate.emails.is_empty() {
            return self
                .data_gap(candidate, DataError::MissingEmail)
                .map(Err)
                .map_err(Into::into);
        }

        let Some(homework) = dropdown(candidate, &self.settings.homework_field)? else {
            let gap = DataError::MissingField(self.settings.homework_field.clone());
            return self.data_gap(candidate, gap).map(Err).map_err(Into::into);
        };

        let Some(account) = single_line(candidate, &self.settings.account_field)? else {
            let gap = DataError::MissingField(self.settings.account_field.clone());
            return self.data_gap(candidate, gap).map(Err).map_err(Into::into);
        };

        let placement = candidate.placement().ok_or(DataError::NoPlacement)?;

        Ok(Ok(Eligible {
            task,
            homework,
            account,
            placement,
        }))
    }

    /// Applies the configured [`FieldMode`] to a gap in the candidate's data.
    fn data_gap(&self, candidate: &Candidate, gap: DataError) -> Result<SkipReason, DataError> {
        match self.settings.field_mode {
            FieldMode::Strict => Err(gap),
            FieldMode::Lenient => {
                warn!(candidate_id = %candidate.id, reason = %gap, "skipping candidate with incomplete data");
                Ok(SkipReason::Incomplete(gap))
            }
        }
    }

    /// Finalize, notify and optionally clean up. Returns whether the fork was deleted.
    async fn complete_cycle(
        &self,
        candidate: &Candidate,
        eligible: &Eligible<'_>,
        sent_stage: StageId,
        provisioned: &ProvisionedHomework,
    ) -> Result<bool, HomeworkError> {
        self.tracking.complete_task(eligible.task.id).await?;
        self.tracking
            .change_stage(eligible.placement.id, sent_stage)
            .await?;
        self.tracking
            .add_note(
                candidate.id,
                &format!(
                    "Hausaufgabe \"{}\" versendet, Abgabe bis {}.",
                    eligible.homework,
                    format_due_date(provisioned.due_date)
                ),
            )
            .await?;

        let outgoing = mail::compose(
            candidate,
            &self.settings,
            &provisioned.fork,
            &provisioned.issue,
            provisioned.due_date,
        )?;
        self.tracking.send_mail(candidate.id, &outgoing).await?;

        if !self.settings.delete_fork_after_send {
            return Ok(false);
        }

        match self.cleanup(candidate.id, &provisioned.fork).await {
            Ok(()) => Ok(true),
            Err(error) => {
                // Homework is already sent at this point, cleanup failures do not fail the cycle.
                warn!(candidate_id = %candidate.id, project_id = %provisioned.fork.id, %error, "fork cleanup failed");
                let note = format!(
                    "Das Repository {} konnte nach dem Versand nicht gelöscht werden und muss manuell entfernt werden.",
                    provisioned.fork.web_url
                );
                if let Err(note_error) = self.tracking.add_note(candidate.id, &note).await {
                    warn!(candidate_id = %candidate.id, error = %note_error, "could not record cleanup note");
                }
                Ok(false)
            }
        }
    }

    /// Clears the stored URL before deleting, so the candidate never points at a missing fork.
    async fn cleanup(&self, candidate: CandidateId, fork: &Project) -> Result<(), HomeworkError> {
        // Field state may have changed while the cycle ran.
        let current = self.tracking.candidate(candidate).await?;
        self.tracking
            .clear_field(&current, &self.settings.repository_field)
            .await?;
        self.forge.delete_project(fork.id).await?;
        debug!(candidate_id = %candidate, project_id = %fork.id, "fork deleted after send");
        Ok(())
    }
}
