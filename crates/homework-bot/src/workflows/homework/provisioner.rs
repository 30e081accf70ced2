use std::sync::Arc;

use chrono::NaiveDate;
use rand::Rng;
use tracing::{debug, info};

use super::domain::{
    Candidate, ForgeUser, ForkRequest, Issue, NewIssue, Project, Task, MAINTAINER_ACCESS,
};
use super::due_date::compute_due_date;
use super::error::{CandidateFailure, DataError, HomeworkError};
use super::ports::{SourceForge, TrackingSystem};
use super::settings::HomeworkSettings;

/// Source of the numeric token that keeps concurrently created fork names apart.
pub trait SuffixSource: Send + Sync {
    fn next_suffix(&self) -> u32;
}

/// Six-digit tokens from the thread-local RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomSuffix;

impl SuffixSource for RandomSuffix {
    fn next_suffix(&self) -> u32 {
        rand::thread_rng().gen_range(0..1_000_000)
    }
}

/// Result of a successful provisioning run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionedHomework {
    pub fork: Project,
    pub issue: Issue,
    pub due_date: NaiveDate,
}

/// Creates the candidate's fork, grants access, opens the tracking issue and records the fork URL.
pub struct RepositoryProvisioner<T, F> {
    tracking: Arc<T>,
    forge: Arc<F>,
    suffixes: Arc<dyn SuffixSource>,
    settings: Arc<HomeworkSettings>,
}

impl<T, F> RepositoryProvisioner<T, F>
where
    T: TrackingSystem + 'static,
    F: SourceForge + 'static,
{
    pub fn new(
        tracking: Arc<T>,
        forge: Arc<F>,
        suffixes: Arc<dyn SuffixSource>,
        settings: Arc<HomeworkSettings>,
    ) -> Self {
        Self {
            tracking,
            forge,
            suffixes,
            settings,
        }
    }

    /// Runs every step in order. Nothing is rolled back on failure; a fork that
    /// was already created is reported through [`CandidateFailure::orphaned_fork`].
    pub async fn provision(
        &self,
        candidate: &Candidate,
        user: &ForgeUser,
        homework: &str,
        task: &Task,
    ) -> Result<ProvisionedHomework, CandidateFailure> {
        let fail = |error: HomeworkError| CandidateFailure::new(candidate.id, error);

        let template = self
            .forge
            .find_project(&self.settings.template_namespace, homework)
            .await
            .map_err(|err| fail(err.into()))?
            .ok_or_else(|| fail(DataError::TemplateNotFound(homework.to_string()).into()))?;

        let fork_name = fork_name(&template.name, &user.username, self.suffixes.next_suffix());
        let request = ForkRequest {
            namespace: self.settings.target_namespace.clone(),
            path: fork_path(&fork_name),
            name: fork_name,
        };
        debug!(candidate_id = %candidate.id, template = %template.path_with_namespace, fork = %request.name, "forking homework template");
        let fork = self
            .forge
            .fork_project(template.id, &request)
            .await
            .map_err(|err| fail(err.into()))?;

        let due_date = compute_due_date(task);
        let issue = self
            .equip_fork(candidate, user, &fork, due_date)
            .await
            .map_err(|error| fail(error).with_orphaned_fork(Some(fork.clone())))?;

        info!(candidate_id = %candidate.id, project_id = %fork.id, %due_date, "homework repository provisioned");
        Ok(ProvisionedHomework {
            fork,
            issue,
            due_date,
        })
    }

    async fn equip_fork(
        &self,
        candidate: &Candidate,
        user: &ForgeUser,
        fork: &Project,
        due_date: NaiveDate,
    ) -> Result<Issue, HomeworkError> {
        // Access must not outlive the deadline.
        self.forge
            .add_member(fork.id, user.id, MAINTAINER_ACCESS, due_date)
            .await?;

        let issue = self
            .forge
            .create_issue(
                fork.id,
                &NewIssue {
                    title: self.settings.issue_title.clone(),
                    description: issue_description(&candidate.name),
                    assignee: user.id,
                    due_date,
                },
            )
            .await?;

        self.tracking
            .set_field(candidate, &self.settings.repository_field, &fork.web_url)
            .await?;

        Ok(issue)
    }
}

/// `{template}-{username}-{token}` with the token zero-padded to six digits.
pub fn fork_name(template: &str, username: &str, token: u32) -> String {
    format!("{template}-{username}-{token:06}")
}

/// GitLab paths only allow a restricted character set.
fn fork_path(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect()
}

fn issue_description(candidate_name: &str) -> String {
    format!(
        "Hallo {candidate_name},\n\n\
         in diesem Repository findest du deine Hausaufgabe. Lies dir die README gut durch \
         und committe deine Lösung direkt hierher.\n\n\
         Wenn du fertig bist, schließe dieses Issue. Damit gilt deine Hausaufgabe als abgegeben."
    )
}
