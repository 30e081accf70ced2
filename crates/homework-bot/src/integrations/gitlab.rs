//! GitLab REST v4 client.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{decode, endpoint, expect_success, parse_base, transport, USER_AGENT};
use crate::config::GitlabConfig;
use crate::workflows::homework::domain::{
    ForgeUser, ForkRequest, Issue, NewIssue, Project, ProjectId, UserId,
};
use crate::workflows::homework::{ClientError, ClientResult, Service, SourceForge};

const SERVICE: Service = Service::Gitlab;

/// How long [`GitlabClient::fork_project`] waits for a fork's import.
#[derive(Debug, Clone, Copy)]
pub struct ForkPolling {
    pub attempts: u32,
    pub interval: Duration,
}

impl Default for ForkPolling {
    fn default() -> Self {
        Self {
            attempts: 30,
            interval: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GitlabClient {
    http: Client,
    api: Url,
    polling: ForkPolling,
}

impl GitlabClient {
    pub fn new(config: &GitlabConfig) -> ClientResult<Self> {
        let mut headers = HeaderMap::new();
        let token =
            HeaderValue::from_str(&config.token).map_err(|err| ClientError::Transport {
                service: SERVICE,
                message: format!("GitLab token is not a valid header value: {err}"),
            })?;
        headers.insert("PRIVATE-TOKEN", token);

        let http = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(transport(SERVICE))?;

        let base = parse_base(SERVICE, &config.base_url)?;
        let api = endpoint(SERVICE, &base, ["api", "v4"])?;

        Ok(Self {
            http,
            api,
            polling: ForkPolling::default(),
        })
    }

    pub fn with_fork_polling(mut self, polling: ForkPolling) -> Self {
        self.polling = polling;
        self
    }

    fn url<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> ClientResult<Url> {
        endpoint(SERVICE, &self.api, segments)
    }

    async fn project(&self, project: ProjectId) -> ClientResult<ProjectPayload> {
        let id = project.to_string();
        let response = self
            .http
            .get(self.url(["projects", id.as_str()])?)
            .send()
            .await
            .map_err(transport(SERVICE))?;
        decode(SERVICE, response).await
    }

    /// A fork is usable once its import finished and the default branch arrived.
    async fn wait_until_ready(&self, fork: ProjectId) -> ClientResult<ProjectPayload> {
        for attempt in 1..=self.polling.attempts {
            let current = self.project(fork).await?;
            match current.import_status.as_deref() {
                Some("failed") => {
                    return Err(ClientError::ForkNotReady {
                        project: fork,
                        attempts: attempt,
                    })
                }
                None | Some("none" | "finished") => {
                    if !self.branches(fork).await?.is_empty() {
                        debug!(project_id = %fork, attempt, "fork ready");
                        return Ok(current);
                    }
                }
                Some(status) => debug!(project_id = %fork, attempt, status, "fork still importing"),
            }
            tokio::time::sleep(self.polling.interval).await;
        }

        Err(ClientError::ForkNotReady {
            project: fork,
            attempts: self.polling.attempts,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ProjectPayload {
    id: u64,
    name: String,
    path_with_namespace: String,
    web_url: String,
    #[serde(default)]
    import_status: Option<String>,
}

impl From<ProjectPayload> for Project {
    fn from(payload: ProjectPayload) -> Self {
        Project {
            id: ProjectId(payload.id),
            name: payload.name,
            path_with_namespace: payload.path_with_namespace,
            web_url: payload.web_url,
        }
    }
}

#[derive(Debug, Deserialize)]
struct BranchPayload {
    name: String,
}

#[derive(Debug, Deserialize)]
struct UserPayload {
    id: u64,
    username: String,
}

#[derive(Debug, Deserialize)]
struct IssuePayload {
    id: u64,
    iid: u64,
    web_url: String,
}

#[derive(Debug, Serialize)]
struct ForkBody<'a> {
    namespace_path: &'a str,
    name: &'a str,
    path: &'a str,
}

#[derive(Debug, Serialize)]
struct MemberBody {
    user_id: u64,
    access_level: u8,
    expires_at: NaiveDate,
}

#[derive(Debug, Serialize)]
struct IssueBody<'a> {
    title: &'a str,
    description: &'a str,
    assignee_ids: [u64; 1],
    due_date: NaiveDate,
}

#[async_trait]
impl SourceForge for GitlabClient {
    async fn find_project(&self, namespace: &str, name: &str) -> ClientResult<Option<Project>> {
        let mut url = self.url(["groups", namespace, "projects"])?;
        url.query_pairs_mut()
            .append_pair("search", name)
            .append_pair("per_page", "100");
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(transport(SERVICE))?;
        let projects: Vec<ProjectPayload> = decode(SERVICE, response).await?;

        Ok(projects
            .into_iter()
            .find(|project| project.name.eq_ignore_ascii_case(name))
            .map(Project::from))
    }

    async fn fork_project(&self, project: ProjectId, fork: &ForkRequest) -> ClientResult<Project> {
        let id = project.to_string();
        let response = self
            .http
            .post(self.url(["projects", id.as_str(), "fork"])?)
            .json(&ForkBody {
                namespace_path: &fork.namespace,
                name: &fork.name,
                path: &fork.path,
            })
            .send()
            .await
            .map_err(transport(SERVICE))?;
        let created: ProjectPayload = decode(SERVICE, response).await?;
        let ready = self.wait_until_ready(ProjectId(created.id)).await?;
        Ok(ready.into())
    }

    async fn branches(&self, project: ProjectId) -> ClientResult<Vec<String>> {
        let id = project.to_string();
        let response = self
            .http
            .get(self.url(["projects", id.as_str(), "repository", "branches"])?)
            .send()
            .await
            .map_err(transport(SERVICE))?;
        let branches: Vec<BranchPayload> = decode(SERVICE, response).await?;
        Ok(branches.into_iter().map(|branch| branch.name).collect())
    }

    async fn find_user(&self, username: &str) -> ClientResult<Option<ForgeUser>> {
        let mut url = self.url(["users"])?;
        url.query_pairs_mut().append_pair("username", username);
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(transport(SERVICE))?;
        let users: Vec<UserPayload> = decode(SERVICE, response).await?;

        Ok(users
            .into_iter()
            .find(|user| user.username.eq_ignore_ascii_case(username))
            .map(|user| ForgeUser {
                id: UserId(user.id),
                username: user.username,
            }))
    }

    async fn add_member(
        &self,
        project: ProjectId,
        user: UserId,
        access_level: u8,
        expires_at: NaiveDate,
    ) -> ClientResult<()> {
        let id = project.to_string();
        let body = MemberBody {
            user_id: user.0,
            access_level,
            expires_at,
        };
        let response = self
            .http
            .post(self.url(["projects", id.as_str(), "members"])?)
            .json(&body)
            .send()
            .await
            .map_err(transport(SERVICE))?;

        // Forks inherit members; an existing membership is updated in place.
        if response.status() == StatusCode::CONFLICT {
            let user_id = user.0.to_string();
            let response = self
                .http
                .put(self.url(["projects", id.as_str(), "members", user_id.as_str()])?)
                .json(&body)
                .send()
                .await
                .map_err(transport(SERVICE))?;
            expect_success(SERVICE, response).await?;
            return Ok(());
        }

        expect_success(SERVICE, response).await?;
        Ok(())
    }

    async fn create_issue(&self, project: ProjectId, issue: &NewIssue) -> ClientResult<Issue> {
        let id = project.to_string();
        let response = self
            .http
            .post(self.url(["projects", id.as_str(), "issues"])?)
            .json(&IssueBody {
                title: &issue.title,
                description: &issue.description,
                assignee_ids: [issue.assignee.0],
                due_date: issue.due_date,
            })
            .send()
            .await
            .map_err(transport(SERVICE))?;
        let created: IssuePayload = decode(SERVICE, response).await?;
        Ok(Issue {
            id: created.id,
            iid: created.iid,
            web_url: created.web_url,
        })
    }

    async fn delete_project(&self, project: ProjectId) -> ClientResult<()> {
        let id = project.to_string();
        let response = self
            .http
            .delete(self.url(["projects", id.as_str()])?)
            .send()
            .await
            .map_err(transport(SERVICE))?;
        expect_success(SERVICE, response).await?;
        Ok(())
    }
}
