use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::json;
use tracing::{debug, error, warn};

use super::batch::BatchRunner;
use super::domain::CandidateId;
use super::ports::{SourceForge, TrackingSystem};
use super::processor::{ProcessOutcome, SkipReason};
use super::submission::{IssueEvent, SubmissionListener, SubmissionOutcome};
use crate::error::AppError;

const GITLAB_TOKEN_HEADER: &str = "x-gitlab-token";

/// Everything the homework endpoints need, shared across requests.
pub struct HomeworkApi<T, F> {
    runner: BatchRunner<T, F>,
    listener: Arc<SubmissionListener<T>>,
    webhook_secret: Option<String>,
}

impl<T, F> HomeworkApi<T, F> {
    pub fn new(
        runner: BatchRunner<T, F>,
        listener: Arc<SubmissionListener<T>>,
        webhook_secret: Option<String>,
    ) -> Self {
        Self {
            runner,
            listener,
            webhook_secret,
        }
    }

    fn accepts(&self, headers: &HeaderMap) -> bool {
        let Some(secret) = &self.webhook_secret else {
            return true;
        };
        headers
            .get(GITLAB_TOKEN_HEADER)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|token| token == secret)
    }
}

/// Webhook receiver plus the manual triggers.
pub fn homework_router<T, F>(api: Arc<HomeworkApi<T, F>>) -> Router
where
    T: TrackingSystem + 'static,
    F: SourceForge + 'static,
{
    Router::new()
        .route("/webhooks/gitlab", post(webhook_handler::<T, F>))
        .route("/api/v1/homework/run", post(run_handler::<T, F>))
        .route(
            "/api/v1/homework/candidates/:candidate_id",
            post(candidate_handler::<T, F>),
        )
        .with_state(api)
}

pub(crate) async fn webhook_handler<T, F>(
    State(api): State<Arc<HomeworkApi<T, F>>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response
where
    T: TrackingSystem + 'static,
    F: SourceForge + 'static,
{
    if !api.accepts(&headers) {
        warn!("rejected webhook with wrong token");
        let payload = json!({ "error": "invalid webhook token" });
        return (StatusCode::UNAUTHORIZED, Json(payload)).into_response();
    }

    // GitLab sends every subscribed hook here; only issue events decode.
    let event: IssueEvent = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(err) => {
            debug!(error = %err, "ignoring webhook payload");
            return (StatusCode::OK, Json(json!({ "outcome": "ignored" }))).into_response();
        }
    };

    match api.listener.handle(&event).await {
        Ok(outcome) => {
            let payload = match outcome {
                SubmissionOutcome::Ignored => json!({ "outcome": "ignored" }),
                SubmissionOutcome::UnknownRepository => json!({ "outcome": "unknown_repository" }),
                SubmissionOutcome::Received(candidate) => {
                    json!({ "outcome": "received", "candidate_id": candidate })
                }
            };
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(err) => {
            error!(project_id = event.project.id, error = %err, "submission handling failed");
            AppError::from(err).into_response()
        }
    }
}

pub(crate) async fn run_handler<T, F>(State(api): State<Arc<HomeworkApi<T, F>>>) -> Response
where
    T: TrackingSystem + 'static,
    F: SourceForge + 'static,
{
    match api.runner.run().await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}

pub(crate) async fn candidate_handler<T, F>(
    State(api): State<Arc<HomeworkApi<T, F>>>,
    Path(candidate_id): Path<u64>,
) -> Response
where
    T: TrackingSystem + 'static,
    F: SourceForge + 'static,
{
    match api.runner.run_candidate(CandidateId(candidate_id)).await {
        Ok(ProcessOutcome::Sent(sent)) => {
            (StatusCode::OK, Json(json!({ "outcome": "sent", "homework": sent }))).into_response()
        }
        Ok(ProcessOutcome::Skipped(reason)) => {
            let detail = match &reason {
                SkipReason::Incomplete(gap) => Some(gap.to_string()),
                _ => None,
            };
            let payload = json!({
                "outcome": "skipped",
                "reason": skip_label(&reason),
                "detail": detail,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(failure) => AppError::from(failure.error).into_response(),
    }
}

fn skip_label(reason: &SkipReason) -> &'static str {
    match reason {
        SkipReason::MissingTag => "missing_tag",
        SkipReason::NoOpenTask => "no_open_task",
        SkipReason::Busy => "busy",
        SkipReason::Incomplete(_) => "incomplete",
    }
}
