//! Recruitee company API client.
//!
//! Wire payloads stay private to this module; everything crossing the
//! [`TrackingSystem`] boundary is converted into workflow domain types, with
//! custom field shapes resolved once while decoding.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate};
use minijinja::Environment;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{decode, endpoint, expect_success, parse_base, transport, USER_AGENT};
use crate::config::RecruiteeConfig;
use crate::workflows::homework::domain::{
    Candidate, CandidateId, CustomField, FieldKind, MailValues, OfferId, OutgoingMail, Placement,
    PlacementId, Stage, StageId, Task, TaskId,
};
use crate::workflows::homework::{ClientError, ClientResult, Service, TrackingSystem};

const SERVICE: Service = Service::Recruitee;
const PAGE_SIZE: usize = 100;

#[derive(Debug, Clone)]
pub struct RecruiteeClient {
    http: Client,
    company: Url,
    token: String,
}

impl RecruiteeClient {
    pub fn new(config: &RecruiteeConfig) -> ClientResult<Self> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(transport(SERVICE))?;
        let base = parse_base(SERVICE, &config.base_url)?;
        let company = endpoint(SERVICE, &base, ["c", config.company_id.as_str()])?;

        Ok(Self {
            http,
            company,
            token: config.token.clone(),
        })
    }

    fn url<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> ClientResult<Url> {
        endpoint(SERVICE, &self.company, segments)
    }

    async fn get<T>(&self, url: Url) -> ClientResult<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(transport(SERVICE))?;
        decode(SERVICE, response).await
    }

    async fn send_json<B: Serialize + ?Sized>(
        &self,
        method: reqwest::Method,
        url: Url,
        body: &B,
    ) -> ClientResult<()> {
        let response = self
            .http
            .request(method, url)
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await
            .map_err(transport(SERVICE))?;
        expect_success(SERVICE, response).await?;
        Ok(())
    }

    /// Candidate ids, optionally limited to one offer, following `limit`/`offset` paging.
    async fn candidate_ids(&self, offer: Option<OfferId>) -> ClientResult<BTreeSet<CandidateId>> {
        let mut ids = BTreeSet::new();
        let mut offset = 0;
        loop {
            let mut url = self.url(["candidates"])?;
            {
                let mut query = url.query_pairs_mut();
                if let Some(offer) = offer {
                    query.append_pair("offer_id", &offer.0.to_string());
                }
                query
                    .append_pair("limit", &PAGE_SIZE.to_string())
                    .append_pair("offset", &offset.to_string());
            }
            let page: CandidateList = self.get(url).await?;
            let received = page.candidates.len();
            let before = ids.len();
            ids.extend(page.candidates.into_iter().map(|c| CandidateId(c.id)));

            // A server that ignores paging keeps repeating the same page.
            if received < PAGE_SIZE || ids.len() == before {
                return Ok(ids);
            }
            offset += received;
        }
    }

    async fn mail_template(&self, name: &str) -> ClientResult<MailTemplate> {
        let templates: TemplateList = self.get(self.url(["email_templates"])?).await?;
        templates
            .email_templates
            .into_iter()
            .find(|template| template.title.trim().eq_ignore_ascii_case(name))
            .ok_or_else(|| ClientError::UnknownMailTemplate(name.to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct OfferList {
    offers: Vec<OfferSummary>,
}

#[derive(Debug, Deserialize)]
struct OfferSummary {
    id: u64,
    #[serde(default)]
    tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct OfferEnvelope {
    offer: OfferDetail,
}

#[derive(Debug, Deserialize)]
struct OfferDetail {
    pipeline_template: PipelineTemplate,
}

#[derive(Debug, Deserialize)]
struct PipelineTemplate {
    #[serde(default)]
    stages: Vec<StagePayload>,
}

#[derive(Debug, Deserialize)]
struct StagePayload {
    id: u64,
    name: String,
    #[serde(default)]
    position: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct CandidateList {
    candidates: Vec<CandidateRef>,
}

#[derive(Debug, Deserialize)]
struct CandidateRef {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    hits: Vec<CandidateRef>,
}

#[derive(Debug, Deserialize)]
struct CandidateEnvelope {
    candidate: CandidatePayload,
    #[serde(default)]
    references: Vec<Reference>,
}

#[derive(Debug, Deserialize)]
struct CandidatePayload {
    id: u64,
    name: String,
    #[serde(default)]
    emails: Vec<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    fields: Vec<FieldPayload>,
    #[serde(default)]
    placements: Vec<PlacementPayload>,
}

#[derive(Debug, Deserialize)]
struct PlacementPayload {
    id: u64,
    offer_id: u64,
    #[serde(default)]
    stage_id: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct Reference {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    first_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FieldPayload {
    #[serde(default)]
    id: Option<u64>,
    name: String,
    kind: String,
    #[serde(default)]
    values: Vec<Value>,
}

impl FieldPayload {
    /// Text of every value entry, whatever key the field kind stores it under.
    fn texts(&self) -> Vec<String> {
        self.values
            .iter()
            .filter_map(|value| match value {
                Value::String(text) => Some(text.clone()),
                Value::Object(entry) => ["text", "value"]
                    .iter()
                    .find_map(|key| entry.get(*key).and_then(Value::as_str))
                    .map(str::to_string),
                _ => None,
            })
            .collect()
    }
}

impl From<FieldPayload> for CustomField {
    fn from(payload: FieldPayload) -> Self {
        let kind = match payload.kind.as_str() {
            "single_line" => FieldKind::SingleLine(payload.texts()),
            "dropdown" => FieldKind::Dropdown(payload.texts()),
            other => FieldKind::Unsupported(other.to_string()),
        };
        CustomField {
            id: payload.id,
            name: payload.name,
            kind,
        }
    }
}

impl From<CandidateEnvelope> for Candidate {
    fn from(envelope: CandidateEnvelope) -> Self {
        let CandidateEnvelope {
            candidate,
            references,
        } = envelope;

        Candidate {
            id: CandidateId(candidate.id),
            name: candidate.name,
            tags: candidate.tags.into_iter().collect::<BTreeSet<_>>(),
            emails: candidate.emails,
            fields: candidate.fields.into_iter().map(CustomField::from).collect(),
            placements: candidate
                .placements
                .into_iter()
                .map(|placement| Placement {
                    id: PlacementId(placement.id),
                    offer_id: OfferId(placement.offer_id),
                    stage_id: placement.stage_id.map(StageId),
                })
                .collect(),
            admin_first_names: references
                .into_iter()
                .filter(|reference| reference.kind == "Admin")
                .filter_map(|reference| reference.first_name)
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TaskList {
    tasks: Vec<TaskPayload>,
}

#[derive(Debug, Deserialize)]
struct TaskPayload {
    id: u64,
    title: String,
    #[serde(default)]
    completed: bool,
    #[serde(default)]
    due_date: Option<String>,
    created_at: DateTime<FixedOffset>,
}

impl From<TaskPayload> for Task {
    fn from(payload: TaskPayload) -> Self {
        // Recruitee sends either a bare date or a full timestamp.
        let due_date = payload
            .due_date
            .as_deref()
            .and_then(|raw| raw.get(..10))
            .and_then(|day| NaiveDate::parse_from_str(day, "%Y-%m-%d").ok());
        Task {
            id: TaskId(payload.id),
            title: payload.title,
            completed: payload.completed,
            due_date,
            created_at: payload.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TemplateList {
    email_templates: Vec<MailTemplate>,
}

#[derive(Debug, Clone, Deserialize)]
struct MailTemplate {
    title: String,
    subject: String,
    body_html: String,
}

#[derive(Debug, PartialEq, Eq)]
struct RenderedMail {
    subject: String,
    body_html: String,
}

/// Fills the template's `{{ placeholder }}` slots from the mail values.
fn render_mail(template: &MailTemplate, values: &MailValues) -> ClientResult<RenderedMail> {
    let env = Environment::new();
    let failed = |err: minijinja::Error| ClientError::Template {
        name: template.title.clone(),
        message: err.to_string(),
    };
    Ok(RenderedMail {
        subject: env.render_str(&template.subject, values).map_err(failed)?,
        body_html: env.render_str(&template.body_html, values).map_err(failed)?,
    })
}

#[derive(Debug, Serialize)]
struct MailBody<'a> {
    candidate_id: u64,
    to: &'a [String],
    subject: String,
    body_html: String,
}

#[derive(Debug, Serialize)]
struct FieldEnvelope<T> {
    field: T,
}

#[derive(Debug, Serialize)]
struct FieldValues<'a> {
    values: Vec<BTreeMap<&'static str, &'a str>>,
}

#[derive(Debug, Serialize)]
struct NewField<'a> {
    name: &'a str,
    kind: &'static str,
    values: Vec<BTreeMap<&'static str, &'a str>>,
}

fn text_values(value: Option<&str>) -> Vec<BTreeMap<&'static str, &str>> {
    value
        .map(|text| BTreeMap::from([("text", text)]))
        .into_iter()
        .collect()
}

fn field_id(candidate: &Candidate, name: &str) -> Option<u64> {
    candidate
        .fields
        .iter()
        .find(|field| field.name.trim().eq_ignore_ascii_case(name))
        .and_then(|field| field.id)
}

fn normalize_url(value: &str) -> &str {
    value.trim().trim_end_matches('/')
}

#[async_trait]
impl TrackingSystem for RecruiteeClient {
    async fn candidates(&self, offer_tag: Option<&str>) -> ClientResult<Vec<Candidate>> {
        let ids: BTreeSet<CandidateId> = match offer_tag {
            Some(tag) => {
                let offers: OfferList = self.get(self.url(["offers"])?).await?;
                let mut ids = BTreeSet::new();
                for offer in offers
                    .offers
                    .into_iter()
                    .filter(|offer| offer.tags.iter().any(|t| t.eq_ignore_ascii_case(tag)))
                {
                    ids.extend(self.candidate_ids(Some(OfferId(offer.id))).await?);
                }
                ids
            }
            None => self.candidate_ids(None).await?,
        };

        debug!(count = ids.len(), offer_tag, "listing candidates");
        let mut candidates = Vec::with_capacity(ids.len());
        for id in ids {
            candidates.push(self.candidate(id).await?);
        }
        Ok(candidates)
    }

    async fn candidate(&self, id: CandidateId) -> ClientResult<Candidate> {
        let id = id.to_string();
        let envelope: CandidateEnvelope = self.get(self.url(["candidates", id.as_str()])?).await?;
        Ok(envelope.into())
    }

    async fn find_candidate_by_field(
        &self,
        name: &str,
        value: &str,
    ) -> ClientResult<Option<Candidate>> {
        let wanted = normalize_url(value);
        let mut url = self.url(["search", "new", "candidates"])?;
        url.query_pairs_mut().append_pair("query", wanted);
        let result: SearchResult = self.get(url).await?;

        // Full-text hits are only candidates; the field value must match exactly.
        for hit in result.hits {
            let candidate = self.candidate(CandidateId(hit.id)).await?;
            let matches = candidate.fields.iter().any(|field| {
                field.name.trim().eq_ignore_ascii_case(name)
                    && matches!(&field.kind, FieldKind::SingleLine(values)
                        if values.iter().any(|v| normalize_url(v) == wanted))
            });
            if matches {
                return Ok(Some(candidate));
            }
        }
        Ok(None)
    }

    async fn tasks(&self, candidate: CandidateId) -> ClientResult<Vec<Task>> {
        let id = candidate.to_string();
        let list: TaskList = self.get(self.url(["candidates", id.as_str(), "tasks"])?).await?;
        Ok(list.tasks.into_iter().map(Task::from).collect())
    }

    async fn complete_task(&self, task: TaskId) -> ClientResult<()> {
        let id = task.0.to_string();
        let body = serde_json::json!({ "task": { "completed": true } });
        self.send_json(reqwest::Method::PATCH, self.url(["tasks", id.as_str()])?, &body)
            .await
    }

    async fn stages(&self, offer: OfferId) -> ClientResult<Vec<Stage>> {
        let id = offer.0.to_string();
        let envelope: OfferEnvelope = self.get(self.url(["offers", id.as_str()])?).await?;
        let mut stages = envelope.offer.pipeline_template.stages;
        stages.sort_by_key(|stage| stage.position.unwrap_or(i64::MAX));
        Ok(stages
            .into_iter()
            .map(|stage| Stage {
                id: StageId(stage.id),
                name: stage.name,
            })
            .collect())
    }

    async fn change_stage(&self, placement: PlacementId, stage: StageId) -> ClientResult<()> {
        let id = placement.0.to_string();
        let body = serde_json::json!({ "stage_id": stage.0 });
        self.send_json(
            reqwest::Method::PATCH,
            self.url(["placements", id.as_str(), "change_stage"])?,
            &body,
        )
        .await
    }

    async fn add_note(&self, candidate: CandidateId, body: &str) -> ClientResult<()> {
        let id = candidate.to_string();
        let payload = serde_json::json!({ "note": { "body": body } });
        self.send_json(
            reqwest::Method::POST,
            self.url(["candidates", id.as_str(), "notes"])?,
            &payload,
        )
        .await
    }

    async fn set_field(
        &self,
        candidate: &Candidate,
        name: &str,
        value: &str,
    ) -> ClientResult<()> {
        match field_id(candidate, name) {
            Some(field) => {
                let field = field.to_string();
                let url = self.url(["custom_fields", "candidates", "fields", field.as_str()])?;
                let body = FieldEnvelope {
                    field: FieldValues {
                        values: text_values(Some(value)),
                    },
                };
                self.send_json(reqwest::Method::PATCH, url, &body).await
            }
            None => {
                let id = candidate.id.to_string();
                let url = self.url(["custom_fields", "candidates", id.as_str(), "fields"])?;
                let body = FieldEnvelope {
                    field: NewField {
                        name,
                        kind: "single_line",
                        values: text_values(Some(value)),
                    },
                };
                self.send_json(reqwest::Method::POST, url, &body).await
            }
        }
    }

    async fn clear_field(&self, candidate: &Candidate, name: &str) -> ClientResult<()> {
        let Some(field) = field_id(candidate, name) else {
            return Ok(());
        };
        let field = field.to_string();
        let url = self.url(["custom_fields", "candidates", "fields", field.as_str()])?;
        let body = FieldEnvelope {
            field: FieldValues {
                values: text_values(None),
            },
        };
        self.send_json(reqwest::Method::PATCH, url, &body).await
    }

    async fn send_mail(&self, candidate: CandidateId, mail: &OutgoingMail) -> ClientResult<()> {
        let template = self.mail_template(&mail.template).await?;
        let rendered = render_mail(&template, &mail.values)?;
        let body = MailBody {
            candidate_id: candidate.0,
            to: &mail.to,
            subject: rendered.subject,
            body_html: rendered.body_html,
        };
        self.send_json(reqwest::Method::POST, self.url(["mailbox", "send"])?, &body)
            .await
    }
}
