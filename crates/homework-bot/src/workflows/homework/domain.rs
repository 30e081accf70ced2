use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

/// Recruitee candidate identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CandidateId(pub u64);

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OfferId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StageId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlacementId(pub u64);

/// GitLab project identifier, shared by templates and forks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectId(pub u64);

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub u64);

/// Applicant as seen by the tracking system.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub id: CandidateId,
    pub name: String,
    pub tags: BTreeSet<String>,
    pub emails: Vec<String>,
    pub fields: Vec<CustomField>,
    pub placements: Vec<Placement>,
    /// First names of the admins referenced on the candidate's profile.
    pub admin_first_names: Vec<String>,
}

impl Candidate {
    /// The placement whose stage this system moves.
    pub fn placement(&self) -> Option<&Placement> {
        self.placements.first()
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|candidate_tag| candidate_tag.eq_ignore_ascii_case(tag))
    }
}

/// Position of a candidate inside one offer's pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub id: PlacementId,
    pub offer_id: OfferId,
    pub stage_id: Option<StageId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    pub id: StageId,
    pub name: String,
}

/// Profile field with its shape resolved once, when the candidate is loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomField {
    /// Remote identifier; `None` for fields defined on the company but never filled in.
    pub id: Option<u64>,
    pub name: String,
    pub kind: FieldKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    SingleLine(Vec<String>),
    Dropdown(Vec<String>),
    Unsupported(String),
}

impl FieldKind {
    pub fn label(&self) -> &str {
        match self {
            FieldKind::SingleLine(_) => "single_line",
            FieldKind::Dropdown(_) => "dropdown",
            FieldKind::Unsupported(kind) => kind.as_str(),
        }
    }
}

/// To-do item attached to a candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub completed: bool,
    pub due_date: Option<NaiveDate>,
    pub created_at: DateTime<FixedOffset>,
}

impl Task {
    pub fn is_open_homework(&self, title: &str) -> bool {
        !self.completed && self.title.trim().eq_ignore_ascii_case(title)
    }
}

/// Rendered by the tracking system's mail template of the same name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutgoingMail {
    pub template: String,
    pub to: Vec<String>,
    pub values: MailValues,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MailValues {
    pub applicant_name: String,
    pub issue_url: String,
    pub project_url: String,
    pub homework_due_date: String,
    pub signature: String,
}

/// GitLab project, either a homework template or a candidate fork.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub path_with_namespace: String,
    pub web_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForgeUser {
    pub id: UserId,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    pub id: u64,
    pub iid: u64,
    pub web_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForkRequest {
    pub namespace: String,
    pub name: String,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIssue {
    pub title: String,
    pub description: String,
    pub assignee: UserId,
    pub due_date: NaiveDate,
}

/// GitLab's `Maintainer` access level.
pub const MAINTAINER_ACCESS: u8 = 40;
