use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};

use crate::workflows::homework::domain::{
    Candidate, CandidateId, CustomField, FieldKind, ForgeUser, ForkRequest, Issue, NewIssue,
    OfferId, OutgoingMail, Placement, PlacementId, Project, ProjectId, Stage, StageId, Task,
    TaskId, UserId,
};
use crate::workflows::homework::{
    CandidateLocks, ClientError, ClientResult, HomeworkProcessor, HomeworkSettings, Service,
    SourceForge, SuffixSource, TrackingSystem,
};

pub(super) const ALICE: CandidateId = CandidateId(7);
pub(super) const OFFER: OfferId = OfferId(3);
pub(super) const PLACEMENT: PlacementId = PlacementId(11);
pub(super) const SENT_STAGE: StageId = StageId(2);
pub(super) const RECEIVED_STAGE: StageId = StageId(3);
pub(super) const TEMPLATE: ProjectId = ProjectId(500);

pub(super) fn single_line(name: &str, value: &str) -> CustomField {
    CustomField {
        id: Some(100),
        name: name.to_string(),
        kind: FieldKind::SingleLine(vec![value.to_string()]),
    }
}

pub(super) fn dropdown(name: &str, value: &str) -> CustomField {
    CustomField {
        id: Some(101),
        name: name.to_string(),
        kind: FieldKind::Dropdown(vec![value.to_string()]),
    }
}

pub(super) fn alice() -> Candidate {
    Candidate {
        id: ALICE,
        name: "Alice Example".to_string(),
        tags: BTreeSet::from(["Backend".to_string()]),
        emails: vec!["alice@example.com".to_string()],
        fields: vec![
            dropdown("Hausaufgabe", "basics"),
            single_line("GitLab-Account", "alice"),
        ],
        placements: vec![Placement {
            id: PLACEMENT,
            offer_id: OFFER,
            stage_id: Some(StageId(1)),
        }],
        admin_first_names: vec!["Jana".to_string()],
    }
}

pub(super) fn homework_task(id: u64) -> Task {
    Task {
        id: TaskId(id),
        title: "Hausaufgabe".to_string(),
        completed: false,
        due_date: None,
        created_at: DateTime::parse_from_rfc3339("2024-01-01T10:00:00+01:00")
            .expect("valid timestamp"),
    }
}

pub(super) fn pipeline() -> Vec<Stage> {
    [
        (1, "Applied"),
        (2, "Hausaufgabe versendet"),
        (3, "Hausaufgabe erhalten"),
    ]
    .into_iter()
    .map(|(id, name)| Stage {
        id: StageId(id),
        name: name.to_string(),
    })
    .collect()
}

fn failure(service: Service, operation: &str) -> ClientError {
    ClientError::UnexpectedStatus {
        service,
        status: 500,
        body: format!("{operation} exploded"),
    }
}

/// Mutations recorded by [`FakeTracking`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum TrackingCall {
    CompleteTask(TaskId),
    ChangeStage(PlacementId, StageId),
    AddNote(CandidateId, String),
    SetField(CandidateId, String, String),
    ClearField(CandidateId, String),
    SendMail(CandidateId, OutgoingMail),
}

#[derive(Debug, Default)]
pub(super) struct TrackingState {
    candidates: BTreeMap<CandidateId, Candidate>,
    tasks: HashMap<CandidateId, Vec<Task>>,
    stages: HashMap<OfferId, Vec<Stage>>,
    offer_tags: HashMap<OfferId, Vec<String>>,
    failing: HashSet<&'static str>,
    calls: Vec<TrackingCall>,
}

#[derive(Debug, Clone, Default)]
pub(super) struct FakeTracking {
    state: Arc<Mutex<TrackingState>>,
}

impl FakeTracking {
    /// Alice with one open homework task on an offer with the standard pipeline.
    pub(super) fn with_alice() -> Self {
        let tracking = Self::default();
        tracking.insert_candidate(alice(), vec![homework_task(21)]);
        tracking.set_stages(OFFER, pipeline());
        tracking
    }

    pub(super) fn insert_candidate(&self, candidate: Candidate, tasks: Vec<Task>) {
        let mut state = self.state.lock().expect("tracking mutex poisoned");
        state.tasks.insert(candidate.id, tasks);
        state.candidates.insert(candidate.id, candidate);
    }

    pub(super) fn update_candidate(&self, id: CandidateId, change: impl FnOnce(&mut Candidate)) {
        let mut state = self.state.lock().expect("tracking mutex poisoned");
        let candidate = state.candidates.get_mut(&id).expect("candidate exists");
        change(candidate);
    }

    pub(super) fn set_stages(&self, offer: OfferId, stages: Vec<Stage>) {
        let mut state = self.state.lock().expect("tracking mutex poisoned");
        state.stages.insert(offer, stages);
    }

    pub(super) fn tag_offer(&self, offer: OfferId, tag: &str) {
        let mut state = self.state.lock().expect("tracking mutex poisoned");
        state.offer_tags.entry(offer).or_default().push(tag.to_string());
    }

    /// Makes `operation` answer with a 500 from now on.
    pub(super) fn fail(&self, operation: &'static str) {
        let mut state = self.state.lock().expect("tracking mutex poisoned");
        state.failing.insert(operation);
    }

    pub(super) fn calls(&self) -> Vec<TrackingCall> {
        self.state.lock().expect("tracking mutex poisoned").calls.clone()
    }

    pub(super) fn notes(&self, candidate: CandidateId) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                TrackingCall::AddNote(id, body) if id == candidate => Some(body),
                _ => None,
            })
            .collect()
    }

    pub(super) fn mails(&self) -> Vec<OutgoingMail> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                TrackingCall::SendMail(_, mail) => Some(mail),
                _ => None,
            })
            .collect()
    }

    pub(super) fn stored(&self, id: CandidateId) -> Candidate {
        let state = self.state.lock().expect("tracking mutex poisoned");
        state.candidates.get(&id).cloned().expect("candidate exists")
    }

    fn check(&self, operation: &'static str) -> ClientResult<()> {
        let state = self.state.lock().expect("tracking mutex poisoned");
        if state.failing.contains(operation) {
            return Err(failure(Service::Recruitee, operation));
        }
        Ok(())
    }

    fn record(&self, call: TrackingCall) {
        let mut state = self.state.lock().expect("tracking mutex poisoned");
        state.calls.push(call);
    }
}

fn field_values_mut<'a>(candidate: &'a mut Candidate, name: &str) -> Option<&'a mut Vec<String>> {
    candidate
        .fields
        .iter_mut()
        .find(|field| field.name.eq_ignore_ascii_case(name))
        .and_then(|field| match &mut field.kind {
            FieldKind::SingleLine(values) | FieldKind::Dropdown(values) => Some(values),
            FieldKind::Unsupported(_) => None,
        })
}

#[async_trait]
impl TrackingSystem for FakeTracking {
    async fn candidates(&self, offer_tag: Option<&str>) -> ClientResult<Vec<Candidate>> {
        self.check("candidates")?;
        let state = self.state.lock().expect("tracking mutex poisoned");
        Ok(state
            .candidates
            .values()
            .filter(|candidate| match offer_tag {
                None => true,
                Some(tag) => candidate.placements.iter().any(|placement| {
                    state
                        .offer_tags
                        .get(&placement.offer_id)
                        .is_some_and(|tags| tags.iter().any(|t| t == tag))
                }),
            })
            .cloned()
            .collect())
    }

    async fn candidate(&self, id: CandidateId) -> ClientResult<Candidate> {
        self.check("candidate")?;
        let state = self.state.lock().expect("tracking mutex poisoned");
        state
            .candidates
            .get(&id)
            .cloned()
            .ok_or_else(|| ClientError::UnexpectedStatus {
                service: Service::Recruitee,
                status: 404,
                body: "candidate not found".to_string(),
            })
    }

    async fn find_candidate_by_field(
        &self,
        name: &str,
        value: &str,
    ) -> ClientResult<Option<Candidate>> {
        self.check("find_candidate_by_field")?;
        let state = self.state.lock().expect("tracking mutex poisoned");
        let wanted = value.trim_end_matches('/');
        Ok(state
            .candidates
            .values()
            .find(|candidate| {
                candidate.fields.iter().any(|field| {
                    field.name.eq_ignore_ascii_case(name)
                        && matches!(&field.kind, FieldKind::SingleLine(values)
                            if values.iter().any(|v| v.trim_end_matches('/') == wanted))
                })
            })
            .cloned())
    }

    async fn tasks(&self, candidate: CandidateId) -> ClientResult<Vec<Task>> {
        self.check("tasks")?;
        let state = self.state.lock().expect("tracking mutex poisoned");
        Ok(state.tasks.get(&candidate).cloned().unwrap_or_default())
    }

    async fn complete_task(&self, task: TaskId) -> ClientResult<()> {
        self.check("complete_task")?;
        {
            let mut state = self.state.lock().expect("tracking mutex poisoned");
            for existing in state.tasks.values_mut().flatten() {
                if existing.id == task {
                    existing.completed = true;
                }
            }
        }
        self.record(TrackingCall::CompleteTask(task));
        Ok(())
    }

    async fn stages(&self, offer: OfferId) -> ClientResult<Vec<Stage>> {
        self.check("stages")?;
        let state = self.state.lock().expect("tracking mutex poisoned");
        Ok(state.stages.get(&offer).cloned().unwrap_or_default())
    }

    async fn change_stage(&self, placement: PlacementId, stage: StageId) -> ClientResult<()> {
        self.check("change_stage")?;
        self.record(TrackingCall::ChangeStage(placement, stage));
        Ok(())
    }

    async fn add_note(&self, candidate: CandidateId, body: &str) -> ClientResult<()> {
        self.check("add_note")?;
        self.record(TrackingCall::AddNote(candidate, body.to_string()));
        Ok(())
    }

    async fn set_field(
        &self,
        candidate: &Candidate,
        name: &str,
        value: &str,
    ) -> ClientResult<()> {
        self.check("set_field")?;
        {
            let mut state = self.state.lock().expect("tracking mutex poisoned");
            if let Some(stored) = state.candidates.get_mut(&candidate.id) {
                match field_values_mut(stored, name) {
                    Some(values) => *values = vec![value.to_string()],
                    None => stored.fields.push(CustomField {
                        id: Some(900),
                        name: name.to_string(),
                        kind: FieldKind::SingleLine(vec![value.to_string()]),
                    }),
                }
            }
        }
        self.record(TrackingCall::SetField(
            candidate.id,
            name.to_string(),
            value.to_string(),
        ));
        Ok(())
    }

    async fn clear_field(&self, candidate: &Candidate, name: &str) -> ClientResult<()> {
        self.check("clear_field")?;
        {
            let mut state = self.state.lock().expect("tracking mutex poisoned");
            if let Some(values) = state
                .candidates
                .get_mut(&candidate.id)
                .and_then(|stored| field_values_mut(stored, name))
            {
                values.clear();
            }
        }
        self.record(TrackingCall::ClearField(candidate.id, name.to_string()));
        Ok(())
    }

    async fn send_mail(&self, candidate: CandidateId, mail: &OutgoingMail) -> ClientResult<()> {
        self.check("send_mail")?;
        self.record(TrackingCall::SendMail(candidate, mail.clone()));
        Ok(())
    }
}

/// Mutations recorded by [`FakeForge`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum ForgeCall {
    Fork(ProjectId, ForkRequest),
    AddMember(ProjectId, UserId, u8, NaiveDate),
    CreateIssue(ProjectId, NewIssue),
    Delete(ProjectId),
}

#[derive(Debug, Default)]
pub(super) struct ForgeState {
    templates: Vec<(String, Project)>,
    users: Vec<ForgeUser>,
    forks: HashMap<ProjectId, Project>,
    failing: HashSet<&'static str>,
    panicking: HashSet<&'static str>,
    calls: Vec<ForgeCall>,
}

#[derive(Debug, Clone, Default)]
pub(super) struct FakeForge {
    state: Arc<Mutex<ForgeState>>,
}

impl FakeForge {
    /// The `basics` template and the `alice` account.
    pub(super) fn with_basics() -> Self {
        let forge = Self::default();
        forge.add_template(
            "homework-templates",
            Project {
                id: TEMPLATE,
                name: "basics".to_string(),
                path_with_namespace: "homework-templates/basics".to_string(),
                web_url: "https://gitlab.example/homework-templates/basics".to_string(),
            },
        );
        forge.add_user(ForgeUser {
            id: UserId(77),
            username: "alice".to_string(),
        });
        forge
    }

    pub(super) fn add_template(&self, namespace: &str, project: Project) {
        let mut state = self.state.lock().expect("forge mutex poisoned");
        state.templates.push((namespace.to_string(), project));
    }

    pub(super) fn add_user(&self, user: ForgeUser) {
        let mut state = self.state.lock().expect("forge mutex poisoned");
        state.users.push(user);
    }

    pub(super) fn fail(&self, operation: &'static str) {
        let mut state = self.state.lock().expect("forge mutex poisoned");
        state.failing.insert(operation);
    }

    /// Makes `operation` panic instead of answering.
    pub(super) fn panic_on(&self, operation: &'static str) {
        let mut state = self.state.lock().expect("forge mutex poisoned");
        state.panicking.insert(operation);
    }

    pub(super) fn calls(&self) -> Vec<ForgeCall> {
        self.state.lock().expect("forge mutex poisoned").calls.clone()
    }

    fn check(&self, operation: &'static str) -> ClientResult<()> {
        let (fails, panics) = {
            let state = self.state.lock().expect("forge mutex poisoned");
            (
                state.failing.contains(operation),
                state.panicking.contains(operation),
            )
        };
        if panics {
            panic!("{operation} panicked");
        }
        if fails {
            return Err(failure(Service::Gitlab, operation));
        }
        Ok(())
    }

    fn record(&self, call: ForgeCall) {
        let mut state = self.state.lock().expect("forge mutex poisoned");
        state.calls.push(call);
    }
}

#[async_trait]
impl SourceForge for FakeForge {
    async fn find_project(&self, namespace: &str, name: &str) -> ClientResult<Option<Project>> {
        self.check("find_project")?;
        let state = self.state.lock().expect("forge mutex poisoned");
        Ok(state
            .templates
            .iter()
            .find(|(ns, project)| ns == namespace && project.name.eq_ignore_ascii_case(name))
            .map(|(_, project)| project.clone()))
    }

    async fn fork_project(&self, project: ProjectId, fork: &ForkRequest) -> ClientResult<Project> {
        self.check("fork_project")?;
        let created = {
            let mut state = self.state.lock().expect("forge mutex poisoned");
            let id = ProjectId(1000 + state.forks.len() as u64);
            let created = Project {
                id,
                name: fork.name.clone(),
                path_with_namespace: format!("{}/{}", fork.namespace, fork.path),
                web_url: format!("https://gitlab.example/{}/{}", fork.namespace, fork.path),
            };
            state.forks.insert(id, created.clone());
            created
        };
        self.record(ForgeCall::Fork(project, fork.clone()));
        Ok(created)
    }

    async fn branches(&self, _project: ProjectId) -> ClientResult<Vec<String>> {
        self.check("branches")?;
        Ok(vec!["main".to_string()])
    }

    async fn find_user(&self, username: &str) -> ClientResult<Option<ForgeUser>> {
        self.check("find_user")?;
        let state = self.state.lock().expect("forge mutex poisoned");
        Ok(state
            .users
            .iter()
            .find(|user| user.username.eq_ignore_ascii_case(username))
            .cloned())
    }

    async fn add_member(
        &self,
        project: ProjectId,
        user: UserId,
        access_level: u8,
        expires_at: NaiveDate,
    ) -> ClientResult<()> {
        self.check("add_member")?;
        self.record(ForgeCall::AddMember(project, user, access_level, expires_at));
        Ok(())
    }

    async fn create_issue(&self, project: ProjectId, issue: &NewIssue) -> ClientResult<Issue> {
        self.check("create_issue")?;
        let web_url = {
            let state = self.state.lock().expect("forge mutex poisoned");
            let fork = state.forks.get(&project).expect("issue opened on a known fork");
            format!("{}/-/issues/1", fork.web_url)
        };
        self.record(ForgeCall::CreateIssue(project, issue.clone()));
        Ok(Issue {
            id: 9000,
            iid: 1,
            web_url,
        })
    }

    async fn delete_project(&self, project: ProjectId) -> ClientResult<()> {
        self.check("delete_project")?;
        {
            let mut state = self.state.lock().expect("forge mutex poisoned");
            state.forks.remove(&project);
        }
        self.record(ForgeCall::Delete(project));
        Ok(())
    }
}

pub(super) struct FixedSuffix(pub(super) u32);

impl SuffixSource for FixedSuffix {
    fn next_suffix(&self) -> u32 {
        self.0
    }
}

pub(super) fn build_processor(
    tracking: &FakeTracking,
    forge: &FakeForge,
    settings: HomeworkSettings,
    locks: CandidateLocks,
) -> HomeworkProcessor<FakeTracking, FakeForge> {
    HomeworkProcessor::new(
        Arc::new(tracking.clone()),
        Arc::new(forge.clone()),
        Arc::new(FixedSuffix(42)),
        settings,
        locks,
    )
}
