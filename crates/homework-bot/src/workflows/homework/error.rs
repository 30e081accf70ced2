use super::domain::{CandidateId, Project};
use super::fields::FieldShapeError;
use super::ports::{ClientError, Service};

/// Everything that can stop a homework cycle, grouped by who has to act on it.
#[derive(Debug, thiserror::Error)]
pub enum HomeworkError {
    /// Tracking-system setup is wrong; an operator has to fix it.
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
    /// The candidate's record is incomplete or inconsistent.
    #[error(transparent)]
    Data(#[from] DataError),
    #[error(transparent)]
    Transport(ClientError),
    /// Anything else, such as a candidate task that panicked.
    #[error("unexpected failure: {0}")]
    Other(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error(transparent)]
    FieldShape(#[from] FieldShapeError),
    #[error("no pipeline stage matches '{0}'")]
    UnknownStage(String),
    #[error("mail template '{0}' does not exist")]
    UnknownMailTemplate(String),
    #[error("mail template '{name}' cannot be rendered: {message}")]
    BrokenMailTemplate { name: String, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DataError {
    #[error("{count} open homework tasks found, expected exactly one")]
    DuplicateHomeworkTasks { count: usize },
    #[error("candidate has no email address")]
    MissingEmail,
    #[error("field '{0}' is not filled in")]
    MissingField(String),
    #[error("GitLab account '{0}' does not exist")]
    AccountNotFound(String),
    #[error("no homework template named '{0}'")]
    TemplateNotFound(String),
    #[error("candidate is not placed on any offer")]
    NoPlacement,
}

impl From<ClientError> for HomeworkError {
    fn from(value: ClientError) -> Self {
        match value {
            ClientError::UnknownMailTemplate(name) => {
                Self::Configuration(ConfigurationError::UnknownMailTemplate(name))
            }
            ClientError::Template { name, message } => {
                Self::Configuration(ConfigurationError::BrokenMailTemplate { name, message })
            }
            other => Self::Transport(other),
        }
    }
}

impl From<FieldShapeError> for HomeworkError {
    fn from(value: FieldShapeError) -> Self {
        Self::Configuration(ConfigurationError::FieldShape(value))
    }
}

/// A failed cycle together with the fork it leaves behind, if any.
#[derive(Debug, thiserror::Error)]
#[error("homework cycle for candidate {candidate} failed: {error}")]
pub struct CandidateFailure {
    pub candidate: CandidateId,
    #[source]
    pub error: HomeworkError,
    pub orphaned_fork: Option<Project>,
}

impl CandidateFailure {
    pub fn new(candidate: CandidateId, error: impl Into<HomeworkError>) -> Self {
        Self {
            candidate,
            error: error.into(),
            orphaned_fork: None,
        }
    }

    pub fn with_orphaned_fork(mut self, fork: Option<Project>) -> Self {
        self.orphaned_fork = fork;
        self
    }

    /// Note left on the candidate so recruiters see why nothing was sent.
    pub fn note(&self) -> String {
        let mut note = match &self.error {
            HomeworkError::Configuration(err) => format!(
                "Hausaufgabe konnte nicht versendet werden, die Konfiguration ist fehlerhaft: {err}"
            ),
            HomeworkError::Data(err) => {
                format!("Hausaufgabe konnte nicht versendet werden: {}", data_hint(err))
            }
            HomeworkError::Transport(ClientError::UnexpectedStatus {
                service, status, ..
            }) => format!(
                "Entschuldigung, beim Versenden der Hausaufgabe ist ein Fehler aufgetreten \
                 ({service} antwortete mit Status {status})."
            ),
            HomeworkError::Transport(_) | HomeworkError::Other(_) => {
                "Entschuldigung, beim Versenden der Hausaufgabe ist ein unerwarteter Fehler aufgetreten."
                    .to_string()
            }
        };

        if let Some(fork) = &self.orphaned_fork {
            note.push_str(&format!(
                " Das bereits angelegte Repository {} muss manuell entfernt werden.",
                fork.web_url
            ));
        }
        note
    }

    /// Service whose HTTP status caused the failure, for log fields.
    pub fn service(&self) -> Option<Service> {
        match &self.error {
            HomeworkError::Transport(
                ClientError::UnexpectedStatus { service, .. }
                | ClientError::Transport { service, .. }
                | ClientError::Decode { service, .. },
            ) => Some(*service),
            HomeworkError::Transport(ClientError::ForkNotReady { .. }) => Some(Service::Gitlab),
            _ => None,
        }
    }
}

fn data_hint(err: &DataError) -> String {
    match err {
        DataError::DuplicateHomeworkTasks { count } => format!(
            "es gibt {count} offene Hausaufgaben-Aufgaben, bitte alle bis auf eine entfernen."
        ),
        DataError::MissingEmail => "es ist keine E-Mail-Adresse hinterlegt.".to_string(),
        DataError::MissingField(name) => format!("das Feld \"{name}\" ist nicht ausgefüllt."),
        DataError::AccountNotFound(name) => {
            format!("der GitLab-Account \"{name}\" existiert nicht.")
        }
        DataError::TemplateNotFound(name) => {
            format!("es gibt keine Hausaufgabe mit dem Namen \"{name}\".")
        }
        DataError::NoPlacement => "der Kandidat ist keiner Stelle zugeordnet.".to_string(),
    }
}
