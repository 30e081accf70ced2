//! Homework cycle: provision a repository for a candidate, notify them, and
//! advance their pipeline stage once they hand the homework in.

mod batch;
pub mod domain;
mod due_date;
mod error;
pub mod fields;
mod locks;
mod mail;
pub mod ports;
mod processor;
mod provisioner;
mod router;
mod settings;
mod stages;
mod submission;

#[cfg(test)]
mod tests;

pub use batch::{report_failure, BatchRunner, BatchSummary};
pub use due_date::{compute_due_date, format_due_date, reminder_date, DEFAULT_DUE_DAYS};
pub use error::{CandidateFailure, ConfigurationError, DataError, HomeworkError};
pub use fields::FieldShapeError;
pub use locks::{CandidateGuard, CandidateLocks};
pub use mail::{
    compose as compose_mail, salutation, signature, signature_from_names, DEFAULT_SIGNATURE,
};
pub use ports::{ClientError, ClientResult, Service, SourceForge, TrackingSystem};
pub use processor::{HomeworkProcessor, ProcessOutcome, SentHomework, SkipReason};
pub use provisioner::{
    fork_name, ProvisionedHomework, RandomSuffix, RepositoryProvisioner, SuffixSource,
};
pub use router::{homework_router, HomeworkApi};
pub use settings::{FieldMode, HomeworkSettings};
pub use stages::find_stage;
pub use submission::{
    EventAttributes, EventProject, IssueEvent, SubmissionListener, SubmissionOutcome,
};
