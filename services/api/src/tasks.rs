use crate::cli::ProcessArgs;
use crate::infra::HomeworkServices;
use homework_bot::config::AppConfig;
use homework_bot::error::AppError;
use homework_bot::telemetry;
use homework_bot::workflows::homework::domain::CandidateId;
use homework_bot::workflows::homework::{ProcessOutcome, SkipReason};
use serde_json::json;

/// One batch pass from the command line.
pub(crate) async fn run_once() -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;
    let services = HomeworkServices::build(&config)?;

    let summary = services.runner.run().await?;
    print_json(&json!(summary));
    Ok(())
}

pub(crate) async fn run_single(args: ProcessArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;
    let services = HomeworkServices::build(&config)?;

    let outcome = services
        .runner
        .run_candidate(CandidateId(args.candidate_id))
        .await
        .map_err(|failure| AppError::from(failure.error))?;

    let report = match outcome {
        ProcessOutcome::Sent(sent) => json!({ "outcome": "sent", "homework": sent }),
        ProcessOutcome::Skipped(SkipReason::Incomplete(gap)) => {
            json!({ "outcome": "skipped", "reason": gap.to_string() })
        }
        ProcessOutcome::Skipped(reason) => {
            json!({ "outcome": "skipped", "reason": format!("{reason:?}") })
        }
    };
    print_json(&report);
    Ok(())
}

fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(rendered) => println!("{rendered}"),
        Err(_) => println!("{value}"),
    }
}
