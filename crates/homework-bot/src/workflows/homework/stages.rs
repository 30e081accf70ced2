use tracing::debug;

use super::domain::{Placement, Stage};
use super::error::{ConfigurationError, HomeworkError};
use super::ports::TrackingSystem;

/// First stage whose name contains `wanted`, ignoring case and whitespace.
pub fn find_stage<'a>(stages: &'a [Stage], wanted: &str) -> Option<&'a Stage> {
    let wanted = normalize(wanted);
    stages
        .iter()
        .find(|stage| normalize(&stage.name).contains(&wanted))
}

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Looks up the stage named like `wanted` in the placement's offer pipeline.
pub async fn resolve_stage<T>(
    tracking: &T,
    placement: &Placement,
    wanted: &str,
) -> Result<Stage, HomeworkError>
where
    T: TrackingSystem + ?Sized,
{
    let stages = tracking.stages(placement.offer_id).await?;
    let stage = find_stage(&stages, wanted)
        .cloned()
        .ok_or_else(|| ConfigurationError::UnknownStage(wanted.to_string()))?;
    debug!(offer_id = placement.offer_id.0, stage = %stage.name, "resolved pipeline stage");
    Ok(stage)
}
