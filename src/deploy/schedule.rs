// ABOUTME: Resolves a deployment's schedule step into a cron expression.
// ABOUTME: Named presets win; otherwise an explicit five-field cron string is parsed and required.

use std::str::FromStr;

use cron::Schedule;

use crate::model::{SchedulePreset, ScheduleStep};

use super::DeployError;

const DEFAULT_TIMEZONE: &str = "UTC";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSchedule {
    pub preset: Option<SchedulePreset>,
    pub cron: String,
    pub timezone: String,
}

pub fn resolve(step: &ScheduleStep) -> Result<ResolvedSchedule, DeployError> {
    let timezone = step
        .timezone
        .as_deref()
        .map(str::trim)
        .filter(|tz| !tz.is_empty())
        .unwrap_or(DEFAULT_TIMEZONE)
        .to_string();

    if let Some(preset) = step.preset {
        return Ok(ResolvedSchedule {
            preset: Some(preset),
            cron: preset.cron_expression().to_string(),
            timezone,
        });
    }

    let cron = step
        .cron
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| DeployError::InvalidSchedule("no preset or cron expression".into()))?;
    validate_cron(cron)?;

    Ok(ResolvedSchedule {
        preset: None,
        cron: cron.split_whitespace().collect::<Vec<_>>().join(" "),
        timezone,
    })
}

/// Parse with the `cron` crate, which wants a leading seconds field.
/// Numeric day-of-week follows that crate: 1-7 from Sunday, or names.
fn validate_cron(cron: &str) -> Result<(), DeployError> {
    let fields = cron.split_whitespace().count();
    if fields != 5 {
        return Err(DeployError::InvalidSchedule(format!(
            "expected 5 cron fields, got {fields}"
        )));
    }
    Schedule::from_str(&format!("0 {cron}"))
        .map(|_| ())
        .map_err(|e| DeployError::InvalidSchedule(format!("invalid cron \"{cron}\": {e}")))
}
