// ABOUTME: Deployment draft record with its five ordered step payloads.
// ABOUTME: Steps are editable while the deployment is a draft; afterwards only status changes.

use chrono::{DateTime, Utc};
use nonempty::NonEmpty;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{DeploymentId, DeploymentStatus, HostId, InvalidTransition, SwarmName};

/// Step 1: which host the swarm lands on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostSelection {
    pub host_id: HostId,
}

/// Step 2: the repository the swarm works on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryStep {
    pub repository: String,
    #[serde(default)]
    pub branch: Option<String>,
}

/// Named schedule presets offered by the deployment wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulePreset {
    Continuous,
    BusinessHours,
    Nightly,
}

impl SchedulePreset {
    pub fn cron_expression(&self) -> &'static str {
        match self {
            SchedulePreset::Continuous => "* * * * *",
            SchedulePreset::BusinessHours => "0 9-17 * * 1-5",
            SchedulePreset::Nightly => "0 2 * * *",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SchedulePreset::Continuous => "continuous",
            SchedulePreset::BusinessHours => "business_hours",
            SchedulePreset::Nightly => "nightly",
        }
    }
}

/// Step 3: when the swarm's agents run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleStep {
    #[serde(default)]
    pub preset: Option<SchedulePreset>,
    #[serde(default)]
    pub cron: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSpec {
    pub name: String,
    pub role: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// Step 4: the agents the swarm runs. At least one is required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRoster {
    pub agents: NonEmpty<AgentSpec>,
}

impl AgentRoster {
    pub fn enabled(&self) -> impl Iterator<Item = &AgentSpec> {
        self.agents.iter().filter(|a| a.enabled)
    }
}

/// Step 5: customer and billing details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerStep {
    pub customer_name: String,
    pub email: String,
    #[serde(default)]
    pub plan: Option<String>,
    /// API key the swarm's local API requires from callers.
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deployment {
    pub id: DeploymentId,
    pub name: SwarmName,
    #[serde(default)]
    pub status: DeploymentStatus,
    #[serde(default)]
    pub host_selection: Option<HostSelection>,
    #[serde(default)]
    pub repository: Option<RepositoryStep>,
    #[serde(default)]
    pub schedule: Option<ScheduleStep>,
    #[serde(default)]
    pub agents: Option<AgentRoster>,
    #[serde(default)]
    pub customer: Option<CustomerStep>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

/// A step payload, as edited through the deployment wizard.
#[derive(Debug, Clone, PartialEq)]
pub enum DeploymentStep {
    HostSelection(HostSelection),
    Repository(RepositoryStep),
    Schedule(ScheduleStep),
    Agents(AgentRoster),
    Customer(CustomerStep),
}

#[derive(Debug, Error)]
pub enum DeploymentEditError {
    #[error("deployment steps can only be edited while in draft (current status: {0})")]
    NotDraft(DeploymentStatus),

    #[error(transparent)]
    Transition(#[from] InvalidTransition),
}

/// Borrowed view of a deployment whose five steps are all present.
#[derive(Debug, Clone, Copy)]
pub struct CompleteSteps<'a> {
    pub host_selection: &'a HostSelection,
    pub repository: &'a RepositoryStep,
    pub schedule: &'a ScheduleStep,
    pub agents: &'a AgentRoster,
    pub customer: &'a CustomerStep,
}

impl Deployment {
    pub fn draft(id: DeploymentId, name: SwarmName) -> Self {
        let now = Utc::now();
        Self {
            id,
            name,
            status: DeploymentStatus::Draft,
            host_selection: None,
            repository: None,
            schedule: None,
            agents: None,
            customer: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace one step payload. Only allowed on drafts.
    pub fn set_step(&mut self, step: DeploymentStep) -> Result<(), DeploymentEditError> {
        if self.status != DeploymentStatus::Draft {
            return Err(DeploymentEditError::NotDraft(self.status));
        }
        match step {
            DeploymentStep::HostSelection(s) => self.host_selection = Some(s),
            DeploymentStep::Repository(s) => self.repository = Some(s),
            DeploymentStep::Schedule(s) => self.schedule = Some(s),
            DeploymentStep::Agents(s) => self.agents = Some(s),
            DeploymentStep::Customer(s) => self.customer = Some(s),
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Apply a checked status transition.
    pub fn transition(&mut self, to: DeploymentStatus) -> Result<(), InvalidTransition> {
        self.status = self.status.transition(to)?;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Returns the first missing step number (1-based) or all five steps.
    pub fn complete_steps(&self) -> Result<CompleteSteps<'_>, u8> {
        Ok(CompleteSteps {
            host_selection: self.host_selection.as_ref().ok_or(1)?,
            repository: self.repository.as_ref().ok_or(2)?,
            schedule: self.schedule.as_ref().ok_or(3)?,
            agents: self.agents.as_ref().ok_or(4)?,
            customer: self.customer.as_ref().ok_or(5)?,
        })
    }
}
