// ABOUTME: In-process registry of deployment progress and in-flight deployment runs.
// ABOUTME: The in-flight guard releases its claim on drop, even when a run fails.

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::model::DeploymentProgress;
use crate::types::DeploymentId;

/// Latest progress per deployment. A new run replaces the previous record.
#[derive(Default)]
pub struct ProgressTracker {
    runs: Mutex<HashMap<DeploymentId, DeploymentProgress>>,
}

impl ProgressTracker {
    pub fn begin(&self, id: &DeploymentId) {
        self.runs
            .lock()
            .insert(id.clone(), DeploymentProgress::start(id.clone()));
    }

    pub fn advance(&self, id: &DeploymentId, percent: u8, step: &str, message: impl Into<String>) {
        let message = message.into();
        tracing::info!(deployment_id = %id, percent, step, "{}", message);
        if let Some(progress) = self.runs.lock().get_mut(id) {
            progress.advance(percent, step, message);
        }
    }

    pub fn fail(&self, id: &DeploymentId, error: &str) {
        if let Some(progress) = self.runs.lock().get_mut(id) {
            progress.fail(error);
        }
    }

    pub fn complete(&self, id: &DeploymentId) {
        if let Some(progress) = self.runs.lock().get_mut(id) {
            progress.complete();
        }
    }

    pub fn get(&self, id: &DeploymentId) -> Option<DeploymentProgress> {
        self.runs.lock().get(id).cloned()
    }
}

/// Set of deployments with a run in progress.
#[derive(Default, Clone)]
pub struct InFlight {
    ids: Arc<Mutex<HashSet<DeploymentId>>>,
}

impl InFlight {
    /// Claim `id`, or `None` if another run holds it.
    pub fn claim(&self, id: &DeploymentId) -> Option<InFlightGuard> {
        if !self.ids.lock().insert(id.clone()) {
            return None;
        }
        Some(InFlightGuard {
            ids: self.ids.clone(),
            id: id.clone(),
        })
    }

    pub fn contains(&self, id: &DeploymentId) -> bool {
        self.ids.lock().contains(id)
    }
}

pub struct InFlightGuard {
    ids: Arc<Mutex<HashSet<DeploymentId>>>,
    id: DeploymentId,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.ids.lock().remove(&self.id);
    }
}
