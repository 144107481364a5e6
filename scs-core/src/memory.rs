//! In-memory [`MissionStore`] for tests and local development.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::models::{
    Incident, IncidentGuidance, IncidentGuidanceStep, IncidentId, IncidentMedia, StepId, UserId,
};
use crate::store::{MissionStore, StoreError, StoreResult};

#[derive(Default)]
struct Tables {
    incidents: Vec<Incident>,
    // Steps live inside their guidance; the parent owns its children.
    guidances: Vec<IncidentGuidance>,
    media: Vec<IncidentMedia>,
}

/// Insertion-ordered store guarded by one lock, so every call sees a
/// consistent snapshot.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_incident(&self, incident: Incident) -> StoreResult<()> {
        let mut t = self.tables.write().await;
        if t.incidents.iter().any(|i| i.id == incident.id) {
            return Err(StoreError::conflict(format!("incident {} already exists", incident.id)));
        }
        t.incidents.push(incident);
        Ok(())
    }

    /// Insert a guidance with its steps. At most one guidance may exist per
    /// (incident, template) pair.
    pub async fn insert_guidance(&self, guidance: IncidentGuidance) -> StoreResult<()> {
        let mut t = self.tables.write().await;
        if t.guidances.iter().any(|g| {
            g.incident_id == guidance.incident_id
                && g.guidance_template_id == guidance.guidance_template_id
        }) {
            return Err(StoreError::conflict(format!(
                "guidance for incident {} and template {} already exists",
                guidance.incident_id, guidance.guidance_template_id
            )));
        }
        if guidance
            .incident_guidance_steps
            .iter()
            .any(|s| s.incident_guidance_id != guidance.id)
        {
            return Err(StoreError::conflict(format!(
                "steps of guidance {} must reference it as their parent",
                guidance.id
            )));
        }
        t.guidances.push(guidance);
        Ok(())
    }

    /// Snapshot of all media rows, in insertion order.
    pub async fn media(&self) -> Vec<IncidentMedia> {
        self.tables.read().await.media.clone()
    }

    pub async fn media_for(&self, incident: &IncidentId) -> Vec<IncidentMedia> {
        self.tables
            .read()
            .await
            .media
            .iter()
            .filter(|m| &m.incident_id == incident)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl MissionStore for MemoryStore {
    async fn get_step_by_id(&self, id: &StepId) -> StoreResult<IncidentGuidanceStep> {
        let t = self.tables.read().await;
        t.guidances
            .iter()
            .flat_map(|g| g.incident_guidance_steps.iter())
            .find(|s| s.id.matches(id.as_str()))
            .cloned()
            .ok_or_else(|| StoreError::not_found("incident guidance step", id.as_str()))
    }

    async fn update_step_completed(&self, id: &StepId, completed_at: DateTime<Utc>) -> StoreResult<()> {
        // Check and write under the same write lock.
        let mut t = self.tables.write().await;
        let step = t
            .guidances
            .iter_mut()
            .flat_map(|g| g.incident_guidance_steps.iter_mut())
            .find(|s| s.id.matches(id.as_str()))
            .ok_or_else(|| StoreError::not_found("incident guidance step", id.as_str()))?;

        if step.is_completed {
            return Err(StoreError::AlreadyCompleted {
                id: step.id.to_string(),
            });
        }
        step.is_completed = true;
        step.completed_at = Some(completed_at);
        step.updated_at = Utc::now();
        Ok(())
    }

    async fn get_incident_by_id(&self, id: &IncidentId) -> StoreResult<Incident> {
        let t = self.tables.read().await;
        t.incidents
            .iter()
            .find(|i| i.id.matches(id.as_str()))
            .cloned()
            .ok_or_else(|| StoreError::not_found("incident", id.as_str()))
    }

    async fn batch_insert_media(&self, media: &[IncidentMedia]) -> StoreResult<()> {
        let mut t = self.tables.write().await;
        // All-or-nothing: check every row before appending any.
        if let Some(orphan) = media
            .iter()
            .find(|m| !t.incidents.iter().any(|i| i.id == m.incident_id))
        {
            return Err(StoreError::conflict(format!(
                "incident media references unknown incident {}",
                orphan.incident_id
            )));
        }
        t.media.extend_from_slice(media);
        Ok(())
    }

    async fn get_guidance_by_assignee(&self, assignee: &UserId) -> StoreResult<Vec<IncidentGuidance>> {
        let t = self.tables.read().await;
        Ok(t.guidances
            .iter()
            .filter(|g| g.assignee_id.as_ref().is_some_and(|a| a.matches(assignee.as_str())))
            .map(|g| {
                let mut g = g.clone();
                g.incident_guidance_steps.sort_by_key(|s| s.step_number);
                g
            })
            .collect())
    }
}
