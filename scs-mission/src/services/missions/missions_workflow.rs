use std::sync::Arc;

use chrono::Utc;
use scs_blob::{stream_from_bytes, BlobStore, ObjectKeyStrategy, PublicUrl, PutObject};
use scs_core::{
    CallerContext, IncidentGuidance, IncidentId, IncidentMedia, MediaId, MediaKind, MissionError,
    MissionResult, MissionStore, StepId, UserId, ValidatedFile,
};
use serde_json::json;

use super::missions_shared::{
    store_error, with_uploaded, OP_COMPLETE_STEP, OP_CREATE_MEDIA, OP_GET_INCIDENT, OP_GET_STEP,
    OP_LIST_ASSIGNMENTS, OP_UPLOAD_MEDIA,
};

/// Step completion and incident media attachment over the relational and
/// blob stores.
///
/// Every collaborator call runs under [`CallerContext::guard`]: once the
/// request is cancelled or past its deadline, no further store call starts.
pub struct MissionWorkflow {
    store: Arc<dyn MissionStore>,
    blobs: Arc<dyn BlobStore>,
    keys: Arc<dyn ObjectKeyStrategy>,
    urls: PublicUrl,
}

impl MissionWorkflow {
    pub fn new(
        store: Arc<dyn MissionStore>,
        blobs: Arc<dyn BlobStore>,
        keys: Arc<dyn ObjectKeyStrategy>,
        urls: PublicUrl,
    ) -> Self {
        Self {
            store,
            blobs,
            keys,
            urls,
        }
    }

    pub async fn get_assignments(
        &self,
        ctx: &CallerContext,
        assignee: &UserId,
    ) -> MissionResult<Vec<IncidentGuidance>> {
        ctx.guard(OP_LIST_ASSIGNMENTS, async {
            self.store
                .get_guidance_by_assignee(assignee)
                .await
                .map_err(|e| store_error(OP_LIST_ASSIGNMENTS, e))
        })
        .await
    }

    /// Latch one step of `mission_id` to completed.
    pub async fn complete_step(
        &self,
        ctx: &CallerContext,
        mission_id: &str,
        step_id: &str,
    ) -> MissionResult<()> {
        let step_id = StepId::new(step_id);
        let step = ctx
            .guard(OP_GET_STEP, async {
                self.store
                    .get_step_by_id(&step_id)
                    .await
                    .map_err(|e| store_error(OP_GET_STEP, e))
            })
            .await?;

        if !step.incident_guidance_id.matches(mission_id) {
            return Err(MissionError::validation("step does not belong to the mission")
                .with_operation(OP_COMPLETE_STEP)
                .with_details(json!({"mission_id": mission_id, "step_id": step.id}))
                .into_anyhow());
        }
        if step.is_completed {
            return Err(already_completed(&step.id));
        }

        // A concurrent request may have latched the step since it was read.
        ctx.guard(OP_COMPLETE_STEP, async {
            match self.store.update_step_completed(&step.id, Utc::now()).await {
                Ok(()) => Ok(()),
                Err(e) if e.is_already_completed() => Err(already_completed(&step.id)),
                Err(e) => Err(store_error(OP_COMPLETE_STEP, e)),
            }
        })
        .await?;

        tracing::info!(
            request_id = %ctx.request_id,
            mission_id = %step.incident_guidance_id,
            step_id = %step.id,
            "step completed"
        );
        Ok(())
    }

    /// Upload already validated files under the incident's key prefix, then
    /// record them in one batch insert.
    ///
    /// Files are uploaded one after another. A failing upload aborts the
    /// call; objects written before it stay in the blob store and are listed
    /// under `uploaded` in the error details.
    pub async fn update_incident_info(
        &self,
        ctx: &CallerContext,
        incident_id: &str,
        files: Vec<ValidatedFile>,
    ) -> MissionResult<Vec<IncidentMedia>> {
        let incident_id = IncidentId::new(incident_id);
        let incident = ctx
            .guard(OP_GET_INCIDENT, async {
                match self.store.get_incident_by_id(&incident_id).await {
                    Ok(incident) => Ok(incident),
                    Err(e) if e.is_not_found() => Err(MissionError::validation("incident not found")
                        .with_operation(OP_GET_INCIDENT)
                        .with_details(json!({"incident_id": incident_id}))
                        .into_anyhow()),
                    Err(e) => Err(store_error(OP_GET_INCIDENT, e)),
                }
            })
            .await?;

        let mut uploaded: Vec<String> = Vec::with_capacity(files.len());
        let mut media = Vec::with_capacity(files.len());

        for file in files {
            let key = self.keys.object_key(incident.id.as_str(), &file.name);
            let put = PutObject::new(key, file.mime_type.clone(), file.size);
            let body = stream_from_bytes(file.content.clone());

            let stored = ctx
                .guard(OP_UPLOAD_MEDIA, async move {
                    self.blobs
                        .put_object(put, body)
                        .await
                        .map_err(|e| MissionError::storage(OP_UPLOAD_MEDIA, e).into_anyhow())
                })
                .await
                .map_err(|e| with_uploaded(e, &uploaded))?;

            tracing::debug!(
                request_id = %ctx.request_id,
                incident_id = %incident.id,
                key = %stored.key,
                size = stored.size_bytes,
                "media uploaded"
            );
            uploaded.push(stored.key.clone());

            media.push(IncidentMedia {
                id: MediaId::generate(),
                incident_id: incident.id.clone(),
                media_type: MediaKind::classify(&file.mime_type),
                file_url: self.urls.url_for(&stored.key),
                file_size: stored.size_bytes as i64,
                file_type: file.mime_type,
                file_name: stored.key,
                created_at: Utc::now(),
            });
        }

        if media.is_empty() {
            return Ok(media);
        }

        ctx.guard(OP_CREATE_MEDIA, async {
            self.store
                .batch_insert_media(&media)
                .await
                .map_err(|e| store_error(OP_CREATE_MEDIA, e))
        })
        .await
        .map_err(|e| with_uploaded(e, &uploaded))?;

        tracing::info!(
            request_id = %ctx.request_id,
            incident_id = %incident.id,
            count = media.len(),
            "incident media recorded"
        );
        Ok(media)
    }
}

fn already_completed(step_id: &StepId) -> anyhow::Error {
    MissionError::validation("step already completed")
        .with_operation(OP_COMPLETE_STEP)
        .with_details(json!({"step_id": step_id}))
        .into_anyhow()
}
