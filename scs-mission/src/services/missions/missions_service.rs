use async_trait::async_trait;
use scs_core::{
    CallerContext, CandidateFile, CompleteStepRequest, IncidentGuidance, IncidentMedia,
    MissionError, MissionResult, MissionService, UserId,
};

use super::missions_workflow::MissionWorkflow;
use crate::media::MediaValidator;

/// The service handed to transports: resolves the caller, runs uploads
/// through the media validator, then delegates to the workflow.
pub struct MissionsService {
    validator: MediaValidator,
    workflow: MissionWorkflow,
}

impl MissionsService {
    pub fn new(validator: MediaValidator, workflow: MissionWorkflow) -> Self {
        Self {
            validator,
            workflow,
        }
    }
}

#[async_trait]
impl MissionService for MissionsService {
    async fn get_assignments(&self, ctx: &CallerContext) -> MissionResult<Vec<IncidentGuidance>> {
        let caller = ctx
            .caller
            .as_ref()
            .ok_or_else(|| MissionError::not_authenticated("user not authenticated").into_anyhow())?;
        self.workflow
            .get_assignments(ctx, &UserId::new(caller.as_str()))
            .await
    }

    async fn complete_step(&self, ctx: &CallerContext, req: CompleteStepRequest) -> MissionResult<()> {
        self.workflow
            .complete_step(ctx, req.mission_id.trim(), req.step_id.trim())
            .await
    }

    async fn update_incident_info(
        &self,
        ctx: &CallerContext,
        incident_id: &str,
        files: Vec<CandidateFile>,
    ) -> MissionResult<Vec<IncidentMedia>> {
        // Every file is checked before the first upload starts.
        let files = self.validator.validate_all(files)?;
        self.workflow
            .update_incident_info(ctx, incident_id.trim(), files)
            .await
    }
}
