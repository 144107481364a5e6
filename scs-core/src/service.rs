use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::context::CallerContext;
use crate::errors::MissionResult;
use crate::models::{CandidateFile, IncidentGuidance, IncidentMedia};

/// Request to flip one guidance step to completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompleteStepRequest {
    pub mission_id: String,
    pub step_id: String,
}

/// Operations the mission service exposes to transports (HTTP, CLI, jobs).
///
/// Transports bind their requests to these calls and translate the
/// `MissionError` kind of a failure into their own status codes.
#[async_trait]
pub trait MissionService: Send + Sync {
    /// Guidance assignments of the caller in `ctx`, steps included.
    async fn get_assignments(&self, ctx: &CallerContext) -> MissionResult<Vec<IncidentGuidance>>;

    /// Latch one step of a mission to completed.
    async fn complete_step(&self, ctx: &CallerContext, req: CompleteStepRequest) -> MissionResult<()>;

    /// Validate and attach media files to an incident.
    async fn update_incident_info(
        &self,
        ctx: &CallerContext,
        incident_id: &str,
        files: Vec<CandidateFile>,
    ) -> MissionResult<Vec<IncidentMedia>>;
}
