pub mod missions_service;
pub mod missions_shared;
pub mod missions_workflow;

pub use missions_service::MissionsService;
pub use missions_workflow::MissionWorkflow;
