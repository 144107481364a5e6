//! scs-core: transport-agnostic core of the SCS mission service.
//!
//! Holds the pieces every other crate agrees on: the error taxonomy,
//! configuration, the per-request caller context, the data model and the
//! relational store contract.

pub mod config;
pub mod context;
pub mod errors;
pub mod memory;
pub mod models;
pub mod service;
pub mod store;

pub use config::{ConfigSnapshot, ConfigStore};
pub use context::{CallerContext, CallerId};
pub use errors::{ErrorKind, MissionError, MissionResult};
pub use memory::MemoryStore;
pub use models::{
    AlarmId, CandidateFile, GuidanceId, Incident, IncidentGuidance, IncidentGuidanceStep,
    IncidentId, IncidentMedia, IncidentStatus, MediaId, MediaKind, Severity, StepId, TemplateId,
    User, UserId, ValidatedFile,
};
pub use service::{CompleteStepRequest, MissionService};
pub use store::{MissionStore, StoreError, StoreResult};
