use anyhow::Error;
use scs_core::{MissionError, StoreError};
use serde_json::{json, Value};

pub const OP_LIST_ASSIGNMENTS: &str = "list assignments";
pub const OP_GET_STEP: &str = "get step";
pub const OP_COMPLETE_STEP: &str = "complete step";
pub const OP_GET_INCIDENT: &str = "get incident";
pub const OP_UPLOAD_MEDIA: &str = "upload media";
pub const OP_CREATE_MEDIA: &str = "create incident media";

/// Map a relational store failure, keeping "not found" distinct from
/// backend failures.
pub fn store_error(operation: &'static str, err: StoreError) -> Error {
    if err.is_not_found() {
        return MissionError::not_found(err.to_string())
            .with_operation(operation)
            .into_anyhow();
    }
    MissionError::storage(operation, err).into_anyhow()
}

/// Attach the keys already written to the blob store to a failed upload
/// request, so the caller can see which files made it.
pub fn with_uploaded(err: Error, uploaded: &[String]) -> Error {
    if uploaded.is_empty() {
        return err;
    }
    let mut mission = MissionError::normalize(err);
    let mut details = match mission.details.take() {
        Some(Value::Object(map)) => map,
        Some(other) => {
            let mut map = serde_json::Map::new();
            map.insert("cause".to_string(), other);
            map
        }
        None => serde_json::Map::new(),
    };
    details.insert("uploaded".to_string(), json!(uploaded));
    mission.with_details(Value::Object(details)).into_anyhow()
}
