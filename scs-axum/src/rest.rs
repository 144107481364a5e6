use axum::{
    extract::{
        multipart::MultipartRejection, rejection::JsonRejection, Multipart, State,
    },
    http::HeaderMap,
    routing, Json, Router,
};
use scs_core::{CompleteStepRequest, IncidentGuidance, MissionError};
use serde_json::{json, Map, Value};

use crate::{multipart::read_upload_form, params::RestParams, ApiError, ApiState};

fn map_json_rejection(rejection: JsonRejection) -> ApiError {
    MissionError::validation("Failed to parse the request body as JSON")
        .with_details(json!({"_schema": [rejection.body_text()]}))
        .into()
}

fn map_multipart_rejection(rejection: MultipartRejection) -> ApiError {
    MissionError::validation("Expected a multipart/form-data body")
        .with_details(json!({"_form": [rejection.body_text()]}))
        .into()
}

fn check_complete_request(req: &CompleteStepRequest) -> Result<(), ApiError> {
    let mut missing = Map::new();
    for (field, value) in [("mission_id", &req.mission_id), ("step_id", &req.step_id)] {
        if value.trim().is_empty() {
            missing.insert(field.to_string(), json!(["required"]));
        }
    }
    if missing.is_empty() {
        return Ok(());
    }
    Err(MissionError::validation("mission_id and step_id are required")
        .with_details(Value::Object(missing))
        .into())
}

async fn my_assignments(
    state: ApiState,
    params: RestParams,
) -> Result<Json<Vec<IncidentGuidance>>, ApiError> {
    let ctx = state.context(params);
    Ok(Json(state.missions.get_assignments(&ctx).await?))
}

async fn complete_step(
    state: ApiState,
    params: RestParams,
    body: Result<Json<CompleteStepRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(req) = body.map_err(map_json_rejection)?;
    check_complete_request(&req)?;

    let ctx = state.context(params);
    state.missions.complete_step(&ctx, req).await?;
    Ok(Json(json!("success")))
}

async fn update_incident(
    state: ApiState,
    params: RestParams,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Value>, ApiError> {
    let multipart = multipart.map_err(map_multipart_rejection)?;
    let form = read_upload_form(multipart, &state.options.multipart).await?;
    let incident_id = form.require_incident()?.to_string();

    let ctx = state.context(params);
    let media = state
        .missions
        .update_incident_info(&ctx, &incident_id, form.files)
        .await?;
    Ok(Json(json!({"message": "success", "media": media})))
}

/// Routes under `/missions`. Every error body carries the request id.
pub fn mission_router(state: ApiState) -> Router<()> {
    Router::new()
        .route(
            "/me",
            routing::get(
                |State(state): State<ApiState>, headers: HeaderMap| async move {
                    let params = RestParams::from_headers(&headers);
                    let request_id = params.request_id.clone();
                    my_assignments(state, params)
                        .await
                        .map_err(|e| e.with_request_id(request_id))
                },
            ),
        )
        .route(
            "/complete",
            routing::patch(
                |State(state): State<ApiState>,
                 headers: HeaderMap,
                 body: Result<Json<CompleteStepRequest>, JsonRejection>| async move {
                    let params = RestParams::from_headers(&headers);
                    let request_id = params.request_id.clone();
                    complete_step(state, params, body)
                        .await
                        .map_err(|e| e.with_request_id(request_id))
                },
            ),
        )
        .route(
            "/update",
            routing::put(
                |State(state): State<ApiState>,
                 headers: HeaderMap,
                 multipart: Result<Multipart, MultipartRejection>| async move {
                    let params = RestParams::from_headers(&headers);
                    let request_id = params.request_id.clone();
                    update_incident(state, params, multipart)
                        .await
                        .map_err(|e| e.with_request_id(request_id))
                },
            ),
        )
        .with_state(state)
}
