//! scs-axum: HTTP surface of the SCS mission service.
//!
//! Binds the [`scs_core::MissionService`] operations to axum routes under
//! `/api/v1`, reads multipart uploads, and turns `MissionError`s into
//! JSON error bodies.

pub mod app;
pub mod multipart;
pub mod params;
pub mod rest;
pub mod state;
mod error;

pub use app::{AxumApp, API_PREFIX};
pub use error::ApiError;
pub use multipart::{MultipartConfig, UploadForm};
pub use state::{ApiOptions, ApiState};

pub use axum;
