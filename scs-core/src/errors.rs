//! # Errors
//!
//! The mission service carries one structured error type, [`MissionError`],
//! through `anyhow::Error`. Core goals:
//! - every failure has a stable kind (validation, not found, storage, ...)
//! - the kind survives `anyhow` context wrapping end-to-end
//! - transport-agnostic (the HTTP crate decides how to serialize)

use std::fmt;

use anyhow::Error as AnyError;
use serde_json::Value;

/// A convenience result type for mission service APIs.
pub type MissionResult<T> = std::result::Result<T, AnyError>;

/// Error classes and their transport status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,       // 400
    NotAuthenticated, // 401
    NotFound,         // 404
    Cancelled,        // 499
    Storage,          // 500
    Internal,         // 500
}

impl ErrorKind {
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::Validation => 400,
            ErrorKind::NotAuthenticated => 401,
            ErrorKind::NotFound => 404,
            ErrorKind::Cancelled => 499,
            ErrorKind::Storage => 500,
            ErrorKind::Internal => 500,
        }
    }

    /// Type tag used in client payloads (e.g. "VALIDATION_ERROR").
    pub fn type_tag(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "VALIDATION_ERROR",
            ErrorKind::NotAuthenticated => "NOT_AUTHENTICATED",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Cancelled => "CANCELLED",
            ErrorKind::Storage => "STORAGE_ERROR",
            ErrorKind::Internal => "INTERNAL_ERROR",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "ValidationError",
            ErrorKind::NotAuthenticated => "NotAuthenticated",
            ErrorKind::NotFound => "NotFoundError",
            ErrorKind::Cancelled => "Cancelled",
            ErrorKind::Storage => "StorageError",
            ErrorKind::Internal => "InternalError",
        }
    }
}

/// A structured mission error that can live inside `anyhow::Error`.
///
/// - kind (status code + type tag)
/// - message
/// - operation (the workflow step that failed, e.g. "get step")
/// - details (optional, client-visible)
/// - source (optional, never sent to clients)
#[derive(Debug)]
pub struct MissionError {
    pub kind: ErrorKind,
    pub message: String,
    pub operation: Option<&'static str>,
    pub details: Option<Value>,
    pub source: Option<AnyError>,
}

impl MissionError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            operation: None,
            details: None,
            source: None,
        }
    }

    pub fn with_operation(mut self, operation: &'static str) -> Self {
        self.operation = Some(operation);
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_source(mut self, source: impl Into<AnyError>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn code(&self) -> u16 {
        self.kind.status_code()
    }

    /// Convert into `anyhow::Error` so it flows through `?`.
    pub fn into_anyhow(self) -> AnyError {
        AnyError::new(self)
    }

    /// Find a `MissionError` anywhere in an `anyhow` chain, including
    /// behind `.context(...)` layers.
    pub fn find(err: &AnyError) -> Option<&MissionError> {
        err.chain().find_map(|e| e.downcast_ref::<MissionError>())
    }

    /// Kind of an arbitrary error; anything unstructured is `Internal`.
    pub fn kind_of(err: &AnyError) -> ErrorKind {
        Self::find(err).map(|e| e.kind).unwrap_or(ErrorKind::Internal)
    }

    /// Turn any error into a `MissionError`:
    /// - if it already is one, keep it (lossless)
    /// - otherwise wrap as `Internal`; the original text stays in `source`
    pub fn normalize(err: AnyError) -> MissionError {
        match err.downcast::<MissionError>() {
            Ok(mission) => mission,
            Err(other) => match Self::find(&other) {
                Some(found) => found.sanitize_for_client(),
                None => MissionError::internal("internal server error").with_source(other),
            },
        }
    }

    /// Copy suitable for clients: the source chain is dropped.
    pub fn sanitize_for_client(&self) -> MissionError {
        MissionError {
            kind: self.kind,
            message: self.message.clone(),
            operation: self.operation,
            details: self.details.clone(),
            source: None,
        }
    }

    /// Client payload body: `{"type", "message", "details"?}`.
    pub fn to_json(&self) -> Value {
        let mut body = serde_json::json!({
            "type": self.kind.type_tag(),
            "message": self.message,
        });
        if let Some(details) = &self.details {
            body["details"] = details.clone();
        }
        body
    }

    // ---- Constructors ----

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, msg)
    }
    pub fn not_authenticated(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotAuthenticated, msg)
    }
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, msg)
    }
    pub fn cancelled(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Cancelled, msg)
    }
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, msg)
    }

    /// Storage failure tagged with the operation that issued the call. The
    /// backend error is kept as `source` only; the message names the
    /// operation.
    pub fn storage<E>(operation: &'static str, source: E) -> Self
    where
        E: Into<AnyError>,
    {
        Self::new(ErrorKind::Storage, format!("{operation} failed"))
            .with_operation(operation)
            .with_source(source)
    }
}

impl fmt::Display for MissionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.operation {
            Some(op) if !self.message.starts_with(op) => {
                write!(f, "{} ({}): {}: {}", self.kind.name(), self.code(), op, self.message)
            }
            _ => write!(f, "{} ({}): {}", self.kind.name(), self.code(), self.message),
        }
    }
}

impl std::error::Error for MissionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}
