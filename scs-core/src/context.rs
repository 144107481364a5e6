//! Per-request context carried into every workflow and store call.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::errors::{MissionError, MissionResult};

/// Identity of the authenticated caller, supplied by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallerId(pub String);

impl CallerId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CallerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Context for one inbound request: who is calling, how to correlate logs,
/// and when to give up.
#[derive(Debug, Clone)]
pub struct CallerContext {
    pub caller: Option<CallerId>,
    pub request_id: String,
    pub cancel: CancellationToken,
    pub deadline: Option<Instant>,
}

impl Default for CallerContext {
    fn default() -> Self {
        Self::new()
    }
}

impl CallerContext {
    pub fn new() -> Self {
        Self {
            caller: None,
            request_id: Uuid::new_v4().to_string(),
            cancel: CancellationToken::new(),
            deadline: None,
        }
    }

    pub fn with_caller<S: Into<String>>(mut self, caller: S) -> Self {
        self.caller = Some(CallerId(caller.into()));
        self
    }

    pub fn with_request_id<S: Into<String>>(mut self, request_id: S) -> Self {
        self.request_id = request_id.into();
        self
    }

    /// Derive cancellation from a parent token (e.g. server shutdown).
    pub fn with_parent_token(mut self, parent: &CancellationToken) -> Self {
        self.cancel = parent.child_token();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
            || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Fail fast with `Cancelled` if the request is already over.
    pub fn check(&self, operation: &'static str) -> MissionResult<()> {
        if self.is_cancelled() {
            return Err(cancelled(operation));
        }
        Ok(())
    }

    /// Run `fut` unless the request is cancelled or its deadline passes
    /// first; either of those yields a `Cancelled` error for `operation`.
    pub async fn guard<F, T>(&self, operation: &'static str, fut: F) -> MissionResult<T>
    where
        F: Future<Output = MissionResult<T>>,
    {
        self.check(operation)?;

        let deadline = async {
            match self.deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(cancelled(operation)),
            _ = deadline => Err(cancelled(operation)),
            out = fut => out,
        }
    }
}

fn cancelled(operation: &'static str) -> anyhow::Error {
    MissionError::cancelled(format!("{operation}: request cancelled"))
        .with_operation(operation)
        .into_anyhow()
}
