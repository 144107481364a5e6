use std::time::Duration;

use axum::http::HeaderMap;
use scs_core::CallerContext;
use tokio_util::sync::CancellationToken;

pub const CALLER_HEADER: &str = "x-user-id";
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Request-scoped values pulled from HTTP headers before a service call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestParams {
    pub caller: Option<String>,
    pub request_id: Option<String>,
}

impl RestParams {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            caller: header_value(headers, CALLER_HEADER),
            request_id: header_value(headers, REQUEST_ID_HEADER),
        }
    }

    /// Build the context a service call runs under. Cancellation hangs off
    /// `shutdown`, so stopping the server cancels in-flight work.
    pub fn into_context(
        self,
        shutdown: &CancellationToken,
        timeout: Option<Duration>,
    ) -> CallerContext {
        let mut ctx = CallerContext::new().with_parent_token(shutdown);
        if let Some(caller) = self.caller {
            ctx = ctx.with_caller(caller);
        }
        if let Some(request_id) = self.request_id {
            ctx = ctx.with_request_id(request_id);
        }
        if let Some(timeout) = timeout {
            ctx = ctx.with_timeout(timeout);
        }
        ctx
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
