use std::sync::Arc;
use std::time::Duration;

use scs_core::{CallerContext, MissionService};
use tokio_util::sync::CancellationToken;

use crate::multipart::MultipartConfig;
use crate::params::RestParams;

/// Tunables of the HTTP surface.
#[derive(Debug, Clone)]
pub struct ApiOptions {
    /// Deadline applied to every service call, `None` for no deadline.
    pub request_timeout: Option<Duration>,
    pub multipart: MultipartConfig,
}

impl Default for ApiOptions {
    fn default() -> Self {
        Self {
            request_timeout: Some(Duration::from_secs(30)),
            multipart: MultipartConfig::default(),
        }
    }
}

#[derive(Clone)]
pub struct ApiState {
    pub missions: Arc<dyn MissionService>,
    pub options: Arc<ApiOptions>,
    pub shutdown: CancellationToken,
}

impl ApiState {
    pub fn new(missions: Arc<dyn MissionService>, options: ApiOptions) -> Self {
        Self {
            missions,
            options: Arc::new(options),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn context(&self, params: RestParams) -> CallerContext {
        params.into_context(&self.shutdown, self.options.request_timeout)
    }
}
