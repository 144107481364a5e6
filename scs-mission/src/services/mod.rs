use std::sync::Arc;

use scs_blob::{BlobStore, IncidentKeyStrategy, PublicUrl};
use scs_core::{MissionService, MissionStore};

use crate::media::MediaValidator;

pub mod adapters;
pub mod missions;

pub struct MissionServices {
    pub missions: Arc<dyn MissionService>,
}

/// Wire the mission service over the given stores.
pub fn configure(
    store: Arc<dyn MissionStore>,
    blobs: Arc<dyn BlobStore>,
    urls: PublicUrl,
    validator: MediaValidator,
) -> MissionServices {
    let workflow =
        missions::MissionWorkflow::new(store, blobs, Arc::new(IncidentKeyStrategy), urls);
    let missions: Arc<dyn MissionService> =
        Arc::new(missions::MissionsService::new(validator, workflow));

    MissionServices { missions }
}
