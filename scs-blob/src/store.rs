use async_trait::async_trait;

use crate::{BlobResult, ByteStream, PutObject, PutResult};

/// Core object storage operations - must be implemented by all storage backends
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store an object from a stream. Writing the same key again replaces
    /// the object (last writer wins).
    async fn put_object(&self, put: PutObject, stream: ByteStream) -> BlobResult<PutResult>;

    /// Bucket objects are written to.
    fn bucket(&self) -> &str;
}

/// Strategy for naming stored objects
pub trait ObjectKeyStrategy: Send + Sync {
    /// Key for a file attached to `owner_id` (e.g. an incident).
    fn object_key(&self, owner_id: &str, file_name: &str) -> String;
}

/// `<incident_id>/<file_name>`: files of different incidents never collide
/// and every incident owns a natural key prefix.
#[derive(Debug, Clone, Default)]
pub struct IncidentKeyStrategy;

impl ObjectKeyStrategy for IncidentKeyStrategy {
    fn object_key(&self, owner_id: &str, file_name: &str) -> String {
        let owner = owner_id.trim().trim_matches('/');
        format!("{owner}/{}", file_base_name(file_name))
    }
}

/// Final path segment of a client-supplied file name, trimmed. Empty when
/// the name ends in a separator.
pub fn file_base_name(name: &str) -> &str {
    name.rsplit(['/', '\\']).next().unwrap_or(name).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_namespaced_by_incident() {
        let keys = IncidentKeyStrategy;
        assert_eq!(keys.object_key("I1", "photo.png"), "I1/photo.png");
        assert_ne!(
            keys.object_key("I1", "photo.png"),
            keys.object_key("I2", "photo.png")
        );
    }

    #[test]
    fn client_paths_cannot_escape_the_prefix() {
        let keys = IncidentKeyStrategy;
        assert_eq!(keys.object_key("I1", "../../etc/passwd"), "I1/passwd");
        assert_eq!(keys.object_key("I1", "C:\\photos\\cam.jpg"), "I1/cam.jpg");
    }

    #[test]
    fn trailing_separators_leave_no_base_name() {
        assert_eq!(file_base_name("a/"), "");
        assert_eq!(file_base_name(" \\ "), "");
        assert_eq!(file_base_name("dir/ cam.jpg "), "cam.jpg");
    }
}
