//! Content-layer collaborators used by tasks
//!
//! Storage and online services live outside this crate; tasks only see them
//! through these traits.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::TaskResult;

/// Identifier of an object in the content directory
pub type ObjectId = i32;

/// Placeholder id that never refers to a real object
pub const INVALID_OBJECT_ID: ObjectId = -333;

/// Id of the content directory root container
pub const ROOT_CONTAINER_ID: ObjectId = 0;

/// Object storage that rescans feed discovered files into
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Register a media file found on disk
    ///
    /// Returns the id of the container whose contents changed, or `None` if
    /// the file was already known.
    async fn add_file(&self, path: &Path) -> TaskResult<Option<ObjectId>>;
}

/// Receiver of "these containers changed" notifications
pub trait ChangeListener: Send + Sync {
    fn container_changed(&self, ids: &[ObjectId]);
}

/// A remote content provider whose items are mirrored into the library
#[async_trait]
pub trait OnlineService: Send + Sync {
    /// Short name used in logs and task descriptions
    fn name(&self) -> &str;

    /// Delay between scheduled refreshes; `None` means refresh on demand only
    fn refresh_interval(&self) -> Option<Duration> {
        None
    }

    /// Fetch fresh data from the service and update the library
    ///
    /// Long fetches should check `token` between requests. Returns the
    /// containers that changed.
    async fn refresh(&self, token: &CancellationToken) -> TaskResult<Vec<ObjectId>>;
}
