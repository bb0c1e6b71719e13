//! Built-in task kinds
//!
//! - Directory rescans that feed the content store
//! - Online service refreshes, on demand or on a timer

mod online;
mod rescan;

pub use online::{FetchOnlineContentTask, OnlineRefreshSchedule};
pub use rescan::{is_media_file, RescanDirectoryTask, MEDIA_EXTENSIONS};
