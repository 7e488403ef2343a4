//! Core library for sshtrack – mirrors local file changes to a remote tree.

mod activity;
mod config;
mod engine;
mod file_op;
mod remote;
mod task;
mod utils;

#[cfg(test)]
mod testing;

pub use activity::{ActionKind, ActivityLog, ActivityRecord};
pub use config::{RetryPolicy, SyncConfig};
pub use engine::{SyncEngine, SyncError};
pub use file_op::{ChangeEvent, EventClassifier};
pub use remote::{make_directory_all, RemoteEndpoint, RemoteError};
pub use task::{run_dispatch, spawn_watcher, NullPresenter, Presenter, EVENT_QUEUE};
pub use utils::{as_posix_path, map_path, remote_parent};
