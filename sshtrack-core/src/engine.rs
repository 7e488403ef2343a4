//! Translates local change events into remote operations.

use crate::{
    activity::{ActionKind, ActivityLog},
    config::{RetryPolicy, SyncConfig},
    file_op::ChangeEvent,
    remote::{make_directory_all, RemoteEndpoint, RemoteError},
    utils::{is_under_root, map_path, remote_parent},
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Failures that stop event processing.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("rename {from} -> {to} failed: {source}")]
    Rename {
        from: String,
        to: String,
        #[source]
        source: RemoteError,
    },
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

pub struct SyncEngine<R> {
    remote: R,
    local_root: PathBuf,
    remote_root: String,
    retry: RetryPolicy,
    log: ActivityLog,
}

impl<R: RemoteEndpoint> SyncEngine<R> {
    pub fn new(remote: R, local_root: impl Into<PathBuf>, remote_root: impl Into<String>) -> Self {
        Self {
            remote,
            local_root: local_root.into(),
            remote_root: remote_root.into(),
            retry: RetryPolicy::unbounded(),
            log: ActivityLog::default(),
        }
    }

    pub fn from_config(remote: R, cfg: &SyncConfig) -> Self {
        Self::new(remote, cfg.local_dir.clone(), cfg.remote_dir.clone())
            .with_retry(cfg.retry_policy())
            .with_log(ActivityLog::new(cfg.display_last_k))
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_log(mut self, log: ActivityLog) -> Self {
        self.log = log;
        self
    }

    pub fn log(&self) -> &ActivityLog {
        &self.log
    }

    pub fn remote_path(&self, local: &Path) -> String {
        map_path(local, &self.local_root, &self.remote_root)
    }

    /// Route one event to its handler.
    pub async fn handle(&mut self, event: ChangeEvent) -> Result<(), SyncError> {
        debug!(?event, "handling");
        if let Some(stray) = self.outside_root(&event) {
            error!(
                "{} is outside {}, not mirrored",
                stray.display(),
                self.local_root.display()
            );
            return Ok(());
        }
        match event {
            ChangeEvent::Created { path, is_dir: true } => self.handle_dir_created(&path).await,
            ChangeEvent::Modified { is_dir: true, .. } => Ok(()),
            ChangeEvent::Created { path, .. } | ChangeEvent::Modified { path, .. } => {
                self.handle_created_or_modified(&path).await
            }
            ChangeEvent::Deleted { path, is_dir } => self.handle_deleted(&path, is_dir).await,
            ChangeEvent::Renamed { is_dir: true, from, .. } => {
                debug!("ignoring directory rename of {}", from.display());
                Ok(())
            }
            ChangeEvent::Renamed { from, to, .. } => self.handle_renamed(&from, &to).await,
        }
    }

    fn outside_root<'a>(&self, event: &'a ChangeEvent) -> Option<&'a Path> {
        let to = match event {
            ChangeEvent::Renamed { to, .. } => Some(to.as_path()),
            _ => None,
        };
        std::iter::once(event.path())
            .chain(to)
            .find(|p| !is_under_root(p, &self.local_root))
    }

    /// Upload a file, creating missing remote parents and retrying as needed.
    ///
    /// If the local file disappears before the upload succeeds the event is
    /// considered done. Only a lost connection is returned as an error.
    pub async fn handle_created_or_modified(&mut self, local: &Path) -> Result<(), SyncError> {
        let remote_path = self.remote_path(local);
        let mut attempt: u32 = 0;
        loop {
            match self.remote.write(local, &remote_path).await {
                Ok(()) => {
                    info!("uploaded {} -> {}", local.display(), remote_path);
                    break;
                }
                Err(e) if e.is_fatal() => return Err(e.into()),
                Err(e) if e.is_not_found() => {
                    if !local_exists(local).await {
                        debug!("{} vanished before upload", local.display());
                        break;
                    }
                    attempt += 1;
                    if self.retry.exhausted(attempt) {
                        warn!("giving up on {} after {} attempts: {e}", remote_path, attempt - 1);
                        self.log.record(ActionKind::UploadError, local);
                        return Ok(());
                    }
                    if let Some(parent) = remote_parent(&remote_path) {
                        make_directory_all(&self.remote, parent).await?;
                    }
                    let delay = self.retry.backoff(attempt);
                    if delay > 0 {
                        tokio::time::sleep(Duration::from_millis(delay)).await;
                    }
                }
                Err(e) => {
                    warn!("upload {} failed: {e}", remote_path);
                    self.log.record(ActionKind::UploadError, local);
                    return Ok(());
                }
            }
        }
        self.log.record(ActionKind::Upload, local);
        Ok(())
    }

    pub async fn handle_deleted(&mut self, local: &Path, is_dir: bool) -> Result<(), SyncError> {
        let remote_path = self.remote_path(local);
        if is_dir {
            match self.remote.remove_directory(&remote_path).await {
                Ok(()) => info!("removed directory {}", remote_path),
                Err(e) if e.is_fatal() => return Err(e.into()),
                Err(e) => debug!("rmdir {} ignored: {e}", remote_path),
            }
            self.log.record(ActionKind::RemoveDirectory, local);
            return Ok(());
        }

        match self.remote.remove(&remote_path).await {
            Ok(()) => {
                info!("removed {}", remote_path);
                self.log.record(ActionKind::Remove, local);
            }
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => {
                warn!("remove {} failed: {e}", remote_path);
                self.log.record(ActionKind::RemoveError, local);
            }
        }
        Ok(())
    }

    /// Rename a remote file, replacing whatever sits at the destination.
    ///
    /// A failing rename is returned to the caller and ends processing.
    pub async fn handle_renamed(&mut self, from: &Path, to: &Path) -> Result<(), SyncError> {
        let from_remote = self.remote_path(from);
        let to_remote = self.remote_path(to);

        match self.remote.remove(&to_remote).await {
            Ok(()) => debug!("cleared rename target {}", to_remote),
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) if e.is_not_found() => {}
            Err(e) => warn!("could not clear rename target {}: {e}", to_remote),
        }

        if let Err(source) = self.remote.rename(&from_remote, &to_remote).await {
            return Err(SyncError::Rename {
                from: from_remote,
                to: to_remote,
                source,
            });
        }
        info!("moved {} -> {}", from_remote, to_remote);
        self.log.record(ActionKind::Move, from);
        Ok(())
    }

    pub async fn handle_dir_created(&mut self, local: &Path) -> Result<(), SyncError> {
        let remote_path = self.remote_path(local);
        make_directory_all(&self.remote, &remote_path).await?;
        self.log.record(ActionKind::MakeDirectory, local);
        Ok(())
    }

    pub async fn close(&self) -> Result<(), RemoteError> {
        self.remote.close().await
    }
}

async fn local_exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}
