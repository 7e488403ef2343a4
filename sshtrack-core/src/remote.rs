use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Failure of a single remote file operation.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The path, or one of its parents, does not exist.
    #[error("no such file: {0}")]
    NotFound(String),
    /// The secure channel is gone; every following call would fail too.
    #[error("connection lost: {0}")]
    Disconnected(String),
    #[error("remote failure: {0}")]
    Failure(String),
    #[error("local i/o: {0}")]
    Io(#[from] std::io::Error),
}

impl RemoteError {
    pub fn is_not_found(&self) -> bool {
        match self {
            RemoteError::NotFound(_) => true,
            RemoteError::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, RemoteError::Disconnected(_))
    }
}

/// File operations on the mirror host, addressed by absolute remote path.
///
/// Implementations are driven by one caller at a time and need no internal
/// locking beyond what `&self` access requires.
#[async_trait]
pub trait RemoteEndpoint: Send + Sync + 'static {
    /// Copy the content of `local` to `remote`, overwriting unconditionally.
    async fn write(&self, local: &Path, remote: &str) -> Result<(), RemoteError>;
    async fn remove(&self, remote: &str) -> Result<(), RemoteError>;
    async fn remove_directory(&self, remote: &str) -> Result<(), RemoteError>;
    async fn rename(&self, from: &str, to: &str) -> Result<(), RemoteError>;
    /// Create one directory. Succeeds if it already exists.
    async fn make_directory(&self, remote: &str) -> Result<(), RemoteError>;
    /// Release the transfer sub-session and the underlying connection.
    async fn close(&self) -> Result<(), RemoteError>;
}

/// Create every directory on the root-to-leaf path of `dir`, `dir` included.
///
/// Non-fatal failures on a single level are skipped so that deeper levels
/// are still attempted (e.g. `/home` not creatable but already present).
pub async fn make_directory_all<R: RemoteEndpoint + ?Sized>(
    remote: &R,
    dir: &str,
) -> Result<(), RemoteError> {
    let mut prefix = String::with_capacity(dir.len());
    for part in dir.split('/').filter(|s| !s.is_empty()) {
        prefix.push('/');
        prefix.push_str(part);
        match remote.make_directory(&prefix).await {
            Ok(()) => {}
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => debug!("mkdir {prefix}: {e}"),
        }
    }
    Ok(())
}
