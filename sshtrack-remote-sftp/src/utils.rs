use russh_sftp::client::error::Error;
use russh_sftp::client::SftpSession;
use russh_sftp::protocol::StatusCode;
use sshtrack_core::RemoteError;
use tracing::debug;

/// Map an SFTP client error onto the engine's failure classes.
pub(crate) fn classify(err: Error) -> RemoteError {
    match err {
        Error::Status(status) => match status.status_code {
            StatusCode::NoSuchFile => RemoteError::NotFound(status.error_message),
            StatusCode::NoConnection | StatusCode::ConnectionLost => {
                RemoteError::Disconnected(status.error_message)
            }
            code => RemoteError::Failure(format!("{code:?}: {}", status.error_message)),
        },
        Error::IO(msg) => RemoteError::Disconnected(msg),
        Error::Timeout => RemoteError::Disconnected("request timed out".into()),
        other => RemoteError::Failure(other.to_string()),
    }
}

/// Create a single directory, treating "already a directory" as success.
///
/// Servers answer a mkdir on an existing path with a generic `Failure`, so
/// the path is stat'ed before the error is reported.
pub(crate) async fn ensure_dir(sftp: &SftpSession, path: &str) -> Result<(), RemoteError> {
    let err = match sftp.create_dir(path).await {
        Ok(()) => return Ok(()),
        Err(e) => e,
    };
    let is_failure = matches!(&err, Error::Status(s) if s.status_code == StatusCode::Failure);
    if !is_failure {
        return Err(classify(err));
    }
    match sftp.metadata(path).await {
        Ok(attrs) if attrs.is_dir() => {
            debug!("{path} already exists");
            Ok(())
        }
        Ok(_) => Err(RemoteError::Failure(format!(
            "path component is a file, not a directory: {path}"
        ))),
        Err(_stat_err) => Err(classify(err)),
    }
}
