//! SFTP implementation of the sshtrack remote endpoint.

mod ssh_client;
mod utils;

use crate::utils::{classify, ensure_dir};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use russh::client::{AuthResult, Handle};
use russh::keys::{Algorithm, PrivateKeyWithHashAlg};
use russh::Disconnect;
use russh_sftp::client::SftpSession;
use ssh_client::Client;
use sshtrack_core::{RemoteEndpoint, RemoteError, SyncConfig};
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// One authenticated SSH session with one SFTP sub-session on top.
pub struct SftpRemote {
    session: Handle<Client>,
    sftp: SftpSession,
}

impl SftpRemote {
    /// Connect and authenticate with the configured Ed25519 key.
    pub async fn connect(cfg: &SyncConfig) -> Result<Self> {
        let key = russh::keys::load_secret_key(&cfg.pkey_path, None)
            .with_context(|| format!("load private key {}", cfg.pkey_path.display()))?;
        if key.algorithm() != Algorithm::Ed25519 {
            return Err(anyhow!(
                "unsupported key type {} in {}, only ssh-ed25519 is accepted",
                key.algorithm(),
                cfg.pkey_path.display()
            ));
        }

        let config = russh::client::Config::default();
        let client = Client {
            allowed_fingerprints: cfg.fingerprints.clone(),
        };
        let mut session = russh::client::connect(
            Arc::new(config),
            (cfg.hostname.as_str(), cfg.port),
            client,
        )
        .await
        .with_context(|| format!("connect to {}:{}", cfg.hostname, cfg.port))?;

        let res = session
            .authenticate_publickey(
                cfg.username.as_str(),
                PrivateKeyWithHashAlg::new(Arc::new(key), None),
            )
            .await?;
        if let AuthResult::Failure {
            remaining_methods,
            partial_success,
        } = res
        {
            return Err(anyhow!(
                "Authentication failed for {}@{}, remaining_methods: {:?}, partial_success: {}",
                cfg.username,
                cfg.hostname,
                remaining_methods,
                partial_success
            ));
        }

        let channel = session.channel_open_session().await?;
        channel.request_subsystem(true, "sftp").await?;
        let sftp = SftpSession::new(channel.into_stream()).await?;
        info!(
            "connected to {}@{}:{}, remote cwd {:?}",
            cfg.username,
            cfg.hostname,
            cfg.port,
            sftp.canonicalize(".").await?
        );
        Ok(Self { session, sftp })
    }
}

#[async_trait]
impl RemoteEndpoint for SftpRemote {
    async fn write(&self, local: &Path, remote: &str) -> Result<(), RemoteError> {
        let mut reader = tokio::fs::File::open(local).await?;
        let mut remote_file = self.sftp.create(remote).await.map_err(classify)?;
        let bytes = tokio::io::copy(&mut reader, &mut remote_file).await?;
        remote_file.shutdown().await?;
        debug!("wrote {bytes} bytes to {remote}");
        Ok(())
    }

    async fn remove(&self, remote: &str) -> Result<(), RemoteError> {
        self.sftp.remove_file(remote).await.map_err(classify)
    }

    async fn remove_directory(&self, remote: &str) -> Result<(), RemoteError> {
        self.sftp.remove_dir(remote).await.map_err(classify)
    }

    async fn rename(&self, from: &str, to: &str) -> Result<(), RemoteError> {
        self.sftp.rename(from, to).await.map_err(classify)
    }

    async fn make_directory(&self, remote: &str) -> Result<(), RemoteError> {
        ensure_dir(&self.sftp, remote).await
    }

    async fn close(&self) -> Result<(), RemoteError> {
        self.sftp.close().await.map_err(classify)?;
        self.session
            .disconnect(Disconnect::ByApplication, "", "en")
            .await
            .map_err(|e| RemoteError::Disconnected(e.to_string()))?;
        info!("session closed");
        Ok(())
    }
}
