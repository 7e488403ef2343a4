use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Startup configuration for one mirrored directory.
///
/// Read once at startup, never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Watched directory (absolute, recursive)
    pub local_dir: PathBuf,
    /// Mirror target on the remote host (absolute)
    pub remote_dir: String,
    pub hostname: String,
    #[serde(default = "SyncConfig::default_port")]
    pub port: u16,
    pub username: String,
    /// Ed25519 private key used for authentication
    pub pkey_path: PathBuf,
    #[serde(default = "SyncConfig::default_display_last_k")]
    pub display_last_k: usize,
    /// Max mkdir+retry rounds for one upload, 0 = unbounded
    #[serde(default)]
    pub retry_max: u32,
    /// Initial backoff in ms between upload retries (exponential)
    #[serde(default)]
    pub retry_backoff_ms: u64,
    #[serde(default)]
    pub fingerprints: Option<Vec<String>>, // allowed host key fingerprints or base64 keys
}

impl SyncConfig {
    fn default_port() -> u16 { 22 }
    fn default_display_last_k() -> usize { 25 }

    pub fn validate(&self) -> Result<()> {
        if !self.local_dir.is_absolute() {
            return Err(anyhow!("local_dir must be absolute: {}", self.local_dir.display()));
        }
        if !self.remote_dir.starts_with('/') {
            return Err(anyhow!("remote_dir must be absolute: {}", self.remote_dir));
        }
        if self.hostname.trim().is_empty() {
            return Err(anyhow!("hostname is empty"));
        }
        if self.username.trim().is_empty() {
            return Err(anyhow!("username is empty"));
        }
        if self.display_last_k == 0 {
            return Err(anyhow!("display_last_k must be at least 1"));
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry_max,
            backoff_ms: self.retry_backoff_ms,
        }
    }
}

/// Bounds the create-directories-then-retry loop of an upload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_ms: u64,
}

impl RetryPolicy {
    const MAX_BACKOFF_MS: u64 = 5_000;

    /// Retry forever with no pause between attempts.
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn exhausted(&self, attempt: u32) -> bool {
        self.max_attempts != 0 && attempt > self.max_attempts
    }

    /// Delay before the given (1-based) retry.
    pub fn backoff(&self, attempt: u32) -> u64 {
        if self.backoff_ms == 0 {
            return 0;
        }
        let shift = attempt.saturating_sub(1).min(16);
        self.backoff_ms
            .saturating_mul(1u64 << shift)
            .min(Self::MAX_BACKOFF_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SyncConfig {
        SyncConfig {
            local_dir: PathBuf::from("/home/me/project"),
            remote_dir: "/srv/project".into(),
            hostname: "example.org".into(),
            port: 22,
            username: "me".into(),
            pkey_path: PathBuf::from("/home/me/.ssh/id_ed25519"),
            display_last_k: 25,
            retry_max: 0,
            retry_backoff_ms: 0,
            fingerprints: None,
        }
    }

    #[test]
    fn yaml_defaults() {
        let text = "
local_dir: /home/me/project
remote_dir: /srv/project
hostname: example.org
username: me
pkey_path: /home/me/.ssh/id_ed25519
";
        let cfg: SyncConfig = serde_yaml::from_str(text).unwrap();
        assert_eq!(cfg.port, 22);
        assert_eq!(cfg.display_last_k, 25);
        assert_eq!(cfg.retry_policy(), RetryPolicy::unbounded());
        assert!(cfg.fingerprints.is_none());
        cfg.validate().unwrap();
    }

    #[test]
    fn json_overrides() {
        let text = r#"{
            "local_dir": "/data", "remote_dir": "/mirror", "hostname": "h",
            "port": 2222, "username": "u", "pkey_path": "/k",
            "display_last_k": 5, "retry_max": 3, "retry_backoff_ms": 100
        }"#;
        let cfg: SyncConfig = serde_json::from_str(text).unwrap();
        assert_eq!(cfg.port, 2222);
        assert_eq!(cfg.display_last_k, 5);
        assert_eq!(cfg.retry_policy(), RetryPolicy { max_attempts: 3, backoff_ms: 100 });
    }

    #[test]
    fn rejects_relative_dirs() {
        let mut cfg = sample();
        cfg.local_dir = PathBuf::from("project");
        assert!(cfg.validate().is_err());

        let mut cfg = sample();
        cfg.remote_dir = "srv/project".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_zero_retention() {
        let mut cfg = sample();
        cfg.display_last_k = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn retry_policy_bounds() {
        let unbounded = RetryPolicy::unbounded();
        assert!(!unbounded.exhausted(u32::MAX));
        assert_eq!(unbounded.backoff(7), 0);

        let p = RetryPolicy { max_attempts: 2, backoff_ms: 100 };
        assert!(!p.exhausted(2));
        assert!(p.exhausted(3));
        assert_eq!(p.backoff(1), 100);
        assert_eq!(p.backoff(2), 200);
        assert_eq!(p.backoff(30), 5_000);
    }
}
