mod table;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use sshtrack_core::{run_dispatch, spawn_watcher, SyncConfig, SyncEngine, EVENT_QUEUE};
use sshtrack_remote_sftp::SftpRemote;
use std::{fs, path::Path, path::PathBuf};
use table::TablePresenter;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "sshtrack",
    version,
    about = "Track local files and mirror them to a remote host on save/create/remove"
)]
struct Cli {
    /// Config file (YAML / JSON); replaces every other flag when given
    #[arg(long)]
    config_path: Option<PathBuf>,
    /// Local directory to track (absolute, recursive)
    #[arg(long)]
    local_dir: Option<PathBuf>,
    /// Remote directory to copy to (absolute)
    #[arg(long)]
    remote_dir: Option<String>,
    /// Host to ssh into
    #[arg(long)]
    hostname: Option<String>,
    #[arg(long, default_value_t = 22)]
    port: u16,
    /// Username on the remote machine
    #[arg(long)]
    username: Option<String>,
    /// Private Ed25519 key to authenticate with (absolute)
    #[arg(long)]
    pkey_path: Option<PathBuf>,
    /// Max number of events to display
    #[arg(long, default_value_t = 25)]
    display_last_k: usize,
    /// Max directory-creation retries per upload, 0 = unbounded
    #[arg(long, default_value_t = 0)]
    retry_max: u32,
    /// Initial backoff between upload retries in ms
    #[arg(long, default_value_t = 0)]
    retry_backoff_ms: u64,
    /// Accepted server key fingerprint (repeatable); any key if omitted
    #[arg(long = "fingerprint")]
    fingerprints: Vec<String>,
    /// Log file [default: sshtrack.log in the system temp dir]
    #[arg(long)]
    log_file: Option<PathBuf>,
}

impl Cli {
    fn into_config(self) -> Result<SyncConfig> {
        if let Some(path) = &self.config_path {
            return load_config(path);
        }
        let missing = |flag: &str| anyhow!("missing --{flag} (or pass --config-path)");
        Ok(SyncConfig {
            local_dir: self.local_dir.ok_or_else(|| missing("local-dir"))?,
            remote_dir: self.remote_dir.ok_or_else(|| missing("remote-dir"))?,
            hostname: self.hostname.ok_or_else(|| missing("hostname"))?,
            port: self.port,
            username: self.username.ok_or_else(|| missing("username"))?,
            pkey_path: self.pkey_path.ok_or_else(|| missing("pkey-path"))?,
            display_last_k: self.display_last_k,
            retry_max: self.retry_max,
            retry_backoff_ms: self.retry_backoff_ms,
            fingerprints: (!self.fingerprints.is_empty()).then_some(self.fingerprints),
        })
    }
}

fn load_config(path: &Path) -> Result<SyncConfig> {
    let text = fs::read_to_string(path)
        .map_err(|e| anyhow!("read config {} failed: {e}", path.display()))?;

    // Detect format by extension
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("");
    let cfg = match ext {
        "json" => serde_json::from_str(&text)?,
        _ => serde_yaml::from_str(&text)?, // default to yaml
    };
    Ok(cfg)
}

/// Where logs go. The table owns the terminal, so this is always a file.
fn log_path(log_file: Option<&Path>) -> PathBuf {
    log_file
        .map(Path::to_path_buf)
        .unwrap_or_else(|| std::env::temp_dir().join("sshtrack.log"))
}

fn init_tracing(log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_env("SSHTRACK_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let path = log_path(log_file);
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("open log file {}", path.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(std::sync::Mutex::new(file))
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_file.as_deref())?;

    let mut cfg = cli.into_config()?;
    cfg.validate()?;
    // watcher paths come back resolved, so the root must be too
    let root = &cfg.local_dir;
    let root = root
        .canonicalize()
        .with_context(|| format!("resolve local dir {}", root.display()))?;
    cfg.local_dir = root;

    let remote = SftpRemote::connect(&cfg).await?;
    let mut engine = SyncEngine::from_config(remote, &cfg);

    let (tx, rx) = mpsc::channel(EVENT_QUEUE);
    let _watcher = spawn_watcher(&cfg.local_dir, tx)?;
    let mut presenter = TablePresenter::stdout();

    let outcome = tokio::select! {
        res = run_dispatch(&mut engine, rx, &mut presenter) => res.map_err(anyhow::Error::from),
        sig = tokio::signal::ctrl_c() => {
            info!("interrupted");
            sig.map_err(anyhow::Error::from)
        }
    };

    if let Err(e) = engine.close().await {
        warn!("closing remote session: {e}");
    }
    if let Err(e) = &outcome {
        error!("{e:#}");
    }
    outcome
}
