//! Running generated scripts in the blockchain client

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::ffi::OsString;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, error, info};

/// Network id of the private test chain
pub const NETWORK_ID: &str = "123";

/// Whether a script runs against the genesis-initialised chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenesisMode {
    /// Regular scenario scripts
    WithGenesis,
    /// The account bootstrap, which runs before a genesis file exists
    Bootstrap,
}

/// Executes a generated script and returns what it printed
#[async_trait]
pub trait ScriptRunner: Send + Sync {
    async fn run(&self, script: &Path, mode: GenesisMode) -> Result<String>;
}

/// Runs scripts through `geth ... js <script>`
#[derive(Debug, Clone)]
pub struct GethRunner {
    geth: PathBuf,
    data_dir: PathBuf,
    genesis_file: PathBuf,
    log_file: PathBuf,
}

impl GethRunner {
    pub fn new(geth: PathBuf, data_dir: PathBuf, genesis_file: PathBuf, log_file: PathBuf) -> Self {
        Self {
            geth,
            data_dir,
            genesis_file,
            log_file,
        }
    }

    /// Command-line arguments for running `script`
    pub fn args(&self, script: &Path, mode: GenesisMode) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "--networkid".into(),
            NETWORK_ID.into(),
            "--nodiscover".into(),
            "--maxpeers".into(),
            "0".into(),
        ];
        if mode == GenesisMode::WithGenesis {
            args.push("--genesis".into());
            args.push(self.genesis_file.clone().into());
        }
        args.push("--datadir".into());
        args.push(self.data_dir.clone().into());
        args.push("js".into());
        args.push(script.into());
        args
    }
}

#[async_trait]
impl ScriptRunner for GethRunner {
    async fn run(&self, script: &Path, mode: GenesisMode) -> Result<String> {
        let stderr_log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_file)
            .with_context(|| format!("Failed to open client log {}", self.log_file.display()))?;

        info!("Running {} in geth", script.display());
        let output = Command::new(&self.geth)
            .args(self.args(script, mode))
            .stdout(Stdio::piped())
            .stderr(Stdio::from(stderr_log))
            .output()
            .await
            .with_context(|| format!("Failed to spawn {}", self.geth.display()))?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        debug!("geth output for {}:\n{}", script.display(), stdout);

        if !output.status.success() {
            error!("❌ geth failed on {}:\n{}", script.display(), stdout);
            anyhow::bail!(
                "geth exited with status {:?} running {} (see {})",
                output.status.code(),
                script.display(),
                self.log_file.display()
            );
        }
        Ok(stdout)
    }
}
