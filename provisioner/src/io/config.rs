//! Provisioner configuration stored in `provision.toml`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::app_env::AppEnv;

pub const DEFAULT_CONFIG_PATH: &str = "provision.toml";

/// Provisioner configuration (TOML).
///
/// Missing fields default to the stock Docker-on-Ubuntu setup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ProvisionConfig {
    /// Kill any single command after this many seconds. Unset means wait forever.
    pub command_timeout_secs: Option<u64>,

    /// Keep at most this many bytes of each command's stdout/stderr.
    pub output_limit_bytes: usize,

    pub runtime: RuntimeConfig,
    pub compose: ComposeConfig,
    pub firewall: FirewallConfig,
    pub privilege: PrivilegeConfig,
    pub guidance: GuidanceConfig,
    pub app: AppConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Runtime binary looked up on PATH.
    pub binary: String,
    /// Group granting non-root access to the runtime daemon.
    pub group: String,
    /// Vendor convenience install script.
    pub install_script_url: String,
    /// Download the install script here instead of a fresh private temp dir.
    pub install_script_path: Option<PathBuf>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            binary: "docker".to_string(),
            group: "docker".to_string(),
            install_script_url: "https://get.docker.com".to_string(),
            install_script_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ComposeConfig {
    pub package_manager: String,
    pub package: String,
}

impl Default for ComposeConfig {
    fn default() -> Self {
        Self {
            package_manager: "apt-get".to_string(),
            package: "docker-compose-plugin".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FirewallConfig {
    pub port: u16,
    pub chain: String,
    /// 1-based insert position in the chain.
    pub position: u32,
    /// Probe with `iptables -C` and skip insertion if the rule exists.
    pub check_existing: bool,
    /// Command that saves the rule set across reboots. Empty disables persistence.
    pub persist_command: Vec<String>,
}

impl Default for FirewallConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            chain: "INPUT".to_string(),
            position: 6,
            check_existing: false,
            persist_command: vec!["netfilter-persistent".to_string(), "save".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PrivilegeConfig {
    /// Prefix privileged commands with `sudo` when not running as root.
    pub use_sudo: bool,
}

impl Default for PrivilegeConfig {
    fn default() -> Self {
        Self { use_sudo: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GuidanceConfig {
    pub repo_url: String,
    pub project_dir: String,
    /// Shown in the application URL; the host's public address is not probed.
    pub public_host: String,
}

impl Default for GuidanceConfig {
    fn default() -> Self {
        Self {
            repo_url: "https://github.com/<your-account>/stockpulse.git".to_string(),
            project_dir: "stockpulse".to_string(),
            public_host: "<server-ip>".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    /// Write an env-file template here if no file exists yet.
    pub env_file: Option<PathBuf>,
    pub env: AppEnv,
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            command_timeout_secs: None,
            output_limit_bytes: 1_000_000,
            runtime: RuntimeConfig::default(),
            compose: ComposeConfig::default(),
            firewall: FirewallConfig::default(),
            privilege: PrivilegeConfig::default(),
            guidance: GuidanceConfig::default(),
            app: AppConfig::default(),
        }
    }
}

impl ProvisionConfig {
    pub fn validate(&self) -> Result<()> {
        if self.command_timeout_secs == Some(0) {
            return Err(anyhow!("command_timeout_secs must be > 0"));
        }
        if self.output_limit_bytes == 0 {
            return Err(anyhow!("output_limit_bytes must be > 0"));
        }
        if self.runtime.binary.trim().is_empty() {
            return Err(anyhow!("runtime.binary must be non-empty"));
        }
        if self.runtime.group.trim().is_empty() {
            return Err(anyhow!("runtime.group must be non-empty"));
        }
        if self.runtime.install_script_url.trim().is_empty() {
            return Err(anyhow!("runtime.install_script_url must be non-empty"));
        }
        if self.compose.package_manager.trim().is_empty() || self.compose.package.trim().is_empty()
        {
            return Err(anyhow!(
                "compose.package_manager and compose.package must be non-empty"
            ));
        }
        if self.firewall.port == 0 {
            return Err(anyhow!("firewall.port must be > 0"));
        }
        if self.firewall.position == 0 {
            return Err(anyhow!("firewall.position must be >= 1"));
        }
        if self.firewall.chain.trim().is_empty() {
            return Err(anyhow!("firewall.chain must be non-empty"));
        }
        if self
            .firewall
            .persist_command
            .first()
            .is_some_and(|program| program.trim().is_empty())
        {
            return Err(anyhow!("firewall.persist_command must start with a program"));
        }
        Ok(())
    }

    pub fn command_timeout(&self) -> Option<Duration> {
        self.command_timeout_secs.map(Duration::from_secs)
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `ProvisionConfig::default()`.
pub fn load_config(path: &Path) -> Result<ProvisionConfig> {
    if !path.exists() {
        let cfg = ProvisionConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: ProvisionConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("validate {}", path.display()))?;
    Ok(cfg)
}
