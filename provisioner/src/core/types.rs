//! Report types shared by the provisioning steps.
//!
//! These types describe what a run did to the host. They carry no host
//! handles so they can be serialized for automation (`provision --json`).

use serde::{Deserialize, Serialize};

/// Outcome of a guarded installation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// The existence check passed; nothing was installed.
    AlreadyPresent,
    /// The component was missing and has been installed.
    Installed,
}

/// Result of `ensure_runtime_installed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeOutcome {
    pub status: StepStatus,
    /// The invoking user was added to the runtime group and must start a new
    /// login session before the membership applies.
    pub requires_relogin: bool,
}

/// Non-fatal failure to save the packet-filter rule set across reboots.
///
/// The rule stays active for the current boot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistenceWarning {
    pub command: String,
    pub reason: String,
}

impl std::fmt::Display for PersistenceWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "firewall rules not persisted ({}): {}",
            self.command, self.reason
        )
    }
}

/// Result of `open_ingress_port`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirewallOutcome {
    pub port: u16,
    /// A new rule was inserted into the input chain.
    pub inserted: bool,
    /// An equivalent rule was found by the check-before-insert probe.
    pub already_present: bool,
    /// The persistence helper saved the rule set.
    pub persisted: bool,
    pub warning: Option<PersistenceWarning>,
}

/// What happened to the application env-file template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvFileOutcome {
    Written,
    /// An env file already existed and was left untouched.
    Kept,
}

/// Summary of a full provisioning run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionReport {
    pub runtime: StepStatus,
    pub compose_plugin: StepStatus,
    pub firewall: FirewallOutcome,
    pub env_file: Option<EnvFileOutcome>,
    pub requires_relogin: bool,
}

/// Provisioning step, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Preflight,
    Runtime,
    ComposePlugin,
    Firewall,
    EnvFile,
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Step::Preflight => "preflight",
            Step::Runtime => "container runtime",
            Step::ComposePlugin => "compose plugin",
            Step::Firewall => "firewall",
            Step::EnvFile => "env file",
        };
        f.write_str(name)
    }
}
