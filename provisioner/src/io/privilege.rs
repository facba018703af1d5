//! Privilege escalation and checked execution of step commands.

use tracing::{debug, info, warn};

use crate::core::diagnostics::{failure_text, is_permission_denied};
use crate::core::types::Step;
use crate::error::ProvisionError;
use crate::io::config::PrivilegeConfig;
use crate::io::host::{CommandSpec, HostState};
use crate::io::process::CommandOutput;

const SUDO: &str = "sudo";

/// How privileged commands are launched on this host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escalation {
    /// Already root; run as is.
    Root,
    Sudo,
    /// Not root and escalation disabled; commands may fail with permission errors.
    Unprivileged,
}

impl Escalation {
    /// Decide once per run, before any step executes.
    pub fn resolve<H: HostState>(
        host: &H,
        cfg: &PrivilegeConfig,
    ) -> Result<Escalation, ProvisionError> {
        let root = host.is_root().map_err(|err| ProvisionError::Spawn {
            step: Step::Preflight,
            command: "id -u".to_string(),
            reason: format!("{err:#}"),
        })?;
        let escalation = if root {
            Escalation::Root
        } else if !cfg.use_sudo {
            warn!("not running as root and sudo is disabled");
            Escalation::Unprivileged
        } else if host.find_program(SUDO).is_none() {
            return Err(ProvisionError::Permission {
                step: Step::Preflight,
                command: SUDO.to_string(),
                code: None,
                diagnostics: "not running as root and sudo is not on PATH".to_string(),
            });
        } else {
            Escalation::Sudo
        };
        info!(?escalation, "resolved privilege escalation");
        Ok(escalation)
    }

    pub fn apply(self, spec: CommandSpec) -> CommandSpec {
        match self {
            Escalation::Sudo => spec.wrapped_in(SUDO),
            Escalation::Root | Escalation::Unprivileged => spec,
        }
    }
}

/// Run `spec` and turn any failure into the step's fatal error.
pub fn run_checked<H: HostState>(
    host: &H,
    step: Step,
    spec: &CommandSpec,
) -> Result<CommandOutput, ProvisionError> {
    let out = run_unchecked(host, step, spec)?;
    if out.success() {
        return Ok(out);
    }
    Err(command_failure(step, spec, &out))
}

/// Run `spec`, failing only if it cannot be started.
pub fn run_unchecked<H: HostState>(
    host: &H,
    step: Step,
    spec: &CommandSpec,
) -> Result<CommandOutput, ProvisionError> {
    debug!(%step, command = %spec.display(), "running");
    host.run(spec).map_err(|err| ProvisionError::Spawn {
        step,
        command: spec.display(),
        reason: format!("{err:#}"),
    })
}

pub fn command_failure(step: Step, spec: &CommandSpec, out: &CommandOutput) -> ProvisionError {
    let mut diagnostics = failure_text(&out.stdout, &out.stderr);
    diagnostics.push_str(&out.stderr_truncated_notice());
    if out.timed_out {
        diagnostics.push_str("\n[command timed out]");
    }
    warn!(%step, command = %spec.display(), exit_code = ?out.code, "command failed");
    if is_permission_denied(&diagnostics) {
        ProvisionError::Permission {
            step,
            command: spec.display(),
            code: out.code,
            diagnostics,
        }
    } else {
        ProvisionError::Installation {
            step,
            command: spec.display(),
            code: out.code,
            diagnostics,
        }
    }
}
