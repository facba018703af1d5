//! Host capability used by the provisioning steps.
//!
//! The [`HostState`] trait is the only way the provisioner touches the
//! machine: PATH lookups, identity queries and blocking command execution.
//! Tests substitute a scripted host that never spawns processes.

use std::env;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, instrument};

use crate::io::process::{CommandOutput, run_command};

/// A program invocation, kept as plain strings so it can be logged and
/// matched by fakes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Prepend a wrapper program (e.g. `sudo`), keeping this command as its arguments.
    pub fn wrapped_in(self, wrapper: &str) -> Self {
        let mut args = Vec::with_capacity(self.args.len() + 1);
        args.push(self.program);
        args.extend(self.args);
        Self {
            program: wrapper.to_string(),
            args,
        }
    }

    /// Shell-like rendering for logs and error messages.
    pub fn display(&self) -> String {
        let mut out = self.program.clone();
        for arg in &self.args {
            out.push(' ');
            out.push_str(arg);
        }
        out
    }
}

/// Access to OS-owned host state.
pub trait HostState {
    /// Resolve `program` on the executing user's command path.
    fn find_program(&self, program: &str) -> Option<PathBuf>;
    /// True if the process already runs with root privileges.
    fn is_root(&self) -> Result<bool>;
    /// Login name of the operator who invoked the provisioner.
    fn current_user(&self) -> Result<String>;
    /// Run a command to completion. Errors only when it cannot be started.
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput>;
}

/// The machine this process runs on.
#[derive(Debug, Clone)]
pub struct SystemHost {
    timeout: Option<Duration>,
    output_limit_bytes: usize,
}

impl SystemHost {
    pub fn new(timeout: Option<Duration>, output_limit_bytes: usize) -> Self {
        Self {
            timeout,
            output_limit_bytes,
        }
    }
}

impl HostState for SystemHost {
    fn find_program(&self, program: &str) -> Option<PathBuf> {
        let path = env::var_os("PATH")?;
        env::split_paths(&path)
            .map(|dir| dir.join(program))
            .find(|candidate| is_executable(candidate))
    }

    fn is_root(&self) -> Result<bool> {
        let out = self.run(&CommandSpec::new("id", ["-u"]))?;
        if !out.success() {
            return Err(anyhow!("id -u failed with status {:?}", out.code));
        }
        Ok(out.stdout_lossy().trim() == "0")
    }

    fn current_user(&self) -> Result<String> {
        // Under sudo, USER is root; SUDO_USER names the operator.
        for var in ["SUDO_USER", "USER"] {
            if let Ok(user) = env::var(var)
                && !user.trim().is_empty()
            {
                return Ok(user);
            }
        }
        let out = self.run(&CommandSpec::new("id", ["-un"]))?;
        let user = out.stdout_lossy().trim().to_string();
        if !out.success() || user.is_empty() {
            return Err(anyhow!("unable to determine current user"));
        }
        Ok(user)
    }

    #[instrument(skip_all, fields(command = %spec.display()))]
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args);
        let out = run_command(cmd, self.timeout, self.output_limit_bytes)
            .with_context(|| format!("run {}", spec.display()))?;
        debug!(
            exit_code = ?out.code,
            stdout = %out.stdout_lossy().trim_end(),
            stdout_truncated = out.stdout_truncated,
            "host command finished"
        );
        Ok(out)
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
