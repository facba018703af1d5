//! Container runtime installation.

use std::path::PathBuf;

use tempfile::TempDir;
use tracing::{debug, info, instrument};

use crate::core::types::{RuntimeOutcome, Step, StepStatus};
use crate::error::ProvisionError;
use crate::io::config::RuntimeConfig;
use crate::io::host::{CommandSpec, HostState};
use crate::io::privilege::{Escalation, run_checked};

/// Install the container runtime unless its binary is already on PATH.
///
/// A fresh install downloads the vendor script into a private temp dir,
/// runs it, then adds the invoking user to the runtime group. The membership
/// only applies to new login sessions, reported as `requires_relogin`.
#[instrument(skip_all, fields(binary = %cfg.binary))]
pub fn ensure_runtime_installed<H: HostState>(
    host: &H,
    cfg: &RuntimeConfig,
    escalation: Escalation,
) -> Result<RuntimeOutcome, ProvisionError> {
    if let Some(path) = host.find_program(&cfg.binary) {
        info!(path = %path.display(), "container runtime already installed");
        return Ok(RuntimeOutcome {
            status: StepStatus::AlreadyPresent,
            requires_relogin: false,
        });
    }

    info!(url = %cfg.install_script_url, "container runtime missing, installing");
    let (staging, script_path) = stage_script(cfg)?;
    let script = script_path.display().to_string();
    let download = CommandSpec::new(
        "curl",
        [
            "-fsSL",
            cfg.install_script_url.as_str(),
            "-o",
            script.as_str(),
        ],
    );
    run_checked(host, Step::Runtime, &download)?;
    run_checked(
        host,
        Step::Runtime,
        &escalation.apply(CommandSpec::new("sh", [script.as_str()])),
    )?;
    drop(staging);

    let user = host
        .current_user()
        .map_err(|err| ProvisionError::Spawn {
            step: Step::Runtime,
            command: "id -un".to_string(),
            reason: format!("{err:#}"),
        })?;
    if user == "root" {
        info!("running as root, skipping group membership");
        return Ok(RuntimeOutcome {
            status: StepStatus::Installed,
            requires_relogin: false,
        });
    }

    let usermod = CommandSpec::new("usermod", ["-aG", cfg.group.as_str(), user.as_str()]);
    run_checked(host, Step::Runtime, &escalation.apply(usermod))?;
    info!(%user, group = %cfg.group, "added user to runtime group, new login required");
    Ok(RuntimeOutcome {
        status: StepStatus::Installed,
        requires_relogin: true,
    })
}

const SCRIPT_NAME: &str = "get-docker.sh";

/// Pick the download location. Without an override the script goes into a
/// fresh 0700 temp dir, removed when the returned guard drops.
fn stage_script(cfg: &RuntimeConfig) -> Result<(Option<TempDir>, PathBuf), ProvisionError> {
    if let Some(path) = &cfg.install_script_path {
        return Ok((None, path.clone()));
    }
    let dir = tempfile::Builder::new()
        .prefix("get-docker-")
        .tempdir()
        .map_err(|source| ProvisionError::Write {
            step: Step::Runtime,
            path: std::env::temp_dir(),
            source,
        })?;
    let path = dir.path().join(SCRIPT_NAME);
    debug!(path = %path.display(), "staging install script");
    Ok((Some(dir), path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeHost;

    #[test]
    fn present_runtime_is_left_alone() {
        let host = FakeHost::new().with_program("docker");
        let outcome = ensure_runtime_installed(&host, &RuntimeConfig::default(), Escalation::Sudo)
            .expect("runtime");
        assert_eq!(outcome.status, StepStatus::AlreadyPresent);
        assert!(!outcome.requires_relogin);
        assert!(host.commands().is_empty());
    }

    #[test]
    fn missing_runtime_is_installed_and_user_added_to_group() {
        let host = FakeHost::new().with_user("ubuntu");
        let outcome = ensure_runtime_installed(&host, &RuntimeConfig::default(), Escalation::Sudo)
            .expect("runtime");
        assert_eq!(outcome.status, StepStatus::Installed);
        assert!(outcome.requires_relogin);

        let commands = host.commands();
        assert_eq!(commands.len(), 3);
        let script = commands[0]
            .strip_prefix("curl -fsSL https://get.docker.com -o ")
            .expect("download command");
        assert!(script.ends_with("/get-docker.sh"));
        assert_eq!(commands[1], format!("sudo sh {script}"));
        assert_eq!(commands[2], "sudo usermod -aG docker ubuntu");
        assert!(host.find_program("docker").is_some());
    }

    #[test]
    fn install_script_is_staged_in_private_dir_and_removed() {
        let host = FakeHost::new();
        ensure_runtime_installed(&host, &RuntimeConfig::default(), Escalation::Sudo)
            .expect("runtime");

        let commands = host.commands();
        let script = commands[0]
            .rsplit(' ')
            .next()
            .map(std::path::PathBuf::from)
            .expect("script path");
        assert_ne!(script, std::path::PathBuf::from("/tmp/get-docker.sh"));
        let staging = script.parent().expect("staging dir");
        assert!(
            staging
                .file_name()
                .is_some_and(|name| name.to_string_lossy().starts_with("get-docker-"))
        );
        assert!(!staging.exists(), "staging dir should be removed after install");
    }

    #[test]
    fn install_script_path_override_is_used() {
        let host = FakeHost::new();
        let cfg = RuntimeConfig {
            install_script_path: Some(std::path::PathBuf::from("/root/get-docker.sh")),
            ..RuntimeConfig::default()
        };
        ensure_runtime_installed(&host, &cfg, Escalation::Sudo).expect("runtime");
        let commands = host.commands();
        assert_eq!(
            commands[0],
            "curl -fsSL https://get.docker.com -o /root/get-docker.sh"
        );
        assert_eq!(commands[1], "sudo sh /root/get-docker.sh");
    }

    #[test]
    fn root_user_needs_no_relogin() {
        let host = FakeHost::new().as_root().with_user("root");
        let outcome = ensure_runtime_installed(&host, &RuntimeConfig::default(), Escalation::Root)
            .expect("runtime");
        assert_eq!(outcome.status, StepStatus::Installed);
        assert!(!outcome.requires_relogin);
        assert!(!host.commands().iter().any(|c| c.contains("usermod")));
    }

    #[test]
    fn download_failure_stops_before_running_script() {
        let host = FakeHost::new().fail_on(
            "curl",
            6,
            "curl: (6) Could not resolve host: get.docker.com",
        );
        let err = ensure_runtime_installed(&host, &RuntimeConfig::default(), Escalation::Sudo)
            .unwrap_err();
        assert!(matches!(
            err,
            ProvisionError::Installation {
                step: Step::Runtime,
                code: Some(6),
                ..
            }
        ));
        assert_eq!(host.commands().len(), 1);
    }
}
