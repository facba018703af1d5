//! Compose plugin installation.

use tracing::{info, instrument};

use crate::core::types::{Step, StepStatus};
use crate::error::ProvisionError;
use crate::io::config::{ComposeConfig, RuntimeConfig};
use crate::io::host::{CommandSpec, HostState};
use crate::io::privilege::{Escalation, command_failure, run_checked, run_unchecked};

/// Install the compose plugin unless `<runtime> compose version` already answers.
///
/// The package comes from the runtime vendor's repository, which the runtime
/// install registers; run this after [`ensure_runtime_installed`].
///
/// [`ensure_runtime_installed`]: crate::io::runtime::ensure_runtime_installed
#[instrument(skip_all, fields(package = %cfg.package))]
pub fn ensure_compose_plugin_installed<H: HostState>(
    host: &H,
    runtime: &RuntimeConfig,
    cfg: &ComposeConfig,
    escalation: Escalation,
) -> Result<StepStatus, ProvisionError> {
    let probe = version_probe(runtime);
    if run_unchecked(host, Step::ComposePlugin, &probe)?.success() {
        info!("compose plugin already installed");
        return Ok(StepStatus::AlreadyPresent);
    }

    info!("compose plugin missing, installing");
    let pm = cfg.package_manager.as_str();
    run_checked(
        host,
        Step::ComposePlugin,
        &escalation.apply(CommandSpec::new(pm, ["update"])),
    )?;
    run_checked(
        host,
        Step::ComposePlugin,
        &escalation.apply(CommandSpec::new(
            pm,
            ["install", "-y", cfg.package.as_str()],
        )),
    )?;

    let out = run_unchecked(host, Step::ComposePlugin, &probe)?;
    if !out.success() {
        return Err(command_failure(Step::ComposePlugin, &probe, &out));
    }
    info!("compose plugin installed");
    Ok(StepStatus::Installed)
}

fn version_probe(runtime: &RuntimeConfig) -> CommandSpec {
    CommandSpec::new(runtime.binary.as_str(), ["compose", "version"])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeHost;

    #[test]
    fn responding_plugin_is_left_alone() {
        let host = FakeHost::new().with_program("docker").with_compose();
        let status = ensure_compose_plugin_installed(
            &host,
            &RuntimeConfig::default(),
            &ComposeConfig::default(),
            Escalation::Sudo,
        )
        .expect("compose");
        assert_eq!(status, StepStatus::AlreadyPresent);
        assert_eq!(host.commands(), vec!["docker compose version".to_string()]);
    }

    #[test]
    fn missing_plugin_is_installed_with_package_manager() {
        let host = FakeHost::new().with_program("docker");
        let status = ensure_compose_plugin_installed(
            &host,
            &RuntimeConfig::default(),
            &ComposeConfig::default(),
            Escalation::Sudo,
        )
        .expect("compose");
        assert_eq!(status, StepStatus::Installed);
        assert_eq!(
            host.commands(),
            vec![
                "docker compose version".to_string(),
                "sudo apt-get update".to_string(),
                "sudo apt-get install -y docker-compose-plugin".to_string(),
                "docker compose version".to_string(),
            ]
        );
    }

    #[test]
    fn package_manager_failure_is_fatal() {
        let host = FakeHost::new().with_program("docker").fail_on(
            "apt-get install",
            100,
            "E: Could not get lock /var/lib/dpkg/lock-frontend. It is held by process 812 (apt-get)",
        );
        let err = ensure_compose_plugin_installed(
            &host,
            &RuntimeConfig::default(),
            &ComposeConfig::default(),
            Escalation::Sudo,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ProvisionError::Installation {
                step: Step::ComposePlugin,
                code: Some(100),
                ..
            }
        ));
    }
}
