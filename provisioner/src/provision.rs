//! Orchestration for a full provisioning run.
//!
//! Steps run strictly in order: container runtime, compose plugin, ingress
//! port, then the optional env file. The first fatal error aborts the run and
//! leaves the host partially provisioned; re-running skips completed work
//! through each step's existence check.

use std::io::Write;

use anyhow::{Context, Result};
use tracing::{info, instrument};

use crate::core::guidance::Guidance;
use crate::core::types::ProvisionReport;
use crate::error::ProvisionError;
use crate::io::compose::ensure_compose_plugin_installed;
use crate::io::config::ProvisionConfig;
use crate::io::env_file::write_env_template;
use crate::io::firewall::open_ingress_port;
use crate::io::host::HostState;
use crate::io::privilege::Escalation;
use crate::io::runtime::ensure_runtime_installed;

/// Bring `host` to a state where the workload can run and be reached.
#[instrument(skip_all, fields(port = cfg.firewall.port))]
pub fn run_provision<H: HostState>(
    host: &H,
    cfg: &ProvisionConfig,
) -> Result<ProvisionReport, ProvisionError> {
    let escalation = Escalation::resolve(host, &cfg.privilege)?;

    let runtime = ensure_runtime_installed(host, &cfg.runtime, escalation)?;
    let compose_plugin =
        ensure_compose_plugin_installed(host, &cfg.runtime, &cfg.compose, escalation)?;
    let firewall = open_ingress_port(host, &cfg.firewall, cfg.firewall.port, escalation)?;
    let env_file = cfg
        .app
        .env_file
        .as_deref()
        .map(|path| write_env_template(path, &cfg.app.env))
        .transpose()?;

    let report = ProvisionReport {
        runtime: runtime.status,
        compose_plugin,
        firewall,
        env_file,
        requires_relogin: runtime.requires_relogin,
    };
    info!(
        runtime = ?report.runtime,
        compose_plugin = ?report.compose_plugin,
        requires_relogin = report.requires_relogin,
        persisted = report.firewall.persisted,
        "host provisioned"
    );
    Ok(report)
}

/// Guidance inputs for a finished run.
pub fn guidance_for<H: HostState>(
    host: &H,
    cfg: &ProvisionConfig,
    report: &ProvisionReport,
) -> Guidance {
    let user = host
        .current_user()
        .unwrap_or_else(|_| "your user".to_string());
    Guidance {
        runtime: cfg.runtime.binary.clone(),
        group: cfg.runtime.group.clone(),
        user,
        repo_url: cfg.guidance.repo_url.clone(),
        project_dir: cfg.guidance.project_dir.clone(),
        env_file: cfg
            .app
            .env_file
            .as_ref()
            .map(|path| path.display().to_string()),
        public_host: cfg.guidance.public_host.clone(),
        port: cfg.firewall.port,
        requires_relogin: false,
        warnings: Vec::new(),
    }
    .with_report(report)
}

/// Write operator instructions to `out`.
pub fn print_guidance<W: Write>(out: &mut W, guidance: &Guidance) -> Result<()> {
    let text = guidance.render()?;
    out.write_all(text.as_bytes()).context("write guidance")?;
    out.flush().context("flush guidance")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Step, StepStatus};
    use crate::test_support::FakeHost;

    #[test]
    fn fresh_host_is_fully_provisioned() {
        let host = FakeHost::fresh();
        let report = run_provision(&host, &ProvisionConfig::default()).expect("provision");
        assert_eq!(report.runtime, StepStatus::Installed);
        assert_eq!(report.compose_plugin, StepStatus::Installed);
        assert!(report.requires_relogin);
        assert!(report.firewall.warning.is_none());
        assert!(host.find_program("docker").is_some());
        assert!(host.compose_installed());
        assert!(host.accepts_new_tcp(8080));
    }

    #[test]
    fn runtime_failure_skips_later_steps() {
        let host =
            FakeHost::fresh().fail_on("sh ", 100, "E: Unable to fetch some archives");
        let err = run_provision(&host, &ProvisionConfig::default()).unwrap_err();
        assert_eq!(err.step(), Step::Runtime);
        assert_eq!(err.exit_code(), 100);
        let commands = host.commands();
        assert!(!commands.iter().any(|c| c.contains("compose")));
        assert!(!commands.iter().any(|c| c.contains("iptables")));
    }

    #[test]
    fn guidance_reflects_report() {
        let host = FakeHost::fresh();
        let cfg = ProvisionConfig::default();
        let report = run_provision(&host, &cfg).expect("provision");
        let guidance = guidance_for(&host, &cfg, &report);
        assert!(guidance.requires_relogin);
        assert_eq!(guidance.user, "ubuntu");

        let mut buf = Vec::new();
        print_guidance(&mut buf, &guidance).expect("print");
        let text = String::from_utf8(buf).expect("utf8");
        assert!(text.contains("docker compose up -d --build"));
        assert!(text.contains("newgrp docker"));
    }

    #[test]
    fn persistence_warning_appears_once_in_json_report() {
        let host = FakeHost::fresh().without_installed("netfilter-persistent");
        let report = run_provision(&host, &ProvisionConfig::default()).expect("provision");
        let json = serde_json::to_value(&report).expect("json");
        assert!(json.get("warnings").is_none());
        assert_eq!(
            json["firewall"]["warning"]["command"],
            "netfilter-persistent save"
        );

        let guidance = guidance_for(&host, &ProvisionConfig::default(), &report);
        assert_eq!(guidance.warnings.len(), 1);
    }

    #[test]
    fn env_file_written_when_configured() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut cfg = ProvisionConfig::default();
        cfg.app.env_file = Some(temp.path().join(".env"));
        let report = run_provision(&FakeHost::fresh(), &cfg).expect("provision");
        assert_eq!(
            report.env_file,
            Some(crate::core::types::EnvFileOutcome::Written)
        );
        assert!(temp.path().join(".env").exists());
    }
}
