//! Ingress port rule insertion and persistence.

use tracing::{info, instrument, warn};

use crate::core::diagnostics::failure_text;
use crate::core::firewall::IngressRule;
use crate::core::types::{FirewallOutcome, PersistenceWarning, Step};
use crate::error::ProvisionError;
use crate::io::config::FirewallConfig;
use crate::io::host::{CommandSpec, HostState};
use crate::io::privilege::{Escalation, run_checked, run_unchecked};

const IPTABLES: &str = "iptables";

/// Admit new inbound TCP connections on `port`, then try to persist the rule set.
///
/// Insertion happens at the configured fixed position. Without
/// `check_existing`, every call inserts another copy of the rule. Persistence
/// failures never fail the step; they come back as a warning in the outcome.
#[instrument(skip_all, fields(port = port))]
pub fn open_ingress_port<H: HostState>(
    host: &H,
    cfg: &FirewallConfig,
    port: u16,
    escalation: Escalation,
) -> Result<FirewallOutcome, ProvisionError> {
    let rule = IngressRule::new(cfg.chain.clone(), cfg.position, port);

    let already_present = cfg.check_existing && rule_exists(host, &rule, escalation)?;
    if already_present {
        info!(chain = %rule.chain, "ingress rule already present, not inserting");
    } else {
        run_checked(
            host,
            Step::Firewall,
            &escalation.apply(CommandSpec::new(IPTABLES, rule.insert_args())),
        )?;
        info!(chain = %rule.chain, position = rule.position, "inserted ingress rule");
    }

    let (persisted, warning) = match persist_rules(host, &cfg.persist_command, escalation) {
        Ok(persisted) => (persisted, None),
        Err(warning) => {
            warn!(%warning, "continuing without persisted firewall rules");
            (false, Some(warning))
        }
    };

    Ok(FirewallOutcome {
        port,
        inserted: !already_present,
        already_present,
        persisted,
        warning,
    })
}

fn rule_exists<H: HostState>(
    host: &H,
    rule: &IngressRule,
    escalation: Escalation,
) -> Result<bool, ProvisionError> {
    let probe = escalation.apply(CommandSpec::new(IPTABLES, rule.check_args()));
    Ok(run_unchecked(host, Step::Firewall, &probe)?.success())
}

/// Save the current rule set. `Ok(false)` when persistence is disabled.
///
/// The helper is not looked up on the caller's PATH first: under sudo it
/// resolves through `secure_path`, which may include sbin directories the
/// caller's PATH lacks.
fn persist_rules<H: HostState>(
    host: &H,
    command: &[String],
    escalation: Escalation,
) -> Result<bool, PersistenceWarning> {
    let Some((program, args)) = command.split_first() else {
        return Ok(false);
    };
    let spec = CommandSpec::new(program.as_str(), args.iter().map(String::as_str));
    let shown = spec.display();

    match host.run(&escalation.apply(spec)) {
        Ok(out) if out.success() => {
            info!(command = %shown, "persisted firewall rules");
            Ok(true)
        }
        Ok(out) => Err(PersistenceWarning {
            command: shown,
            reason: format!(
                "exit code {:?}: {}",
                out.code,
                failure_text(&out.stdout, &out.stderr)
            ),
        }),
        Err(err) => Err(PersistenceWarning {
            command: shown,
            reason: format!("{err:#}"),
        }),
    }
}
