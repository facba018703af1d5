//! `provision`: prepare this host to run the StockPulse container stack.
//!
//! Runs with no arguments. Installs the container runtime and compose plugin
//! if missing, opens the ingress port and prints what to do next.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use provisioner::error::ProvisionError;
use provisioner::exit_codes;
use provisioner::io::config::{DEFAULT_CONFIG_PATH, load_config};
use provisioner::io::host::SystemHost;
use provisioner::logging;
use provisioner::provision::{guidance_for, print_guidance, run_provision};

#[derive(Parser)]
#[command(
    name = "provision",
    version,
    about = "Prepare this host to run the StockPulse container stack"
)]
struct Cli {
    /// Config file; defaults apply when it does not exist.
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    /// Ingress port to open (overrides `firewall.port`).
    #[arg(long)]
    port: Option<u16>,
    /// Print the run report as JSON instead of the operator guidance.
    #[arg(long)]
    json: bool,
}

fn main() {
    logging::init();
    let cli = Cli::parse();
    if let Err(err) = run(&cli) {
        eprintln!("error: {:#}", err);
        let code = match err.downcast_ref::<ProvisionError>() {
            Some(provision_err) => {
                eprintln!("host may be partially provisioned; fix the problem and re-run provision");
                provision_err.exit_code()
            }
            None => exit_codes::FAILED,
        };
        std::process::exit(code);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let mut cfg = load_config(&cli.config)?;
    if let Some(port) = cli.port {
        cfg.firewall.port = port;
        cfg.validate().context("validate --port")?;
    }

    let host = SystemHost::new(cfg.command_timeout(), cfg.output_limit_bytes);
    let report = run_provision(&host, &cfg)?;

    let mut stdout = std::io::stdout().lock();
    if cli.json {
        let mut payload = serde_json::to_string_pretty(&report).context("serialize report")?;
        payload.push('\n');
        stdout
            .write_all(payload.as_bytes())
            .context("write report")?;
        return Ok(());
    }
    print_guidance(&mut stdout, &guidance_for(&host, &cfg, &report))
}
