//! Packet-filter rule model for the ingress port.
//!
//! Builds `iptables` argument vectors; executing them is left to `io::firewall`.

use serde::{Deserialize, Serialize};

/// A rule admitting new inbound TCP connections on one port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngressRule {
    pub chain: String,
    /// 1-based position for `iptables -I`.
    pub position: u32,
    pub port: u16,
}

impl IngressRule {
    pub fn new(chain: impl Into<String>, position: u32, port: u16) -> Self {
        Self {
            chain: chain.into(),
            position,
            port,
        }
    }

    /// Match/target part shared by insert and check.
    pub fn rule_spec(&self) -> Vec<String> {
        [
            "-m",
            "state",
            "--state",
            "NEW",
            "-p",
            "tcp",
            "--dport",
            &self.port.to_string(),
            "-j",
            "ACCEPT",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    /// `iptables` arguments that insert the rule at its fixed position.
    pub fn insert_args(&self) -> Vec<String> {
        let mut args = vec![
            "-I".to_string(),
            self.chain.clone(),
            self.position.to_string(),
        ];
        args.extend(self.rule_spec());
        args
    }

    /// `iptables` arguments that exit 0 iff an equivalent rule already exists.
    pub fn check_args(&self) -> Vec<String> {
        let mut args = vec!["-C".to_string(), self.chain.clone()];
        args.extend(self.rule_spec());
        args
    }
}

/// Extract the `--dport` value from an `iptables` argument list.
pub fn dport_of(args: &[String]) -> Option<u16> {
    args.iter()
        .position(|arg| arg == "--dport")
        .and_then(|idx| args.get(idx + 1))
        .and_then(|port| port.parse().ok())
}
