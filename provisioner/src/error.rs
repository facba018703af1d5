//! Error taxonomy for the provisioning procedure.
//!
//! Every variant aborts the run. Firewall persistence failures are reported as
//! [`PersistenceWarning`](crate::core::types::PersistenceWarning) values instead.

use std::path::PathBuf;

use thiserror::Error;

use crate::core::types::Step;
use crate::exit_codes;

#[derive(Debug, Error)]
pub enum ProvisionError {
    /// Package manager, download or install script failure.
    #[error("{step}: `{command}` failed (exit code {}):\n{diagnostics}", display_code(.code))]
    Installation {
        step: Step,
        command: String,
        code: Option<i32>,
        diagnostics: String,
    },
    /// The command was refused for lack of privilege.
    #[error("{step}: `{command}` needs elevated privileges:\n{diagnostics}")]
    Permission {
        step: Step,
        command: String,
        code: Option<i32>,
        diagnostics: String,
    },
    /// The program could not be started at all.
    #[error("{step}: could not run `{command}`: {reason}")]
    Spawn {
        step: Step,
        command: String,
        reason: String,
    },
    #[error("{step}: could not write {}", .path.display())]
    Write {
        step: Step,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ProvisionError {
    pub fn step(&self) -> Step {
        match self {
            ProvisionError::Installation { step, .. }
            | ProvisionError::Permission { step, .. }
            | ProvisionError::Spawn { step, .. }
            | ProvisionError::Write { step, .. } => *step,
        }
    }

    /// Process exit code: the failing command's own code when it has one.
    pub fn exit_code(&self) -> i32 {
        match self {
            ProvisionError::Installation { code, .. } | ProvisionError::Permission { code, .. } => {
                code.filter(|c| *c != exit_codes::OK)
                    .unwrap_or(exit_codes::FAILED)
            }
            ProvisionError::Spawn { .. } | ProvisionError::Write { .. } => exit_codes::FAILED,
        }
    }
}

fn display_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "none".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_code_propagates_command_code() {
        let err = ProvisionError::Installation {
            step: Step::ComposePlugin,
            command: "apt-get update".to_string(),
            code: Some(100),
            diagnostics: "E: network unreachable".to_string(),
        };
        assert_eq!(err.exit_code(), 100);
        assert_eq!(err.step(), Step::ComposePlugin);
        assert!(err.to_string().contains("exit code 100"));
        assert!(err.to_string().contains("E: network unreachable"));
    }

    #[test]
    fn exit_code_falls_back_when_command_had_none() {
        let err = ProvisionError::Installation {
            step: Step::Runtime,
            command: "sh install.sh".to_string(),
            code: None,
            diagnostics: "killed".to_string(),
        };
        assert_eq!(err.exit_code(), exit_codes::FAILED);

        let err = ProvisionError::Spawn {
            step: Step::Firewall,
            command: "iptables".to_string(),
            reason: "No such file or directory".to_string(),
        };
        assert_eq!(err.exit_code(), exit_codes::FAILED);
    }
}
