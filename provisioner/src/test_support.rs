//! Test-only scripted host.
//!
//! [`FakeHost`] simulates just enough of a Debian-like machine for the
//! provisioning steps: PATH contents, the install script, the compose
//! package and an input chain of ACCEPT rules. Every command is recorded.

use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::{Result, anyhow};

use crate::core::firewall::dport_of;
use crate::io::host::{CommandSpec, HostState};
use crate::io::process::CommandOutput;

#[derive(Debug, Clone)]
struct ScriptedFailure {
    pattern: String,
    code: i32,
    stderr: String,
}

#[derive(Debug)]
pub struct FakeHost {
    root: bool,
    user: String,
    runtime_binary: String,
    programs: RefCell<BTreeSet<String>>,
    uninstalled: BTreeSet<String>,
    compose: Cell<bool>,
    accept_rules: RefCell<Vec<u16>>,
    failures: Vec<ScriptedFailure>,
    log: RefCell<Vec<String>>,
}

impl Default for FakeHost {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeHost {
    /// Non-root host with an empty PATH and no rules.
    pub fn new() -> Self {
        Self {
            root: false,
            user: "ubuntu".to_string(),
            runtime_binary: "docker".to_string(),
            programs: RefCell::new(BTreeSet::new()),
            uninstalled: BTreeSet::new(),
            compose: Cell::new(false),
            accept_rules: RefCell::new(Vec::new()),
            failures: Vec::new(),
            log: RefCell::new(Vec::new()),
        }
    }

    /// Cloud image defaults: sudo and the rule persistence helper, no runtime.
    pub fn fresh() -> Self {
        Self::new()
            .with_program("sudo")
            .with_program("netfilter-persistent")
    }

    pub fn as_root(mut self) -> Self {
        self.root = true;
        self
    }

    pub fn with_user(mut self, user: &str) -> Self {
        self.user = user.to_string();
        self
    }

    pub fn with_program(self, program: &str) -> Self {
        self.programs.borrow_mut().insert(program.to_string());
        self
    }

    pub fn with_compose(self) -> Self {
        self.compose.set(true);
        self
    }

    /// Remove `program` from the machine entirely, not just from the caller's PATH.
    ///
    /// Programs absent from PATH still run by default, as they do through
    /// sudo's `secure_path`.
    pub fn without_installed(mut self, program: &str) -> Self {
        self.programs.borrow_mut().remove(program);
        self.uninstalled.insert(program.to_string());
        self
    }

    /// Make every command whose line (without `sudo`) starts with `pattern` exit with `code`.
    pub fn fail_on(mut self, pattern: &str, code: i32, stderr: &str) -> Self {
        self.failures.push(ScriptedFailure {
            pattern: pattern.to_string(),
            code,
            stderr: stderr.to_string(),
        });
        self
    }

    /// Command lines run so far, as displayed (including `sudo`).
    pub fn commands(&self) -> Vec<String> {
        self.log.borrow().clone()
    }

    pub fn clear_commands(&self) {
        self.log.borrow_mut().clear();
    }

    pub fn compose_installed(&self) -> bool {
        self.compose.get()
    }

    /// Whether the input chain admits a new inbound TCP connection on `port`.
    pub fn accepts_new_tcp(&self, port: u16) -> bool {
        self.accept_rules.borrow().contains(&port)
    }

    pub fn rule_count(&self, port: u16) -> usize {
        self.accept_rules
            .borrow()
            .iter()
            .filter(|p| **p == port)
            .count()
    }

    fn simulate(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
        let ok = || CommandOutput::exited(0, "", "");
        if program == self.runtime_binary {
            if !self.programs.borrow().contains(program) {
                return Err(anyhow!("spawn command: No such file or directory (os error 2)"));
            }
            if args.first().map(String::as_str) == Some("compose") {
                return Ok(if self.compose.get() {
                    CommandOutput::exited(0, "Docker Compose version v2.29.1\n", "")
                } else {
                    CommandOutput::exited(1, "", "docker: 'compose' is not a docker command.\n")
                });
            }
            return Ok(ok());
        }
        match program {
            "sh" => {
                self.programs
                    .borrow_mut()
                    .insert(self.runtime_binary.clone());
                Ok(ok())
            }
            "apt-get" => {
                if args.first().map(String::as_str) == Some("install")
                    && args.iter().any(|arg| arg.contains("compose"))
                {
                    self.compose.set(true);
                }
                Ok(ok())
            }
            "iptables" => {
                let port = dport_of(args);
                match (args.first().map(String::as_str), port) {
                    (Some("-I"), Some(port)) => {
                        self.accept_rules.borrow_mut().push(port);
                        Ok(ok())
                    }
                    (Some("-C"), Some(port)) if self.accepts_new_tcp(port) => Ok(ok()),
                    (Some("-C"), _) => Ok(CommandOutput::exited(
                        1,
                        "",
                        "iptables: Bad rule (does a matching rule exist in that chain?).\n",
                    )),
                    _ => Ok(ok()),
                }
            }
            _ => Ok(ok()),
        }
    }
}

impl HostState for FakeHost {
    fn find_program(&self, program: &str) -> Option<PathBuf> {
        self.programs
            .borrow()
            .contains(program)
            .then(|| PathBuf::from("/usr/bin").join(program))
    }

    fn is_root(&self) -> Result<bool> {
        Ok(self.root)
    }

    fn current_user(&self) -> Result<String> {
        Ok(self.user.clone())
    }

    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        self.log.borrow_mut().push(spec.display());

        let (program, args, sudo) = match (spec.program.as_str(), spec.args.split_first()) {
            ("sudo", Some((program, args))) => (program.as_str(), args, true),
            _ => (spec.program.as_str(), spec.args.as_slice(), false),
        };
        if self.uninstalled.contains(program) {
            if sudo {
                return Ok(CommandOutput::exited(
                    1,
                    "",
                    format!("sudo: {program}: command not found\n"),
                ));
            }
            return Err(anyhow!(
                "spawn command: No such file or directory (os error 2)"
            ));
        }
        let line = CommandSpec::new(program, args.iter().map(String::as_str)).display();
        if let Some(failure) = self
            .failures
            .iter()
            .find(|failure| line.starts_with(&failure.pattern))
        {
            return Ok(CommandOutput::exited(
                failure.code,
                "",
                failure.stderr.clone(),
            ));
        }
        self.simulate(program, args)
    }
}
