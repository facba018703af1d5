//! Operator instructions printed at the end of a run.

use std::sync::LazyLock;

use anyhow::{Context, Result};
use minijinja::Environment;
use serde::Serialize;

use crate::core::types::ProvisionReport;

const GUIDANCE_TEMPLATE: &str = r#"Host provisioning complete.
{% if requires_relogin %}

NOTE: {{ user }} was added to the '{{ group }}' group. Log out and back in
(or run `newgrp {{ group }}`) before running {{ runtime }} without sudo.
{% endif %}

Next steps:
  1. Clone the application:
       git clone {{ repo_url }} {{ project_dir }}
       cd {{ project_dir }}
{% if env_file %}
  2. Review the environment file and add your secrets:
       $EDITOR {{ env_file }}
{% else %}
  2. Create the environment file and add your secrets:
       cp .env.example .env
       $EDITOR .env
{% endif %}
  3. Build and start the stack:
       {{ runtime }} compose up -d --build
  4. Follow the logs:
       {{ runtime }} compose logs -f
  5. Stop the stack:
       {{ runtime }} compose down

The app listens on http://{{ public_host }}:{{ port }}
{% for warning in warnings %}

WARNING: {{ warning }}
{% endfor %}
"#;

static ENGINE: LazyLock<Environment<'static>> = LazyLock::new(|| {
    let mut env = Environment::new();
    env.set_trim_blocks(true);
    env.set_keep_trailing_newline(true);
    env.add_template("guidance", GUIDANCE_TEMPLATE)
        .expect("guidance template should be valid");
    env
});

/// Inputs for the guidance text.
#[derive(Debug, Clone, Serialize)]
pub struct Guidance {
    pub runtime: String,
    pub group: String,
    pub user: String,
    pub repo_url: String,
    pub project_dir: String,
    pub env_file: Option<String>,
    pub public_host: String,
    pub port: u16,
    pub requires_relogin: bool,
    pub warnings: Vec<String>,
}

impl Guidance {
    /// Copy run-dependent fields (relogin, warnings, port) from a report.
    pub fn with_report(mut self, report: &ProvisionReport) -> Self {
        self.requires_relogin = report.requires_relogin;
        self.port = report.firewall.port;
        self.warnings = report
            .firewall
            .warning
            .iter()
            .map(|w| w.to_string())
            .collect();
        self
    }

    pub fn render(&self) -> Result<String> {
        let template = ENGINE
            .get_template("guidance")
            .context("load guidance template")?;
        template.render(self).context("render guidance")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guidance() -> Guidance {
        Guidance {
            runtime: "docker".to_string(),
            group: "docker".to_string(),
            user: "ubuntu".to_string(),
            repo_url: "https://github.com/example/stockpulse.git".to_string(),
            project_dir: "stockpulse".to_string(),
            env_file: None,
            public_host: "<server-ip>".to_string(),
            port: 8080,
            requires_relogin: false,
            warnings: Vec::new(),
        }
    }

    #[test]
    fn renders_compose_lifecycle_commands() {
        let text = guidance().render().expect("render");
        assert!(text.contains("git clone https://github.com/example/stockpulse.git stockpulse"));
        assert!(text.contains("cp .env.example .env"));
        assert!(text.contains("docker compose up -d --build"));
        assert!(text.contains("docker compose logs -f"));
        assert!(text.contains("docker compose down"));
        assert!(text.contains("http://<server-ip>:8080"));
        assert!(!text.contains("NOTE:"));
        assert!(!text.contains("WARNING:"));
    }

    #[test]
    fn renders_relogin_notice_and_warnings() {
        let mut g = guidance();
        g.requires_relogin = true;
        g.warnings = vec!["firewall rules not persisted".to_string()];
        let text = g.render().expect("render");
        assert!(text.contains("NOTE: ubuntu was added to the 'docker' group"));
        assert!(text.contains("WARNING: firewall rules not persisted"));
    }

    #[test]
    fn points_at_configured_env_file() {
        let mut g = guidance();
        g.env_file = Some("/srv/stockpulse/.env".to_string());
        let text = g.render().expect("render");
        assert!(text.contains("$EDITOR /srv/stockpulse/.env"));
        assert!(!text.contains("cp .env.example .env"));
    }
}
