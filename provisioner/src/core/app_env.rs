//! Environment consumed by the application container at startup.
//!
//! The provisioner only supplies defaults; values are not validated.

use serde::{Deserialize, Serialize};

/// Keys the application reads but the provisioner never fills in, grouped by
/// integration. Written commented out so operators can see what to set.
const PLACEHOLDER_SECTIONS: &[(&str, &[&str])] = &[
    ("Flask", &["SECRET_KEY"]),
    (
        "Email alerts",
        &[
            "SMTP_HOST",
            "SMTP_PORT",
            "SMTP_USERNAME",
            "SMTP_PASSWORD",
            "SMTP_FROM_EMAIL",
        ],
    ),
    ("Telegram bot", &["TELEGRAM_BOT_TOKEN", "TELEGRAM_TRADING_ENABLED"]),
    ("Discord", &["DISCORD_WEBHOOK_URL"]),
    (
        "Alpaca trading",
        &["ALPACA_API_KEY", "ALPACA_SECRET_KEY", "ALPACA_BASE_URL"],
    ),
    ("Binance trading", &["BINANCE_API_KEY", "BINANCE_SECRET_KEY"]),
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AppEnv {
    /// Interface the application server binds to (`HOST`).
    pub host: String,
    /// Port the application server listens on (`PORT`).
    pub port: u16,
    /// Verbose application debugging (`FLASK_DEBUG`).
    pub debug: bool,
    /// Location of the persisted data file (`DATABASE_PATH`).
    pub database_path: String,
}

impl Default for AppEnv {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            debug: false,
            database_path: "/app/data/stockpulse.db".to_string(),
        }
    }
}

impl AppEnv {
    /// Variables in the order they are written to the env file.
    pub fn vars(&self) -> Vec<(&'static str, String)> {
        vec![
            ("HOST", self.host.clone()),
            ("PORT", self.port.to_string()),
            // The app compares against the literal string "True".
            (
                "FLASK_DEBUG",
                if self.debug { "True" } else { "False" }.to_string(),
            ),
            ("DATABASE_PATH", self.database_path.clone()),
        ]
    }

    /// Render as `KEY=value` lines with a trailing newline, followed by
    /// commented placeholders for the integration secrets.
    pub fn render_env_file(&self) -> String {
        let mut out = String::from("# StockPulse container environment\n");
        for (key, value) in self.vars() {
            out.push_str(&format!("{key}={value}\n"));
        }
        for (section, keys) in PLACEHOLDER_SECTIONS {
            out.push_str(&format!("\n# {section}\n"));
            for key in *keys {
                out.push_str(&format!("# {key}=\n"));
            }
        }
        out
    }
}
