//! Deterministic, pure logic shared by the provisioning steps.
//!
//! Core modules must be free of I/O side effects. They build command
//! arguments, classify output and render text for the `io` layer.

pub mod app_env;
pub mod diagnostics;
pub mod firewall;
pub mod guidance;
pub mod types;
