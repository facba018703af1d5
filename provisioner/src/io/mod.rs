//! I/O for the provisioning steps: host access, config and the steps themselves.

pub mod compose;
pub mod config;
pub mod env_file;
pub mod firewall;
pub mod host;
pub mod privilege;
pub mod process;
pub mod runtime;
