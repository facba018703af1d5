//! Host provisioner for the StockPulse container deployment.
//!
//! Prepares a single host to run one containerized workload: installs the
//! container runtime and its compose plugin when missing, opens one ingress
//! port in the packet filter and prints operator guidance.
//!
//! - **[`core`]**: Pure logic (rule arguments, guidance text, env defaults,
//!   failure classification). No I/O.
//! - **[`io`]**: Side effects, all routed through the [`io::host::HostState`]
//!   capability so tests can substitute a scripted host.
//!
//! [`provision`] runs the steps in order and produces a report.

pub mod core;
pub mod error;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod provision;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
