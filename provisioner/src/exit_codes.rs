//! Exit codes for the `provision` binary.
//!
//! A failed external command propagates its own code instead of [`FAILED`].

/// Host is provisioned.
pub const OK: i32 = 0;
/// Invalid config, or a failing step without an exit code of its own.
pub const FAILED: i32 = 1;
