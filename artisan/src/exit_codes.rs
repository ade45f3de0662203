//! Stable exit codes for artisan CLI commands.

/// Command succeeded and the session ran to completion.
pub const OK: i32 = 0;
/// Command failed due to invalid input/config or a fatal session-start error.
pub const INVALID: i32 = 1;
/// The session finished without success (critical halt or partial run).
pub const HALTED: i32 = 2;
