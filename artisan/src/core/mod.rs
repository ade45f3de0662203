//! Pure, deterministic session logic.
//!
//! Modules here take parsed inputs and return decisions without touching the
//! backend, the models, or the filesystem, so every policy in the control
//! loop is testable in isolation.

pub mod classifier;
pub mod gate;
pub mod plan;
pub mod resume;
pub mod score;
pub mod tool_request;
pub mod types;
