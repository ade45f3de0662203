//! Autonomous Blender modeling session orchestrator.
//!
//! This crate implements a quality-gated control loop that drives a live
//! Blender instance from a natural-language requirement: plan discrete
//! modeling steps, execute each one through the backend's tool interface,
//! capture a viewport screenshot, score it with a vision critique, and refine
//! the step (bounded retries) until it passes or the budget is exhausted.
//! The architecture enforces a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (score parsing, plan parsing,
//!   gate decisions, resume caps, error classification). No I/O, fully
//!   testable in isolation.
//! - **[`io`]**: Side-effecting collaborators (modeling backend socket,
//!   model HTTP clients, config, snapshot persistence). Isolated to enable
//!   scripted fakes in tests.
//! - **[`agents`]**: One module per loop role (inspector, planner, resume
//!   detector, executor, critic, refiner) combining prompt templates with
//!   model and backend calls.
//!
//! Orchestration modules ([`step`], [`run`]) coordinate the agents into the
//! session state machine exposed through [`run::Orchestrator`].

pub mod agents;
pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod run;
pub mod session;
pub mod step;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
