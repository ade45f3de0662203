//! Side-effecting collaborators: backend socket, model clients, config,
//! and snapshot persistence. Isolated behind traits to enable scripted
//! fakes in tests.

pub mod backend;
pub mod config;
pub mod model;
pub mod snapshot;
