//! Shared deterministic types for the session core.
//!
//! These types define stable contracts between loop components. They must not
//! depend on external state or I/O and must remain deterministic across runs.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Parsed view of the modeling backend's scene report.
///
/// An empty object list is a valid state (default scene or parse-tolerant
/// fallback), never an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SceneState {
    /// Object names reported by the backend, in report order.
    pub objects: Vec<String>,
    /// Raw scene report text, forwarded verbatim into prompts.
    pub raw: String,
}

impl SceneState {
    /// Build a scene state from a backend `get_scene_info` reply.
    ///
    /// The reply is expected to be JSON with an `objects` array of either
    /// `{"name": ...}` entries or plain strings. Anything unparseable yields
    /// an empty object list with the raw text preserved.
    pub fn from_report(report: &str) -> Self {
        let objects = serde_json::from_str::<Value>(report)
            .ok()
            .and_then(|value| {
                let entries = value.get("objects")?.as_array()?.clone();
                Some(
                    entries
                        .iter()
                        .filter_map(|entry| {
                            entry
                                .get("name")
                                .and_then(Value::as_str)
                                .or_else(|| entry.as_str())
                                .map(str::to_string)
                        })
                        .collect(),
                )
            })
            .unwrap_or_default();
        Self {
            objects,
            raw: report.to_string(),
        }
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }
}

/// Outcome of one call into the modeling backend, recorded append-only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolInvocationResult {
    pub success: bool,
    pub tool_name: String,
    pub args: Value,
    /// Result payload on success, error message on failure.
    pub result: String,
}

/// One captured viewport image, tagged by step and refinement attempt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Snapshot {
    pub step_index: usize,
    /// 0 for the initial capture of a step, 1..N for refinement re-captures.
    pub attempt: u32,
    pub path: PathBuf,
}

/// Parsed outcome of critiquing one snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QualityVerdict {
    pub step_index: usize,
    pub attempt: u32,
    /// Absent when no numeric score could be extracted from the critique.
    pub score: Option<u8>,
    pub critique: String,
    pub needs_refinement: bool,
}

/// Per-step refinement counters, reset when the cursor advances.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefinementState {
    pub attempts: u32,
    pub last_critique: Option<String>,
}

/// Control-loop phase for one session.
///
/// `Complete` and `Halted` are terminal; `Halted` permits no outgoing
/// transitions at all, so a critically failed session can never resume
/// executing within the same run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Inspecting,
    Planning,
    Resuming,
    Executing,
    Capturing,
    Assessing,
    Refining,
    Advancing,
    Complete,
    Halted,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Complete | Phase::Halted)
    }

    /// Whether the machine may move from `self` into `next`.
    pub fn permits(self, next: Phase) -> bool {
        match self {
            Phase::Halted => false,
            Phase::Complete => false,
            Phase::Inspecting => matches!(next, Phase::Planning | Phase::Halted),
            Phase::Planning => {
                matches!(next, Phase::Resuming | Phase::Executing | Phase::Halted)
            }
            Phase::Resuming => matches!(next, Phase::Executing | Phase::Complete | Phase::Halted),
            Phase::Executing => matches!(next, Phase::Capturing | Phase::Halted),
            Phase::Capturing => matches!(next, Phase::Assessing | Phase::Halted),
            Phase::Assessing => {
                matches!(next, Phase::Refining | Phase::Advancing | Phase::Halted)
            }
            Phase::Refining => matches!(next, Phase::Capturing | Phase::Halted),
            Phase::Advancing => {
                matches!(next, Phase::Executing | Phase::Complete | Phase::Halted)
            }
        }
    }
}
