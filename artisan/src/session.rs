//! Session identity, run-scoped state, and the final run report.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::core::types::{QualityVerdict, Snapshot, ToolInvocationResult};

/// Deterministic session identifier.
///
/// Derived from a caller-supplied stable identifier (typically the
/// requirement text), never from a filesystem path, so re-launching against
/// the same requirement resolves to the same session and can resume.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey(String);

impl SessionKey {
    /// First 16 hex chars of SHA-256 over the stable identifier.
    pub fn derive(stable_id: &str) -> Self {
        let digest = Sha256::digest(stable_id.as_bytes());
        let hex: String = digest
            .iter()
            .take(8)
            .map(|byte| format!("{byte:02x}"))
            .collect();
        Self(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Mutable state for one modeling run, exclusively owned by its orchestrator.
#[derive(Debug, Clone)]
pub struct Session {
    pub key: SessionKey,
    /// Step cursor; non-decreasing, never exceeds the plan length.
    pub current_step: usize,
    /// Steps executed within this run (excludes steps skipped by resume).
    pub steps_executed: usize,
    pub is_complete: bool,
    pub is_resuming: bool,
    /// Terminal: set once, halts the loop, never cleared.
    pub critical_error: Option<String>,
    pub tool_results: Vec<ToolInvocationResult>,
    pub verdicts: Vec<QualityVerdict>,
    pub snapshots: Vec<Snapshot>,
    pub refinement_total: u32,
}

impl Session {
    pub fn new(key: SessionKey) -> Self {
        Self {
            key,
            current_step: 0,
            steps_executed: 0,
            is_complete: false,
            is_resuming: false,
            critical_error: None,
            tool_results: Vec::new(),
            verdicts: Vec::new(),
            snapshots: Vec::new(),
            refinement_total: 0,
        }
    }

    /// Mean of the parseable quality scores across all verdicts.
    pub fn average_quality(&self) -> Option<f64> {
        let scores: Vec<u8> = self.verdicts.iter().filter_map(|v| v.score).collect();
        if scores.is_empty() {
            return None;
        }
        let sum: u32 = scores.iter().map(|&score| u32::from(score)).sum();
        Some(f64::from(sum) / scores.len() as f64)
    }
}

/// Aggregated outcome of one `run()` call, returned to the caller instead of
/// letting in-loop failures escape as errors.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub session_id: String,
    pub steps_executed: usize,
    pub total_steps: usize,
    pub screenshots_captured: usize,
    pub screenshot_directory: String,
    pub success: bool,
    pub average_quality: Option<f64>,
    pub refinement_count: u32,
    /// Present when the run halted; names the offending step and error.
    pub error: Option<String>,
    pub tool_results: Vec<ToolInvocationResult>,
}

impl RunReport {
    pub fn from_session(session: &Session, total_steps: usize, screenshot_dir: &Path) -> Self {
        Self {
            session_id: session.key.to_string(),
            steps_executed: session.steps_executed,
            total_steps,
            screenshots_captured: session.snapshots.len(),
            screenshot_directory: screenshot_dir.display().to_string(),
            success: session.is_complete && session.critical_error.is_none(),
            average_quality: session.average_quality(),
            refinement_count: session.refinement_total,
            error: session.critical_error.clone(),
            tool_results: session.tool_results.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn session_key_is_deterministic() {
        let a = SessionKey::derive("build a weathered lighthouse");
        let b = SessionKey::derive("build a weathered lighthouse");
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 16);
        assert!(a.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn session_key_differs_per_identifier() {
        let a = SessionKey::derive("a lighthouse");
        let b = SessionKey::derive("a windmill");
        assert_ne!(a, b);
    }

    #[test]
    fn average_quality_skips_unparsed_scores() {
        let mut session = Session::new(SessionKey::derive("x"));
        for (score, step) in [(Some(8), 0), (None, 1), (Some(4), 2)] {
            session.verdicts.push(QualityVerdict {
                step_index: step,
                attempt: 0,
                score,
                critique: String::new(),
                needs_refinement: false,
            });
        }
        assert_eq!(session.average_quality(), Some(6.0));
    }

    #[test]
    fn average_quality_is_none_without_scores() {
        let session = Session::new(SessionKey::derive("x"));
        assert_eq!(session.average_quality(), None);
    }

    #[test]
    fn halted_session_reports_failure_with_message() {
        let mut session = Session::new(SessionKey::derive("x"));
        session.is_complete = false;
        session.critical_error = Some("step 1 failed: KeyError".to_string());
        let report = RunReport::from_session(&session, 7, &PathBuf::from("/tmp/shots"));
        assert!(!report.success);
        assert_eq!(report.error.as_deref(), Some("step 1 failed: KeyError"));
        assert_eq!(report.total_steps, 7);
    }
}
