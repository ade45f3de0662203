//! Quality-gate decision policy for captured steps.

use crate::core::score::parse_quality_score;
use crate::core::types::{QualityVerdict, RefinementState};

/// Tuning knobs for the gate, sourced from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatePolicy {
    /// Steps with index below this are "critical" and held to a higher bar.
    pub critical_step_count: usize,
    pub critical_threshold: u8,
    pub default_threshold: u8,
    pub max_refinements_per_step: u32,
}

impl GatePolicy {
    pub fn threshold_for(&self, step_index: usize) -> u8 {
        if step_index < self.critical_step_count {
            self.critical_threshold
        } else {
            self.default_threshold
        }
    }
}

// Visibility defects force refinement regardless of the numeric score.
const OCCLUSION_MARKERS: [&str; 7] = [
    "hidden",
    "occluded",
    "obscured",
    "blocked",
    "overshadow",
    "not visible",
    "cannot see",
];

fn critique_reports_occlusion(critique: &str) -> bool {
    let lower = critique.to_lowercase();
    OCCLUSION_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Decide PASS / REFINE / ACCEPT-ANYWAY for one captured attempt.
///
/// A critique with no parseable score passes through rather than stalling the
/// loop. Once `attempts` reaches the per-step budget the verdict is always an
/// acceptance, whatever the score says.
pub fn assess(
    policy: &GatePolicy,
    step_index: usize,
    critique: &str,
    state: &RefinementState,
) -> QualityVerdict {
    let score = parse_quality_score(critique);
    let threshold = policy.threshold_for(step_index);
    let below_threshold = score.is_some_and(|score| score < threshold);
    let mut needs_refinement = below_threshold || critique_reports_occlusion(critique);
    if state.attempts >= policy.max_refinements_per_step {
        needs_refinement = false;
    }
    QualityVerdict {
        step_index,
        attempt: state.attempts,
        score,
        critique: critique.to_string(),
        needs_refinement,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> GatePolicy {
        GatePolicy {
            critical_step_count: 5,
            critical_threshold: 7,
            default_threshold: 6,
            max_refinements_per_step: 2,
        }
    }

    #[test]
    fn critical_step_below_critical_threshold_refines() {
        let verdict = assess(&policy(), 2, "decent start, 6/10", &RefinementState::default());
        assert_eq!(verdict.score, Some(6));
        assert!(verdict.needs_refinement);
    }

    #[test]
    fn later_step_at_default_threshold_passes() {
        let verdict = assess(&policy(), 8, "decent, 6/10", &RefinementState::default());
        assert_eq!(verdict.score, Some(6));
        assert!(!verdict.needs_refinement);
    }

    #[test]
    fn exhausted_attempts_accept_any_score() {
        let state = RefinementState {
            attempts: 2,
            last_critique: Some("still rough".to_string()),
        };
        let verdict = assess(&policy(), 8, "malformed mesh, 3/10", &state);
        assert_eq!(verdict.score, Some(3));
        assert_eq!(verdict.attempt, 2);
        assert!(!verdict.needs_refinement, "attempt budget overrides the score");
    }

    #[test]
    fn unparseable_score_passes_through() {
        let verdict = assess(&policy(), 1, "looks plausible overall", &RefinementState::default());
        assert_eq!(verdict.score, None);
        assert!(!verdict.needs_refinement);
    }

    #[test]
    fn occlusion_forces_refinement_despite_high_score() {
        let critique = "9/10, but the new mast is hidden behind the hull";
        let verdict = assess(&policy(), 7, critique, &RefinementState::default());
        assert_eq!(verdict.score, Some(9));
        assert!(verdict.needs_refinement);
    }

    #[test]
    fn occlusion_does_not_outlast_the_attempt_budget() {
        let state = RefinementState {
            attempts: 2,
            last_critique: None,
        };
        let verdict = assess(&policy(), 7, "mast still occluded, 5/10", &state);
        assert!(!verdict.needs_refinement);
    }
}
