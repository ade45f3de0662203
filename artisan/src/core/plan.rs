//! Step-list parsing for planner responses.

use std::sync::LazyLock;

use regex::Regex;

/// Fixed generic plan used when no steps can be parsed from the planner
/// response. A degraded plan is better than a hard failure at session start.
pub const FALLBACK_PLAN: [&str; 5] = [
    "Clear the default scene and set up the environment",
    "Create the main geometry from the requirement",
    "Add details and secondary geometry",
    "Apply materials and lighting",
    "Final adjustments and verification pass",
];

static STEP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^\s*(?:step\s+)?\d{1,3}\s*[.):]\s*(\S.*)$").expect("step regex is valid")
});

/// Parse numbered step descriptions from a planner response.
///
/// Tolerates `1.`, `1)`, and `Step 1:` numbering. Returns steps in response
/// order with the numbering prefix stripped.
pub fn parse_steps(text: &str) -> Vec<String> {
    STEP_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let step = caps.get(1)?.as_str().trim();
            (!step.is_empty()).then(|| step.to_string())
        })
        .collect()
}

/// Parse steps, falling back to [`FALLBACK_PLAN`] when nothing is parseable.
///
/// Output is always non-empty.
pub fn plan_or_fallback(text: &str) -> Vec<String> {
    let steps = parse_steps(text);
    if steps.is_empty() {
        return FALLBACK_PLAN.iter().map(|step| step.to_string()).collect();
    }
    steps
}
