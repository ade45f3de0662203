//! Resume-point derivation from completed-step detection output.

use std::sync::LazyLock;

use regex::Regex;

static INDEX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("index regex is valid"));

// A line that is nothing but step numbers: `1, 2, 3`, `Steps 1 and 2`, etc.
// Prose lines never match, so stray integers in commentary ("the scene has
// 4 objects") cannot be mistaken for completed steps.
static LIST_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:steps?\s+)?\d{1,3}(?:\s*(?:,|and|&)\s*(?:steps?\s+)?\d{1,3})*\s*\.?$")
        .expect("list line regex is valid")
});

/// Parse 1-based completed step numbers from a detection response into
/// 0-based plan indices, deduplicated and sorted.
///
/// Only the first line shaped like the instructed answer counts: a bare
/// comma-separated number list, or the word `none`. Responses with neither
/// yield an empty list, and out-of-range numbers are dropped.
pub fn parse_completed_indices(text: &str, plan_len: usize) -> Vec<usize> {
    let Some(line) = text.lines().map(str::trim).find(|line| {
        line.eq_ignore_ascii_case("none") || LIST_LINE_RE.is_match(line)
    }) else {
        return Vec::new();
    };
    if line.eq_ignore_ascii_case("none") {
        return Vec::new();
    }
    let mut indices: Vec<usize> = INDEX_RE
        .find_iter(line)
        .filter_map(|m| m.as_str().parse::<usize>().ok())
        .filter_map(|n| n.checked_sub(1))
        .filter(|&idx| idx < plan_len)
        .collect();
    indices.sort_unstable();
    indices.dedup();
    indices
}

/// Cap the completed set at `floor(cap_fraction * plan_len)` marks.
///
/// The cap bounds the blast radius of a false-positive resume decision: a
/// single detection call can never skip more than this share of the plan.
pub fn cap_completed(mut indices: Vec<usize>, plan_len: usize, cap_fraction: f64) -> Vec<usize> {
    let cap = (plan_len as f64 * cap_fraction).floor() as usize;
    indices.truncate(cap);
    indices
}

/// The resumed step cursor: highest contiguous completed index plus one.
///
/// Non-contiguous completions past a gap are ignored, since step N+1 cannot
/// be trusted when step N is missing.
pub fn resume_cursor(sorted_indices: &[usize]) -> usize {
    let mut cursor = 0;
    for &idx in sorted_indices {
        if idx == cursor {
            cursor += 1;
        } else {
            break;
        }
    }
    cursor
}
