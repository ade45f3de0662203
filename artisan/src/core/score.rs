//! Quality-score extraction from free-text critiques.
//!
//! Score parsing is inherently fragile, so it lives behind this single seam:
//! the gate treats an unparseable critique as a pass-through rather than
//! guessing a score.

use std::sync::LazyLock;

use regex::Regex;

static SCORE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d{1,2})\s*/\s*10|rating[:\s]+(\d{1,2})").expect("score regex is valid")
});

/// Extract a 1-10 quality score from a critique.
///
/// Recognizes `<n>/10` and `rating: <n>` forms. Returns `None` when no score
/// is present or the matched number is outside 1..=10.
pub fn parse_quality_score(text: &str) -> Option<u8> {
    let caps = SCORE_RE.captures(text)?;
    let digits = caps.get(1).or_else(|| caps.get(2))?.as_str();
    let score: u8 = digits.parse().ok()?;
    (1..=10).contains(&score).then_some(score)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_slash_ten_form() {
        assert_eq!(parse_quality_score("Overall quality: 8/10, solid work"), Some(8));
        assert_eq!(parse_quality_score("I'd say 6 / 10 here"), Some(6));
    }

    #[test]
    fn parses_rating_form() {
        assert_eq!(parse_quality_score("rating: 7 with minor issues"), Some(7));
        assert_eq!(parse_quality_score("Rating 9 overall"), Some(9));
    }

    #[test]
    fn returns_none_without_score() {
        assert_eq!(parse_quality_score("the trunk looks fine"), None);
        assert_eq!(parse_quality_score(""), None);
    }

    #[test]
    fn rejects_out_of_range_scores() {
        assert_eq!(parse_quality_score("15/10 amazing"), None);
        assert_eq!(parse_quality_score("0/10 broken"), None);
    }

    #[test]
    fn first_match_wins_in_mixed_text() {
        let critique = "Geometry matches, 4/10. A rework could reach 9/10.";
        assert_eq!(parse_quality_score(critique), Some(4));
    }
}
