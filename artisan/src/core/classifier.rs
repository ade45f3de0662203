//! Critical-vs-recoverable classification of backend tool errors.

/// Severity of a failed code-execution call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// A foundational step broke in a way that poisons everything built on
    /// top of it; the session must halt.
    Critical,
    /// Recorded and scored like any other result; execution continues.
    Recoverable,
}

// The not-found / no-attribute / key-error class: geometry or API lookups
// that failed outright, as opposed to cosmetic or partial failures.
const CRITICAL_PATTERNS: [&str; 3] = ["not found", "no attribute", "keyerror"];

/// Classify a failed `execute_code` error text at a given step.
///
/// The same error class is `Critical` only within the first
/// `critical_step_count` steps; on later steps partial results still have
/// value, so it is merely recoverable.
pub fn classify_tool_error(
    error_text: &str,
    step_index: usize,
    critical_step_count: usize,
) -> ErrorSeverity {
    let lower = error_text.to_lowercase();
    let matches_class = CRITICAL_PATTERNS
        .iter()
        .any(|pattern| lower.contains(pattern));
    if matches_class && step_index < critical_step_count {
        ErrorSeverity::Critical
    } else {
        ErrorSeverity::Recoverable
    }
}

/// Whether a tool reply should be treated as an error even when the backend
/// reported success, based on its payload text.
pub fn outcome_has_error(success: bool, result_text: &str) -> bool {
    if !success {
        return true;
    }
    let lower = result_text.to_lowercase();
    ["error", "failed", "not found"]
        .iter()
        .any(|marker| lower.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_error_on_early_step_is_critical() {
        assert_eq!(
            classify_tool_error("KeyError: 'Specular'", 1, 5),
            ErrorSeverity::Critical
        );
    }

    #[test]
    fn same_error_on_late_step_is_recoverable() {
        assert_eq!(
            classify_tool_error("KeyError: 'Specular'", 8, 5),
            ErrorSeverity::Recoverable
        );
    }

    #[test]
    fn unrelated_errors_are_recoverable_even_early() {
        assert_eq!(
            classify_tool_error("division by zero", 0, 5),
            ErrorSeverity::Recoverable
        );
    }

    #[test]
    fn all_patterns_in_the_class_match() {
        for text in [
            "object 'Trunk' not found",
            "'Object' has no attribute 'modifers'",
            "KeyError: 'Base Color'",
        ] {
            assert_eq!(classify_tool_error(text, 0, 5), ErrorSeverity::Critical);
        }
    }

    #[test]
    fn error_markers_override_success_flag() {
        assert!(outcome_has_error(true, "Error: mesh invalid"));
        assert!(outcome_has_error(true, "operation failed"));
        assert!(outcome_has_error(false, "anything"));
        assert!(!outcome_has_error(true, "created 4 objects"));
    }
}
