//! Model-facing agent roles of the modeling loop.
//!
//! Each role owns its prompt template and the policy for degrading when its
//! model call fails. Only the inspector is allowed to abort a run.

use minijinja::Environment;
use minijinja::value::Value as TemplateValue;

use crate::core::types::ToolInvocationResult;

pub mod critic;
pub mod executor;
pub mod inspector;
pub mod planner;
pub mod refiner;
pub mod resume;

/// Render an embedded template. Templates ship with the binary, so failures
/// here are programming errors, not runtime conditions.
pub(crate) fn render_prompt(template: &'static str, ctx: TemplateValue) -> String {
    let mut env = Environment::new();
    env.add_template("prompt", template)
        .expect("embedded template should be valid");
    env.get_template("prompt")
        .expect("template registered above")
        .render(ctx)
        .expect("prompt rendering should not fail")
}

/// Truncate requirement text to a character budget, respecting char
/// boundaries.
pub(crate) fn truncate_requirement(requirement: &str, max_chars: usize) -> &str {
    match requirement.char_indices().nth(max_chars) {
        Some((idx, _)) => &requirement[..idx],
        None => requirement,
    }
}

/// Format the last `window` tool results as bounded prompt context.
pub(crate) fn recent_history(results: &[ToolInvocationResult], window: usize) -> String {
    let start = results.len().saturating_sub(window);
    results[start..]
        .iter()
        .map(|entry| {
            let status = if entry.success { "ok" } else { "failed" };
            format!("- [{status}] {}: {}", entry.tool_name, snippet(&entry.result, 300))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn snippet(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn result(success: bool, tool: &str, body: &str) -> ToolInvocationResult {
        ToolInvocationResult {
            success,
            tool_name: tool.to_string(),
            args: json!({}),
            result: body.to_string(),
        }
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let text = "héllo wörld";
        let truncated = truncate_requirement(text, 4);
        assert_eq!(truncated, "héll");
    }

    #[test]
    fn truncation_is_noop_within_budget() {
        assert_eq!(truncate_requirement("short", 4000), "short");
    }

    #[test]
    fn history_keeps_only_the_most_recent_window() {
        let results = vec![
            result(true, "execute_code", "first"),
            result(true, "execute_code", "second"),
            result(false, "execute_code", "third"),
        ];
        let history = recent_history(&results, 2);
        assert!(!history.contains("first"));
        assert!(history.contains("[ok] execute_code: second"));
        assert!(history.contains("[failed] execute_code: third"));
    }

    #[test]
    fn history_of_empty_results_is_empty() {
        assert_eq!(recent_history(&[], 2), "");
    }
}
