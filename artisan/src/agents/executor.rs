//! Step execution: turn one plan step into validated backend tool calls.
//!
//! Never fails outright. A model transport error, a rejected tool request,
//! or an unreachable backend all come back as failed invocation records;
//! the step loop decides whether any of them is fatal.

use minijinja::context;
use serde_json::json;
use tracing::{debug, instrument, warn};

use crate::agents::{recent_history, render_prompt, truncate_requirement};
use crate::core::tool_request::validate_tool_request;
use crate::core::types::ToolInvocationResult;
use crate::io::backend::ModelingBackend;
use crate::io::model::{CompletionRequest, ReasoningModel, backend_tool_definitions};

const EXECUTOR_TEMPLATE: &str = include_str!("prompts/executor.md");

/// Synthetic tool name recorded when the reasoning model itself failed.
pub const REASONING_FAILURE_TOOL: &str = "reasoning_model";

pub struct StepExecutor<'a, B: ModelingBackend, M: ReasoningModel> {
    backend: &'a B,
    model: &'a M,
    requirement: &'a str,
    requirement_max_chars: usize,
    history_window: usize,
}

impl<'a, B: ModelingBackend, M: ReasoningModel> StepExecutor<'a, B, M> {
    pub fn new(
        backend: &'a B,
        model: &'a M,
        requirement: &'a str,
        requirement_max_chars: usize,
        history_window: usize,
    ) -> Self {
        Self {
            backend,
            model,
            requirement,
            requirement_max_chars,
            history_window,
        }
    }

    #[instrument(skip_all, fields(step = step_index))]
    pub fn execute(
        &self,
        step: &str,
        step_index: usize,
        total_steps: usize,
        history: &[ToolInvocationResult],
    ) -> Vec<ToolInvocationResult> {
        let prompt = render_prompt(
            EXECUTOR_TEMPLATE,
            context! {
                step => step,
                step_number => step_index + 1,
                total_steps => total_steps,
                requirement => truncate_requirement(self.requirement, self.requirement_max_chars),
                history => {
                    let formatted = recent_history(history, self.history_window);
                    (!formatted.is_empty()).then_some(formatted)
                },
            },
        );
        let request = CompletionRequest {
            system: None,
            prompt,
            tools: backend_tool_definitions(),
        };

        let response = match self.model.complete(&request) {
            Ok(response) => response,
            Err(err) => {
                warn!(error = %format!("{err:#}"), "reasoning model failed during step");
                return vec![ToolInvocationResult {
                    success: false,
                    tool_name: REASONING_FAILURE_TOOL.to_string(),
                    args: json!({}),
                    result: format!("{err:#}"),
                }];
            }
        };

        response
            .tool_requests
            .iter()
            .map(|raw| self.dispatch(raw))
            .collect()
    }

    /// Validate one raw request and, if accepted, invoke the backend.
    fn dispatch(&self, raw: &serde_json::Value) -> ToolInvocationResult {
        let request = match validate_tool_request(raw) {
            Ok(request) => request,
            Err(err) => {
                warn!(error = %format!("{err:#}"), "rejected model tool request");
                return ToolInvocationResult {
                    success: false,
                    tool_name: raw
                        .get("name")
                        .and_then(serde_json::Value::as_str)
                        .unwrap_or("unknown")
                        .to_string(),
                    args: raw.get("args").cloned().unwrap_or_else(|| json!({})),
                    result: format!("{err:#}"),
                };
            }
        };
        match self.backend.invoke(&request.name, &request.args) {
            Ok(outcome) => {
                debug!(tool = %request.name, success = outcome.success, "tool invoked");
                ToolInvocationResult {
                    success: outcome.success,
                    tool_name: request.name,
                    args: request.args,
                    result: outcome.result,
                }
            }
            Err(err) => ToolInvocationResult {
                success: false,
                tool_name: request.name,
                args: request.args,
                result: format!("{err:#}"),
            },
        }
    }
}
