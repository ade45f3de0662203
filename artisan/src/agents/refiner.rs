//! Refinement: act on a critique without rebuilding the step from scratch.

use minijinja::context;
use serde_json::json;
use tracing::{instrument, warn};

use crate::agents::render_prompt;
use crate::core::tool_request::validate_tool_request;
use crate::core::types::ToolInvocationResult;
use crate::io::backend::ModelingBackend;
use crate::io::model::{CompletionRequest, ReasoningModel, backend_tool_definitions};

const REFINER_TEMPLATE: &str = include_str!("prompts/refiner.md");

pub struct Refiner<'a, B: ModelingBackend, M: ReasoningModel> {
    backend: &'a B,
    model: &'a M,
}

impl<'a, B: ModelingBackend, M: ReasoningModel> Refiner<'a, B, M> {
    pub fn new(backend: &'a B, model: &'a M) -> Self {
        Self { backend, model }
    }

    /// Run one refinement pass. A model failure yields no invocations; the
    /// caller still counts the attempt against the step's budget.
    #[instrument(skip_all)]
    pub fn refine(&self, step: &str, critique: &str) -> Vec<ToolInvocationResult> {
        let prompt = render_prompt(
            REFINER_TEMPLATE,
            context! { step => step, critique => critique },
        );
        let request = CompletionRequest {
            system: None,
            prompt,
            tools: backend_tool_definitions(),
        };
        let response = match self.model.complete(&request) {
            Ok(response) => response,
            Err(err) => {
                warn!(error = %format!("{err:#}"), "refinement model failed");
                return Vec::new();
            }
        };

        response
            .tool_requests
            .iter()
            .map(|raw| match validate_tool_request(raw) {
                Ok(req) => match self.backend.invoke(&req.name, &req.args) {
                    Ok(outcome) => ToolInvocationResult {
                        success: outcome.success,
                        tool_name: req.name,
                        args: req.args,
                        result: outcome.result,
                    },
                    Err(err) => ToolInvocationResult {
                        success: false,
                        tool_name: req.name,
                        args: req.args,
                        result: format!("{err:#}"),
                    },
                },
                Err(err) => {
                    warn!(error = %format!("{err:#}"), "rejected refinement tool request");
                    ToolInvocationResult {
                        success: false,
                        tool_name: raw
                            .get("name")
                            .and_then(serde_json::Value::as_str)
                            .unwrap_or("unknown")
                            .to_string(),
                        args: raw.get("args").cloned().unwrap_or_else(|| json!({})),
                        result: format!("{err:#}"),
                    }
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedBackend, ScriptedReasoning, tool_response};

    #[test]
    fn refinement_executes_validated_requests() {
        let backend = ScriptedBackend::default();
        let model = ScriptedReasoning::with_responses(vec![tool_response(
            "execute_code",
            json!({"code": "bevel"}),
        )]);
        let refiner = Refiner::new(&backend, &model);

        let results = refiner.refine("Add masts", "3/10 the masts are too thin");
        assert_eq!(results.len(), 1);
        assert!(results[0].success);

        let requests = model.requests.borrow();
        assert!(requests[0].prompt.contains("masts are too thin"));
        assert!(requests[0].prompt.contains("Add masts"));
    }

    #[test]
    fn model_failure_yields_no_invocations() {
        let backend = ScriptedBackend::default();
        let model = ScriptedReasoning::default();
        let refiner = Refiner::new(&backend, &model);

        assert!(refiner.refine("Add masts", "3/10").is_empty());
        assert!(backend.invoked_tools().is_empty());
    }

    #[test]
    fn invalid_refinement_request_is_rejected() {
        let backend = ScriptedBackend::default();
        let model =
            ScriptedReasoning::with_responses(vec![tool_response("wipe_scene", json!({}))]);
        let refiner = Refiner::new(&backend, &model);

        let results = refiner.refine("Add masts", "3/10");
        assert!(!results[0].success);
        assert!(backend.invoked_tools().is_empty());
    }
}
