//! Plan generation. Infallible by policy: a model or parse failure degrades
//! to the built-in fallback plan rather than aborting the run.

use minijinja::context;
use tracing::{info, instrument, warn};

use crate::agents::{render_prompt, truncate_requirement};
use crate::core::plan::plan_or_fallback;
use crate::core::types::SceneState;
use crate::io::model::{CompletionRequest, ReasoningModel};

const PLANNER_TEMPLATE: &str = include_str!("prompts/planner.md");

pub struct Planner<'a, M: ReasoningModel> {
    model: &'a M,
    requirement_max_chars: usize,
}

impl<'a, M: ReasoningModel> Planner<'a, M> {
    pub fn new(model: &'a M, requirement_max_chars: usize) -> Self {
        Self {
            model,
            requirement_max_chars,
        }
    }

    #[instrument(skip_all)]
    pub fn plan(&self, requirement: &str, scene: &SceneState) -> Vec<String> {
        let prompt = render_prompt(
            PLANNER_TEMPLATE,
            context! {
                requirement => truncate_requirement(requirement, self.requirement_max_chars),
                scene_info => scene.raw.as_str(),
                has_existing_work => scene.object_count() > 0,
            },
        );
        let request = CompletionRequest {
            system: None,
            prompt,
            tools: Vec::new(),
        };
        let text = match self.model.complete(&request) {
            Ok(response) => response.text,
            Err(err) => {
                warn!(error = %format!("{err:#}"), "planner model failed, using fallback plan");
                String::new()
            }
        };
        let steps = plan_or_fallback(&text);
        info!(steps = steps.len(), "plan ready");
        steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::plan::FALLBACK_PLAN;
    use crate::test_support::{ScriptedReasoning, text_response};

    fn scene_with(objects: &[&str]) -> SceneState {
        SceneState {
            objects: objects.iter().map(|s| s.to_string()).collect(),
            raw: format!("{{\"objects\": {objects:?}}}"),
        }
    }

    #[test]
    fn numbered_response_becomes_the_plan() {
        let model = ScriptedReasoning::with_responses(vec![text_response(
            "1. Clear the scene\n2. Build the hull\n3. Add masts",
        )]);
        let steps = Planner::new(&model, 4000).plan("a sailing ship", &scene_with(&[]));
        assert_eq!(steps, vec!["Clear the scene", "Build the hull", "Add masts"]);
    }

    #[test]
    fn model_failure_yields_fallback_plan() {
        let model = ScriptedReasoning::default();
        let steps = Planner::new(&model, 4000).plan("a sailing ship", &scene_with(&[]));
        assert_eq!(steps.len(), FALLBACK_PLAN.len());
        assert_eq!(steps[0], FALLBACK_PLAN[0]);
    }

    #[test]
    fn prompt_carries_truncated_requirement_and_scene() {
        let model = ScriptedReasoning::with_responses(vec![text_response("1. Only step")]);
        let requirement = "x".repeat(5000);
        Planner::new(&model, 4000).plan(&requirement, &scene_with(&["Cube"]));

        let requests = model.requests.borrow();
        let prompt = &requests[0].prompt;
        assert!(prompt.contains(&"x".repeat(4000)));
        assert!(!prompt.contains(&"x".repeat(4001)));
        assert!(prompt.contains("Cube"));
        assert!(prompt.contains("between 5 and 15 steps"));
        // A populated scene must steer the model toward incremental work.
        assert!(prompt.contains("Do NOT start from scratch"));
        assert!(prompt.contains("build upon"));
    }

    #[test]
    fn empty_scene_omits_the_existing_work_instruction() {
        let model = ScriptedReasoning::with_responses(vec![text_response("1. Only step")]);
        Planner::new(&model, 4000).plan("a sailing ship", &scene_with(&[]));

        let requests = model.requests.borrow();
        assert!(!requests[0].prompt.contains("Do NOT start from scratch"));
    }
}
