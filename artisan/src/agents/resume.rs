//! Resume detection: figure out which plan steps the scene already
//! satisfies, so a re-launched session skips them. Any failure degrades to
//! "not resuming"; starting from scratch is always safe.

use minijinja::context;
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::agents::render_prompt;
use crate::core::resume::{cap_completed, parse_completed_indices, resume_cursor};
use crate::core::types::SceneState;
use crate::io::backend::{ModelingBackend, TOOL_GET_OBJECT_INFO};
use crate::io::model::{CompletionRequest, ReasoningModel};

const RESUME_TEMPLATE: &str = include_str!("prompts/resume.md");

pub struct ResumeDetector<'a, B: ModelingBackend, M: ReasoningModel> {
    backend: &'a B,
    model: &'a M,
    inspect_object_limit: usize,
    cap_fraction: f64,
}

/// Where a resumed session picks up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumePoint {
    /// Plan indices judged already complete, capped and sorted.
    pub completed: Vec<usize>,
    /// First step to execute: the length of the contiguous completed prefix.
    pub cursor: usize,
    pub is_resuming: bool,
}

impl ResumePoint {
    fn fresh_start() -> Self {
        Self {
            completed: Vec::new(),
            cursor: 0,
            is_resuming: false,
        }
    }
}

impl<'a, B: ModelingBackend, M: ReasoningModel> ResumeDetector<'a, B, M> {
    pub fn new(
        backend: &'a B,
        model: &'a M,
        inspect_object_limit: usize,
        cap_fraction: f64,
    ) -> Self {
        Self {
            backend,
            model,
            inspect_object_limit,
            cap_fraction,
        }
    }

    #[instrument(skip_all, fields(objects = scene.object_count()))]
    pub fn detect(&self, plan: &[String], scene: &SceneState) -> ResumePoint {
        let object_details = self.inspect_objects(scene);
        let plan_text = plan
            .iter()
            .enumerate()
            .map(|(idx, step)| format!("{}. {step}", idx + 1))
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = render_prompt(
            RESUME_TEMPLATE,
            context! {
                plan => plan_text,
                scene_info => scene.raw.as_str(),
                object_details => object_details,
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
                warn!(error = %format!("{err:#}"), "resume detection failed, starting fresh");
                return ResumePoint::fresh_start();
            }
        };

        let completed = parse_completed_indices(&text, plan.len());
        let completed = cap_completed(completed, plan.len(), self.cap_fraction);
        let cursor = resume_cursor(&completed);
        let is_resuming = cursor > 0;
        if is_resuming {
            info!(cursor, completed = completed.len(), "resuming prior session");
        }
        ResumePoint {
            completed,
            cursor,
            is_resuming,
        }
    }

    /// Detail the first few objects; per-object failures are skipped.
    fn inspect_objects(&self, scene: &SceneState) -> String {
        scene
            .objects
            .iter()
            .take(self.inspect_object_limit)
            .filter_map(|name| {
                match self
                    .backend
                    .invoke(TOOL_GET_OBJECT_INFO, &json!({"object_name": name}))
                {
                    Ok(outcome) if outcome.success => {
                        let detail: String = outcome.result.chars().take(200).collect();
                        Some(format!("{name}: {detail}"))
                    }
                    _ => None,
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
