//! Feedback capture: frame the viewport, screenshot it, persist the image,
//! and ask the vision model for a critique. Every stage degrades instead of
//! failing the step; a missing critique simply means the quality gate has
//! nothing to judge.

use minijinja::context;
use serde_json::json;
use tracing::{debug, instrument, warn};

use crate::agents::render_prompt;
use crate::core::types::Snapshot;
use crate::io::backend::{ModelingBackend, TOOL_EXECUTE_CODE, TOOL_GET_VIEWPORT_SCREENSHOT};
use crate::io::model::VisionModel;
use crate::io::snapshot::SnapshotStore;

const CRITIQUE_TEMPLATE: &str = include_str!("prompts/critique.md");

/// Frame all geometry in the viewport before capturing, so critiques judge
/// the whole build rather than whatever the camera last pointed at.
const FRAME_VIEWPORT_CODE: &str = r#"
import bpy
for area in bpy.context.screen.areas:
    if area.type == 'VIEW_3D':
        for region in area.regions:
            if region.type == 'WINDOW':
                with bpy.context.temp_override(area=area, region=region):
                    bpy.ops.view3d.view_all()
"#;

pub struct FeedbackCapturer<'a, B: ModelingBackend, V: VisionModel> {
    backend: &'a B,
    vision: &'a V,
    store: &'a SnapshotStore,
    snapshot_max_size: u32,
}

/// What one capture attempt produced.
#[derive(Debug, Clone, Default)]
pub struct CaptureOutcome {
    pub snapshot: Option<Snapshot>,
    pub critique: Option<String>,
}

impl<'a, B: ModelingBackend, V: VisionModel> FeedbackCapturer<'a, B, V> {
    pub fn new(
        backend: &'a B,
        vision: &'a V,
        store: &'a SnapshotStore,
        snapshot_max_size: u32,
    ) -> Self {
        Self {
            backend,
            vision,
            store,
            snapshot_max_size,
        }
    }

    #[instrument(skip_all, fields(step = step_index, attempt))]
    pub fn capture(&self, step: &str, step_index: usize, attempt: u32) -> CaptureOutcome {
        // Framing is best-effort; a capture of an unframed viewport still
        // beats no capture.
        if let Err(err) = self
            .backend
            .invoke(TOOL_EXECUTE_CODE, &json!({"code": FRAME_VIEWPORT_CODE}))
        {
            warn!(error = %format!("{err:#}"), "viewport framing failed");
        }

        let image_b64 = match self.backend.invoke(
            TOOL_GET_VIEWPORT_SCREENSHOT,
            &json!({"max_size": self.snapshot_max_size}),
        ) {
            Ok(outcome) if outcome.success => outcome.image_data,
            Ok(outcome) => {
                warn!(error = %outcome.result, "viewport capture failed");
                None
            }
            Err(err) => {
                warn!(error = %format!("{err:#}"), "viewport capture unavailable");
                None
            }
        };
        let Some(image_b64) = image_b64 else {
            return CaptureOutcome::default();
        };

        let snapshot = match self.store.save(step_index, attempt, &image_b64) {
            Ok(snapshot) => {
                debug!(path = %snapshot.path.display(), "snapshot persisted");
                Some(snapshot)
            }
            Err(err) => {
                warn!(error = %format!("{err:#}"), "snapshot persistence failed");
                None
            }
        };

        let prompt = render_prompt(CRITIQUE_TEMPLATE, context! { step => step });
        let critique = match self.vision.critique(&image_b64, &prompt) {
            Ok(text) => Some(text),
            Err(err) => {
                warn!(error = %format!("{err:#}"), "vision critique failed");
                None
            }
        };
        CaptureOutcome { snapshot, critique }
    }
}
