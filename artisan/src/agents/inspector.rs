//! Scene inspection: the run's first backend interaction and its only
//! fatal one. If the backend cannot describe the scene, nothing downstream
//! can proceed; a missing initial capture only costs a snapshot.

use anyhow::{Context, Result, bail};
use serde_json::json;
use tracing::{debug, instrument, warn};

use crate::core::types::SceneState;
use crate::io::backend::{ModelingBackend, TOOL_GET_SCENE_INFO, TOOL_GET_VIEWPORT_SCREENSHOT};

pub struct SceneInspector<'a, B: ModelingBackend> {
    backend: &'a B,
    snapshot_max_size: u32,
}

/// What the inspector learned before planning starts.
#[derive(Debug, Clone)]
pub struct InspectionReport {
    pub scene: SceneState,
    /// Base64 capture of the scene as found, when the viewport cooperated.
    pub initial_image: Option<String>,
}

impl<'a, B: ModelingBackend> SceneInspector<'a, B> {
    pub fn new(backend: &'a B, snapshot_max_size: u32) -> Self {
        Self {
            backend,
            snapshot_max_size,
        }
    }

    #[instrument(skip_all)]
    pub fn inspect(&self) -> Result<InspectionReport> {
        let outcome = self
            .backend
            .invoke(TOOL_GET_SCENE_INFO, &json!({}))
            .context("modeling backend unreachable during scene inspection")?;
        if !outcome.success {
            bail!("scene inspection failed: {}", outcome.result);
        }
        let scene = SceneState::from_report(&outcome.result);
        debug!(objects = scene.object_count(), "scene inspected");

        let initial_image = match self.backend.invoke(
            TOOL_GET_VIEWPORT_SCREENSHOT,
            &json!({"max_size": self.snapshot_max_size}),
        ) {
            Ok(capture) if capture.success => capture.image_data,
            Ok(capture) => {
                warn!(error = %capture.result, "initial viewport capture failed");
                None
            }
            Err(err) => {
                warn!(error = %format!("{err:#}"), "initial viewport capture unavailable");
                None
            }
        };
        Ok(InspectionReport {
            scene,
            initial_image,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedBackend;

    #[test]
    fn inspection_parses_objects_and_captures_image() {
        let backend = ScriptedBackend::with_scene(
            r#"{"objects": [{"name": "Trunk"}, {"name": "Canopy"}]}"#,
        );
        let report = SceneInspector::new(&backend, 800).inspect().expect("inspect");
        assert_eq!(report.scene.objects, vec!["Trunk", "Canopy"]);
        assert!(report.initial_image.is_some());
        assert_eq!(
            backend.invoked_tools(),
            vec!["get_scene_info", "get_viewport_screenshot"]
        );
    }

    #[test]
    fn unreachable_backend_is_fatal() {
        let backend = ScriptedBackend {
            unreachable: true,
            ..ScriptedBackend::default()
        };
        let err = SceneInspector::new(&backend, 800).inspect().unwrap_err();
        assert!(err.to_string().contains("scene inspection"));
    }

    #[test]
    fn missing_capture_is_not_fatal() {
        let backend = ScriptedBackend {
            screenshot: None,
            ..ScriptedBackend::default()
        };
        let report = SceneInspector::new(&backend, 800).inspect().expect("inspect");
        assert!(report.initial_image.is_none());
    }
}
