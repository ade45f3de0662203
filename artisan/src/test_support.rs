//! Scripted fakes shared across unit and integration tests.
//!
//! Compiled for this crate's own tests and, via the `test-support` feature,
//! for downstream test code.

use std::cell::RefCell;

use anyhow::{Result, bail};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::Value;

use crate::io::backend::{
    ModelingBackend, TOOL_EXECUTE_CODE, TOOL_GET_OBJECT_INFO, TOOL_GET_SCENE_INFO,
    TOOL_GET_VIEWPORT_SCREENSHOT, ToolOutcome,
};
use crate::io::model::{CompletionRequest, ModelResponse, ReasoningModel, VisionModel};

/// A deterministic backend that answers from canned data and records every
/// invocation.
pub struct ScriptedBackend {
    pub scene_info: String,
    pub object_info: String,
    /// Base64 image for screenshot calls; `None` scripts a capture failure.
    pub screenshot: Option<String>,
    /// Queue of outcomes for `execute_code`; drained front-to-back, then
    /// generic successes.
    pub execute_outcomes: RefCell<Vec<ToolOutcome>>,
    pub invocations: RefCell<Vec<(String, Value)>>,
    /// When set, every invoke errors as if the socket never connected.
    pub unreachable: bool,
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        Self {
            scene_info: r#"{"objects": []}"#.to_string(),
            object_info: r#"{"type": "MESH", "vertices": 8}"#.to_string(),
            screenshot: Some(png_b64()),
            execute_outcomes: RefCell::new(Vec::new()),
            invocations: RefCell::new(Vec::new()),
            unreachable: false,
        }
    }
}

impl ScriptedBackend {
    pub fn with_scene(scene_info: &str) -> Self {
        Self {
            scene_info: scene_info.to_string(),
            ..Self::default()
        }
    }

    /// Names of the tools invoked so far, in order.
    pub fn invoked_tools(&self) -> Vec<String> {
        self.invocations
            .borrow()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }
}

impl ModelingBackend for ScriptedBackend {
    fn invoke(&self, tool_name: &str, args: &Value) -> Result<ToolOutcome> {
        if self.unreachable {
            bail!("connect to modeling backend at 127.0.0.1:9876");
        }
        self.invocations
            .borrow_mut()
            .push((tool_name.to_string(), args.clone()));
        match tool_name {
            TOOL_GET_SCENE_INFO => Ok(ToolOutcome {
                success: true,
                result: self.scene_info.clone(),
                image_data: None,
            }),
            TOOL_GET_OBJECT_INFO => Ok(ToolOutcome {
                success: true,
                result: self.object_info.clone(),
                image_data: None,
            }),
            TOOL_GET_VIEWPORT_SCREENSHOT => match &self.screenshot {
                Some(data) => Ok(ToolOutcome {
                    success: true,
                    result: String::new(),
                    image_data: Some(data.clone()),
                }),
                None => Ok(ToolOutcome {
                    success: false,
                    result: "viewport capture failed".to_string(),
                    image_data: None,
                }),
            },
            TOOL_EXECUTE_CODE => {
                let mut queue = self.execute_outcomes.borrow_mut();
                if queue.is_empty() {
                    Ok(ToolOutcome {
                        success: true,
                        result: "ok".to_string(),
                        image_data: None,
                    })
                } else {
                    Ok(queue.remove(0))
                }
            }
            other => bail!("unscripted tool {other}"),
        }
    }
}

/// A reasoning model that replays a fixed queue of responses and records the
/// requests it saw. An exhausted queue is an error, so tests catch agents
/// making more model calls than scripted.
#[derive(Default)]
pub struct ScriptedReasoning {
    pub responses: RefCell<Vec<ModelResponse>>,
    pub requests: RefCell<Vec<CompletionRequest>>,
}

impl ScriptedReasoning {
    pub fn with_responses(responses: Vec<ModelResponse>) -> Self {
        Self {
            responses: RefCell::new(responses),
            requests: RefCell::new(Vec::new()),
        }
    }
}

impl ReasoningModel for ScriptedReasoning {
    fn complete(&self, request: &CompletionRequest) -> Result<ModelResponse> {
        self.requests.borrow_mut().push(request.clone());
        let mut queue = self.responses.borrow_mut();
        if queue.is_empty() {
            bail!("scripted reasoning exhausted");
        }
        Ok(queue.remove(0))
    }
}

/// A vision model replaying canned critiques.
#[derive(Default)]
pub struct ScriptedVision {
    pub critiques: RefCell<Vec<String>>,
    pub prompts: RefCell<Vec<String>>,
}

impl ScriptedVision {
    pub fn with_critiques(critiques: &[&str]) -> Self {
        Self {
            critiques: RefCell::new(critiques.iter().map(|s| s.to_string()).collect()),
            prompts: RefCell::new(Vec::new()),
        }
    }
}

impl VisionModel for ScriptedVision {
    fn critique(&self, _image_b64: &str, prompt: &str) -> Result<String> {
        self.prompts.borrow_mut().push(prompt.to_string());
        let mut queue = self.critiques.borrow_mut();
        if queue.is_empty() {
            bail!("scripted vision exhausted");
        }
        Ok(queue.remove(0))
    }
}

/// A text-only model reply.
pub fn text_response(text: &str) -> ModelResponse {
    ModelResponse {
        text: text.to_string(),
        tool_requests: Vec::new(),
    }
}

/// A reply carrying one tool request alongside optional text.
pub fn tool_response(name: &str, args: Value) -> ModelResponse {
    ModelResponse {
        text: String::new(),
        tool_requests: vec![serde_json::json!({"name": name, "args": args})],
    }
}

/// Valid base64 standing in for PNG bytes.
pub fn png_b64() -> String {
    STANDARD.encode(b"fake-png-bytes")
}
