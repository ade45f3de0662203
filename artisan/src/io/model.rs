//! Model-client abstractions for reasoning and vision-critique calls.
//!
//! The session loop only sees the [`ReasoningModel`] and [`VisionModel`]
//! traits; the Anthropic messages-API client below is the production
//! implementation, and tests substitute scripted fakes.

use anyhow::{Context, Result, anyhow};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::io::backend::{
    TOOL_EXECUTE_CODE, TOOL_GET_OBJECT_INFO, TOOL_GET_SCENE_INFO, TOOL_GET_VIEWPORT_SCREENSHOT,
};
use crate::io::config::ModelConfig;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Tool definition advertised to the reasoning model.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// One reasoning-model call.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system: Option<String>,
    pub prompt: String,
    pub tools: Vec<ToolDefinition>,
}

/// Reasoning-model reply: free text plus raw (unvalidated) tool requests of
/// the form `{"name": ..., "args": ...}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelResponse {
    pub text: String,
    pub tool_requests: Vec<Value>,
}

pub trait ReasoningModel {
    fn complete(&self, request: &CompletionRequest) -> Result<ModelResponse>;
}

pub trait VisionModel {
    /// Critique a base64 PNG against a prompt, returning free text.
    fn critique(&self, image_b64: &str, prompt: &str) -> Result<String>;
}

/// The fixed tool surface of the modeling backend, advertised on every
/// step-execution and refinement call.
pub fn backend_tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: TOOL_EXECUTE_CODE.to_string(),
            description: "Execute Blender Python code against the live scene".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {"code": {"type": "string"}},
                "required": ["code"]
            }),
        },
        ToolDefinition {
            name: TOOL_GET_SCENE_INFO.to_string(),
            description: "Summarize the current scene (objects plus metadata)".to_string(),
            input_schema: json!({"type": "object", "properties": {}}),
        },
        ToolDefinition {
            name: TOOL_GET_OBJECT_INFO.to_string(),
            description: "Inspect one object in detail".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {"object_name": {"type": "string"}},
                "required": ["object_name"]
            }),
        },
        ToolDefinition {
            name: TOOL_GET_VIEWPORT_SCREENSHOT.to_string(),
            description: "Capture the viewport as a PNG".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {"max_size": {"type": "integer"}}
            }),
        },
    ]
}

/// Blocking Anthropic messages-API client serving both model roles.
pub struct AnthropicClient {
    client: reqwest::blocking::Client,
    api_key: String,
    base_url: String,
    reasoning_model: String,
    vision_model: String,
    max_tokens: u32,
}

impl AnthropicClient {
    /// Build a client from config plus the `ANTHROPIC_API_KEY` environment
    /// variable.
    pub fn from_env(config: &ModelConfig) -> Result<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .context("ANTHROPIC_API_KEY environment variable is not set")?;
        Ok(Self {
            client: reqwest::blocking::Client::new(),
            api_key,
            base_url: config.base_url.clone(),
            reasoning_model: config.reasoning.clone(),
            vision_model: config.vision.clone(),
            max_tokens: config.max_tokens,
        })
    }

    fn post_messages(&self, body: &Value) -> Result<Value> {
        let url = format!("{}/v1/messages", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(body)
            .send()
            .context("send messages request")?;
        let status = response.status();
        let payload: Value = response.json().context("parse messages response")?;
        if !status.is_success() {
            let message = payload
                .pointer("/error/message")
                .and_then(Value::as_str)
                .unwrap_or("unknown api error");
            return Err(anyhow!("messages api returned {status}: {message}"));
        }
        Ok(payload)
    }
}

/// Fold an Anthropic content-block array into text plus raw tool requests.
pub fn parse_message_content(payload: &Value) -> ModelResponse {
    let mut response = ModelResponse::default();
    let Some(blocks) = payload.get("content").and_then(Value::as_array) else {
        return response;
    };
    for block in blocks {
        match block.get("type").and_then(Value::as_str) {
            Some("text") => {
                if let Some(text) = block.get("text").and_then(Value::as_str) {
                    response.text.push_str(text);
                }
            }
            Some("tool_use") => {
                let name = block.get("name").cloned().unwrap_or(Value::Null);
                let args = block.get("input").cloned().unwrap_or_else(|| json!({}));
                response.tool_requests.push(json!({"name": name, "args": args}));
            }
            _ => {}
        }
    }
    response
}

impl ReasoningModel for AnthropicClient {
    fn complete(&self, request: &CompletionRequest) -> Result<ModelResponse> {
        let mut body = json!({
            "model": self.reasoning_model,
            "max_tokens": self.max_tokens,
            "messages": [{"role": "user", "content": request.prompt}],
        });
        if let Some(system) = &request.system {
            body["system"] = json!(system);
        }
        if !request.tools.is_empty() {
            body["tools"] = serde_json::to_value(&request.tools).context("serialize tools")?;
        }
        let payload = self.post_messages(&body)?;
        let response = parse_message_content(&payload);
        debug!(
            text_len = response.text.len(),
            tool_requests = response.tool_requests.len(),
            "reasoning completion parsed"
        );
        Ok(response)
    }
}

impl VisionModel for AnthropicClient {
    fn critique(&self, image_b64: &str, prompt: &str) -> Result<String> {
        let body = json!({
            "model": self.vision_model,
            "max_tokens": self.max_tokens,
            "messages": [{
                "role": "user",
                "content": [
                    {
                        "type": "image",
                        "source": {
                            "type": "base64",
                            "media_type": "image/png",
                            "data": image_b64,
                        }
                    },
                    {"type": "text", "text": prompt},
                ]
            }],
        });
        let payload = self.post_messages(&body)?;
        Ok(parse_message_content(&payload).text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_content_collects_text_and_tool_uses() {
        let payload = json!({
            "content": [
                {"type": "text", "text": "Creating the trunk. "},
                {"type": "tool_use", "id": "t1", "name": "execute_code",
                 "input": {"code": "import bpy"}},
                {"type": "text", "text": "Done."},
            ]
        });
        let response = parse_message_content(&payload);
        assert_eq!(response.text, "Creating the trunk. Done.");
        assert_eq!(response.tool_requests.len(), 1);
        assert_eq!(response.tool_requests[0]["name"], "execute_code");
        assert_eq!(response.tool_requests[0]["args"]["code"], "import bpy");
    }

    #[test]
    fn parse_content_tolerates_missing_content() {
        let response = parse_message_content(&json!({"error": "rate limited"}));
        assert_eq!(response, ModelResponse::default());
    }

    #[test]
    fn backend_tool_surface_is_closed() {
        let tools = backend_tool_definitions();
        let names: Vec<&str> = tools.iter().map(|tool| tool.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "execute_code",
                "get_scene_info",
                "get_object_info",
                "get_viewport_screenshot"
            ]
        );
    }
}
