//! Schema validation for model-emitted tool requests.
//!
//! The reasoning model's output is untrusted input: every requested tool call
//! is validated against a closed schema before it is turned into a backend
//! invocation. There is no open-ended dispatch.

use std::sync::LazyLock;

use anyhow::{Context, Result, bail};
use jsonschema::{Draft, Validator};
use serde_json::{Map, Value};

const TOOL_REQUEST_SCHEMA: &str = include_str!("../../schemas/tool_request.schema.json");

static VALIDATOR: LazyLock<Validator> = LazyLock::new(|| {
    let schema: Value =
        serde_json::from_str(TOOL_REQUEST_SCHEMA).expect("embedded schema is valid json");
    jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(&schema)
        .expect("embedded schema compiles")
});

/// A validated tool invocation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolRequest {
    pub name: String,
    pub args: Value,
}

/// Validate an untrusted model-emitted value into a [`ToolRequest`].
///
/// Rejects unknown tool names, non-object arguments, and extraneous fields.
/// Missing `args` defaults to an empty object.
pub fn validate_tool_request(value: &Value) -> Result<ToolRequest> {
    let messages: Vec<String> = VALIDATOR
        .iter_errors(value)
        .map(|err| err.to_string())
        .collect();
    if !messages.is_empty() {
        bail!("tool request rejected:\n- {}", messages.join("\n- "));
    }
    let name = value
        .get("name")
        .and_then(Value::as_str)
        .context("tool request missing name")?
        .to_string();
    let args = value
        .get("args")
        .cloned()
        .unwrap_or_else(|| Value::Object(Map::new()));
    Ok(ToolRequest { name, args })
}
