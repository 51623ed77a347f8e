//! Inputs to one compression pass.

use ptc_runtime::Value;

/// Default truncation for the "Tool calls made" section.
pub const DEFAULT_TOOL_CALL_LIMIT: usize = 20;
/// Default truncation for the "Output" section.
pub const DEFAULT_PRINTLN_LIMIT: usize = 15;

/// One tool available this turn, as shown in the `tool/` namespace
/// section. Parameter shape and description are host-supplied —
/// the compression strategy never inspects a tool implementation.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDescriptor {
    /// Bare name; rendered as `tool/<name>`.
    pub name: String,
    /// One-line parameter shape, e.g. `{:query string}`.
    pub params: String,
    /// One-line description.
    pub description: String,
}

impl ToolDescriptor {
    /// Builds a tool descriptor.
    pub fn new(name: impl Into<String>, params: impl Into<String>, description: impl Into<String>) -> Self {
        ToolDescriptor {
            name: name.into(),
            params: params.into(),
            description: description.into(),
        }
    }
}

/// Everything a compression pass needs beyond the turn history and
/// current memory.
#[derive(Debug, Clone)]
pub struct CompressionOptions {
    /// The system prompt, emitted unchanged as `messages[0]`.
    pub system_prompt: String,
    /// The mission string, shown first in the user prompt when present.
    pub mission: Option<String>,
    /// Tools available this turn. Empty on a `:retry` turn, where only
    /// `return`/`fail` remain callable.
    pub tools: Vec<ToolDescriptor>,
    /// The read-only `ctx/name` namespace, shown under the `data/`
    /// heading with a type label and optional sample.
    pub data: Vec<(String, Value)>,
    /// How many of the most recent tool calls to show, most-recent
    /// first.
    pub tool_call_limit: usize,
    /// How many of the most recent `println` lines to show.
    pub println_limit: usize,
    /// Turns remaining in the run, including this one. `1` triggers
    /// the "final turn" notice instead of a plain count.
    pub turns_left: u32,
    /// Set by the loop when the previous turn's `return` value failed
    /// signature validation, so the LLM sees why before trying again.
    pub validation_error: Option<String>,
}

impl CompressionOptions {
    /// Builds options with the default truncation limits and no
    /// mission/tools/data/validation-error.
    pub fn new(system_prompt: impl Into<String>, turns_left: u32) -> Self {
        CompressionOptions {
            system_prompt: system_prompt.into(),
            mission: None,
            tools: Vec::new(),
            data: Vec::new(),
            tool_call_limit: DEFAULT_TOOL_CALL_LIMIT,
            println_limit: DEFAULT_PRINTLN_LIMIT,
            turns_left,
            validation_error: None,
        }
    }
}
