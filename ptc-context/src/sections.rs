//! Rendering for each section of the coalesced user prompt.
//!
//! Every `*_section` function returns `None` when it has nothing to
//! show, so the caller can filter and join without separately
//! tracking emptiness.

use ptc_runtime::{to_json, Memory, Value};
use ptc_turn::Turn;

use crate::options::ToolDescriptor;

const SAMPLE_MAX_CHARS: usize = 60;

fn render_sample(v: &Value) -> String {
    let text = to_json(v).to_string();
    if text.chars().count() > SAMPLE_MAX_CHARS {
        let truncated: String = text.chars().take(SAMPLE_MAX_CHARS).collect();
        format!("{truncated}\u{2026}")
    } else {
        text
    }
}

fn key_name(k: &Value) -> String {
    match k {
        Value::Keyword(s) | Value::Str(s) => s.clone(),
        other => render_sample(other),
    }
}

fn describe_binding(name: &str, value: &Value, show_sample: bool) -> String {
    if let Value::Closure(c) = value {
        let ret = c.return_type_hint.as_deref().unwrap_or("any");
        match &c.doc {
            Some(doc) => format!("user/{name} ; fn -> {ret} - {doc}"),
            None => format!("user/{name} ; fn -> {ret}"),
        }
    } else if show_sample {
        format!("user/{name} ; = {}, sample: {}", value.type_name(), render_sample(value))
    } else {
        format!("user/{name} ; = {}", value.type_name())
    }
}

pub(crate) fn mission_section(mission: Option<&str>) -> Option<String> {
    mission.map(|m| m.to_string())
}

pub(crate) fn tools_section(tools: &[ToolDescriptor]) -> Option<String> {
    if tools.is_empty() {
        return None;
    }
    let lines: Vec<String> = tools
        .iter()
        .map(|t| format!("tool/{} {} - {}", t.name, t.params, t.description))
        .collect();
    Some(format!("tool/ namespace:\n{}", lines.join("\n")))
}

pub(crate) fn data_section(data: &[(String, Value)]) -> Option<String> {
    if data.is_empty() {
        return None;
    }
    let lines: Vec<String> = data
        .iter()
        .map(|(name, v)| format!("data/{name} ; = {}, sample: {}", v.type_name(), render_sample(v)))
        .collect();
    Some(format!("data/ namespace:\n{}", lines.join("\n")))
}

/// `explicit_mode` is driven by whether the most recent turn printed:
/// a turn that printed switches the whole prelude to Explicit mode
/// (types only, print lines live in the Output section instead);
/// otherwise Exploration mode shows a sample alongside each type.
pub(crate) fn user_prelude_section(memory: &Memory, explicit_mode: bool) -> Option<String> {
    if memory.0.is_empty() {
        return None;
    }
    let lines: Vec<String> = memory
        .0
        .iter()
        .map(|(k, v)| describe_binding(&key_name(k), v, !explicit_mode))
        .collect();
    Some(format!("user/ prelude:\n{}", lines.join("\n")))
}

pub(crate) fn tool_calls_section(turns: &[Turn], limit: usize) -> Option<String> {
    let mut calls: Vec<_> = turns.iter().flat_map(|t| t.tool_calls.iter()).collect();
    if calls.is_empty() {
        return None;
    }
    calls.reverse();
    let lines: Vec<String> = calls
        .into_iter()
        .take(limit)
        .map(|c| {
            let outcome = match &c.result {
                Ok(v) => render_sample(v),
                Err(e) => format!("error: {e}"),
            };
            format!("{}({}) => {}", c.name, render_sample(&c.args), outcome)
        })
        .collect();
    Some(format!("Tool calls made:\n{}", lines.join("\n")))
}

pub(crate) fn output_section(turns: &[Turn], limit: usize) -> Option<String> {
    let all: Vec<&str> = turns.iter().flat_map(|t| t.prints.iter().map(String::as_str)).collect();
    if all.is_empty() {
        return None;
    }
    let start = all.len().saturating_sub(limit);
    Some(format!("Output:\n{}", all[start..].join("\n")))
}

pub(crate) fn failed_turns_section(turns: &[Turn]) -> Option<String> {
    let blocks: Vec<String> = turns
        .iter()
        .filter(|t| !t.success())
        .map(|t| {
            let program = t.program.as_deref().unwrap_or("<no program parsed>");
            let message = t.failure().map(|f| f.message.as_str()).unwrap_or("unknown error");
            format!("Turn {} failed:\n```lisp\n{program}\n```\nError: {message}", t.number)
        })
        .collect();
    if blocks.is_empty() {
        None
    } else {
        Some(blocks.join("\n\n"))
    }
}

pub(crate) fn validation_error_section(validation_error: Option<&str>) -> Option<String> {
    validation_error.map(|msg| format!("Your last `return` value failed validation:\n{msg}"))
}

pub(crate) fn turns_left_section(turns_left: u32) -> String {
    if turns_left == 1 {
        "FINAL TURN - you must call (return ...) or (fail ...) now".to_string()
    } else {
        format!("Turns left: {turns_left}")
    }
}
