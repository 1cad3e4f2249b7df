//! Display text for message parts.

use chatbridge_types::{Part, ToolState};
use serde_json::{Map, Value};
use std::fmt::Write;

/// Inline `content` values longer than this are replaced by a size note.
pub const CONTENT_INLINE_LIMIT: usize = 500;

pub fn render_part(part: &Part) -> String {
    match part {
        Part::Text { text } => format!("{}\n\n", text),
        Part::Tool { tool, state, .. } => {
            format!(
                "\n### Tool Execution: {}\n```\n{}```\n\n",
                tool,
                render_tool_state(state)
            )
        }
        Part::File { filename, mime, .. } => {
            format!("\n### File: {}\nType: {}\n\n", filename, mime)
        }
        Part::Snapshot { snapshot } => {
            let close = if snapshot.ends_with('\n') { "" } else { "\n" };
            format!("\n### Code Snapshot\n```\n{}{}```\n\n", snapshot, close)
        }
        Part::Patch { files, .. } => {
            let mut out = String::from("\n### Files Modified\n");
            for file in files {
                let _ = writeln!(out, "- {}", file);
            }
            out.push('\n');
            out
        }
        Part::Malformed { .. } | Part::Unknown => String::new(),
    }
}

pub fn render_tool_state(state: &ToolState) -> String {
    let mut out = String::new();
    match state {
        ToolState::Pending => out.push_str("Status: Pending\n"),
        ToolState::Running { title, .. } => {
            out.push_str("Status: Running\n");
            push_title(&mut out, title.as_deref());
        }
        ToolState::Completed {
            input,
            output,
            title,
        } => {
            out.push_str("Status: Completed\n");
            push_title(&mut out, title.as_deref());
            if let Some(input) = input {
                out.push_str(&render_input(input));
            }
            if let Some(output) = output {
                let _ = writeln!(out, "Output:\n{}", output);
            }
        }
        ToolState::Error { input, error } => {
            out.push_str("Status: Error\n");
            if let Some(error) = error {
                let _ = writeln!(out, "Error: {}", error);
            }
            if let Some(input) = input {
                out.push_str(&render_input(input));
            }
        }
    }
    out
}

fn push_title(out: &mut String, title: Option<&str>) {
    if let Some(title) = title {
        let _ = writeln!(out, "Title: {}", title);
    }
}

/// One line per argument, with shell and file arguments given a familiar look.
pub fn render_input(input: &Map<String, Value>) -> String {
    let mut out = String::new();
    for (key, value) in input {
        match key.as_str() {
            "command" | "cmd" => {
                let _ = writeln!(out, "$ {}", display_value(value));
            }
            "path" | "file" | "file_path" => {
                let _ = writeln!(out, "File: {}", display_value(value));
            }
            "content" => {
                let content = display_value(value);
                let chars = content.chars().count();
                if chars <= CONTENT_INLINE_LIMIT {
                    let _ = writeln!(out, "{}", content);
                } else {
                    let _ = writeln!(out, "[Content truncated: {} chars]", chars);
                }
            }
            _ => {
                let _ = writeln!(out, "{}: {}", key, display_value(value));
            }
        }
    }
    out
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
