//! Plain-text rendering of a snapshot for notification bodies.
//!
//! Layout, one entry per line:
//! ```text
//! key: value
//! section:
//! child: value
//!
//! ```
//! Nested objects are introduced by `key:` and followed by a blank line.
//! A container's own value (the `@value` key) is printed on its header line.

use serde_json::{Map, Value as JsonValue};

use crate::store::SELF_KEY;

pub fn format_form_data(data: &JsonValue) -> String {
    let mut out = String::new();
    if let JsonValue::Object(map) = data {
        write_object(map, &mut out);
    }
    out
}

fn write_object(map: &Map<String, JsonValue>, out: &mut String) {
    for (key, value) in map {
        if key == SELF_KEY {
            continue;
        }
        match value {
            JsonValue::Object(child) => {
                match child.get(SELF_KEY) {
                    Some(own) => {
                        out.push_str(key);
                        out.push_str(": ");
                        out.push_str(&scalar(own));
                        out.push('\n');
                    }
                    None => {
                        out.push_str(key);
                        out.push_str(":\n");
                    }
                }
                write_object(child, out);
                out.push('\n');
            }
            leaf => {
                out.push_str(key);
                out.push_str(": ");
                out.push_str(&scalar(leaf));
                out.push('\n');
            }
        }
    }
}

fn scalar(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => String::new(),
        JsonValue::String(s) => s.clone(),
        JsonValue::Array(items) => items.iter().map(scalar).collect::<Vec<_>>().join(", "),
        other => other.to_string(),
    }
}

/// Escape text for inclusion in an HTML body.
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
