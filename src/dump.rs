//! Format decoded TL values for display (`tl_dump`, test diagnostics).
//!
//! Objects print as `name#tag { field: value ... }`, one field per line.
//! Byte strings that are printable UTF-8 print quoted; anything else prints as
//! hex. `int128` / `int256` always print as hex.

use crate::value::{Object, Value};

/// Raw scalar string.
pub fn format_scalar_raw(v: &Value) -> String {
    match v {
        Value::Int(x) => format!("{}", x),
        Value::Long(x) => format!("{}", x),
        Value::Double(x) => format!("{}", x),
        Value::Flags(x) => format!("0b{:b}", x),
        Value::Bool(x) => format!("{}", x),
        Value::Int128(b) => format!("0x{}", hex_compact(b)),
        Value::Int256(b) => format!("0x{}", hex_compact(b)),
        Value::Null => "null".to_string(),
        _ => format!("{:?}", v),
    }
}

pub fn hex_string(b: &[u8]) -> String {
    b.iter().map(|x| format!("{:02x}", x)).collect::<Vec<_>>().join(" ")
}

fn hex_compact(b: &[u8]) -> String {
    b.iter().rev().map(|x| format!("{:02x}", x)).collect()
}

fn format_bytes(b: &[u8]) -> String {
    match std::str::from_utf8(b) {
        Ok(s) if s.chars().all(|c| !c.is_control() || c == '\n' || c == '\t') => format!("{:?}", s),
        _ => format!("hex({})", hex_string(b)),
    }
}

/// Header line for an object: qualified name plus tag when it has one.
pub fn object_header(obj: &Object) -> String {
    match obj.tag {
        Some(tag) => format!("{}#{:08x}", obj.name, tag),
        None => obj.name.clone(),
    }
}

/// Format a value for display, indented by `indent` levels.
pub fn value_to_dump(v: &Value, indent: usize) -> String {
    let pad = "  ".repeat(indent);
    match v {
        Value::Bytes(b) => format!("{}{}", pad, format_bytes(b)),
        Value::Object(obj) => object_to_dump(obj, indent),
        Value::Vector(items) => {
            if items.is_empty() {
                return format!("{}[]", pad);
            }
            let mut lines: Vec<String> = vec![format!("{}[", pad)];
            for (i, item) in items.iter().enumerate() {
                let sub = value_to_dump(item, indent + 1);
                lines.push(format!("{}  [{}] {}", pad, i, sub.trim_start()));
            }
            lines.push(format!("{}]", pad));
            lines.join("\n")
        }
        _ => format!("{}{}", pad, format_scalar_raw(v)),
    }
}

pub fn object_to_dump(obj: &Object, indent: usize) -> String {
    let pad = "  ".repeat(indent);
    if obj.fields.is_empty() {
        return format!("{}{} {{}}", pad, object_header(obj));
    }
    let mut lines: Vec<String> = vec![format!("{}{} {{", pad, object_header(obj))];
    for (name, val) in &obj.fields {
        let sub = value_to_dump(val, indent + 1);
        lines.push(format!("{}  {}: {}", pad, name, sub.trim_start()));
    }
    lines.push(format!("{}}}", pad));
    lines.join("\n")
}

/// First line of [`value_to_dump`] (one-line summaries in logs).
pub fn value_summary_line(v: &Value) -> String {
    let full = value_to_dump(v, 0);
    full.lines().next().map(|s| s.trim().to_string()).unwrap_or_default()
}
