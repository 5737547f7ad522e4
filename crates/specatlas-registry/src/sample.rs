//! Best-effort sample synthesis from JSON-Schema fragments.
//!
//! Given a schema fragment, produce one representative value without consulting live
//! data. This is a synthesizer, not a validator: it never fails and never checks the
//! produced value against the schema's constraints (bounds, patterns, required sets).

use chrono::Utc;
use serde_json::{Map, Value, json};

/// Recursion bound. Dereferenced schemas are not necessarily acyclic, so depth is
/// carried as an explicit parameter and anything deeper samples as null.
const MAX_DEPTH: u8 = 4;

const NIL_UUID: &str = "00000000-0000-0000-0000-000000000000";

/// Synthesize one representative value for a JSON-Schema-like fragment.
///
/// Precedence, first match wins: depth guard, explicit `example`, explicit `default`,
/// first `enum` entry, declared `type` branch, composition keywords
/// (`oneOf[0]` / `anyOf[0]` / shallow-merged `allOf`), null.
#[must_use]
pub fn sample_from_schema(schema: &Value) -> Value {
    sample_at(schema, 0)
}

fn sample_at(schema: &Value, depth: u8) -> Value {
    if depth > MAX_DEPTH {
        return Value::Null;
    }
    let Some(obj) = schema.as_object() else {
        return Value::Null;
    };

    if let Some(example) = obj.get("example") {
        return example.clone();
    }
    if let Some(default) = obj.get("default") {
        return default.clone();
    }
    if let Some(first) = obj.get("enum").and_then(Value::as_array).and_then(|e| e.first()) {
        return first.clone();
    }

    // `type` may be a single string or (3.1) an array of types; take the first.
    let declared = match obj.get("type") {
        Some(Value::String(t)) => Some(t.as_str()),
        Some(Value::Array(types)) => types.first().and_then(Value::as_str),
        _ => None,
    };

    match declared {
        Some("string") => sample_string(obj),
        Some("integer" | "number") => json!(0),
        Some("boolean") => Value::Bool(true),
        Some("array") => {
            let items = obj.get("items").cloned().unwrap_or_else(|| json!({}));
            Value::Array(vec![sample_at(&items, depth + 1)])
        }
        Some("object") => {
            let mut out = Map::new();
            if let Some(props) = obj.get("properties").and_then(Value::as_object) {
                for (name, prop) in props {
                    out.insert(name.clone(), sample_at(prop, depth + 1));
                }
            }
            Value::Object(out)
        }
        _ => sample_composition(obj, depth),
    }
}

fn sample_string(obj: &Map<String, Value>) -> Value {
    match obj.get("format").and_then(Value::as_str) {
        Some("date-time") => Value::String(Utc::now().to_rfc3339()),
        Some("date") => Value::String(Utc::now().format("%Y-%m-%d").to_string()),
        Some("uuid") => Value::String(NIL_UUID.to_string()),
        _ => Value::String("string".to_string()),
    }
}

fn sample_composition(obj: &Map<String, Value>, depth: u8) -> Value {
    if let Some(first) = obj.get("oneOf").and_then(Value::as_array).and_then(|v| v.first()) {
        return sample_at(first, depth + 1);
    }
    if let Some(first) = obj.get("anyOf").and_then(Value::as_array).and_then(|v| v.first()) {
        return sample_at(first, depth + 1);
    }
    if let Some(all) = obj.get("allOf").and_then(Value::as_array)
        && !all.is_empty()
    {
        // Fold object results left to right; non-object members contribute nothing.
        let mut merged = Map::new();
        for member in all {
            if let Value::Object(m) = sample_at(member, depth + 1) {
                merged.extend(m);
            }
        }
        return Value::Object(merged);
    }
    Value::Null
}
