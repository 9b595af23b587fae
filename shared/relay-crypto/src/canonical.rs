//! Canonical Byte Strings
//!
//! One builder per signed message class so signer and verifier always agree on
//! the exact bytes. Pipe-joined forms rely on identifiers never containing
//! [`DELIMITER`]; callers validate that before building.

use serde_json::{Number, Value};

/// Field separator for the pipe-joined forms.
pub const DELIMITER: char = '|';

/// `workspace_id|timestamp|encrypted` for broker → server envelopes.
pub fn envelope_payload(workspace_id: &str, timestamp: i64, encrypted: &str) -> Vec<u8> {
    format!("{workspace_id}{DELIMITER}{timestamp}{DELIMITER}{encrypted}").into_bytes()
}

/// `workspace_id|action|timestamp|body` for simple server → broker requests.
pub fn request_payload(workspace_id: &str, action: &str, timestamp: i64, body: &str) -> Vec<u8> {
    format!("{workspace_id}{DELIMITER}{action}{DELIMITER}{timestamp}{DELIMITER}{body}")
        .into_bytes()
}

/// Deterministic JSON: object keys sorted recursively, array order preserved,
/// numbers and strings written the way `JSON.stringify` writes them.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_value(value, &mut out);
    out
}

fn write_value(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => write_number(n, out),
        Value::String(s) => write_string(s, out),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            // Key order follows UTF-16 code units, matching JS `Array.prototype.sort`.
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort_by(|a, b| a.encode_utf16().cmp(b.encode_utf16()));

            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(key, out);
                out.push(':');
                write_value(&map[key.as_str()], out);
            }
            out.push('}');
        }
    }
}

fn write_number(n: &Number, out: &mut String) {
    if n.is_i64() || n.is_u64() {
        out.push_str(&n.to_string());
        return;
    }
    match n.as_f64() {
        Some(f) if f == 0.0 => out.push('0'),
        // Integral floats print without a fraction, as in JS.
        Some(f) if f.fract() == 0.0 && f.abs() < 1e21 => out.push_str(&format!("{f:.0}")),
        _ => {
            // JS always signs the exponent: 1e+21, 1e-7.
            let text = n.to_string();
            match text.split_once('e') {
                Some((mantissa, exp)) if !exp.starts_with('-') => {
                    out.push_str(mantissa);
                    out.push_str("e+");
                    out.push_str(exp.trim_start_matches('+'));
                }
                _ => out.push_str(&text),
            }
        }
    }
}

fn write_string(s: &str, out: &mut String) {
    // serde_json's string escaping is the same set JSON.stringify uses.
    match serde_json::to_string(s) {
        Ok(escaped) => out.push_str(&escaped),
        Err(_) => out.push_str("\"\""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn envelope_payload_layout() {
        assert_eq!(
            envelope_payload("T123", 1_700_000_000, "abc="),
            b"T123|1700000000|abc=".to_vec()
        );
    }

    #[test]
    fn request_payload_layout() {
        assert_eq!(
            request_payload("T123", "unregister", 42, ""),
            b"T123|unregister|42|".to_vec()
        );
    }

    #[test]
    fn insertion_order_does_not_matter() {
        let a: Value =
            serde_json::from_str(r#"{"b":1,"a":{"y":[3,1],"x":"v"},"c":null}"#).unwrap();
        let b: Value =
            serde_json::from_str(r#"{"c":null,"a":{"x":"v","y":[3,1]},"b":1}"#).unwrap();

        assert_eq!(canonical_json(&a), canonical_json(&b));
        assert_eq!(
            canonical_json(&a),
            r#"{"a":{"x":"v","y":[3,1]},"b":1,"c":null}"#
        );
    }

    #[test]
    fn array_order_is_preserved() {
        let value = json!({ "list": [{"b": 2, "a": 1}, null, "z", 1] });
        assert_eq!(
            canonical_json(&value),
            r#"{"list":[{"a":1,"b":2},null,"z",1]}"#
        );
    }

    #[test]
    fn numbers_match_js_formatting() {
        assert_eq!(canonical_json(&json!(1.0)), "1");
        assert_eq!(canonical_json(&json!(-3)), "-3");
        assert_eq!(canonical_json(&json!(0.5)), "0.5");
    }

    #[test]
    fn exponents_are_signed_like_js() {
        assert_eq!(canonical_json(&json!(1e21)), "1e+21");
        assert_eq!(canonical_json(&json!(1.5e300)), "1.5e+300");
        assert_eq!(canonical_json(&json!(1e-7)), "1e-7");
        assert_eq!(canonical_json(&json!(1e20)), "100000000000000000000");
    }

    #[test]
    fn strings_are_escaped() {
        assert_eq!(
            canonical_json(&json!({"k": "a\"b\n\u{1}"})),
            r#"{"k":"a\"b\n\u0001"}"#
        );
    }
}
