//! String helpers available to module templates
//!
//! All filters are pure: no I/O, no environment access.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::collections::HashMap;
use tera::{Result, Value};

fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn usize_arg(args: &HashMap<String, Value>, name: &str, filter: &str) -> Result<usize> {
    args.get(name)
        .and_then(Value::as_u64)
        .map(|n| n as usize)
        .ok_or_else(|| tera::Error::msg(format!("{} filter expects a `{}` argument", filter, name)))
}

/// `"value"` with JSON-style escaping
pub(crate) fn quote(value: &Value, _args: &HashMap<String, Value>) -> Result<Value> {
    let quoted = serde_json::to_string(&as_text(value))?;
    Ok(Value::String(quoted))
}

/// `'value'` with YAML single-quote escaping
pub(crate) fn squote(value: &Value, _args: &HashMap<String, Value>) -> Result<Value> {
    Ok(Value::String(format!(
        "'{}'",
        as_text(value).replace('\'', "''")
    )))
}

/// Prefix every line with `width` spaces
pub(crate) fn indent(value: &Value, args: &HashMap<String, Value>) -> Result<Value> {
    let width = usize_arg(args, "width", "indent")?;
    Ok(Value::String(indent_lines(&as_text(value), width)))
}

/// Like `indent`, preceded by a newline
pub(crate) fn nindent(value: &Value, args: &HashMap<String, Value>) -> Result<Value> {
    let width = usize_arg(args, "width", "nindent")?;
    Ok(Value::String(format!(
        "\n{}",
        indent_lines(&as_text(value), width)
    )))
}

fn indent_lines(text: &str, width: usize) -> String {
    let pad = " ".repeat(width);
    text.lines()
        .map(|line| format!("{}{}", pad, line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Serialize any value as YAML (no trailing newline)
pub(crate) fn to_yaml(value: &Value, _args: &HashMap<String, Value>) -> Result<Value> {
    let yaml = serde_yaml_ng::to_string(value)
        .map_err(|e| tera::Error::msg(format!("to_yaml failed: {}", e)))?;
    Ok(Value::String(yaml.trim_end_matches('\n').to_string()))
}

pub(crate) fn b64enc(value: &Value, _args: &HashMap<String, Value>) -> Result<Value> {
    Ok(Value::String(STANDARD.encode(as_text(value))))
}

pub(crate) fn b64dec(value: &Value, _args: &HashMap<String, Value>) -> Result<Value> {
    let bytes = STANDARD
        .decode(as_text(value).trim())
        .map_err(|e| tera::Error::msg(format!("b64dec failed: {}", e)))?;
    let text = String::from_utf8(bytes)
        .map_err(|_| tera::Error::msg("b64dec produced invalid UTF-8"))?;
    Ok(Value::String(text))
}

/// Keep the first `length` characters
pub(crate) fn trunc(value: &Value, args: &HashMap<String, Value>) -> Result<Value> {
    let length = usize_arg(args, "length", "trunc")?;
    Ok(Value::String(as_text(value).chars().take(length).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn string(s: &str) -> Value {
        Value::String(s.to_string())
    }

    fn width(n: u64) -> HashMap<String, Value> {
        HashMap::from([("width".to_string(), Value::from(n))])
    }

    #[test]
    fn test_quote_escapes() {
        let out = quote(&string("say \"hi\""), &HashMap::new()).unwrap();
        assert_eq!(out, string("\"say \\\"hi\\\"\""));
        let out = quote(&Value::from(3), &HashMap::new()).unwrap();
        assert_eq!(out, string("\"3\""));
    }

    #[test]
    fn test_squote_doubles_single_quotes() {
        let out = squote(&string("it's"), &HashMap::new()).unwrap();
        assert_eq!(out, string("'it''s'"));
    }

    #[test]
    fn test_indent_and_nindent() {
        let out = indent(&string("a: 1\nb: 2"), &width(2)).unwrap();
        assert_eq!(out, string("  a: 1\n  b: 2"));
        let out = nindent(&string("a: 1"), &width(4)).unwrap();
        assert_eq!(out, string("\n    a: 1"));
        assert!(indent(&string("x"), &HashMap::new()).is_err());
    }

    #[test]
    fn test_to_yaml_object() {
        let value = serde_json::json!({"replicas": 2});
        let out = to_yaml(&value, &HashMap::new()).unwrap();
        assert_eq!(out, string("replicas: 2"));
    }

    #[test]
    fn test_base64() {
        let encoded = b64enc(&string("s3cret"), &HashMap::new()).unwrap();
        assert_eq!(encoded, string("czNjcmV0"));
        let decoded = b64dec(&encoded, &HashMap::new()).unwrap();
        assert_eq!(decoded, string("s3cret"));
        assert!(b64dec(&string("***"), &HashMap::new()).is_err());
    }

    #[test]
    fn test_trunc() {
        let args = HashMap::from([("length".to_string(), Value::from(3u64))]);
        assert_eq!(trunc(&string("release-name"), &args).unwrap(), string("rel"));
    }
}
