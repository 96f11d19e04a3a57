use crate::ipc::error::err;
use crate::ipc::types::Request;

pub fn required_str<'a>(req: &'a Request, key: &str) -> Result<&'a str, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {key}"), None))
}

pub fn optional_str<'a>(req: &'a Request, key: &str) -> Option<&'a str> {
    req.params.get(key).and_then(|v| v.as_str())
}

/// Lenient numeric read: `None` when the key is absent, `fallback` when it is
/// present but not a finite number or numeric string.
pub fn parse_number(raw: Option<&serde_json::Value>, fallback: f64) -> Option<f64> {
    let v = raw?;
    let parsed = match v {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Some(parsed.filter(|n| n.is_finite()).unwrap_or(fallback))
}
