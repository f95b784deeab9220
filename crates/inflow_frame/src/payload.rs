use regex::Regex;
use serde_json::Value;

/// The datasource answers in one of three shapes: a full response object
/// with a `data` list, a bare row list, or a text blob with JSON objects
/// embedded in it. Classification happens once, here, so the rest of the
/// pipeline only ever sees row objects.
#[derive(Debug, Clone)]
pub enum InflowPayload {
    Structured(Vec<Value>),
    RawText(String),
    RowList(Vec<Value>),
}

impl InflowPayload {
    /// `None` means there is no payload at all (null body or failed fetch).
    /// An object without a usable `data` list classifies as structured but
    /// carries no rows.
    pub fn classify(raw: Value) -> Option<Self> {
        match raw {
            Value::Null => None,
            Value::Object(mut map) => {
                let items = match map.remove("data") {
                    Some(Value::Array(items)) => items,
                    _ => Vec::new(),
                };
                Some(Self::Structured(items))
            }
            Value::String(text) => Some(Self::RawText(text)),
            Value::Array(items) => Some(Self::RowList(items)),
            _ => Some(Self::RowList(Vec::new())),
        }
    }

    /// Flatten into row objects. Fragments of a raw-text payload that fail
    /// to parse are dropped, not fatal.
    pub fn into_rows(self) -> Vec<Value> {
        match self {
            Self::Structured(items) | Self::RowList(items) => items,
            Self::RawText(text) => extract_objects(&text),
        }
    }
}

// Non-nested `{...}` spans only; the feed does not emit nested objects.
fn extract_objects(text: &str) -> Vec<Value> {
    let pattern = Regex::new(r"\{[^{}]*\}").expect("Failed to compile object pattern");

    pattern
        .find_iter(text)
        .filter_map(|span| serde_json::from_str(span.as_str()).ok())
        .collect()
}
