use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{ClientError, Result};

/// `{error, detail?}` body carried by non-2xx responses
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default)]
    pub detail: Option<String>,
}

/// Paging/meta block attached to list responses
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct PageMeta {
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub limit: Option<u64>,
    #[serde(default)]
    pub offset: Option<u64>,
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Diagnostics payload (`/health`, `/queue/stats`, ...).
///
/// Only `status` is interpreted; everything else is kept as raw JSON.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ServiceStatus {
    #[serde(default)]
    pub status: Option<Value>,
    #[serde(flatten)]
    pub details: serde_json::Map<String, Value>,
}

impl ServiceStatus {
    pub fn status_text(&self) -> String {
        match &self.status {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => "unknown".to_string(),
        }
    }

    pub fn is_healthy(&self) -> bool {
        matches!(
            self.status_text().to_ascii_lowercase().as_str(),
            "ok" | "healthy" | "up" | "200"
        )
    }
}

/// A page of items plus the meta block that came with it
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub meta: PageMeta,
}

/// Decode a response body that may or may not be wrapped in the envelope.
pub fn decode_body<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let value: Value = serde_json::from_slice(bytes)?;
    if let Value::Object(map) = &value {
        if let Some(data) = map.get("data") {
            if let Ok(inner) = serde_json::from_value::<T>(data.clone()) {
                return Ok(inner);
            }
        }
    }
    serde_json::from_value::<T>(value).map_err(ClientError::from)
}

/// Decode a list response into items + meta
pub fn decode_page<T: DeserializeOwned>(bytes: &[u8]) -> Result<Page<T>> {
    let value: Value = serde_json::from_slice(bytes)?;
    match value {
        Value::Array(_) => Ok(Page {
            items: serde_json::from_value(value)?,
            meta: PageMeta::default(),
        }),
        Value::Object(mut map) => {
            let items = match map.remove("data") {
                Some(data) => serde_json::from_value(data)?,
                None => {
                    return Err(ClientError::MalformedResponse(
                        "list response without 'data' field".to_string(),
                    ))
                }
            };
            let meta = match map.remove("meta") {
                Some(meta) => serde_json::from_value(meta).unwrap_or_default(),
                None => PageMeta::default(),
            };
            Ok(Page { items, meta })
        }
        _ => Err(ClientError::MalformedResponse(
            "expected JSON array or object".to_string(),
        )),
    }
}

/// Accept ids that arrive as either JSON strings or numbers
pub fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Track;

    #[test]
    fn enveloped_and_bare_bodies_both_decode() {
        let wrapped = br#"{"data": {"status": "ok"}, "status": 200}"#;
        let bare = br#"{"status": "ok", "uptime": 12}"#;

        let a: ServiceStatus = decode_body(wrapped).unwrap();
        let b: ServiceStatus = decode_body(bare).unwrap();
        assert!(a.is_healthy());
        assert!(b.is_healthy());
        assert_eq!(b.details.get("uptime"), Some(&Value::from(12)));
    }

    #[test]
    fn page_keeps_meta() {
        let body = br#"{"data": [{"id": 1, "title": "A", "artist": "B"}], "meta": {"count": 1, "source": "mix"}}"#;
        let page: Page<Track> = decode_page(body).unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.meta.count, Some(1));
        assert_eq!(page.meta.extra.get("source"), Some(&Value::from("mix")));
    }

    #[test]
    fn page_without_data_is_malformed() {
        let result: Result<Page<Track>> = decode_page(br#"{"items": []}"#);
        assert!(matches!(result, Err(ClientError::MalformedResponse(_))));
    }
}
