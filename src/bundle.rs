use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

/// Timestamp text on the wire: RFC-3339-like UTC with second precision.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

fn serialize_timestamp<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&ts.format(TIMESTAMP_FORMAT).to_string())
}

fn serialize_timestamp_opt<S: Serializer>(
    ts: &Option<DateTime<Utc>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match ts {
        Some(ts) => serialize_timestamp(ts, serializer),
        None => serializer.serialize_none(),
    }
}

/// The record of one collector run. Exactly one of `data` and `error` is set
/// once the collector has run, and `start <= end` always holds.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionResult {
    pub pid: String,
    pub version: u32,
    #[serde(serialize_with = "serialize_timestamp")]
    pub start: DateTime<Utc>,
    #[serde(
        serialize_with = "serialize_timestamp_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub end: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The ordered set of collector results submitted in one request. The wire
/// body is a single object whose sole field is the result array.
#[derive(Debug, Serialize)]
pub struct Bundle {
    pub h: Vec<CollectionResult>,
}

#[derive(Debug, thiserror::Error)]
#[error("error encoding collector results: {0}")]
pub struct EncodingError(#[from] serde_json::Error);

impl Bundle {
    pub fn new(results: Vec<CollectionResult>) -> Self {
        Self { h: results }
    }

    pub fn encode(&self) -> Result<String, EncodingError> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(secs: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 5, 12, 30, secs).unwrap()
    }

    fn result(pid: &str, data: Option<&str>, error: Option<&str>) -> CollectionResult {
        CollectionResult {
            pid: pid.to_string(),
            version: 1,
            start: ts(0),
            end: Some(ts(2)),
            data: data.map(String::from),
            error: error.map(String::from),
        }
    }

    #[test]
    fn test_timestamp_second_precision() {
        let bundle = Bundle::new(vec![result("p/di", Some("{}"), None)]);
        let encoded = bundle.encode().unwrap();
        let value: serde_json::Value = serde_json::from_str(&encoded).unwrap();

        assert_eq!(value["h"][0]["start"], "2024-03-05T12:30:00Z");
        assert_eq!(value["h"][0]["end"], "2024-03-05T12:30:02Z");
    }

    #[test]
    fn test_mixed_success_and_failure_wire_shape() {
        // A succeeds, B fails with "timeout", C succeeds; the bundle carries
        // all three, in order, with error set only on B.
        let bundle = Bundle::new(vec![
            result("A", Some(r#"{"ok":true}"#), None),
            result("B", None, Some("timeout")),
            result("C", Some(r#"{"ok":true}"#), None),
        ]);

        let encoded = bundle.encode().unwrap();
        let value: serde_json::Value = serde_json::from_str(&encoded).unwrap();
        let h = value["h"].as_array().unwrap();

        assert_eq!(h.len(), 3);
        assert_eq!(h[0]["pid"], "A");
        assert_eq!(h[0]["data"], r#"{"ok":true}"#);
        assert!(h[0].get("error").is_none());
        assert_eq!(h[1]["pid"], "B");
        assert_eq!(h[1]["error"], "timeout");
        assert!(h[1].get("data").is_none());
        assert_eq!(h[2]["pid"], "C");
        assert_eq!(h[2]["data"], r#"{"ok":true}"#);
    }

    #[test]
    fn test_unfinished_result_omits_end() {
        let mut r = result("p/di", None, None);
        r.end = None;
        let encoded = Bundle::new(vec![r]).encode().unwrap();
        let value: serde_json::Value = serde_json::from_str(&encoded).unwrap();
        assert!(value["h"][0].get("end").is_none());
    }

    #[test]
    fn test_empty_bundle() {
        let encoded = Bundle::new(Vec::new()).encode().unwrap();
        assert_eq!(encoded, r#"{"h":[]}"#);
    }
}
