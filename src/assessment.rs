use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What `assess()` always returns: an opaque encrypted verdict when the
/// exchange succeeded, and a status string that is always present. On
/// success the status carries the server-reported state; on failure it
/// describes the local failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentResponse {
    pub data: Option<String>,
    pub status: String,
}

impl AssessmentResponse {
    /// A response describing a local failure; the verdict is absent.
    pub fn degraded(status: impl Into<String>) -> Self {
        Self {
            data: None,
            status: status.into(),
        }
    }

    pub fn decode(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

/// The fully-typed risk structure returned by the decryption endpoint.
///
/// Every field is independently optional: the server omits signals it could
/// not determine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecryptedAssessment {
    pub vpn: Option<bool>,
    pub proxied: Option<bool>,
    pub anon: Option<bool>,
    pub rdp: Option<bool>,
    pub dch: Option<bool>,
    pub cc: Option<String>,
    pub ip: Option<String>,
    pub ipv6: Option<String>,
    pub ts: Option<DateTime<Utc>>,
    pub complete: Option<bool>,
    pub id: Option<String>,
    pub sid: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_decode_success_response() {
        let response =
            AssessmentResponse::decode(r#"{"data":"opaque-verdict","status":"complete"}"#).unwrap();
        assert_eq!(response.data.as_deref(), Some("opaque-verdict"));
        assert_eq!(response.status, "complete");
    }

    #[test]
    fn test_decode_response_without_verdict() {
        let response = AssessmentResponse::decode(r#"{"status":"pending"}"#).unwrap();
        assert!(response.data.is_none());
        assert_eq!(response.status, "pending");
    }

    #[test]
    fn test_decode_rejects_missing_status() {
        assert!(AssessmentResponse::decode(r#"{"data":"x"}"#).is_err());
    }

    #[test]
    fn test_decrypted_assessment_full_decode() {
        let json = r#"
        {
          "vpn": true,
          "proxied": false,
          "anon": true,
          "rdp": false,
          "dch": false,
          "cc": "US",
          "ip": "198.51.23.210",
          "ipv6": "2001:db8:e214:9f67:711:f03e:a141:3871",
          "ts": "2022-10-17T14:03:19-04:00",
          "complete": true,
          "id": "580f12c9-8030-4d49-b39f-35dfe560fa9e",
          "sid": "example-sign-up-form"
        }
        "#;

        let assessment: DecryptedAssessment = serde_json::from_str(json).unwrap();

        assert_eq!(assessment.vpn, Some(true));
        assert_eq!(assessment.proxied, Some(false));
        assert_eq!(assessment.anon, Some(true));
        assert_eq!(assessment.rdp, Some(false));
        assert_eq!(assessment.dch, Some(false));
        assert_eq!(assessment.cc.as_deref(), Some("US"));
        assert_eq!(assessment.ip.as_deref(), Some("198.51.23.210"));
        assert_eq!(
            assessment.ipv6.as_deref(),
            Some("2001:db8:e214:9f67:711:f03e:a141:3871")
        );
        assert_eq!(assessment.complete, Some(true));
        assert_eq!(
            assessment.id.as_deref(),
            Some("580f12c9-8030-4d49-b39f-35dfe560fa9e")
        );
        assert_eq!(assessment.sid.as_deref(), Some("example-sign-up-form"));

        // The -04:00 source offset parses to the same instant in UTC.
        let expected = Utc.with_ymd_and_hms(2022, 10, 17, 18, 3, 19).unwrap();
        assert_eq!(assessment.ts, Some(expected));
    }

    #[test]
    fn test_decrypted_assessment_all_fields_optional() {
        let assessment: DecryptedAssessment = serde_json::from_str("{}").unwrap();
        assert!(assessment.vpn.is_none());
        assert!(assessment.ts.is_none());
        assert!(assessment.sid.is_none());
    }
}
