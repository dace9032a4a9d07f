//! Core types for Guardpost

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Sentinel rendered for device fields the client did not report
pub const UNKNOWN: &str = "Unknown";

/// A single classifier output entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelScore {
    /// Classification label (e.g. "toxicity", "insult")
    pub label: String,

    /// Confidence score (0.0-1.0)
    pub score: f32,
}

impl LabelScore {
    /// Create a new label/score entry
    pub fn new(label: impl Into<String>, score: f32) -> Self {
        Self {
            label: label.into(),
            score,
        }
    }
}

/// Device metadata reported by the browser extension alongside a moderation
/// request.
///
/// The recognized key set is closed; every field is optional and absent
/// fields render as sentinel values, never as nulls.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeviceReport {
    #[serde(rename = "publicIP", skip_serializing_if = "Option::is_none")]
    pub public_ip: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub screen_width: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub screen_height: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_line: Option<bool>,

    /// Client-side detection time, ISO 8601
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl DeviceReport {
    /// Public IP, or the sentinel when absent
    pub fn ip_or_unknown(&self) -> &str {
        self.public_ip.as_deref().unwrap_or(UNKNOWN)
    }

    /// Browser user agent, or the sentinel when absent
    pub fn browser_or_unknown(&self) -> &str {
        self.user_agent.as_deref().unwrap_or(UNKNOWN)
    }

    /// Operating system / platform, or the sentinel when absent
    pub fn platform_or_unknown(&self) -> &str {
        self.platform.as_deref().unwrap_or(UNKNOWN)
    }

    /// Timezone, or the sentinel when absent
    pub fn timezone_or_unknown(&self) -> &str {
        self.timezone.as_deref().unwrap_or(UNKNOWN)
    }

    /// Language, or the sentinel when absent
    pub fn language_or_unknown(&self) -> &str {
        self.language.as_deref().unwrap_or(UNKNOWN)
    }

    /// Combined screen resolution as "WxH", or "N/A" when either side is
    /// missing
    pub fn screen_resolution(&self) -> String {
        match (self.screen_width, self.screen_height) {
            (Some(w), Some(h)) => format!("{}x{}", w, h),
            _ => "N/A".to_string(),
        }
    }

    /// Detection time: the client-supplied timestamp when parseable,
    /// otherwise the given receipt time.
    ///
    /// A bad timestamp can never fail an alert write.
    pub fn detected_at(&self, received_at: DateTime<Utc>) -> DateTime<Utc> {
        match &self.timestamp {
            Some(raw) => parse_detection_timestamp(raw).unwrap_or_else(|e| {
                tracing::debug!("falling back to receipt time: {}", e);
                received_at
            }),
            None => received_at,
        }
    }
}

/// Parse a client-supplied detection timestamp.
///
/// Accepts RFC 3339 (with or without sub-seconds and `Z`) and the naive
/// `YYYY-MM-DDTHH:MM:SS[.fff]` form, which is assumed to be UTC.
pub fn parse_detection_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(naive.and_utc());
        }
    }

    Err(Error::MalformedTimestamp(raw.to_string()))
}

/// Truncate a string to at most `max_chars` characters, respecting UTF-8
/// boundaries.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_device_report_sentinels() {
        let report = DeviceReport::default();

        assert_eq!(report.ip_or_unknown(), "Unknown");
        assert_eq!(report.browser_or_unknown(), "Unknown");
        assert_eq!(report.platform_or_unknown(), "Unknown");
        assert_eq!(report.screen_resolution(), "N/A");
    }

    #[test]
    fn test_device_report_wire_format() {
        let json = r#"{
            "publicIP": "203.0.113.7",
            "userAgent": "Mozilla/5.0",
            "platform": "Win32",
            "screenWidth": 1920,
            "screenHeight": 1080,
            "onLine": true,
            "timestamp": "2025-12-16T18:46:52.531Z"
        }"#;

        let report: DeviceReport = serde_json::from_str(json).unwrap();
        assert_eq!(report.ip_or_unknown(), "203.0.113.7");
        assert_eq!(report.screen_resolution(), "1920x1080");
        assert_eq!(report.on_line, Some(true));
        assert_eq!(report.language_or_unknown(), "Unknown");
    }

    #[test]
    fn test_parse_detection_timestamp_formats() {
        for raw in [
            "2025-12-16T18:46:52.531Z",
            "2025-12-16T18:46:52Z",
            "2025-12-16T18:46:52.531",
            "2025-12-16T18:46:52+00:00",
        ] {
            let ts = parse_detection_timestamp(raw).unwrap();
            assert_eq!(ts.date_naive().to_string(), "2025-12-16");
        }
    }

    #[test]
    fn test_parse_detection_timestamp_rejects_garbage() {
        assert!(parse_detection_timestamp("yesterday-ish").is_err());
        assert!(parse_detection_timestamp("").is_err());
    }

    #[test]
    fn test_detected_at_falls_back_to_receipt_time() {
        let received = Utc.with_ymd_and_hms(2026, 8, 6, 12, 0, 0).unwrap();

        let report = DeviceReport {
            timestamp: Some("not a timestamp".to_string()),
            ..Default::default()
        };
        assert_eq!(report.detected_at(received), received);

        let report = DeviceReport::default();
        assert_eq!(report.detected_at(received), received);

        let report = DeviceReport {
            timestamp: Some("2025-12-16T18:46:52Z".to_string()),
            ..Default::default()
        };
        assert_ne!(report.detected_at(received), received);
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 3), "hel");
        // Multi-byte input must cut on a character boundary
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("", 5), "");
    }
}
