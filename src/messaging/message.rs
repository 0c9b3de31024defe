//! # Message Types
//!
//! Wire shapes the core reads and writes. The inbound body is an
//! object-store creation event; on redelivery it additionally carries the
//! retry bookkeeping (`retry_count`, `is_reprocessing`) so the retry
//! policy travels with the message, not solely in the database.

use super::errors::{MessagingError, MessagingResult};
use serde::{Deserialize, Serialize};

/// One message pulled from a queue: opaque body plus the handle needed to
/// delete it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundRecord {
    pub receipt_handle: i64,
    pub body: String,
}

/// Object-store creation event, the inbound message body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageEventMessage {
    pub bucket: String,
    pub key: String,
    /// Retries already consumed by this message; incremented by exactly 1
    /// on every requeue
    #[serde(default)]
    pub retry_count: u32,
    /// Set once any retry has occurred
    #[serde(default)]
    pub is_reprocessing: bool,
}

impl StorageEventMessage {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            retry_count: 0,
            is_reprocessing: false,
        }
    }

    /// Parse an inbound record body. A malformed body aborts only its own
    /// record, so the error is surfaced for logging, not panicked on.
    pub fn parse(body: &str) -> MessagingResult<Self> {
        serde_json::from_str(body).map_err(MessagingError::deserialization)
    }

    /// Bare filename: the key's last path segment.
    pub fn filename(&self) -> &str {
        self.key.rsplit('/').next().unwrap_or(&self.key)
    }

    /// Redelivery copy: retry count bumped by one, reprocessing flagged.
    pub fn for_retry(&self) -> Self {
        Self {
            bucket: self.bucket.clone(),
            key: self.key.clone(),
            retry_count: self.retry_count + 1,
            is_reprocessing: true,
        }
    }
}

/// Follow-up message dispatched per validated interior file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchivoRtaMessage {
    pub archivo_id: i64,
    pub rta_procesamiento_id: i64,
    pub nombre_archivo: String,
    /// Response sub-type suffix of the interior file
    pub tipo_archivo_rta: String,
    pub bucket: String,
    /// Destination key the validated file was uploaded to
    pub key: String,
    pub enqueued_at: chrono::DateTime<chrono::Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_event() {
        let event = StorageEventMessage::parse(
            r#"{"bucket":"rta-archivos","key":"recibidos/RE_ESP_X-0001.zip"}"#,
        )
        .unwrap();
        assert_eq!(event.bucket, "rta-archivos");
        assert_eq!(event.retry_count, 0);
        assert!(!event.is_reprocessing);
        assert_eq!(event.filename(), "RE_ESP_X-0001.zip");
    }

    #[test]
    fn test_parse_redelivered_event() {
        let event = StorageEventMessage::parse(
            r#"{"bucket":"b","key":"k.zip","retry_count":2,"is_reprocessing":true}"#,
        )
        .unwrap();
        assert_eq!(event.retry_count, 2);
        assert!(event.is_reprocessing);
    }

    #[test]
    fn test_malformed_body_is_an_error_not_a_panic() {
        assert!(StorageEventMessage::parse("{not json").is_err());
        assert!(StorageEventMessage::parse(r#"{"bucket":"b"}"#).is_err());
    }

    #[test]
    fn test_for_retry_increments_exactly_once() {
        let event = StorageEventMessage::new("b", "k.zip");
        let retried = event.for_retry();
        assert_eq!(retried.retry_count, 1);
        assert!(retried.is_reprocessing);
        assert_eq!(retried.for_retry().retry_count, 2);
    }

    #[test]
    fn test_filename_without_path() {
        assert_eq!(StorageEventMessage::new("b", "solo.zip").filename(), "solo.zip");
    }
}
