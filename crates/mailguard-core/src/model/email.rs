//! Intercepted email records as served by the `MailGuard` API.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

/// Server-assigned identifier of an email record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmailId(pub i64);

impl EmailId {
    /// Create a new email ID.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw integer value.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for EmailId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Processing status assigned by the DLP pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    /// Accepted but not yet processed.
    Pending,
    /// Processed and delivered.
    #[default]
    Processed,
    /// Delivered but flagged for review.
    Flagged,
    /// Rejected by policy; never shown in end-user mail views.
    Blocked,
    /// Held in quarantine.
    Quarantined,
    /// Processing failed.
    Error,
}

impl ProcessingStatus {
    /// All statuses in filter-menu order.
    pub const ALL: [Self; 6] = [
        Self::Pending,
        Self::Processed,
        Self::Flagged,
        Self::Blocked,
        Self::Quarantined,
        Self::Error,
    ];

    /// Wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processed => "processed",
            Self::Flagged => "flagged",
            Self::Blocked => "blocked",
            Self::Quarantined => "quarantined",
            Self::Error => "error",
        }
    }

    /// Parse from the wire representation (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let lower = s.trim().to_lowercase();
        Self::ALL.into_iter().find(|status| status.as_str() == lower)
    }
}

impl std::fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Policy action the DLP engine applied to a message.
///
/// Decoding is lenient: an action this client does not know maps to
/// [`PolicyApplied::None`] instead of failing the whole record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyApplied {
    /// No policy action recorded.
    #[default]
    None,
    /// Nothing was detected and the message passed untouched.
    Allow,
    /// Sensitive content was redacted.
    Sanitize,
    /// A warning tag was added to the subject.
    Tag,
    /// Delivery was blocked.
    Block,
    /// The message was moved to quarantine.
    Quarantine,
}

impl PolicyApplied {
    /// Wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Allow => "allow",
            Self::Sanitize => "sanitize",
            Self::Tag => "tag",
            Self::Block => "block",
            Self::Quarantine => "quarantine",
        }
    }

    /// Parse from the wire representation (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let lower = s.trim().to_lowercase();
        [
            Self::None,
            Self::Allow,
            Self::Sanitize,
            Self::Tag,
            Self::Block,
            Self::Quarantine,
        ]
        .into_iter()
        .find(|policy| policy.as_str() == lower)
    }
}

impl<'de> Deserialize<'de> for PolicyApplied {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw).unwrap_or_else(|| {
            warn!(policy = %raw, "Unknown policy action");
            Self::None
        }))
    }
}

/// A single detection produced by the DLP engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    /// Pattern type tag (e.g. `credit_card`, `email`, `ssn`).
    pub pattern_type: String,
    /// The matched text, when the server discloses it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_text: Option<String>,
    /// Detector confidence in `[0, 1]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Byte span `(start, end)` of the match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<(u64, u64)>,
}

impl DetectionResult {
    /// Creates a detection with only a pattern type.
    #[must_use]
    pub fn new(pattern_type: impl Into<String>) -> Self {
        Self {
            pattern_type: pattern_type.into(),
            matched_text: None,
            confidence: None,
            position: None,
        }
    }
}

/// Attachment descriptor. Downloadable only when `id` is present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRef {
    /// Backing attachment id.
    #[serde(default)]
    pub id: Option<i64>,
    /// Original filename.
    pub filename: String,
    /// Server-side storage path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
}

/// Visual badge derived from status and policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Badge {
    /// Blocked by status or policy.
    Blocked,
    /// Quarantined.
    Quarantined,
    /// Flagged for review.
    Flagged,
    /// Content was sanitized.
    Sanitized,
    /// Subject was tagged.
    Tagged,
    /// No badge.
    Plain,
}

impl Badge {
    /// Badge class name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Blocked => "blocked",
            Self::Quarantined => "quarantined",
            Self::Flagged => "flagged",
            Self::Sanitized => "sanitized",
            Self::Tagged => "tagged",
            Self::Plain => "",
        }
    }
}

/// An intercepted email as held by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailRecord {
    /// Unique server-assigned id.
    pub id: EmailId,
    /// RFC 5322 Message-ID header.
    #[serde(default)]
    pub message_id: Option<String>,
    /// Envelope sender.
    #[serde(default, deserialize_with = "null_as_default")]
    pub sender: String,
    /// Envelope recipients in delivery order.
    #[serde(default, deserialize_with = "null_as_default")]
    pub recipients: Vec<String>,
    /// Subject line.
    #[serde(default)]
    pub subject: Option<String>,
    /// Interception time.
    #[serde(default, deserialize_with = "timestamp::deserialize")]
    pub timestamp: Option<DateTime<Utc>>,
    /// Whether any detector fired.
    #[serde(default, deserialize_with = "null_as_default")]
    pub flagged: bool,
    /// Policy action applied.
    #[serde(default, deserialize_with = "null_as_default")]
    pub policy_applied: PolicyApplied,
    /// Detections in engine order.
    #[serde(default, deserialize_with = "null_as_default")]
    pub detection_results: Vec<DetectionResult>,
    /// Plain-text body (the server truncates it).
    #[serde(default)]
    pub body_text: Option<String>,
    /// Number of attachments.
    #[serde(default, deserialize_with = "null_as_default")]
    pub attachment_count: u32,
    /// Attachment filenames, for servers that omit descriptors.
    #[serde(default, deserialize_with = "null_as_default")]
    pub attachment_names: Vec<String>,
    /// Attachment descriptors.
    #[serde(default, deserialize_with = "null_as_default")]
    pub attachments: Vec<AttachmentRef>,
    /// Processing status.
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: ProcessingStatus,
    /// Error detail when `status` is `error`.
    #[serde(default)]
    pub error_message: Option<String>,
    /// Time the pipeline spent on this message.
    #[serde(default)]
    pub processing_time_ms: Option<f64>,
}

impl EmailRecord {
    /// Creates a minimal processed record. Mostly useful for tests and demos.
    #[must_use]
    pub fn new(id: i64, sender: impl Into<String>, recipients: Vec<String>) -> Self {
        Self {
            id: EmailId(id),
            message_id: None,
            sender: sender.into(),
            recipients,
            subject: None,
            timestamp: None,
            flagged: false,
            policy_applied: PolicyApplied::None,
            detection_results: Vec::new(),
            body_text: None,
            attachment_count: 0,
            attachment_names: Vec::new(),
            attachments: Vec::new(),
            status: ProcessingStatus::Processed,
            error_message: None,
            processing_time_ms: None,
        }
    }

    /// Sets the status.
    #[must_use]
    pub fn with_status(mut self, status: ProcessingStatus) -> Self {
        self.status = status;
        self
    }

    /// Sets the subject.
    #[must_use]
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Subject, or `(no subject)` when empty or missing.
    #[must_use]
    pub fn display_subject(&self) -> &str {
        match self.subject.as_deref() {
            Some(s) if !s.trim().is_empty() => s,
            _ => "(no subject)",
        }
    }

    /// Pattern types of all detections, deduplicated in first-seen order.
    #[must_use]
    pub fn unique_detection_types(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for detection in &self.detection_results {
            if !seen.contains(&detection.pattern_type.as_str()) {
                seen.push(&detection.pattern_type);
            }
        }
        seen
    }

    /// Attachment descriptors, falling back to id-less entries built from
    /// `attachment_names`.
    #[must_use]
    pub fn attachment_list(&self) -> Vec<AttachmentRef> {
        if !self.attachments.is_empty() {
            return self.attachments.clone();
        }
        self.attachment_names
            .iter()
            .map(|name| AttachmentRef {
                id: None,
                filename: name.clone(),
                file_path: None,
            })
            .collect()
    }

    /// Badge for list and table views.
    #[must_use]
    pub const fn badge(&self) -> Badge {
        match (self.status, self.policy_applied) {
            (ProcessingStatus::Blocked, _) | (_, PolicyApplied::Block) => Badge::Blocked,
            (ProcessingStatus::Quarantined, _) => Badge::Quarantined,
            (ProcessingStatus::Flagged, _) => Badge::Flagged,
            (_, PolicyApplied::Sanitize) => Badge::Sanitized,
            (_, PolicyApplied::Tag) => Badge::Tagged,
            _ => Badge::Plain,
        }
    }
}

/// Treats an explicit JSON `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// The server writes naive UTC timestamps (`2024-05-01T10:00:00.123456`);
/// RFC 3339 with an offset is accepted too.
mod timestamp {
    use super::{DateTime, Deserialize, Deserializer, NaiveDateTime, Utc};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().and_then(parse))
    }

    pub fn parse(s: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
            .ok()
            .map(|naive| naive.and_utc())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    const SERVER_RECORD: &str = r#"{
        "id": 42,
        "message_id": "<abc@mail>",
        "sender": "alice@corp.com",
        "recipients": ["bob@corp.com", "carol@corp.com"],
        "subject": "Q3 numbers",
        "timestamp": "2024-05-01T10:15:30.123456",
        "flagged": true,
        "policy_applied": "tag",
        "detection_results": [
            {"pattern_type": "credit_card", "matched_text": "4111", "confidence": 0.9, "position": [3, 19]},
            {"pattern_type": "email"},
            {"pattern_type": "credit_card"}
        ],
        "body_text": "see attached",
        "attachment_count": 1,
        "attachment_names": ["q3.xlsx"],
        "attachments": [{"id": 7, "filename": "q3.xlsx", "file_path": "/data/7"}],
        "status": "processed",
        "error_message": null,
        "processing_time_ms": 12.5
    }"#;

    #[test]
    fn test_decode_server_record() {
        let record: EmailRecord = serde_json::from_str(SERVER_RECORD).unwrap();
        assert_eq!(record.id, EmailId(42));
        assert_eq!(record.recipients.len(), 2);
        assert_eq!(record.policy_applied, PolicyApplied::Tag);
        assert_eq!(record.attachments[0].id, Some(7));
        assert_eq!(record.processing_time_ms, Some(12.5));

        let ts = record.timestamp.unwrap();
        assert_eq!((ts.year(), ts.month(), ts.day()), (2024, 5, 1));
        assert_eq!((ts.hour(), ts.minute(), ts.second()), (10, 15, 30));
    }

    #[test]
    fn test_decode_nulls_as_defaults() {
        let record: EmailRecord = serde_json::from_str(
            r#"{"id": 1, "sender": "a@x.com", "recipients": null, "status": null,
                "policy_applied": null, "detection_results": null,
                "attachment_count": null, "timestamp": null}"#,
        )
        .unwrap();
        assert!(record.recipients.is_empty());
        assert_eq!(record.status, ProcessingStatus::Processed);
        assert_eq!(record.policy_applied, PolicyApplied::None);
        assert!(record.detection_results.is_empty());
        assert_eq!(record.attachment_count, 0);
        assert!(record.timestamp.is_none());
    }

    /// Shape the server returns for a message nothing was detected in.
    const CLEAN_RECORD: &str = r#"{
        "id": 43,
        "message_id": "<clean@mail>",
        "sender": "alice@corp.com",
        "recipients": ["bob@corp.com"],
        "subject": "Lunch",
        "timestamp": "2024-05-01T11:00:00",
        "flagged": false,
        "policy_applied": "allow",
        "detection_results": [],
        "body_text": "noon?",
        "attachment_count": 0,
        "attachment_names": [],
        "attachments": [],
        "status": "processed",
        "error_message": null,
        "processing_time_ms": 3.1
    }"#;

    #[test]
    fn test_decode_clean_record() {
        let record: EmailRecord = serde_json::from_str(CLEAN_RECORD).unwrap();
        assert_eq!(record.policy_applied, PolicyApplied::Allow);
        assert_eq!(record.badge(), Badge::Plain);
    }

    #[test]
    fn test_unknown_policy_is_lenient() {
        let record: EmailRecord = serde_json::from_str(
            r#"{"id": 1, "sender": "a@x.com", "policy_applied": "encrypt"}"#,
        )
        .unwrap();
        assert_eq!(record.policy_applied, PolicyApplied::None);
        assert_eq!(PolicyApplied::parse(" Quarantine "), Some(PolicyApplied::Quarantine));
    }

    #[test]
    fn test_decode_rejects_unknown_status() {
        let result: Result<EmailRecord, _> =
            serde_json::from_str(r#"{"id": 1, "sender": "a", "status": "exploded"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_timestamp_accepts_offset_and_garbage() {
        assert!(timestamp::parse("2024-05-01T10:15:30+02:00").is_some());
        assert!(timestamp::parse("2024-05-01 10:15:30").is_some());
        assert!(timestamp::parse("yesterday").is_none());
    }

    #[test]
    fn test_unique_detection_types_preserves_order() {
        let record: EmailRecord = serde_json::from_str(SERVER_RECORD).unwrap();
        assert_eq!(record.unique_detection_types(), vec!["credit_card", "email"]);
    }

    #[test]
    fn test_display_subject_fallback() {
        let record = EmailRecord::new(1, "a@x.com", vec![]);
        assert_eq!(record.display_subject(), "(no subject)");
        assert_eq!(record.with_subject("  ").display_subject(), "(no subject)");
    }

    #[test]
    fn test_attachment_list_falls_back_to_names() {
        let mut record = EmailRecord::new(1, "a@x.com", vec![]);
        record.attachment_names = vec!["a.pdf".into()];
        let list = record.attachment_list();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].filename, "a.pdf");
        assert_eq!(list[0].id, None);
    }

    #[test]
    fn test_badge_precedence() {
        let mut record = EmailRecord::new(1, "a@x.com", vec![]);
        assert_eq!(record.badge(), Badge::Plain);
        record.policy_applied = PolicyApplied::Tag;
        assert_eq!(record.badge(), Badge::Tagged);
        record.status = ProcessingStatus::Quarantined;
        assert_eq!(record.badge(), Badge::Quarantined);
        record.policy_applied = PolicyApplied::Block;
        assert_eq!(record.badge(), Badge::Blocked);
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(
            ProcessingStatus::parse("Quarantined"),
            Some(ProcessingStatus::Quarantined)
        );
        assert_eq!(ProcessingStatus::parse("all"), None);
    }
}
