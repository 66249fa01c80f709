//! Paginated listing responses.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

use super::EmailRecord;

const fn first_page() -> u32 {
    1
}

/// One page of `GET /api/emails`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailPage {
    /// Records on this page, newest first. Records that fail to decode are
    /// skipped.
    #[serde(default, deserialize_with = "decode_records")]
    pub emails: Vec<EmailRecord>,
    /// Total matching records across all pages.
    #[serde(default)]
    pub total: u64,
    /// 1-based page number the server actually returned.
    #[serde(default = "first_page")]
    pub page: u32,
    /// Page size the server applied.
    #[serde(default)]
    pub per_page: u32,
    /// Number of pages. The server reports 0 for an empty result.
    #[serde(default = "first_page")]
    pub pages: u32,
}

impl EmailPage {
    /// Page count clamped to at least one, for navigation bounds.
    #[must_use]
    pub fn page_count(&self) -> u32 {
        self.pages.max(1)
    }

    /// Current page clamped to at least one.
    #[must_use]
    pub fn current_page(&self) -> u32 {
        self.page.max(1)
    }
}

/// Decodes records one at a time so a single bad record does not sink the page.
fn decode_records<'de, D>(deserializer: D) -> Result<Vec<EmailRecord>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(values
        .into_iter()
        .filter_map(|value| {
            let id = value.get("id").cloned();
            match serde_json::from_value(value) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(id = ?id, error = %e, "Skipping undecodable email record");
                    None
                }
            }
        })
        .collect())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_metadata_missing() {
        let page: EmailPage = serde_json::from_str(r#"{"emails": []}"#).unwrap();
        assert_eq!(page.page, 1);
        assert_eq!(page.page_count(), 1);
    }

    #[test]
    fn test_zero_pages_clamped() {
        let page: EmailPage =
            serde_json::from_str(r#"{"emails": [], "page": 1, "pages": 0, "total": 0}"#).unwrap();
        assert_eq!(page.page_count(), 1);
    }

    #[test]
    fn test_bad_record_is_skipped() {
        let page: EmailPage = serde_json::from_str(
            r#"{
                "emails": [
                    {"id": 3, "sender": "a@x.com", "status": "processed", "policy_applied": "allow"},
                    {"id": 2, "sender": "b@x.com", "status": "exploded"},
                    {"sender": "no-id@x.com"},
                    {"id": 1, "sender": "c@x.com", "status": "flagged", "policy_applied": "tag"}
                ],
                "total": 4, "page": 1, "per_page": 50, "pages": 1
            }"#,
        )
        .unwrap();
        let ids: Vec<i64> = page.emails.iter().map(|r| r.id.get()).collect();
        assert_eq!(ids, vec![3, 1]);
        assert_eq!(page.total, 4);
    }

    #[test]
    fn test_null_emails() {
        let page: EmailPage = serde_json::from_str(r#"{"emails": null}"#).unwrap();
        assert!(page.emails.is_empty());
    }
}
