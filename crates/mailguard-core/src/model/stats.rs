//! Aggregate interception statistics.

use serde::{Deserialize, Serialize};

/// Counters served by `GET /api/stats`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Stats {
    /// Total intercepted emails.
    pub total: u64,
    /// Emails with at least one detection.
    pub flagged: u64,
    /// Emails blocked by policy.
    pub blocked: u64,
    /// Emails held in quarantine.
    pub quarantined: u64,
    /// Mean pipeline time in milliseconds.
    pub avg_processing_time_ms: f64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_default_to_zero() {
        let stats: Stats = serde_json::from_str(r#"{"total": 10, "flagged": 3}"#).unwrap();
        assert_eq!(stats.total, 10);
        assert_eq!(stats.flagged, 3);
        assert_eq!(stats.blocked, 0);
        assert_eq!(stats.avg_processing_time_ms, 0.0);
    }
}
