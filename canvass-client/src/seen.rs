//! Seen / repeat-display tracking.
//!
//! Records which surveys were already shown to this visitor and when any
//! survey was last shown, so repeat displays and configured wait periods
//! can be enforced on the render path.

use std::sync::Arc;

use canvass_core::Survey;
use chrono::{DateTime, Duration, Utc};
use tracing::warn;

use crate::storage::{SurveyStorage, LAST_SEEN_KEY, SEEN_PREFIX};

/// Tracks per-survey seen markers and the global last-seen timestamp.
pub struct SeenTracker {
    storage: Arc<dyn SurveyStorage>,
}

impl SeenTracker {
    /// Create a tracker persisting through the given storage.
    pub fn new(storage: Arc<dyn SurveyStorage>) -> Self {
        Self { storage }
    }

    /// Record that the survey was shown at `now`.
    pub fn mark_seen(&self, survey: &Survey, now: DateTime<Utc>) {
        self.storage
            .set(&format!("{SEEN_PREFIX}{}", survey.id), "true".to_string());
        self.storage.set(LAST_SEEN_KEY, now.to_rfc3339());
    }

    /// Whether the survey was already shown to this visitor.
    pub fn has_seen(&self, id: &str) -> bool {
        self.storage.get(&format!("{SEEN_PREFIX}{id}")).is_some()
    }

    /// When any survey was last shown, if ever.
    pub fn last_seen_at(&self) -> Option<DateTime<Utc>> {
        let raw = self.storage.get(LAST_SEEN_KEY)?;
        match DateTime::parse_from_rfc3339(&raw) {
            Ok(parsed) => Some(parsed.with_timezone(&Utc)),
            Err(e) => {
                warn!(value = %raw, error = %e, "discarding unparseable last-seen timestamp");
                None
            }
        }
    }

    /// Why the survey must not be shown right now, if any reason applies.
    ///
    /// `repeat_override` reflects the renderer's "can activate repeatedly"
    /// answer; it lifts the already-seen rule but not the wait period.
    pub fn suppression_reason(
        &self,
        survey: &Survey,
        repeat_override: bool,
        now: DateTime<Utc>,
    ) -> Option<String> {
        let wait_days = survey
            .conditions
            .as_ref()
            .and_then(|c| c.seen_survey_wait_period_in_days);
        if let Some(days) = wait_days
            && let Some(last_seen) = self.last_seen_at()
            && now - last_seen < Duration::days(days as i64)
        {
            return Some("survey display wait period has not elapsed".to_string());
        }

        if self.has_seen(&survey.id) && !repeat_override {
            return Some("survey was already seen by this visitor".to_string());
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn parse(json: &str) -> Survey {
        serde_json::from_str(json).unwrap()
    }

    fn tracker() -> SeenTracker {
        SeenTracker::new(Arc::new(MemoryStorage::new()))
    }

    #[test]
    fn test_mark_and_query_seen() {
        let tracker = tracker();
        let survey = parse(r#"{"id": "1"}"#);
        let now = Utc::now();

        assert!(!tracker.has_seen("1"));
        assert!(tracker.suppression_reason(&survey, false, now).is_none());

        tracker.mark_seen(&survey, now);
        assert!(tracker.has_seen("1"));
        assert_eq!(tracker.last_seen_at(), Some(now));
        assert!(tracker.suppression_reason(&survey, false, now).is_some());
    }

    #[test]
    fn test_repeat_override_lifts_seen_rule() {
        let tracker = tracker();
        let survey = parse(r#"{"id": "1"}"#);
        let now = Utc::now();

        tracker.mark_seen(&survey, now);
        assert!(tracker.suppression_reason(&survey, true, now).is_none());
    }

    #[test]
    fn test_wait_period_applies_across_surveys() {
        let tracker = tracker();
        let shown = parse(r#"{"id": "1"}"#);
        let gated = parse(
            r#"{"id": "2", "conditions": {"seen_survey_wait_period_in_days": 7}}"#,
        );
        let now = Utc::now();

        tracker.mark_seen(&shown, now - Duration::days(2));
        // Survey 2 was never shown, but another survey was 2 days ago.
        assert!(tracker.suppression_reason(&gated, false, now).is_some());
        // The override does not shorten the wait period.
        assert!(tracker.suppression_reason(&gated, true, now).is_some());

        let later = now + Duration::days(6);
        assert!(tracker.suppression_reason(&gated, false, later).is_none());
    }

    #[test]
    fn test_unparseable_last_seen_is_discarded() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(LAST_SEEN_KEY, "not-a-date".to_string());
        let tracker = SeenTracker::new(storage);

        assert_eq!(tracker.last_seen_at(), None);
    }
}
