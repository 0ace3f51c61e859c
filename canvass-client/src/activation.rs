//! Event/action activation tracking.
//!
//! Surveys can declare event or action triggers; such a survey is only
//! eligible once a matching event has fired for the current visitor. The
//! tracker indexes trigger names to survey ids and persists the activated
//! id set so activation survives the in-memory cache.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use canvass_core::Survey;
use parking_lot::RwLock;
use tracing::debug;

use crate::storage::{SurveyStorage, ACTIVATED_SURVEYS_KEY};

/// Tracks which event/action-triggered surveys have fired for this visitor.
pub struct ActivationTracker {
    storage: Arc<dyn SurveyStorage>,
    /// Event trigger name -> ids of surveys listening for it.
    events: RwLock<HashMap<String, Vec<String>>>,
    /// Action trigger name -> ids of surveys listening for it.
    actions: RwLock<HashMap<String, Vec<String>>>,
}

impl ActivationTracker {
    /// Create a tracker persisting through the given storage.
    pub fn new(storage: Arc<dyn SurveyStorage>) -> Self {
        Self {
            storage,
            events: RwLock::new(HashMap::new()),
            actions: RwLock::new(HashMap::new()),
        }
    }

    /// Rebuild the trigger indexes from a freshly fetched survey list.
    ///
    /// Surveys without triggers are dropped from the indexes; the persisted
    /// activated set is left as is (its lifecycle is independent).
    pub fn register(&self, surveys: &[Survey]) {
        let mut events: HashMap<String, Vec<String>> = HashMap::new();
        let mut actions: HashMap<String, Vec<String>> = HashMap::new();

        for survey in surveys {
            let Some(conditions) = &survey.conditions else {
                continue;
            };
            if let Some(triggers) = &conditions.events {
                for trigger in &triggers.values {
                    events
                        .entry(trigger.name.clone())
                        .or_default()
                        .push(survey.id.clone());
                }
            }
            if let Some(triggers) = &conditions.actions {
                for trigger in &triggers.values {
                    actions
                        .entry(trigger.name.clone())
                        .or_default()
                        .push(survey.id.clone());
                }
            }
        }

        debug!(
            events = events.len(),
            actions = actions.len(),
            "registered survey activation triggers"
        );
        *self.events.write() = events;
        *self.actions.write() = actions;
    }

    /// Record a captured event, activating every survey listening for it.
    pub fn on_event(&self, name: &str) {
        let ids = self.events.read().get(name).cloned().unwrap_or_default();
        self.activate(&ids);
    }

    /// Record a tracked action, activating every survey listening for it.
    pub fn on_action(&self, name: &str) {
        let ids = self.actions.read().get(name).cloned().unwrap_or_default();
        self.activate(&ids);
    }

    /// Ids of every survey activated for this visitor.
    pub fn activated_ids(&self) -> HashSet<String> {
        self.storage
            .get(ACTIVATED_SURVEYS_KEY)
            .and_then(|raw| serde_json::from_str::<Vec<String>>(&raw).ok())
            .map(|ids| ids.into_iter().collect())
            .unwrap_or_default()
    }

    /// Whether the survey has been activated for this visitor.
    pub fn is_activated(&self, id: &str) -> bool {
        self.activated_ids().contains(id)
    }

    fn activate(&self, ids: &[String]) {
        if ids.is_empty() {
            return;
        }
        let mut activated = self.activated_ids();
        for id in ids {
            if activated.insert(id.clone()) {
                debug!(survey = %id, "survey activated by trigger");
            }
        }
        let mut sorted: Vec<String> = activated.into_iter().collect();
        sorted.sort();
        if let Ok(raw) = serde_json::to_string(&sorted) {
            self.storage.set(ACTIVATED_SURVEYS_KEY, raw);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn surveys() -> Vec<Survey> {
        serde_json::from_str(
            r#"[
                {
                    "id": "1",
                    "conditions": {"events": {"values": [{"name": "signup"}]}}
                },
                {
                    "id": "2",
                    "conditions": {
                        "events": {"values": [{"name": "signup"}, {"name": "checkout"}]},
                        "actions": {"values": [{"name": "clicked_upgrade"}]}
                    }
                },
                {"id": "3"}
            ]"#,
        )
        .unwrap()
    }

    #[test]
    fn test_event_activates_listening_surveys() {
        let tracker = ActivationTracker::new(Arc::new(MemoryStorage::new()));
        tracker.register(&surveys());

        assert!(tracker.activated_ids().is_empty());

        tracker.on_event("signup");
        let activated = tracker.activated_ids();
        assert!(activated.contains("1"));
        assert!(activated.contains("2"));
        assert!(!activated.contains("3"));
    }

    #[test]
    fn test_action_trigger() {
        let tracker = ActivationTracker::new(Arc::new(MemoryStorage::new()));
        tracker.register(&surveys());

        tracker.on_action("clicked_upgrade");
        assert!(tracker.is_activated("2"));
        assert!(!tracker.is_activated("1"));
    }

    #[test]
    fn test_unknown_trigger_is_a_no_op() {
        let tracker = ActivationTracker::new(Arc::new(MemoryStorage::new()));
        tracker.register(&surveys());

        tracker.on_event("page_left");
        assert!(tracker.activated_ids().is_empty());
    }

    #[test]
    fn test_reregister_keeps_persisted_activation() {
        let storage = Arc::new(MemoryStorage::new());
        let tracker = ActivationTracker::new(storage.clone());
        tracker.register(&surveys());
        tracker.on_event("checkout");
        assert!(tracker.is_activated("2"));

        // Refetch replaces the definitions wholesale; activation survives.
        tracker.register(&surveys());
        assert!(tracker.is_activated("2"));
    }
}
