//! Survey definitions
//!
//! The wire-format data model for in-product surveys. Definitions are
//! immutable once fetched and replaced wholesale on refetch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::matching::MatchType;

/// A targeted in-product survey definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Survey {
    /// Unique survey identifier.
    pub id: String,

    /// Human-readable name shown in dashboards.
    #[serde(default)]
    pub name: Option<String>,

    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,

    /// How the survey is displayed.
    #[serde(rename = "type", default)]
    pub survey_type: SurveyType,

    /// When the survey was launched; unset means not yet started.
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,

    /// When the survey was stopped; set means no longer running.
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,

    /// Ordered question list.
    #[serde(default)]
    pub questions: Vec<SurveyQuestion>,

    /// Display options, interpreted by the renderer only.
    #[serde(default)]
    pub appearance: Option<SurveyAppearance>,

    /// Display conditions; `None` matches unconditionally.
    #[serde(default)]
    pub conditions: Option<SurveyConditions>,

    /// Flag whose rollout the survey is tied to.
    #[serde(default)]
    pub linked_flag_key: Option<String>,

    /// Flag holding the audience targeting rollout.
    #[serde(default)]
    pub targeting_flag_key: Option<String>,

    /// One-time-display flag managed by the platform.
    #[serde(default)]
    pub internal_targeting_flag_key: Option<String>,

    /// Additional flag gates; every configured gate must pass.
    #[serde(default)]
    pub feature_flag_keys: Vec<FeatureFlagKeyPair>,
}

impl Survey {
    /// Whether the survey is currently running.
    ///
    /// A survey is running iff it has been launched and not stopped.
    pub fn is_running(&self) -> bool {
        self.start_date.is_some() && self.end_date.is_none()
    }

    /// Whether the survey waits for an event or action trigger before it
    /// becomes eligible for display.
    pub fn has_activation_triggers(&self) -> bool {
        self.conditions
            .as_ref()
            .is_some_and(|c| c.has_event_triggers() || c.has_action_triggers())
    }
}

/// How a survey is presented to the visitor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurveyType {
    /// Floating popover rendered by the extension.
    #[default]
    Popover,
    /// Embedded widget anchored to a page element.
    Widget,
    /// Delivered via the API only; the caller renders it.
    Api,
}

/// A single survey question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveyQuestion {
    /// Question kind.
    #[serde(rename = "type", default)]
    pub question_type: QuestionType,

    /// The prompt shown to the visitor.
    pub question: String,

    /// Optional supporting description.
    #[serde(default)]
    pub description: Option<String>,

    /// Choices for single/multiple choice questions.
    #[serde(default)]
    pub choices: Vec<String>,

    /// Upper bound of the rating scale.
    #[serde(default)]
    pub scale: Option<u8>,

    /// Destination for link questions.
    #[serde(default)]
    pub link: Option<String>,

    /// Whether the visitor may skip the question.
    #[serde(default)]
    pub optional: bool,
}

/// Survey question kinds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    /// Free-text response.
    #[default]
    Open,
    /// A call-to-action link.
    Link,
    /// Numeric or emoji rating.
    Rating,
    /// Pick one choice.
    SingleChoice,
    /// Pick any number of choices.
    MultipleChoice,
}

/// Display options carried opaquely to the renderer.
///
/// The SDK never interprets these fields; unrecognised options are preserved
/// so renderer versions can evolve independently of the delivery layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SurveyAppearance {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submit_button_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_thank_you_message: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thank_you_message_header: Option<String>,

    /// Renderer options this crate does not model.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Criteria gating where and to whom a survey is shown.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SurveyConditions {
    /// Pattern the current page URL must match.
    #[serde(default)]
    pub url: Option<String>,

    /// How [`SurveyConditions::url`] is compared; defaults to a
    /// case-insensitive substring match.
    #[serde(default)]
    pub url_match_type: Option<MatchType>,

    /// CSS selector that must resolve on the page.
    #[serde(default)]
    pub selector: Option<String>,

    /// Device class labels the visitor must match.
    #[serde(default)]
    pub device_types: Vec<String>,

    /// How [`SurveyConditions::device_types`] is compared.
    #[serde(default)]
    pub device_types_match_type: Option<MatchType>,

    /// Captured events that activate the survey for a visitor.
    #[serde(default)]
    pub events: Option<SurveyTriggers>,

    /// Tracked actions that activate the survey for a visitor.
    #[serde(default)]
    pub actions: Option<SurveyTriggers>,

    /// Days that must elapse after any survey was shown before this one
    /// may be shown.
    #[serde(default)]
    pub seen_survey_wait_period_in_days: Option<u32>,
}

impl SurveyConditions {
    /// Whether at least one event trigger is configured.
    pub fn has_event_triggers(&self) -> bool {
        self.events.as_ref().is_some_and(|t| !t.values.is_empty())
    }

    /// Whether at least one action trigger is configured.
    pub fn has_action_triggers(&self) -> bool {
        self.actions.as_ref().is_some_and(|t| !t.values.is_empty())
    }
}

/// Named triggers that activate a survey when they fire.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SurveyTriggers {
    /// Trigger entries; empty means no trigger is configured.
    #[serde(default)]
    pub values: Vec<SurveyTrigger>,
}

impl SurveyTriggers {
    /// Whether a trigger with the given name is configured.
    pub fn contains(&self, name: &str) -> bool {
        self.values.iter().any(|t| t.name == name)
    }
}

/// A single event or action trigger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveyTrigger {
    /// Event or action name as captured by the pipeline.
    pub name: String,
}

/// One entry of a survey's multi-key flag gate list.
///
/// `key` labels the gate; `value` is the feature flag key that must be
/// enabled. An absent or empty `value` makes the gate pass vacuously.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureFlagKeyPair {
    pub key: String,
    #[serde(default)]
    pub value: Option<String>,
}
