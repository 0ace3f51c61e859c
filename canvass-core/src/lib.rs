//! Survey targeting for Canvass
//!
//! The pure domain layer of the Canvass survey-delivery SDK: the survey
//! data model, string match predicates, condition evaluators, flag-gate
//! evaluation, and the eligibility pipeline that combines them. No I/O
//! happens here; fetching, persistence, and rendering live in
//! `canvass-client`.
//!
//! # Features
//!
//! - 🎯 **Targeting conditions** - URL, device-type, and selector checks
//! - 🚩 **Flag gates** - linked/targeting/internal/multi feature-flag gates
//! - ⚡ **Event activation** - surveys triggered by captured events/actions
//! - 🧮 **Pure evaluation** - deterministic filters over fetched definitions
//!
//! # Quick Start
//!
//! ```
//! use std::collections::HashSet;
//! use canvass_core::*;
//!
//! let surveys: Vec<Survey> = serde_json::from_str(
//!     r#"[{
//!         "id": "nps-1",
//!         "start_date": "2021-01-01T00:00:00Z",
//!         "questions": [{"question": "How likely are you to recommend us?"}],
//!         "conditions": {"url": "example.com"}
//!     }]"#,
//! )
//! .unwrap();
//!
//! let context = VisitorContext::new().with_url("https://example.com/pricing");
//! let flags: HashSet<String> = HashSet::new();
//! let activated = HashSet::new();
//!
//! let matched = active_matching_surveys(
//!     &surveys,
//!     &EvaluationInputs {
//!         context: &context,
//!         document: None,
//!         flags: &flags,
//!         activated: &activated,
//!         repeat: &NoRepeatActivation,
//!     },
//! );
//! assert_eq!(matched.len(), 1);
//! ```

pub mod conditions;
pub mod eligibility;
pub mod flags;
pub mod matching;
pub mod survey;

pub use conditions::{device_types_match, selector_present, url_matches, DocumentProbe, VisitorContext};
pub use eligibility::{active_matching_surveys, matches_conditions, passes_targeting, EvaluationInputs};
pub use flags::{has_flag_gates, passes_flag_gates, FlagChecker, NoRepeatActivation, RepeatActivation};
pub use matching::MatchType;
pub use survey::{
    FeatureFlagKeyPair, QuestionType, Survey, SurveyAppearance, SurveyConditions, SurveyQuestion,
    SurveyTrigger, SurveyTriggers, SurveyType,
};
