//! Eligibility pipeline
//!
//! Composes the active-window, condition, and targeting filters into the
//! final "active matching surveys" chain.

use std::collections::HashSet;

use crate::conditions::{device_types_match, selector_present, url_matches, DocumentProbe, VisitorContext};
use crate::flags::{has_flag_gates, passes_flag_gates, FlagChecker, RepeatActivation};
use crate::survey::Survey;

/// External state consulted during one eligibility evaluation pass.
pub struct EvaluationInputs<'a> {
    /// Visitor page state.
    pub context: &'a VisitorContext,

    /// Document lookup, when a DOM is available.
    pub document: Option<&'a dyn DocumentProbe>,

    /// Feature flag engine.
    pub flags: &'a dyn FlagChecker,

    /// Ids of surveys already activated by event/action triggers.
    pub activated: &'a HashSet<String>,

    /// Repeat-display override from the renderer extension.
    pub repeat: &'a dyn RepeatActivation,
}

/// Whether the survey's condition set holds for the current page.
///
/// A survey with no condition set matches unconditionally; otherwise the
/// URL, selector, and device-type checks must all hold.
pub fn matches_conditions(survey: &Survey, inputs: &EvaluationInputs<'_>) -> bool {
    let Some(conditions) = &survey.conditions else {
        return true;
    };
    url_matches(conditions, inputs.context)
        && selector_present(conditions, inputs.document)
        && device_types_match(conditions, inputs.context)
}

/// Whether the survey passes its flag gates and activation requirement.
///
/// A survey with no flag gates targets unconditionally. Otherwise every
/// gate must pass, and a survey with event/action triggers must already
/// have been activated for this visitor.
pub fn passes_targeting(survey: &Survey, inputs: &EvaluationInputs<'_>) -> bool {
    if !has_flag_gates(survey) {
        return true;
    }
    let repeat_override = inputs.repeat.can_activate_repeatedly(survey);
    if !passes_flag_gates(survey, inputs.flags, repeat_override) {
        return false;
    }
    if survey.has_activation_triggers() && !inputs.activated.contains(&survey.id) {
        return false;
    }
    true
}

/// Run the full filter chain over a fetched survey list.
///
/// Order: active window, then condition set, then targeting.
pub fn active_matching_surveys(surveys: &[Survey], inputs: &EvaluationInputs<'_>) -> Vec<Survey> {
    surveys
        .iter()
        .filter(|survey| survey.is_running())
        .filter(|survey| matches_conditions(survey, inputs))
        .filter(|survey| passes_targeting(survey, inputs))
        .cloned()
        .collect()
}
