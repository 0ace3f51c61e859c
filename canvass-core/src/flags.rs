//! Flag gate evaluation
//!
//! Resolves a survey's linked/targeting/internal/multi feature-flag gates
//! against an external flag engine. Each gate passes vacuously when its key
//! is absent or empty; configured gates fail closed when the engine reports
//! the flag disabled.

use crate::survey::Survey;

/// Black-box feature flag engine supplied by the embedding SDK.
pub trait FlagChecker: Send + Sync {
    /// Whether the flag is enabled for the current visitor.
    fn is_enabled(&self, key: &str) -> bool;
}

/// A plain set of enabled flag keys is a valid engine; useful for tests and
/// embeddings that resolve flags up front.
impl FlagChecker for std::collections::HashSet<String> {
    fn is_enabled(&self, key: &str) -> bool {
        self.contains(key)
    }
}

/// Repeat-display override supplied by the renderer extension.
///
/// When a survey may be activated repeatedly, the one-time internal
/// targeting gate is bypassed for it.
pub trait RepeatActivation: Send + Sync {
    /// Whether the survey may be displayed more than once per visitor.
    fn can_activate_repeatedly(&self, survey: &Survey) -> bool;
}

/// Override used when no renderer extension is available; never repeats.
pub struct NoRepeatActivation;

impl RepeatActivation for NoRepeatActivation {
    fn can_activate_repeatedly(&self, _survey: &Survey) -> bool {
        false
    }
}

/// Whether the survey configures any flag gate at all.
pub fn has_flag_gates(survey: &Survey) -> bool {
    configured(survey.linked_flag_key.as_deref())
        || configured(survey.targeting_flag_key.as_deref())
        || configured(survey.internal_targeting_flag_key.as_deref())
        || !survey.feature_flag_keys.is_empty()
}

/// Whether every flag gate configured on the survey passes.
///
/// `repeat_override` bypasses the internal targeting gate so repeat-eligible
/// surveys are not pinned by the one-time display flag.
pub fn passes_flag_gates(
    survey: &Survey,
    flags: &dyn FlagChecker,
    repeat_override: bool,
) -> bool {
    let linked = gate_passes(flags, survey.linked_flag_key.as_deref());
    let targeting = gate_passes(flags, survey.targeting_flag_key.as_deref());
    let internal =
        repeat_override || gate_passes(flags, survey.internal_targeting_flag_key.as_deref());
    let multi = survey
        .feature_flag_keys
        .iter()
        .all(|pair| gate_passes(flags, pair.value.as_deref()));

    linked && targeting && internal && multi
}

/// A single optional gate: vacuous truth for absent/empty keys.
fn gate_passes(flags: &dyn FlagChecker, key: Option<&str>) -> bool {
    match key {
        Some(key) if !key.is_empty() => flags.is_enabled(key),
        _ => true,
    }
}

fn configured(key: Option<&str>) -> bool {
    key.is_some_and(|k| !k.is_empty())
}
