//! Condition evaluators
//!
//! URL, device-type, and selector-presence checks built on the match
//! predicates. Every evaluator matches by default when its condition is not
//! configured, and fails closed when the page state it needs is unknown.

use std::slice;

use crate::matching::MatchType;
use crate::survey::SurveyConditions;

/// Snapshot of the visitor's page state for one evaluation pass.
#[derive(Debug, Clone, Default)]
pub struct VisitorContext {
    /// Current page URL, if known.
    pub current_url: Option<String>,

    /// Device class label, if known (for example "Desktop", "Mobile",
    /// "Tablet"). Classification is an external capability.
    pub device_type: Option<String>,
}

impl VisitorContext {
    /// Create an empty context; every configured condition fails closed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the current page URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.current_url = Some(url.into());
        self
    }

    /// Set the device class label.
    pub fn with_device_type(mut self, device_type: impl Into<String>) -> Self {
        self.device_type = Some(device_type.into());
        self
    }
}

/// Document lookup capability supplied by the embedding SDK.
///
/// The delivery layer never walks a DOM itself; it only asks whether a
/// selector currently resolves.
pub trait DocumentProbe: Send + Sync {
    /// Whether the CSS selector resolves to at least one element.
    fn selector_exists(&self, selector: &str) -> bool;
}

/// Whether the survey's URL condition holds for the current page.
pub fn url_matches(conditions: &SurveyConditions, context: &VisitorContext) -> bool {
    let Some(url) = &conditions.url else {
        return true;
    };
    let Some(current) = &context.current_url else {
        // Configured condition but unknown page: fail closed.
        return false;
    };
    let match_type = conditions.url_match_type.unwrap_or_default();
    match_type.matches(slice::from_ref(url), current)
}

/// Whether the survey's device-type condition holds for the visitor.
pub fn device_types_match(conditions: &SurveyConditions, context: &VisitorContext) -> bool {
    if conditions.device_types.is_empty() {
        return true;
    }
    let Some(device) = &context.device_type else {
        return false;
    };
    let match_type = conditions.device_types_match_type.unwrap_or_default();
    match_type.matches(&conditions.device_types, device)
}

/// Whether the survey's selector condition resolves in the current document.
pub fn selector_present(
    conditions: &SurveyConditions,
    document: Option<&dyn DocumentProbe>,
) -> bool {
    let Some(selector) = &conditions.selector else {
        return true;
    };
    match document {
        Some(document) => document.selector_exists(selector),
        // Configured selector but no document to probe: fail closed.
        None => false,
    }
}
