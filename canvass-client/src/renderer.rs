//! Renderer extension boundary.
//!
//! Survey UI lives in a lazily-loaded extension owned by the embedding
//! SDK. This module defines the capability traits the store resolves at
//! startup and the explicit lifecycle replacing dynamic module probing.

use std::sync::Arc;

use async_trait::async_trait;
use canvass_core::Survey;
use serde::{Deserialize, Serialize};

use crate::error::SurveysError;

/// Outcome of a render-eligibility check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderEligibility {
    /// Whether the survey can be shown right now.
    pub visible: bool,

    /// Why the survey cannot be shown, when it cannot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled_reason: Option<String>,
}

impl RenderEligibility {
    /// The survey can be shown.
    pub fn visible() -> Self {
        Self {
            visible: true,
            disabled_reason: None,
        }
    }

    /// The survey cannot be shown for the given reason.
    pub fn disabled(reason: impl Into<String>) -> Self {
        Self {
            visible: false,
            disabled_reason: Some(reason.into()),
        }
    }
}

/// Rendering extension resolved at runtime.
pub trait RendererExtension: Send + Sync {
    /// Whether the survey could be displayed right now.
    fn can_render_survey(&self, survey: &Survey) -> RenderEligibility;

    /// Display the survey, optionally anchored to a CSS selector.
    fn render_survey(&self, survey: &Survey, selector: Option<&str>);

    /// Whether the survey may be displayed more than once per visitor.
    fn can_activate_repeatedly(&self, survey: &Survey) -> bool;
}

/// Produces the renderer extension on demand.
///
/// Stands in for lazy script loading: the loader is only invoked during
/// store initialization, and its failure is reported to subscribers
/// rather than raised.
#[async_trait]
pub trait ExtensionLoader: Send + Sync {
    /// Resolve the renderer extension.
    async fn load(&self) -> Result<Arc<dyn RendererExtension>, SurveysError>;
}

/// Lifecycle of the lazily-loaded renderer extension.
#[derive(Clone, Default)]
pub enum ExtensionState {
    /// The loader has not been invoked yet.
    #[default]
    NotLoaded,
    /// A loader invocation is outstanding.
    Loading,
    /// The renderer is available.
    Ready(Arc<dyn RendererExtension>),
    /// The loader failed; the error message is kept for reporting.
    Failed(String),
}

impl ExtensionState {
    /// The renderer, when the extension is ready.
    pub fn renderer(&self) -> Option<Arc<dyn RendererExtension>> {
        match self {
            ExtensionState::Ready(renderer) => Some(renderer.clone()),
            _ => None,
        }
    }
}

/// Loader used when the embedding SDK supplies no renderer extension.
pub(crate) struct MissingExtensionLoader;

#[async_trait]
impl ExtensionLoader for MissingExtensionLoader {
    async fn load(&self) -> Result<Arc<dyn RendererExtension>, SurveysError> {
        Err(SurveysError::ExtensionLoad(
            "no renderer extension is configured".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eligibility_constructors() {
        assert!(RenderEligibility::visible().visible);
        let denied = RenderEligibility::disabled("not yet");
        assert!(!denied.visible);
        assert_eq!(denied.disabled_reason.as_deref(), Some("not yet"));
    }

    #[test]
    fn test_state_renderer_accessor() {
        assert!(ExtensionState::NotLoaded.renderer().is_none());
        assert!(ExtensionState::Failed("boom".to_string()).renderer().is_none());
    }
}
