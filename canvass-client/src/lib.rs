//! Survey delivery runtime for Canvass
//!
//! Fetches in-product survey definitions, caches them locally, and decides
//! which surveys a visitor should see. Evaluation itself lives in
//! `canvass-core`; this crate owns everything with a side effect: the HTTP
//! transport, key-value persistence, activation and seen tracking, the
//! lazily-loaded renderer extension, and the subscriber surface.
//!
//! # Features
//!
//! - 📦 **Survey store** - one fetch, cached wholesale, no duplicate requests
//! - 🔌 **Renderer boundary** - lazily resolved extension with explicit state
//! - 📣 **Subscribers** - callback registry with unsubscribe handles
//! - 💾 **Local persistence** - pluggable key-value store, resettable
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use canvass_client::{SurveyStore, SurveysConfig, StaticVisitorContext};
//! use canvass_core::VisitorContext;
//!
//! let store = SurveyStore::builder(SurveysConfig::new("phx_project_token"))
//!     .context_provider(Arc::new(StaticVisitorContext(
//!         VisitorContext::new().with_url("https://example.com/pricing"),
//!     )))
//!     .build();
//!
//! let surveys = store.get_active_matching_surveys(false).await?;
//! for survey in &surveys {
//!     println!("eligible: {}", survey.id);
//! }
//! ```

mod activation;
mod config;
mod error;
mod renderer;
mod seen;
mod storage;
mod store;
mod transport;

pub use activation::ActivationTracker;
pub use config::{SurveysConfig, SurveysConfigBuilder};
pub use error::{Result, SurveysError};
pub use renderer::{ExtensionLoader, ExtensionState, RenderEligibility, RendererExtension};
pub use seen::SeenTracker;
pub use storage::{
    MemoryStorage, SurveyStorage, ACTIVATED_SURVEYS_KEY, CACHED_SURVEYS_KEY, LAST_SEEN_KEY,
    SEEN_PREFIX, STORAGE_PREFIX,
};
pub use store::{
    LoadStatus, StaticVisitorContext, SurveyStore, SurveyStoreBuilder, SurveySubscription,
    SurveysLoadedCallback, VisitorContextProvider,
};
pub use transport::{HttpSurveyTransport, SurveyTransport, SurveysResponse};
