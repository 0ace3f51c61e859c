//! Survey store.
//!
//! Fetches survey definitions scoped by the project token, caches the
//! parsed list through [`SurveyStorage`], and serves any number of
//! subscriber callbacks without duplicate in-flight requests. Composes the
//! `canvass-core` eligibility pipeline with the activation, seen, and
//! renderer-extension state owned here.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use canvass_core::{
    active_matching_surveys, DocumentProbe, EvaluationInputs, FlagChecker, NoRepeatActivation,
    RepeatActivation, Survey, VisitorContext,
};
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::activation::ActivationTracker;
use crate::config::SurveysConfig;
use crate::error::{Result, SurveysError};
use crate::renderer::{ExtensionLoader, ExtensionState, MissingExtensionLoader, RenderEligibility};
use crate::seen::SeenTracker;
use crate::storage::{MemoryStorage, SurveyStorage, CACHED_SURVEYS_KEY, STORAGE_PREFIX};
use crate::transport::{HttpSurveyTransport, SurveyTransport};

/// Load outcome delivered to subscribers.
#[derive(Debug, Clone)]
pub struct LoadStatus {
    /// Whether a survey list is loaded and current.
    pub loaded: bool,

    /// The failure that prevented loading, if any.
    pub error: Option<String>,
}

impl LoadStatus {
    /// A successful load.
    pub fn loaded() -> Self {
        Self {
            loaded: true,
            error: None,
        }
    }

    /// A failed load with its reason.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            loaded: false,
            error: Some(error.into()),
        }
    }
}

/// Subscriber callback invoked whenever a load attempt settles.
pub type SurveysLoadedCallback = Arc<dyn Fn(&[Survey], &LoadStatus) + Send + Sync>;

type SubscriberList = RwLock<Vec<(u64, SurveysLoadedCallback)>>;

/// Handle returned by [`SurveyStore::on_surveys_loaded`].
pub struct SurveySubscription {
    id: u64,
    subscribers: Arc<SubscriberList>,
}

impl SurveySubscription {
    /// Remove the subscriber; it receives no further notifications.
    pub fn unsubscribe(self) {
        self.subscribers.write().retain(|(id, _)| *id != self.id);
    }
}

/// Supplies the visitor's page state at evaluation time.
pub trait VisitorContextProvider: Send + Sync {
    /// Snapshot of the current page state.
    fn snapshot(&self) -> VisitorContext;
}

/// Fixed provider for embeddings whose page state does not change.
pub struct StaticVisitorContext(pub VisitorContext);

impl VisitorContextProvider for StaticVisitorContext {
    fn snapshot(&self) -> VisitorContext {
        self.0.clone()
    }
}

/// Explicit store state; fields, not ambient globals.
#[derive(Default)]
struct StoreState {
    /// An HTTP fetch is outstanding; overlapping calls are rejected.
    fetch_in_flight: bool,

    /// Lifecycle of the lazily-loaded renderer extension.
    extension: ExtensionState,
}

/// Clears the in-flight flag however the fetch settles.
struct FetchGuard<'a> {
    state: &'a Mutex<StoreState>,
}

impl Drop for FetchGuard<'_> {
    fn drop(&mut self) {
        self.state.lock().fetch_in_flight = false;
    }
}

/// Forwards the repeat-display override of a loaded renderer.
struct ExtensionRepeatOverride(Arc<dyn crate::renderer::RendererExtension>);

impl RepeatActivation for ExtensionRepeatOverride {
    fn can_activate_repeatedly(&self, survey: &Survey) -> bool {
        self.0.can_activate_repeatedly(survey)
    }
}

/// Survey fetching, caching, and delivery.
pub struct SurveyStore {
    config: SurveysConfig,
    transport: Arc<dyn SurveyTransport>,
    storage: Arc<dyn SurveyStorage>,
    flags: Arc<dyn FlagChecker>,
    loader: Arc<dyn ExtensionLoader>,
    context: Arc<dyn VisitorContextProvider>,
    document: Option<Arc<dyn DocumentProbe>>,
    activation: ActivationTracker,
    seen: SeenTracker,
    state: Mutex<StoreState>,
    subscribers: Arc<SubscriberList>,
    next_subscriber_id: AtomicU64,
}

impl SurveyStore {
    /// Create a store builder for the given configuration.
    pub fn builder(config: SurveysConfig) -> SurveyStoreBuilder {
        SurveyStoreBuilder {
            config,
            transport: None,
            storage: None,
            flags: None,
            loader: None,
            context: None,
            document: None,
        }
    }

    /// The store configuration.
    pub fn config(&self) -> &SurveysConfig {
        &self.config
    }

    /// The activation tracker fed by the event-capture pipeline.
    pub fn activation(&self) -> &ActivationTracker {
        &self.activation
    }

    /// The seen/repeat-display tracker.
    pub fn seen(&self) -> &SeenTracker {
        &self.seen
    }

    /// Forward a captured event to the activation tracker.
    pub fn on_event(&self, name: &str) {
        self.activation.on_event(name);
    }

    /// Forward a tracked action to the activation tracker.
    pub fn on_action(&self, name: &str) {
        self.activation.on_action(name);
    }

    /// Resolve the renderer extension and perform the initial fetch.
    ///
    /// Idempotent: a call while already loaded or while loading is a
    /// no-op. Loader failures are logged and reported to subscribers, not
    /// returned; a later call may retry.
    pub async fn load_if_enabled(&self) {
        if !self.config.enabled {
            debug!("survey delivery is disabled; skipping initialization");
            return;
        }

        {
            let mut state = self.state.lock();
            if matches!(
                state.extension,
                ExtensionState::Ready(_) | ExtensionState::Loading
            ) {
                debug!("renderer extension already loaded or loading");
                return;
            }
            state.extension = ExtensionState::Loading;
        }

        match self.loader.load().await {
            Ok(renderer) => {
                self.state.lock().extension = ExtensionState::Ready(renderer);
                info!("survey renderer extension loaded");
                // Initial fetch; a failure is already reported to
                // subscribers inside get_surveys.
                let _ = self.get_surveys(false).await;
            }
            Err(e) => {
                error!(error = %e, "survey renderer extension failed to load");
                self.state.lock().extension = ExtensionState::Failed(e.to_string());
                self.notify(&[], &LoadStatus::failed(e.to_string()));
            }
        }
    }

    /// Return the survey definitions, fetching them when necessary.
    ///
    /// Disabled configuration yields an empty list. A cached list is
    /// served as is unless `force_reload` is set. At most one fetch is
    /// outstanding at a time; an overlapping call fails fast with
    /// [`SurveysError::FetchInFlight`] instead of queueing.
    pub async fn get_surveys(&self, force_reload: bool) -> Result<Vec<Survey>> {
        if !self.config.enabled {
            debug!("survey delivery is disabled; returning empty list");
            return Ok(Vec::new());
        }

        {
            let mut state = self.state.lock();
            if !force_reload
                && let Some(cached) = self.cached_surveys()
            {
                return Ok(cached);
            }
            if state.fetch_in_flight {
                debug!("rejecting overlapping surveys fetch");
                return Err(SurveysError::FetchInFlight);
            }
            state.fetch_in_flight = true;
        }
        let _guard = FetchGuard { state: &self.state };

        match self.transport.fetch_surveys(&self.config).await {
            Ok(response) => {
                let surveys = response.surveys;
                self.activation.register(&surveys);
                match serde_json::to_string(&surveys) {
                    Ok(raw) => self.storage.set(CACHED_SURVEYS_KEY, raw),
                    Err(e) => warn!(error = %e, "failed to serialize surveys for cache"),
                }
                info!(count = surveys.len(), "surveys loaded");
                self.notify(&surveys, &LoadStatus::loaded());
                Ok(surveys)
            }
            Err(e) => {
                warn!(error = %e, "surveys fetch failed");
                self.notify(&[], &LoadStatus::failed(e.to_string()));
                Err(e)
            }
        }
    }

    /// Return the surveys that are active and match the current visitor.
    ///
    /// Filter order: active window, condition set, targeting (flag gates
    /// plus event/action activation).
    pub async fn get_active_matching_surveys(&self, force_reload: bool) -> Result<Vec<Survey>> {
        let surveys = self.get_surveys(force_reload).await?;
        let context = self.context.snapshot();
        let activated = self.activation.activated_ids();

        let renderer = self.state.lock().extension.renderer();
        let repeat: Box<dyn RepeatActivation> = match renderer {
            Some(renderer) => Box::new(ExtensionRepeatOverride(renderer)),
            None => Box::new(NoRepeatActivation),
        };

        let inputs = EvaluationInputs {
            context: &context,
            document: self.document.as_deref(),
            flags: self.flags.as_ref(),
            activated: &activated,
            repeat: repeat.as_ref(),
        };
        Ok(active_matching_surveys(&surveys, &inputs))
    }

    /// Whether the survey could be rendered right now, with the reason
    /// when it cannot.
    pub async fn can_render_survey(&self, id: &str) -> RenderEligibility {
        let renderer = self.state.lock().extension.renderer();
        let Some(renderer) = renderer else {
            return RenderEligibility::disabled("renderer extension is not loaded");
        };

        let surveys = match self.get_surveys(false).await {
            Ok(surveys) => surveys,
            Err(e) => return RenderEligibility::disabled(e.to_string()),
        };
        // First match wins; duplicate ids are tolerated.
        let Some(survey) = surveys.iter().find(|s| s.id == id) else {
            return RenderEligibility::disabled(format!("unknown survey id: {id}"));
        };

        let repeat_override = renderer.can_activate_repeatedly(survey);
        if let Some(reason) = self.seen.suppression_reason(survey, repeat_override, Utc::now()) {
            return RenderEligibility::disabled(reason);
        }
        renderer.can_render_survey(survey)
    }

    /// Render the survey through the extension and record it as seen.
    pub async fn render_survey(&self, id: &str, selector: Option<&str>) -> Result<()> {
        let renderer = self.state.lock().extension.renderer();
        let Some(renderer) = renderer else {
            return Err(SurveysError::ExtensionNotLoaded);
        };

        let surveys = self.get_surveys(false).await?;
        let Some(survey) = surveys.iter().find(|s| s.id == id) else {
            return Err(SurveysError::UnknownSurvey(id.to_string()));
        };

        renderer.render_survey(survey, selector);
        self.seen.mark_seen(survey, Utc::now());
        info!(survey = %id, "survey rendered");
        Ok(())
    }

    /// Register a subscriber for load outcomes.
    ///
    /// A subscriber added after a successful load is notified immediately
    /// with the cached list.
    pub fn on_surveys_loaded(
        &self,
        callback: impl Fn(&[Survey], &LoadStatus) + Send + Sync + 'static,
    ) -> SurveySubscription {
        let callback: SurveysLoadedCallback = Arc::new(callback);
        let id = self.next_subscriber_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers.write().push((id, callback.clone()));

        if let Some(cached) = self.cached_surveys() {
            callback(&cached, &LoadStatus::loaded());
        }

        SurveySubscription {
            id,
            subscribers: self.subscribers.clone(),
        }
    }

    /// Remove every locally persisted survey state: the cached list, the
    /// activation record, and the seen markers.
    pub fn reset(&self) {
        self.storage.remove_by_prefix(STORAGE_PREFIX);
        info!("survey state reset");
    }

    fn cached_surveys(&self) -> Option<Vec<Survey>> {
        let raw = self.storage.get(CACHED_SURVEYS_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(surveys) => Some(surveys),
            Err(e) => {
                warn!(error = %e, "discarding unparseable cached surveys");
                None
            }
        }
    }

    fn notify(&self, surveys: &[Survey], status: &LoadStatus) {
        let subscribers: Vec<SurveysLoadedCallback> = self
            .subscribers
            .read()
            .iter()
            .map(|(_, callback)| callback.clone())
            .collect();
        for callback in subscribers {
            callback(surveys, status);
        }
    }
}

/// Builder for [`SurveyStore`].
pub struct SurveyStoreBuilder {
    config: SurveysConfig,
    transport: Option<Arc<dyn SurveyTransport>>,
    storage: Option<Arc<dyn SurveyStorage>>,
    flags: Option<Arc<dyn FlagChecker>>,
    loader: Option<Arc<dyn ExtensionLoader>>,
    context: Option<Arc<dyn VisitorContextProvider>>,
    document: Option<Arc<dyn DocumentProbe>>,
}

impl SurveyStoreBuilder {
    /// Set the transport; defaults to [`HttpSurveyTransport`].
    pub fn transport(mut self, transport: Arc<dyn SurveyTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Set the persistence backend; defaults to [`MemoryStorage`].
    pub fn storage(mut self, storage: Arc<dyn SurveyStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Set the feature flag engine; defaults to every flag disabled.
    pub fn flags(mut self, flags: Arc<dyn FlagChecker>) -> Self {
        self.flags = Some(flags);
        self
    }

    /// Set the renderer extension loader.
    pub fn extension_loader(mut self, loader: Arc<dyn ExtensionLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Set the visitor context provider; defaults to an empty context, so
    /// every configured URL/device condition fails closed.
    pub fn context_provider(mut self, context: Arc<dyn VisitorContextProvider>) -> Self {
        self.context = Some(context);
        self
    }

    /// Set the document probe used for selector conditions.
    pub fn document_probe(mut self, document: Arc<dyn DocumentProbe>) -> Self {
        self.document = Some(document);
        self
    }

    /// Build the store.
    pub fn build(self) -> SurveyStore {
        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(HttpSurveyTransport::new(&self.config)));
        let storage = self
            .storage
            .unwrap_or_else(|| Arc::new(MemoryStorage::new()));
        let flags = self
            .flags
            .unwrap_or_else(|| Arc::new(std::collections::HashSet::<String>::new()));
        let loader = self
            .loader
            .unwrap_or_else(|| Arc::new(MissingExtensionLoader));
        let context = self
            .context
            .unwrap_or_else(|| Arc::new(StaticVisitorContext(VisitorContext::default())));

        SurveyStore {
            config: self.config,
            transport,
            flags,
            loader,
            context,
            document: self.document,
            activation: ActivationTracker::new(storage.clone()),
            seen: SeenTracker::new(storage.clone()),
            storage,
            state: Mutex::new(StoreState::default()),
            subscribers: Arc::new(RwLock::new(Vec::new())),
            next_subscriber_id: AtomicU64::new(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::SurveysResponse;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::future::Future;
    use std::sync::atomic::AtomicUsize;
    use std::task::{Context, Waker};
    use tokio::sync::Notify;

    struct MockTransport {
        calls: AtomicUsize,
        responses: Mutex<VecDeque<Result<SurveysResponse>>>,
        block_first: Mutex<Option<Arc<Notify>>>,
    }

    impl MockTransport {
        fn new(responses: Vec<Result<SurveysResponse>>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                responses: Mutex::new(responses.into()),
                block_first: Mutex::new(None),
            }
        }

        fn blocking_first(gate: Arc<Notify>, responses: Vec<Result<SurveysResponse>>) -> Self {
            let transport = Self::new(responses);
            *transport.block_first.lock() = Some(gate);
            transport
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SurveyTransport for MockTransport {
        async fn fetch_surveys(&self, _config: &SurveysConfig) -> Result<SurveysResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let gate = self.block_first.lock().take();
            if let Some(gate) = gate {
                gate.notified().await;
            }
            self.responses
                .lock()
                .pop_front()
                .unwrap_or(Ok(SurveysResponse::default()))
        }
    }

    fn response_with(ids: &[&str]) -> SurveysResponse {
        let surveys = ids
            .iter()
            .map(|id| {
                serde_json::from_str(&format!(
                    r#"{{"id": "{id}", "start_date": "2021-01-01T00:00:00Z"}}"#
                ))
                .unwrap()
            })
            .collect();
        SurveysResponse { surveys }
    }

    fn config() -> SurveysConfig {
        SurveysConfig::new("phx_test")
    }

    #[tokio::test]
    async fn test_disabled_config_returns_empty_without_fetching() {
        let transport = Arc::new(MockTransport::new(vec![Ok(response_with(&["1"]))]));
        let config = SurveysConfig::builder("phx_test").enabled(false).build();
        let store = SurveyStore::builder(config)
            .transport(transport.clone())
            .build();

        let surveys = store.get_surveys(false).await.unwrap();
        assert!(surveys.is_empty());
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_cache_serves_repeat_calls() {
        let transport = Arc::new(MockTransport::new(vec![
            Ok(response_with(&["1"])),
            Ok(response_with(&["1", "2"])),
        ]));
        let store = SurveyStore::builder(config())
            .transport(transport.clone())
            .build();

        let first = store.get_surveys(false).await.unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(transport.calls(), 1);

        let second = store.get_surveys(false).await.unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(transport.calls(), 1);

        let reloaded = store.get_surveys(true).await.unwrap();
        assert_eq!(reloaded.len(), 2);
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test]
    async fn test_overlapping_fetch_is_rejected() {
        let gate = Arc::new(Notify::new());
        let transport = Arc::new(MockTransport::blocking_first(
            gate.clone(),
            vec![Ok(response_with(&["1"]))],
        ));
        let store = SurveyStore::builder(config())
            .transport(transport.clone())
            .build();

        let mut first = Box::pin(store.get_surveys(false));
        let mut cx = Context::from_waker(Waker::noop());
        assert!(first.as_mut().poll(&mut cx).is_pending());

        let err = store.get_surveys(false).await.unwrap_err();
        assert!(matches!(err, SurveysError::FetchInFlight));
        assert!(err.is_transient());

        gate.notify_one();
        let surveys = first.await.unwrap();
        assert_eq!(surveys.len(), 1);

        // The cache now serves further calls without another fetch.
        let again = store.get_surveys(false).await.unwrap();
        assert_eq!(again.len(), 1);
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_fetch_failure_notifies_subscribers_and_is_not_cached() {
        let transport = Arc::new(MockTransport::new(vec![
            Err(SurveysError::UnexpectedStatus { status: 500 }),
            Ok(response_with(&["1"])),
        ]));
        let store = SurveyStore::builder(config())
            .transport(transport.clone())
            .build();

        let statuses: Arc<Mutex<Vec<LoadStatus>>> = Arc::new(Mutex::new(Vec::new()));
        let seen_statuses = statuses.clone();
        let _subscription =
            store.on_surveys_loaded(move |_, status| seen_statuses.lock().push(status.clone()));

        let err = store.get_surveys(false).await.unwrap_err();
        assert!(matches!(err, SurveysError::UnexpectedStatus { status: 500 }));

        {
            let statuses = statuses.lock();
            assert_eq!(statuses.len(), 1);
            assert!(!statuses[0].loaded);
            assert!(statuses[0].error.is_some());
        }

        // Nothing was cached; the next call fetches again and succeeds.
        let surveys = store.get_surveys(false).await.unwrap();
        assert_eq!(surveys.len(), 1);
        assert_eq!(transport.calls(), 2);
        assert!(statuses.lock()[1].loaded);
    }

    #[tokio::test]
    async fn test_subscriber_added_after_load_is_notified_immediately() {
        let transport = Arc::new(MockTransport::new(vec![Ok(response_with(&["1"]))]));
        let store = SurveyStore::builder(config())
            .transport(transport.clone())
            .build();

        store.get_surveys(false).await.unwrap();

        let notified = Arc::new(AtomicUsize::new(0));
        let count = notified.clone();
        let subscription = store.on_surveys_loaded(move |surveys, status| {
            assert!(status.loaded);
            assert_eq!(surveys.len(), 1);
            count.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(notified.load(Ordering::SeqCst), 1);

        subscription.unsubscribe();
        store.get_surveys(true).await.unwrap();
        assert_eq!(notified.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_reset_clears_cache_and_state() {
        let transport = Arc::new(MockTransport::new(vec![
            Ok(response_with(&["1"])),
            Ok(response_with(&["2"])),
        ]));
        let store = SurveyStore::builder(config())
            .transport(transport.clone())
            .build();

        store.get_surveys(false).await.unwrap();
        store.reset();

        // The cache is gone, so the next call fetches again.
        let surveys = store.get_surveys(false).await.unwrap();
        assert_eq!(surveys[0].id, "2");
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test]
    async fn test_render_without_extension_fails() {
        let store = SurveyStore::builder(config())
            .transport(Arc::new(MockTransport::new(vec![Ok(response_with(&["1"]))])))
            .build();

        let eligibility = store.can_render_survey("1").await;
        assert!(!eligibility.visible);
        assert_eq!(
            eligibility.disabled_reason.as_deref(),
            Some("renderer extension is not loaded")
        );

        let err = store.render_survey("1", None).await.unwrap_err();
        assert!(matches!(err, SurveysError::ExtensionNotLoaded));
    }

    #[tokio::test]
    async fn test_load_if_enabled_reports_missing_extension_to_subscribers() {
        let transport = Arc::new(MockTransport::new(vec![Ok(response_with(&["1"]))]));
        let store = SurveyStore::builder(config())
            .transport(transport.clone())
            .build();

        let statuses: Arc<Mutex<Vec<LoadStatus>>> = Arc::new(Mutex::new(Vec::new()));
        let seen_statuses = statuses.clone();
        let _subscription =
            store.on_surveys_loaded(move |_, status| seen_statuses.lock().push(status.clone()));

        // The default loader has no extension to produce.
        store.load_if_enabled().await;

        let statuses = statuses.lock();
        assert_eq!(statuses.len(), 1);
        assert!(!statuses[0].loaded);
        assert!(statuses[0]
            .error
            .as_deref()
            .unwrap()
            .contains("no renderer extension is configured"));
        assert_eq!(transport.calls(), 0);
    }
}
