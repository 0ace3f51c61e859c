//! Survey delivery configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the survey delivery runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveysConfig {
    /// Project API token scoping the surveys endpoint.
    pub token: String,

    /// Base URL of the analytics API.
    pub api_host: String,

    /// Whether survey delivery is enabled at all. When disabled, every
    /// fetch delivers an empty list without touching the network.
    pub enabled: bool,

    /// Request timeout handed to the transport. Nothing else about the
    /// request lifecycle is managed by this layer.
    #[serde(with = "duration_secs")]
    pub request_timeout: Duration,

    /// User agent string sent with survey requests.
    pub user_agent: String,
}

impl SurveysConfig {
    /// Create a configuration for the given project token with defaults.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            ..Self::default()
        }
    }

    /// Create a new configuration builder.
    pub fn builder(token: impl Into<String>) -> SurveysConfigBuilder {
        SurveysConfigBuilder {
            config: Self::new(token),
        }
    }
}

impl Default for SurveysConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            api_host: "https://app.canvass.dev".to_string(),
            enabled: true,
            request_timeout: Duration::from_secs(10),
            user_agent: format!("canvass-client/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Builder for [`SurveysConfig`].
#[derive(Debug, Default)]
pub struct SurveysConfigBuilder {
    config: SurveysConfig,
}

impl SurveysConfigBuilder {
    /// Set the base URL of the analytics API.
    pub fn api_host(mut self, api_host: impl Into<String>) -> Self {
        self.config.api_host = api_host.into();
        self
    }

    /// Enable or disable survey delivery.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.config.enabled = enabled;
        self
    }

    /// Set the request timeout passed to the transport.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Set the user agent string.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Build the configuration.
    pub fn build(self) -> SurveysConfig {
        self.config
    }
}

mod duration_secs {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
