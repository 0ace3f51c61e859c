//! Survey transport.
//!
//! One HTTP call: fetch the survey definitions for a project. The trait
//! keeps the network out of tests and out of the store's concern.

use async_trait::async_trait;
use canvass_core::Survey;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::SurveysConfig;
use crate::error::{Result, SurveysError};

/// Wire response from the surveys endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SurveysResponse {
    /// Fetched survey definitions; missing field decodes as empty.
    #[serde(default)]
    pub surveys: Vec<Survey>,
}

/// Transport used to fetch survey definitions.
#[async_trait]
pub trait SurveyTransport: Send + Sync {
    /// Fetch the survey definitions for the configured project.
    async fn fetch_surveys(&self, config: &SurveysConfig) -> Result<SurveysResponse>;
}

/// HTTP transport backed by `reqwest`.
pub struct HttpSurveyTransport {
    client: reqwest::Client,
}

impl HttpSurveyTransport {
    /// Create a transport honoring the configured timeout and user agent.
    pub fn new(config: &SurveysConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(&config.user_agent)
            .build()
            .expect("Failed to build HTTP client");

        Self { client }
    }
}

#[async_trait]
impl SurveyTransport for HttpSurveyTransport {
    async fn fetch_surveys(&self, config: &SurveysConfig) -> Result<SurveysResponse> {
        let url = format!("{}/api/surveys/", config.api_host.trim_end_matches('/'));
        debug!(url = %url, "fetching surveys");

        let response = self
            .client
            .get(&url)
            .query(&[("token", config.token.as_str())])
            .send()
            .await?;

        let status = response.status().as_u16();
        if status != 200 {
            return Err(SurveysError::UnexpectedStatus { status });
        }

        let body = response.text().await?;
        let parsed: SurveysResponse = serde_json::from_str(&body)?;
        debug!(count = parsed.surveys.len(), "surveys fetched");
        Ok(parsed)
    }
}
