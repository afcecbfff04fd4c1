#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! HTTP clients for the crime scope backend.
//!
//! [`ApiClient`] talks to the backend over `reqwest` and implements the
//! three capability traits the controllers depend on:
//!
//! - [`IncidentSource`]: nearby and full incident listings
//! - [`StatsSource`]: aggregate statistics for the dashboard
//! - [`ReportSink`]: report submission
//!
//! None of the calls retry. Every non-success status becomes
//! [`ApiError::Status`] carrying the server's message when it sent one.
//!
//! The traits are `?Send`: the controllers run on a single-threaded
//! event loop and their test doubles hold `Rc`/`RefCell` state.

pub mod query;
pub mod report;

use async_trait::async_trait;
use crime_scope_api_models::{ApiErrorBody, CrimeStats, NearbyQuery, ReportAck};
use crime_scope_config::{ApiConfig, ReportEncoding};
use crime_scope_crime_models::{IncidentReport, NewReport};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Header carrying the backend API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Errors from backend calls.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Connection failure, timeout, or body read failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("HTTP {status}{}", message.as_ref().map(|m| format!(": {m}")).unwrap_or_default())]
    Status {
        /// Status code.
        status: u16,
        /// `message` (or `error`) field of the error body.
        message: Option<String>,
    },

    /// The body was not the JSON we expected.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },

    /// The client could not be built from its configuration.
    #[error("Invalid API configuration: {message}")]
    Config {
        /// What is wrong.
        message: String,
    },
}

impl ApiError {
    /// Message supplied by the server, if the failure carried one.
    #[must_use]
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Status { message, .. } => message.as_deref(),
            _ => None,
        }
    }
}

/// Source of incident records for the map.
#[async_trait(?Send)]
pub trait IncidentSource {
    /// Incidents within `query.radius` km of a point.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] if the request or decoding fails.
    async fn nearby(&self, query: &NearbyQuery) -> Result<Vec<IncidentReport>, ApiError>;

    /// Every incident the backend is willing to list.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] if the request or decoding fails.
    async fn all_incidents(&self) -> Result<Vec<IncidentReport>, ApiError>;
}

/// Source of dashboard statistics.
#[async_trait(?Send)]
pub trait StatsSource {
    /// Current aggregate statistics.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] if the request or decoding fails.
    async fn stats(&self) -> Result<CrimeStats, ApiError>;
}

/// Destination for new reports.
#[async_trait(?Send)]
pub trait ReportSink {
    /// Posts one report. Never retries.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] if the request fails or the backend rejects
    /// the report.
    async fn submit(&self, report: &NewReport) -> Result<ReportAck, ApiError>;
}

/// `reqwest`-backed client for the backend API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    report_path: String,
    encoding: ReportEncoding,
}

impl ApiClient {
    /// Builds a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Config`] if the API key is not a valid header
    /// value, or [`ApiError::Http`] if the TLS backend cannot be
    /// initialised.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        if let Some(key) = &config.api_key {
            let mut value = HeaderValue::from_str(key).map_err(|e| ApiError::Config {
                message: format!("API key is not a valid header value: {e}"),
            })?;
            value.set_sensitive(true);
            headers.insert(HeaderName::from_static(API_KEY_HEADER), value);
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            report_path: config.report_path.clone(),
            encoding: config.report_encoding,
        })
    }

    /// Base URL requests are resolved against.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

/// Reads a response body, mapping non-success statuses to
/// [`ApiError::Status`].
pub(crate) async fn read_body(response: reqwest::Response) -> Result<String, ApiError> {
    let status = response.status();
    let url = response.url().to_string();
    let body = response.text().await?;

    if !status.is_success() {
        let message = ApiErrorBody::message_from(&body);
        log::warn!(
            "{url} returned {status}: {}",
            message.as_deref().unwrap_or("<no message>")
        );
        return Err(ApiError::Status {
            status: status.as_u16(),
            message,
        });
    }

    Ok(body)
}

/// Reads a successful response body as JSON.
pub(crate) async fn read_json<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ApiError> {
    let url = response.url().to_string();
    let body = read_body(response).await?;
    parse_json(&url, &body)
}

pub(crate) fn parse_json<T: DeserializeOwned>(url: &str, body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|e| ApiError::Parse {
        message: format!("{url}: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crime_scope_config::AppConfig;

    #[test]
    fn status_error_display_includes_message() {
        let err = ApiError::Status {
            status: 400,
            message: Some("Missing required fields".to_string()),
        };
        assert_eq!(err.to_string(), "HTTP 400: Missing required fields");
        assert_eq!(err.server_message(), Some("Missing required fields"));

        let err = ApiError::Status {
            status: 502,
            message: None,
        };
        assert_eq!(err.to_string(), "HTTP 502");
        assert!(err.server_message().is_none());
    }

    #[test]
    fn builds_urls_without_double_slash() {
        let mut config = AppConfig::default().api;
        config.base_url = "http://localhost:5000/".to_string();
        let client = ApiClient::new(&config).unwrap();
        assert_eq!(client.base_url(), "http://localhost:5000");
        assert_eq!(client.url("/api/crimes"), "http://localhost:5000/api/crimes");
    }

    #[test]
    fn rejects_unprintable_api_key() {
        let mut config = AppConfig::default().api;
        config.api_key = Some("bad\nkey".to_string());
        assert!(matches!(ApiClient::new(&config), Err(ApiError::Config { .. })));
    }
}
