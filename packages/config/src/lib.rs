#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Layered configuration for the crime scope map.
//!
//! Values are resolved in three layers, later layers winning:
//!
//! 1. The defaults embedded from `config/default.toml` at compile time.
//! 2. An optional TOML file named by `CRIME_SCOPE_CONFIG` (or passed
//!    explicitly). Only the keys it sets are overridden.
//! 3. Environment variables: `CRIME_SCOPE_API_URL`, `CRIME_SCOPE_API_KEY`
//!    and `CRIME_SCOPE_REPORT_PATH`.
//!
//! The backend API key is only ever read from a private file or the
//! environment; the embedded defaults carry none.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crime_scope_crime_models::GeoPoint;
use serde::Deserialize;
use thiserror::Error;

/// Env var naming an override config file.
pub const CONFIG_PATH_ENV: &str = "CRIME_SCOPE_CONFIG";
/// Env var overriding [`ApiConfig::base_url`].
pub const API_URL_ENV: &str = "CRIME_SCOPE_API_URL";
/// Env var supplying [`ApiConfig::api_key`].
pub const API_KEY_ENV: &str = "CRIME_SCOPE_API_KEY";
/// Env var overriding [`ApiConfig::report_path`].
pub const REPORT_PATH_ENV: &str = "CRIME_SCOPE_REPORT_PATH";

const DEFAULT_TOML: &str = include_str!("../config/default.toml");

/// Errors from loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The override file could not be read.
    #[error("Failed to read config file {}: {source}", path.display())]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// TOML syntax or shape error.
    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value parsed but is not usable.
    #[error("Invalid config value for {key}: {message}")]
    Invalid {
        /// Dotted key path.
        key: &'static str,
        /// What is wrong with it.
        message: String,
    },
}

/// How report submissions are encoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportEncoding {
    /// `application/json`
    #[default]
    Json,
    /// `application/x-www-form-urlencoded`
    Form,
}

/// Which backend endpoint feeds the map.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentFeed {
    /// `GET /api/alerts/nearby` around the user or fallback centre.
    #[default]
    Nearby,
    /// `GET /api/crimes`, everything the backend returns.
    All,
}

/// Backend API settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApiConfig {
    /// Scheme, host and port of the backend, without a trailing slash.
    pub base_url: String,
    /// Path reports are posted to.
    pub report_path: String,
    /// Body encoding for report submissions.
    #[serde(default)]
    pub report_encoding: ReportEncoding,
    /// Per-request timeout.
    pub timeout_secs: u64,
    /// Sent as `X-Api-Key` when present.
    #[serde(default)]
    pub api_key: Option<String>,
}

impl ApiConfig {
    /// Per-request timeout as a [`Duration`].
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Map view settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MapConfig {
    /// DOM id of the map container.
    pub container_id: String,
    /// Centre used before the user's location is known.
    pub fallback_center: GeoPoint,
    /// Zoom for the default view.
    pub default_zoom: u8,
    /// Zoom after locating the user.
    pub located_zoom: u8,
    /// Radius of the nearby query.
    pub nearby_radius_km: f64,
    /// Record limit of the nearby query.
    pub nearby_limit: u32,
    /// Pixel radius markers are clustered within.
    pub cluster_radius_px: f64,
    /// Endpoint that feeds the map.
    #[serde(default)]
    pub feed: IncidentFeed,
}

/// Reverse geocoder settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GeocoderConfig {
    /// Reverse endpoint URL.
    pub base_url: String,
    /// `User-Agent` header; the public Nominatim instance requires one.
    pub user_agent: String,
    /// Per-request timeout.
    pub timeout_secs: u64,
    /// Minimum gap between two lookups; 0 disables throttling.
    #[serde(default)]
    pub rate_limit_ms: u64,
}

impl GeocoderConfig {
    /// Per-request timeout as a [`Duration`].
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Minimum gap between lookups as a [`Duration`].
    #[must_use]
    pub const fn rate_limit(&self) -> Duration {
        Duration::from_millis(self.rate_limit_ms)
    }
}

/// Dashboard settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DashboardConfig {
    /// Auto-refresh period.
    pub refresh_interval_secs: u64,
}

impl DashboardConfig {
    /// Auto-refresh period as a [`Duration`].
    #[must_use]
    pub const fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }
}

/// Toast settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NotificationConfig {
    /// How long a toast stays up when no duration is given.
    pub default_duration_ms: u64,
}

impl NotificationConfig {
    /// Default toast lifetime as a [`Duration`].
    #[must_use]
    pub const fn default_duration(&self) -> Duration {
        Duration::from_millis(self.default_duration_ms)
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AppConfig {
    /// Backend API.
    pub api: ApiConfig,
    /// Map view.
    pub map: MapConfig,
    /// Reverse geocoder.
    pub geocoder: GeocoderConfig,
    /// Dashboard.
    pub dashboard: DashboardConfig,
    /// Toasts.
    pub notifications: NotificationConfig,
}

impl Default for AppConfig {
    /// Returns the embedded defaults.
    ///
    /// # Panics
    ///
    /// Panics if the embedded `default.toml` is malformed, which the tests
    /// in this crate rule out.
    fn default() -> Self {
        toml::from_str(DEFAULT_TOML)
            .unwrap_or_else(|e| panic!("Embedded default config is invalid: {e}"))
    }
}

impl AppConfig {
    /// Loads configuration from the defaults, the file named by
    /// `CRIME_SCOPE_CONFIG` (if set), and the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the override file cannot be read or
    /// parsed, or a resulting value is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from);
        Self::load_with(path.as_deref(), |key| std::env::var(key).ok())
    }

    /// Loads configuration from the defaults, an optional override file,
    /// and environment values supplied by `env`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed, or a
    /// resulting value is invalid.
    pub fn load_with(
        path: Option<&Path>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let overrides = match path {
            Some(path) => {
                log::debug!("Reading config overrides from {}", path.display());
                Some(
                    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                        path: path.to_path_buf(),
                        source,
                    })?,
                )
            }
            None => None,
        };

        let mut config = Self::from_overrides(overrides.as_deref())?;
        config.apply_env(env);
        config.validate()?;
        Ok(config)
    }

    /// Merges an override TOML document onto the embedded defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if either document is malformed or
    /// the merged result does not have the expected shape.
    pub fn from_overrides(overrides: Option<&str>) -> Result<Self, ConfigError> {
        let mut merged: toml::Table = toml::from_str(DEFAULT_TOML)?;
        if let Some(overrides) = overrides {
            let overrides: toml::Table = toml::from_str(overrides)?;
            merge_tables(&mut merged, overrides);
        }
        Ok(toml::Value::Table(merged).try_into()?)
    }

    /// Applies environment overrides. Blank values are ignored.
    pub fn apply_env(&mut self, env: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| env(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(url) = lookup(API_URL_ENV) {
            self.api.base_url = url;
        }
        if let Some(path) = lookup(REPORT_PATH_ENV) {
            self.api.report_path = path;
        }
        if let Some(key) = lookup(API_KEY_ENV) {
            self.api.api_key = Some(key);
        }
        self.api.base_url = self.api.base_url.trim_end_matches('/').to_string();
    }

    /// Checks values that parse but cannot work.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key, message: &str| {
            Err(ConfigError::Invalid {
                key,
                message: message.to_string(),
            })
        };

        if self.api.base_url.is_empty() {
            return invalid("api.base_url", "must not be empty");
        }
        if !self.api.report_path.starts_with('/') {
            return invalid("api.report_path", "must start with '/'");
        }
        if !self.map.fallback_center.is_valid() {
            return invalid("map.fallback_center", "must be a valid WGS84 coordinate");
        }
        if !(self.map.nearby_radius_km > 0.0) {
            return invalid("map.nearby_radius_km", "must be positive");
        }
        if self.map.nearby_limit == 0 {
            return invalid("map.nearby_limit", "must be positive");
        }
        if !(self.map.cluster_radius_px > 0.0) {
            return invalid("map.cluster_radius_px", "must be positive");
        }
        if self.dashboard.refresh_interval_secs == 0 {
            return invalid("dashboard.refresh_interval_secs", "must be positive");
        }
        Ok(())
    }
}

/// Recursively overlays `overrides` onto `base`. Nested tables merge key by
/// key; any other value replaces the base value wholesale.
fn merge_tables(base: &mut toml::Table, overrides: toml::Table) {
    for (key, value) in overrides {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn embedded_defaults_are_valid() {
        let config = AppConfig::default();
        config.validate().unwrap();
        assert_eq!(config.api.report_path, "/api/report");
        assert_eq!(config.api.report_encoding, ReportEncoding::Json);
        assert!(config.api.api_key.is_none());
        assert!((config.map.nearby_radius_km - 5.0).abs() < f64::EPSILON);
        assert_eq!(config.map.nearby_limit, 50);
        assert_eq!(config.map.feed, IncidentFeed::Nearby);
        assert_eq!(config.dashboard.refresh_interval(), Duration::from_secs(300));
    }

    #[test]
    fn overrides_merge_key_by_key() {
        let config = AppConfig::from_overrides(Some(
            r#"
            [api]
            report_path = "/api/report-crime"
            report_encoding = "form"

            [map]
            fallback_center = { latitude = 20.5937, longitude = 78.9629 }
            "#,
        ))
        .unwrap();

        assert_eq!(config.api.report_path, "/api/report-crime");
        assert_eq!(config.api.report_encoding, ReportEncoding::Form);
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.map.fallback_center, GeoPoint::new(20.5937, 78.9629));
        assert_eq!(config.map.nearby_limit, 50);
    }

    #[test]
    fn env_overrides_win() {
        let env: BTreeMap<&str, &str> = [
            (API_URL_ENV, "https://crimes.example.org/"),
            (API_KEY_ENV, "secret"),
            (REPORT_PATH_ENV, "  "),
        ]
        .into_iter()
        .collect();

        let config =
            AppConfig::load_with(None, |key| env.get(key).map(ToString::to_string)).unwrap();
        assert_eq!(config.api.base_url, "https://crimes.example.org");
        assert_eq!(config.api.api_key.as_deref(), Some("secret"));
        assert_eq!(config.api.report_path, "/api/report");
    }

    #[test]
    fn invalid_values_are_reported() {
        let mut config = AppConfig::from_overrides(Some("[map]\nnearby_limit = 0\n")).unwrap();
        config.apply_env(no_env);
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "map.nearby_limit", .. }));
    }

    #[test]
    fn malformed_override_is_a_parse_error() {
        let err = AppConfig::from_overrides(Some("[map]\nnearby_limit = \"many\"\n")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = AppConfig::load_with(Some(Path::new("/nonexistent/crime-scope.toml")), no_env)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(
            err.to_string()
                .starts_with("Failed to read config file /nonexistent/crime-scope.toml: ")
        );
    }

    #[test]
    fn geocoder_rate_limit_defaults_to_one_second() {
        let config = AppConfig::default();
        assert_eq!(config.geocoder.rate_limit(), Duration::from_secs(1));

        let config =
            AppConfig::from_overrides(Some("[geocoder]\nrate_limit_ms = 0\n")).unwrap();
        assert_eq!(config.geocoder.rate_limit(), Duration::ZERO);
    }
}
