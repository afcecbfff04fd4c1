#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Reverse geocoding for report placement.
//!
//! When the user drops a report marker the map asks a [`ReverseGeocoder`]
//! for a human-readable address. Lookups are best-effort: callers fall
//! back to a coordinate label when a lookup fails or finds nothing.
//!
//! [`nominatim::NominatimReverse`] is the only provider. The public
//! instance allows roughly one request per second and requires a
//! `User-Agent`; the client spaces lookups by `geocoder.rate_limit_ms`
//! (1000 by default).

pub mod nominatim;

use async_trait::async_trait;
use crime_scope_crime_models::GeoPoint;
use thiserror::Error;

/// Errors that can occur during reverse geocoding.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },

    /// The provider answered with a non-success status.
    #[error("Geocoder returned HTTP {status}")]
    Status {
        /// Status code.
        status: u16,
    },

    /// Rate limited by the provider.
    #[error("Rate limited by geocoding provider")]
    RateLimited,
}

/// Turns coordinates into an address.
#[async_trait(?Send)]
pub trait ReverseGeocoder {
    /// Looks up the address nearest to `point`.
    ///
    /// Returns `Ok(None)` when the provider knows nothing about the spot
    /// (open ocean, for instance).
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if the request or response parsing fails.
    async fn reverse(&self, point: GeoPoint) -> Result<Option<String>, GeocodeError>;
}

/// Address for `point`, or its coordinate label when the lookup fails or
/// comes back empty. Never fails.
pub async fn address_or_label(geocoder: &dyn ReverseGeocoder, point: GeoPoint) -> String {
    match geocoder.reverse(point).await {
        Ok(Some(address)) => address,
        Ok(None) => {
            log::debug!(
                "No address for ({:.4}, {:.4})",
                point.latitude,
                point.longitude
            );
            point.coordinate_label()
        }
        Err(e) => {
            log::warn!("Reverse geocoding failed: {e}");
            point.coordinate_label()
        }
    }
}
