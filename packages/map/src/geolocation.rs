//! The user's position.

use async_trait::async_trait;
use crime_scope_crime_models::GeoPoint;
use thiserror::Error;

/// A position fix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    /// Where the user is.
    pub location: GeoPoint,
    /// Accuracy radius in metres.
    pub accuracy_m: f64,
}

/// Why a position could not be obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GeolocationError {
    /// The user refused to share their location.
    #[error("permission denied (code 1)")]
    PermissionDenied,
    /// No fix could be obtained.
    #[error("position unavailable (code 2)")]
    PositionUnavailable,
    /// The provider gave up waiting for a fix.
    #[error("timed out (code 3)")]
    Timeout,
    /// No provider exists on this platform.
    #[error("geolocation is not supported")]
    Unsupported,
}

impl GeolocationError {
    /// Numeric code as reported by browser geolocation; 0 when unsupported.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::PermissionDenied => 1,
            Self::PositionUnavailable => 2,
            Self::Timeout => 3,
            Self::Unsupported => 0,
        }
    }
}

/// Source of the user's position.
#[async_trait(?Send)]
pub trait GeolocationProvider {
    /// One position fix.
    ///
    /// # Errors
    ///
    /// Returns [`GeolocationError`] if no fix can be obtained.
    async fn current_position(&self) -> Result<Position, GeolocationError>;
}

/// Provider that always reports the same position.
#[derive(Debug, Clone, Copy)]
pub struct FixedPosition(pub Position);

#[async_trait(?Send)]
impl GeolocationProvider for FixedPosition {
    async fn current_position(&self) -> Result<Position, GeolocationError> {
        Ok(self.0)
    }
}
