#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Incident taxonomy, severity levels and report types.
//!
//! This crate defines the canonical incident types used across the whole
//! crime scope workspace. The API client decodes backend records into
//! these types, the map and dashboard controllers render them, and the
//! report flow builds a [`NewReport`] from raw form input.

pub mod report;

use std::fmt;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

pub use report::{IncidentReport, NewReport, ReportFormValues, ValidationError};

/// Severity level for an incident, from 1 (low) to 5 (critical).
///
/// Serialized as its bare numeric value, which is what the backend stores.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    AsRefStr,
)]
#[serde(try_from = "u8", into = "u8")]
pub enum Severity {
    /// Level 1: minor incidents
    Low = 1,
    /// Level 2
    Moderate = 2,
    /// Level 3: the default for reports that do not carry a severity
    #[default]
    High = 3,
    /// Level 4
    #[strum(serialize = "Very High")]
    VeryHigh = 4,
    /// Level 5: most severe incidents
    Critical = 5,
}

impl Severity {
    /// Returns the numeric value of this severity level.
    #[must_use]
    pub const fn value(self) -> u8 {
        self as u8
    }

    /// Creates a severity level from a numeric value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not in the range 1-5.
    pub const fn from_value(value: u8) -> Result<Self, InvalidSeverityError> {
        match value {
            1 => Ok(Self::Low),
            2 => Ok(Self::Moderate),
            3 => Ok(Self::High),
            4 => Ok(Self::VeryHigh),
            5 => Ok(Self::Critical),
            _ => Err(InvalidSeverityError { value }),
        }
    }

    /// Human-readable label shown on badges and chart axes.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Moderate => "Moderate",
            Self::High => "High",
            Self::VeryHigh => "Very High",
            Self::Critical => "Critical",
        }
    }

    /// Marker and badge color for this level.
    #[must_use]
    pub const fn color(self) -> &'static str {
        match self {
            Self::Low => "#28a745",
            Self::Moderate => "#17a2b8",
            Self::High => "#ffc107",
            Self::VeryHigh => "#fd7e14",
            Self::Critical => "#dc3545",
        }
    }

    /// CSS class applied to severity badges in marker popups.
    #[must_use]
    pub const fn badge_class(self) -> &'static str {
        match self {
            Self::Low => "severity-low",
            Self::Moderate => "severity-moderate",
            Self::High => "severity-high",
            Self::VeryHigh => "severity-very-high",
            Self::Critical => "severity-critical",
        }
    }

    /// Severity used to tint a marker cluster with `count` members.
    ///
    /// Starts at [`Self::Moderate`] and climbs one level per five members,
    /// capped at [`Self::Critical`].
    #[must_use]
    pub const fn for_cluster_size(count: usize) -> Self {
        match count / 5 {
            0 => Self::Moderate,
            1 => Self::High,
            2 => Self::VeryHigh,
            _ => Self::Critical,
        }
    }

    /// Returns all variants in ascending order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Low,
            Self::Moderate,
            Self::High,
            Self::VeryHigh,
            Self::Critical,
        ]
    }
}

impl TryFrom<u8> for Severity {
    type Error = InvalidSeverityError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

impl From<Severity> for u8 {
    fn from(severity: Severity) -> Self {
        severity.value()
    }
}

/// Error returned when attempting to create a [`Severity`] from an invalid
/// numeric value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidSeverityError {
    /// The invalid severity value that was provided.
    pub value: u8,
}

impl fmt::Display for InvalidSeverityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid severity value {}: expected 1-5", self.value)
    }
}

impl std::error::Error for InvalidSeverityError {}

/// Incident type reported by users.
///
/// The set is open on the wire: any string that is not one of the known
/// types decodes as [`IncidentType::Other`].
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase", from = "String")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum IncidentType {
    /// Theft of property
    Theft,
    /// Physical assault
    Assault,
    /// Breaking and entering
    Burglary,
    /// Fraud and scams
    Fraud,
    /// Property damage
    Vandalism,
    /// Anything else
    #[default]
    Other,
}

impl IncidentType {
    /// Parses a type name, mapping unknown names to [`Self::Other`].
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        name.trim().parse().unwrap_or(Self::Other)
    }

    /// Capitalized name used in popups and chart legends.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Theft => "Theft",
            Self::Assault => "Assault",
            Self::Burglary => "Burglary",
            Self::Fraud => "Fraud",
            Self::Vandalism => "Vandalism",
            Self::Other => "Other",
        }
    }

    /// Chart color for this type.
    #[must_use]
    pub const fn color(self) -> &'static str {
        match self {
            Self::Theft => "#dc3545",
            Self::Assault => "#ffc107",
            Self::Burglary => "#17a2b8",
            Self::Fraud => "#6f42c1",
            Self::Vandalism => "#28a745",
            Self::Other => "#6c757d",
        }
    }

    /// Font Awesome icon name for this type.
    #[must_use]
    pub const fn icon(self) -> &'static str {
        match self {
            Self::Theft => "fa-bag-shopping",
            Self::Assault => "fa-user-injured",
            Self::Burglary => "fa-house-crack",
            Self::Fraud => "fa-credit-card",
            Self::Vandalism => "fa-spray-can-sparkles",
            Self::Other => "fa-circle-question",
        }
    }

    /// Returns all variants in the order used by the type chart.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Theft,
            Self::Burglary,
            Self::Assault,
            Self::Vandalism,
            Self::Fraud,
            Self::Other,
        ]
    }
}

impl From<String> for IncidentType {
    fn from(name: String) -> Self {
        Self::from_name(&name)
    }
}

/// Lifecycle status of a report. This client only ever produces
/// [`IncidentStatus::Reported`].
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum IncidentStatus {
    /// Submitted by a user, not yet reviewed
    #[default]
    Reported,
    /// Confirmed by the backend or an operator
    Confirmed,
    /// Closed
    Resolved,
}

/// Prefix marking identifiers minted on the client for unsaved records.
pub const TEMPORARY_ID_PREFIX: &str = "temp-";

/// Opaque incident identifier. Used as the key of the marker set.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IncidentId(String);

impl IncidentId {
    /// Wraps a backend-assigned identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Mints a unique client-side placeholder identifier.
    #[must_use]
    pub fn temporary() -> Self {
        Self(format!("{TEMPORARY_ID_PREFIX}{}", uuid::Uuid::new_v4()))
    }

    /// Whether this identifier was minted on the client.
    #[must_use]
    pub fn is_temporary(&self) -> bool {
        self.0.starts_with(TEMPORARY_ID_PREFIX)
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IncidentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for IncidentId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<i64> for IncidentId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

/// A WGS84 coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

impl GeoPoint {
    /// Creates a point from latitude and longitude.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Whether both coordinates are finite and inside the WGS84 range.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Returns a copy shifted by the given deltas in degrees.
    #[must_use]
    pub fn offset(self, d_lat: f64, d_lng: f64) -> Self {
        Self::new(self.latitude + d_lat, self.longitude + d_lng)
    }

    /// Label used in place of an address when reverse geocoding fails,
    /// e.g. `Location (12.3400, 56.7800)`.
    #[must_use]
    pub fn coordinate_label(&self) -> String {
        format!("Location ({:.4}, {:.4})", self.latitude, self.longitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_from_value_roundtrip() {
        for v in 1..=5u8 {
            let severity = Severity::from_value(v).unwrap();
            assert_eq!(severity.value(), v);
        }
        assert!(Severity::from_value(0).is_err());
        assert!(Severity::from_value(6).is_err());
    }

    #[test]
    fn moderate_severity_is_distinct_from_extremes() {
        let mid = Severity::High;
        assert_eq!(mid.value(), 3);
        assert_eq!(mid.label(), "High");
        assert_eq!(mid.color(), "#ffc107");
        for other in [Severity::Low, Severity::Critical] {
            assert_ne!(mid.color(), other.color());
            assert_ne!(mid.label(), other.label());
        }
    }

    #[test]
    fn severity_colors_are_unique() {
        let mut colors: Vec<&str> = Severity::all().iter().map(|s| s.color()).collect();
        colors.sort_unstable();
        colors.dedup();
        assert_eq!(colors.len(), 5);
    }

    #[test]
    fn severity_serializes_as_number() {
        let json = serde_json::to_string(&Severity::VeryHigh).unwrap();
        assert_eq!(json, "4");
        let parsed: Severity = serde_json::from_str("2").unwrap();
        assert_eq!(parsed, Severity::Moderate);
        assert!(serde_json::from_str::<Severity>("9").is_err());
    }

    #[test]
    fn cluster_severity_scales_with_size() {
        assert_eq!(Severity::for_cluster_size(1), Severity::Moderate);
        assert_eq!(Severity::for_cluster_size(5), Severity::High);
        assert_eq!(Severity::for_cluster_size(12), Severity::VeryHigh);
        assert_eq!(Severity::for_cluster_size(500), Severity::Critical);
    }

    #[test]
    fn unknown_incident_type_maps_to_other() {
        assert_eq!(IncidentType::from_name("THEFT"), IncidentType::Theft);
        assert_eq!(IncidentType::from_name(" fraud "), IncidentType::Fraud);
        assert_eq!(IncidentType::from_name("arson"), IncidentType::Other);

        let parsed: IncidentType = serde_json::from_str("\"Burglary\"").unwrap();
        assert_eq!(parsed, IncidentType::Burglary);
        let parsed: IncidentType = serde_json::from_str("\"kidnapping\"").unwrap();
        assert_eq!(parsed, IncidentType::Other);
        assert_eq!(
            serde_json::to_string(&IncidentType::Vandalism).unwrap(),
            "\"vandalism\""
        );
    }

    #[test]
    fn temporary_ids_are_marked_and_unique() {
        let a = IncidentId::temporary();
        let b = IncidentId::temporary();
        assert!(a.is_temporary());
        assert_ne!(a, b);
        assert!(!IncidentId::from(42).is_temporary());
    }

    #[test]
    fn coordinate_label_uses_four_decimals() {
        let point = GeoPoint::new(12.34, 56.789_123);
        assert_eq!(point.coordinate_label(), "Location (12.3400, 56.7891)");
    }

    #[test]
    fn point_validity() {
        assert!(GeoPoint::new(37.7749, -122.4194).is_valid());
        assert!(!GeoPoint::new(91.0, 0.0).is_valid());
        assert!(!GeoPoint::new(f64::NAN, 0.0).is_valid());
    }
}
