//! Incident records and the report-submission input they are built from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{GeoPoint, IncidentId, IncidentStatus, IncidentType, InvalidSeverityError, Severity};

/// One reported incident, as held in memory by the map controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentReport {
    /// Unique identifier, backend-assigned or temporary.
    pub id: IncidentId,
    /// Incident type.
    #[serde(rename = "type")]
    pub incident_type: IncidentType,
    /// Optional free text.
    pub description: Option<String>,
    /// Severity level.
    pub severity: Severity,
    /// Where the incident happened.
    pub location: GeoPoint,
    /// Human-readable address, when known.
    pub address: Option<String>,
    /// Display name of the reporter.
    pub reported_by: Option<String>,
    /// Distance from the search centre in kilometres, set by nearby queries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
    /// When the report was created.
    pub created_at: Option<DateTime<Utc>>,
    /// Lifecycle status.
    pub status: IncidentStatus,
}

impl IncidentReport {
    /// Title used for marker tooltips and popup headings.
    #[must_use]
    pub const fn title(&self) -> &'static str {
        self.incident_type.display_name()
    }

    /// Creation time formatted for popups, e.g. `Oct 17, 2026, 09:30 AM`.
    #[must_use]
    pub fn formatted_time(&self) -> Option<String> {
        self.created_at
            .map(|at| at.format("%b %-d, %Y, %I:%M %p").to_string())
    }
}

/// A report ready to be posted to the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct NewReport {
    /// Incident type.
    pub incident_type: IncidentType,
    /// Free text; empty input becomes `None`.
    pub description: Option<String>,
    /// Severity level.
    pub severity: Severity,
    /// Validated coordinates.
    pub location: GeoPoint,
    /// Address text from the form, when present.
    pub address: Option<String>,
    /// Submission time.
    pub timestamp: DateTime<Utc>,
    /// Always [`IncidentStatus::Reported`].
    pub status: IncidentStatus,
}

/// Reasons a report is rejected before any network call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Latitude or longitude missing, unparseable or zero.
    #[error("Please select a location on the map")]
    MissingLocation,

    /// Coordinates parsed but fall outside WGS84 bounds.
    #[error("Invalid coordinates ({latitude}, {longitude})")]
    InvalidCoordinates {
        /// Rejected latitude.
        latitude: f64,
        /// Rejected longitude.
        longitude: f64,
    },

    /// Severity could not be parsed as a number.
    #[error("Invalid severity '{raw}'")]
    UnparseableSeverity {
        /// Raw form input.
        raw: String,
    },

    /// Severity outside 1-5.
    #[error(transparent)]
    Severity(#[from] InvalidSeverityError),
}

/// Raw values read from the report form. Every field is the unparsed text
/// of its input element; empty inputs are `None` or blank.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportFormValues {
    /// Selected incident type name.
    pub incident_type: Option<String>,
    /// Description textarea.
    pub description: Option<String>,
    /// Severity slider value.
    pub severity: Option<String>,
    /// Address text filled in by reverse geocoding.
    pub address: Option<String>,
    /// Hidden latitude input.
    pub latitude: Option<String>,
    /// Hidden longitude input.
    pub longitude: Option<String>,
}

impl ReportFormValues {
    /// Convenience constructor for a form with a type, severity and
    /// coordinates filled in.
    #[must_use]
    pub fn with_location(
        incident_type: IncidentType,
        severity: u8,
        latitude: f64,
        longitude: f64,
    ) -> Self {
        Self {
            incident_type: Some(incident_type.to_string()),
            severity: Some(severity.to_string()),
            latitude: Some(latitude.to_string()),
            longitude: Some(longitude.to_string()),
            ..Self::default()
        }
    }

    /// Validates the raw values into a [`NewReport`] stamped with `now`.
    ///
    /// Missing type defaults to `other`, missing severity to 3.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if either coordinate is missing or zero,
    /// the coordinates are out of range, or the severity is not 1-5.
    pub fn validate(&self, now: DateTime<Utc>) -> Result<NewReport, ValidationError> {
        let latitude = parse_coordinate(self.latitude.as_deref())?;
        let longitude = parse_coordinate(self.longitude.as_deref())?;
        let location = GeoPoint::new(latitude, longitude);
        if !location.is_valid() {
            return Err(ValidationError::InvalidCoordinates {
                latitude,
                longitude,
            });
        }

        let severity = match non_blank(self.severity.as_deref()) {
            None => Severity::default(),
            Some(raw) => {
                let value: u8 =
                    raw.parse()
                        .map_err(|_| ValidationError::UnparseableSeverity {
                            raw: raw.to_string(),
                        })?;
                Severity::from_value(value)?
            }
        };

        let incident_type = non_blank(self.incident_type.as_deref())
            .map_or(IncidentType::Other, IncidentType::from_name);

        Ok(NewReport {
            incident_type,
            description: non_blank(self.description.as_deref()).map(String::from),
            severity,
            location,
            address: non_blank(self.address.as_deref()).map(String::from),
            timestamp: now,
            status: IncidentStatus::Reported,
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_coordinate(raw: Option<&str>) -> Result<f64, ValidationError> {
    let value = non_blank(raw)
        .and_then(|v| v.parse::<f64>().ok())
        .ok_or(ValidationError::MissingLocation)?;
    // An untouched hidden input reads as 0, which is never a real pick.
    if value == 0.0 {
        return Err(ValidationError::MissingLocation);
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-10-17T09:30:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn validates_complete_form() {
        let form = ReportFormValues {
            description: Some("  bike stolen ".to_string()),
            address: Some("Main St".to_string()),
            ..ReportFormValues::with_location(IncidentType::Theft, 3, 12.34, 56.78)
        };
        let report = form.validate(now()).unwrap();
        assert_eq!(report.incident_type, IncidentType::Theft);
        assert_eq!(report.severity, Severity::High);
        assert_eq!(report.location, GeoPoint::new(12.34, 56.78));
        assert_eq!(report.description.as_deref(), Some("bike stolen"));
        assert_eq!(report.address.as_deref(), Some("Main St"));
        assert_eq!(report.status, IncidentStatus::Reported);
        assert_eq!(report.timestamp, now());
    }

    #[test]
    fn missing_coordinates_are_rejected() {
        let mut form = ReportFormValues::with_location(IncidentType::Theft, 3, 12.34, 56.78);
        form.latitude = None;
        assert_eq!(
            form.validate(now()).unwrap_err(),
            ValidationError::MissingLocation
        );

        let mut form = ReportFormValues::with_location(IncidentType::Theft, 3, 12.34, 56.78);
        form.longitude = Some("   ".to_string());
        assert_eq!(
            form.validate(now()).unwrap_err(),
            ValidationError::MissingLocation
        );
    }

    #[test]
    fn zero_coordinate_counts_as_missing() {
        let form = ReportFormValues::with_location(IncidentType::Fraud, 2, 0.0, 56.78);
        assert_eq!(
            form.validate(now()).unwrap_err(),
            ValidationError::MissingLocation
        );
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let form = ReportFormValues::with_location(IncidentType::Fraud, 2, 95.0, 56.78);
        assert!(matches!(
            form.validate(now()),
            Err(ValidationError::InvalidCoordinates { .. })
        ));

        let form = ReportFormValues::with_location(IncidentType::Fraud, 6, 12.0, 56.78);
        assert_eq!(
            form.validate(now()).unwrap_err(),
            ValidationError::Severity(InvalidSeverityError { value: 6 })
        );
    }

    #[test]
    fn defaults_fill_missing_type_and_severity() {
        let form = ReportFormValues {
            latitude: Some("10.5".to_string()),
            longitude: Some("-3.25".to_string()),
            ..ReportFormValues::default()
        };
        let report = form.validate(now()).unwrap();
        assert_eq!(report.incident_type, IncidentType::Other);
        assert_eq!(report.severity, Severity::High);
        assert!(report.description.is_none());
    }

    #[test]
    fn formats_creation_time() {
        let report = IncidentReport {
            id: IncidentId::from(1),
            incident_type: IncidentType::Assault,
            description: None,
            severity: Severity::VeryHigh,
            location: GeoPoint::new(1.0, 2.0),
            address: None,
            reported_by: None,
            distance_km: None,
            created_at: Some(now()),
            status: IncidentStatus::Reported,
        };
        assert_eq!(report.formatted_time().as_deref(), Some("Oct 17, 2026, 09:30 AM"));
        assert_eq!(report.title(), "Assault");
    }
}
