#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Request and response types for the crime scope backend API.
//!
//! The backend has grown several response shapes over time, so the
//! incident types here decode leniently: records arrive as raw JSON
//! values and are converted one at a time into
//! [`IncidentReport`]s, skipping (and logging) any record that is missing
//! coordinates or carries an impossible severity.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use crime_scope_crime_models::{
    GeoPoint, IncidentId, IncidentReport, IncidentStatus, IncidentType, InvalidSeverityError,
    NewReport, Severity,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Address sent when the form carried no geocoded address.
pub const DEFAULT_LOCATION_LABEL: &str = "Selected location";

/// Query parameters for `GET /api/alerts/nearby`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NearbyQuery {
    /// Centre latitude.
    pub lat: f64,
    /// Centre longitude.
    pub lng: f64,
    /// Search radius in kilometres.
    pub radius: f64,
    /// Maximum number of records.
    pub limit: u32,
}

/// Response of `GET /api/alerts/nearby`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NearbyResponse {
    /// Raw incident records.
    #[serde(default)]
    pub data: Vec<Value>,
}

/// Response of `GET /api/crimes`, which has been served in three shapes.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CrimesResponse {
    /// A bare array of records.
    List(Vec<Value>),
    /// `{ "data": [...] }`
    Data {
        /// Raw incident records.
        data: Vec<Value>,
    },
    /// `{ "crimes": [...] }`
    Crimes {
        /// Raw incident records.
        crimes: Vec<Value>,
    },
}

impl CrimesResponse {
    /// Returns the raw records regardless of the envelope shape.
    #[must_use]
    pub fn into_records(self) -> Vec<Value> {
        match self {
            Self::List(records)
            | Self::Data { data: records }
            | Self::Crimes { crimes: records } => records,
        }
    }
}

/// An incident record exactly as the backend sends it.
///
/// Every field is optional; [`IncidentReport::try_from`] decides whether
/// the record is usable.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiIncident {
    /// String or numeric identifier.
    pub id: Option<Value>,
    /// Incident type name.
    #[serde(rename = "type")]
    pub incident_type: Option<String>,
    /// Legacy duplicate of `type` written by older clients.
    #[serde(rename = "crimeType")]
    pub crime_type: Option<String>,
    /// Free text.
    pub description: Option<String>,
    /// Number, numeric string, or a word such as `"high"`.
    pub severity: Option<Value>,
    /// Top-level latitude.
    pub latitude: Option<Value>,
    /// Top-level longitude.
    pub longitude: Option<Value>,
    /// Either an address string or a `{latitude, longitude}` object.
    pub location: Option<Value>,
    /// Explicit address field.
    pub address: Option<String>,
    /// Reporter display name.
    #[serde(rename = "reportedBy", alias = "reported_by")]
    pub reported_by: Option<String>,
    /// Kilometres from the query centre, sent by the nearby endpoint.
    pub distance: Option<Value>,
    /// Creation time under its oldest name.
    pub timestamp: Option<Value>,
    /// Creation time, snake case.
    pub created_at: Option<Value>,
    /// Creation time, camel case.
    #[serde(rename = "createdAt")]
    pub created_at_camel: Option<Value>,
    /// Lifecycle status.
    pub status: Option<String>,
}

/// Why a single backend record could not become an [`IncidentReport`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    /// Latitude or longitude missing, zero, or out of range.
    #[error("record has no usable coordinates")]
    MissingCoordinates,

    /// Severity present but not 1-5.
    #[error(transparent)]
    Severity(#[from] InvalidSeverityError),
}

impl TryFrom<ApiIncident> for IncidentReport {
    type Error = RecordError;

    fn try_from(raw: ApiIncident) -> Result<Self, Self::Error> {
        let nested = raw.location.as_ref().and_then(Value::as_object);
        let nested_number = |long: &str, short: &str| {
            nested
                .and_then(|o| o.get(long).or_else(|| o.get(short)))
                .and_then(as_number)
        };
        let latitude = raw
            .latitude
            .as_ref()
            .and_then(as_number)
            .or_else(|| nested_number("latitude", "lat"));
        let longitude = raw
            .longitude
            .as_ref()
            .and_then(as_number)
            .or_else(|| nested_number("longitude", "lng"));

        let (Some(latitude), Some(longitude)) = (latitude, longitude) else {
            return Err(RecordError::MissingCoordinates);
        };
        let location = GeoPoint::new(latitude, longitude);
        if latitude == 0.0 || longitude == 0.0 || !location.is_valid() {
            return Err(RecordError::MissingCoordinates);
        }

        let severity = match raw.severity.as_ref() {
            None | Some(Value::Null) => Severity::default(),
            Some(value) => parse_severity(value)?,
        };

        let address = raw.address.or_else(|| {
            raw.location
                .as_ref()
                .and_then(Value::as_str)
                .map(String::from)
        });

        let created_at = [&raw.timestamp, &raw.created_at, &raw.created_at_camel]
            .into_iter()
            .flatten()
            .find_map(parse_timestamp);

        Ok(Self {
            id: raw
                .id
                .as_ref()
                .and_then(parse_id)
                .unwrap_or_else(IncidentId::temporary),
            incident_type: raw
                .incident_type
                .or(raw.crime_type)
                .as_deref()
                .map_or(IncidentType::Other, IncidentType::from_name),
            description: raw.description.filter(|d| !d.trim().is_empty()),
            severity,
            location,
            address,
            reported_by: raw.reported_by,
            distance_km: raw
                .distance
                .as_ref()
                .and_then(as_number)
                .filter(|d| d.is_finite() && *d >= 0.0),
            created_at,
            status: raw
                .status
                .and_then(|s| s.to_ascii_lowercase().parse().ok())
                .unwrap_or(IncidentStatus::Reported),
        })
    }
}

/// Converts raw backend records into incident reports, skipping records
/// that cannot be decoded.
#[must_use]
pub fn decode_incidents(records: Vec<Value>) -> Vec<IncidentReport> {
    let total = records.len();
    let reports: Vec<IncidentReport> = records
        .into_iter()
        .filter_map(|record| {
            let raw: ApiIncident = match serde_json::from_value(record) {
                Ok(raw) => raw,
                Err(e) => {
                    log::warn!("Skipping malformed incident record: {e}");
                    return None;
                }
            };
            let id = raw.id.clone();
            match IncidentReport::try_from(raw) {
                Ok(report) => Some(report),
                Err(e) => {
                    log::warn!("Skipping incident {id:?}: {e}");
                    None
                }
            }
        })
        .collect();

    if reports.len() < total {
        log::debug!("Decoded {}/{total} incident records", reports.len());
    }
    reports
}

fn parse_id(value: &Value) -> Option<IncidentId> {
    match value {
        Value::String(s) if !s.is_empty() => Some(IncidentId::new(s.as_str())),
        Value::Number(n) => Some(IncidentId::new(n.to_string())),
        _ => None,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Parses a wire severity: a number, a numeric string, or a level word.
///
/// Unrecognised words fall back to the default level.
///
/// # Errors
///
/// Returns [`InvalidSeverityError`] for numbers outside 1-5.
pub fn parse_severity(value: &Value) -> Result<Severity, InvalidSeverityError> {
    if let Some(number) = as_number(value) {
        let rounded = number.round();
        if !(0.0..=f64::from(u8::MAX)).contains(&rounded) {
            return Err(InvalidSeverityError { value: u8::MAX });
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let value = rounded as u8;
        return Severity::from_value(value);
    }

    let word = value.as_str().map(|s| s.trim().to_ascii_lowercase());
    Ok(match word.as_deref() {
        Some("low") => Severity::Low,
        Some("moderate" | "medium") => Severity::Moderate,
        Some("very high" | "very_high") => Severity::VeryHigh,
        Some("critical") => Severity::Critical,
        _ => Severity::High,
    })
}

/// Parses the timestamp formats the backend has emitted: RFC 3339,
/// RFC 2822 (`Sat, 17 Oct 2026 09:30:00 GMT`), naive ISO-8601 taken as
/// UTC, epoch milliseconds, and `{seconds}`/`{_seconds}` objects.
#[must_use]
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_timestamp_str(s),
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        Value::Object(o) => o
            .get("seconds")
            .or_else(|| o.get("_seconds"))
            .and_then(Value::as_i64)
            .and_then(|secs| DateTime::from_timestamp(secs, 0)),
        _ => None,
    }
}

/// String form of [`parse_timestamp`].
#[must_use]
pub fn parse_timestamp_str(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    DateTime::parse_from_rfc3339(s)
        .or_else(|_| DateTime::parse_from_rfc2822(s))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|naive| naive.and_utc())
        })
}

/// Body of a report submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportPayload {
    /// Incident type name.
    #[serde(rename = "type")]
    pub incident_type: IncidentType,
    /// Free text, empty when not given.
    pub description: String,
    /// Severity 1-5.
    pub severity: u8,
    /// Latitude.
    pub latitude: f64,
    /// Longitude.
    pub longitude: f64,
    /// Address text.
    pub location: String,
    /// Submission time (RFC 3339).
    pub timestamp: DateTime<Utc>,
    /// Always `reported`.
    pub status: IncidentStatus,
}

impl From<&NewReport> for ReportPayload {
    fn from(report: &NewReport) -> Self {
        Self {
            incident_type: report.incident_type,
            description: report.description.clone().unwrap_or_default(),
            severity: report.severity.value(),
            latitude: report.location.latitude,
            longitude: report.location.longitude,
            location: report
                .address
                .clone()
                .unwrap_or_else(|| DEFAULT_LOCATION_LABEL.to_string()),
            timestamp: report.timestamp,
            status: report.status,
        }
    }
}

/// Acknowledgment returned by a successful report submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ReportAck {
    /// Backend status word, usually `success`.
    #[serde(default)]
    pub status: Option<String>,
    /// Human-readable confirmation.
    #[serde(default)]
    pub message: Option<String>,
    /// Identifier of the created record.
    #[serde(default, alias = "crime_id", deserialize_with = "deserialize_id")]
    pub id: Option<IncidentId>,
}

fn deserialize_id<'de, D>(deserializer: D) -> Result<Option<IncidentId>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(parse_id))
}

/// Error body returned with non-success statuses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorBody {
    /// Preferred human-readable message.
    #[serde(default)]
    pub message: Option<String>,
    /// Alternate field some handlers use.
    #[serde(default)]
    pub error: Option<String>,
}

impl ApiErrorBody {
    /// Extracts the server message from a raw response body, if any.
    #[must_use]
    pub fn message_from(body: &str) -> Option<String> {
        let parsed: Self = serde_json::from_str(body).ok()?;
        parsed
            .message
            .or(parsed.error)
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
    }
}

/// Count of incidents for one type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeCount {
    /// Incident type.
    #[serde(rename = "type")]
    pub incident_type: IncidentType,
    /// Number of incidents.
    pub count: u64,
}

/// Count of incidents for one severity level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCount {
    /// Raw severity value; anything outside 1-5 is ignored when rendering.
    pub severity: u8,
    /// Number of incidents.
    pub count: u64,
}

/// Response of `GET /api/crime-stats`.
///
/// `totalCrimes` is required so that an error body or an unrelated object
/// fails to decode instead of reading as all-zero statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrimeStats {
    /// Total number of incidents.
    #[serde(alias = "total_crimes", alias = "total")]
    pub total_crimes: u64,
    /// Incidents reported today.
    #[serde(default, alias = "today_crimes", alias = "today")]
    pub today_crimes: u64,
    /// Type distribution, sent either as a list or as `{"theft": 7}`.
    #[serde(default, alias = "by_type", deserialize_with = "deserialize_type_counts")]
    pub by_type: Vec<TypeCount>,
    /// Severity distribution, sent either as a list or as `{"3": 10}`.
    #[serde(
        default,
        alias = "by_severity",
        deserialize_with = "deserialize_severity_counts"
    )]
    pub by_severity: Vec<SeverityCount>,
    /// When the backend computed these numbers.
    #[serde(default, alias = "last_updated")]
    pub last_updated: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Counts<T> {
    List(Vec<T>),
    Map(BTreeMap<String, u64>),
}

fn deserialize_type_counts<'de, D>(deserializer: D) -> Result<Vec<TypeCount>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Option::<Counts<TypeCount>>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(Counts::List(counts)) => counts,
        Some(Counts::Map(counts)) => counts
            .into_iter()
            .map(|(name, count)| TypeCount {
                incident_type: IncidentType::from_name(&name),
                count,
            })
            .collect(),
    })
}

fn deserialize_severity_counts<'de, D>(deserializer: D) -> Result<Vec<SeverityCount>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Option::<Counts<SeverityCount>>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(Counts::List(counts)) => counts,
        Some(Counts::Map(counts)) => counts
            .into_iter()
            .filter_map(|(key, count)| {
                let severity = key.trim().parse().ok();
                if severity.is_none() {
                    log::debug!("Ignoring severity bucket {key:?}");
                }
                severity.map(|severity| SeverityCount { severity, count })
            })
            .collect(),
    })
}

/// `GET /api/crime-stats` body, bare or wrapped in `{ "data": ... }`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StatsEnvelope {
    /// `{ "data": {...} }`
    Wrapped {
        /// The statistics.
        data: CrimeStats,
    },
    /// The statistics object itself.
    Bare(CrimeStats),
}

impl From<StatsEnvelope> for CrimeStats {
    fn from(envelope: StatsEnvelope) -> Self {
        match envelope {
            StatsEnvelope::Wrapped { data } | StatsEnvelope::Bare(data) => data,
        }
    }
}
