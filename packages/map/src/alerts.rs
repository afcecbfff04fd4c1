//! The nearby-alerts list shown beside the map.

use crime_scope_crime_models::{GeoPoint, IncidentId, IncidentReport};

/// Shown instead of the list when no incident is nearby.
pub const NO_ALERTS_MESSAGE: &str =
    "No alerts found in your area. Be the first to report an incident!";
/// Body text of an alert without a description.
pub const NO_DESCRIPTION: &str = "No description provided.";
/// Reporter name of an alert without one.
pub const ANONYMOUS: &str = "Anonymous";

/// One card of the alerts list.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertEntry {
    pub id: IncidentId,
    pub title: String,
    pub severity: String,
    pub time: Option<String>,
    pub description: String,
    pub reporter: String,
    pub distance: String,
    pub location: GeoPoint,
}

impl From<&IncidentReport> for AlertEntry {
    fn from(report: &IncidentReport) -> Self {
        Self {
            id: report.id.clone(),
            title: report.title().to_string(),
            severity: report.severity.label().to_string(),
            time: report.formatted_time(),
            description: report
                .description
                .as_deref()
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .unwrap_or(NO_DESCRIPTION)
                .to_string(),
            reporter: report
                .reported_by
                .as_deref()
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .unwrap_or(ANONYMOUS)
                .to_string(),
            distance: format_distance(report.distance_km),
            location: report.location,
        }
    }
}

/// `350m away` below one kilometre, `1.2km away` from there on.
#[must_use]
pub fn format_distance(distance_km: Option<f64>) -> String {
    match distance_km {
        None => "Unknown distance".to_string(),
        Some(km) if km < 1.0 => format!("{}m away", (km * 1000.0).round()),
        Some(km) => format!("{km:.1}km away"),
    }
}

/// Alerts newest first. Reports without a creation time go last, in
/// their original order.
#[must_use]
pub fn alert_list(reports: &[IncidentReport]) -> Vec<AlertEntry> {
    let mut sorted: Vec<&IncidentReport> = reports.iter().collect();
    sorted.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    sorted.into_iter().map(AlertEntry::from).collect()
}
