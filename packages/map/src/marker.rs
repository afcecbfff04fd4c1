//! Marker, popup and heat-layer content for incident reports.

use chrono::{DateTime, Utc};
use crime_scope_crime_models::{
    GeoPoint, IncidentId, IncidentReport, IncidentStatus, IncidentType, Severity,
};
use crime_scope_widgets::map::{HeatPoint, MarkerView, PopupContent};

/// Popup body for `report`.
#[must_use]
pub fn popup_content(report: &IncidentReport) -> PopupContent {
    PopupContent {
        title: report.title().to_string(),
        description: report
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(String::from),
        severity_badge: format!(
            "Severity: {} ({})",
            report.severity.value(),
            report.severity.label()
        ),
        badge_class: report.severity.badge_class(),
        time: report.formatted_time(),
    }
}

/// Marker for `report`, tinted by severity.
#[must_use]
pub fn marker_view(report: &IncidentReport) -> MarkerView {
    MarkerView {
        id: report.id.clone(),
        location: report.location,
        color: report.severity.color(),
        title: report.title().to_string(),
        popup: popup_content(report),
    }
}

/// Heat-layer samples weighted by `severity / 5`.
#[must_use]
pub fn heat_points<'a>(reports: impl IntoIterator<Item = &'a IncidentReport>) -> Vec<HeatPoint> {
    reports
        .into_iter()
        .map(|r| HeatPoint {
            location: r.location,
            intensity: f64::from(r.severity.value()) / 5.0,
        })
        .collect()
}

/// The four illustrative records shown when the backend cannot be reached.
///
/// Positions are fixed offsets around `center`, so repeated fallbacks draw
/// the same markers.
#[must_use]
pub fn placeholder_incidents(center: GeoPoint, now: DateTime<Utc>) -> Vec<IncidentReport> {
    [
        ("sample1", IncidentType::Theft, Severity::High, 0.010, 0.010),
        ("sample2", IncidentType::Assault, Severity::VeryHigh, -0.010, 0.015),
        ("sample3", IncidentType::Burglary, Severity::Moderate, 0.015, -0.010),
        ("sample4", IncidentType::Vandalism, Severity::Low, -0.012, -0.008),
    ]
    .into_iter()
    .map(|(id, incident_type, severity, d_lat, d_lng)| IncidentReport {
        id: IncidentId::new(id),
        incident_type,
        description: Some(format!(
            "Sample {} incident",
            incident_type.display_name().to_lowercase()
        )),
        severity,
        location: center.offset(d_lat, d_lng),
        address: None,
        reported_by: None,
        distance_km: None,
        created_at: Some(now),
        status: IncidentStatus::Reported,
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn popup_shows_type_severity_and_time() {
        let now = Utc.with_ymd_and_hms(2026, 10, 17, 9, 30, 0).unwrap();
        let mut report = placeholder_incidents(GeoPoint::new(12.34, 56.78), now).remove(0);
        report.description = Some("  Phone snatched  ".to_string());

        let popup = popup_content(&report);
        assert_eq!(popup.title, "Theft");
        assert_eq!(popup.description.as_deref(), Some("Phone snatched"));
        assert_eq!(popup.severity_badge, "Severity: 3 (High)");
        assert_eq!(popup.badge_class, Severity::High.badge_class());
        assert_eq!(popup.time.as_deref(), Some("Oct 17, 2026, 09:30 AM"));
    }

    #[test]
    fn blank_description_is_omitted() {
        let mut report = placeholder_incidents(GeoPoint::new(0.5, 0.5), Utc::now()).remove(1);
        report.description = Some("   ".to_string());
        report.created_at = None;

        let popup = popup_content(&report);
        assert!(popup.description.is_none());
        assert!(popup.time.is_none());
        assert_eq!(marker_view(&report).color, Severity::VeryHigh.color());
    }

    #[test]
    fn placeholders_surround_the_centre() {
        let center = GeoPoint::new(37.7749, -122.4194);
        let first = placeholder_incidents(center, Utc::now());
        let second = placeholder_incidents(center, Utc::now());

        assert_eq!(first.len(), 4);
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.id, b.id);
            assert_eq!(a.location, b.location);
            assert!((a.location.latitude - center.latitude).abs() < 0.02);
            assert!((a.location.longitude - center.longitude).abs() < 0.02);
            assert!(!a.id.is_temporary());
        }
    }

    #[test]
    fn heat_intensity_scales_with_severity() {
        let reports = placeholder_incidents(GeoPoint::new(1.0, 1.0), Utc::now());
        let heat = heat_points(&reports);
        let intensities: Vec<f64> = heat.iter().map(|h| h.intensity).collect();
        assert_eq!(intensities, vec![0.6, 0.8, 0.4, 0.2]);
    }
}
