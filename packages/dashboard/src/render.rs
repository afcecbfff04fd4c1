//! Turning [`CrimeStats`] into counter text and chart series.

use chrono::{DateTime, Utc};
use crime_scope_api_models::{CrimeStats, SeverityCount, TypeCount, parse_timestamp_str};
use crime_scope_crime_models::{IncidentType, Severity};
use crime_scope_widgets::chart::ChartSeries;

/// Formats a count with thousands separators, e.g. `1,234`.
#[must_use]
pub fn format_count(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Text of the "last updated" label. A missing timestamp means `now`.
#[must_use]
pub fn last_updated_label(raw: Option<&str>, now: DateTime<Utc>) -> String {
    let at = match raw {
        None => Some(now),
        Some(raw) => parse_timestamp_str(raw),
    };
    at.map_or_else(
        || "Last updated: Invalid date".to_string(),
        |at| format!("Last updated: {}", at.format("%b %-d, %I:%M %p")),
    )
}

/// Type distribution in chart order. Repeated entries for one type are
/// summed and types with no incidents are left out.
#[must_use]
pub fn type_series(by_type: &[TypeCount]) -> ChartSeries {
    let mut series = ChartSeries::default();
    for incident_type in IncidentType::all() {
        let count: u64 = by_type
            .iter()
            .filter(|t| t.incident_type == *incident_type)
            .map(|t| t.count)
            .sum();
        if count > 0 {
            series.push(incident_type.display_name(), count, incident_type.color());
        }
    }
    series
}

/// Severity distribution over buckets 1 to 5, missing buckets as zero.
/// Out-of-range severities are ignored.
#[must_use]
pub fn severity_series(by_severity: &[SeverityCount]) -> ChartSeries {
    let mut series = ChartSeries::default();
    for severity in Severity::all() {
        let count = by_severity
            .iter()
            .filter(|s| s.severity == severity.value())
            .map(|s| s.count)
            .sum();
        series.push(severity.label(), count, severity.color());
    }
    series
}

/// Illustrative numbers shown when the backend cannot be reached.
#[must_use]
pub fn fallback_stats(now: DateTime<Utc>) -> CrimeStats {
    let by_type = [
        (IncidentType::Theft, 15),
        (IncidentType::Assault, 10),
        (IncidentType::Burglary, 8),
        (IncidentType::Fraud, 6),
        (IncidentType::Vandalism, 3),
    ]
    .into_iter()
    .map(|(incident_type, count)| TypeCount {
        incident_type,
        count,
    })
    .collect();

    let by_severity = [5, 15, 12, 7, 3]
        .into_iter()
        .zip(1u8..)
        .map(|(count, severity)| SeverityCount { severity, count })
        .collect();

    CrimeStats {
        total_crimes: 42,
        today_crimes: 5,
        by_type,
        by_severity,
        last_updated: Some(now.to_rfc3339()),
    }
}
