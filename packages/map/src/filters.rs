//! Marker filters.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use crime_scope_crime_models::{IncidentReport, IncidentType, Severity};
use strum_macros::{AsRefStr, Display, EnumString};

/// How far back reports are shown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum DateRange {
    /// Since midnight UTC.
    Today,
    /// The last seven days.
    #[default]
    Week,
    /// The last thirty days.
    Month,
    /// No limit.
    All,
}

impl DateRange {
    /// Earliest creation time still shown at `now`.
    #[must_use]
    pub fn cutoff(self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Self::Today => now
                .date_naive()
                .and_hms_opt(0, 0, 0)
                .map(|midnight| midnight.and_utc()),
            Self::Week => Some(now - Duration::days(7)),
            Self::Month => Some(now - Duration::days(30)),
            Self::All => None,
        }
    }
}

/// Which reports are drawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveFilters {
    /// Types shown.
    pub types: BTreeSet<IncidentType>,
    /// Time window.
    pub date_range: DateRange,
    /// Most severe level shown; reports above it are hidden.
    pub max_severity: Severity,
}

impl Default for ActiveFilters {
    fn default() -> Self {
        Self {
            types: IncidentType::all().iter().copied().collect(),
            date_range: DateRange::default(),
            max_severity: Severity::Critical,
        }
    }
}

impl ActiveFilters {
    /// Whether `report` is drawn at `now`. Reports without a creation
    /// time pass the date check.
    #[must_use]
    pub fn matches(&self, report: &IncidentReport, now: DateTime<Utc>) -> bool {
        if !self.types.contains(&report.incident_type) || report.severity > self.max_severity {
            return false;
        }
        match (self.date_range.cutoff(now), report.created_at) {
            (Some(cutoff), Some(created)) => created >= cutoff,
            _ => true,
        }
    }
}
