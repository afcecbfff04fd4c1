//! Dashboard charts and counters.

/// Data for one chart: parallel label, value and colour columns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChartSeries {
    /// Category labels.
    pub labels: Vec<String>,
    /// One value per label.
    pub values: Vec<u64>,
    /// One colour per label.
    pub colors: Vec<&'static str>,
}

impl ChartSeries {
    /// Appends one category.
    pub fn push(&mut self, label: impl Into<String>, value: u64, color: &'static str) {
        self.labels.push(label.into());
        self.values.push(value);
        self.colors.push(color);
    }

    /// Whether there is nothing worth drawing: no categories, or every
    /// value is zero.
    #[must_use]
    pub fn has_no_data(&self) -> bool {
        self.values.iter().all(|v| *v == 0)
    }

    /// Sum of all values.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.values.iter().sum()
    }
}

/// A chart that draws a [`ChartSeries`].
pub trait ChartWidget {
    /// Replaces the chart's data.
    fn set_series(&self, series: &ChartSeries);

    /// Replaces the chart with an explicit "no data" message.
    fn show_no_data(&self);
}

/// A text element such as a counter or a timestamp label.
pub trait CounterWidget {
    /// Replaces the displayed text.
    fn set_text(&self, text: &str);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_zero_series_have_no_data() {
        assert!(ChartSeries::default().has_no_data());

        let mut series = ChartSeries::default();
        series.push("Theft", 0, "#dc3545");
        series.push("Fraud", 0, "#6f42c1");
        assert!(series.has_no_data());

        series.push("Other", 2, "#6c757d");
        assert!(!series.has_no_data());
        assert_eq!(series.total(), 2);
        assert_eq!(series.labels.len(), series.colors.len());
    }
}
