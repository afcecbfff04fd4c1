//! Terminal rendering of what the headless widgets hold.

use crime_scope_map::alerts::{AlertEntry, NO_ALERTS_MESSAGE};
use crime_scope_widgets::chart::ChartSeries;
use crime_scope_widgets::headless::{ChartState, HeadlessChart, MapSnapshot};
use crime_scope_widgets::map::LayerItem;
use crime_scope_widgets::toast::ToastLevel;

use crate::session::DashboardView;

pub fn print_layer(snapshot: &MapSnapshot) {
    if snapshot.layer.is_empty() {
        println!("No incidents to show.");
        return;
    }

    println!(
        "{:<14} {:<10} {:<20} {:<24} TIME",
        "ID", "TYPE", "SEVERITY", "LOCATION"
    );
    println!("{}", "-".repeat(90));

    for item in &snapshot.layer {
        match item {
            LayerItem::Marker(marker) => println!(
                "{:<14} {:<10} {:<20} {:<24} {}",
                marker.id.to_string(),
                marker.title,
                marker.popup.severity_badge.trim_start_matches("Severity: "),
                marker.location.coordinate_label(),
                marker.popup.time.as_deref().unwrap_or("-"),
            ),
            LayerItem::Cluster(cluster) => println!(
                "{:<14} {:<10} {:<20} {:<24}",
                format!("[{} reports]", cluster.count()),
                cluster.size.to_string(),
                cluster.color,
                cluster.center.coordinate_label(),
            ),
        }
    }

    println!(
        "\n{} incident(s), zoom {}",
        snapshot.marker_count(),
        snapshot.zoom
    );
}

pub fn print_alerts(alerts: &[AlertEntry]) {
    println!("\nNearby alerts:");
    if alerts.is_empty() {
        println!("  {NO_ALERTS_MESSAGE}");
        return;
    }

    for alert in alerts {
        println!(
            "\n  {} [{}] {}",
            alert.title,
            alert.severity,
            alert.time.as_deref().unwrap_or("-")
        );
        println!("  {}", alert.description);
        println!(
            "  by {}, {} ({})",
            alert.reporter,
            alert.distance,
            alert.location.coordinate_label()
        );
    }
}

pub fn print_dashboard(view: &DashboardView) {
    println!("Total crimes: {}", view.total.text());
    println!("Today:        {}", view.today.text());
    println!("{}", view.last_updated.text());
    print_chart("By type", &view.type_chart);
    print_chart("By severity", &view.severity_chart);
}

fn print_chart(title: &str, chart: &HeadlessChart) {
    println!("\n{title}:");
    match chart.state() {
        ChartState::Series(series) => print_series(&series),
        ChartState::NoData => println!("  No data available"),
        ChartState::Blank => println!("  -"),
    }
}

fn print_series(series: &ChartSeries) {
    let total = series.total().max(1);
    for (label, value) in series.labels.iter().zip(&series.values) {
        let width = usize::try_from(value * 40 / total).unwrap_or(40);
        println!("  {label:<10} {value:>6} {}", "#".repeat(width));
    }
}

pub fn print_toasts(toasts: &[(String, ToastLevel)]) {
    for (message, level) in toasts {
        println!("[{level}] {message}");
    }
}
