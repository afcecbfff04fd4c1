//! Greedy marker clustering in Web-Mercator pixel space.
//!
//! Reports are projected to pixels at the current zoom and indexed in an
//! R-tree. Walking the reports in id order, each unassigned report seeds a
//! group with every unassigned report within the pixel radius. Groups of
//! one stay plain markers.

use std::f64::consts::PI;

use crime_scope_crime_models::{GeoPoint, IncidentReport, Severity};
use crime_scope_widgets::map::{ClusterSize, ClusterView, LayerItem};
use rstar::RTree;
use rstar::primitives::GeomWithData;

use crate::marker::marker_view;

/// Width of one map tile in pixels at zoom 0.
pub const TILE_SIZE: f64 = 256.0;

/// Latitude limit of the Web-Mercator projection.
const MAX_LATITUDE: f64 = 85.051_128_78;

type Indexed = GeomWithData<[f64; 2], usize>;

/// Projects `point` to global pixel coordinates at `zoom`.
#[must_use]
pub fn project(point: GeoPoint, zoom: u8) -> [f64; 2] {
    let scale = TILE_SIZE * 2f64.powi(i32::from(zoom));
    let lat = point.latitude.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();

    let x = (point.longitude + 180.0) / 360.0 * scale;
    let y = (1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / PI) / 2.0 * scale;
    [x, y]
}

/// Groups `reports` into markers and clusters at `zoom`.
///
/// Every report ends up in exactly one item, so the items' marker counts
/// always sum to `reports.len()`.
#[must_use]
pub fn cluster_reports(reports: &[&IncidentReport], zoom: u8, radius_px: f64) -> Vec<LayerItem> {
    let mut ordered: Vec<&IncidentReport> = reports.to_vec();
    ordered.sort_by(|a, b| a.id.cmp(&b.id));

    let tree = RTree::bulk_load(
        ordered
            .iter()
            .enumerate()
            .map(|(i, report)| Indexed::new(project(report.location, zoom), i))
            .collect(),
    );

    let mut assigned = vec![false; ordered.len()];
    let mut items = Vec::new();

    for (seed, report) in ordered.iter().enumerate() {
        if assigned[seed] {
            continue;
        }

        let origin = project(report.location, zoom);
        let mut members: Vec<usize> = tree
            .locate_within_distance(origin, radius_px * radius_px)
            .map(|entry| entry.data)
            .filter(|i| !assigned[*i])
            .collect();
        // A NaN radius matches nothing, not even the seed.
        if !members.contains(&seed) {
            members.push(seed);
        }
        members.sort_unstable();

        for i in &members {
            assigned[*i] = true;
        }

        if members.len() == 1 {
            items.push(LayerItem::Marker(marker_view(report)));
        } else {
            let group: Vec<&IncidentReport> = members.iter().map(|i| ordered[*i]).collect();
            items.push(LayerItem::Cluster(cluster_view(&group)));
        }
    }

    log::debug!(
        "Clustered {} markers into {} items at zoom {zoom}",
        ordered.len(),
        items.len()
    );
    items
}

fn cluster_view(members: &[&IncidentReport]) -> ClusterView {
    #[allow(clippy::cast_precision_loss)]
    let n = members.len() as f64;
    let (lat, lng) = members.iter().fold((0.0, 0.0), |(lat, lng), r| {
        (lat + r.location.latitude, lng + r.location.longitude)
    });

    ClusterView {
        center: GeoPoint::new(lat / n, lng / n),
        members: members.iter().map(|r| r.id.clone()).collect(),
        color: Severity::for_cluster_size(members.len()).color(),
        size: ClusterSize::for_count(members.len()),
    }
}
