//! The map widget.

use std::rc::Rc;

use crime_scope_crime_models::{GeoPoint, IncidentId};
use strum_macros::{AsRefStr, Display};

use crate::{LoadingIndicator, MountError};

/// Handle returned by [`MapWidget::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(pub u64);

/// Kinds of events a controller can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum MapEventKind {
    /// The map surface was clicked.
    Click,
    /// The zoom level changed.
    ZoomChanged,
    /// The "report crime" button was pressed.
    ReportButton,
    /// The report modal was opened.
    ModalShown,
}

/// An event raised by the map page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MapEvent {
    /// Click at a coordinate.
    Click(GeoPoint),
    /// New zoom level.
    ZoomChanged(u8),
    /// Report button pressed.
    ReportButton,
    /// Report modal opened.
    ModalShown,
}

impl MapEvent {
    /// The kind this event is delivered under.
    #[must_use]
    pub const fn kind(&self) -> MapEventKind {
        match self {
            Self::Click(_) => MapEventKind::Click,
            Self::ZoomChanged(_) => MapEventKind::ZoomChanged,
            Self::ReportButton => MapEventKind::ReportButton,
            Self::ModalShown => MapEventKind::ModalShown,
        }
    }
}

/// Callback invoked for subscribed events.
pub type MapEventHandler = Rc<dyn Fn(MapEvent)>;

/// Axis-aligned geographic bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    /// Minimum latitude and longitude.
    pub south_west: GeoPoint,
    /// Maximum latitude and longitude.
    pub north_east: GeoPoint,
}

impl Bounds {
    /// Smallest bounds containing every point, or `None` for no points.
    pub fn around(points: impl IntoIterator<Item = GeoPoint>) -> Option<Self> {
        points.into_iter().fold(None, |bounds, p| {
            Some(match bounds {
                None => Self {
                    south_west: p,
                    north_east: p,
                },
                Some(Self {
                    south_west,
                    north_east,
                }) => Self {
                    south_west: GeoPoint::new(
                        south_west.latitude.min(p.latitude),
                        south_west.longitude.min(p.longitude),
                    ),
                    north_east: GeoPoint::new(
                        north_east.latitude.max(p.latitude),
                        north_east.longitude.max(p.longitude),
                    ),
                },
            })
        })
    }

    /// Whether `point` lies inside or on the edge.
    #[must_use]
    pub fn contains(&self, point: GeoPoint) -> bool {
        (self.south_west.latitude..=self.north_east.latitude).contains(&point.latitude)
            && (self.south_west.longitude..=self.north_east.longitude).contains(&point.longitude)
    }
}

/// Popup shown when a marker is clicked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopupContent {
    /// Heading, the incident type's display name.
    pub title: String,
    /// Free text, when the report has one.
    pub description: Option<String>,
    /// Badge text, e.g. `Severity: 3 (High)`.
    pub severity_badge: String,
    /// CSS class of the badge.
    pub badge_class: &'static str,
    /// Formatted creation time, when known.
    pub time: Option<String>,
}

/// One incident marker.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerView {
    /// Incident the marker belongs to.
    pub id: IncidentId,
    /// Marker position.
    pub location: GeoPoint,
    /// Fill colour derived from severity.
    pub color: &'static str,
    /// Tooltip.
    pub title: String,
    /// Popup body.
    pub popup: PopupContent,
}

/// Size class of a cluster icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum ClusterSize {
    /// Fewer than 10 members.
    Small,
    /// Fewer than 100 members.
    Medium,
    /// Everything larger.
    Large,
}

impl ClusterSize {
    /// Size class for a member count.
    #[must_use]
    pub const fn for_count(count: usize) -> Self {
        if count < 10 {
            Self::Small
        } else if count < 100 {
            Self::Medium
        } else {
            Self::Large
        }
    }
}

/// A group of nearby markers drawn as a single icon.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterView {
    /// Mean position of the members.
    pub center: GeoPoint,
    /// Member incidents, in id order.
    pub members: Vec<IncidentId>,
    /// Icon colour derived from the member count.
    pub color: &'static str,
    /// Icon size class.
    pub size: ClusterSize,
}

impl ClusterView {
    /// Number of member markers.
    #[must_use]
    pub fn count(&self) -> usize {
        self.members.len()
    }
}

/// Contents of the cluster layer.
#[derive(Debug, Clone, PartialEq)]
pub enum LayerItem {
    /// A marker standing on its own.
    Marker(MarkerView),
    /// Two or more markers grouped together.
    Cluster(ClusterView),
}

impl LayerItem {
    /// How many markers this item stands for.
    #[must_use]
    pub fn marker_count(&self) -> usize {
        match self {
            Self::Marker(_) => 1,
            Self::Cluster(cluster) => cluster.count(),
        }
    }
}

/// One heat-layer sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeatPoint {
    /// Sample position.
    pub location: GeoPoint,
    /// Weight in `0.0..=1.0`.
    pub intensity: f64,
}

/// An interactive slippy map.
pub trait MapWidget: LoadingIndicator {
    /// Attaches the map to the element with id `container_id`.
    ///
    /// # Errors
    ///
    /// Returns [`MountError`] if the container or the map library is
    /// missing.
    fn mount(&self, container_id: &str) -> Result<(), MountError>;

    /// Centres the view.
    fn set_view(&self, center: GeoPoint, zoom: u8);

    /// Fits the view to `bounds`.
    fn fit_bounds(&self, bounds: Bounds);

    /// Current zoom level.
    fn zoom(&self) -> u8;

    /// Replaces the contents of the cluster layer.
    fn render_layer(&self, items: &[LayerItem]);

    /// Replaces the heat layer. An empty slice removes it.
    fn render_heat(&self, points: &[HeatPoint]);

    /// Places the single temporary report marker, replacing any previous one.
    fn place_temp_marker(&self, point: GeoPoint);

    /// Removes the temporary report marker, if any.
    fn remove_temp_marker(&self);

    /// Shows the user's position with an accuracy circle in metres.
    fn show_user_location(&self, point: GeoPoint, accuracy_m: f64);

    /// Registers `handler` for events of `kind`.
    fn subscribe(&self, kind: MapEventKind, handler: MapEventHandler) -> ListenerId;

    /// Removes a handler. Unknown ids are ignored.
    fn unsubscribe(&self, id: ListenerId);

    /// Releases every resource held by the map.
    fn destroy(&self);
}
