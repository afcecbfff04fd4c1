//! In-memory widgets.
//!
//! Each widget records what it was asked to draw and logs it. The CLI
//! renders through these, and the controller tests inspect them.

use std::cell::{Cell, RefCell};

use crime_scope_crime_models::{GeoPoint, IncidentId, ReportFormValues};

use crate::chart::{ChartSeries, ChartWidget, CounterWidget};
use crate::form::{ModalWidget, ReportFormWidget};
use crate::map::{
    Bounds, HeatPoint, LayerItem, ListenerId, MapEvent, MapEventHandler, MapEventKind, MapWidget,
};
use crate::toast::{ToastId, ToastLevel, ToastSurface};
use crate::{LoadingIndicator, MountError};

/// Everything a [`HeadlessMap`] currently shows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapSnapshot {
    /// Container the map is mounted on.
    pub container: Option<String>,
    /// Last centre passed to `set_view`.
    pub center: Option<GeoPoint>,
    /// Current zoom.
    pub zoom: u8,
    /// Last bounds passed to `fit_bounds`.
    pub fitted: Option<Bounds>,
    /// Cluster layer contents.
    pub layer: Vec<LayerItem>,
    /// Heat layer samples.
    pub heat: Vec<HeatPoint>,
    /// Temporary report marker.
    pub temp_marker: Option<GeoPoint>,
    /// User position and accuracy radius.
    pub user_location: Option<(GeoPoint, f64)>,
    /// Whether the loading overlay is shown.
    pub loading: bool,
    /// Whether `destroy` was called.
    pub destroyed: bool,
}

impl MapSnapshot {
    /// Markers on the cluster layer, counting cluster members.
    #[must_use]
    pub fn marker_count(&self) -> usize {
        self.layer.iter().map(LayerItem::marker_count).sum()
    }

    /// Ids of every marker on the cluster layer, sorted.
    #[must_use]
    pub fn marker_ids(&self) -> Vec<IncidentId> {
        let mut ids: Vec<IncidentId> = self
            .layer
            .iter()
            .flat_map(|item| match item {
                LayerItem::Marker(marker) => vec![marker.id.clone()],
                LayerItem::Cluster(cluster) => cluster.members.clone(),
            })
            .collect();
        ids.sort();
        ids
    }
}

/// Map widget that keeps its state in memory.
#[derive(Default)]
pub struct HeadlessMap {
    state: RefCell<MapSnapshot>,
    listeners: RefCell<Vec<(ListenerId, MapEventKind, MapEventHandler)>>,
    next_listener: Cell<u64>,
    missing_container: bool,
}

impl HeadlessMap {
    /// A map whose container always exists.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A map whose `mount` always fails with
    /// [`MountError::ContainerMissing`].
    #[must_use]
    pub fn without_container() -> Self {
        Self {
            missing_container: true,
            ..Self::default()
        }
    }

    /// Copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> MapSnapshot {
        self.state.borrow().clone()
    }

    /// Delivers `event` to every handler subscribed to its kind and returns
    /// how many ran.
    pub fn emit(&self, event: MapEvent) -> usize {
        let handlers: Vec<MapEventHandler> = self
            .listeners
            .borrow()
            .iter()
            .filter(|(_, kind, _)| *kind == event.kind())
            .map(|(_, _, handler)| handler.clone())
            .collect();

        for handler in &handlers {
            handler(event);
        }
        handlers.len()
    }

    /// Changes the zoom the way a user would, notifying listeners.
    pub fn zoom_to(&self, zoom: u8) {
        self.state.borrow_mut().zoom = zoom;
        self.emit(MapEvent::ZoomChanged(zoom));
    }

    /// Number of handlers subscribed to `kind`.
    #[must_use]
    pub fn listener_count(&self, kind: MapEventKind) -> usize {
        self.listeners
            .borrow()
            .iter()
            .filter(|(_, k, _)| *k == kind)
            .count()
    }
}

impl LoadingIndicator for HeadlessMap {
    fn set_loading(&self, loading: bool) {
        self.state.borrow_mut().loading = loading;
    }
}

impl MapWidget for HeadlessMap {
    fn mount(&self, container_id: &str) -> Result<(), MountError> {
        if self.missing_container {
            return Err(MountError::ContainerMissing {
                id: container_id.to_string(),
            });
        }
        log::debug!("map: mounted on #{container_id}");
        let mut state = self.state.borrow_mut();
        state.container = Some(container_id.to_string());
        state.destroyed = false;
        Ok(())
    }

    fn set_view(&self, center: GeoPoint, zoom: u8) {
        log::debug!(
            "map: view ({:.4}, {:.4}) zoom {zoom}",
            center.latitude,
            center.longitude
        );
        let mut state = self.state.borrow_mut();
        state.center = Some(center);
        state.zoom = zoom;
    }

    fn fit_bounds(&self, bounds: Bounds) {
        self.state.borrow_mut().fitted = Some(bounds);
    }

    fn zoom(&self) -> u8 {
        self.state.borrow().zoom
    }

    fn render_layer(&self, items: &[LayerItem]) {
        for item in items {
            match item {
                LayerItem::Marker(marker) => log::info!(
                    "marker {} {} ({:.4}, {:.4}) {}",
                    marker.id,
                    marker.title,
                    marker.location.latitude,
                    marker.location.longitude,
                    marker.popup.severity_badge
                ),
                LayerItem::Cluster(cluster) => log::info!(
                    "cluster of {} ({}) at ({:.4}, {:.4})",
                    cluster.count(),
                    cluster.size,
                    cluster.center.latitude,
                    cluster.center.longitude
                ),
            }
        }
        self.state.borrow_mut().layer = items.to_vec();
    }

    fn render_heat(&self, points: &[HeatPoint]) {
        log::debug!("map: {} heat points", points.len());
        self.state.borrow_mut().heat = points.to_vec();
    }

    fn place_temp_marker(&self, point: GeoPoint) {
        self.state.borrow_mut().temp_marker = Some(point);
    }

    fn remove_temp_marker(&self) {
        self.state.borrow_mut().temp_marker = None;
    }

    fn show_user_location(&self, point: GeoPoint, accuracy_m: f64) {
        self.state.borrow_mut().user_location = Some((point, accuracy_m));
    }

    fn subscribe(&self, kind: MapEventKind, handler: MapEventHandler) -> ListenerId {
        let id = ListenerId(self.next_listener.get());
        self.next_listener.set(id.0 + 1);
        self.listeners.borrow_mut().push((id, kind, handler));
        id
    }

    fn unsubscribe(&self, id: ListenerId) {
        self.listeners.borrow_mut().retain(|(l, _, _)| *l != id);
    }

    fn destroy(&self) {
        log::debug!("map: destroyed");
        self.listeners.borrow_mut().clear();
        let mut state = self.state.borrow_mut();
        state.layer.clear();
        state.heat.clear();
        state.temp_marker = None;
        state.destroyed = true;
    }
}

/// What a [`HeadlessChart`] is showing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ChartState {
    /// Nothing rendered yet.
    #[default]
    Blank,
    /// A data series.
    Series(ChartSeries),
    /// The "no data" message.
    NoData,
}

/// Chart that logs its series.
#[derive(Debug, Default)]
pub struct HeadlessChart {
    name: String,
    state: RefCell<ChartState>,
}

impl HeadlessChart {
    /// Creates a chart labelled `name` in logs.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: RefCell::default(),
        }
    }

    /// Copy of the current state.
    #[must_use]
    pub fn state(&self) -> ChartState {
        self.state.borrow().clone()
    }
}

impl ChartWidget for HeadlessChart {
    fn set_series(&self, series: &ChartSeries) {
        let rows: Vec<String> = series
            .labels
            .iter()
            .zip(&series.values)
            .map(|(label, value)| format!("{label}={value}"))
            .collect();
        log::info!("{}: {}", self.name, rows.join(", "));
        *self.state.borrow_mut() = ChartState::Series(series.clone());
    }

    fn show_no_data(&self) {
        log::info!("{}: no data available", self.name);
        *self.state.borrow_mut() = ChartState::NoData;
    }
}

/// Text element that remembers every value it showed.
#[derive(Debug, Default)]
pub struct HeadlessCounter {
    name: String,
    history: RefCell<Vec<String>>,
}

impl HeadlessCounter {
    /// Creates a counter labelled `name` in logs.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            history: RefCell::default(),
        }
    }

    /// Current text, empty before the first update.
    #[must_use]
    pub fn text(&self) -> String {
        self.history.borrow().last().cloned().unwrap_or_default()
    }

    /// Every text shown, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.history.borrow().clone()
    }
}

impl CounterWidget for HeadlessCounter {
    fn set_text(&self, text: &str) {
        if text != "..." {
            log::info!("{}: {text}", self.name);
        }
        self.history.borrow_mut().push(text.to_string());
    }
}

/// Loading indicator that counts how often it was shown.
#[derive(Debug, Default)]
pub struct HeadlessIndicator {
    loading: Cell<bool>,
    shown: Cell<usize>,
}

impl HeadlessIndicator {
    /// Whether the indicator is visible.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading.get()
    }

    /// How many times the indicator was turned on.
    #[must_use]
    pub fn times_shown(&self) -> usize {
        self.shown.get()
    }
}

impl LoadingIndicator for HeadlessIndicator {
    fn set_loading(&self, loading: bool) {
        if loading {
            self.shown.set(self.shown.get() + 1);
        }
        self.loading.set(loading);
    }
}

/// Modal that tracks visibility.
#[derive(Debug, Default)]
pub struct HeadlessModal {
    visible: Cell<bool>,
}

impl HeadlessModal {
    /// Whether the modal is open.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.visible.get()
    }
}

impl ModalWidget for HeadlessModal {
    fn show(&self) {
        self.visible.set(true);
    }

    fn hide(&self) {
        self.visible.set(false);
    }
}

/// Report form holding its raw input values.
#[derive(Debug, Default)]
pub struct HeadlessForm {
    values: RefCell<ReportFormValues>,
    submitting: RefCell<Vec<bool>>,
}

impl HeadlessForm {
    /// Replaces every input, as if the user had typed them.
    pub fn fill(&self, values: ReportFormValues) {
        *self.values.borrow_mut() = values;
    }

    /// Whether the submit button is currently disabled.
    #[must_use]
    pub fn is_submitting(&self) -> bool {
        self.submitting.borrow().last().copied().unwrap_or(false)
    }

    /// Every submitting state set, oldest first.
    #[must_use]
    pub fn submitting_history(&self) -> Vec<bool> {
        self.submitting.borrow().clone()
    }
}

impl ReportFormWidget for HeadlessForm {
    fn set_coordinates(&self, point: GeoPoint) {
        let mut values = self.values.borrow_mut();
        values.latitude = Some(point.latitude.to_string());
        values.longitude = Some(point.longitude.to_string());
    }

    fn set_address(&self, address: &str) {
        log::debug!("form: location '{address}'");
        self.values.borrow_mut().address = Some(address.to_string());
    }

    fn values(&self) -> ReportFormValues {
        self.values.borrow().clone()
    }

    fn reset(&self) {
        *self.values.borrow_mut() = ReportFormValues::default();
    }

    fn set_submitting(&self, submitting: bool) {
        self.submitting.borrow_mut().push(submitting);
    }
}

/// Toast surface that keeps shown toasts in memory.
#[derive(Debug, Default)]
pub struct HeadlessToasts {
    visible: RefCell<Vec<(ToastId, String, ToastLevel)>>,
    history: RefCell<Vec<(String, ToastLevel)>>,
    removals: Cell<usize>,
}

impl HeadlessToasts {
    /// Toasts currently shown, oldest first.
    #[must_use]
    pub fn visible(&self) -> Vec<(String, ToastLevel)> {
        self.visible
            .borrow()
            .iter()
            .map(|(_, message, level)| (message.clone(), *level))
            .collect()
    }

    /// Every toast ever shown, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<(String, ToastLevel)> {
        self.history.borrow().clone()
    }

    /// Levels of every toast ever shown.
    #[must_use]
    pub fn levels(&self) -> Vec<ToastLevel> {
        self.history.borrow().iter().map(|(_, level)| *level).collect()
    }

    /// How many toasts were removed.
    #[must_use]
    pub fn removals(&self) -> usize {
        self.removals.get()
    }
}

impl ToastSurface for HeadlessToasts {
    fn show(&self, id: ToastId, message: &str, level: ToastLevel) {
        self.visible
            .borrow_mut()
            .push((id, message.to_string(), level));
        self.history.borrow_mut().push((message.to_string(), level));
    }

    fn remove(&self, id: ToastId) {
        let mut visible = self.visible.borrow_mut();
        let before = visible.len();
        visible.retain(|(shown, _, _)| *shown != id);
        if visible.len() != before {
            self.removals.set(self.removals.get() + 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;

    #[test]
    fn emit_reaches_only_matching_listeners() {
        let map = HeadlessMap::new();
        let clicks = Rc::new(Cell::new(0));
        let counter = clicks.clone();
        let id = map.subscribe(
            MapEventKind::Click,
            Rc::new(move |_: MapEvent| counter.set(counter.get() + 1)),
        );
        map.subscribe(MapEventKind::ModalShown, Rc::new(|_: MapEvent| {}));

        assert_eq!(map.emit(MapEvent::Click(GeoPoint::new(1.0, 2.0))), 1);
        assert_eq!(map.emit(MapEvent::ReportButton), 0);
        assert_eq!(clicks.get(), 1);

        map.unsubscribe(id);
        assert_eq!(map.listener_count(MapEventKind::Click), 0);
        assert_eq!(map.listener_count(MapEventKind::ModalShown), 1);
    }

    #[test]
    fn missing_container_fails_mount() {
        let map = HeadlessMap::without_container();
        assert_eq!(
            map.mount("map"),
            Err(MountError::ContainerMissing {
                id: "map".to_string()
            })
        );
    }

    #[test]
    fn form_coordinates_and_reset() {
        let form = HeadlessForm::default();
        form.set_coordinates(GeoPoint::new(12.34, 56.78));
        form.set_address("Main Street");
        let values = form.values();
        assert_eq!(values.latitude.as_deref(), Some("12.34"));
        assert_eq!(values.longitude.as_deref(), Some("56.78"));
        assert_eq!(values.address.as_deref(), Some("Main Street"));

        form.reset();
        assert_eq!(form.values(), ReportFormValues::default());
    }
}
