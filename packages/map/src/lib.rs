#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Map view controller.
//!
//! [`CrimeMap`] keeps the marker set on a [`MapWidget`] in sync with the
//! incidents returned by an [`IncidentSource`], and drives the report flow:
//! report mode, location selection with reverse geocoding, validation and
//! submission.
//!
//! The controller runs on a single-threaded executor. It is shared as an
//! `Rc`, its state lives in `Cell`/`RefCell`, and no borrow is held across
//! an `.await`. Widget event handlers hold a `Weak` reference, so dropping
//! the last `Rc` also silences them.
//!
//! Two counters keep late results from clobbering newer ones: a load
//! generation (only the latest [`CrimeMap::load_incidents`] applies its
//! result) and a selection counter (only the latest click receives its
//! geocoded address). After [`CrimeMap::teardown`] every late result is
//! dropped.

pub mod alerts;
pub mod cluster;
pub mod filters;
pub mod geolocation;
pub mod marker;

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crime_scope_api::{ApiError, IncidentSource, ReportSink};
use crime_scope_api_models::{NearbyQuery, ReportAck};
use crime_scope_config::{IncidentFeed, MapConfig};
use crime_scope_crime_models::{
    GeoPoint, IncidentId, IncidentReport, ReportFormValues, ValidationError,
};
use crime_scope_geocoder::{ReverseGeocoder, address_or_label};
use crime_scope_widgets::form::{ModalWidget, ReportFormWidget};
use crime_scope_widgets::map::{
    Bounds, ListenerId, MapEvent, MapEventHandler, MapEventKind, MapWidget,
};
use crime_scope_widgets::toast::Toaster;
use crime_scope_widgets::{LoadingIndicator, MountError, Refresh};
use strum_macros::{AsRefStr, Display};
use thiserror::Error;

use crate::cluster::cluster_reports;
use crate::marker::{heat_points, placeholder_incidents};

pub use filters::{ActiveFilters, DateRange};
pub use geolocation::{FixedPosition, GeolocationError, GeolocationProvider, Position};

/// Warning shown when the incident fetch fails.
pub const LOAD_FAILED_MESSAGE: &str = "Failed to load crime data. Using sample data instead.";
/// Shown after a report is accepted.
pub const SUBMIT_SUCCESS_MESSAGE: &str = "Crime reported successfully!";
/// Shown when a submission fails without a server message.
pub const SUBMIT_FAILED_MESSAGE: &str = "Failed to submit crime report. Please try again.";
/// Address text while a reverse lookup is pending.
pub const ADDRESS_PENDING: &str = "Getting address...";

/// The map could not be brought up. Not retried.
#[derive(Debug, Error)]
pub enum InitializationError {
    /// The widget could not be mounted.
    #[error("Failed to initialize map: {0}")]
    Mount(#[from] MountError),
}

/// Why a report was not accepted.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// The form failed validation; nothing was sent.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The backend call failed.
    #[error("Report submission failed: {0}")]
    Api(#[from] ApiError),

    /// The controller was torn down.
    #[error("Map has been torn down")]
    Detached,
}

/// Result of [`CrimeMap::load_incidents`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Live records were rendered.
    Live(usize),
    /// The fetch failed and placeholder records were rendered.
    Placeholder(usize),
    /// A newer load was started before this one finished; nothing changed.
    Stale,
    /// The controller is not initialised or was torn down.
    Detached,
}

/// Which view the map is in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum ViewMode {
    /// Browsing: clusters plus the heat layer.
    #[default]
    Heatmap,
    /// Placing a new report: clicks select its location.
    Report,
}

/// Widgets the map controller renders to.
pub struct MapWidgets {
    /// The map itself.
    pub map: Rc<dyn MapWidget>,
    /// Report dialog.
    pub modal: Rc<dyn ModalWidget>,
    /// Form inside the report dialog.
    pub form: Rc<dyn ReportFormWidget>,
    /// Shared toast helper.
    pub toaster: Toaster,
}

/// Services the map controller calls.
pub struct MapServices {
    /// Where incidents come from.
    pub incidents: Rc<dyn IncidentSource>,
    /// Where reports go.
    pub reports: Rc<dyn ReportSink>,
    /// Address lookup for selected locations.
    pub geocoder: Rc<dyn ReverseGeocoder>,
    /// User position, when the platform has one.
    pub geolocation: Option<Rc<dyn GeolocationProvider>>,
    /// Refreshed after a successful submission.
    pub dashboard: Option<Rc<dyn Refresh>>,
}

#[derive(Debug, Default)]
struct ViewState {
    mode: ViewMode,
    filters: ActiveFilters,
    incidents: BTreeMap<IncidentId, IncidentReport>,
    user_location: Option<GeoPoint>,
    temp_marker: Option<GeoPoint>,
    last_updated: Option<DateTime<Utc>>,
}

/// Shows the loading overlay until dropped.
struct LoadingGuard(Rc<dyn MapWidget>);

impl LoadingGuard {
    fn show(map: Rc<dyn MapWidget>) -> Self {
        map.set_loading(true);
        Self(map)
    }
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        self.0.set_loading(false);
    }
}

/// Disables the submit button until dropped.
struct SubmittingGuard(Rc<dyn ReportFormWidget>);

impl SubmittingGuard {
    fn start(form: Rc<dyn ReportFormWidget>) -> Self {
        form.set_submitting(true);
        Self(form)
    }
}

impl Drop for SubmittingGuard {
    fn drop(&mut self) {
        self.0.set_submitting(false);
    }
}

/// Controller for the incident map.
pub struct CrimeMap {
    config: MapConfig,
    widgets: MapWidgets,
    services: MapServices,
    this: Weak<Self>,
    state: RefCell<ViewState>,
    generation: Cell<u64>,
    selection: Cell<u64>,
    alive: Cell<bool>,
    subscriptions: RefCell<Vec<ListenerId>>,
}

impl CrimeMap {
    /// Creates an uninitialised controller.
    #[must_use]
    pub fn new(config: MapConfig, widgets: MapWidgets, services: MapServices) -> Rc<Self> {
        Rc::new_cyclic(|this| Self {
            config,
            widgets,
            services,
            this: this.clone(),
            state: RefCell::default(),
            generation: Cell::new(0),
            selection: Cell::new(0),
            alive: Cell::new(false),
            subscriptions: RefCell::default(),
        })
    }

    /// Mounts the map, subscribes to its events and loads incidents.
    ///
    /// Calling this again detaches the previous subscriptions first.
    ///
    /// # Errors
    ///
    /// Returns [`InitializationError`] if the map cannot be mounted. A
    /// danger toast has been shown by then.
    pub async fn initialize(&self) -> Result<LoadOutcome, InitializationError> {
        self.detach_listeners();

        if let Err(e) = self.widgets.map.mount(&self.config.container_id) {
            log::error!("Error initializing map: {e}");
            self.widgets.toaster.danger(&format!("Error: {e}"));
            return Err(e.into());
        }

        self.alive.set(true);
        self.widgets
            .map
            .set_view(self.query_center(), self.config.default_zoom);
        self.attach_listeners();
        log::info!("Map initialized on #{}", self.config.container_id);

        Ok(self.load_incidents().await)
    }

    fn attach_listeners(&self) {
        let handlers: [(MapEventKind, MapEventHandler); 4] = [
            (
                MapEventKind::Click,
                self.handler(|map, event| {
                    if let MapEvent::Click(point) = event {
                        map.on_click(point);
                    }
                }),
            ),
            (
                MapEventKind::ZoomChanged,
                self.handler(|map, event| {
                    if let MapEvent::ZoomChanged(zoom) = event {
                        map.on_zoom_changed(zoom);
                    }
                }),
            ),
            (
                MapEventKind::ReportButton,
                self.handler(|map, _| map.enter_report_mode()),
            ),
            (
                MapEventKind::ModalShown,
                self.handler(|map, _| map.prepare_report_form()),
            ),
        ];

        let ids: Vec<ListenerId> = handlers
            .into_iter()
            .map(|(kind, handler)| self.widgets.map.subscribe(kind, handler))
            .collect();
        *self.subscriptions.borrow_mut() = ids;
    }

    fn handler(&self, f: impl Fn(&Rc<Self>, MapEvent) + 'static) -> MapEventHandler {
        let this = self.this.clone();
        Rc::new(move |event: MapEvent| {
            if let Some(map) = this.upgrade() {
                f(&map, event);
            }
        })
    }

    fn detach_listeners(&self) {
        let ids = std::mem::take(&mut *self.subscriptions.borrow_mut());
        for id in ids {
            self.widgets.map.unsubscribe(id);
        }
    }

    /// Fetches incidents and replaces the marker set.
    ///
    /// Failures never escape: the user gets a warning toast and four
    /// placeholder records around the query centre.
    pub async fn load_incidents(&self) -> LoadOutcome {
        if !self.alive.get() {
            log::debug!("Ignoring load on a detached map");
            return LoadOutcome::Detached;
        }

        let generation = self.generation.get() + 1;
        self.generation.set(generation);
        let _loading = LoadingGuard::show(self.widgets.map.clone());
        let center = self.query_center();

        let result = match self.config.feed {
            IncidentFeed::Nearby => {
                let query = NearbyQuery {
                    lat: center.latitude,
                    lng: center.longitude,
                    radius: self.config.nearby_radius_km,
                    limit: self.config.nearby_limit,
                };
                self.services.incidents.nearby(&query).await
            }
            IncidentFeed::All => self.services.incidents.all_incidents().await,
        };

        if !self.alive.get() {
            log::debug!("Map torn down during load {generation}, dropping result");
            return LoadOutcome::Detached;
        }
        if generation != self.generation.get() {
            log::debug!(
                "Load {generation} superseded by {}, dropping result",
                self.generation.get()
            );
            return LoadOutcome::Stale;
        }

        match result {
            Ok(reports) => {
                let count = self.replace_incidents(reports);
                let now = Utc::now();
                self.state.borrow_mut().last_updated = Some(now);
                log::info!("Last updated: {}", now.format("%H:%M:%S"));
                LoadOutcome::Live(count)
            }
            Err(e) => {
                log::error!("Error loading crime data: {e}");
                self.widgets.toaster.warning(LOAD_FAILED_MESSAGE);
                let count = self.replace_incidents(placeholder_incidents(center, Utc::now()));
                LoadOutcome::Placeholder(count)
            }
        }
    }

    /// Clears the marker set and rebuilds it from `reports`. A later record
    /// with a duplicate id replaces the earlier one.
    fn replace_incidents(&self, reports: Vec<IncidentReport>) -> usize {
        let count = {
            let mut state = self.state.borrow_mut();
            state.incidents.clear();
            for report in reports {
                if let Some(previous) = state.incidents.insert(report.id.clone(), report) {
                    log::debug!("Duplicate incident id {}, keeping the later record", previous.id);
                }
            }
            state.incidents.len()
        };

        self.fit_view();
        self.render();
        count
    }

    fn fit_view(&self) {
        let bounds = Bounds::around(self.visible_incidents().iter().map(|r| r.location));
        match bounds {
            Some(bounds) => self.widgets.map.fit_bounds(bounds),
            None => self.widgets.map.set_view(self.query_center(), self.home_zoom()),
        }
    }

    fn render(&self) -> usize {
        self.render_at(self.widgets.map.zoom())
    }

    fn render_at(&self, zoom: u8) -> usize {
        let visible = self.visible_incidents();
        let refs: Vec<&IncidentReport> = visible.iter().collect();
        let items = cluster_reports(&refs, zoom, self.config.cluster_radius_px);
        self.widgets.map.render_layer(&items);

        let heat = if self.current_view() == ViewMode::Heatmap {
            heat_points(&visible)
        } else {
            Vec::new()
        };
        self.widgets.map.render_heat(&heat);

        visible.len()
    }

    fn query_center(&self) -> GeoPoint {
        self.state
            .borrow()
            .user_location
            .unwrap_or(self.config.fallback_center)
    }

    fn home_zoom(&self) -> u8 {
        if self.state.borrow().user_location.is_some() {
            self.config.located_zoom
        } else {
            self.config.default_zoom
        }
    }

    /// Switches to report mode and opens the report dialog.
    pub fn enter_report_mode(&self) {
        if !self.alive.get() {
            return;
        }
        self.state.borrow_mut().mode = ViewMode::Report;
        log::info!("Report mode: click on the map to select the crime location");
        self.widgets.modal.show();
        self.render();
    }

    /// Returns to the browse view and removes the temporary marker.
    pub fn exit_report_mode(&self) {
        self.clear_selection();
        let previous = std::mem::replace(&mut self.state.borrow_mut().mode, ViewMode::Heatmap);
        if self.alive.get() && previous == ViewMode::Report {
            self.render();
        }
    }

    /// Resets the form and the selection when the report dialog opens.
    pub fn prepare_report_form(&self) {
        self.widgets.form.reset();
        self.clear_selection();
    }

    fn clear_selection(&self) {
        self.selection.set(self.selection.get() + 1);
        self.state.borrow_mut().temp_marker = None;
        self.widgets.map.remove_temp_marker();
    }

    fn on_click(self: &Rc<Self>, point: GeoPoint) {
        if let Some(selection) = self.select_location(point) {
            let map = Rc::clone(self);
            tokio::task::spawn_local(async move {
                map.resolve_address(selection, point).await;
            });
        }
    }

    /// Handles a click at `point`: in report mode, places the temporary
    /// marker, fills in the coordinates and looks up the address. Clicks
    /// in the browse view are ignored.
    pub async fn handle_map_click(&self, point: GeoPoint) {
        if let Some(selection) = self.select_location(point) {
            self.resolve_address(selection, point).await;
        }
    }

    fn select_location(&self, point: GeoPoint) -> Option<u64> {
        if !self.alive.get() || self.current_view() != ViewMode::Report {
            log::debug!("Ignoring map click outside report mode");
            return None;
        }

        let selection = self.selection.get() + 1;
        self.selection.set(selection);
        self.state.borrow_mut().temp_marker = Some(point);

        self.widgets.map.place_temp_marker(point);
        self.widgets.form.set_coordinates(point);
        self.widgets.form.set_address(ADDRESS_PENDING);
        Some(selection)
    }

    async fn resolve_address(&self, selection: u64, point: GeoPoint) {
        let address = address_or_label(self.services.geocoder.as_ref(), point).await;
        if !self.alive.get() || selection != self.selection.get() {
            log::debug!("Dropping address for superseded selection {selection}");
            return;
        }
        self.widgets.form.set_address(&address);
    }

    /// Validates and posts a report.
    ///
    /// On success the form is reset, the dialog closed, report mode left,
    /// incidents reloaded and the dashboard asked to refresh. On failure
    /// the form keeps its values.
    ///
    /// # Errors
    ///
    /// Returns [`SubmitError::Validation`] without any network call when
    /// the values are invalid, [`SubmitError::Api`] when the backend call
    /// fails, or [`SubmitError::Detached`] after teardown. A danger toast
    /// has been shown for the first two.
    pub async fn submit_report(&self, values: &ReportFormValues) -> Result<ReportAck, SubmitError> {
        if !self.alive.get() {
            return Err(SubmitError::Detached);
        }
        let _submitting = SubmittingGuard::start(self.widgets.form.clone());

        let report = match values.validate(Utc::now()) {
            Ok(report) => report,
            Err(e) => {
                log::warn!("Report rejected before submission: {e}");
                self.widgets.toaster.danger(&e.to_string());
                return Err(e.into());
            }
        };

        let ack = match self.services.reports.submit(&report).await {
            Ok(ack) => ack,
            Err(e) => {
                log::error!("Error submitting report: {e}");
                let message = e
                    .server_message()
                    .map_or_else(|| SUBMIT_FAILED_MESSAGE.to_string(), String::from);
                self.widgets.toaster.danger(&message);
                return Err(e.into());
            }
        };

        if !self.alive.get() {
            return Ok(ack);
        }

        self.widgets.toaster.success(SUBMIT_SUCCESS_MESSAGE);
        self.widgets.form.reset();
        self.widgets.modal.hide();
        self.exit_report_mode();
        self.load_incidents().await;

        if let Some(dashboard) = &self.services.dashboard {
            dashboard.refresh().await;
        }

        Ok(ack)
    }

    /// Submits whatever the report form currently holds.
    ///
    /// # Errors
    ///
    /// See [`Self::submit_report`].
    pub async fn submit_form(&self) -> Result<ReportAck, SubmitError> {
        let values = self.widgets.form.values();
        self.submit_report(&values).await
    }

    /// Replaces the filters and redraws from the records already loaded.
    /// Returns how many markers are visible.
    pub fn set_filters(&self, filters: ActiveFilters) -> usize {
        self.state.borrow_mut().filters = filters;
        if self.alive.get() {
            self.render()
        } else {
            0
        }
    }

    /// Asks for the user's position, centres the map on it and reloads.
    ///
    /// # Errors
    ///
    /// Returns [`GeolocationError`] when no position is available. A
    /// warning toast has been shown by then.
    pub async fn locate_user(&self) -> Result<GeoPoint, GeolocationError> {
        let result = match &self.services.geolocation {
            Some(provider) => provider.current_position().await,
            None => Err(GeolocationError::Unsupported),
        };

        match result {
            Ok(position) => {
                self.state.borrow_mut().user_location = Some(position.location);
                if self.alive.get() {
                    self.widgets
                        .map
                        .show_user_location(position.location, position.accuracy_m);
                    self.widgets
                        .map
                        .set_view(position.location, self.config.located_zoom);
                    self.load_incidents().await;
                }
                Ok(position.location)
            }
            Err(e) => {
                log::warn!("Error getting location: {e}");
                self.widgets
                    .toaster
                    .warning(&format!("Could not get your location: {e}"));
                Err(e)
            }
        }
    }

    /// Re-clusters for a new zoom level.
    pub fn on_zoom_changed(&self, zoom: u8) {
        if self.alive.get() {
            self.render_at(zoom);
        }
    }

    /// Detaches every subscription, drops late results, clears the markers
    /// and destroys the widget.
    pub fn teardown(&self) {
        self.detach_listeners();
        if !self.alive.replace(false) {
            return;
        }

        self.generation.set(self.generation.get() + 1);
        self.selection.set(self.selection.get() + 1);
        {
            let mut state = self.state.borrow_mut();
            state.incidents.clear();
            state.temp_marker = None;
        }

        self.widgets.map.render_layer(&[]);
        self.widgets.map.render_heat(&[]);
        self.widgets.map.remove_temp_marker();
        self.widgets.map.destroy();
        log::info!("Map torn down");
    }

    /// Current view.
    #[must_use]
    pub fn current_view(&self) -> ViewMode {
        self.state.borrow().mode
    }

    /// Current filters.
    #[must_use]
    pub fn filters(&self) -> ActiveFilters {
        self.state.borrow().filters.clone()
    }

    /// Every loaded record, in id order.
    #[must_use]
    pub fn incidents(&self) -> Vec<IncidentReport> {
        self.state.borrow().incidents.values().cloned().collect()
    }

    /// Loaded records that pass the filters, in id order.
    #[must_use]
    pub fn visible_incidents(&self) -> Vec<IncidentReport> {
        let state = self.state.borrow();
        let now = Utc::now();
        state
            .incidents
            .values()
            .filter(|r| state.filters.matches(r, now))
            .cloned()
            .collect()
    }

    /// Location of the temporary report marker.
    #[must_use]
    pub fn temp_marker(&self) -> Option<GeoPoint> {
        self.state.borrow().temp_marker
    }

    /// Last known user position.
    #[must_use]
    pub fn user_location(&self) -> Option<GeoPoint> {
        self.state.borrow().user_location
    }

    /// When live data was last applied.
    #[must_use]
    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.state.borrow().last_updated
    }

    /// Whether the controller is initialised and not torn down.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.alive.get()
    }
}

#[async_trait(?Send)]
impl Refresh for CrimeMap {
    async fn refresh(&self) {
        self.load_incidents().await;
    }
}
