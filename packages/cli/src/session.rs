//! Wires the map and dashboard controllers to headless widgets, the
//! backend API client and the Nominatim geocoder.

use std::rc::Rc;

use crime_scope_api::ApiClient;
use crime_scope_config::AppConfig;
use crime_scope_dashboard::{DashboardController, DashboardWidgets};
use crime_scope_geocoder::nominatim::NominatimReverse;
use crime_scope_map::{CrimeMap, MapServices, MapWidgets};
use crime_scope_widgets::headless::{
    HeadlessChart, HeadlessCounter, HeadlessForm, HeadlessIndicator, HeadlessMap, HeadlessModal,
    HeadlessToasts,
};
use crime_scope_widgets::toast::Toaster;

/// Dashboard widgets, kept so their contents can be printed.
pub struct DashboardView {
    pub total: Rc<HeadlessCounter>,
    pub today: Rc<HeadlessCounter>,
    pub last_updated: Rc<HeadlessCounter>,
    pub type_chart: Rc<HeadlessChart>,
    pub severity_chart: Rc<HeadlessChart>,
}

/// Everything one command needs.
pub struct Session {
    pub map: Rc<CrimeMap>,
    pub dashboard: Rc<DashboardController>,
    pub map_widget: Rc<HeadlessMap>,
    pub form: Rc<HeadlessForm>,
    pub toasts: Rc<HeadlessToasts>,
    pub view: DashboardView,
}

impl Session {
    /// Builds controllers from `config`. Nothing is fetched yet.
    pub fn new(config: AppConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let api = Rc::new(ApiClient::new(&config.api)?);
        let geocoder = Rc::new(NominatimReverse::new(&config.geocoder)?);
        log::debug!("Using backend at {}", api.base_url());

        let toasts = Rc::new(HeadlessToasts::default());
        let toaster = Toaster::new(toasts.clone(), config.notifications.default_duration());

        let view = DashboardView {
            total: Rc::new(HeadlessCounter::new("total crimes")),
            today: Rc::new(HeadlessCounter::new("today")),
            last_updated: Rc::new(HeadlessCounter::new("dashboard")),
            type_chart: Rc::new(HeadlessChart::new("crimes by type")),
            severity_chart: Rc::new(HeadlessChart::new("crimes by severity")),
        };
        let dashboard = DashboardController::new(
            api.clone(),
            DashboardWidgets {
                total: view.total.clone(),
                today: view.today.clone(),
                last_updated: view.last_updated.clone(),
                type_chart: view.type_chart.clone(),
                severity_chart: view.severity_chart.clone(),
                loading: Rc::new(HeadlessIndicator::default()),
                toaster: toaster.clone(),
            },
        );

        let map_widget = Rc::new(HeadlessMap::new());
        let form = Rc::new(HeadlessForm::default());
        let map = CrimeMap::new(
            config.map,
            MapWidgets {
                map: map_widget.clone(),
                modal: Rc::new(HeadlessModal::default()),
                form: form.clone(),
                toaster,
            },
            MapServices {
                incidents: api.clone(),
                reports: api,
                geocoder,
                geolocation: None,
                dashboard: Some(dashboard.clone()),
            },
        );

        Ok(Self {
            map,
            dashboard,
            map_widget,
            form,
            toasts,
            view,
        })
    }

    /// Stops timers and clears the map.
    pub fn teardown(&self) {
        self.dashboard.teardown();
        self.map.teardown();
    }
}
