#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Statistics dashboard controller.
//!
//! [`DashboardController`] fetches [`CrimeStats`] from a [`StatsSource`]
//! and renders two counters, a last-updated label and two charts. Only one
//! load runs at a time; a load requested while another is outstanding is
//! skipped. When the fetch fails, illustrative numbers are rendered and a
//! warning toast is shown.

pub mod render;

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use crime_scope_api::StatsSource;
use crime_scope_api_models::CrimeStats;
use crime_scope_widgets::chart::{ChartSeries, ChartWidget, CounterWidget};
use crime_scope_widgets::toast::Toaster;
use crime_scope_widgets::{LoadingIndicator, Refresh};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

pub use render::{
    fallback_stats, format_count, last_updated_label, severity_series, type_series,
};

/// Warning shown when the statistics fetch fails.
pub const FALLBACK_MESSAGE: &str = "Error loading dashboard data. Using sample data.";
/// Counter text while a load is outstanding.
pub const LOADING_PLACEHOLDER: &str = "...";

/// Result of [`DashboardController::load_statistics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    /// Another load was outstanding, or the dashboard was torn down.
    Skipped,
    /// Live statistics were rendered.
    Live,
    /// The fetch failed and fallback statistics were rendered.
    Fallback,
}

/// Widgets the dashboard renders to.
pub struct DashboardWidgets {
    /// Total incident count.
    pub total: Rc<dyn CounterWidget>,
    /// Incidents reported today.
    pub today: Rc<dyn CounterWidget>,
    /// "Last updated" label.
    pub last_updated: Rc<dyn CounterWidget>,
    /// Doughnut chart of incident types.
    pub type_chart: Rc<dyn ChartWidget>,
    /// Bar chart of severities.
    pub severity_chart: Rc<dyn ChartWidget>,
    /// Spinner shown while loading.
    pub loading: Rc<dyn LoadingIndicator>,
    /// Shared toast helper.
    pub toaster: Toaster,
}

/// Marks a load as outstanding until dropped.
struct InFlight<'a> {
    flag: &'a Cell<bool>,
    loading: &'a dyn LoadingIndicator,
}

impl<'a> InFlight<'a> {
    fn begin(flag: &'a Cell<bool>, loading: &'a dyn LoadingIndicator) -> Option<Self> {
        if flag.replace(true) {
            return None;
        }
        loading.set_loading(true);
        Some(Self { flag, loading })
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.loading.set_loading(false);
        self.flag.set(false);
    }
}

/// Controller for the statistics dashboard.
pub struct DashboardController {
    stats: Rc<dyn StatsSource>,
    widgets: DashboardWidgets,
    this: Weak<Self>,
    in_flight: Cell<bool>,
    alive: Cell<bool>,
    auto_refresh: RefCell<Option<JoinHandle<()>>>,
    current: RefCell<Option<CrimeStats>>,
}

impl DashboardController {
    /// Creates a dashboard that has not loaded anything yet.
    #[must_use]
    pub fn new(stats: Rc<dyn StatsSource>, widgets: DashboardWidgets) -> Rc<Self> {
        Rc::new_cyclic(|this| Self {
            stats,
            widgets,
            this: this.clone(),
            in_flight: Cell::new(false),
            alive: Cell::new(true),
            auto_refresh: RefCell::new(None),
            current: RefCell::new(None),
        })
    }

    /// Fetches and renders the statistics.
    ///
    /// Never fails: a failed fetch renders [`fallback_stats`] and shows a
    /// warning toast instead.
    pub async fn load_statistics(&self) -> LoadStatus {
        if !self.alive.get() {
            return LoadStatus::Skipped;
        }
        let Some(_in_flight) = InFlight::begin(&self.in_flight, self.widgets.loading.as_ref())
        else {
            log::debug!("Dashboard load already in progress, skipping");
            return LoadStatus::Skipped;
        };

        self.widgets.total.set_text(LOADING_PLACEHOLDER);
        self.widgets.today.set_text(LOADING_PLACEHOLDER);

        let result = self.stats.stats().await;
        if !self.alive.get() {
            log::debug!("Dashboard torn down during load, dropping result");
            return LoadStatus::Skipped;
        }

        match result {
            Ok(stats) => {
                log::debug!(
                    "Loaded dashboard statistics: {} total, {} today",
                    stats.total_crimes,
                    stats.today_crimes
                );
                self.render(&stats);
                LoadStatus::Live
            }
            Err(e) => {
                log::warn!("Failed to load dashboard statistics: {e}");
                self.widgets.toaster.warning(FALLBACK_MESSAGE);
                self.render(&fallback_stats(Utc::now()));
                LoadStatus::Fallback
            }
        }
    }

    /// Draws `stats` on every widget.
    pub fn render(&self, stats: &CrimeStats) {
        let w = &self.widgets;
        w.total.set_text(&format_count(stats.total_crimes));
        w.today.set_text(&format_count(stats.today_crimes));
        w.last_updated
            .set_text(&last_updated_label(stats.last_updated.as_deref(), Utc::now()));

        draw_chart(w.type_chart.as_ref(), &type_series(&stats.by_type));
        draw_chart(
            w.severity_chart.as_ref(),
            &severity_series(&stats.by_severity),
        );

        *self.current.borrow_mut() = Some(stats.clone());
    }

    /// Reloads every `interval` until stopped. Replaces any running timer.
    /// A zero interval only stops the current timer.
    pub fn start_auto_refresh(&self, interval: Duration) {
        self.stop_auto_refresh();
        if !self.alive.get() {
            return;
        }
        if interval.is_zero() {
            log::warn!("Dashboard auto refresh needs a non-zero interval");
            return;
        }

        let this = self.this.clone();
        let handle = tokio::task::spawn_local(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(dashboard) = this.upgrade() else {
                    break;
                };
                dashboard.load_statistics().await;
            }
        });

        log::debug!("Dashboard auto refresh every {}s", interval.as_secs());
        *self.auto_refresh.borrow_mut() = Some(handle);
    }

    /// Cancels the refresh timer, if any.
    pub fn stop_auto_refresh(&self) {
        let handle = self.auto_refresh.borrow_mut().take();
        if let Some(handle) = handle {
            handle.abort();
        }
    }

    /// Whether a refresh timer is running.
    #[must_use]
    pub fn is_auto_refreshing(&self) -> bool {
        self.auto_refresh
            .borrow()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Stops the timer. Loads finishing afterwards render nothing.
    pub fn teardown(&self) {
        self.alive.set(false);
        self.stop_auto_refresh();
    }

    /// Statistics currently on screen.
    #[must_use]
    pub fn current(&self) -> Option<CrimeStats> {
        self.current.borrow().clone()
    }

    /// Whether a load is outstanding.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.in_flight.get()
    }
}

impl Drop for DashboardController {
    fn drop(&mut self) {
        if let Some(handle) = self.auto_refresh.get_mut().take() {
            handle.abort();
        }
    }
}

#[async_trait(?Send)]
impl Refresh for DashboardController {
    async fn refresh(&self) {
        self.load_statistics().await;
    }
}

fn draw_chart(chart: &dyn ChartWidget, series: &ChartSeries) {
    if series.has_no_data() {
        chart.show_no_data();
    } else {
        chart.set_series(series);
    }
}
