#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Rendering capabilities used by the crime scope controllers.
//!
//! The map engine, charts, modal, report form, counters and toast surface
//! are external widgets. Controllers only see them through the small traits
//! in this crate, so every controller can run headless.
//!
//! - [`map`]: the map widget, its events and the shapes it renders
//! - [`chart`]: charts and text counters for the dashboard
//! - [`form`]: the report modal and form
//! - [`toast`]: the toast surface and the [`toast::Toaster`] helper
//! - [`headless`]: in-memory widgets that log what they would render
//!
//! All widget methods take `&self`. Implementations keep their state in
//! `Cell`/`RefCell` and must not call back into a controller while holding
//! a borrow.

pub mod chart;
pub mod form;
pub mod headless;
pub mod map;
pub mod toast;

use async_trait::async_trait;
use thiserror::Error;

/// Errors from mounting a widget.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MountError {
    /// No element with the requested id exists.
    #[error("Container element '{id}' not found")]
    ContainerMissing {
        /// Requested container id.
        id: String,
    },

    /// The rendering library did not load.
    #[error("Rendering library unavailable: {name}")]
    LibraryUnavailable {
        /// Library name.
        name: String,
    },
}

/// Something that shows a busy indicator while work is in progress.
pub trait LoadingIndicator {
    /// Shows or hides the indicator.
    fn set_loading(&self, loading: bool);
}

/// A view that can be asked to reload its data.
///
/// Refreshes are best-effort: implementations report their own failures
/// and never propagate them to the caller.
#[async_trait(?Send)]
pub trait Refresh {
    /// Reloads and re-renders.
    async fn refresh(&self);
}
