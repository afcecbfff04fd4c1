//! Toast notifications.
//!
//! [`Toaster`] is the one helper every controller shares. It shows a
//! message on a [`ToastSurface`] and removes it again after a duration.
//! Timers run as local tasks, so [`Toaster::notify`] must be called from
//! inside a [`tokio::task::LocalSet`].

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Duration;

use strum_macros::{AsRefStr, Display};
use tokio::task::JoinHandle;

/// Identifies one shown toast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ToastId(u64);

impl fmt::Display for ToastId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "toast-{}", self.0)
    }
}

/// Visual level of a toast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum ToastLevel {
    /// Something completed.
    Success,
    /// Neutral information.
    Info,
    /// Degraded but usable, e.g. fallback data.
    Warning,
    /// Something failed.
    Danger,
}

impl ToastLevel {
    const fn log_level(self) -> log::Level {
        match self {
            Self::Success | Self::Info => log::Level::Info,
            Self::Warning => log::Level::Warn,
            Self::Danger => log::Level::Error,
        }
    }
}

/// Where toasts are drawn.
pub trait ToastSurface {
    /// Draws a toast.
    fn show(&self, id: ToastId, message: &str, level: ToastLevel);

    /// Removes a toast. Ids that are not shown are ignored.
    fn remove(&self, id: ToastId);
}

struct Inner {
    surface: Rc<dyn ToastSurface>,
    default_duration: Duration,
    next_id: Cell<u64>,
    timers: RefCell<BTreeMap<ToastId, JoinHandle<()>>>,
}

impl Inner {
    fn expire(&self, id: ToastId) {
        let removed = self.timers.borrow_mut().remove(&id).is_some();
        if removed {
            self.surface.remove(id);
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        for handle in self.timers.get_mut().values() {
            handle.abort();
        }
    }
}

/// Shows toasts and removes them when they expire.
///
/// Cloning is cheap and every clone shares the same surface and id
/// sequence.
#[derive(Clone)]
pub struct Toaster {
    inner: Rc<Inner>,
}

impl fmt::Debug for Toaster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Toaster")
            .field("default_duration", &self.inner.default_duration)
            .field("active", &self.active_count())
            .finish_non_exhaustive()
    }
}

impl Toaster {
    /// Creates a toaster drawing on `surface`.
    #[must_use]
    pub fn new(surface: Rc<dyn ToastSurface>, default_duration: Duration) -> Self {
        Self {
            inner: Rc::new(Inner {
                surface,
                default_duration,
                next_id: Cell::new(1),
                timers: RefCell::new(BTreeMap::new()),
            }),
        }
    }

    /// Shows `message` and schedules its removal after `duration` (or the
    /// default duration). Toasts are never deduplicated.
    ///
    /// # Panics
    ///
    /// Panics if called outside a [`tokio::task::LocalSet`].
    pub fn notify(&self, message: &str, level: ToastLevel, duration: Option<Duration>) -> ToastId {
        let id = ToastId(self.inner.next_id.get());
        self.inner.next_id.set(id.0 + 1);

        log::log!(level.log_level(), "[{level}] {message}");
        self.inner.surface.show(id, message, level);

        let duration = duration.unwrap_or(self.inner.default_duration);
        let inner: Weak<Inner> = Rc::downgrade(&self.inner);
        let handle = tokio::task::spawn_local(async move {
            tokio::time::sleep(duration).await;
            if let Some(inner) = inner.upgrade() {
                inner.expire(id);
            }
        });
        self.inner.timers.borrow_mut().insert(id, handle);

        id
    }

    /// Removes a toast before it expires.
    pub fn dismiss(&self, id: ToastId) {
        let handle = self.inner.timers.borrow_mut().remove(&id);
        if let Some(handle) = handle {
            handle.abort();
            self.inner.surface.remove(id);
        }
    }

    /// Success toast with the default duration.
    pub fn success(&self, message: &str) -> ToastId {
        self.notify(message, ToastLevel::Success, None)
    }

    /// Info toast with the default duration.
    pub fn info(&self, message: &str) -> ToastId {
        self.notify(message, ToastLevel::Info, None)
    }

    /// Warning toast with the default duration.
    pub fn warning(&self, message: &str) -> ToastId {
        self.notify(message, ToastLevel::Warning, None)
    }

    /// Danger toast with the default duration.
    pub fn danger(&self, message: &str) -> ToastId {
        self.notify(message, ToastLevel::Danger, None)
    }

    /// Number of toasts currently shown.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.inner.timers.borrow().len()
    }
}
