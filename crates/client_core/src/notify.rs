use std::{
    sync::{Mutex, PoisonError},
    time::{Duration, Instant},
};

use tracing::debug;

use crate::NotificationSink;

pub const DEFAULT_DURATION: Duration = Duration::from_millis(6000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Error,
    Success,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub kind: ToastKind,
    pub message: String,
    pub link: Option<String>,
    pub shown_at: Instant,
}

impl Toast {
    fn is_visible_at(&self, now: Instant, duration: Duration) -> bool {
        now.saturating_duration_since(self.shown_at) < duration
    }
}

#[derive(Default)]
struct Slots {
    error: Option<Toast>,
    success: Option<Toast>,
}

impl Slots {
    fn slot(&mut self, kind: ToastKind) -> &mut Option<Toast> {
        match kind {
            ToastKind::Error => &mut self.error,
            ToastKind::Success => &mut self.success,
        }
    }
}

/// In-process [`NotificationSink`] holding at most one error and one success toast.
///
/// A new message replaces the one of the same kind. Toasts expire `duration`
/// after they were shown.
pub struct ToastBoard {
    slots: Mutex<Slots>,
    duration: Duration,
}

impl Default for ToastBoard {
    fn default() -> Self {
        Self::new(DEFAULT_DURATION)
    }
}

impl ToastBoard {
    pub fn new(duration: Duration) -> Self {
        Self {
            slots: Mutex::new(Slots::default()),
            duration,
        }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    fn post(&self, kind: ToastKind, message: &str, link: Option<&str>) {
        let toast = Toast {
            kind,
            message: message.to_string(),
            link: link.map(str::to_string),
            shown_at: Instant::now(),
        };
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        *slots.slot(kind) = Some(toast);
    }

    fn visible(&self, kind: ToastKind, now: Instant) -> Option<Toast> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        let slot = slots.slot(kind);
        if slot
            .as_ref()
            .is_some_and(|toast| !toast.is_visible_at(now, self.duration))
        {
            *slot = None;
        }
        slot.clone()
    }

    /// Error first, then success.
    pub fn visible_at(&self, now: Instant) -> Vec<Toast> {
        [ToastKind::Error, ToastKind::Success]
            .into_iter()
            .filter_map(|kind| self.visible(kind, now))
            .collect()
    }

    pub fn visible_error(&self) -> Option<Toast> {
        self.visible(ToastKind::Error, Instant::now())
    }

    pub fn visible_success(&self) -> Option<Toast> {
        self.visible(ToastKind::Success, Instant::now())
    }

    pub fn dismiss_error(&self) {
        self.dismiss(ToastKind::Error);
    }

    pub fn dismiss_success(&self) {
        self.dismiss(ToastKind::Success);
    }

    fn dismiss(&self, kind: ToastKind) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        if slots.slot(kind).take().is_some() {
            debug!(?kind, "toast dismissed");
        }
    }

    /// Returns the visible toasts and clears both slots.
    pub fn take_visible(&self) -> Vec<Toast> {
        let visible = self.visible_at(Instant::now());
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        *slots = Slots::default();
        visible
    }
}

impl NotificationSink for ToastBoard {
    fn show_error(&self, message: &str) {
        self.post(ToastKind::Error, message, None);
    }

    fn show_success(&self, message: &str, link: Option<&str>) {
        self.post(ToastKind::Success, message, link);
    }
}

#[cfg(test)]
#[path = "tests/notify_tests.rs"]
mod tests;
