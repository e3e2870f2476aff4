//! Sinks for diagnostics that have no location.

use std::fmt;
use std::sync::{Mutex, PoisonError};

/// Receives user-facing messages for line-less diagnostics.
pub trait Notifier: fmt::Debug + Send + Sync {
    fn notify(&self, message: &str);
}

/// Emits each notification as a `tracing` error event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, message: &str) {
        tracing::error!(target: "asmbuild::notify", "{message}");
    }
}

/// Buffers notifications so a host can show them later.
#[derive(Debug, Default)]
pub struct CollectingNotifier {
    messages: Mutex<Vec<String>>,
}

impl CollectingNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain every message collected so far.
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.messages.lock().unwrap_or_else(PoisonError::into_inner))
    }

    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Notifier for CollectingNotifier {
    fn notify(&self, message: &str) {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::{CollectingNotifier, Notifier};

    #[test]
    fn take_drains() {
        let notifier = CollectingNotifier::new();
        notifier.notify("could not open <custom.i>");
        assert_eq!(notifier.messages(), vec!["could not open <custom.i>"]);
        assert_eq!(notifier.take().len(), 1);
        assert!(notifier.messages().is_empty());
    }
}
