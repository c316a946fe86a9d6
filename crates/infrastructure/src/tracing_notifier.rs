//! Notifier that writes user-facing messages to the tracing output.

use celoris_application::Notifier;
use tracing::{error, info};

/// Notifier for headless runs. Success messages log at info, errors at error.
#[derive(Debug, Clone, Default)]
pub struct TracingNotifier;

impl TracingNotifier {
    /// Creates a new tracing notifier.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Notifier for TracingNotifier {
    fn success(&self, message: &str) {
        info!(notification = message, "notify success");
    }

    fn error(&self, message: &str) {
        error!(notification = message, "notify error");
    }
}
