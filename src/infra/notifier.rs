use tracing::{error, info};

use crate::app::ports::NotifierPort;

/// Notifier for headless runs: notifications become log lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl NotifierPort for LogNotifier {
    fn notify_error(&self, message: &str) {
        error!(target: "roster_sync::notify", "{}", message);
    }

    fn notify_info(&self, message: &str) {
        info!(target: "roster_sync::notify", "{}", message);
    }
}
