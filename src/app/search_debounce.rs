use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Delays filter application until input has been quiet for `window`.
///
/// Each submission cancels the one still pending, so only the last value submitted within the
/// window reaches the receiver. Must be used inside a tokio runtime.
pub struct FilterDebouncer<T> {
    window: Duration,
    sender: mpsc::UnboundedSender<T>,
    pending: Option<JoinHandle<()>>,
}

impl<T: Send + 'static> FilterDebouncer<T> {
    pub fn new(window: Duration, sender: mpsc::UnboundedSender<T>) -> Self {
        Self {
            window,
            sender,
            pending: None,
        }
    }

    /// Debouncer plus the receiving end its settled values are delivered to.
    pub fn channel(window: Duration) -> (Self, mpsc::UnboundedReceiver<T>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self::new(window, sender), receiver)
    }

    pub fn submit(&mut self, value: T) {
        self.cancel();
        let sender = self.sender.clone();
        let window = self.window;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(window).await;
            if sender.send(value).is_err() {
                debug!("Debounced value dropped: receiver closed");
            }
        }));
    }

    /// Drop the pending submission, if any.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

impl<T> Drop for FilterDebouncer<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}
