//! Quiet-period debouncing for search input.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time;
use tracing::trace;

pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(300);

/// Collapses bursts of values into one callback per quiet period.
///
/// Only the last value pushed before the quiet period elapses is delivered.
/// Dropping the debouncer cancels anything still pending.
pub struct Debouncer<T> {
    sender: mpsc::UnboundedSender<T>,
    task: JoinHandle<()>,
}

impl<T> Debouncer<T>
where
    T: Send + 'static,
{
    /// Spawn the debounce loop on the current tokio runtime.
    pub fn spawn<F>(quiet: Duration, mut on_settle: F) -> Self
    where
        F: FnMut(T) + Send + 'static,
    {
        let (sender, mut receiver) = mpsc::unbounded_channel::<T>();

        let task = tokio::spawn(async move {
            let mut pending: Option<T> = None;
            loop {
                match pending.take() {
                    None => match receiver.recv().await {
                        Some(value) => pending = Some(value),
                        None => break,
                    },
                    Some(value) => match time::timeout(quiet, receiver.recv()).await {
                        Ok(Some(newer)) => {
                            trace!("debounce window restarted");
                            pending = Some(newer);
                        }
                        Ok(None) => {
                            on_settle(value);
                            break;
                        }
                        Err(_) => on_settle(value),
                    },
                }
            }
        });

        Self { sender, task }
    }

    pub fn push(&self, value: T) {
        // The loop only stops once the debouncer is dropped.
        let _ = self.sender.send(value);
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}
