//! Coalescing of rapid local edits.

use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;

/// Run `f` with the latest value from `rx` once `delay` passes without a newer one.
///
/// When every sender is dropped a pending value is flushed immediately and the
/// future completes.
pub async fn debounce<T, F, Fut>(mut rx: mpsc::UnboundedReceiver<T>, delay: Duration, mut f: F)
where
    F: FnMut(T) -> Fut,
    Fut: Future<Output = ()>,
{
    let mut pending: Option<T> = None;
    loop {
        let Some(value) = pending.take() else {
            match rx.recv().await {
                Some(value) => {
                    pending = Some(value);
                    continue;
                }
                None => return,
            }
        };

        let quiet = tokio::select! {
            next = rx.recv() => match next {
                Some(newer) => {
                    pending = Some(newer);
                    continue;
                }
                None => false,
            },
            () = tokio::time::sleep(delay) => true,
        };

        f(value).await;
        if !quiet {
            return;
        }
    }
}

/// Sending half of a debounced pipeline.
#[derive(Debug)]
pub struct Debouncer<T> {
    tx: mpsc::UnboundedSender<T>,
}

impl<T> Clone for Debouncer<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T> Debouncer<T> {
    /// Returns the handle and the driver future; spawn or await the driver.
    ///
    /// The driver finishes after every handle is dropped.
    pub fn new<F, Fut>(delay: Duration, f: F) -> (Self, impl Future<Output = ()>)
    where
        F: FnMut(T) -> Fut,
        Fut: Future<Output = ()>,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, debounce(rx, delay, f))
    }

    /// Queue a value, replacing any value still waiting.
    ///
    /// Returns `false` if the driver has stopped.
    pub fn push(&self, value: T) -> bool {
        self.tx.send(value).is_ok()
    }
}
