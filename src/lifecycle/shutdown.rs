//! Shutdown coordination for processors.
//!
//! [`StopGroup`] is the synchronization group shared by every processor stop.
//! Each processor receives a [`StopHandle`] registered before its `stop` runs;
//! the group's `wait` resolves once every handle has been released.

use std::sync::Arc;

use futures_util::future::join_all;
use tokio::sync::mpsc;

use crate::lifecycle::processor::{Processor, ProcessorFailure};
use crate::observability::metrics;

/// Group that waits for every registered [`StopHandle`] to be released.
///
/// Built on an mpsc channel where nothing is ever sent: each handle owns a
/// sender clone, and the receiver observes `None` only after the last sender
/// is gone. Registration and completion can therefore never race the wait.
pub struct StopGroup {
    tx: mpsc::Sender<()>,
    rx: mpsc::Receiver<()>,
}

impl StopGroup {
    /// Create an empty group.
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel(1);
        Self { tx, rx }
    }

    /// Register one participant.
    pub fn register(&self) -> StopHandle {
        StopHandle {
            _tx: self.tx.clone(),
        }
    }

    /// Wait until every registered handle has been released.
    pub async fn wait(self) {
        let StopGroup { tx, mut rx } = self;
        drop(tx);
        let _ = rx.recv().await;
    }
}

impl Default for StopGroup {
    fn default() -> Self {
        Self::new()
    }
}

/// Completion signal handed to [`Processor::stop`].
///
/// Released exactly once, by [`StopHandle::done`] or by drop.
#[derive(Debug)]
pub struct StopHandle {
    _tx: mpsc::Sender<()>,
}

impl StopHandle {
    /// Signal that the processor has fully stopped.
    pub fn done(self) {}
}

/// Stop every processor concurrently and wait for all of them.
///
/// Each processor is registered on `group` before its `stop` is issued. The
/// call returns once every `stop` has returned and every handle has been
/// released. Failures come back in registration order; a panicking `stop`
/// is reported as a failure too.
pub async fn stop_all(processors: &[Arc<dyn Processor>], group: StopGroup) -> Vec<ProcessorFailure> {
    let tasks = processors
        .iter()
        .map(|processor| {
            let handle = group.register();
            let processor = Arc::clone(processor);
            tokio::spawn(async move { processor.stop(handle).await })
        })
        .collect::<Vec<_>>();

    let mut failures = Vec::new();
    for (index, (processor, result)) in processors
        .iter()
        .zip(join_all(tasks).await)
        .enumerate()
    {
        let error = match result {
            Ok(Ok(())) => {
                tracing::debug!(processor = processor.name(), "Processor stop returned");
                continue;
            }
            Ok(Err(error)) => error,
            Err(join_error) => join_error.into(),
        };
        tracing::error!(
            processor = processor.name(),
            error = %error,
            "Unable to stop processor"
        );
        failures.push(ProcessorFailure::new(index, processor.name(), error));
    }

    group.wait().await;
    metrics::record_processor_failures("stop", failures.len());
    failures
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn wait_returns_immediately_without_participants() {
        let group = StopGroup::new();
        tokio::time::timeout(Duration::from_secs(1), group.wait())
            .await
            .expect("empty group should not block");
    }

    #[tokio::test]
    async fn wait_blocks_until_every_handle_is_released() {
        let group = StopGroup::new();
        let first = group.register();
        let second = group.register();

        let waiter = tokio::spawn(group.wait());
        first.done();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        drop(second);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("group should resolve after the last handle")
            .unwrap();
    }

    #[tokio::test]
    async fn handle_released_before_wait_is_not_missed() {
        let group = StopGroup::new();
        group.register().done();
        tokio::time::timeout(Duration::from_secs(1), group.wait())
            .await
            .expect("early release must not be lost");
    }
}
