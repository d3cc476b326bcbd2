//! Background processor contract.
//!
//! A processor is any unit of background work with its own start/stop
//! lifecycle: a queue consumer, a cache warmer, a scheduler. The foundation
//! never looks inside one; it only calls `start` and `stop` at the right time.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::lifecycle::shutdown::StopHandle;

/// Boxed error returned by external collaborators.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// An independently startable and stoppable unit of background work.
///
/// # Contract
/// - `start` receives a fresh token that the foundation never cancels. Processors
///   are told to stop through `stop`, not through that token.
/// - `stop` may be called even if `start` failed or never finished.
/// - `stop` must release its [`StopHandle`] exactly once, either by calling
///   [`StopHandle::done`] or by dropping it, once its internal work has wound down.
///   The handle may be moved into a spawned task and released later.
#[async_trait]
pub trait Processor: Send + Sync {
    /// Name used in logs and failure reports.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Begin background work.
    async fn start(&self, ctx: CancellationToken) -> Result<(), BoxError>;

    /// Request the processor to stop and release `done` once it has.
    async fn stop(&self, done: StopHandle) -> Result<(), BoxError>;
}

/// A failure reported by one processor, tagged with that processor's name.
#[derive(Debug, thiserror::Error)]
#[error("processor {processor}: {source}")]
pub struct ProcessorFailure {
    /// Position of the processor in registration order.
    pub index: usize,
    /// Processor name as reported by [`Processor::name`].
    pub processor: String,
    #[source]
    pub source: BoxError,
}

impl ProcessorFailure {
    pub(crate) fn new(index: usize, processor: &str, source: BoxError) -> Self {
        Self {
            index,
            processor: processor.to_string(),
            source,
        }
    }
}
