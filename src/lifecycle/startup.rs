//! Startup orchestration.
//!
//! # Responsibilities
//! - Start every registered processor in registration order
//! - Collect every failure instead of stopping at the first one
//!
//! # Design Decisions
//! - Processors start sequentially, listeners start after all processors
//! - Each processor gets its own background token, never the run token

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::lifecycle::processor::{Processor, ProcessorFailure};
use crate::observability::metrics;

/// Start every processor in order, returning all failures.
///
/// An empty result means every processor started.
pub async fn start_all(processors: &[Arc<dyn Processor>]) -> Vec<ProcessorFailure> {
    let mut failures = Vec::new();

    for (index, processor) in processors.iter().enumerate() {
        let ctx = CancellationToken::new();
        match processor.start(ctx).await {
            Ok(()) => {
                tracing::debug!(processor = processor.name(), "Processor started");
            }
            Err(error) => {
                tracing::error!(
                    processor = processor.name(),
                    error = %error,
                    "Unable to start processor"
                );
                failures.push(ProcessorFailure::new(index, processor.name(), error));
            }
        }
    }

    metrics::record_processor_failures("start", failures.len());
    failures
}
