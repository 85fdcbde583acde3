//! Runtime integration layer.
//!
//! Decides where batches are dispatched (on the middleware's own context or
//! on a dedicated executor thread) and owns that thread's lifecycle, keeping
//! async/threading behavior localized for the rest of the crate.

pub(crate) mod dedicated_executor;
pub(crate) mod executor_runtime;
pub(crate) mod ingestion_scheduler;
