//! Ingestion layer.
//!
//! Owns the two stream bindings and the shared dispatch of delivered batches
//! into the transform buffer. Each binding carries a callback with its
//! stream kind fixed at registration; both end up in one dispatcher.

pub(crate) mod batch_dispatch;
pub(crate) mod stream_callback;
pub(crate) mod stream_subscriber;
