//! Listener adapter turning a per-stream callback into a [`BatchListener`].

use crate::transform::TransformBatch;
use crate::transport::BatchListener;
use async_trait::async_trait;
use std::sync::Arc;

/// Callback bound to one stream. The stream kind is captured at creation.
pub(crate) type StreamCallback = Arc<dyn Fn(TransformBatch) + Send + Sync>;

#[derive(Clone)]
pub(crate) struct StreamCallbackListener {
    callback: StreamCallback,
}

impl StreamCallbackListener {
    pub(crate) fn new(callback: StreamCallback) -> Self {
        Self { callback }
    }
}

#[async_trait]
impl BatchListener for StreamCallbackListener {
    async fn on_receive(&self, batch: TransformBatch) {
        (self.callback)(batch);
    }
}

#[cfg(test)]
mod tests {
    use super::StreamCallbackListener;
    use crate::transform::{TransformAnnouncement, TransformBatch};
    use crate::transport::BatchListener;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn on_receive_invokes_callback_with_the_batch() {
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_in_callback = seen.clone();
        let listener = StreamCallbackListener::new(Arc::new(move |batch: TransformBatch| {
            seen_in_callback.fetch_add(batch.len(), Ordering::SeqCst);
        }));

        listener
            .on_receive(TransformBatch::new(vec![
                TransformAnnouncement::new("map", "odom", Duration::ZERO),
                TransformAnnouncement::new("odom", "base", Duration::ZERO),
            ]))
            .await;

        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }
}
