/********************************************************************************
 * Copyright (c) 2026 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

use crate::buffer::TransformBuffer;
use crate::config::ListenerConfig;
use crate::error::ListenerError;
use crate::ingest::batch_dispatch::{BatchDispatcher, ListenerDiagnostics};
use crate::ingest::stream_subscriber::{StreamSettings, StreamSubscriber};
use crate::observability::events;
use crate::runtime::ingestion_scheduler::{DeliveryMode, IngestionScheduler};
use crate::transform::StreamKind;
use crate::transport::TransformTransport;
use std::sync::Arc;
use std::thread::ThreadId;
use std::time::SystemTime;
use tracing::{error, info};
use uuid::Uuid;

const COMPONENT: &str = "transform_listener";

/// Subscribes to the dynamic and static transform topics and feeds every
/// announcement into a shared [`TransformBuffer`].
///
/// With [`ListenerConfig::use_dedicated_thread`] set, the listener owns one
/// background thread delivering batches; the buffer is told so and may let
/// readers block for transforms that have not arrived yet. Otherwise batches
/// are dispatched wherever the middleware invokes the callbacks.
///
/// The buffer is shared, never owned: it must stay usable until the listener
/// is shut down, which holding an `Arc` guarantees.
///
/// Dropping the listener shuts it down: bindings are released and the
/// background thread is joined, so no insert from this listener happens once
/// the drop returns.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use tf_listener::{ListenerConfig, TransformBuffer, TransformListener};
/// # use tf_listener::{BufferError, StreamKind, TransformAnnouncement};
/// # use tf_listener::{BatchListener, SubscriptionBinding, SubscriptionRequest, TransformTransport, TransportError};
/// # use async_trait::async_trait;
/// # use std::sync::atomic::{AtomicBool, Ordering};
/// #
/// # #[derive(Default)]
/// # struct NullBuffer(AtomicBool);
/// # impl TransformBuffer for NullBuffer {
/// #     fn insert_transform(&self, _: &TransformAnnouncement, _: StreamKind) -> Result<(), BufferError> { Ok(()) }
/// #     fn set_using_dedicated_thread(&self, value: bool) { self.0.store(value, Ordering::SeqCst) }
/// #     fn is_using_dedicated_thread(&self) -> bool { self.0.load(Ordering::SeqCst) }
/// # }
/// #
/// # struct NullBinding(String);
/// # impl SubscriptionBinding for NullBinding { fn topic(&self) -> &str { &self.0 } }
/// #
/// # struct NullTransport;
/// # #[async_trait]
/// # impl TransformTransport for NullTransport {
/// #     async fn subscribe(
/// #         &self,
/// #         request: SubscriptionRequest,
/// #         _listener: Arc<dyn BatchListener>,
/// #     ) -> Result<Box<dyn SubscriptionBinding>, TransportError> {
/// #         Ok(Box::new(NullBinding(request.topic)))
/// #     }
/// # }
/// # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
/// let buffer = Arc::new(NullBuffer::default());
/// let shared: Arc<dyn TransformBuffer> = buffer.clone();
/// let listener = TransformListener::new(shared, Arc::new(NullTransport), ListenerConfig::default())
///     .await
///     .unwrap();
///
/// assert!(buffer.is_using_dedicated_thread());
/// assert_eq!(listener.dynamic_topic(), "/tf");
/// drop(listener);
/// # });
/// ```
pub struct TransformListener {
    listener_id: String,
    dispatcher: Arc<BatchDispatcher>,
    scheduler: IngestionScheduler,
    subscriber: StreamSubscriber,
}

impl TransformListener {
    /// Binds both transform topics and, when configured, starts the
    /// dedicated delivery thread.
    ///
    /// Fails outright rather than running degraded: on error no topic stays
    /// bound, no thread is left running and the buffer's dedicated-thread
    /// flag is cleared.
    pub async fn new(
        buffer: Arc<dyn TransformBuffer>,
        transport: Arc<dyn TransformTransport>,
        config: ListenerConfig,
    ) -> Result<Self, ListenerError> {
        let listener_id = Uuid::new_v4().hyphenated().to_string();
        let mode = DeliveryMode::from_flag(config.use_dedicated_thread);

        info!(
            event = events::LISTENER_START,
            component = COMPONENT,
            listener_id = listener_id.as_str(),
            namespace = config.namespace.as_str(),
            mode = ?mode,
            "starting transform listener"
        );

        let namespace = config.normalized_namespace()?;
        let dispatcher = Arc::new(BatchDispatcher::new(&listener_id, buffer));
        let mut scheduler = IngestionScheduler::start(&listener_id, mode, dispatcher.clone())
            .map_err(|err| {
                error!(
                    event = events::LISTENER_START_FAILED,
                    component = COMPONENT,
                    listener_id = listener_id.as_str(),
                    err = %err,
                    "unable to start ingestion scheduler"
                );
                err
            })?;

        let bound = StreamSubscriber::bind(
            &listener_id,
            transport.as_ref(),
            &namespace,
            StreamSettings {
                qos: config.dynamic_qos,
                options: config.dynamic_options,
            },
            StreamSettings {
                qos: config.static_qos,
                options: config.static_options,
            },
            |kind| scheduler.stream_callback(kind),
        )
        .await;

        let subscriber = match bound {
            Ok(subscriber) => subscriber,
            Err(err) => {
                error!(
                    event = events::LISTENER_START_FAILED,
                    component = COMPONENT,
                    listener_id = listener_id.as_str(),
                    err = %err,
                    "unable to bind transform streams"
                );
                dispatcher.close();
                scheduler.abandon();
                return Err(err);
            }
        };

        info!(
            event = events::LISTENER_READY,
            component = COMPONENT,
            listener_id = listener_id.as_str(),
            dynamic_topic = subscriber.topic(StreamKind::Dynamic),
            static_topic = subscriber.topic(StreamKind::Static),
            mode = ?mode,
            "transform listener ready"
        );

        Ok(Self {
            listener_id,
            dispatcher,
            scheduler,
            subscriber,
        })
    }

    /// Listener with the default configuration: `/tf` and `/tf_static`,
    /// default QoS profiles and a dedicated delivery thread.
    pub async fn with_defaults(
        buffer: Arc<dyn TransformBuffer>,
        transport: Arc<dyn TransformTransport>,
    ) -> Result<Self, ListenerError> {
        Self::new(buffer, transport, ListenerConfig::default()).await
    }

    pub fn listener_id(&self) -> &str {
        &self.listener_id
    }

    pub fn delivery_mode(&self) -> DeliveryMode {
        self.scheduler.mode()
    }

    /// Id of the dedicated delivery thread while it is running.
    pub fn executor_thread_id(&self) -> Option<ThreadId> {
        self.scheduler.executor_thread_id()
    }

    pub fn dynamic_topic(&self) -> &str {
        self.subscriber.topic(StreamKind::Dynamic)
    }

    pub fn static_topic(&self) -> &str {
        self.subscriber.topic(StreamKind::Static)
    }

    pub fn buffer(&self) -> &Arc<dyn TransformBuffer> {
        self.dispatcher.buffer()
    }

    pub fn diagnostics(&self) -> ListenerDiagnostics {
        self.dispatcher.diagnostics()
    }

    /// Wall-clock time the most recent batch was processed.
    pub fn last_update(&self) -> Option<SystemTime> {
        self.diagnostics().last_update
    }

    /// True while both streams are bound and batches still reach the buffer.
    pub fn is_running(&self) -> bool {
        self.subscriber.is_bound() && self.scheduler.is_delivering()
    }

    /// Stops ingestion: later batches are dropped, both bindings are
    /// released and the delivery thread is joined. A batch already being
    /// dispatched completes first. Calling it again does nothing.
    pub fn shutdown(&mut self) {
        if !self.subscriber.is_bound() && self.scheduler.executor_thread_id().is_none() {
            return;
        }

        self.dispatcher.close();
        self.subscriber.unbind();
        self.scheduler.shutdown();

        info!(
            event = events::LISTENER_SHUTDOWN,
            component = COMPONENT,
            listener_id = self.listener_id.as_str(),
            "transform listener shut down"
        );
    }
}

impl Drop for TransformListener {
    fn drop(&mut self) {
        self.shutdown();
    }
}
