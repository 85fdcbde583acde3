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

//! Binds the dynamic and static transform topics.

use crate::error::ListenerError;
use crate::ingest::stream_callback::{StreamCallback, StreamCallbackListener};
use crate::observability::events;
use crate::qos::{QosProfile, SubscriptionOptions};
use crate::transform::StreamKind;
use crate::transport::{SubscriptionBinding, SubscriptionRequest, TransformTransport};
use std::sync::Arc;
use tracing::{debug, info, warn};

const COMPONENT: &str = "stream_subscriber";

pub const DYNAMIC_TOPIC: &str = "/tf";
pub const STATIC_TOPIC: &str = "/tf_static";

/// Topic for `kind` under an already normalized namespace.
pub(crate) fn topic_for(namespace: &str, kind: StreamKind) -> String {
    let topic = match kind {
        StreamKind::Dynamic => DYNAMIC_TOPIC,
        StreamKind::Static => STATIC_TOPIC,
    };
    format!("{namespace}{topic}")
}

/// Per-stream subscription settings.
pub(crate) struct StreamSettings {
    pub(crate) qos: QosProfile,
    pub(crate) options: SubscriptionOptions,
}

/// Holds exactly one binding per stream kind for the listener's lifetime.
pub(crate) struct StreamSubscriber {
    listener_id: String,
    dynamic_topic: String,
    static_topic: String,
    dynamic_binding: Option<Box<dyn SubscriptionBinding>>,
    static_binding: Option<Box<dyn SubscriptionBinding>>,
}

impl StreamSubscriber {
    /// Binds `/tf` then `/tf_static`. If the second bind fails the first
    /// binding is released before the error is returned.
    pub(crate) async fn bind<F>(
        listener_id: &str,
        transport: &dyn TransformTransport,
        namespace: &str,
        dynamic: StreamSettings,
        r#static: StreamSettings,
        callback_for: F,
    ) -> Result<Self, ListenerError>
    where
        F: Fn(StreamKind) -> StreamCallback,
    {
        let dynamic_topic = topic_for(namespace, StreamKind::Dynamic);
        let static_topic = topic_for(namespace, StreamKind::Static);

        let dynamic_binding = Self::bind_stream(
            listener_id,
            transport,
            &dynamic_topic,
            StreamKind::Dynamic,
            dynamic,
            callback_for(StreamKind::Dynamic),
        )
        .await?;
        let static_binding = Self::bind_stream(
            listener_id,
            transport,
            &static_topic,
            StreamKind::Static,
            r#static,
            callback_for(StreamKind::Static),
        )
        .await?;

        Ok(Self {
            listener_id: listener_id.to_string(),
            dynamic_topic,
            static_topic,
            dynamic_binding: Some(dynamic_binding),
            static_binding: Some(static_binding),
        })
    }

    async fn bind_stream(
        listener_id: &str,
        transport: &dyn TransformTransport,
        topic: &str,
        kind: StreamKind,
        settings: StreamSettings,
        callback: StreamCallback,
    ) -> Result<Box<dyn SubscriptionBinding>, ListenerError> {
        let request = SubscriptionRequest {
            topic: topic.to_string(),
            qos: settings.qos,
            options: settings.options,
        };
        let listener = Arc::new(StreamCallbackListener::new(callback));

        match transport.subscribe(request, listener).await {
            Ok(binding) => {
                info!(
                    event = events::SUBSCRIBE_OK,
                    component = COMPONENT,
                    listener_id,
                    topic,
                    stream = kind.as_str(),
                    depth = settings.qos.depth,
                    latched = settings.qos.is_latched(),
                    "bound transform stream"
                );
                Ok(binding)
            }
            Err(err) => {
                warn!(
                    event = events::SUBSCRIBE_FAILED,
                    component = COMPONENT,
                    listener_id,
                    topic,
                    stream = kind.as_str(),
                    err = %err,
                    "unable to bind transform stream"
                );
                Err(ListenerError::Subscribe {
                    topic: topic.to_string(),
                    source: err,
                })
            }
        }
    }

    pub(crate) fn topic(&self, kind: StreamKind) -> &str {
        match kind {
            StreamKind::Dynamic => &self.dynamic_topic,
            StreamKind::Static => &self.static_topic,
        }
    }

    pub(crate) fn is_bound(&self) -> bool {
        self.dynamic_binding.is_some() || self.static_binding.is_some()
    }

    /// Releases both bindings. Safe to call repeatedly.
    pub(crate) fn unbind(&mut self) {
        for binding in [self.dynamic_binding.take(), self.static_binding.take()]
            .into_iter()
            .flatten()
        {
            debug!(
                event = events::UNSUBSCRIBE,
                component = COMPONENT,
                listener_id = self.listener_id.as_str(),
                topic = binding.topic(),
                "releasing transform stream binding"
            );
            drop(binding);
        }
    }
}

impl Drop for StreamSubscriber {
    fn drop(&mut self) {
        self.unbind();
    }
}
