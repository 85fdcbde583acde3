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

//! Middleware seam: topic subscription and batch delivery.

use crate::qos::{QosProfile, SubscriptionOptions};
use crate::transform::TransformBatch;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum TransportError {
    #[error("unable to subscribe to {topic}: {reason}")]
    SubscribeFailed { topic: String, reason: String },
    #[error("qos on {topic} is not supported: {reason}")]
    UnsupportedQos { topic: String, reason: String },
    #[error("transport is shut down")]
    Closed,
}

/// Everything the middleware needs to bind one topic.
#[derive(Clone, Debug, PartialEq)]
pub struct SubscriptionRequest {
    pub topic: String,
    pub qos: QosProfile,
    pub options: SubscriptionOptions,
}

/// Receives batches delivered on one topic.
#[async_trait]
pub trait BatchListener: Send + Sync {
    async fn on_receive(&self, batch: TransformBatch);
}

/// An active topic binding. Dropping it unbinds the topic.
pub trait SubscriptionBinding: Send + Sync {
    fn topic(&self) -> &str;
}

/// Publish/subscribe middleware the listener binds its topics on.
///
/// Implementations decide on which thread or task
/// [`BatchListener::on_receive`] runs.
#[async_trait]
pub trait TransformTransport: Send + Sync {
    async fn subscribe(
        &self,
        request: SubscriptionRequest,
        listener: Arc<dyn BatchListener>,
    ) -> Result<Box<dyn SubscriptionBinding>, TransportError>;
}
