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

//! # tf-listener
//!
//! `tf-listener` ingests coordinate-frame transforms from the dynamic `/tf`
//! and latched `/tf_static` topics into a shared, time-indexed
//! [`TransformBuffer`].
//!
//! The middleware and the buffer are collaborators behind traits:
//! [`TransformTransport`] binds topics and delivers [`TransformBatch`]es,
//! [`TransformBuffer`] stores announcements and answers reader queries.
//! The listener demultiplexes the two streams (tagging every insert with its
//! [`StreamKind`]) and, optionally, runs a dedicated delivery thread.
//!
//! ## Delivery modes
//!
//! - [`DeliveryMode::DedicatedThread`] (default): one background thread runs
//!   a single-threaded loop fed only by the two stream callbacks. The buffer's
//!   dedicated-thread flag is set before the thread starts, so readers may
//!   block waiting for future transforms.
//! - [`DeliveryMode::CallerDriven`]: no thread is created; batches are
//!   dispatched on whatever task or thread the middleware invokes the
//!   callbacks from.
//!
//! ## Internal architecture map
//!
//! - API facade: [`TransformListener`], [`ListenerConfig`]
//! - Ingestion: stream bindings and the shared batch dispatcher
//! - Runtime: delivery mode selection and the dedicated executor thread
//!
//! ## Observability model
//!
//! The crate uses `tracing` for logs/events with the event names in
//! [`observability::events`]. Library code never installs a global
//! subscriber; binaries and tests initialize `tracing_subscriber` themselves.

mod buffer;
pub use buffer::{BufferError, TransformBuffer};

mod config;
pub use config::ListenerConfig;

mod error;
pub use error::{ConfigError, ListenerError};

mod ingest;
pub use ingest::batch_dispatch::ListenerDiagnostics;
pub use ingest::stream_subscriber::{DYNAMIC_TOPIC, STATIC_TOPIC};

mod listener;
pub use listener::TransformListener;

#[doc(hidden)]
pub mod observability;

pub mod qos;

mod runtime;
pub use runtime::ingestion_scheduler::DeliveryMode;

mod transform;
pub use transform::{Quaternion, StreamKind, TransformAnnouncement, TransformBatch, Vector3};

mod transport;
pub use transport::{
    BatchListener, SubscriptionBinding, SubscriptionRequest, TransformTransport, TransportError,
};
