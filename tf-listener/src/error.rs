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

use crate::transport::TransportError;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("unable to parse config: {0}")]
    Parse(String),
    #[error("invalid namespace {namespace:?}: {reason}")]
    InvalidNamespace { namespace: String, reason: String },
}

/// Construction failures of a [`TransformListener`](crate::TransformListener).
///
/// A listener never starts in a degraded mode: any of these leaves no thread
/// running, no topic bound and the buffer's dedicated-thread flag unset.
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to bind {topic}: {source}")]
    Subscribe {
        topic: String,
        #[source]
        source: TransportError,
    },
    #[error("failed to build the dedicated executor runtime: {0}")]
    ExecutorRuntime(#[source] io::Error),
    #[error("failed to spawn the dedicated executor thread: {0}")]
    ExecutorSpawn(#[source] io::Error),
}
