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

//! Listener configuration, loadable from JSON5.

use crate::error::ConfigError;
use crate::qos::{QosProfile, SubscriptionOptions};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

fn default_use_dedicated_thread() -> bool {
    true
}

fn default_dynamic_qos() -> QosProfile {
    QosProfile::dynamic_listener()
}

fn default_static_qos() -> QosProfile {
    QosProfile::static_listener()
}

fn default_dynamic_options() -> SubscriptionOptions {
    SubscriptionOptions::dynamic_listener()
}

fn default_static_options() -> SubscriptionOptions {
    SubscriptionOptions::static_listener()
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ListenerConfig {
    /// Prefix for the `/tf` and `/tf_static` topics.
    #[serde(default)]
    pub namespace: String,
    #[serde(default = "default_use_dedicated_thread")]
    pub use_dedicated_thread: bool,
    #[serde(default = "default_dynamic_qos")]
    pub dynamic_qos: QosProfile,
    #[serde(default = "default_static_qos")]
    pub static_qos: QosProfile,
    #[serde(default = "default_dynamic_options")]
    pub dynamic_options: SubscriptionOptions,
    #[serde(default = "default_static_options")]
    pub static_options: SubscriptionOptions,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            namespace: String::new(),
            use_dedicated_thread: default_use_dedicated_thread(),
            dynamic_qos: default_dynamic_qos(),
            static_qos: default_static_qos(),
            dynamic_options: default_dynamic_options(),
            static_options: default_static_options(),
        }
    }
}

impl ListenerConfig {
    pub fn caller_driven() -> Self {
        Self {
            use_dedicated_thread: false,
            ..Self::default()
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_dedicated_thread(mut self, use_dedicated_thread: bool) -> Self {
        self.use_dedicated_thread = use_dedicated_thread;
        self
    }

    pub fn from_json5_str(raw: &str) -> Result<Self, ConfigError> {
        json5::from_str(raw).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json5_str(&raw)
    }

    /// Normalized namespace: leading `/` when non-empty, no trailing `/`.
    pub fn normalized_namespace(&self) -> Result<String, ConfigError> {
        normalize_namespace(&self.namespace)
    }
}

pub(crate) fn normalize_namespace(namespace: &str) -> Result<String, ConfigError> {
    if namespace.chars().any(char::is_whitespace) {
        return Err(ConfigError::InvalidNamespace {
            namespace: namespace.to_string(),
            reason: "contains whitespace".to_string(),
        });
    }
    if namespace.contains("//") {
        return Err(ConfigError::InvalidNamespace {
            namespace: namespace.to_string(),
            reason: "contains an empty segment".to_string(),
        });
    }

    let trimmed = namespace.trim_end_matches('/');
    if trimmed.is_empty() || trimmed.starts_with('/') {
        Ok(trimmed.to_string())
    } else {
        Ok(format!("/{trimmed}"))
    }
}
