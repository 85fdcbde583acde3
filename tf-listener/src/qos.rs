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

//! Quality-of-service profiles and subscription options for the two streams.

use serde::{Deserialize, Serialize};

/// Default history depth of the dynamic stream subscription.
pub const DYNAMIC_LISTENER_DEPTH: usize = 100;
/// Default history depth of the static stream subscription.
pub const STATIC_LISTENER_DEPTH: usize = 1;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum History {
    #[default]
    KeepLast,
    KeepAll,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reliability {
    #[default]
    Reliable,
    BestEffort,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Durability {
    #[default]
    Volatile,
    /// Late subscribers receive previously published messages.
    TransientLocal,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QosProfile {
    #[serde(default)]
    pub history: History,
    pub depth: usize,
    #[serde(default)]
    pub reliability: Reliability,
    #[serde(default)]
    pub durability: Durability,
}

impl QosProfile {
    pub const fn keep_last(depth: usize) -> Self {
        Self {
            history: History::KeepLast,
            depth,
            reliability: Reliability::Reliable,
            durability: Durability::Volatile,
        }
    }

    pub const fn best_effort(mut self) -> Self {
        self.reliability = Reliability::BestEffort;
        self
    }

    pub const fn reliable(mut self) -> Self {
        self.reliability = Reliability::Reliable;
        self
    }

    pub const fn transient_local(mut self) -> Self {
        self.durability = Durability::TransientLocal;
        self
    }

    /// Profile for `/tf`: deep history, accepts best-effort publishers.
    pub const fn dynamic_listener() -> Self {
        Self::keep_last(DYNAMIC_LISTENER_DEPTH).best_effort()
    }

    /// Profile for `/tf_static`: latched so late subscribers still get the
    /// static tree.
    pub const fn static_listener() -> Self {
        Self::keep_last(STATIC_LISTENER_DEPTH)
            .reliable()
            .transient_local()
    }

    pub fn is_latched(&self) -> bool {
        self.durability == Durability::TransientLocal
    }
}

/// QoS policies a deployment may override through middleware parameters.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QosPolicyKind {
    Depth,
    Durability,
    History,
    Reliability,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntraProcessSetting {
    Enable,
    #[default]
    Disable,
    /// Defer to the middleware's default.
    NodeDefault,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubscriptionOptions {
    #[serde(default)]
    pub intra_process: IntraProcessSetting,
    #[serde(default)]
    pub qos_overriding: Vec<QosPolicyKind>,
}

impl SubscriptionOptions {
    pub fn dynamic_listener() -> Self {
        Self {
            intra_process: IntraProcessSetting::Disable,
            qos_overriding: vec![
                QosPolicyKind::Depth,
                QosPolicyKind::Durability,
                QosPolicyKind::History,
                QosPolicyKind::Reliability,
            ],
        }
    }

    // Durability stays fixed: the static stream only works when latched.
    pub fn static_listener() -> Self {
        Self {
            intra_process: IntraProcessSetting::Disable,
            qos_overriding: vec![
                QosPolicyKind::Depth,
                QosPolicyKind::History,
                QosPolicyKind::Reliability,
            ],
        }
    }

    pub fn allows_override(&self, policy: QosPolicyKind) -> bool {
        self.qos_overriding.contains(&policy)
    }
}
