/********************************************************************************
 * Copyright (c) 2024 Contributors to the Eclipse Foundation
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

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tf_listener::qos::{Durability, IntraProcessSetting};
use tf_listener::{
    BatchListener, SubscriptionBinding, SubscriptionRequest, TransformBatch, TransformTransport,
    TransportError,
};
use tracing::debug;

struct Subscriber {
    id: u64,
    listener: Arc<dyn BatchListener>,
}

#[derive(Default)]
struct BusState {
    next_id: u64,
    subscribers: HashMap<String, Vec<Subscriber>>,
    latched: HashMap<String, TransformBatch>,
    failing_topics: HashSet<String>,
    requests: Vec<SubscriptionRequest>,
}

type SharedBusState = Arc<Mutex<BusState>>;

fn lock(state: &Mutex<BusState>) -> MutexGuard<'_, BusState> {
    match state.lock() {
        Ok(state) => state,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Intra-process publish/subscribe bus.
///
/// Batches are delivered inside [`publish`](InMemoryBus::publish) on the
/// publisher's task, one subscriber after the other. Latched publishes are
/// kept (depth 1) and replayed to later transient-local subscribers.
#[derive(Clone)]
pub struct InMemoryBus {
    name: Arc<String>,
    state: SharedBusState,
}

impl InMemoryBus {
    pub fn new(name: &str) -> Self {
        Self {
            name: Arc::new(name.to_string()),
            state: Arc::new(Mutex::new(BusState::default())),
        }
    }

    /// Publishes `batch` to the current subscribers of `topic`.
    pub async fn publish(&self, topic: &str, batch: TransformBatch) -> usize {
        let listeners = self.listeners_for(topic);
        debug!(
            "{}: publishing {} transforms on {topic} to {} subscribers",
            self.name,
            batch.len(),
            listeners.len()
        );
        for listener in listeners.iter() {
            listener.on_receive(batch.clone()).await;
        }
        listeners.len()
    }

    /// Publishes `batch` and keeps it for transient-local late joiners.
    pub async fn publish_latched(&self, topic: &str, batch: TransformBatch) -> usize {
        lock(&self.state)
            .latched
            .insert(topic.to_string(), batch.clone());
        self.publish(topic, batch).await
    }

    /// Every later subscription to `topic` fails.
    pub fn fail_subscriptions_on(&self, topic: &str) {
        lock(&self.state).failing_topics.insert(topic.to_string());
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        lock(&self.state)
            .subscribers
            .get(topic)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// All subscription requests seen, including failed ones.
    pub fn subscription_requests(&self) -> Vec<SubscriptionRequest> {
        lock(&self.state).requests.clone()
    }

    fn listeners_for(&self, topic: &str) -> Vec<Arc<dyn BatchListener>> {
        lock(&self.state)
            .subscribers
            .get(topic)
            .map(|subscribers| subscribers.iter().map(|s| s.listener.clone()).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl TransformTransport for InMemoryBus {
    async fn subscribe(
        &self,
        request: SubscriptionRequest,
        listener: Arc<dyn BatchListener>,
    ) -> Result<Box<dyn SubscriptionBinding>, TransportError> {
        let topic = request.topic.clone();
        let durability = request.qos.durability;

        let (id, replay) = {
            let mut state = lock(&self.state);
            state.requests.push(request.clone());

            if state.failing_topics.contains(&topic) {
                return Err(TransportError::SubscribeFailed {
                    topic,
                    reason: format!("{} refuses this topic", self.name),
                });
            }
            if request.options.intra_process == IntraProcessSetting::Enable
                && durability == Durability::TransientLocal
            {
                return Err(TransportError::UnsupportedQos {
                    topic,
                    reason: "intra-process delivery does not support transient-local durability"
                        .to_string(),
                });
            }

            state.next_id += 1;
            let id = state.next_id;
            state.subscribers.entry(topic.clone()).or_default().push(Subscriber {
                id,
                listener: listener.clone(),
            });

            let replay = (durability == Durability::TransientLocal)
                .then(|| state.latched.get(&topic).cloned())
                .flatten();
            (id, replay)
        };

        debug!("{}: subscriber {id} bound to {topic}", self.name);

        if let Some(batch) = replay {
            debug!("{}: replaying latched batch on {topic} to {id}", self.name);
            listener.on_receive(batch).await;
        }

        Ok(Box::new(BusSubscription {
            id,
            topic,
            state: Arc::downgrade(&self.state),
        }))
    }
}

/// Binding handed out by [`InMemoryBus`]; dropping it unsubscribes.
pub struct BusSubscription {
    id: u64,
    topic: String,
    state: Weak<Mutex<BusState>>,
}

impl SubscriptionBinding for BusSubscription {
    fn topic(&self) -> &str {
        &self.topic
    }
}

impl Drop for BusSubscription {
    fn drop(&mut self) {
        let Some(state) = self.state.upgrade() else {
            return;
        };
        let mut state = lock(&state);
        if let Some(subscribers) = state.subscribers.get_mut(&self.topic) {
            subscribers.retain(|subscriber| subscriber.id != self.id);
        }
    }
}
