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

//! Chooses where batches are dispatched and keeps the buffer's
//! dedicated-thread flag in step with that choice.

use crate::error::ListenerError;
use crate::ingest::batch_dispatch::BatchDispatcher;
use crate::ingest::stream_callback::StreamCallback;
use crate::observability::events;
use crate::runtime::dedicated_executor::DedicatedExecutor;
use crate::runtime::executor_runtime::{build_executor_runtime, RuntimeFactory};
use crate::transform::{StreamKind, TransformBatch};
use std::sync::Arc;
use std::thread::ThreadId;
use tracing::{debug, info};

const COMPONENT: &str = "ingestion_scheduler";

/// Where delivered batches are dispatched.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DeliveryMode {
    /// Callbacks run wherever the middleware invokes them; no thread is created.
    CallerDriven,
    /// Callbacks are queued to one background thread owned by the listener.
    DedicatedThread,
}

impl DeliveryMode {
    pub fn from_flag(use_dedicated_thread: bool) -> Self {
        if use_dedicated_thread {
            DeliveryMode::DedicatedThread
        } else {
            DeliveryMode::CallerDriven
        }
    }

    pub fn uses_dedicated_thread(self) -> bool {
        matches!(self, DeliveryMode::DedicatedThread)
    }
}

pub(crate) struct IngestionScheduler {
    listener_id: String,
    mode: DeliveryMode,
    dispatcher: Arc<BatchDispatcher>,
    executor: Option<DedicatedExecutor>,
}

impl IngestionScheduler {
    /// Sets up delivery for `mode`.
    ///
    /// In dedicated mode the buffer learns about the thread before it starts;
    /// if the thread cannot be started the flag is cleared again.
    pub(crate) fn start(
        listener_id: &str,
        mode: DeliveryMode,
        dispatcher: Arc<BatchDispatcher>,
    ) -> Result<Self, ListenerError> {
        Self::start_with(listener_id, mode, dispatcher, build_executor_runtime)
    }

    pub(crate) fn start_with(
        listener_id: &str,
        mode: DeliveryMode,
        dispatcher: Arc<BatchDispatcher>,
        build_runtime: RuntimeFactory,
    ) -> Result<Self, ListenerError> {
        let executor = match mode {
            DeliveryMode::CallerDriven => {
                debug!(
                    event = events::SCHEDULER_CALLER_DRIVEN,
                    component = COMPONENT,
                    listener_id,
                    "dispatching on the middleware's execution context"
                );
                None
            }
            DeliveryMode::DedicatedThread => {
                Self::set_dedicated_flag(listener_id, &dispatcher, true);
                let spawned = DedicatedExecutor::spawn(listener_id, dispatcher.clone(), build_runtime);
                match spawned {
                    Ok(executor) => Some(executor),
                    Err(err) => {
                        Self::set_dedicated_flag(listener_id, &dispatcher, false);
                        return Err(err);
                    }
                }
            }
        };

        Ok(Self {
            listener_id: listener_id.to_string(),
            mode,
            dispatcher,
            executor,
        })
    }

    fn set_dedicated_flag(listener_id: &str, dispatcher: &BatchDispatcher, value: bool) {
        dispatcher.buffer().set_using_dedicated_thread(value);
        info!(
            event = events::DEDICATED_THREAD_FLAG_SET,
            component = COMPONENT,
            listener_id,
            value,
            "updated buffer dedicated-thread flag"
        );
    }

    pub(crate) fn mode(&self) -> DeliveryMode {
        self.mode
    }

    pub(crate) fn executor_thread_id(&self) -> Option<ThreadId> {
        self.executor
            .as_ref()
            .filter(|executor| executor.is_running())
            .map(DedicatedExecutor::thread_id)
    }

    /// Whether delivered batches still reach the dispatcher: always in
    /// caller-driven mode, while the executor thread lives otherwise.
    pub(crate) fn is_delivering(&self) -> bool {
        match self.mode {
            DeliveryMode::CallerDriven => true,
            DeliveryMode::DedicatedThread => self
                .executor
                .as_ref()
                .is_some_and(DedicatedExecutor::is_running),
        }
    }

    /// Callback for one stream. Both streams share the dispatcher; only the
    /// captured `kind` differs.
    pub(crate) fn stream_callback(&self, kind: StreamKind) -> StreamCallback {
        match &self.executor {
            Some(executor) => {
                let group = executor.callback_group();
                Arc::new(move |batch: TransformBatch| group.enqueue(kind, batch))
            }
            None => {
                let dispatcher = self.dispatcher.clone();
                Arc::new(move |batch: TransformBatch| {
                    dispatcher.on_batch(&batch, kind);
                })
            }
        }
    }

    /// Stops and joins the executor thread, if any. Safe to call repeatedly.
    pub(crate) fn shutdown(&mut self) {
        if let Some(mut executor) = self.executor.take() {
            executor.stop();
        }
    }

    /// Shutdown for a listener that never finished construction: also
    /// clears the dedicated-thread flag this scheduler set.
    pub(crate) fn abandon(&mut self) {
        self.shutdown();
        if self.mode.uses_dedicated_thread() {
            Self::set_dedicated_flag(&self.listener_id, &self.dispatcher, false);
        }
    }
}

impl Drop for IngestionScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}
