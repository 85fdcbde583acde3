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

//! Dedicated executor: one background thread, one single-threaded loop, one
//! exclusive callback queue fed only by the two stream callbacks.

use crate::error::ListenerError;
use crate::ingest::batch_dispatch::BatchDispatcher;
use crate::observability::{events, fields};
use crate::runtime::executor_runtime::{spawn_executor_loop, RuntimeFactory, EXECUTOR_THREAD_NAME};
use crate::transform::{StreamKind, TransformBatch};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info};

const COMPONENT: &str = "dedicated_executor";

pub(crate) struct Delivery {
    kind: StreamKind,
    batch: TransformBatch,
}

/// Work queue drained exclusively by the executor loop.
///
/// Only the two stream callbacks of one listener hold it, so nothing else
/// ever runs on the executor thread.
pub(crate) struct ExclusiveCallbackGroup {
    listener_id: String,
    sender: mpsc::UnboundedSender<Delivery>,
    accepting: AtomicBool,
}

impl ExclusiveCallbackGroup {
    pub(crate) fn enqueue(&self, kind: StreamKind, batch: TransformBatch) {
        let listener_id = self.listener_id.as_str();

        if !self.accepting.load(Ordering::Acquire) {
            debug!(
                event = events::BATCH_DROP_SHUTDOWN,
                component = COMPONENT,
                listener_id,
                stream = kind.as_str(),
                batch_len = batch.len(),
                reason = fields::REASON_SHUTDOWN,
                "executor is shutting down; dropping batch"
            );
            return;
        }

        // Still accepting but the receiver is gone: the loop ended on its own.
        if let Err(err) = self.sender.send(Delivery { kind, batch }) {
            error!(
                event = events::BATCH_DROP_EXECUTOR_STOPPED,
                component = COMPONENT,
                listener_id,
                stream = err.0.kind.as_str(),
                batch_len = err.0.batch.len(),
                reason = fields::REASON_EXECUTOR_STOPPED,
                "executor loop is no longer running; dropping batch"
            );
        }
    }

    fn close(&self) {
        self.accepting.store(false, Ordering::Release);
    }
}

/// Owns the background thread. Stopping is idempotent and joins the thread.
pub(crate) struct DedicatedExecutor {
    listener_id: String,
    group: Arc<ExclusiveCallbackGroup>,
    stop_signal: Option<oneshot::Sender<()>>,
    thread: Option<JoinHandle<()>>,
    thread_id: ThreadId,
}

impl DedicatedExecutor {
    pub(crate) fn spawn(
        listener_id: &str,
        dispatcher: Arc<BatchDispatcher>,
        build_runtime: RuntimeFactory,
    ) -> Result<Self, ListenerError> {
        info!(
            event = events::EXECUTOR_SPAWN_START,
            component = COMPONENT,
            listener_id,
            executor_thread = EXECUTOR_THREAD_NAME,
            "starting dedicated executor"
        );

        let (sender, receiver) = mpsc::unbounded_channel();
        let (stop_signal, stop_receiver) = oneshot::channel();
        let loop_listener_id = listener_id.to_string();

        let thread = spawn_executor_loop(EXECUTOR_THREAD_NAME, build_runtime, move || {
            Self::run_loop(loop_listener_id, dispatcher, receiver, stop_receiver)
        })
        .map_err(|err| {
            error!(
                event = events::EXECUTOR_SPAWN_FAILED,
                component = COMPONENT,
                listener_id,
                err = %err,
                "unable to start executor thread"
            );
            err
        })?;
        let thread_id = thread.thread().id();

        info!(
            event = events::EXECUTOR_SPAWN_OK,
            component = COMPONENT,
            listener_id,
            executor_thread = EXECUTOR_THREAD_NAME,
            "dedicated executor running"
        );

        Ok(Self {
            listener_id: listener_id.to_string(),
            group: Arc::new(ExclusiveCallbackGroup {
                listener_id: listener_id.to_string(),
                sender,
                accepting: AtomicBool::new(true),
            }),
            stop_signal: Some(stop_signal),
            thread: Some(thread),
            thread_id,
        })
    }

    pub(crate) fn callback_group(&self) -> Arc<ExclusiveCallbackGroup> {
        self.group.clone()
    }

    pub(crate) fn thread_id(&self) -> ThreadId {
        self.thread_id
    }

    /// Executes deliveries one at a time until stopped.
    async fn run_loop(
        listener_id: String,
        dispatcher: Arc<BatchDispatcher>,
        mut receiver: mpsc::UnboundedReceiver<Delivery>,
        mut stop_receiver: oneshot::Receiver<()>,
    ) {
        let executor_thread = fields::current_thread_name_or_default();

        loop {
            tokio::select! {
                biased;
                _ = &mut stop_receiver => {
                    Self::drain_pending(&listener_id, &mut receiver);
                    info!(
                        event = events::EXECUTOR_LOOP_STOPPED,
                        component = COMPONENT,
                        listener_id = listener_id.as_str(),
                        executor_thread = executor_thread.as_str(),
                        reason = fields::REASON_STOP_SIGNAL,
                        "executor loop stopping"
                    );
                    break;
                }
                delivery = receiver.recv() => {
                    let Some(delivery) = delivery else {
                        info!(
                            event = events::EXECUTOR_LOOP_STOPPED,
                            component = COMPONENT,
                            listener_id = listener_id.as_str(),
                            executor_thread = executor_thread.as_str(),
                            reason = fields::REASON_QUEUE_CLOSED,
                            "executor queue closed; stopping loop"
                        );
                        break;
                    };
                    dispatcher.on_batch(&delivery.batch, delivery.kind);
                }
            }
        }
    }

    /// Discards deliveries still queued at stop, reporting each one.
    fn drain_pending(
        listener_id: &str,
        receiver: &mut mpsc::UnboundedReceiver<Delivery>,
    ) -> usize {
        receiver.close();
        let mut dropped = 0;
        while let Ok(delivery) = receiver.try_recv() {
            dropped += 1;
            debug!(
                event = events::BATCH_DROP_SHUTDOWN,
                component = COMPONENT,
                listener_id,
                stream = delivery.kind.as_str(),
                batch_len = delivery.batch.len(),
                reason = fields::REASON_SHUTDOWN,
                "executor stopping; dropping queued batch"
            );
        }
        dropped
    }

    /// Stops accepting work, signals the loop and joins the thread.
    ///
    /// A dispatch already running completes before this returns.
    pub(crate) fn stop(&mut self) {
        self.group.close();

        if let Some(stop_signal) = self.stop_signal.take() {
            // The loop may already be gone; nothing to signal then.
            let _ = stop_signal.send(());
        }

        let Some(thread) = self.thread.take() else {
            return;
        };

        if thread::current().id() == self.thread_id {
            error!(
                event = events::EXECUTOR_JOIN_FAILED,
                component = COMPONENT,
                listener_id = self.listener_id.as_str(),
                reason = "stop_called_from_executor_thread",
                "refusing to join the executor thread from itself"
            );
            return;
        }

        if thread.join().is_err() {
            error!(
                event = events::EXECUTOR_JOIN_FAILED,
                component = COMPONENT,
                listener_id = self.listener_id.as_str(),
                reason = "executor_thread_panicked",
                "executor thread panicked"
            );
        }
    }

    /// False once stopped, and also when the loop thread ended on its own.
    pub(crate) fn is_running(&self) -> bool {
        self.thread
            .as_ref()
            .is_some_and(|thread| !thread.is_finished())
    }
}

impl Drop for DedicatedExecutor {
    fn drop(&mut self) {
        self.stop();
    }
}
