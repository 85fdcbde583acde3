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

//! Shared dispatch of delivered batches into the transform buffer.

use crate::buffer::TransformBuffer;
use crate::observability::{events, fields};
use crate::transform::{StreamKind, TransformBatch};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;
use tracing::{debug, error, warn, Level};

const COMPONENT: &str = "batch_dispatch";

/// Result of dispatching one batch.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub(crate) struct BatchOutcome {
    pub(crate) inserted: usize,
    pub(crate) rejected: usize,
}

/// Point-in-time copy of the dispatcher's bookkeeping.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ListenerDiagnostics {
    /// Wall-clock time the most recent batch finished processing.
    pub last_update: Option<SystemTime>,
    pub dynamic_batches: u64,
    pub static_batches: u64,
    pub transforms_inserted: u64,
    pub transforms_rejected: u64,
}

impl ListenerDiagnostics {
    pub fn batches_processed(&self) -> u64 {
        self.dynamic_batches + self.static_batches
    }
}

#[derive(Default)]
struct DispatchCounters {
    dynamic_batches: AtomicU64,
    static_batches: AtomicU64,
    inserted: AtomicU64,
    rejected: AtomicU64,
}

/// Writes every announcement of a batch into the buffer, tagged with the
/// stream it arrived on.
///
/// Rejected announcements are reported and skipped; the rest of the batch is
/// still inserted.
pub(crate) struct BatchDispatcher {
    listener_id: String,
    buffer: Arc<dyn TransformBuffer>,
    accepting: AtomicBool,
    counters: DispatchCounters,
    last_update: Mutex<Option<SystemTime>>,
}

impl BatchDispatcher {
    pub(crate) fn new(listener_id: &str, buffer: Arc<dyn TransformBuffer>) -> Self {
        Self {
            listener_id: listener_id.to_string(),
            buffer,
            accepting: AtomicBool::new(true),
            counters: DispatchCounters::default(),
            last_update: Mutex::new(None),
        }
    }

    pub(crate) fn buffer(&self) -> &Arc<dyn TransformBuffer> {
        &self.buffer
    }

    /// Stops accepting batches. Batches delivered afterwards are dropped.
    pub(crate) fn close(&self) {
        self.accepting.store(false, Ordering::Release);
    }

    pub(crate) fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::Acquire)
    }

    pub(crate) fn on_batch(&self, batch: &TransformBatch, kind: StreamKind) -> BatchOutcome {
        let listener_id = self.listener_id.as_str();

        if !self.is_accepting() {
            debug!(
                event = events::BATCH_DROP_SHUTDOWN,
                component = COMPONENT,
                listener_id,
                stream = kind.as_str(),
                batch_len = batch.len(),
                reason = fields::REASON_SHUTDOWN,
                "dropping batch delivered after shutdown"
            );
            return BatchOutcome::default();
        }

        debug!(
            event = events::BATCH_RECEIVE,
            component = COMPONENT,
            listener_id,
            stream = kind.as_str(),
            batch_len = batch.len(),
            "received transform batch"
        );

        let mut outcome = BatchOutcome::default();
        for transform in batch.iter() {
            // A panicking buffer must not take the delivery thread down with it.
            let inserted = panic::catch_unwind(AssertUnwindSafe(|| {
                self.buffer.insert_transform(transform, kind)
            }));
            match inserted {
                Ok(Ok(())) => outcome.inserted += 1,
                Err(payload) => {
                    outcome.rejected += 1;
                    error!(
                        event = events::TRANSFORM_INSERT_PANICKED,
                        component = COMPONENT,
                        listener_id,
                        stream = kind.as_str(),
                        frame_id = fields::format_frame_id(&transform.frame_id),
                        parent_frame_id = fields::format_frame_id(&transform.parent_frame_id),
                        authority = fields::format_authority(transform),
                        panic = fields::format_panic_payload(payload.as_ref()),
                        "buffer panicked while inserting transform; skipping"
                    );
                }
                Ok(Err(err)) => {
                    outcome.rejected += 1;
                    if tracing::enabled!(Level::WARN) {
                        warn!(
                            event = events::TRANSFORM_INSERT_FAILED,
                            component = COMPONENT,
                            listener_id,
                            stream = kind.as_str(),
                            frame_id = fields::format_frame_id(&transform.frame_id),
                            parent_frame_id = fields::format_frame_id(&transform.parent_frame_id),
                            authority = fields::format_authority(transform),
                            stamp = %fields::format_stamp(transform),
                            err = %err,
                            "failed to insert transform; skipping"
                        );
                    }
                }
            }
        }

        self.record(kind, outcome);

        debug!(
            event = events::BATCH_PROCESSED,
            component = COMPONENT,
            listener_id,
            stream = kind.as_str(),
            inserted = outcome.inserted,
            rejected = outcome.rejected,
            "processed transform batch"
        );

        outcome
    }

    fn record(&self, kind: StreamKind, outcome: BatchOutcome) {
        let batches = match kind {
            StreamKind::Dynamic => &self.counters.dynamic_batches,
            StreamKind::Static => &self.counters.static_batches,
        };
        batches.fetch_add(1, Ordering::Relaxed);
        self.counters
            .inserted
            .fetch_add(outcome.inserted as u64, Ordering::Relaxed);
        self.counters
            .rejected
            .fetch_add(outcome.rejected as u64, Ordering::Relaxed);

        let now = SystemTime::now();
        match self.last_update.lock() {
            Ok(mut last_update) => *last_update = Some(now),
            Err(poisoned) => *poisoned.into_inner() = Some(now),
        }
    }

    pub(crate) fn diagnostics(&self) -> ListenerDiagnostics {
        let last_update = match self.last_update.lock() {
            Ok(last_update) => *last_update,
            Err(poisoned) => *poisoned.into_inner(),
        };

        ListenerDiagnostics {
            last_update,
            dynamic_batches: self.counters.dynamic_batches.load(Ordering::Relaxed),
            static_batches: self.counters.static_batches.load(Ordering::Relaxed),
            transforms_inserted: self.counters.inserted.load(Ordering::Relaxed),
            transforms_rejected: self.counters.rejected.load(Ordering::Relaxed),
        }
    }
}
