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

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};
use tf_listener::{BufferError, StreamKind, TransformAnnouncement, TransformBuffer};

#[derive(Clone, Debug, PartialEq)]
pub struct InsertRecord {
    pub frame_id: String,
    pub parent_frame_id: String,
    pub kind: StreamKind,
    /// Name of the thread the insert ran on.
    pub thread_name: Option<String>,
}

/// [`TransformBuffer`] that remembers every accepted insert.
///
/// Rejects empty frame ids and self-parented frames. An optional delay keeps
/// each insert in flight long enough to observe shutdown ordering.
#[derive(Default)]
pub struct RecordingBuffer {
    records: Mutex<Vec<InsertRecord>>,
    changed: Condvar,
    rejected: AtomicUsize,
    started: AtomicUsize,
    dedicated: AtomicBool,
    flag_history: Mutex<Vec<bool>>,
    insert_delay: Duration,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl RecordingBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_insert_delay(insert_delay: Duration) -> Self {
        Self {
            insert_delay,
            ..Self::default()
        }
    }

    pub fn records(&self) -> Vec<InsertRecord> {
        lock(&self.records).clone()
    }

    pub fn inserted_count(&self) -> usize {
        lock(&self.records).len()
    }

    pub fn rejected_count(&self) -> usize {
        self.rejected.load(Ordering::SeqCst)
    }

    /// Inserts that have begun, accepted or not.
    pub fn started_count(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    /// Every value passed to `set_using_dedicated_thread`, in order.
    pub fn flag_history(&self) -> Vec<bool> {
        lock(&self.flag_history).clone()
    }

    /// Blocks until `count` inserts were accepted or `timeout` elapsed.
    pub fn wait_for_inserts(&self, count: usize, timeout: Duration) -> Vec<InsertRecord> {
        let deadline = Instant::now().checked_add(timeout);
        let mut records = lock(&self.records);
        while records.len() < count {
            records = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        break;
                    }
                    match self.changed.wait_timeout(records, deadline - now) {
                        Ok((records, _)) => records,
                        Err(poisoned) => poisoned.into_inner().0,
                    }
                }
                None => match self.changed.wait(records) {
                    Ok(records) => records,
                    Err(poisoned) => poisoned.into_inner(),
                },
            };
        }
        records.clone()
    }

    /// Polls until `count` inserts have started or `timeout` elapsed.
    pub fn wait_for_started(&self, count: usize, timeout: Duration) -> usize {
        let deadline = Instant::now().checked_add(timeout);
        while self.started_count() < count
            && deadline.map_or(true, |deadline| Instant::now() < deadline)
        {
            thread::sleep(Duration::from_millis(1));
        }
        self.started_count()
    }
}

impl TransformBuffer for RecordingBuffer {
    fn insert_transform(
        &self,
        transform: &TransformAnnouncement,
        kind: StreamKind,
    ) -> Result<(), BufferError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        if !self.insert_delay.is_zero() {
            thread::sleep(self.insert_delay);
        }

        let rejection = if transform.frame_id.is_empty() {
            Some(BufferError::EmptyFrameId {
                parent_frame_id: transform.parent_frame_id.clone(),
            })
        } else if transform.parent_frame_id.is_empty() {
            Some(BufferError::EmptyParentFrameId {
                frame_id: transform.frame_id.clone(),
            })
        } else if transform.frame_id == transform.parent_frame_id {
            Some(BufferError::SelfParent {
                frame_id: transform.frame_id.clone(),
            })
        } else {
            None
        };
        if let Some(err) = rejection {
            self.rejected.fetch_add(1, Ordering::SeqCst);
            return Err(err);
        }

        lock(&self.records).push(InsertRecord {
            frame_id: transform.frame_id.clone(),
            parent_frame_id: transform.parent_frame_id.clone(),
            kind,
            thread_name: thread::current().name().map(str::to_string),
        });
        self.changed.notify_all();
        Ok(())
    }

    fn set_using_dedicated_thread(&self, value: bool) {
        lock(&self.flag_history).push(value);
        self.dedicated.store(value, Ordering::SeqCst);
    }

    fn is_using_dedicated_thread(&self) -> bool {
        self.dedicated.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::RecordingBuffer;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;
    use tf_listener::{StreamKind, TransformAnnouncement, TransformBuffer};

    #[test]
    fn waits_accept_timeouts_without_a_representable_deadline() {
        let buffer = Arc::new(RecordingBuffer::new());

        let writer = {
            let buffer = buffer.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                buffer
                    .insert_transform(
                        &TransformAnnouncement::new("odom", "base", Duration::from_secs(1)),
                        StreamKind::Dynamic,
                    )
                    .unwrap();
            })
        };

        assert_eq!(buffer.wait_for_started(1, Duration::MAX), 1);
        let records = buffer.wait_for_inserts(1, Duration::MAX);
        writer.join().unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].frame_id, "base");
    }
}
