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

//! In-memory, time-indexed [`TransformBuffer`].
//!
//! Stores one history per child frame: static frames keep their latest
//! announcement forever, dynamic frames keep a retention window of
//! announcements and are interpolated between neighbours. Lookups compose
//! the chain through the closest common ancestor. A frame keeps the stream
//! kind of its first announcement; announcements of the other kind for that
//! frame are rejected.
//!
//! Readers may block in [`MemoryTransformBuffer::wait_for_transform`] only
//! while a dedicated delivery thread is feeding the buffer; without one
//! nothing could wake them, so the wait returns immediately.

mod math;
pub use math::Isometry;

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tf_listener::{BufferError, StreamKind, TransformAnnouncement, TransformBuffer};
use thiserror::Error;
use tracing::{debug, warn};

/// Default retention window for dynamic transforms.
pub const DEFAULT_CACHE_TIME: Duration = Duration::from_secs(10);

const QUATERNION_NORMALIZATION_TOLERANCE: f64 = 1e-3;
const MAX_GRAPH_DEPTH: usize = 1000;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum LookupError {
    #[error("frame {0:?} does not exist")]
    UnknownFrame(String),
    #[error("frames {target:?} and {source_frame:?} are not connected")]
    Disconnected {
        target: String,
        source_frame: String,
    },
    #[error(
        "lookup of {frame:?} at {requested:?} requires extrapolation (available {earliest:?}..={latest:?})"
    )]
    Extrapolation {
        frame: String,
        requested: Duration,
        earliest: Duration,
        latest: Duration,
    },
    #[error("frame graph exceeds the maximum depth; loop in the tree?")]
    LoopDetected,
    #[error("timed out waiting for {target:?} -> {source_frame:?}: {last}")]
    Timeout {
        target: String,
        source_frame: String,
        last: Box<LookupError>,
    },
}

#[derive(Clone, Debug)]
struct StoredTransform {
    parent: String,
    stamp: Duration,
    pose: Isometry,
}

enum FrameHistory {
    Static(StoredTransform),
    Dynamic(BTreeMap<Duration, StoredTransform>),
}

impl FrameHistory {
    /// Parent and pose of this frame at `time`; `Duration::ZERO` means latest.
    fn at(&self, frame: &str, time: Duration) -> Result<&StoredTransform, LookupError> {
        self.sample(frame, time).map(|sample| match sample {
            Sample::Exact(stored) | Sample::Between(stored, _, _) => stored,
        })
    }

    fn pose_at(&self, frame: &str, time: Duration) -> Result<(String, Isometry), LookupError> {
        match self.sample(frame, time)? {
            Sample::Exact(stored) => Ok((stored.parent.clone(), stored.pose)),
            Sample::Between(before, after, ratio) => {
                Ok((before.parent.clone(), before.pose.interpolate(&after.pose, ratio)))
            }
        }
    }

    fn sample(&self, frame: &str, time: Duration) -> Result<Sample<'_>, LookupError> {
        let history = match self {
            FrameHistory::Static(stored) => return Ok(Sample::Exact(stored)),
            FrameHistory::Dynamic(history) => history,
        };

        let (Some((earliest, _)), Some((latest, newest))) =
            (history.first_key_value(), history.last_key_value())
        else {
            return Err(LookupError::UnknownFrame(frame.to_string()));
        };

        if time.is_zero() || time == *latest {
            return Ok(Sample::Exact(newest));
        }
        if let Some(exact) = history.get(&time) {
            return Ok(Sample::Exact(exact));
        }

        let before = history.range(..time).next_back();
        let after = history.range(time..).next();
        match (before, after) {
            (Some((before_stamp, before)), Some((after_stamp, after))) => {
                let span = (*after_stamp - *before_stamp).as_secs_f64();
                let ratio = (time - *before_stamp).as_secs_f64() / span;
                Ok(Sample::Between(before, after, ratio))
            }
            _ => Err(LookupError::Extrapolation {
                frame: frame.to_string(),
                requested: time,
                earliest: *earliest,
                latest: *latest,
            }),
        }
    }
}

enum Sample<'a> {
    Exact(&'a StoredTransform),
    Between(&'a StoredTransform, &'a StoredTransform, f64),
}

#[derive(Default)]
struct FrameGraph {
    frames: HashMap<String, FrameHistory>,
}

impl FrameGraph {
    /// Poses of `frame` and its ancestors, child first, ending at the root.
    fn chain_to_root(
        &self,
        frame: &str,
        time: Duration,
    ) -> Result<Vec<(String, Isometry)>, LookupError> {
        let mut chain = Vec::new();
        let mut current = frame.to_string();

        while let Some(history) = self.frames.get(&current) {
            if chain.len() >= MAX_GRAPH_DEPTH {
                return Err(LookupError::LoopDetected);
            }
            let (parent, pose) = history.pose_at(&current, time)?;
            chain.push((current, pose));
            current = parent;
        }
        chain.push((current, Isometry::IDENTITY));
        Ok(chain)
    }

    fn knows(&self, frame: &str) -> bool {
        self.frames.contains_key(frame)
            || self
                .frames
                .iter()
                .any(|(child, history)| history.at(child, Duration::ZERO).is_ok_and(|s| s.parent == frame))
    }

    fn lookup(&self, target: &str, source: &str, time: Duration) -> Result<Isometry, LookupError> {
        for frame in [target, source] {
            if !self.knows(frame) {
                return Err(LookupError::UnknownFrame(frame.to_string()));
            }
        }
        if target == source {
            return Ok(Isometry::IDENTITY);
        }

        let source_chain = self.chain_to_root(source, time)?;
        let target_chain = self.chain_to_root(target, time)?;

        // Closest frame shared by both chains.
        let Some((source_depth, target_depth)) =
            source_chain.iter().enumerate().find_map(|(source_depth, (frame, _))| {
                target_chain
                    .iter()
                    .position(|(candidate, _)| candidate == frame)
                    .map(|target_depth| (source_depth, target_depth))
            })
        else {
            return Err(LookupError::Disconnected {
                target: target.to_string(),
                source_frame: source.to_string(),
            });
        };

        let ancestor_from_source = accumulate(&source_chain[..source_depth]);
        let ancestor_from_target = accumulate(&target_chain[..target_depth]);
        Ok(ancestor_from_target.inverse().compose(&ancestor_from_source))
    }
}

/// Pose of the first frame of `chain` in the parent of its last frame.
fn accumulate(chain: &[(String, Isometry)]) -> Isometry {
    chain
        .iter()
        .fold(Isometry::IDENTITY, |acc, (_, pose)| pose.compose(&acc))
}

/// Thread-safe in-memory transform buffer.
pub struct MemoryTransformBuffer {
    cache_time: Duration,
    graph: Mutex<FrameGraph>,
    arrived: Condvar,
    using_dedicated_thread: AtomicBool,
}

impl Default for MemoryTransformBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TIME)
    }
}

impl MemoryTransformBuffer {
    pub fn new(cache_time: Duration) -> Self {
        Self {
            cache_time,
            graph: Mutex::new(FrameGraph::default()),
            arrived: Condvar::new(),
            using_dedicated_thread: AtomicBool::new(false),
        }
    }

    pub fn cache_time(&self) -> Duration {
        self.cache_time
    }

    fn graph(&self) -> MutexGuard<'_, FrameGraph> {
        match self.graph.lock() {
            Ok(graph) => graph,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Pose of `source` expressed in `target` at `time`
    /// (`Duration::ZERO` for the latest available data).
    pub fn lookup_transform(
        &self,
        target: &str,
        source: &str,
        time: Duration,
    ) -> Result<Isometry, LookupError> {
        self.graph()
            .lookup(strip_slash(target), strip_slash(source), time)
    }

    pub fn can_transform(&self, target: &str, source: &str, time: Duration) -> bool {
        self.lookup_transform(target, source, time).is_ok()
    }

    /// Like [`lookup_transform`](Self::lookup_transform), but waits up to
    /// `timeout` for the data to arrive when a dedicated thread feeds the
    /// buffer.
    pub fn wait_for_transform(
        &self,
        target: &str,
        source: &str,
        time: Duration,
        timeout: Duration,
    ) -> Result<Isometry, LookupError> {
        let (target, source) = (strip_slash(target), strip_slash(source));
        let mut graph = self.graph();
        let mut last_err = match graph.lookup(target, source, time) {
            Ok(pose) => return Ok(pose),
            Err(err) => err,
        };
        if timeout.is_zero() {
            return Err(last_err);
        }

        if !self.is_using_dedicated_thread() {
            warn!(
                target_frame = target,
                source_frame = source,
                "no dedicated thread feeds this buffer; not waiting for transform"
            );
            return Err(last_err);
        }

        // A timeout too large to represent waits without a deadline.
        let deadline = Instant::now().checked_add(timeout);
        loop {
            graph = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(LookupError::Timeout {
                            target: target.to_string(),
                            source_frame: source.to_string(),
                            last: Box::new(last_err),
                        });
                    }
                    match self.arrived.wait_timeout(graph, deadline - now) {
                        Ok((graph, _)) => graph,
                        Err(poisoned) => poisoned.into_inner().0,
                    }
                }
                None => match self.arrived.wait(graph) {
                    Ok(graph) => graph,
                    Err(poisoned) => poisoned.into_inner(),
                },
            };
            match graph.lookup(target, source, time) {
                Ok(pose) => return Ok(pose),
                Err(err) => last_err = err,
            }
        }
    }

    /// Parent of `frame` in the latest data.
    pub fn parent_of(&self, frame: &str) -> Option<String> {
        let frame = strip_slash(frame);
        self.graph()
            .frames
            .get(frame)
            .and_then(|history| history.at(frame, Duration::ZERO).ok())
            .map(|stored| stored.parent.clone())
    }

    pub fn frame_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.graph().frames.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn is_static(&self, frame: &str) -> bool {
        matches!(
            self.graph().frames.get(strip_slash(frame)),
            Some(FrameHistory::Static(_))
        )
    }

    pub fn clear(&self) {
        self.graph().frames.clear();
    }
}

fn strip_slash(frame: &str) -> &str {
    frame.strip_prefix('/').unwrap_or(frame)
}

fn validate(transform: &TransformAnnouncement) -> Result<(String, String, Isometry), BufferError> {
    let frame_id = strip_slash(transform.frame_id.trim()).to_string();
    let parent_frame_id = strip_slash(transform.parent_frame_id.trim()).to_string();

    if frame_id.is_empty() {
        return Err(BufferError::EmptyFrameId { parent_frame_id });
    }
    if parent_frame_id.is_empty() {
        return Err(BufferError::EmptyParentFrameId { frame_id });
    }
    if frame_id == parent_frame_id {
        return Err(BufferError::SelfParent { frame_id });
    }
    if !transform.translation.is_finite() || !transform.rotation.is_finite() {
        return Err(BufferError::NonFinite {
            frame_id,
            parent_frame_id,
        });
    }
    let norm = transform.rotation.norm();
    if (norm * norm - 1.0).abs() > QUATERNION_NORMALIZATION_TOLERANCE {
        return Err(BufferError::DegenerateRotation {
            frame_id,
            parent_frame_id,
        });
    }

    let pose = Isometry::new(transform.translation, math::normalize(transform.rotation));
    Ok((frame_id, parent_frame_id, pose))
}

impl TransformBuffer for MemoryTransformBuffer {
    fn insert_transform(
        &self,
        transform: &TransformAnnouncement,
        kind: StreamKind,
    ) -> Result<(), BufferError> {
        let (frame_id, parent, pose) = validate(transform)?;
        let stored = StoredTransform {
            parent,
            stamp: transform.stamp,
            pose,
        };

        let mut graph = self.graph();
        let history = graph
            .frames
            .entry(frame_id.clone())
            .or_insert_with(|| match kind {
                StreamKind::Static => FrameHistory::Static(stored.clone()),
                StreamKind::Dynamic => FrameHistory::Dynamic(BTreeMap::new()),
            });

        match (history, kind) {
            (FrameHistory::Static(latched), StreamKind::Static) => *latched = stored,
            (FrameHistory::Dynamic(entries), StreamKind::Dynamic) => {
                if let Some((newest, _)) = entries.last_key_value() {
                    let expired = stored
                        .stamp
                        .checked_add(self.cache_time)
                        .is_some_and(|valid_until| valid_until < *newest);
                    if expired {
                        return Err(BufferError::Expired {
                            frame_id,
                            parent_frame_id: stored.parent,
                        });
                    }
                }
                entries.insert(stored.stamp, stored);
                if let Some((newest, _)) = entries.last_key_value() {
                    let horizon = newest.saturating_sub(self.cache_time);
                    entries.retain(|stamp, _| *stamp >= horizon);
                }
            }
            (history, _) => {
                let established = match history {
                    FrameHistory::Static(_) => StreamKind::Static,
                    FrameHistory::Dynamic(_) => StreamKind::Dynamic,
                };
                return Err(BufferError::StreamKindChanged {
                    frame_id,
                    established,
                });
            }
        }
        drop(graph);

        debug!(
            frame_id = frame_id.as_str(),
            stream = kind.as_str(),
            "stored transform"
        );
        self.arrived.notify_all();
        Ok(())
    }

    fn set_using_dedicated_thread(&self, value: bool) {
        self.using_dedicated_thread.store(value, Ordering::SeqCst);
    }

    fn is_using_dedicated_thread(&self) -> bool {
        self.using_dedicated_thread.load(Ordering::SeqCst)
    }
}
