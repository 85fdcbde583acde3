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

//! The shared transform buffer the listener writes into.
//!
//! The buffer itself (storage, interpolation, tree lookup) lives outside this
//! crate. The listener only needs to insert announcements and to tell the
//! buffer whether a dedicated delivery thread is feeding it.

use crate::transform::{StreamKind, TransformAnnouncement};
use thiserror::Error;

/// Reasons a buffer can refuse an announcement.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum BufferError {
    #[error("frame id is empty (parent: {parent_frame_id:?})")]
    EmptyFrameId { parent_frame_id: String },
    #[error("parent frame id is empty (frame: {frame_id:?})")]
    EmptyParentFrameId { frame_id: String },
    #[error("frame {frame_id:?} cannot be its own parent")]
    SelfParent { frame_id: String },
    #[error("transform {parent_frame_id:?} -> {frame_id:?} contains non-finite values")]
    NonFinite {
        frame_id: String,
        parent_frame_id: String,
    },
    #[error("transform {parent_frame_id:?} -> {frame_id:?} has a degenerate rotation")]
    DegenerateRotation {
        frame_id: String,
        parent_frame_id: String,
    },
    #[error("transform {parent_frame_id:?} -> {frame_id:?} is older than the retention window")]
    Expired {
        frame_id: String,
        parent_frame_id: String,
    },
    #[error("frame {frame_id:?} is already published on the {established} stream")]
    StreamKindChanged {
        frame_id: String,
        established: StreamKind,
    },
    #[error("{0}")]
    Rejected(String),
}

/// Time-indexed transform store shared between the listener and readers.
///
/// Implementations synchronize internally; the listener calls
/// [`insert_transform`](TransformBuffer::insert_transform) from whichever
/// thread delivers messages while readers query concurrently.
///
/// The listener holds the buffer as `Arc<dyn TransformBuffer>` and never owns
/// its contents.
pub trait TransformBuffer: Send + Sync {
    /// Stores one announcement. `kind` decides whether it is latched
    /// ([`StreamKind::Static`]) or expires with the retention window.
    fn insert_transform(
        &self,
        transform: &TransformAnnouncement,
        kind: StreamKind,
    ) -> Result<(), BufferError>;

    /// Tells the buffer a dedicated thread is delivering transforms, so
    /// readers may block waiting for data that has not arrived yet.
    fn set_using_dedicated_thread(&self, value: bool);

    fn is_using_dedicated_thread(&self) -> bool;
}
