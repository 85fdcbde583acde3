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

//! Transform announcement and batch types carried on the transform topics.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::{Display, Formatter};
use std::time::Duration;

/// Which of the two transform streams a batch arrived on.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamKind {
    /// Time-stamped transforms that expire after the buffer's retention window.
    Dynamic,
    /// Latched transforms, valid at any time and never expired.
    Static,
}

impl StreamKind {
    pub fn is_static(self) -> bool {
        matches!(self, StreamKind::Static)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StreamKind::Dynamic => "dynamic",
            StreamKind::Static => "static",
        }
    }
}

impl Display for StreamKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// Rotation as a unit quaternion in `(x, y, z, w)` order.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Quaternion {
    pub const IDENTITY: Quaternion = Quaternion {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };

    pub const fn new(x: f64, y: f64, z: f64, w: f64) -> Self {
        Self { x, y, z, w }
    }

    pub fn norm(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z + self.w * self.w).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite() && self.w.is_finite()
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// One child-to-parent rigid transform announced by a publisher.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransformAnnouncement {
    /// Child frame.
    pub frame_id: String,
    pub parent_frame_id: String,
    /// Time since the epoch the transform is valid at.
    #[serde(with = "stamp_secs")]
    pub stamp: Duration,
    #[serde(default)]
    pub translation: Vector3,
    #[serde(default)]
    pub rotation: Quaternion,
    /// Identifier of the publisher that announced the transform.
    #[serde(default)]
    pub authority: String,
}

impl TransformAnnouncement {
    pub fn new(
        parent_frame_id: impl Into<String>,
        frame_id: impl Into<String>,
        stamp: Duration,
    ) -> Self {
        Self {
            frame_id: frame_id.into(),
            parent_frame_id: parent_frame_id.into(),
            stamp,
            translation: Vector3::default(),
            rotation: Quaternion::IDENTITY,
            authority: String::new(),
        }
    }

    pub fn with_translation(mut self, translation: Vector3) -> Self {
        self.translation = translation;
        self
    }

    pub fn with_rotation(mut self, rotation: Quaternion) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_authority(mut self, authority: impl Into<String>) -> Self {
        self.authority = authority.into();
        self
    }
}

/// A batch of announcements delivered as one message on a transform topic.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TransformBatch {
    pub transforms: Vec<TransformAnnouncement>,
}

impl TransformBatch {
    pub fn new(transforms: Vec<TransformAnnouncement>) -> Self {
        Self { transforms }
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TransformAnnouncement> {
        self.transforms.iter()
    }
}

impl From<Vec<TransformAnnouncement>> for TransformBatch {
    fn from(transforms: Vec<TransformAnnouncement>) -> Self {
        Self::new(transforms)
    }
}

impl FromIterator<TransformAnnouncement> for TransformBatch {
    fn from_iter<I: IntoIterator<Item = TransformAnnouncement>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

// Stamps travel as fractional seconds in fixtures and configs.
mod stamp_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub(super) fn serialize<S: Serializer>(stamp: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(stamp.as_secs_f64())
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::{Quaternion, StreamKind, TransformAnnouncement, TransformBatch, Vector3};
    use std::time::Duration;

    #[test]
    fn stream_kind_reports_static_flag() {
        assert!(StreamKind::Static.is_static());
        assert!(!StreamKind::Dynamic.is_static());
        assert_eq!(StreamKind::Static.to_string(), "static");
    }

    #[test]
    fn announcement_builder_keeps_parent_child_order() {
        let announcement = TransformAnnouncement::new("odom", "base_link", Duration::from_secs(3))
            .with_translation(Vector3::new(1.0, 2.0, 0.0))
            .with_authority("wheel_odometry");

        assert_eq!(announcement.parent_frame_id, "odom");
        assert_eq!(announcement.frame_id, "base_link");
        assert_eq!(announcement.rotation, Quaternion::IDENTITY);
        assert_eq!(announcement.authority, "wheel_odometry");
    }

    #[test]
    fn quaternion_norm_of_identity_is_one() {
        assert!((Quaternion::IDENTITY.norm() - 1.0).abs() < f64::EPSILON);
        assert!(!Quaternion::new(f64::NAN, 0.0, 0.0, 1.0).is_finite());
    }

    #[test]
    fn batch_collects_from_iterator_in_order() {
        let batch: TransformBatch = ["a", "b", "c"]
            .into_iter()
            .map(|child| TransformAnnouncement::new("world", child, Duration::ZERO))
            .collect();

        let children: Vec<&str> = batch.iter().map(|t| t.frame_id.as_str()).collect();
        assert_eq!(children, vec!["a", "b", "c"]);
        assert_eq!(batch.len(), 3);
    }
}
