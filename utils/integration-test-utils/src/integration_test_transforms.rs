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

use std::time::Duration;
use tf_listener::{Quaternion, TransformAnnouncement, TransformBatch, Vector3};

pub const TEST_AUTHORITY: &str = "integration_test_publisher";

pub fn announcement(parent: &str, child: &str, secs: f64) -> TransformAnnouncement {
    TransformAnnouncement::new(parent, child, Duration::from_secs_f64(secs))
        .with_authority(TEST_AUTHORITY)
}

pub fn offset(parent: &str, child: &str, secs: f64, x: f64, y: f64) -> TransformAnnouncement {
    announcement(parent, child, secs).with_translation(Vector3::new(x, y, 0.0))
}

pub fn yawed(parent: &str, child: &str, secs: f64, yaw: f64) -> TransformAnnouncement {
    let half = yaw / 2.0;
    announcement(parent, child, secs)
        .with_rotation(Quaternion::new(0.0, 0.0, half.sin(), half.cos()))
}

/// `count` well-formed children of `parent` plus one self-parented entry at
/// `bad_index`.
pub fn batch_with_self_parent(
    parent: &str,
    count: usize,
    bad_index: usize,
    secs: f64,
) -> TransformBatch {
    let mut transforms: Vec<TransformAnnouncement> = (0..count)
        .map(|i| announcement(parent, &format!("{parent}_child_{i}"), secs))
        .collect();
    let bad_index = bad_index.min(transforms.len());
    transforms.insert(bad_index, announcement(parent, parent, secs));
    TransformBatch::new(transforms)
}
