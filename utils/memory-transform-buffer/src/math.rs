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

//! Rigid-transform arithmetic used by lookups.

use tf_listener::{Quaternion, Vector3};

/// Rotation followed by translation: `p' = R p + t`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Isometry {
    pub translation: Vector3,
    pub rotation: Quaternion,
}

impl Isometry {
    pub const IDENTITY: Isometry = Isometry {
        translation: Vector3::new(0.0, 0.0, 0.0),
        rotation: Quaternion::IDENTITY,
    };

    pub fn new(translation: Vector3, rotation: Quaternion) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    /// `self * other`: apply `other` first, then `self`.
    pub fn compose(&self, other: &Isometry) -> Isometry {
        Isometry {
            translation: add(self.translation, rotate(self.rotation, other.translation)),
            rotation: normalize(multiply(self.rotation, other.rotation)),
        }
    }

    pub fn inverse(&self) -> Isometry {
        let rotation = conjugate(self.rotation);
        let translation = rotate(rotation, self.translation);
        Isometry {
            translation: Vector3::new(-translation.x, -translation.y, -translation.z),
            rotation,
        }
    }

    pub fn transform_point(&self, point: Vector3) -> Vector3 {
        add(rotate(self.rotation, point), self.translation)
    }

    /// Interpolates between `self` (at 0) and `other` (at 1).
    pub fn interpolate(&self, other: &Isometry, ratio: f64) -> Isometry {
        Isometry {
            translation: lerp(self.translation, other.translation, ratio),
            rotation: slerp(self.rotation, other.rotation, ratio),
        }
    }
}

pub(crate) fn normalize(q: Quaternion) -> Quaternion {
    let norm = q.norm();
    if norm == 0.0 {
        return Quaternion::IDENTITY;
    }
    Quaternion::new(q.x / norm, q.y / norm, q.z / norm, q.w / norm)
}

fn add(a: Vector3, b: Vector3) -> Vector3 {
    Vector3::new(a.x + b.x, a.y + b.y, a.z + b.z)
}

fn lerp(a: Vector3, b: Vector3, ratio: f64) -> Vector3 {
    Vector3::new(
        a.x + (b.x - a.x) * ratio,
        a.y + (b.y - a.y) * ratio,
        a.z + (b.z - a.z) * ratio,
    )
}

fn conjugate(q: Quaternion) -> Quaternion {
    Quaternion::new(-q.x, -q.y, -q.z, q.w)
}

fn multiply(a: Quaternion, b: Quaternion) -> Quaternion {
    Quaternion::new(
        a.w * b.x + a.x * b.w + a.y * b.z - a.z * b.y,
        a.w * b.y - a.x * b.z + a.y * b.w + a.z * b.x,
        a.w * b.z + a.x * b.y - a.y * b.x + a.z * b.w,
        a.w * b.w - a.x * b.x - a.y * b.y - a.z * b.z,
    )
}

fn rotate(q: Quaternion, v: Vector3) -> Vector3 {
    let p = Quaternion::new(v.x, v.y, v.z, 0.0);
    let r = multiply(multiply(q, p), conjugate(q));
    Vector3::new(r.x, r.y, r.z)
}

fn slerp(a: Quaternion, b: Quaternion, ratio: f64) -> Quaternion {
    let mut dot = a.x * b.x + a.y * b.y + a.z * b.z + a.w * b.w;
    // Take the short way around.
    let b = if dot < 0.0 {
        dot = -dot;
        Quaternion::new(-b.x, -b.y, -b.z, -b.w)
    } else {
        b
    };

    if dot > 0.9995 {
        return normalize(Quaternion::new(
            a.x + (b.x - a.x) * ratio,
            a.y + (b.y - a.y) * ratio,
            a.z + (b.z - a.z) * ratio,
            a.w + (b.w - a.w) * ratio,
        ));
    }

    let theta = dot.clamp(-1.0, 1.0).acos();
    let sin_theta = theta.sin();
    let wa = ((1.0 - ratio) * theta).sin() / sin_theta;
    let wb = (ratio * theta).sin() / sin_theta;
    Quaternion::new(
        wa * a.x + wb * b.x,
        wa * a.y + wb * b.y,
        wa * a.z + wb * b.z,
        wa * a.w + wb * b.w,
    )
}
