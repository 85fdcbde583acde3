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

//! Canonical structured field keys and value-format helpers.

use crate::transform::TransformAnnouncement;
use std::any::Any;

pub const EVENT: &str = "event";
pub const COMPONENT: &str = "component";
pub const LISTENER_ID: &str = "listener_id";
pub const EXECUTOR_THREAD: &str = "executor_thread";
pub const TOPIC: &str = "topic";
pub const STREAM: &str = "stream";

pub const FRAME_ID: &str = "frame_id";
pub const PARENT_FRAME_ID: &str = "parent_frame_id";
pub const AUTHORITY: &str = "authority";
pub const STAMP: &str = "stamp";

pub const BATCH_LEN: &str = "batch_len";
pub const INSERTED: &str = "inserted";
pub const REJECTED: &str = "rejected";
pub const REASON: &str = "reason";
pub const ERR: &str = "err";

pub const NONE: &str = "none";
pub const REASON_SHUTDOWN: &str = "listener_shutdown";
pub const REASON_STOP_SIGNAL: &str = "stop_signal";
pub const REASON_QUEUE_CLOSED: &str = "queue_closed";
pub const REASON_EXECUTOR_STOPPED: &str = "executor_stopped";
pub const DEFAULT_EXECUTOR_THREAD: &str = "unknown-thread";

pub fn thread_name_or_default(thread_name: Option<&str>) -> String {
    thread_name.unwrap_or(DEFAULT_EXECUTOR_THREAD).to_string()
}

pub fn current_thread_name_or_default() -> String {
    thread_name_or_default(std::thread::current().name())
}

pub fn format_frame_id(frame_id: &str) -> &str {
    if frame_id.is_empty() {
        NONE
    } else {
        frame_id
    }
}

/// Message carried by a caught panic, if it is a string.
pub fn format_panic_payload(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        NONE
    }
}

pub fn format_authority(transform: &TransformAnnouncement) -> &str {
    format_frame_id(&transform.authority)
}

pub fn format_stamp(transform: &TransformAnnouncement) -> String {
    format!("{:.9}", transform.stamp.as_secs_f64())
}
