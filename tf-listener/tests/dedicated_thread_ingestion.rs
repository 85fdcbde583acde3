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

mod support;

use integration_test_utils::{announcement, offset, InMemoryBus, RecordingBuffer};
use memory_transform_buffer::MemoryTransformBuffer;
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use support::{fixture, make_listener, shared, wait_for_batches, WAIT};
use tf_listener::{
    BufferError, DeliveryMode, ListenerConfig, ListenerError, StreamKind, TransformAnnouncement,
    TransformBatch, TransformBuffer, TransformListener, TransformTransport, TransportError,
    DYNAMIC_TOPIC, STATIC_TOPIC,
};

#[derive(Deserialize)]
struct RobotTree {
    r#static: TransformBatch,
    dynamic: TransformBatch,
}

/// Panics on its first insert, then behaves like a [`RecordingBuffer`].
#[derive(Default)]
struct PanicOnceBuffer {
    panicked: AtomicBool,
    inner: RecordingBuffer,
}

impl TransformBuffer for PanicOnceBuffer {
    fn insert_transform(
        &self,
        transform: &TransformAnnouncement,
        kind: StreamKind,
    ) -> Result<(), BufferError> {
        if !self.panicked.swap(true, Ordering::SeqCst) {
            panic!("storage corrupted while inserting {}", transform.frame_id);
        }
        self.inner.insert_transform(transform, kind)
    }

    fn set_using_dedicated_thread(&self, value: bool) {
        self.inner.set_using_dedicated_thread(value);
    }

    fn is_using_dedicated_thread(&self) -> bool {
        self.inner.is_using_dedicated_thread()
    }
}

fn robot_tree() -> RobotTree {
    serde_json::from_str(&fixture("robot_tree.json")).expect("robot_tree.json should parse")
}

#[tokio::test]
async fn flag_is_set_before_delivery_and_inserts_run_on_the_executor_thread() {
    let buffer = Arc::new(RecordingBuffer::new());
    let bus = InMemoryBus::new("dedicated");
    let listener = make_listener(&buffer, &bus, ListenerConfig::default()).await;

    assert_eq!(listener.delivery_mode(), DeliveryMode::DedicatedThread);
    assert_eq!(buffer.flag_history(), vec![true]);
    assert!(buffer.is_using_dedicated_thread());
    let executor_thread = listener
        .executor_thread_id()
        .expect("dedicated mode should own a thread");
    assert_ne!(executor_thread, std::thread::current().id());

    bus.publish(DYNAMIC_TOPIC, TransformBatch::new(vec![announcement("odom", "robot", 1.0)]))
        .await;

    let records = buffer.wait_for_inserts(1, WAIT);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].kind, StreamKind::Dynamic);
    assert_eq!(records[0].thread_name.as_deref(), Some("tf-listener"));
}

#[tokio::test]
async fn inserts_are_tagged_with_the_stream_they_arrived_on() {
    let buffer = Arc::new(RecordingBuffer::new());
    let bus = InMemoryBus::new("tagging");
    let _listener = make_listener(&buffer, &bus, ListenerConfig::default()).await;

    bus.publish_latched(
        STATIC_TOPIC,
        TransformBatch::new(vec![announcement("base", "odom", 0.0)]),
    )
    .await;
    bus.publish(
        DYNAMIC_TOPIC,
        TransformBatch::new(vec![
            announcement("odom", "robot", 1.0),
            announcement("robot", "lidar", 1.0),
        ]),
    )
    .await;

    let records = buffer.wait_for_inserts(3, WAIT);
    let tagged: Vec<(&str, StreamKind)> = records
        .iter()
        .map(|record| (record.frame_id.as_str(), record.kind))
        .collect();
    assert_eq!(
        tagged,
        vec![
            ("odom", StreamKind::Static),
            ("robot", StreamKind::Dynamic),
            ("lidar", StreamKind::Dynamic),
        ]
    );
}

#[tokio::test]
async fn late_listener_receives_the_latched_static_batch() {
    let buffer = Arc::new(RecordingBuffer::new());
    let bus = InMemoryBus::new("latched");
    bus.publish_latched(
        STATIC_TOPIC,
        TransformBatch::new(vec![announcement("base", "odom", 0.0)]),
    )
    .await;

    let _listener = make_listener(&buffer, &bus, ListenerConfig::default()).await;

    let records = buffer.wait_for_inserts(1, WAIT);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].frame_id, "odom");
    assert_eq!(records[0].kind, StreamKind::Static);
}

#[tokio::test]
async fn reader_blocks_until_the_dynamic_link_arrives() {
    let buffer = Arc::new(MemoryTransformBuffer::default());
    let bus = InMemoryBus::new("robot-tree");
    let tree = robot_tree();
    let listener = make_listener(&buffer, &bus, ListenerConfig::default()).await;

    bus.publish_latched(STATIC_TOPIC, tree.r#static).await;

    let reader_buffer = buffer.clone();
    let reader = std::thread::spawn(move || {
        reader_buffer.wait_for_transform("base", "robot", Duration::from_secs(1), WAIT)
    });

    bus.publish(DYNAMIC_TOPIC, tree.dynamic).await;

    let pose = reader
        .join()
        .expect("reader thread should not panic")
        .expect("base -> robot should become available");
    assert!((pose.translation.x - 1.5).abs() < 1e-9);
    assert!((pose.translation.y - 0.25).abs() < 1e-9);
    assert!(buffer.is_static("odom"));
    assert!(!buffer.is_static("robot"));

    assert_eq!(wait_for_batches(&listener, 2).await, 2);
    let diagnostics = listener.diagnostics();
    assert_eq!(diagnostics.static_batches, 1);
    assert_eq!(diagnostics.dynamic_batches, 1);
    assert_eq!(diagnostics.transforms_inserted, 2);
    assert!(listener.last_update().is_some());
}

#[tokio::test]
async fn static_link_stays_valid_at_any_time() {
    let buffer = Arc::new(MemoryTransformBuffer::default());
    let bus = InMemoryBus::new("static-any-time");
    let _listener = make_listener(&buffer, &bus, ListenerConfig::default()).await;

    bus.publish_latched(
        STATIC_TOPIC,
        TransformBatch::new(vec![offset("base", "odom", 0.0, 2.0, 0.0)]),
    )
    .await;

    let pose = buffer
        .wait_for_transform("base", "odom", Duration::from_secs(3600), WAIT)
        .expect("static transforms do not expire");
    assert!((pose.translation.x - 2.0).abs() < 1e-9);
}

#[tokio::test]
async fn drop_waits_for_the_in_flight_insert_and_stops_delivery() {
    let buffer = Arc::new(RecordingBuffer::with_insert_delay(Duration::from_millis(200)));
    let bus = InMemoryBus::new("drop");
    let listener = make_listener(&buffer, &bus, ListenerConfig::default()).await;

    bus.publish(DYNAMIC_TOPIC, TransformBatch::new(vec![announcement("odom", "a", 1.0)]))
        .await;
    bus.publish(DYNAMIC_TOPIC, TransformBatch::new(vec![announcement("odom", "b", 1.0)]))
        .await;
    assert_eq!(buffer.wait_for_started(1, WAIT), 1);

    drop(listener);

    assert_eq!(buffer.inserted_count(), 1);
    assert_eq!(buffer.records()[0].frame_id, "a");
    assert_eq!(bus.subscriber_count(DYNAMIC_TOPIC), 0);
    assert_eq!(bus.subscriber_count(STATIC_TOPIC), 0);

    let delivered = bus
        .publish(DYNAMIC_TOPIC, TransformBatch::new(vec![announcement("odom", "c", 1.0)]))
        .await;
    assert_eq!(delivered, 0);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(buffer.started_count(), 1);
}

#[tokio::test]
async fn shutdown_is_idempotent() {
    let buffer = Arc::new(RecordingBuffer::new());
    let bus = InMemoryBus::new("shutdown");
    let mut listener = make_listener(&buffer, &bus, ListenerConfig::default()).await;
    assert!(listener.is_running());

    listener.shutdown();
    listener.shutdown();

    assert!(!listener.is_running());
    assert!(listener.executor_thread_id().is_none());
    assert_eq!(bus.subscriber_count(DYNAMIC_TOPIC), 0);
    assert_eq!(bus.subscriber_count(STATIC_TOPIC), 0);

    bus.publish(DYNAMIC_TOPIC, TransformBatch::new(vec![announcement("odom", "robot", 1.0)]))
        .await;
    drop(listener);
    assert_eq!(buffer.started_count(), 0);
}

#[tokio::test]
async fn failed_static_subscription_is_fatal_and_restores_the_flag() {
    integration_test_utils::init_tracing();
    let buffer = Arc::new(RecordingBuffer::new());
    let bus = InMemoryBus::new("failing");
    bus.fail_subscriptions_on(STATIC_TOPIC);
    let transport: Arc<dyn TransformTransport> = Arc::new(bus.clone());

    let result = TransformListener::new(shared(&buffer), transport, ListenerConfig::default()).await;

    match result {
        Err(ListenerError::Subscribe { topic, .. }) => assert_eq!(topic, STATIC_TOPIC),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("construction should fail when /tf_static cannot be bound"),
    }
    assert_eq!(buffer.flag_history(), vec![true, false]);
    assert!(!buffer.is_using_dedicated_thread());
    assert_eq!(bus.subscriber_count(DYNAMIC_TOPIC), 0);
}

#[tokio::test]
async fn intra_process_on_the_latched_stream_is_rejected() {
    integration_test_utils::init_tracing();
    let buffer = Arc::new(RecordingBuffer::new());
    let bus = InMemoryBus::new("intra-process");
    let mut config = ListenerConfig::default();
    config.static_options.intra_process = tf_listener::qos::IntraProcessSetting::Enable;
    let transport: Arc<dyn TransformTransport> = Arc::new(bus.clone());

    let result = TransformListener::new(shared(&buffer), transport, config).await;

    match result {
        Err(ListenerError::Subscribe { topic, source }) => {
            assert_eq!(topic, STATIC_TOPIC);
            assert!(matches!(source, TransportError::UnsupportedQos { .. }));
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("intra-process with transient-local durability should be refused"),
    }
    assert!(!buffer.is_using_dedicated_thread());
    assert_eq!(bus.subscriber_count(DYNAMIC_TOPIC), 0);
}

#[tokio::test]
async fn panicking_buffer_does_not_stop_delivery() {
    let buffer = Arc::new(PanicOnceBuffer::default());
    let bus = InMemoryBus::new("panicking-buffer");
    let listener = make_listener(&buffer, &bus, ListenerConfig::default()).await;

    bus.publish(DYNAMIC_TOPIC, TransformBatch::new(vec![announcement("odom", "first", 1.0)]))
        .await;
    bus.publish(DYNAMIC_TOPIC, TransformBatch::new(vec![announcement("odom", "second", 1.0)]))
        .await;

    let records = buffer.inner.wait_for_inserts(1, WAIT);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].frame_id, "second");
    assert_eq!(records[0].thread_name.as_deref(), Some("tf-listener"));

    assert_eq!(wait_for_batches(&listener, 2).await, 2);
    assert_eq!(listener.diagnostics().transforms_rejected, 1);
    assert!(listener.is_running());
    assert!(listener.executor_thread_id().is_some());
}
