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

use integration_test_utils::{announcement, InMemoryBus, RecordingBuffer};
use std::sync::Arc;
use support::{fixture, make_listener, shared};
use tf_listener::qos::{Durability, IntraProcessSetting, QosPolicyKind, Reliability};
use tf_listener::{
    ConfigError, DeliveryMode, ListenerConfig, ListenerError, TransformBatch, TransformListener,
    TransformTransport,
};

fn fixture_path(name: &str) -> String {
    format!("{}/tests/fixtures/{name}", env!("CARGO_MANIFEST_DIR"))
}

#[test]
fn config_file_loads_every_section() {
    let config = ListenerConfig::from_file(fixture_path("listener_config.json5"))
        .expect("listener_config.json5 should load");

    assert_eq!(config.namespace, "fleet/robot2");
    assert!(!config.use_dedicated_thread);
    assert_eq!(config.dynamic_qos.depth, 50);
    assert_eq!(config.dynamic_qos.reliability, Reliability::BestEffort);
    assert_eq!(config.static_qos.durability, Durability::TransientLocal);
    assert_eq!(config.static_options.intra_process, IntraProcessSetting::Disable);
    assert!(!config
        .static_options
        .allows_override(QosPolicyKind::Durability));
    assert_eq!(config.normalized_namespace().as_deref().ok(), Some("/fleet/robot2"));
}

#[test]
fn config_file_matches_its_string_form() {
    let from_file = ListenerConfig::from_file(fixture_path("listener_config.json5"))
        .expect("listener_config.json5 should load");
    let from_str = ListenerConfig::from_json5_str(&fixture("listener_config.json5"))
        .expect("listener_config.json5 should parse");

    assert_eq!(from_file, from_str);
}

#[test]
fn missing_config_file_reports_its_path() {
    let path = fixture_path("does_not_exist.json5");

    match ListenerConfig::from_file(&path) {
        Err(ConfigError::Read { path: reported, .. }) => assert!(reported.contains("does_not_exist")),
        other => panic!("expected a read error, got {other:?}"),
    }
}

#[tokio::test]
async fn listener_built_from_the_config_file_uses_its_settings() {
    let config = ListenerConfig::from_file(fixture_path("listener_config.json5"))
        .expect("listener_config.json5 should load");
    let buffer = Arc::new(RecordingBuffer::new());
    let bus = InMemoryBus::new("configured");

    let listener = make_listener(&buffer, &bus, config).await;
    assert_eq!(listener.delivery_mode(), DeliveryMode::CallerDriven);
    assert_eq!(listener.dynamic_topic(), "/fleet/robot2/tf");
    assert_eq!(listener.static_topic(), "/fleet/robot2/tf_static");

    let requests = bus.subscription_requests();
    assert_eq!(requests[0].qos.depth, 50);

    bus.publish(
        "/fleet/robot2/tf_static",
        TransformBatch::new(vec![announcement("base", "odom", 0.0)]),
    )
    .await;
    assert_eq!(buffer.inserted_count(), 1);
}

#[tokio::test]
async fn invalid_namespace_fails_before_anything_is_bound() {
    integration_test_utils::init_tracing();
    let buffer = Arc::new(RecordingBuffer::new());
    let bus = InMemoryBus::new("invalid-namespace");
    let transport: Arc<dyn TransformTransport> = Arc::new(bus.clone());
    let config = ListenerConfig::default().with_namespace("robot 1");

    let result = TransformListener::new(shared(&buffer), transport, config).await;

    assert!(matches!(
        result,
        Err(ListenerError::Config(ConfigError::InvalidNamespace { .. }))
    ));
    assert!(bus.subscription_requests().is_empty());
    assert!(buffer.flag_history().is_empty());
}
