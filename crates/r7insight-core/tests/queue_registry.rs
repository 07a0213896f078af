// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Process-wide queue registry, exercised from a binary of its own so no
//! other test's queues are registered.

mod common;

use common::mocks::stub_factory;
use common::TOKEN;
use r7insight_core::{are_all_queues_empty, AsyncLogger, DeliveryConfig, SettingsLookup};
use std::time::Duration;

#[test]
fn test_all_queues_drain_across_instances() {
    let (factory_a, record_a) = stub_factory(0);
    let (factory_b, record_b) = stub_factory(1);
    let config = DeliveryConfig {
        token: TOKEN.to_string(),
        region: "eu".to_string(),
        ..Default::default()
    };

    let a = AsyncLogger::with_settings(config.clone(), SettingsLookup::empty())
        .with_transport_factory(factory_a);
    let b = AsyncLogger::with_settings(config, SettingsLookup::empty())
        .with_transport_factory(factory_b);

    for i in 0..10 {
        a.submit(&format!("a{i}"));
        b.submit(&format!("b{i}"));
    }

    assert!(are_all_queues_empty(Duration::from_secs(5)));
    record_a.wait_for_writes(10);
    record_b.wait_for_writes(10);

    a.shutdown();
    b.shutdown();
    drop(a);
    drop(b);
    assert!(are_all_queues_empty(Duration::ZERO));
}
