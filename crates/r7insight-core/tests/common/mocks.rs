// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! In-memory transport for driving the pipeline without a network

#![allow(dead_code)]

use async_trait::async_trait;
use r7insight_core::{DeliveryConfig, Transport, TransportFactory};
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// State shared by every transport a [`StubFactory`] builds.
#[derive(Default)]
pub struct StubRecord {
    pub writes: Mutex<Vec<Vec<u8>>>,
    pub connects: AtomicUsize,
    pub transports_built: AtomicUsize,
    failing_connects: AtomicUsize,
}

impl StubRecord {
    pub fn lines(&self) -> Vec<String> {
        self.writes
            .lock()
            .unwrap()
            .iter()
            .map(|bytes| String::from_utf8(bytes.clone()).unwrap())
            .collect()
    }

    /// Polls until `count` writes were recorded. Panics after 5s.
    pub fn wait_for_writes(&self, count: usize) -> Vec<String> {
        let start = Instant::now();
        loop {
            let lines = self.lines();
            if lines.len() >= count {
                return lines;
            }
            assert!(
                start.elapsed() < Duration::from_secs(5),
                "expected {count} writes, got {lines:?}"
            );
            thread::sleep(Duration::from_millis(10));
        }
    }
}

/// Transport whose connects fail while the shared failure budget lasts.
pub struct StubTransport {
    record: Arc<StubRecord>,
}

#[async_trait]
impl Transport for StubTransport {
    async fn connect(&mut self) -> io::Result<()> {
        self.record.connects.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .record
            .failing_connects
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if failing.is_ok() {
            return Err(io::Error::new(io::ErrorKind::ConnectionRefused, "refused"));
        }
        Ok(())
    }

    async fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.record.writes.lock().unwrap().push(bytes.to_vec());
        Ok(())
    }

    async fn close(&mut self) {}

    fn endpoint(&self) -> String {
        "stub:0".to_string()
    }
}

/// Returns a factory whose transports fail the first `failing_connects`
/// connects overall, plus the record they share.
pub fn stub_factory(failing_connects: usize) -> (TransportFactory, Arc<StubRecord>) {
    let record = Arc::new(StubRecord {
        failing_connects: AtomicUsize::new(failing_connects),
        ..Default::default()
    });
    let shared = Arc::clone(&record);
    let factory: TransportFactory = Arc::new(move |_: &DeliveryConfig| {
        shared.transports_built.fetch_add(1, Ordering::SeqCst);
        Box::new(StubTransport {
            record: Arc::clone(&shared),
        }) as Box<dyn Transport>
    });
    (factory, record)
}
