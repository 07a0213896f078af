// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Local TCP listener standing in for a DataHub relay

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpListener;

#[derive(Clone)]
pub struct MockRelay {
    pub addr: SocketAddr,
    pub received_lines: Arc<Mutex<Vec<String>>>,
}

impl MockRelay {
    /// Start a relay on a random local port
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock relay");
        let addr = listener.local_addr().expect("Failed to get local addr");

        let received_lines = Arc::new(Mutex::new(Vec::new()));
        let lines_clone = received_lines.clone();

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let lines = lines_clone.clone();
                tokio::spawn(async move {
                    let mut reader = BufReader::new(stream).lines();
                    while let Ok(Some(line)) = reader.next_line().await {
                        lines.lock().unwrap().push(line);
                    }
                });
            }
        });

        Self {
            addr,
            received_lines,
        }
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Waits until `count` lines arrived. Panics after 5s.
    pub async fn wait_for_lines(&self, count: usize) -> Vec<String> {
        let wait = async {
            loop {
                let lines = self.received_lines.lock().unwrap().clone();
                if lines.len() >= count {
                    return lines;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        };
        tokio::time::timeout(Duration::from_secs(5), wait)
            .await
            .unwrap_or_else(|_| panic!("relay did not receive {count} lines"))
    }
}
