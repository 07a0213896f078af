// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! The delivery worker drains an [`EventQueue`] onto a [`Transport`].
//!
//! ```text
//! Idle -> Connecting -> Draining <-> Reconnecting
//!              \____________\_____________\______-> Stopped (cancelled)
//! ```
//!
//! A line taken from the queue is never skipped because of a write failure:
//! the worker reconnects and retries the same bytes until they are written or
//! the worker is cancelled.

use crate::backoff::reconnect;
use crate::config::DeliveryConfig;
use crate::diagnostics::diag;
use crate::framing::Framer;
use crate::hostname::{resolve_host_name, HostNameSkip};
use crate::queue::EventQueue;
use crate::transport::Transport;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// State of the worker's one connection. Only the worker changes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Connecting,
    Draining,
    Reconnecting,
    Stopped,
}

pub struct DeliveryWorker {
    config: DeliveryConfig,
    queue: Arc<EventQueue>,
    transport: Box<dyn Transport>,
    cancel: CancellationToken,
    state: WorkerState,
    connection: ConnectionState,
}

impl DeliveryWorker {
    #[must_use]
    pub fn new(
        config: DeliveryConfig,
        queue: Arc<EventQueue>,
        transport: Box<dyn Transport>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            queue,
            transport,
            cancel,
            state: WorkerState::Idle,
            connection: ConnectionState::Disconnected,
        }
    }

    #[must_use]
    pub fn state(&self) -> WorkerState {
        self.state
    }

    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        self.connection
    }

    /// Runs until cancelled.
    pub async fn run(&mut self) {
        self.state = WorkerState::Connecting;
        if !self.connect().await {
            self.stop().await;
            return;
        }

        let framer = self.framer();
        self.state = WorkerState::Draining;

        while !self.cancel.is_cancelled() {
            let Some(line) = self.queue.dequeue(&self.cancel).await else {
                break;
            };
            let message = framer.frame(&line);
            if !self.deliver(&message).await {
                break;
            }
        }

        self.stop().await;
    }

    // Host name resolution happens once per run.
    fn framer(&self) -> Framer {
        let debug = self.config.debug;
        let host_name = match resolve_host_name(self.config.log_hostname, &self.config.host_name) {
            Ok(host_name) => Some(host_name),
            Err(HostNameSkip::Disabled) => None,
            Err(HostNameSkip::Invalid(host_name)) => {
                diag!(
                    debug,
                    "Host name '{host_name}' contains prohibited characters, HostName prefix disabled"
                );
                None
            }
            Err(HostNameSkip::Undiscoverable) => {
                diag!(debug, "Unable to discover the local host name, HostName prefix disabled");
                None
            }
        };

        let token = (!self.config.use_data_hub).then_some(self.config.token.as_str());
        Framer::new(token, &self.config.log_id, host_name.as_deref())
    }

    /// Writes `message`, reconnecting and retrying on failure.
    ///
    /// Returns `false` if cancelled before the write succeeded.
    async fn deliver(&mut self, message: &[u8]) -> bool {
        let debug = self.config.debug;
        loop {
            let result = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return false,
                result = self.transport.write(message) => result,
            };

            match result {
                Ok(()) => {
                    diag!(debug, "Write complete");
                    return true;
                }
                Err(e) => {
                    diag!(debug, "Write to {} failed: {e}", self.transport.endpoint());
                    self.state = WorkerState::Reconnecting;
                    if !self.connect().await {
                        return false;
                    }
                    self.state = WorkerState::Draining;
                }
            }
        }
    }

    async fn connect(&mut self) -> bool {
        self.connection = ConnectionState::Connecting;
        let connected = reconnect(self.transport.as_mut(), &self.cancel, self.config.debug).await;
        self.connection = if connected {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        };
        connected
    }

    async fn stop(&mut self) {
        self.transport.close().await;
        self.connection = ConnectionState::Disconnected;
        self.state = WorkerState::Stopped;
        diag!(self.config.debug, "Delivery worker stopped");
    }
}
