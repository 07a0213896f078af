// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Ingress side of the pipeline.
//!
//! [`AsyncLogger::submit`] never blocks on the network and never fails. The
//! first submission starts a background thread, named
//! `r7insight-log-shipper`, that runs a [`DeliveryWorker`] on a
//! single-threaded tokio runtime.

use crate::config::DeliveryConfig;
use crate::constants::{
    FLUSH_POLL_INTERVAL, LOG_LENGTH_LIMIT, QUEUE_SIZE, RECURSION_LIMIT, WORKER_JOIN_TIMEOUT,
    WORKER_THREAD_NAME,
};
use crate::credentials::can_start;
use crate::diagnostics::diag;
use crate::error::{ConfigError, LoggerError};
use crate::framing::{split_chunks, trim_line_end};
use crate::hostname::is_valid_host_name;
use crate::queue::EventQueue;
use crate::settings::SettingsLookup;
use crate::transport::{tcp_transport_factory, TransportFactory};
use crate::worker::DeliveryWorker;
use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

#[derive(Default)]
struct WorkerSlot {
    cancel: CancellationToken,
    done: Option<mpsc::Receiver<()>>,
    handle: Option<JoinHandle<()>>,
}

impl WorkerSlot {
    fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }
}

/// A log shipping pipeline: one queue, one lazily started worker.
pub struct AsyncLogger {
    config: Mutex<DeliveryConfig>,
    settings: SettingsLookup,
    queue: Arc<EventQueue>,
    transport_factory: TransportFactory,
    running: AtomicBool,
    worker: Mutex<WorkerSlot>,
}

impl std::fmt::Debug for AsyncLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncLogger")
            .field("config", &*lock(&self.config))
            .field("settings", &self.settings)
            .field("queue_len", &self.queue.len())
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl AsyncLogger {
    /// Creates a pipeline looking up missing settings in the environment.
    #[must_use]
    pub fn new(config: DeliveryConfig) -> Self {
        Self::with_settings(config, SettingsLookup::default())
    }

    #[must_use]
    pub fn with_settings(config: DeliveryConfig, settings: SettingsLookup) -> Self {
        Self::with_capacity(config, settings, QUEUE_SIZE)
    }

    /// Like [`with_settings`](Self::with_settings), with a queue holding at
    /// most `capacity` lines instead of 32768.
    #[must_use]
    pub fn with_capacity(
        config: DeliveryConfig,
        settings: SettingsLookup,
        capacity: usize,
    ) -> Self {
        Self {
            config: Mutex::new(config),
            settings,
            queue: EventQueue::new(capacity),
            transport_factory: tcp_transport_factory(),
            running: AtomicBool::new(false),
            worker: Mutex::new(WorkerSlot::default()),
        }
    }

    /// Replaces how the worker's transport is built.
    #[must_use]
    pub fn with_transport_factory(mut self, factory: TransportFactory) -> Self {
        self.transport_factory = factory;
        self
    }

    /// Enqueues `line` for delivery, starting the worker if needed.
    ///
    /// Does nothing when the credentials do not allow shipping. Lines longer
    /// than 64 KiB are split, and at most 32 pieces of one line are kept.
    pub fn submit(&self, line: &str) {
        if !self.running.load(Ordering::Acquire) && !self.start() {
            return;
        }

        let debug = self.debug();
        let line = trim_line_end(line);
        let split = split_chunks(line, LOG_LENGTH_LIMIT, RECURSION_LIMIT);

        for chunk in split.chunks {
            if self.queue.enqueue_or_evict(chunk.to_string()).is_some() {
                diag!(debug, "Queue overflow. Message dropped");
            }
        }
        if split.dropped_bytes > 0 {
            diag!(
                debug,
                "Message longer than {RECURSION_LIMIT} chunks of {LOG_LENGTH_LIMIT} bytes, dropped the last {} bytes",
                split.dropped_bytes
            );
        }
    }

    /// Waits up to `max_wait` for the worker to take every queued line.
    ///
    /// Returns early when nothing is left to drain or no live worker could
    /// drain it. Returns whether the queue is empty.
    pub fn flush(&self, max_wait: Duration) -> bool {
        let deadline = Instant::now() + max_wait;
        loop {
            if self.queue.is_empty() {
                return true;
            }
            let draining = {
                let slot = lock(&self.worker);
                self.is_running() && !slot.cancel.is_cancelled() && !slot.is_finished()
            };
            let now = Instant::now();
            if !draining || now >= deadline {
                return self.queue.is_empty();
            }
            thread::sleep(FLUSH_POLL_INTERVAL.min(deadline - now));
        }
    }

    /// Stops the worker, waiting up to one second for its thread to exit.
    ///
    /// Queued lines are kept; the next [`submit`](Self::submit) starts a new
    /// worker that drains them.
    pub fn shutdown(&self) {
        let debug = self.debug();
        let mut slot = lock(&self.worker);
        slot.cancel.cancel();

        if let Some(done) = slot.done.take() {
            match done.recv_timeout(WORKER_JOIN_TIMEOUT) {
                Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                    if let Some(handle) = slot.handle.take() {
                        if handle.join().is_err() {
                            diag!(debug, "Delivery thread panicked");
                        }
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    diag!(
                        debug,
                        "Delivery thread did not exit within {} ms, detaching it",
                        WORKER_JOIN_TIMEOUT.as_millis()
                    );
                }
            }
        }

        *slot = WorkerSlot::default();
        self.running.store(false, Ordering::Release);
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Snapshot of the current configuration, including a token adopted
    /// from the configuration sources.
    #[must_use]
    pub fn config(&self) -> DeliveryConfig {
        lock(&self.config).clone()
    }

    pub fn set_token(&self, token: impl Into<String>) -> Result<(), LoggerError> {
        let token = token.into();
        self.update(|config| config.token = token)
    }

    pub fn set_region(&self, region: impl Into<String>) -> Result<(), LoggerError> {
        let region = region.into();
        self.update(|config| config.region = region)
    }

    pub fn set_use_tls(&self, use_tls: bool) -> Result<(), LoggerError> {
        self.update(|config| config.use_tls = use_tls)
    }

    pub fn set_use_data_hub(&self, use_data_hub: bool) -> Result<(), LoggerError> {
        self.update(|config| config.use_data_hub = use_data_hub)
    }

    pub fn set_data_hub_address(&self, address: impl Into<String>) -> Result<(), LoggerError> {
        let address = address.into();
        self.update(|config| config.data_hub_address = address)
    }

    pub fn set_data_hub_port(&self, port: u16) -> Result<(), LoggerError> {
        self.update(|config| config.data_hub_port = port)
    }

    pub fn set_log_hostname(&self, log_hostname: bool) -> Result<(), LoggerError> {
        self.update(|config| config.log_hostname = log_hostname)
    }

    /// Fails with [`ConfigError::InvalidHostName`] if `host_name` contains a
    /// prohibited character.
    pub fn set_host_name(&self, host_name: impl Into<String>) -> Result<(), LoggerError> {
        let host_name = host_name.into();
        if !is_valid_host_name(&host_name) {
            return Err(ConfigError::InvalidHostName(host_name).into());
        }
        self.update(|config| config.host_name = host_name)
    }

    pub fn set_log_id(&self, log_id: impl Into<String>) -> Result<(), LoggerError> {
        let log_id = log_id.into();
        self.update(|config| config.log_id = log_id)
    }

    pub fn set_debug(&self, debug: bool) -> Result<(), LoggerError> {
        self.update(|config| config.debug = debug)
    }

    // Lock order everywhere: worker slot, then config.
    fn update(&self, f: impl FnOnce(&mut DeliveryConfig)) -> Result<(), LoggerError> {
        let _slot = lock(&self.worker);
        if self.is_running() {
            return Err(LoggerError::AlreadyStarted);
        }
        f(&mut lock(&self.config));
        Ok(())
    }

    fn debug(&self) -> bool {
        lock(&self.config).debug
    }

    /// Starts the worker unless it is already running. Returns whether it is.
    fn start(&self) -> bool {
        let mut slot = lock(&self.worker);
        if self.is_running() {
            return true;
        }

        let config = {
            let mut config = lock(&self.config);
            if !can_start(&mut config, &self.settings) {
                return false;
            }
            match config.validate() {
                // the worker runs without the HostName prefix instead
                Ok(()) | Err(ConfigError::InvalidHostName(_)) => {}
                Err(e) => {
                    diag!(config.debug, "{e}");
                    return false;
                }
            }
            config.clone()
        };
        let debug = config.debug;

        let transport = (self.transport_factory)(&config);
        let endpoint = transport.endpoint();
        let mut worker = DeliveryWorker::new(
            config,
            Arc::clone(&self.queue),
            transport,
            slot.cancel.clone(),
        );

        let (done_tx, done_rx) = mpsc::channel();
        let spawned = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(runtime) => runtime,
                    Err(e) => {
                        diag!(debug, "Unable to start the delivery runtime: {e}");
                        return;
                    }
                };

                runtime.block_on(async move {
                    let task = tokio::spawn(async move { worker.run().await });
                    if let Err(e) = task.await {
                        if e.is_panic() {
                            diag!(
                                debug,
                                "Delivery worker terminated: {}",
                                panic_message(e.into_panic().as_ref())
                            );
                        }
                    }
                });

                // the receiver is gone if shutdown already gave up on us
                let _ = done_tx.send(());
            });

        match spawned {
            Ok(handle) => {
                slot.handle = Some(handle);
                slot.done = Some(done_rx);
                self.running.store(true, Ordering::Release);
                diag!(debug, "Started delivery to {endpoint}");
                true
            }
            Err(e) => {
                diag!(debug, "Unable to spawn {WORKER_THREAD_NAME}: {e}");
                false
            }
        }
    }
}

impl Drop for AsyncLogger {
    fn drop(&mut self) {
        self.worker
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .cancel
            .cancel();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown cause".to_string()
    }
}
