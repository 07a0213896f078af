// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! # r7insight-core
//!
//! Asynchronous log shipping to Rapid7 Insight over token-based TCP, with
//! optional TLS or a DataHub relay.
//!
//! Callers hand complete log lines to [`AsyncLogger::submit`], which never
//! blocks on the network. A background worker drains the bounded queue onto a
//! persistent connection, reconnecting with exponential backoff whenever a
//! write fails.
//!
//! ## Modules
//!
//! - [`async_logger`]: ingress API and worker lifecycle
//! - [`worker`]: the drain loop and its connection state machine
//! - [`queue`]: bounded drop-oldest event queue and the process-wide registry
//! - [`transport`]: TCP/TLS connection to the ingestion endpoint
//! - [`backoff`]: reconnection policy
//! - [`credentials`], [`settings`], [`config`]: what may be shipped where
//! - [`framing`]: wire format and oversize chunking
//! - [`diagnostics`]: opt-in `tracing` diagnostics
//!
//! ```rust,ignore
//! use r7insight_core::{AsyncLogger, DeliveryConfig};
//!
//! let logger = AsyncLogger::new(DeliveryConfig::from_env());
//! logger.submit("payment accepted");
//! logger.flush(std::time::Duration::from_secs(5));
//! ```

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod async_logger;
pub mod backoff;
pub mod config;
pub mod constants;
pub mod credentials;
pub mod diagnostics;
pub mod error;
pub mod framing;
pub mod hostname;
pub mod queue;
pub mod settings;
pub mod transport;
pub mod worker;

pub use async_logger::AsyncLogger;
pub use config::{DeliveryConfig, Endpoint};
pub use error::{ConfigError, LoggerError};
pub use queue::{are_all_queues_empty, EventQueue};
pub use settings::{AppSettings, EnvironmentStore, SettingStore, SettingsLookup};
pub use transport::{tcp_transport_factory, TcpTransport, Transport, TransportFactory};
