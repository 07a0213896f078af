// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Limits, endpoints and setting names used by the delivery pipeline.

use std::time::Duration;

/// Default capacity of a pipeline's event queue, in entries.
pub const QUEUE_SIZE: usize = 32_768;

/// Maximum size in bytes of a single wire message body (2^16).
///
/// Longer lines are split into chunks of at most this many bytes.
pub const LOG_LENGTH_LIMIT: usize = 65_536;

/// Maximum number of chunks produced from a single submission.
///
/// Caps one logical submission at `RECURSION_LIMIT * LOG_LENGTH_LIMIT` bytes;
/// anything past that is dropped.
pub const RECURSION_LIMIT: usize = 32;

/// First reconnection delay.
pub const MIN_RECONNECT_DELAY: Duration = Duration::from_millis(100);

/// Upper bound of the reconnection delay before jitter.
pub const MAX_RECONNECT_DELAY: Duration = Duration::from_millis(10_000);

/// Domain of the hosted ingestion endpoint; the region is prepended as a label.
pub(crate) const DATA_HOST_DOMAIN: &str = "data.logs.insight.rapid7.com";

/// Port for plain TCP ingestion.
pub const UNSECURE_PORT: u16 = 80;

/// Port for TLS ingestion.
pub const SECURE_PORT: u16 = 443;

/// Idle time before the first keep-alive packet.
pub(crate) const KEEPALIVE_IDLE: Duration = Duration::from_secs(10);

/// Interval between keep-alive packets.
pub(crate) const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(1);

/// Poll period for `flush` and the all-queues check.
pub(crate) const FLUSH_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How long `shutdown` waits for the worker thread to exit.
pub(crate) const WORKER_JOIN_TIMEOUT: Duration = Duration::from_millis(1_000);

/// Name given to the background delivery thread.
pub(crate) const WORKER_THREAD_NAME: &str = "r7insight-log-shipper";

/// Setting name queried in the configuration sources for a delivery token.
pub const CONFIG_TOKEN_NAME: &str = "Insight.Token";

/// Replacement for embedded newlines so a multi-line event stays one record.
pub const LINE_SEPARATOR: &str = "\u{2028}";

/// Newline sequences replaced by [`LINE_SEPARATOR`], in replacement order.
pub(crate) const NEWLINES: [&str; 2] = ["\r\n", "\n"];

/// Characters that may not appear in a user-supplied host name.
pub(crate) const FORBIDDEN_HOST_NAME_CHARS: &[char] = &[
    '/', '\\', '[', ']', '"', ':', ';', '|', '<', '>', '+', '=', ',', '?', '*', ' ', '_',
];
