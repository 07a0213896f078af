// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Error types. Delivery failures are retried, not returned, so only
//! configuration problems surface as errors.

/// Reasons a delivery configuration cannot be used to ship logs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("No region is configured, please make sure one is configured; e.g: 'eu', 'us'")]
    MissingRegion,

    #[error("Log token value is invalid or missing")]
    InvalidToken,

    #[error("DataHub mode is enabled but no DataHub address is configured")]
    MissingDataHubAddress,

    #[error("DataHub mode is enabled but the DataHub port is 0")]
    InvalidDataHubPort,

    #[error("Host name '{0}' contains prohibited characters")]
    InvalidHostName(String),

    #[error("Failed to load app settings: {0}")]
    AppSettings(String),
}

/// Errors returned by the pipeline's configuration API.
///
/// `submit`, `flush` and `shutdown` never return errors.
#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    #[error("Delivery configuration cannot change while the worker is running")]
    AlreadyStarted,

    #[error(transparent)]
    Config(#[from] ConfigError),
}
