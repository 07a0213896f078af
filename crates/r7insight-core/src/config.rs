// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Delivery configuration.
//!
//! A [`DeliveryConfig`] says where lines go and how each one is prefixed.
//! It can be built directly, deserialized from the camelCase names logging
//! adapters use, or read from `INSIGHT_*` environment variables:
//!
//! | Field | Environment variable | Notes |
//! |---|---|---|
//! | `token` | `INSIGHT_TOKEN` | GUID; looked up as `Insight.Token` when empty |
//! | `region` | `INSIGHT_REGION` | required unless DataHub mode is on |
//! | `use_tls` | `INSIGHT_USE_TLS` | port 443 instead of 80 |
//! | `use_data_hub` | `INSIGHT_USE_DATAHUB` | never TLS, no token prefix |
//! | `data_hub_address` | `INSIGHT_DATAHUB_ADDRESS` | |
//! | `data_hub_port` | `INSIGHT_DATAHUB_PORT` | must be nonzero |
//! | `log_hostname` | `INSIGHT_LOG_HOSTNAME` | |
//! | `host_name` | `INSIGHT_HOSTNAME` | discovered when empty |
//! | `log_id` | `INSIGHT_LOG_ID` | |
//! | `debug` | `INSIGHT_DEBUG` | `true`, `1` or `yes` |
//!
//! The configuration is fixed once a worker has started; see
//! [`AsyncLogger`](crate::AsyncLogger) for the setters.

use crate::constants::{DATA_HOST_DOMAIN, SECURE_PORT, UNSECURE_PORT};
use crate::error::ConfigError;
use crate::hostname::is_valid_host_name;
use serde::Deserialize;
use std::env;

/// Options controlling where and how log lines are shipped.
///
/// Field names deserialize from the camelCase names adapters expose
/// (`token`, `region`, `useTls`, `useDataHub`, `dataHubAddress`,
/// `dataHubPort`, `logHostname`, `hostName`, `logId`, `debug`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DeliveryConfig {
    /// Delivery token, a GUID. Looked up in the configuration sources when empty.
    pub token: String,
    /// Routing region of the hosted endpoint, e.g. "us" or "eu"
    pub region: String,
    /// Ship over TLS on port 443 instead of plain TCP on port 80
    pub use_tls: bool,
    /// Ship to a user-operated DataHub relay instead of the hosted endpoint
    pub use_data_hub: bool,
    pub data_hub_address: String,
    pub data_hub_port: u16,
    /// Prefix every line with `HostName=<name> `
    pub log_hostname: bool,
    /// Host name for the prefix; discovered from the system when empty
    pub host_name: String,
    /// Prefix every line with `<logId> `
    pub log_id: String,
    /// Emit pipeline diagnostics
    pub debug: bool,
}

/// Resolved network target of a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    pub use_tls: bool,
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl DeliveryConfig {
    /// Create configuration from `INSIGHT_*` environment variables.
    ///
    /// Unset or unparsable values keep their defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            token: env_string("INSIGHT_TOKEN"),
            region: env_string("INSIGHT_REGION"),
            use_tls: env_bool("INSIGHT_USE_TLS"),
            use_data_hub: env_bool("INSIGHT_USE_DATAHUB"),
            data_hub_address: env_string("INSIGHT_DATAHUB_ADDRESS"),
            data_hub_port: env::var("INSIGHT_DATAHUB_PORT")
                .ok()
                .and_then(|port| port.trim().parse::<u16>().ok())
                .unwrap_or_default(),
            log_hostname: env_bool("INSIGHT_LOG_HOSTNAME"),
            host_name: env_string("INSIGHT_HOSTNAME"),
            log_id: env_string("INSIGHT_LOG_ID"),
            debug: env_bool("INSIGHT_DEBUG"),
        }
    }

    /// Checks the settings that do not depend on the configuration sources.
    ///
    /// Token resolution is left to the credential gate, which can still find
    /// a token in the environment or app settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.use_data_hub {
            if self.data_hub_address.trim().is_empty() {
                return Err(ConfigError::MissingDataHubAddress);
            }
            if self.data_hub_port == 0 {
                return Err(ConfigError::InvalidDataHubPort);
            }
        } else if self.region.trim().is_empty() {
            return Err(ConfigError::MissingRegion);
        }

        if self.log_hostname && !self.host_name.is_empty() && !is_valid_host_name(&self.host_name)
        {
            return Err(ConfigError::InvalidHostName(self.host_name.clone()));
        }

        Ok(())
    }

    /// The address the transport connects to.
    ///
    /// DataHub relays never use TLS.
    #[must_use]
    pub fn endpoint(&self) -> Endpoint {
        if self.use_data_hub {
            Endpoint {
                host: self.data_hub_address.clone(),
                port: self.data_hub_port,
                use_tls: false,
            }
        } else {
            Endpoint {
                host: format!("{}.{}", self.region, DATA_HOST_DOMAIN),
                port: if self.use_tls { SECURE_PORT } else { UNSECURE_PORT },
                use_tls: self.use_tls,
            }
        }
    }
}

fn env_string(key: &str) -> String {
    env::var(key).unwrap_or_default()
}

fn env_bool(key: &str) -> bool {
    env::var(key)
        .map(|val| matches!(val.trim().to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}
