// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Credential gate deciding whether shipping may start.
//!
//! The hosted endpoint routes lines by the token prefixed to each one, so a
//! pipeline only starts once it holds a usable token and a region. DataHub
//! relays authenticate nothing and skip the gate.
//!
//! Tokens are accepted in any form the `uuid` crate parses (hyphenated,
//! simple, braced, `urn:uuid:`) and stored in lowercase hyphenated form, which
//! is what goes on the wire.

use crate::config::DeliveryConfig;
use crate::constants::CONFIG_TOKEN_NAME;
use crate::diagnostics::diag;
use crate::error::ConfigError;
use crate::settings::SettingsLookup;
use uuid::Uuid;

/// Returns true if `token` parses as a GUID other than the nil GUID.
#[must_use]
pub fn is_valid_token(token: &str) -> bool {
    canonical_token(token).is_some()
}

/// The lowercase hyphenated form of `token`, or `None` if it is not a
/// non-nil GUID.
#[must_use]
pub fn canonical_token(token: &str) -> Option<String> {
    Uuid::parse_str(token.trim())
        .ok()
        .filter(|guid| !guid.is_nil())
        .map(|guid| guid.hyphenated().to_string())
}

/// Resolves the delivery token for `config`.
///
/// A region is mandatory. A configured token that is already valid is kept;
/// otherwise the configuration sources are queried for `Insight.Token`.
/// Either way the canonical form is written back into `config.token`.
///
/// DataHub mode needs no token and is not gated here; see [`can_start`].
pub fn load_credentials(
    config: &mut DeliveryConfig,
    settings: &SettingsLookup,
) -> Result<(), ConfigError> {
    if config.region.trim().is_empty() {
        diag!(config.debug, "{}", ConfigError::MissingRegion);
        return Err(ConfigError::MissingRegion);
    }

    if let Some(token) = canonical_token(&config.token) {
        config.token = token;
        return Ok(());
    }

    match settings.lookup(CONFIG_TOKEN_NAME) {
        Some((token, source)) => {
            diag!(config.debug, "Found setting {CONFIG_TOKEN_NAME} in {source}");
            if let Some(token) = canonical_token(&token) {
                config.token = token;
                return Ok(());
            }
        }
        None => {
            diag!(
                config.debug,
                "Unable to find Rapid7 Insight configuration setting for {CONFIG_TOKEN_NAME}"
            );
        }
    }

    diag!(config.debug, "{}", ConfigError::InvalidToken);
    Err(ConfigError::InvalidToken)
}

/// Whether the pipeline may start shipping with `config`.
///
/// DataHub mode bypasses the gate entirely.
pub fn can_start(config: &mut DeliveryConfig, settings: &SettingsLookup) -> bool {
    config.use_data_hub || load_credentials(config, settings).is_ok()
}
