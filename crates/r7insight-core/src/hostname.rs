// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Host name validation and discovery for the `HostName=` line prefix.

use crate::constants::FORBIDDEN_HOST_NAME_CHARS;
use std::env;

/// Returns false if `host_name` contains any prohibited character.
#[must_use]
pub fn is_valid_host_name(host_name: &str) -> bool {
    !host_name.contains(FORBIDDEN_HOST_NAME_CHARS)
}

/// Discover the local host name.
///
/// Tries, in order:
/// 1. `COMPUTERNAME` environment variable
/// 2. `HOSTNAME` environment variable
/// 3. `gethostname()` on unix
///
/// Returns `None` when no method yields a non-empty name.
#[must_use]
pub fn discover_host_name() -> Option<String> {
    for key in ["COMPUTERNAME", "HOSTNAME"] {
        if let Ok(hostname) = env::var(key) {
            if !hostname.is_empty() {
                return Some(hostname);
            }
        }
    }

    #[cfg(unix)]
    {
        if let Ok(hostname) = nix::unistd::gethostname() {
            if let Some(hostname) = hostname.to_str() {
                if !hostname.is_empty() {
                    return Some(hostname.to_string());
                }
            }
        }
    }

    None
}

/// Why host-name prefixing was turned off for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum HostNameSkip {
    Disabled,
    Invalid(String),
    Undiscoverable,
}

/// Picks the host name used for prefixing: the configured one if valid,
/// otherwise a discovered one when nothing was configured.
pub(crate) fn resolve_host_name(
    log_hostname: bool,
    configured: &str,
) -> Result<String, HostNameSkip> {
    if !log_hostname {
        return Err(HostNameSkip::Disabled);
    }
    if configured.is_empty() {
        return discover_host_name().ok_or(HostNameSkip::Undiscoverable);
    }
    if !is_valid_host_name(configured) {
        return Err(HostNameSkip::Invalid(configured.to_string()));
    }
    Ok(configured.to_string())
}
