// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Configuration-source lookup.
//!
//! A [`SettingsLookup`] holds named setting stores in priority order and
//! answers "what is the value of this setting, and which source had it".
//! The default lookup checks environment variables first, then app settings.

use crate::error::ConfigError;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt::Debug;
use std::path::Path;

/// A single source of named settings.
pub trait SettingStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
}

impl<F> SettingStore for F
where
    F: Fn(&str) -> Option<String> + Send + Sync,
{
    fn get(&self, key: &str) -> Option<String> {
        self(key)
    }
}

/// Reads settings from the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvironmentStore;

impl SettingStore for EnvironmentStore {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Application settings held in memory, typically loaded from a JSON file of
/// the form `{ "Insight.Token": "..." }`.
#[derive(Debug, Clone, Default)]
pub struct AppSettings {
    values: HashMap<String, String>,
}

impl AppSettings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a flat JSON object. Numbers and booleans are kept in their
    /// textual form; nested values and nulls are ignored.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let raw: HashMap<String, Value> =
            serde_json::from_str(json).map_err(|e| ConfigError::AppSettings(e.to_string()))?;

        let values = raw
            .into_iter()
            .filter_map(|(key, value)| match value {
                Value::String(s) => Some((key, s)),
                Value::Bool(b) => Some((key, b.to_string())),
                Value::Number(n) => Some((key, n.to_string())),
                _ => None,
            })
            .collect();

        Ok(Self { values })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::AppSettings(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&contents)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }
}

impl SettingStore for AppSettings {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

/// Named setting stores queried in registration order.
pub struct SettingsLookup {
    stores: Vec<(String, Box<dyn SettingStore>)>,
}

impl SettingsLookup {
    /// A lookup with no stores; every query misses.
    #[must_use]
    pub fn empty() -> Self {
        Self { stores: Vec::new() }
    }

    /// Environment variables first, then the given app settings.
    #[must_use]
    pub fn with_app_settings(app_settings: AppSettings) -> Self {
        let mut lookup = Self::empty();
        lookup.register("Environment Variable", EnvironmentStore);
        lookup.register("App Settings", app_settings);
        lookup
    }

    /// Appends a store with the lowest priority so far.
    pub fn register(&mut self, name: impl Into<String>, store: impl SettingStore + 'static) {
        self.stores.push((name.into(), Box::new(store)));
    }

    /// Returns the first non-empty value for `key` along with the name of the
    /// store that answered.
    #[must_use]
    pub fn lookup(&self, key: &str) -> Option<(String, &str)> {
        self.stores.iter().find_map(|(name, store)| {
            store
                .get(key)
                .filter(|value| !value.is_empty())
                .map(|value| (value, name.as_str()))
        })
    }
}

impl Default for SettingsLookup {
    fn default() -> Self {
        Self::with_app_settings(AppSettings::new())
    }
}

impl Debug for SettingsLookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.stores.iter().map(|(name, _)| name))
            .finish()
    }
}
