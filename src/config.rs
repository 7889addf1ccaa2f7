//! # Router Configuration Module
//!
//! Configuration for a [`Router`](crate::router::Router), loaded from defaults, an optional YAML
//! file and environment overrides, in that order.
//!
//! ## YAML
//!
//! ```yaml
//! cache_expire_ms: 60000      # 0 caches resolutions for the life of the process
//! cache_enabled: true
//! route_overwrite: false      # true lets a later serve registration replace an identical one
//! deny_routes:
//!   - /admin/*any
//!   - /internal/*any@api.example.com
//! dump_routes: false
//! ```
//!
//! Every field is optional.
//!
//! ## Environment Variables
//!
//! | Variable                     | Field             |
//! |------------------------------|-------------------|
//! | `HOOKROUTER_CACHE_EXPIRE_MS` | `cache_expire_ms` |
//! | `HOOKROUTER_ROUTE_CACHE`     | `cache_enabled`   |
//! | `HOOKROUTER_ROUTE_OVERWRITE` | `route_overwrite` |
//! | `HOOKROUTER_DUMP_ROUTES`     | `dump_routes`     |
//!
//! Boolean variables accept `1/true/on/yes` and `0/false/off/no`. Unparseable values are logged
//! and ignored.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use tracing::warn;

/// Route cache TTL used when nothing else is configured (one minute).
pub const DEFAULT_CACHE_EXPIRE_MS: u64 = 60_000;

/// Router configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Route cache TTL in milliseconds; `0` never expires
    pub cache_expire_ms: u64,
    /// Cache resolutions at all
    pub cache_enabled: bool,
    /// Replace an identical serve registration instead of rejecting it
    pub route_overwrite: bool,
    /// Patterns answered with 403 by a `BeforeServe` hook installed at start
    pub deny_routes: Vec<String>,
    /// Print the route table when the router starts
    pub dump_routes: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            cache_expire_ms: DEFAULT_CACHE_EXPIRE_MS,
            cache_enabled: true,
            route_overwrite: false,
            deny_routes: Vec::new(),
            dump_routes: false,
        }
    }
}

impl RouterConfig {
    /// Parse a YAML document. Missing fields take their defaults.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).context("Failed to parse router config YAML")
    }

    /// Read and parse a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read router config {}", path.display()))?;
        Self::from_yaml_str(&content)
            .with_context(|| format!("Invalid router config {}", path.display()))
    }

    /// Defaults with environment overrides applied.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().apply_env()
    }

    /// Defaults, then the file at `path` if given, then environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let base = match path {
            Some(path) => Self::from_yaml_file(path)?,
            None => Self::default(),
        };
        Ok(base.apply_env())
    }

    /// Apply `HOOKROUTER_*` overrides from the process environment.
    #[must_use]
    pub fn apply_env(self) -> Self {
        self.apply_env_with(|key| env::var(key).ok())
    }

    /// Apply overrides read through `lookup`.
    #[must_use]
    pub fn apply_env_with(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(raw) = lookup("HOOKROUTER_CACHE_EXPIRE_MS") {
            match raw.trim().parse::<u64>() {
                Ok(ms) => self.cache_expire_ms = ms,
                Err(_) => warn!(
                    variable = "HOOKROUTER_CACHE_EXPIRE_MS",
                    value = %raw,
                    "Ignoring invalid cache TTL"
                ),
            }
        }
        override_bool(&lookup, "HOOKROUTER_ROUTE_CACHE", &mut self.cache_enabled);
        override_bool(&lookup, "HOOKROUTER_ROUTE_OVERWRITE", &mut self.route_overwrite);
        override_bool(&lookup, "HOOKROUTER_DUMP_ROUTES", &mut self.dump_routes);
        self
    }
}

fn override_bool(lookup: &impl Fn(&str) -> Option<String>, variable: &str, field: &mut bool) {
    let Some(raw) = lookup(variable) else {
        return;
    };
    match parse_bool(&raw) {
        Some(value) => *field = value,
        None => warn!(variable = variable, value = %raw, "Ignoring invalid boolean"),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}
