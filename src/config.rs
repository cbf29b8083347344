//! Configuration: loaded once from TOML at startup, hot-reloaded via
//! `setConfig` on the control surface.
//!
//! The durable form (`RuntimeConfig`) is what lives in persistence and on
//! disk. The mediator never reads it directly — it reads through a
//! `ConfigStore`, which hands out `Arc<ConfigSnapshot>` clones so every
//! concurrent reader sees one consistent view, swapped atomically on
//! reload rather than mutated in place.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::support::errors::ValidationError;

fn default_csms_forwarding_enabled() -> bool {
    true
}

fn default_auto_charge_enabled() -> bool {
    false
}

fn default_id_tag() -> String {
    "DEFAULT_TAG".to_string()
}

fn default_max_reconnect_attempts() -> u32 {
    3
}

fn default_reconnect_base_delay_ms() -> u64 {
    1000
}

fn default_upstream_connect_timeout_secs() -> u64 {
    10
}

fn default_egress_buffer_capacity() -> usize {
    1024
}

fn default_log_queue_capacity() -> usize {
    4096
}

fn default_injection_ttl_secs() -> u64 {
    60
}

/// Reject anything but `ws://`/`wss://` — `url` alone accepts `http://` etc,
/// which would pass config validation and only fail later, at dial time.
fn validate_ws_scheme(target_csms_url: &str) -> Result<(), validator::ValidationError> {
    match target_csms_url.split_once("://") {
        Some(("ws" | "wss", _)) => Ok(()),
        _ => Err(validator::ValidationError::new("target_csms_url must use the ws or wss scheme")),
    }
}

/// The durable configuration row, as stored and as accepted by `setConfig`.
/// `deny_unknown_fields` is what turns an unrecognized key into a 400
/// rather than a silently-ignored field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct RuntimeConfig {
    /// WebSocket base URL the charge point id is appended to.
    #[validate(url, custom(function = "validate_ws_scheme"))]
    pub target_csms_url: String,

    #[serde(default = "default_csms_forwarding_enabled")]
    pub csms_forwarding_enabled: bool,

    #[serde(default = "default_auto_charge_enabled")]
    pub auto_charge_enabled: bool,

    #[serde(default = "default_id_tag")]
    #[validate(length(min = 1, max = 36))]
    pub default_id_tag: String,

    /// Upper bound `M` on upstream reconnect attempts per session.
    #[serde(default = "default_max_reconnect_attempts")]
    #[validate(range(min = 1, max = 20))]
    pub max_reconnect_attempts: u32,

    /// `base` in `base * 2^(k-1)` backoff, milliseconds.
    #[serde(default = "default_reconnect_base_delay_ms")]
    #[validate(range(min = 10))]
    pub reconnect_base_delay_ms: u64,

    #[serde(default = "default_upstream_connect_timeout_secs")]
    #[validate(range(min = 1, max = 120))]
    pub upstream_connect_timeout_secs: u64,

    #[serde(default = "default_egress_buffer_capacity")]
    #[validate(range(min = 1))]
    pub egress_buffer_capacity: usize,

    #[serde(default = "default_log_queue_capacity")]
    #[validate(range(min = 1))]
    pub log_queue_capacity: usize,

    /// TTL, in seconds, for `pendingInjections` and `pendingAuthTags` entries.
    #[serde(default = "default_injection_ttl_secs")]
    #[validate(range(min = 1))]
    pub injection_ttl_secs: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            target_csms_url: "wss://localhost:9000/ocpp".to_string(),
            csms_forwarding_enabled: default_csms_forwarding_enabled(),
            auto_charge_enabled: default_auto_charge_enabled(),
            default_id_tag: default_id_tag(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
            reconnect_base_delay_ms: default_reconnect_base_delay_ms(),
            upstream_connect_timeout_secs: default_upstream_connect_timeout_secs(),
            egress_buffer_capacity: default_egress_buffer_capacity(),
            log_queue_capacity: default_log_queue_capacity(),
            injection_ttl_secs: default_injection_ttl_secs(),
        }
    }
}

impl RuntimeConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ValidationError> {
        let config: Self =
            toml::from_str(text).map_err(|e| ValidationError::Message(format!("invalid config: {e}")))?;
        config
            .validate()
            .map_err(|e| ValidationError::Message(format!("config validation failed: {e}")))?;
        Ok(config)
    }

    /// Build the upstream WebSocket URL for a given charge point id,
    /// inserting a `/` separator if the base lacks a trailing one.
    pub fn upstream_url_for(&self, charge_point_id: &str) -> String {
        if self.target_csms_url.ends_with('/') {
            format!("{}{}", self.target_csms_url, charge_point_id)
        } else {
            format!("{}/{}", self.target_csms_url, charge_point_id)
        }
    }

    /// Default config file path: `$OCPP_PROXY_CONFIG`, or
    /// `<config dir>/ocpp-proxy/config.toml`.
    pub fn default_path() -> PathBuf {
        if let Ok(path) = std::env::var("OCPP_PROXY_CONFIG") {
            return PathBuf::from(path);
        }
        dirs_next::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ocpp-proxy")
            .join("config.toml")
    }

    pub fn load_from_path(path: &Path) -> Result<Self, ValidationError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ValidationError::Message(format!("reading {}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    pub fn load_default() -> Result<Self, ValidationError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from_path(&path)
        } else {
            Ok(Self::default())
        }
    }
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_database_url() -> String {
    "sqlite://ocpp-proxy.sqlite3?mode=rwc".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Startup-only settings, read once from the TOML file and never
/// hot-reloaded: listen address, database URL, log level. The `[proxy]`
/// table in the same file seeds the durable `RuntimeConfig` on first boot
/// (`PersistenceProvider::seed_config`); after that, `proxy` here is
/// ignored in favor of whatever `getConfig`/`setConfig` has since made
/// authoritative.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    #[serde(default = "default_database_url")]
    pub database_url: String,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub proxy: RuntimeConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            database_url: default_database_url(),
            log_level: default_log_level(),
            proxy: RuntimeConfig::default(),
        }
    }
}

impl AppConfig {
    /// Default config file path: `$OCPP_PROXY_CONFIG`, or
    /// `<config dir>/ocpp-proxy/config.toml`.
    pub fn default_path() -> PathBuf {
        if let Ok(path) = std::env::var("OCPP_PROXY_CONFIG") {
            return PathBuf::from(path);
        }
        dirs_next::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ocpp-proxy")
            .join("config.toml")
    }

    pub fn load_from_path(path: &Path) -> Result<Self, ValidationError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ValidationError::Message(format!("reading {}: {e}", path.display())))?;
        let config: Self = toml::from_str(&text).map_err(|e| ValidationError::Message(format!("invalid config: {e}")))?;
        config.proxy.validate().map_err(|e| ValidationError::Message(format!("config validation failed: {e}")))?;
        Ok(config)
    }

    pub fn load_default() -> Result<Self, ValidationError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from_path(&path)
        } else {
            Ok(Self::default())
        }
    }
}

/// Alias used by readers that just want "the current config" without
/// caring whether it came from disk or persistence — `ConfigSnapshot` and
/// `RuntimeConfig` share a shape by design; the snapshot is the thing that
/// gets swapped, the runtime config is the thing that gets validated and
/// stored.
pub type ConfigSnapshot = RuntimeConfig;

/// Holds the live configuration behind an atomically-swapped pointer.
/// `setConfig` builds a brand new `ConfigSnapshot` and swaps it in; every
/// task already holding a clone of the old `Arc` keeps running against a
/// perfectly consistent (if stale) view.
pub struct ConfigStore {
    inner: ArcSwap<ConfigSnapshot>,
}

impl ConfigStore {
    pub fn new(initial: ConfigSnapshot) -> Self {
        Self {
            inner: ArcSwap::from_pointee(initial),
        }
    }

    pub fn load(&self) -> Arc<ConfigSnapshot> {
        self.inner.load_full()
    }

    pub fn swap(&self, new: ConfigSnapshot) {
        self.inner.store(Arc::new(new));
    }
}
