//! Engine configuration loading, including cleanup delays and card rules.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

use crate::card::CardRules;

/// Default location on disk where the engine looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/engine.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "BINGO_DUEL_CONFIG_PATH";

/// Immutable runtime configuration shared across the engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Card value range and column banding.
    pub card_rules: CardRules,
    /// Grace window before a completed match is deleted.
    pub completion_cleanup_delay: Duration,
    /// Accelerated window once a match has zero connected participants.
    pub abandoned_cleanup_delay: Duration,
    /// Idle time after which a match is eligible for expiry.
    pub match_ttl: Duration,
    /// How often the expiry sweep runs.
    pub expiry_sweep_interval: Duration,
    /// Depth of each per-match command queue.
    pub command_queue_depth: usize,
    /// Test-only capability: lets `claim-bingo` bypass the line-count check.
    /// Not part of the config file; only settable from code.
    pub instant_win: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            card_rules: CardRules::default(),
            completion_cleanup_delay: Duration::from_secs(30),
            abandoned_cleanup_delay: Duration::from_secs(5),
            match_ttl: Duration::from_secs(24 * 60 * 60),
            expiry_sweep_interval: Duration::from_secs(60 * 60),
            command_queue_depth: 32,
            instant_win: false,
        }
    }
}

impl EngineConfig {
    /// Load the engine configuration from disk, falling back to the built-in
    /// defaults when the file is missing or malformed.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let config: Self = raw.into();
                    info!(path = %path.display(), "loaded engine config");
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }
}

/// JSON representation of the configuration file. Every field is optional;
/// omitted ones keep their defaults. The instant-win hook is deliberately
/// absent so it cannot be enabled from a deployed config file.
#[derive(Debug, Deserialize)]
struct RawConfig {
    card_min_value: Option<u16>,
    card_max_value: Option<u16>,
    completion_cleanup_secs: Option<u64>,
    abandoned_cleanup_secs: Option<u64>,
    match_ttl_secs: Option<u64>,
    expiry_sweep_secs: Option<u64>,
    command_queue_depth: Option<usize>,
}

impl From<RawConfig> for EngineConfig {
    fn from(raw: RawConfig) -> Self {
        let defaults = EngineConfig::default();
        let requested = CardRules {
            min_value: raw.card_min_value.unwrap_or(defaults.card_rules.min_value),
            max_value: raw.card_max_value.unwrap_or(defaults.card_rules.max_value),
        };
        let card_rules = if requested.is_valid() {
            requested
        } else {
            warn!(
                min = requested.min_value,
                max = requested.max_value,
                "card value range cannot band a full card; using defaults"
            );
            defaults.card_rules
        };
        Self {
            card_rules,
            completion_cleanup_delay: raw
                .completion_cleanup_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.completion_cleanup_delay),
            abandoned_cleanup_delay: raw
                .abandoned_cleanup_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.abandoned_cleanup_delay),
            match_ttl: raw
                .match_ttl_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.match_ttl),
            expiry_sweep_interval: raw
                .expiry_sweep_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.expiry_sweep_interval),
            command_queue_depth: raw.command_queue_depth.unwrap_or(defaults.command_queue_depth),
            instant_win: false,
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
