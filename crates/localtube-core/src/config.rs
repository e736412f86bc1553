//! Configuration for the playback core and its presenters

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Adaptive engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Stop loading segments once this much is buffered ahead (seconds)
    pub max_buffer_length: f64,
    /// ABR algorithm to use in auto mode
    pub abr_algorithm: AbrAlgorithmType,
    /// Fast EWMA half-life for bandwidth estimation (seconds of download)
    pub abr_ewma_fast: f64,
    /// Slow EWMA half-life for bandwidth estimation (seconds of download)
    pub abr_ewma_slow: f64,
    /// Share of the estimate usable when staying or switching down
    pub abr_bandwidth_factor: f64,
    /// Share of the estimate usable when switching up
    pub abr_bandwidth_up_factor: f64,
    /// Estimate used before the first sample (bps)
    pub abr_default_estimate: u64,
    /// Maximum bitrate cap (0 = no cap)
    pub max_bitrate: u64,
    /// Level to start on; `None` lets ABR choose
    pub start_level: Option<usize>,
    /// Retry attempts for failed manifest/segment requests
    pub retry_attempts: u32,
    /// Retry delay in milliseconds
    pub retry_delay_ms: u64,
    /// Request timeout in milliseconds
    pub request_timeout_ms: u64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            max_buffer_length: 30.0,
            abr_algorithm: AbrAlgorithmType::Throughput,
            abr_ewma_fast: 3.0,
            abr_ewma_slow: 9.0,
            abr_bandwidth_factor: 0.95,
            abr_bandwidth_up_factor: 0.7,
            abr_default_estimate: 500_000,
            max_bitrate: 0,
            start_level: None,
            retry_attempts: 3,
            retry_delay_ms: 1000,
            request_timeout_ms: 10000,
        }
    }
}

impl PlayerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_buffer_length <= 0.0 {
            return Err(Error::InvalidConfig("max_buffer_length must be positive".into()));
        }
        if self.abr_ewma_fast <= 0.0 || self.abr_ewma_slow <= 0.0 {
            return Err(Error::InvalidConfig("EWMA half-lives must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.abr_bandwidth_factor)
            || !(0.0..=1.0).contains(&self.abr_bandwidth_up_factor)
        {
            return Err(Error::InvalidConfig("bandwidth factors must be within 0..=1".into()));
        }
        Ok(())
    }
}

/// ABR algorithm types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AbrAlgorithmType {
    /// Throughput-based selection
    Throughput,
    /// Buffer-based BOLA algorithm
    Bola,
}

/// Mini-player presenter configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MiniPlayerConfig {
    pub width: f64,
    pub height: f64,
    /// Initial gap to the right viewport edge
    pub margin_right: f64,
    /// Initial gap to the bottom viewport edge
    pub margin_bottom: f64,
}

impl Default for MiniPlayerConfig {
    fn default() -> Self {
        Self {
            width: 320.0,
            height: 200.0,
            margin_right: 20.0,
            margin_bottom: 30.0,
        }
    }
}

/// Full-page player presenter configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FullPlayerConfig {
    /// Start playing on mount even without a resume position
    pub autoplay: bool,
    /// Hand the session to the mini-player when the page unmounts
    pub continue_in_mini_player: bool,
    /// Accumulated playback before a view is counted (seconds)
    pub view_threshold: f64,
    /// Larger jumps between time updates are treated as seeks (seconds)
    pub max_tick_gap: f64,
}

impl Default for FullPlayerConfig {
    fn default() -> Self {
        Self {
            autoplay: false,
            continue_in_mini_player: true,
            view_threshold: 3.0,
            max_tick_gap: 1.5,
        }
    }
}

/// Top-level client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the REST backend, e.g. `http://localhost:8080/api`
    pub api_base_url: String,
    /// Bearer token sent with API requests
    pub api_token: Option<String>,
    pub player: PlayerConfig,
    pub mini_player: MiniPlayerConfig,
    pub full_player: FullPlayerConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8080/api".to_string(),
            api_token: None,
            player: PlayerConfig::default(),
            mini_player: MiniPlayerConfig::default(),
            full_player: FullPlayerConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Parse a JSON document; missing fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.player.validate()?;
        Ok(config)
    }

    /// Load a JSON config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }
}
