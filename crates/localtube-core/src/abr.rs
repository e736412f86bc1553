//! Adaptive Bitrate (ABR) selection
//!
//! Implements:
//! - Throughput: dual-EWMA bandwidth estimate with separate headroom for up-switches
//! - BOLA: Buffer Occupancy based Lyapunov Algorithm

use crate::config::{AbrAlgorithmType, PlayerConfig};
use crate::Variant;
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tracing::{debug, instrument};

/// ABR algorithm trait
pub trait AbrAlgorithm: Send + Sync {
    /// Select the level index to load next
    fn select_level(&self, variants: &[Variant], context: &AbrContext) -> Option<usize>;

    /// Get algorithm name
    fn name(&self) -> &'static str;
}

/// Context for ABR decisions
#[derive(Debug, Clone, Default)]
pub struct AbrContext {
    /// Seconds buffered ahead of the play head
    pub buffer_level: f64,
    /// Estimated bandwidth in bps
    pub bandwidth_estimate: u64,
    /// Level currently being loaded
    pub current_level: Option<usize>,
    /// Maximum allowed bitrate (0 = unlimited)
    pub max_bitrate: u64,
}

/// Bandwidth measurement sample
#[derive(Debug, Clone)]
pub struct BandwidthMeasurement {
    /// Bytes downloaded
    pub bytes: usize,
    /// Time taken
    pub duration: Duration,
    /// Timestamp
    pub timestamp: Instant,
}

impl BandwidthMeasurement {
    /// Calculate throughput in bits per second
    pub fn throughput_bps(&self) -> u64 {
        if self.duration.as_secs_f64() > 0.0 {
            ((self.bytes as f64 * 8.0) / self.duration.as_secs_f64()) as u64
        } else {
            0
        }
    }
}

/// Exponentially weighted moving average keyed on a half-life
#[derive(Debug, Clone)]
pub struct Ewma {
    alpha: f64,
    estimate: f64,
    total_weight: f64,
}

impl Ewma {
    pub fn new(half_life: f64) -> Self {
        Self {
            alpha: (0.5f64.ln() / half_life).exp(),
            estimate: 0.0,
            total_weight: 0.0,
        }
    }

    pub fn sample(&mut self, weight: f64, value: f64) {
        let adj_alpha = self.alpha.powf(weight);
        self.estimate = value * (1.0 - adj_alpha) + adj_alpha * self.estimate;
        self.total_weight += weight;
    }

    /// Bias-corrected estimate; zero before any sample
    pub fn estimate(&self) -> f64 {
        if self.total_weight <= 0.0 {
            return 0.0;
        }
        let zero_factor = 1.0 - self.alpha.powf(self.total_weight);
        self.estimate / zero_factor
    }
}

/// Bandwidth estimator combining a fast and a slow EWMA
#[derive(Debug, Clone)]
pub struct BandwidthEstimator {
    fast: Ewma,
    slow: Ewma,
    default_estimate: u64,
    history: VecDeque<BandwidthMeasurement>,
    max_history: usize,
}

impl BandwidthEstimator {
    pub fn new(fast_half_life: f64, slow_half_life: f64, default_estimate: u64) -> Self {
        Self {
            fast: Ewma::new(fast_half_life),
            slow: Ewma::new(slow_half_life),
            default_estimate,
            history: VecDeque::with_capacity(20),
            max_history: 20,
        }
    }

    pub fn record(&mut self, measurement: BandwidthMeasurement) {
        let seconds = measurement.duration.as_secs_f64();
        if seconds <= 0.0 {
            return;
        }

        let bps = measurement.throughput_bps() as f64;
        self.fast.sample(seconds, bps);
        self.slow.sample(seconds, bps);

        if self.history.len() >= self.max_history {
            self.history.pop_front();
        }
        self.history.push_back(measurement);
    }

    /// Conservative estimate: the lower of both averages
    pub fn estimate(&self) -> u64 {
        if self.history.is_empty() {
            return self.default_estimate;
        }
        self.fast.estimate().min(self.slow.estimate()) as u64
    }

    pub fn sample_count(&self) -> usize {
        self.history.len()
    }
}

/// ABR controller owned by an adaptive engine
pub struct AbrController {
    /// Active algorithm
    algorithm: Box<dyn AbrAlgorithm>,
    estimator: BandwidthEstimator,
    max_bitrate: u64,
}

impl AbrController {
    /// Create a controller from player configuration
    pub fn new(config: &PlayerConfig) -> Self {
        let algorithm: Box<dyn AbrAlgorithm> = match config.abr_algorithm {
            AbrAlgorithmType::Throughput => Box::new(ThroughputAlgorithm::new(
                config.abr_bandwidth_factor,
                config.abr_bandwidth_up_factor,
            )),
            AbrAlgorithmType::Bola => Box::new(BolaAlgorithm::new()),
        };

        Self {
            algorithm,
            estimator: BandwidthEstimator::new(
                config.abr_ewma_fast,
                config.abr_ewma_slow,
                config.abr_default_estimate,
            ),
            max_bitrate: config.max_bitrate,
        }
    }

    /// Record a bandwidth measurement
    #[instrument(skip(self))]
    pub fn record_measurement(&mut self, bytes: usize, duration: Duration) {
        let measurement = BandwidthMeasurement {
            bytes,
            duration,
            timestamp: Instant::now(),
        };
        let sample = measurement.throughput_bps();
        self.estimator.record(measurement);

        debug!(
            bytes = bytes,
            duration_ms = duration.as_millis(),
            throughput_mbps = sample as f64 / 1_000_000.0,
            estimate_mbps = self.estimator.estimate() as f64 / 1_000_000.0,
            samples = self.estimator.sample_count(),
            "Bandwidth measurement recorded"
        );
    }

    /// Select the next level to load
    pub fn select_level(
        &self,
        variants: &[Variant],
        current_level: Option<usize>,
        buffer_level: f64,
    ) -> Option<usize> {
        if variants.is_empty() {
            return None;
        }

        let context = AbrContext {
            buffer_level,
            bandwidth_estimate: self.estimator.estimate(),
            current_level,
            max_bitrate: self.max_bitrate,
        };

        let selected = self.algorithm.select_level(variants, &context);
        if selected != current_level {
            debug!(
                algorithm = self.algorithm.name(),
                from = ?current_level,
                to = ?selected,
                estimate = context.bandwidth_estimate,
                "ABR level change"
            );
        }
        selected
    }

    /// Get current bandwidth estimate
    pub fn bandwidth_estimate(&self) -> u64 {
        self.estimator.estimate()
    }

    /// Get algorithm name
    pub fn algorithm_name(&self) -> &'static str {
        self.algorithm.name()
    }
}

/// Index of the lowest-bandwidth variant
fn lowest_level(variants: &[Variant]) -> Option<usize> {
    variants.iter().min_by_key(|v| v.bandwidth).map(|v| v.index)
}

/// Throughput-based ABR algorithm
pub struct ThroughputAlgorithm {
    /// Share of the estimate usable for the current or a lower level
    bandwidth_factor: f64,
    /// Share of the estimate usable for a higher level
    bandwidth_up_factor: f64,
}

impl ThroughputAlgorithm {
    pub fn new(bandwidth_factor: f64, bandwidth_up_factor: f64) -> Self {
        Self {
            bandwidth_factor,
            bandwidth_up_factor,
        }
    }
}

impl Default for ThroughputAlgorithm {
    fn default() -> Self {
        Self::new(0.95, 0.7)
    }
}

impl AbrAlgorithm for ThroughputAlgorithm {
    fn select_level(&self, variants: &[Variant], context: &AbrContext) -> Option<usize> {
        let estimate = context.bandwidth_estimate as f64;
        let current_bandwidth = context
            .current_level
            .and_then(|idx| variants.iter().find(|v| v.index == idx))
            .map(|v| v.bandwidth)
            .unwrap_or(0);

        variants
            .iter()
            .filter(|v| context.max_bitrate == 0 || v.bandwidth <= context.max_bitrate)
            .filter(|v| {
                let factor = if v.bandwidth > current_bandwidth {
                    self.bandwidth_up_factor
                } else {
                    self.bandwidth_factor
                };
                (v.bandwidth as f64) <= estimate * factor
            })
            .max_by_key(|v| v.bandwidth)
            .map(|v| v.index)
            .or_else(|| lowest_level(variants))
    }

    fn name(&self) -> &'static str {
        "throughput"
    }
}

/// BOLA (Buffer Occupancy based Lyapunov Algorithm)
/// Paper: https://arxiv.org/abs/1601.06748
pub struct BolaAlgorithm {
    /// Minimum buffer (seconds)
    buffer_min: f64,
    /// BOLA parameter V
    v: f64,
    /// BOLA parameter gamma
    gamma: f64,
}

impl BolaAlgorithm {
    pub fn new() -> Self {
        Self {
            buffer_min: 5.0,
            v: 0.93,
            gamma: 5.0,
        }
    }

    /// Logarithmic utility of a variant
    fn utility(&self, variant: &Variant) -> f64 {
        (variant.bandwidth.max(1) as f64).ln()
    }
}

impl Default for BolaAlgorithm {
    fn default() -> Self {
        Self::new()
    }
}

impl AbrAlgorithm for BolaAlgorithm {
    fn select_level(&self, variants: &[Variant], context: &AbrContext) -> Option<usize> {
        // Very low buffer: safest pick
        if context.buffer_level < self.buffer_min {
            return lowest_level(variants);
        }

        let mut best: Option<&Variant> = None;
        let mut best_score = f64::NEG_INFINITY;

        for variant in variants {
            if context.max_bitrate > 0 && variant.bandwidth > context.max_bitrate {
                continue;
            }

            let size = variant.bandwidth as f64 / 1_000_000.0;
            let score = (self.v * self.utility(variant) - context.buffer_level) / (size + self.gamma);

            if score > best_score {
                best_score = score;
                best = Some(variant);
            }
        }

        best.map(|v| v.index).or_else(|| lowest_level(variants))
    }

    fn name(&self) -> &'static str {
        "bola"
    }
}
