//! Playback position and watched-time tracking

use crate::config::FullPlayerConfig;

/// Accumulates watched time from time updates and reports the view threshold
///
/// Only forward steps of at most `max_tick_gap` seconds while playing count as
/// watched; larger or backward jumps are seeks.
#[derive(Debug, Clone)]
pub struct PositionTracker {
    view_threshold: f64,
    max_tick_gap: f64,
    position: f64,
    last_update: Option<f64>,
    watched: f64,
    playing: bool,
    view_recorded: bool,
}

impl PositionTracker {
    pub fn new(view_threshold: f64, max_tick_gap: f64) -> Self {
        Self {
            view_threshold,
            max_tick_gap,
            position: 0.0,
            last_update: None,
            watched: 0.0,
            playing: false,
            view_recorded: false,
        }
    }

    pub fn from_config(config: &FullPlayerConfig) -> Self {
        Self::new(config.view_threshold, config.max_tick_gap)
    }

    /// Record a time update; true exactly once, when the view threshold is reached
    pub fn on_time_update(&mut self, seconds: f64) -> bool {
        if !seconds.is_finite() {
            return false;
        }

        if let Some(last) = self.last_update {
            let delta = seconds - last;
            if self.playing && delta > 0.0 && delta <= self.max_tick_gap {
                self.watched += delta;
            }
        }
        self.last_update = Some(seconds);
        self.position = seconds.max(0.0);

        if !self.view_recorded && self.watched >= self.view_threshold {
            self.view_recorded = true;
            return true;
        }
        false
    }

    pub fn set_playing(&mut self, playing: bool) {
        self.playing = playing;
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn watched_seconds(&self) -> f64 {
        self.watched
    }

    pub fn view_recorded(&self) -> bool {
        self.view_recorded
    }
}

impl Default for PositionTracker {
    fn default() -> Self {
        Self::from_config(&FullPlayerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn play_for(tracker: &mut PositionTracker, from: f64, ticks: usize) -> usize {
        (1..=ticks)
            .filter(|i| tracker.on_time_update(from + *i as f64 * 0.25))
            .count()
    }

    #[test]
    fn test_view_reported_once() {
        let mut tracker = PositionTracker::default();
        tracker.set_playing(true);
        tracker.on_time_update(0.0);

        assert_eq!(play_for(&mut tracker, 0.0, 40), 1);
        assert!(tracker.view_recorded());
        assert_eq!(tracker.position(), 10.0);
    }

    #[test]
    fn test_pause_keeps_accumulated_time() {
        let mut tracker = PositionTracker::default();
        tracker.set_playing(true);
        tracker.on_time_update(0.0);
        assert_eq!(play_for(&mut tracker, 0.0, 8), 0);

        tracker.set_playing(false);
        tracker.on_time_update(2.0);
        assert_eq!(tracker.watched_seconds(), 2.0);

        tracker.set_playing(true);
        assert_eq!(play_for(&mut tracker, 2.0, 4), 1);
    }

    #[test]
    fn test_seeks_do_not_count() {
        let mut tracker = PositionTracker::default();
        tracker.set_playing(true);
        tracker.on_time_update(0.0);

        assert!(!tracker.on_time_update(60.0));
        assert!(!tracker.on_time_update(10.0));
        assert_eq!(tracker.watched_seconds(), 0.0);
        assert_eq!(tracker.position(), 10.0);
    }

    #[test]
    fn test_paused_updates_do_not_count() {
        let mut tracker = PositionTracker::default();
        tracker.on_time_update(0.0);
        assert_eq!(play_for(&mut tracker, 0.0, 20), 0);
        assert_eq!(tracker.watched_seconds(), 0.0);
    }
}
