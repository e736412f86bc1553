//! Rendition listing and manual quality selection

use crate::sink::play_tolerant;
use crate::{session::MediaSession, Error, QualityMode, RenditionDescriptor, Result, Variant};
use tracing::{debug, info};

/// Tracks renditions and the selected quality for the current stream
#[derive(Debug, Clone, Default)]
pub struct QualityController {
    /// Sorted by descending vertical resolution
    renditions: Vec<RenditionDescriptor>,
    mode: QualityMode,
    /// Level the engine reports as rendered
    active_level: Option<usize>,
}

impl QualityController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the rendition list from freshly parsed levels
    ///
    /// Streams with fewer than two levels leave the controller inert.
    pub fn on_manifest_parsed(&mut self, levels: &[Variant]) {
        self.mode = QualityMode::Auto;
        self.active_level = None;

        if levels.len() < 2 {
            self.renditions.clear();
            debug!(levels = levels.len(), "Single rendition; quality selection hidden");
            return;
        }

        let mut renditions: Vec<RenditionDescriptor> = levels.iter().map(RenditionDescriptor::from).collect();
        // Stable: equal heights keep manifest order, unknown heights sort last
        renditions.sort_by(|a, b| b.vertical_resolution.cmp(&a.vertical_resolution));
        self.renditions = renditions;
    }

    pub fn list_renditions(&self) -> &[RenditionDescriptor] {
        &self.renditions
    }

    pub fn mode(&self) -> QualityMode {
        self.mode
    }

    pub fn active_level(&self) -> Option<usize> {
        self.active_level
    }

    pub fn should_render(&self) -> bool {
        !self.renditions.is_empty()
    }

    /// Apply a quality mode, keeping position and play state
    pub fn select(&mut self, session: &mut MediaSession, mode: QualityMode) -> Result<()> {
        if !self.should_render() {
            return Err(Error::QualityUnavailable);
        }
        if let QualityMode::Pinned(index) = mode {
            if self.descriptor(index).is_none() {
                return Err(Error::NoSuchRendition { index });
            }
        }

        let sink = session.sink().clone();
        let was_playing = !sink.is_paused();
        let position = sink.current_time();

        session.set_level(mode.level())?;

        sink.set_current_time(position);
        if was_playing {
            play_tolerant(sink.as_ref());
        }

        info!(mode = ?mode, position, was_playing, "Quality selected");
        self.mode = mode;
        if let QualityMode::Pinned(index) = mode {
            self.active_level = Some(index);
        }
        Ok(())
    }

    pub fn on_level_switched(&mut self, level: usize) {
        self.active_level = Some(level);
    }

    /// Label for the quality selector button
    pub fn current_label(&self) -> String {
        match self.mode {
            QualityMode::Auto => self
                .active_level
                .and_then(|level| self.descriptor(level))
                .and_then(|d| d.vertical_resolution)
                .map(|height| format!("Auto ({}p)", height))
                .unwrap_or_else(|| "Auto".to_string()),
            QualityMode::Pinned(index) => self
                .descriptor(index)
                .map(|d| d.display_label.clone())
                .unwrap_or_else(|| format!("Level {}", index)),
        }
    }

    /// Forget everything; used when the stream changes
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn descriptor(&self, index: usize) -> Option<&RenditionDescriptor> {
        self.renditions.iter().find(|d| d.index == index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Resolution;
    use url::Url;

    fn variant(index: usize, height: Option<u32>, bandwidth: u64) -> Variant {
        Variant {
            index,
            bandwidth,
            resolution: height.map(|h| Resolution::new(h * 16 / 9, h)),
            codecs: None,
            uri: Url::parse(&format!("https://cdn.example.com/{}/index.m3u8", index)).unwrap(),
        }
    }

    #[test]
    fn test_sorted_descending_with_unknown_last() {
        let mut controller = QualityController::new();
        controller.on_manifest_parsed(&[
            variant(0, Some(360), 800_000),
            variant(1, None, 1_000_000),
            variant(2, Some(1080), 5_000_000),
            variant(3, Some(720), 2_800_000),
        ]);

        let order: Vec<_> = controller.list_renditions().iter().map(|d| d.index).collect();
        assert_eq!(order, vec![2, 3, 0, 1]);
        assert_eq!(controller.list_renditions()[3].display_label, "Level 1");
    }

    #[test]
    fn test_equal_heights_keep_manifest_order() {
        let mut controller = QualityController::new();
        controller.on_manifest_parsed(&[
            variant(0, Some(720), 1_500_000),
            variant(1, Some(720), 3_000_000),
        ]);

        let order: Vec<_> = controller.list_renditions().iter().map(|d| d.index).collect();
        assert_eq!(order, vec![0, 1]);
    }

    #[test]
    fn test_single_level_is_inert() {
        let mut controller = QualityController::new();
        controller.on_manifest_parsed(&[variant(0, Some(720), 2_800_000)]);

        assert!(!controller.should_render());
        assert!(controller.list_renditions().is_empty());
        assert_eq!(controller.current_label(), "Auto");
    }

    #[test]
    fn test_auto_label_follows_active_level() {
        let mut controller = QualityController::new();
        controller.on_manifest_parsed(&[variant(0, Some(480), 1_200_000), variant(1, Some(1080), 5_000_000)]);

        assert_eq!(controller.current_label(), "Auto");
        controller.on_level_switched(1);
        assert_eq!(controller.current_label(), "Auto (1080p)");

        controller.reset();
        assert!(!controller.should_render());
    }
}
