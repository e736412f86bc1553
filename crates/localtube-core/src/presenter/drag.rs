//! Drag geometry and scoped pointer subscriptions

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Pointer position in viewport coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Visible area the presenter must stay inside
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Top-left corner of a draggable presenter
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DragPosition {
    pub x: f64,
    pub y: f64,
}

impl DragPosition {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Keep a `width` x `height` box fully inside the viewport
    ///
    /// A box larger than the viewport pins to the top-left corner.
    pub fn clamp(self, width: f64, height: f64, viewport: Viewport) -> Self {
        let max_x = (viewport.width - width).max(0.0);
        let max_y = (viewport.height - height).max(0.0);
        Self {
            x: finite_or_zero(self.x).clamp(0.0, max_x),
            y: finite_or_zero(self.y).clamp(0.0, max_y),
        }
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Where a pointer-down landed on the presenter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PointerTarget {
    /// Video surface or title bar; starts a drag
    Surface,
    /// Control buttons; never starts a drag
    Controls,
}

/// Registry of live global pointer-move/up subscriptions
#[derive(Debug, Clone, Default)]
pub struct PointerListeners {
    active: Arc<AtomicUsize>,
}

impl PointerListeners {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register listeners for the duration of the returned guard
    pub fn subscribe(&self) -> PointerSubscription {
        self.active.fetch_add(1, Ordering::SeqCst);
        PointerSubscription {
            active: self.active.clone(),
        }
    }

    /// Number of live subscriptions
    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

/// Live pointer subscription; dropping it unregisters the listeners
#[derive(Debug)]
#[must_use = "listeners are removed as soon as the subscription is dropped"]
pub struct PointerSubscription {
    active: Arc<AtomicUsize>,
}

impl Drop for PointerSubscription {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}
