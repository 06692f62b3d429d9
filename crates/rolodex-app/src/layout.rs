// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use tracing::debug;

pub const DEFAULT_NARROW_THRESHOLD: u32 = 800;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
    Wide,
    Narrow,
}

impl DisplayMode {
    pub const fn for_width(width: u32, threshold: u32) -> Self {
        if width < threshold {
            Self::Narrow
        } else {
            Self::Wide
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Wide => "wide",
            Self::Narrow => "narrow",
        }
    }
}

/// Collapses bursts of resize notifications into at most one width check
/// per rendered frame.
#[derive(Debug, Clone)]
pub struct LayoutController {
    threshold: u32,
    mode: DisplayMode,
    pending: Option<u32>,
    evaluations: u64,
}

impl Default for LayoutController {
    fn default() -> Self {
        Self::new(DEFAULT_NARROW_THRESHOLD)
    }
}

impl LayoutController {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold,
            mode: DisplayMode::Wide,
            pending: None,
            evaluations: 0,
        }
    }

    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    pub fn evaluations(&self) -> u64 {
        self.evaluations
    }

    /// Records the latest observed width. Returns `true` when the caller
    /// must schedule a frame; later notifications before that frame only
    /// replace the pending width.
    pub fn observe_resize(&mut self, width: u32) -> bool {
        self.pending.replace(width).is_none()
    }

    /// Runs the pending width check, if any. Returns the new mode when it
    /// changed.
    pub fn on_frame(&mut self) -> Option<DisplayMode> {
        let width = self.pending.take()?;
        self.evaluations += 1;
        let next = DisplayMode::for_width(width, self.threshold);
        if next == self.mode {
            return None;
        }
        debug!(width, mode = next.label(), "display mode changed");
        self.mode = next;
        Some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::{DEFAULT_NARROW_THRESHOLD, DisplayMode, LayoutController};

    #[test]
    fn boundary_is_strict_less_than() {
        assert_eq!(
            DisplayMode::for_width(800, DEFAULT_NARROW_THRESHOLD),
            DisplayMode::Wide
        );
        assert_eq!(
            DisplayMode::for_width(799, DEFAULT_NARROW_THRESHOLD),
            DisplayMode::Narrow
        );
    }

    #[test]
    fn burst_collapses_into_one_evaluation_using_last_width() {
        let mut layout = LayoutController::default();

        assert!(layout.observe_resize(1200));
        for width in [1000, 900, 640, 500] {
            assert!(!layout.observe_resize(width));
        }
        assert_eq!(layout.evaluations(), 0);

        assert_eq!(layout.on_frame(), Some(DisplayMode::Narrow));
        assert_eq!(layout.evaluations(), 1);
        assert_eq!(layout.on_frame(), None);
        assert_eq!(layout.evaluations(), 1);
    }

    #[test]
    fn unchanged_mode_still_counts_as_evaluation() {
        let mut layout = LayoutController::default();
        layout.observe_resize(1024);
        assert_eq!(layout.on_frame(), None);
        assert_eq!(layout.evaluations(), 1);
        assert_eq!(layout.mode(), DisplayMode::Wide);
    }

    #[test]
    fn each_frame_schedules_anew() {
        let mut layout = LayoutController::new(100);
        assert!(layout.observe_resize(50));
        layout.on_frame();
        assert!(layout.observe_resize(150));
        assert_eq!(layout.on_frame(), Some(DisplayMode::Wide));
    }
}
