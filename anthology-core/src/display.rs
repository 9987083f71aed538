//! Lyric display state: active line tracking, manual jumps and per-line emphasis.

use crate::estimator::{AverageLineDuration, LineIndexEstimator};
use crate::session::AnalysisPhase;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// How long a manual line jump overrides the time-derived estimate
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ManualJumpPolicy {
    /// The next position update recomputes the line immediately
    Soft,
    /// The jump holds until the next transport action (play, pause, seek, skip,
    /// media bind or song change)
    #[default]
    UntilTransport,
    /// The jump holds until the cursor has moved `seconds` away from where it was
    /// when the jump happened
    Window { seconds: f64 },
}

/// Visual constants for line emphasis
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplayStyle {
    /// Blur cap, reached at this many lines away from the active one
    pub max_blur: f64,
    /// Opacity lost per line of distance
    pub opacity_step: f64,
    /// Opacity floor for distant lines
    pub min_opacity: f64,
    /// Scale applied to the active line only
    pub active_scale: f64,
}

impl Default for DisplayStyle {
    fn default() -> Self {
        Self {
            max_blur: 4.0,
            opacity_step: 0.2,
            min_opacity: 0.3,
            active_scale: 1.05,
        }
    }
}

/// Emphasis values for one rendered line
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineEmphasis {
    pub distance: usize,
    pub blur: f64,
    pub opacity: f64,
    pub scale: f64,
    /// Translation and annotation are shown only for the active line
    pub expanded: bool,
}

impl LineEmphasis {
    #[must_use]
    pub fn compute(index: usize, active: usize, style: &DisplayStyle) -> Self {
        let distance = index.abs_diff(active);
        let d = u32::try_from(distance).map_or(f64::from(u32::MAX), f64::from);
        let is_active = distance == 0;

        Self {
            distance,
            blur: d.min(style.max_blur),
            opacity: (1.0 - d * style.opacity_step).max(style.min_opacity),
            scale: if is_active { style.active_scale } else { 1.0 },
            expanded: is_active,
        }
    }

    /// Inline CSS for the render surface
    #[must_use]
    pub fn css(&self) -> String {
        format!(
            "filter: blur({}px); opacity: {}; transform: scale({});",
            self.blur, self.opacity, self.scale
        )
    }
}

/// What the lyric area should show
#[derive(Debug, Clone, PartialEq)]
pub enum LyricsView {
    /// No song selected yet
    Placeholder,
    /// Analysis in flight
    Loading,
    /// Analysis arrived without lyric lines
    Empty,
    /// Lines with their emphasis, in playback order
    Lines {
        active: usize,
        emphasis: Vec<LineEmphasis>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Pin {
    index: usize,
    at_position: f64,
}

/// Tracks the active lyric line for the current lyric list.
///
/// Mutations return `Some(index)` when the active line changed; the caller turns
/// that into a request to scroll the line into the centre of the viewport.
pub struct LyricDisplayController {
    estimator: Arc<dyn LineIndexEstimator>,
    policy: ManualJumpPolicy,
    style: DisplayStyle,
    line_count: usize,
    active: Option<usize>,
    pin: Option<Pin>,
}

impl Default for LyricDisplayController {
    fn default() -> Self {
        Self::new(
            Arc::new(AverageLineDuration::default()),
            ManualJumpPolicy::default(),
            DisplayStyle::default(),
        )
    }
}

impl LyricDisplayController {
    #[must_use]
    pub fn new(
        estimator: Arc<dyn LineIndexEstimator>,
        policy: ManualJumpPolicy,
        style: DisplayStyle,
    ) -> Self {
        Self {
            estimator,
            policy,
            style,
            line_count: 0,
            active: None,
            pin: None,
        }
    }

    #[must_use]
    pub const fn active(&self) -> Option<usize> {
        self.active
    }

    #[must_use]
    pub const fn line_count(&self) -> usize {
        self.line_count
    }

    #[must_use]
    pub const fn is_pinned(&self) -> bool {
        self.pin.is_some()
    }

    #[must_use]
    pub const fn style(&self) -> &DisplayStyle {
        &self.style
    }

    /// Show a new lyric list, estimating the active line from `position`
    pub fn load(&mut self, line_count: usize, position: f64) -> Option<usize> {
        self.line_count = line_count;
        self.pin = None;
        self.active = self.estimator.estimate(position, line_count);
        self.active
    }

    /// Drop the lyric list
    pub fn clear(&mut self) {
        self.line_count = 0;
        self.active = None;
        self.pin = None;
    }

    /// Recompute the active line from the playback position, honouring any pin
    pub fn update_position(&mut self, position: f64) -> Option<usize> {
        if let Some(pin) = self.pin {
            let holds = match self.policy {
                ManualJumpPolicy::Soft => false,
                ManualJumpPolicy::UntilTransport => true,
                ManualJumpPolicy::Window { seconds } => {
                    (position - pin.at_position).abs() < seconds
                }
            };
            if holds {
                return None;
            }
            self.pin = None;
        }

        self.set_active(self.estimator.estimate(position, self.line_count))
    }

    /// Manually make `index` the active line
    pub fn jump_to(&mut self, index: usize, position: f64) -> Option<usize> {
        if index >= self.line_count {
            return None;
        }

        self.pin = match self.policy {
            ManualJumpPolicy::Soft => None,
            ManualJumpPolicy::UntilTransport | ManualJumpPolicy::Window { .. } => Some(Pin {
                index,
                at_position: position,
            }),
        };
        self.set_active(Some(index))
    }

    /// Release a manual pin after a transport action and re-estimate
    pub fn release_pin(&mut self, position: f64) -> Option<usize> {
        self.pin = None;
        self.update_position(position)
    }

    /// Emphasis values for every line, in order
    #[must_use]
    pub fn emphasis(&self) -> Vec<LineEmphasis> {
        let Some(active) = self.active else {
            return Vec::new();
        };
        (0..self.line_count)
            .map(|i| LineEmphasis::compute(i, active, &self.style))
            .collect()
    }

    /// Decide what the lyric area shows for the given analysis phase
    #[must_use]
    pub fn view(&self, phase: AnalysisPhase, song_selected: bool) -> LyricsView {
        if !song_selected {
            return LyricsView::Placeholder;
        }
        match phase {
            AnalysisPhase::Idle | AnalysisPhase::Loading => LyricsView::Loading,
            AnalysisPhase::Ready | AnalysisPhase::Degraded => match self.active {
                Some(active) => LyricsView::Lines {
                    active,
                    emphasis: self.emphasis(),
                },
                None => LyricsView::Empty,
            },
        }
    }

    fn set_active(&mut self, index: Option<usize>) -> Option<usize> {
        if index == self.active {
            return None;
        }
        self.active = index;
        index
    }
}

impl std::fmt::Debug for LyricDisplayController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LyricDisplayController")
            .field("policy", &self.policy)
            .field("line_count", &self.line_count)
            .field("active", &self.active)
            .field("pin", &self.pin)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller(policy: ManualJumpPolicy) -> LyricDisplayController {
        LyricDisplayController::new(
            Arc::new(AverageLineDuration::default()),
            policy,
            DisplayStyle::default(),
        )
    }

    #[test]
    fn test_emphasis_values() {
        let style = DisplayStyle::default();

        let active = LineEmphasis::compute(3, 3, &style);
        assert_eq!(active.distance, 0);
        assert_eq!(active.blur, 0.0);
        assert_eq!(active.opacity, 1.0);
        assert_eq!(active.scale, 1.05);
        assert!(active.expanded);

        let near = LineEmphasis::compute(2, 3, &style);
        assert_eq!(near.blur, 1.0);
        assert!((near.opacity - 0.8).abs() < 1e-9);
        assert_eq!(near.scale, 1.0);
        assert!(!near.expanded);

        let far = LineEmphasis::compute(20, 3, &style);
        assert_eq!(far.blur, 4.0);
        assert!((far.opacity - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_emphasis_css() {
        let css = LineEmphasis::compute(0, 0, &DisplayStyle::default()).css();
        assert_eq!(css, "filter: blur(0px); opacity: 1; transform: scale(1.05);");
    }

    #[test]
    fn test_load_estimates_from_position() {
        let mut display = controller(ManualJumpPolicy::Soft);
        assert_eq!(display.load(10, 9.0), Some(2));
        assert_eq!(display.active(), Some(2));
        assert_eq!(display.emphasis().len(), 10);
    }

    #[test]
    fn test_load_empty_has_no_active_line() {
        let mut display = controller(ManualJumpPolicy::Soft);
        assert_eq!(display.load(0, 50.0), None);
        assert_eq!(display.active(), None);
        assert!(display.emphasis().is_empty());
        assert_eq!(display.view(AnalysisPhase::Ready, true), LyricsView::Empty);
    }

    #[test]
    fn test_update_reports_only_changes() {
        let mut display = controller(ManualJumpPolicy::Soft);
        display.load(10, 0.0);
        assert_eq!(display.update_position(1.0), None);
        assert_eq!(display.update_position(4.5), Some(1));
        assert_eq!(display.update_position(5.0), None);
    }

    #[test]
    fn test_soft_jump_is_superseded_by_next_update() {
        let mut display = controller(ManualJumpPolicy::Soft);
        display.load(10, 0.0);
        assert_eq!(display.jump_to(6, 0.0), Some(6));
        assert!(!display.is_pinned());
        assert_eq!(display.update_position(0.5), Some(0));
    }

    #[test]
    fn test_until_transport_jump_holds() {
        let mut display = controller(ManualJumpPolicy::UntilTransport);
        display.load(10, 0.0);
        assert_eq!(display.jump_to(6, 0.0), Some(6));
        assert_eq!(display.update_position(20.0), None);
        assert_eq!(display.active(), Some(6));

        assert_eq!(display.release_pin(20.0), Some(4));
        assert!(!display.is_pinned());
    }

    #[test]
    fn test_window_jump_expires_after_movement() {
        let mut display = controller(ManualJumpPolicy::Window { seconds: 5.0 });
        display.load(10, 0.0);
        display.jump_to(8, 1.0);
        assert_eq!(display.update_position(4.0), None);
        assert_eq!(display.active(), Some(8));
        assert_eq!(display.update_position(6.0), Some(1));
    }

    #[test]
    fn test_jump_out_of_range_ignored() {
        let mut display = controller(ManualJumpPolicy::UntilTransport);
        display.load(3, 0.0);
        assert_eq!(display.jump_to(3, 0.0), None);
        assert_eq!(display.active(), Some(0));
        assert!(!display.is_pinned());
    }

    #[test]
    fn test_clear() {
        let mut display = controller(ManualJumpPolicy::UntilTransport);
        display.load(3, 0.0);
        display.jump_to(2, 0.0);
        display.clear();
        assert_eq!(display.active(), None);
        assert_eq!(display.line_count(), 0);
        assert!(!display.is_pinned());
    }

    #[test]
    fn test_view_states() {
        let mut display = controller(ManualJumpPolicy::Soft);
        assert_eq!(display.view(AnalysisPhase::Idle, false), LyricsView::Placeholder);
        assert_eq!(display.view(AnalysisPhase::Loading, true), LyricsView::Loading);

        display.load(2, 0.0);
        assert_eq!(
            display.view(AnalysisPhase::Degraded, true),
            LyricsView::Lines {
                active: 0,
                emphasis: display.emphasis(),
            }
        );
    }
}
