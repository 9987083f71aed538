use crate::source::{
    MediaBinding, MediaEvent, MediaResource, MediaTicket, PlaybackMode, PlaybackSource,
    SimulatedClock,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

const LOG_TARGET: &str = "anthology::playback";

/// Placeholder track length used until a media resource reports its own
pub const DEFAULT_DURATION_SECS: f64 = 240.0;

/// Observable playback state.
///
/// `0 <= position <= duration` holds whenever the state is observable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaybackState {
    /// Which source advances the position
    pub mode: PlaybackMode,
    /// Whether the transport is playing
    pub is_playing: bool,
    /// Current position in seconds
    pub position: f64,
    /// Track length in seconds (always > 0)
    pub duration: f64,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self::paused_at_start(DEFAULT_DURATION_SECS)
    }
}

impl PlaybackState {
    #[must_use]
    pub const fn paused_at_start(duration: f64) -> Self {
        Self {
            mode: PlaybackMode::Simulated,
            is_playing: false,
            position: 0.0,
            duration,
        }
    }

    /// Fraction of the track already played, in `[0, 1]`
    #[must_use]
    pub fn progress(&self) -> f64 {
        if self.duration > 0.0 {
            (self.position / self.duration).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    fn clamp(&self, position: f64) -> f64 {
        position.clamp(0.0, self.duration)
    }
}

/// Result of one simulated clock step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing to do: paused, or a media resource owns the clock
    Idle,
    /// Position moved forward by one step
    Advanced,
    /// The track ended; playback stopped and rewound to the start
    Finished,
}

/// Single source of truth for the playback position and transport state.
///
/// Owns the active [`PlaybackSource`]; callers never need to know which variant
/// is active.
#[derive(Debug)]
pub struct TimeCursor {
    state: PlaybackState,
    source: PlaybackSource,
    clock: SimulatedClock,
    default_duration: f64,
    /// Bumped on every bind; events carrying an older ticket are stale
    media_generation: u64,
}

impl Default for TimeCursor {
    fn default() -> Self {
        Self::new(SimulatedClock::default(), DEFAULT_DURATION_SECS)
    }
}

impl TimeCursor {
    /// Create a cursor in simulated mode, paused at zero
    #[must_use]
    pub fn new(clock: SimulatedClock, default_duration: f64) -> Self {
        let default_duration = if default_duration.is_finite() && default_duration > 0.0 {
            default_duration
        } else {
            DEFAULT_DURATION_SECS
        };

        Self {
            state: PlaybackState::paused_at_start(default_duration),
            source: PlaybackSource::Simulated(clock),
            clock,
            default_duration,
            media_generation: 0,
        }
    }

    #[must_use]
    pub const fn state(&self) -> &PlaybackState {
        &self.state
    }

    #[must_use]
    pub const fn mode(&self) -> PlaybackMode {
        self.state.mode
    }

    #[must_use]
    pub const fn is_playing(&self) -> bool {
        self.state.is_playing
    }

    #[must_use]
    pub const fn position(&self) -> f64 {
        self.state.position
    }

    #[must_use]
    pub const fn clock(&self) -> SimulatedClock {
        self.clock
    }

    /// Move to `position`, clamped to `[0, duration]`. Non-finite input is ignored.
    ///
    /// Returns whether the position changed.
    pub fn seek(&mut self, position: f64) -> bool {
        if !position.is_finite() {
            return false;
        }

        let target = self.state.clamp(position);
        if let Some(media) = self.source.media_mut() {
            media.seek_to(target);
        }

        let changed = (target - self.state.position).abs() > f64::EPSILON;
        self.state.position = target;
        changed
    }

    /// Seek relative to the current position
    pub fn skip(&mut self, delta: f64) -> bool {
        self.seek(self.state.position + delta)
    }

    /// Start playback. No-op when already playing.
    pub fn play(&mut self) -> bool {
        if self.state.is_playing {
            return false;
        }
        if let Some(media) = self.source.media_mut() {
            media.play();
        }
        self.state.is_playing = true;
        true
    }

    /// Pause playback. No-op when already paused.
    pub fn pause(&mut self) -> bool {
        if !self.state.is_playing {
            return false;
        }
        if let Some(media) = self.source.media_mut() {
            media.pause();
            let reported = media.current_position();
            if reported.is_finite() {
                self.state.position = self.state.clamp(reported);
            }
        }
        self.state.is_playing = false;
        true
    }

    /// Flip the transport; returns the new playing flag
    pub fn toggle(&mut self) -> bool {
        if self.state.is_playing {
            self.pause();
        } else {
            self.play();
        }
        self.state.is_playing
    }

    /// Advance the simulated clock by one step.
    ///
    /// Reaching the end stops playback and rewinds to zero instead of pausing at
    /// the end.
    pub fn tick(&mut self) -> TickOutcome {
        if self.state.mode != PlaybackMode::Simulated || !self.state.is_playing {
            return TickOutcome::Idle;
        }

        let next = self.state.position + self.clock.step;
        if next >= self.state.duration {
            self.stop_and_rewind();
            return TickOutcome::Finished;
        }

        self.state.position = next;
        TickOutcome::Advanced
    }

    /// Return to simulated mode, paused at zero with the default duration.
    /// Any bound media resource is released.
    pub fn reset(&mut self) {
        self.source.replace(PlaybackSource::Simulated(self.clock));
        self.state = PlaybackState::paused_at_start(self.default_duration);
    }

    /// Bind a new media resource, releasing the previous one.
    ///
    /// The cursor switches to media-backed mode and is marked playing; the
    /// resource itself starts once it reports [`MediaEvent::Ready`]. The returned
    /// ticket must accompany every event from this resource.
    pub fn bind_media(&mut self, resource: Box<dyn MediaResource>) -> MediaTicket {
        self.media_generation = self.media_generation.wrapping_add(1);
        debug!(
            target: LOG_TARGET,
            "Binding media resource (generation {})", self.media_generation
        );

        let binding = MediaBinding::autoplay(resource);
        let known_duration = binding.duration().filter(|d| d.is_finite() && *d > 0.0);
        self.source.replace(PlaybackSource::MediaBacked(binding));
        self.state.mode = PlaybackMode::MediaBacked;
        self.state.is_playing = true;
        self.state.position = 0.0;
        if let Some(duration) = known_duration {
            self.state.duration = duration;
        }
        MediaTicket::new(self.media_generation)
    }

    /// Apply a notification from the media resource bound under `ticket`.
    ///
    /// Events are ignored in simulated mode and when `ticket` belongs to a replaced
    /// binding. Returns whether the observable state changed.
    pub fn on_media_event(&mut self, ticket: MediaTicket, event: MediaEvent) -> bool {
        if ticket.generation() != self.media_generation {
            debug!(
                target: LOG_TARGET,
                "Dropping {:?} from superseded media binding {}", event, ticket.generation()
            );
            return false;
        }
        let Some(media) = self.source.media_mut() else {
            debug!(target: LOG_TARGET, "Ignoring {:?} without a bound media resource", event);
            return false;
        };

        match event {
            MediaEvent::Ready => {
                if media.mark_ready() {
                    debug!(target: LOG_TARGET, "Media ready, deferred playback started");
                }
                false
            }
            MediaEvent::MetadataLoaded { duration } => {
                if !duration.is_finite() || duration <= 0.0 {
                    return false;
                }
                self.state.duration = duration;
                self.state.position = self.state.clamp(self.state.position);
                true
            }
            MediaEvent::PositionAdvanced { position } => {
                if !position.is_finite() {
                    return false;
                }
                let position = self.state.clamp(position);
                let changed = (position - self.state.position).abs() > f64::EPSILON;
                self.state.position = position;
                changed
            }
            MediaEvent::Ended => {
                media.stop();
                self.stop_and_rewind();
                true
            }
        }
    }

    fn stop_and_rewind(&mut self) {
        self.state.is_playing = false;
        self.state.position = 0.0;
    }
}

/// Format seconds as `m:ss`. Non-finite or negative input renders as `0:00`.
#[must_use]
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "0:00".to_string();
    }

    // Saturating conversion of a finite, non-negative value
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let total = seconds.floor() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}
