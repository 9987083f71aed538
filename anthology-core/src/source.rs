//! Playback sources: the simulated software clock and real media resources.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const LOG_TARGET: &str = "anthology::source";

/// Which kind of source currently drives the playback position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackMode {
    /// No real audio; position advances on a fixed software timer
    #[default]
    Simulated,
    /// Position follows a user-supplied media resource's native clock
    MediaBacked,
}

impl PlaybackMode {
    /// Human-readable label for the transport bar
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Simulated => "Visual Preview Mode",
            Self::MediaBacked => "Local Audio",
        }
    }
}

/// A user-supplied audio resource.
///
/// The core binds and releases the resource and drives its transport; decoding
/// and output are the resource's business. Notifications travel the other way as
/// [`MediaEvent`]s.
pub trait MediaResource: Send + Sync {
    fn play(&mut self);

    fn pause(&mut self);

    fn seek_to(&mut self, position: f64);

    /// Position reported by the resource, in seconds
    fn current_position(&self) -> f64;

    /// Duration reported by the resource, once its metadata has loaded
    fn duration(&self) -> Option<f64>;

    /// Free the underlying handle. Consumes the resource, so it runs at most once.
    fn release(self: Box<Self>);
}

/// Notifications emitted by a bound media resource
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MediaEvent {
    /// The resource can start playing
    Ready,
    /// Duration is known
    MetadataLoaded { duration: f64 },
    /// The resource's clock moved
    PositionAdvanced { position: f64 },
    /// Playback reached the end of the resource
    Ended,
}

/// Fixed-period software clock used when no real audio is bound.
///
/// Each period adds a fixed step to the position. The step is not derived from
/// wall-clock time, so the simulated position may drift from real time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulatedClock {
    pub period: Duration,
    pub step: f64,
}

impl SimulatedClock {
    pub const DEFAULT_PERIOD: Duration = Duration::from_millis(500);
    pub const DEFAULT_STEP_SECS: f64 = 0.5;

    #[must_use]
    pub const fn new(period: Duration, step: f64) -> Self {
        Self { period, step }
    }
}

impl Default for SimulatedClock {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PERIOD, Self::DEFAULT_STEP_SECS)
    }
}

/// Identifies one [`TimeCursor::bind_media`](crate::TimeCursor::bind_media) call.
///
/// Events tagged with a ticket from an earlier binding are dropped, so late
/// notifications from a replaced resource never touch its successor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MediaTicket {
    generation: u64,
}

impl MediaTicket {
    pub(crate) const fn new(generation: u64) -> Self {
        Self { generation }
    }

    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }
}

/// A bound media resource plus its readiness bookkeeping
pub struct MediaBinding {
    resource: Box<dyn MediaResource>,
    ready: bool,
    autoplay_pending: bool,
}

impl MediaBinding {
    /// Bind a resource that should start playing as soon as it reports ready
    #[must_use]
    pub fn autoplay(resource: Box<dyn MediaResource>) -> Self {
        Self {
            resource,
            ready: false,
            autoplay_pending: true,
        }
    }

    /// Start playback now if the resource is ready, otherwise once it is
    pub fn play(&mut self) {
        if self.ready {
            self.resource.play();
        } else {
            self.autoplay_pending = true;
        }
    }

    pub fn pause(&mut self) {
        self.autoplay_pending = false;
        self.resource.pause();
    }

    pub fn seek_to(&mut self, position: f64) {
        self.resource.seek_to(position);
    }

    /// Halt at the start after the resource played through. Cancels a pending autoplay.
    pub fn stop(&mut self) {
        self.autoplay_pending = false;
        self.resource.pause();
        self.resource.seek_to(0.0);
    }

    /// Mark the resource ready. Returns whether a deferred play was started.
    pub fn mark_ready(&mut self) -> bool {
        self.ready = true;
        if self.autoplay_pending {
            self.autoplay_pending = false;
            self.resource.play();
            return true;
        }
        false
    }

    #[must_use]
    pub fn current_position(&self) -> f64 {
        self.resource.current_position()
    }

    #[must_use]
    pub fn duration(&self) -> Option<f64> {
        self.resource.duration()
    }

    pub fn release(self) {
        debug!(target: LOG_TARGET, "Releasing media resource");
        self.resource.release();
    }
}

impl std::fmt::Debug for MediaBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaBinding")
            .field("ready", &self.ready)
            .field("autoplay_pending", &self.autoplay_pending)
            .finish_non_exhaustive()
    }
}

/// The source that currently owns advancing the position
#[derive(Debug)]
pub enum PlaybackSource {
    Simulated(SimulatedClock),
    MediaBacked(MediaBinding),
}

impl PlaybackSource {
    pub fn media_mut(&mut self) -> Option<&mut MediaBinding> {
        match self {
            Self::MediaBacked(binding) => Some(binding),
            Self::Simulated(_) => None,
        }
    }

    /// Replace this source, releasing any media resource it held
    pub fn replace(&mut self, next: Self) {
        if let Self::MediaBacked(previous) = std::mem::replace(self, next) {
            previous.release();
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::{MediaResource, PlaybackMode};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Calls observed on a [`RecordingMedia`]
    #[derive(Debug, Default)]
    pub struct MediaLog {
        pub plays: AtomicUsize,
        pub pauses: AtomicUsize,
        pub releases: AtomicUsize,
        pub seeks: Mutex<Vec<f64>>,
    }

    impl MediaLog {
        pub fn plays(&self) -> usize {
            self.plays.load(Ordering::SeqCst)
        }

        pub fn pauses(&self) -> usize {
            self.pauses.load(Ordering::SeqCst)
        }

        pub fn releases(&self) -> usize {
            self.releases.load(Ordering::SeqCst)
        }

        pub fn seeks(&self) -> Vec<f64> {
            self.seeks.lock().unwrap().clone()
        }
    }

    /// Media resource that records every call into a shared log
    pub struct RecordingMedia {
        pub log: Arc<MediaLog>,
        pub position: f64,
        pub duration: Option<f64>,
    }

    impl RecordingMedia {
        pub fn boxed() -> (Box<dyn MediaResource>, Arc<MediaLog>) {
            let log = Arc::new(MediaLog::default());
            let media = Self {
                log: Arc::clone(&log),
                position: 0.0,
                duration: None,
            };
            (Box::new(media), log)
        }
    }

    impl MediaResource for RecordingMedia {
        fn play(&mut self) {
            self.log.plays.fetch_add(1, Ordering::SeqCst);
        }

        fn pause(&mut self) {
            self.log.pauses.fetch_add(1, Ordering::SeqCst);
        }

        fn seek_to(&mut self, position: f64) {
            self.position = position;
            self.log.seeks.lock().unwrap().push(position);
        }

        fn current_position(&self) -> f64 {
            self.position
        }

        fn duration(&self) -> Option<f64> {
            self.duration
        }

        fn release(self: Box<Self>) {
            self.log.releases.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_mode_labels() {
        assert_eq!(PlaybackMode::Simulated.label(), "Visual Preview Mode");
        assert_eq!(PlaybackMode::MediaBacked.label(), "Local Audio");
    }
}

#[cfg(test)]
mod tests {
    use super::testing::RecordingMedia;
    use super::*;

    #[test]
    fn test_binding_defers_play_until_ready() {
        let (media, log) = RecordingMedia::boxed();
        let mut binding = MediaBinding::autoplay(media);
        assert_eq!(log.plays(), 0);

        assert!(binding.mark_ready());
        assert_eq!(log.plays(), 1);

        // A second ready notification does not replay
        assert!(!binding.mark_ready());
        assert_eq!(log.plays(), 1);
    }

    #[test]
    fn test_binding_pause_cancels_pending_autoplay() {
        let (media, log) = RecordingMedia::boxed();
        let mut binding = MediaBinding::autoplay(media);

        binding.pause();
        assert!(!binding.mark_ready());
        assert_eq!(log.plays(), 0);
        assert_eq!(log.pauses(), 1);
    }

    #[test]
    fn test_replace_releases_previous_media_once() {
        let (media, log) = RecordingMedia::boxed();
        let mut source = PlaybackSource::MediaBacked(MediaBinding::autoplay(media));
        assert!(source.media_mut().is_some());

        source.replace(PlaybackSource::Simulated(SimulatedClock::default()));
        assert!(source.media_mut().is_none());
        assert_eq!(log.releases(), 1);

        source.replace(PlaybackSource::Simulated(SimulatedClock::default()));
        assert_eq!(log.releases(), 1);
    }

    #[test]
    fn test_binding_stop_cancels_pending_autoplay() {
        let (media, log) = RecordingMedia::boxed();
        let mut binding = MediaBinding::autoplay(media);

        binding.stop();
        assert!(!binding.mark_ready());
        assert_eq!(log.plays(), 0);
        assert_eq!(log.seeks(), vec![0.0]);
    }

    #[test]
    fn test_simulated_clock_defaults() {
        let clock = SimulatedClock::default();
        assert_eq!(clock.period, Duration::from_millis(500));
        assert!((clock.step - 0.5).abs() < f64::EPSILON);
    }
}
