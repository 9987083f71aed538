use crate::analysis::AnalysisPayload;
use crate::cache::{cache_key, AnalysisStore};
use crate::catalog::Song;
use crate::config::AnthologyConfig;
use crate::display::{DisplayStyle, LineEmphasis, LyricDisplayController, LyricsView, ManualJumpPolicy};
use crate::error::CoreError;
use crate::estimator::{AverageLineDuration, LineIndexEstimator};
use crate::playback::{PlaybackState, TickOutcome, TimeCursor, DEFAULT_DURATION_SECS};
use crate::provider::{AnalysisProvider, AnalysisRequest};
use crate::session::{AnalysisPhase, AnalysisSession, RequestTicket, Resolution};
use crate::source::{MediaEvent, MediaResource, MediaTicket, PlaybackMode, SimulatedClock};
use std::sync::{Arc, Weak};
use tokio::runtime::Handle;
use tokio::sync::{broadcast, RwLock};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const LOG_TARGET: &str = "anthology::engine";

/// Events emitted by the session engine
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A new song was selected; transport and lyrics were reset
    SongSelected { song: Song },
    /// A transport action or media notification changed the playback state
    PlaybackChanged { state: PlaybackState },
    /// Regular position update from the clock or the media resource
    PositionChanged { state: PlaybackState },
    /// The active lyric line changed
    ActiveLineChanged { index: Option<usize> },
    /// Bring this line into the centre of the lyric viewport
    ScrollToLine { index: usize },
    /// The analysis phase or payload changed
    AnalysisChanged {
        phase: AnalysisPhase,
        payload: Option<AnalysisPayload>,
    },
}

/// Tunables for a [`SessionEngine`]
#[derive(Clone)]
pub struct EngineSettings {
    pub clock: SimulatedClock,
    pub default_duration: f64,
    pub skip_secs: f64,
    pub estimator: Arc<dyn LineIndexEstimator>,
    pub jump_policy: ManualJumpPolicy,
    pub style: DisplayStyle,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            clock: SimulatedClock::default(),
            default_duration: DEFAULT_DURATION_SECS,
            skip_secs: 10.0,
            estimator: Arc::new(AverageLineDuration::default()),
            jump_policy: ManualJumpPolicy::default(),
            style: DisplayStyle::default(),
        }
    }
}

impl From<&AnthologyConfig> for EngineSettings {
    fn from(config: &AnthologyConfig) -> Self {
        Self {
            clock: config.playback.simulated_clock(),
            default_duration: config.playback.default_duration_secs,
            skip_secs: config.playback.skip_secs,
            estimator: Arc::new(config.lyrics.estimator()),
            jump_policy: config.lyrics.jump_policy(),
            style: config.display.style(),
        }
    }
}

/// Point-in-time copy of everything the render surface shows
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub playback: PlaybackState,
    pub song: Option<Song>,
    pub phase: AnalysisPhase,
    pub payload: Option<AnalysisPayload>,
    pub active_line: Option<usize>,
    pub emphasis: Vec<LineEmphasis>,
    pub view: LyricsView,
}

struct EngineInner {
    cursor: TimeCursor,
    display: LyricDisplayController,
    session: AnalysisSession,
    /// Cancels the running simulated clock task, if any
    ticker: Option<CancellationToken>,
}

impl EngineInner {
    fn stop_ticker(&mut self) {
        if let Some(token) = self.ticker.take() {
            token.cancel();
        }
    }
}

/// Coordinates transport, lyric display and analysis for the selected song.
///
/// All state lives behind a single lock; the analysis fetch and cache lookup are the
/// only operations that suspend.
pub struct SessionEngine {
    inner: RwLock<EngineInner>,
    event_tx: broadcast::Sender<SessionEvent>,
    provider: Arc<dyn AnalysisProvider>,
    store: Option<Arc<dyn AnalysisStore>>,
    skip_secs: f64,
    runtime: Handle,
    shutdown: CancellationToken,
}

impl SessionEngine {
    /// Create a new session engine.
    ///
    /// Background tasks are spawned on the runtime this is called from. Pass `None` as
    /// `store` to disable caching.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    #[must_use]
    pub fn new(
        provider: Arc<dyn AnalysisProvider>,
        store: Option<Arc<dyn AnalysisStore>>,
        settings: EngineSettings,
    ) -> Arc<Self> {
        let (event_tx, _) = broadcast::channel(256);

        Arc::new(Self {
            inner: RwLock::new(EngineInner {
                cursor: TimeCursor::new(settings.clock, settings.default_duration),
                display: LyricDisplayController::new(
                    settings.estimator,
                    settings.jump_policy,
                    settings.style,
                ),
                session: AnalysisSession::new(),
                ticker: None,
            }),
            event_tx,
            provider,
            store,
            skip_secs: settings.skip_secs,
            runtime: Handle::current(),
            shutdown: CancellationToken::new(),
        })
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    /// Token cancelled by [`Self::shutdown`]
    #[must_use]
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Get current playback state
    pub async fn state(&self) -> PlaybackState {
        *self.inner.read().await.cursor.state()
    }

    /// Copy out the full session state
    pub async fn snapshot(&self) -> SessionSnapshot {
        let inner = self.inner.read().await;
        SessionSnapshot {
            playback: *inner.cursor.state(),
            song: inner.session.song().cloned(),
            phase: inner.session.phase(),
            payload: inner.session.payload().cloned(),
            active_line: inner.display.active(),
            emphasis: inner.display.emphasis(),
            view: inner
                .display
                .view(inner.session.phase(), inner.session.song().is_some()),
        }
    }

    /// Select a song: reset transport, drop the old lyrics and request an analysis.
    ///
    /// A cached analysis is served without entering `Loading`. Otherwise the provider
    /// call runs in the background and its result is applied only if no newer
    /// selection happened in the meantime.
    pub async fn select_song(self: &Arc<Self>, song: Song) -> RequestTicket {
        let (ticket, state) = {
            let mut inner = self.inner.write().await;
            inner.stop_ticker();
            inner.cursor.reset();
            inner.display.clear();
            let ticket = inner.session.select(song.clone());
            (ticket, *inner.cursor.state())
        };

        info!(target: LOG_TARGET, "Selected song: {}", song.title);
        self.emit(SessionEvent::SongSelected { song: song.clone() });
        self.emit(SessionEvent::PlaybackChanged { state });
        self.emit(SessionEvent::ActiveLineChanged { index: None });
        self.emit(SessionEvent::AnalysisChanged {
            phase: AnalysisPhase::Idle,
            payload: None,
        });

        let key = cache_key(&song.title);
        if let Some(payload) = self.cached(&key).await {
            info!(target: LOG_TARGET, "Serving analysis for '{}' from cache", song.title);
            self.apply_analysis(&ticket, Ok(payload)).await;
            return ticket;
        }

        if !self.inner.write().await.session.mark_loading(&ticket) {
            debug!(target: LOG_TARGET, "Selection superseded during cache lookup");
            return ticket;
        }
        self.emit(SessionEvent::AnalysisChanged {
            phase: AnalysisPhase::Loading,
            payload: None,
        });

        self.spawn_fetch(ticket, song, key);
        ticket
    }

    fn spawn_fetch(self: &Arc<Self>, ticket: RequestTicket, song: Song, key: String) {
        let engine = Arc::clone(self);
        let cancel = self.shutdown.child_token();
        let request = AnalysisRequest::new(song.title);

        self.runtime.spawn(async move {
            info!(
                target: LOG_TARGET,
                "Requesting analysis for '{}' from {}",
                request.song_title,
                engine.provider.name()
            );

            let result = tokio::select! {
                () = cancel.cancelled() => {
                    debug!(target: LOG_TARGET, "Analysis request cancelled");
                    return;
                }
                result = engine.provider.analyze(&request) => result,
            };

            if let Ok(payload) = &result {
                if !payload.is_degraded() {
                    engine.remember(&key, payload).await;
                }
            }

            engine.apply_analysis(&ticket, result).await;
        });
    }

    async fn cached(&self, key: &str) -> Option<AnalysisPayload> {
        let store = self.store.as_ref()?;
        match store.get(key).await {
            Ok(payload) => payload,
            Err(e) => {
                warn!(target: LOG_TARGET, "Cache lookup failed for {}: {}", key, e);
                None
            }
        }
    }

    async fn remember(&self, key: &str, payload: &AnalysisPayload) {
        let Some(store) = &self.store else {
            return;
        };
        if let Err(e) = store.put(key, payload).await {
            warn!(target: LOG_TARGET, "Failed to cache analysis for {}: {}", key, e);
        }
    }

    async fn apply_analysis(
        &self,
        ticket: &RequestTicket,
        result: Result<AnalysisPayload, CoreError>,
    ) {
        let (phase, payload, active) = {
            let mut inner = self.inner.write().await;
            let Resolution::Applied(phase) = inner.session.resolve(ticket, result) else {
                return;
            };

            let payload = inner.session.payload().cloned();
            let line_count = payload.as_ref().map_or(0, |p| p.lyrics.len());
            let position = inner.cursor.position();
            let active = inner.display.load(line_count, position);
            (phase, payload, active)
        };

        info!(target: LOG_TARGET, "Analysis {:?}", phase);
        self.emit(SessionEvent::AnalysisChanged { phase, payload });
        self.emit(SessionEvent::ActiveLineChanged { index: active });
        if let Some(index) = active {
            self.emit(SessionEvent::ScrollToLine { index });
        }
    }

    /// Start playback. In simulated mode this starts the software clock.
    pub async fn play(self: &Arc<Self>) {
        let (state, line) = {
            let mut inner = self.inner.write().await;
            if !inner.cursor.play() {
                return;
            }
            if inner.cursor.mode() == PlaybackMode::Simulated {
                self.start_ticker(&mut inner);
            }
            let position = inner.cursor.position();
            let line = inner.display.release_pin(position);
            (*inner.cursor.state(), line)
        };

        self.emit(SessionEvent::PlaybackChanged { state });
        self.emit_line(line);
    }

    pub async fn pause(&self) {
        let (state, line) = {
            let mut inner = self.inner.write().await;
            if !inner.cursor.pause() {
                return;
            }
            inner.stop_ticker();
            let position = inner.cursor.position();
            let line = inner.display.release_pin(position);
            (*inner.cursor.state(), line)
        };

        self.emit(SessionEvent::PlaybackChanged { state });
        self.emit_line(line);
    }

    pub async fn toggle_play(self: &Arc<Self>) {
        if self.state().await.is_playing {
            self.pause().await;
        } else {
            self.play().await;
        }
    }

    /// Move the playback position, clamped to the track
    pub async fn seek(&self, position: f64) {
        self.reposition(|cursor| cursor.seek(position)).await;
    }

    /// Move the position by `delta` seconds
    pub async fn skip(&self, delta: f64) {
        self.reposition(|cursor| cursor.skip(delta)).await;
    }

    pub async fn skip_forward(&self) {
        self.skip(self.skip_secs).await;
    }

    pub async fn skip_back(&self) {
        self.skip(-self.skip_secs).await;
    }

    /// Seeking counts as a transport action even when the position is unchanged
    async fn reposition<F>(&self, apply: F)
    where
        F: FnOnce(&mut TimeCursor) -> bool + Send,
    {
        let (state, line) = {
            let mut inner = self.inner.write().await;
            if !apply(&mut inner.cursor) {
                debug!(target: LOG_TARGET, "Seek left the position unchanged");
            }
            let position = inner.cursor.position();
            let line = inner.display.release_pin(position);
            (*inner.cursor.state(), line)
        };

        self.emit(SessionEvent::PlaybackChanged { state });
        self.emit_line(line);
    }

    /// Switch to a user-supplied audio resource, releasing the previous one.
    ///
    /// Playback starts once the resource reports [`MediaEvent::Ready`]. Events from
    /// the resource must be passed back with the returned ticket.
    pub async fn bind_media(&self, resource: Box<dyn MediaResource>) -> MediaTicket {
        let (ticket, state, line) = {
            let mut inner = self.inner.write().await;
            inner.stop_ticker();
            let ticket = inner.cursor.bind_media(resource);
            let line = inner.display.release_pin(0.0);
            (ticket, *inner.cursor.state(), line)
        };

        info!(target: LOG_TARGET, "Switched to local audio");
        self.emit(SessionEvent::PlaybackChanged { state });
        self.emit_line(line);
        ticket
    }

    /// Apply a notification from the media resource bound under `ticket`
    pub async fn on_media_event(&self, ticket: MediaTicket, event: MediaEvent) {
        let (state, line) = {
            let mut inner = self.inner.write().await;
            if !inner.cursor.on_media_event(ticket, event) {
                return;
            }
            let position = inner.cursor.position();
            let line = inner.display.update_position(position);
            (*inner.cursor.state(), line)
        };

        match event {
            MediaEvent::PositionAdvanced { .. } => {
                self.emit(SessionEvent::PositionChanged { state });
            }
            MediaEvent::Ready | MediaEvent::MetadataLoaded { .. } | MediaEvent::Ended => {
                self.emit(SessionEvent::PlaybackChanged { state });
            }
        }
        self.emit_line(line);
    }

    /// Make a lyric line active by hand
    pub async fn jump_to_line(&self, index: usize) {
        let line = {
            let mut inner = self.inner.write().await;
            let position = inner.cursor.position();
            inner.display.jump_to(index, position)
        };
        self.emit_line(line);
    }

    /// Advance the simulated clock by one step
    pub async fn tick(&self) -> TickOutcome {
        self.advance(None).await
    }

    async fn advance(&self, ticker: Option<&CancellationToken>) -> TickOutcome {
        let (outcome, state, line) = {
            let mut inner = self.inner.write().await;
            // A ticker stopped while waiting for the lock must not advance
            if ticker.is_some_and(CancellationToken::is_cancelled) {
                return TickOutcome::Idle;
            }

            let outcome = inner.cursor.tick();
            if outcome == TickOutcome::Idle {
                return outcome;
            }
            if outcome == TickOutcome::Finished {
                inner.stop_ticker();
            }
            let position = inner.cursor.position();
            let line = inner.display.update_position(position);
            (outcome, *inner.cursor.state(), line)
        };

        if outcome == TickOutcome::Finished {
            info!(target: LOG_TARGET, "Reached end of track");
            self.emit(SessionEvent::PlaybackChanged { state });
        } else {
            self.emit(SessionEvent::PositionChanged { state });
        }
        self.emit_line(line);
        outcome
    }

    fn start_ticker(self: &Arc<Self>, inner: &mut EngineInner) {
        inner.stop_ticker();

        let token = self.shutdown.child_token();
        inner.ticker = Some(token.clone());
        let period = inner.cursor.clock().period;
        let engine: Weak<Self> = Arc::downgrade(self);

        self.runtime.spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately
            interval.tick().await;

            loop {
                tokio::select! {
                    () = token.cancelled() => break,
                    _ = interval.tick() => {
                        let Some(engine) = engine.upgrade() else {
                            break;
                        };
                        if engine.advance(Some(&token)).await != TickOutcome::Advanced {
                            break;
                        }
                    }
                }
            }
            debug!(target: LOG_TARGET, "Simulated clock stopped");
        });
    }

    /// Stop all background work and release any media resource
    pub async fn shutdown(&self) {
        info!(target: LOG_TARGET, "Shutting down session engine");
        self.shutdown.cancel();
        let mut inner = self.inner.write().await;
        inner.ticker = None;
        inner.cursor.reset();
    }

    fn emit_line(&self, line: Option<usize>) {
        if let Some(index) = line {
            self.emit(SessionEvent::ActiveLineChanged { index: Some(index) });
            self.emit(SessionEvent::ScrollToLine { index });
        }
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.event_tx.send(event);
    }
}
