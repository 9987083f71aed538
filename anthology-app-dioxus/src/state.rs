use anthology_core::{
    AnalysisPayload, AnalysisPhase, LyricsView, PlaybackState, SessionSnapshot, Song,
};
use dioxus::prelude::*;

/// UI-side mirror of the session engine, one signal per concern so components
/// only re-render for what they read.
#[derive(Clone, Copy)]
pub struct SessionState {
    /// Currently selected song
    pub song: Signal<Option<Song>>,
    /// Transport state, updated on every tick
    pub playback: Signal<PlaybackState>,
    pub phase: Signal<AnalysisPhase>,
    pub payload: Signal<Option<AnalysisPayload>>,
    /// What the lyric area shows, including per-line emphasis
    pub view: Signal<LyricsView>,
}

impl SessionState {
    #[must_use]
    pub fn new() -> Self {
        Self {
            song: Signal::new(None),
            playback: Signal::new(PlaybackState::default()),
            phase: Signal::new(AnalysisPhase::Idle),
            payload: Signal::new(None),
            view: Signal::new(LyricsView::Placeholder),
        }
    }

    /// Replace everything with a fresh engine snapshot
    pub fn apply_snapshot(&mut self, snapshot: SessionSnapshot) {
        if *self.song.peek() != snapshot.song {
            self.song.set(snapshot.song);
        }
        self.playback.set(snapshot.playback);
        if *self.phase.peek() != snapshot.phase {
            self.phase.set(snapshot.phase);
        }
        if *self.payload.peek() != snapshot.payload {
            self.payload.set(snapshot.payload);
        }
        if *self.view.peek() != snapshot.view {
            self.view.set(snapshot.view);
        }
    }

    pub fn set_playback(&mut self, playback: PlaybackState) {
        self.playback.set(playback);
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}
