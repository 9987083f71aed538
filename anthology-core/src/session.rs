use crate::analysis::AnalysisPayload;
use crate::catalog::Song;
use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const LOG_TARGET: &str = "anthology::session";

/// Lifecycle of the analysis for the selected song
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisPhase {
    /// Song selected, nothing requested yet (or nothing selected at all)
    #[default]
    Idle,
    /// Provider call in flight
    Loading,
    /// Well-formed payload available
    Ready,
    /// Provider failed; the fallback payload is shown
    Degraded,
}

impl AnalysisPhase {
    #[must_use]
    pub const fn is_settled(&self) -> bool {
        matches!(self, Self::Ready | Self::Degraded)
    }
}

/// Identifies one analysis request.
///
/// Tickets from an earlier selection are stale and their results are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestTicket {
    generation: u64,
    song_id: u32,
}

impl RequestTicket {
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub const fn song_id(&self) -> u32 {
        self.song_id
    }
}

/// What happened to a result handed to [`AnalysisSession::resolve`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Applied(AnalysisPhase),
    Stale,
}

/// Per-song analysis state
#[derive(Debug, Default)]
pub struct AnalysisSession {
    generation: u64,
    song: Option<Song>,
    phase: AnalysisPhase,
    payload: Option<AnalysisPayload>,
}

impl AnalysisSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn phase(&self) -> AnalysisPhase {
        self.phase
    }

    #[must_use]
    pub const fn song(&self) -> Option<&Song> {
        self.song.as_ref()
    }

    #[must_use]
    pub const fn payload(&self) -> Option<&AnalysisPayload> {
        self.payload.as_ref()
    }

    /// Whether results for `ticket` may still be applied
    #[must_use]
    pub fn is_current(&self, ticket: &RequestTicket) -> bool {
        ticket.generation == self.generation
            && self.song.as_ref().is_some_and(|s| s.id == ticket.song_id)
    }

    /// Select a song, superseding every outstanding request.
    ///
    /// The previous payload is dropped, never merged with the next one.
    pub fn select(&mut self, song: Song) -> RequestTicket {
        self.generation = self.generation.wrapping_add(1);
        let ticket = RequestTicket {
            generation: self.generation,
            song_id: song.id,
        };
        debug!(
            target: LOG_TARGET,
            "Selected '{}' (generation {})", song.title, self.generation
        );
        self.song = Some(song);
        self.phase = AnalysisPhase::Idle;
        self.payload = None;
        ticket
    }

    /// Enter `Loading` for a request that is about to go to the provider
    pub fn mark_loading(&mut self, ticket: &RequestTicket) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        self.phase = AnalysisPhase::Loading;
        true
    }

    /// Apply a payload served from the cache, skipping `Loading`
    pub fn serve_cached(&mut self, ticket: &RequestTicket, payload: AnalysisPayload) -> Resolution {
        self.resolve(ticket, Ok(payload))
    }

    /// Apply a provider result.
    ///
    /// Errors become the fallback payload in `Degraded`; results for a superseded
    /// ticket are discarded.
    pub fn resolve(
        &mut self,
        ticket: &RequestTicket,
        result: Result<AnalysisPayload, CoreError>,
    ) -> Resolution {
        if !self.is_current(ticket) {
            debug!(
                target: LOG_TARGET,
                "Discarding stale analysis (generation {}, current {})",
                ticket.generation,
                self.generation
            );
            return Resolution::Stale;
        }

        let payload = match result {
            Ok(payload) => payload,
            Err(e) => {
                warn!(target: LOG_TARGET, "Analysis failed: {}", e);
                AnalysisPayload::fallback(&e.to_string())
            }
        };

        self.phase = if payload.is_degraded() {
            AnalysisPhase::Degraded
        } else {
            AnalysisPhase::Ready
        };
        self.payload = Some(payload);
        Resolution::Applied(self.phase)
    }
}
