use crate::state::SessionState;
use anthology_core::{SessionEngine, SessionEvent};
use dioxus::prelude::*;
use std::sync::Arc;
use tracing::{debug, info};

const LOG_TARGET: &str = "anthology::bridge";

/// Bridge `SessionEngine` events to Dioxus signals.
/// This function spawns an async task that listens to engine events
/// and updates the session state signals accordingly.
pub fn use_session_bridge(engine: Arc<SessionEngine>, state: SessionState) {
    use_future(move || {
        let engine = engine.clone();
        let mut state = state;
        async move {
            let mut rx = engine.subscribe();
            state.apply_snapshot(engine.snapshot().await);

            loop {
                match rx.recv().await {
                    Ok(event) => {
                        handle_session_event(&engine, event, state).await;
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                        info!(target: LOG_TARGET, "Session event channel closed");
                        break;
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        info!(target: LOG_TARGET, "Missed {} session events, resyncing", n);
                        state.apply_snapshot(engine.snapshot().await);
                    }
                }
            }
        }
    });
}

async fn handle_session_event(engine: &SessionEngine, event: SessionEvent, mut state: SessionState) {
    match event {
        SessionEvent::PlaybackChanged { state: playback }
        | SessionEvent::PositionChanged { state: playback } => {
            state.set_playback(playback);
        }
        SessionEvent::ScrollToLine { index } => {
            scroll_to_line(index).await;
        }
        SessionEvent::SongSelected { .. }
        | SessionEvent::ActiveLineChanged { .. }
        | SessionEvent::AnalysisChanged { .. } => {
            state.apply_snapshot(engine.snapshot().await);
        }
    }
}

/// Centre a lyric line in the viewport
async fn scroll_to_line(index: usize) {
    // Wait a frame so freshly loaded lines are in the DOM
    let js = format!(
        "requestAnimationFrame(() => document.getElementById('lyric-line-{index}')\
            ?.scrollIntoView({{ behavior: 'smooth', block: 'center' }}));"
    );
    if let Err(e) = document::eval(&js).await {
        debug!(target: LOG_TARGET, "Failed to scroll to line {}: {}", index, e);
    }
}
