use crate::state::SessionState;
use anthology_core::AnalysisPhase;
use dioxus::prelude::*;

/// Background, mood, vocabulary and connections for the selected song.
#[component]
pub fn AnalysisPanel() -> Element {
    let session = use_context::<SessionState>();
    let song = session.song.read();
    let phase = *session.phase.read();
    let payload = session.payload.read();

    let Some(song) = song.as_ref() else {
        return rsx! {
            aside { class: "analysis-panel" }
        };
    };

    let body = match (phase, payload.as_ref()) {
        (AnalysisPhase::Idle | AnalysisPhase::Loading, _) | (_, None) => rsx! {
            p { class: "analysis-loading", "Deciphering..." }
        },
        (_, Some(analysis)) => rsx! {
            if let Some(reason) = &analysis.error {
                div { class: "degraded-notice", "Analysis unavailable: {reason}" }
            }

            if !analysis.mood.is_empty() {
                span { class: "mood", "{analysis.mood}" }
            }

            h3 { "Background" }
            p { "{analysis.background}" }

            if !analysis.vocabulary.is_empty() {
                h3 { "Vocabulary" }
                for (i, item) in analysis.vocabulary.iter().enumerate() {
                    div {
                        key: "{i}",
                        class: "vocab-item",
                        div { class: "vocab-word", "{item.word}" }
                        div { class: "vocab-definition", "{item.definition}" }
                        div { class: "vocab-context", "{item.context_in_song}" }
                    }
                }
            }

            if !analysis.connections.is_empty() {
                h3 { "Connections" }
                for (i, connection) in analysis.connections.iter().enumerate() {
                    div {
                        key: "{i}",
                        class: "connection",
                        div { class: "connection-title", "{connection.song_title}" }
                        div { class: "connection-album", "{connection.album}" }
                        p { "{connection.explanation}" }
                    }
                }
            }
        },
    };

    rsx! {
        aside {
            class: "analysis-panel",

            h2 { "{song.title}" }
            {body}
        }
    }
}
