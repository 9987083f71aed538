use crate::state::SessionState;
use anthology_core::{LineEmphasis, LyricLine, LyricsView, SessionEngine};
use dioxus::prelude::*;
use std::sync::Arc;

/// Number of placeholder bars shown while an analysis loads
const SKELETON_LINES: usize = 6;

/// Scrolling lyric list with distance-based emphasis around the active line.
#[component]
pub fn LyricsPanel() -> Element {
    let session = use_context::<SessionState>();
    let view = session.view.read();
    let payload = session.payload.read();

    let body = match &*view {
        LyricsView::Placeholder => rsx! {
            p { class: "lyrics-message", "Select a track to decipher." }
        },
        LyricsView::Loading => rsx! {
            div {
                class: "lyrics-skeleton",
                for i in 0..SKELETON_LINES {
                    div { key: "{i}", class: "skeleton-line" }
                }
            }
        },
        LyricsView::Empty => rsx! {
            p { class: "lyrics-message", "No lyrics available for this track." }
        },
        LyricsView::Lines { active, emphasis } => {
            let lines = payload.as_ref().map(|p| p.lyrics.as_slice()).unwrap_or_default();
            rsx! {
                for (index, (line, emphasis)) in lines.iter().zip(emphasis.iter()).enumerate() {
                    LyricRow {
                        key: "{index}",
                        index,
                        line: line.clone(),
                        emphasis: *emphasis,
                        is_active: index == *active,
                    }
                }
            }
        }
    };

    rsx! {
        section {
            class: "lyrics-panel",
            {body}
        }
    }
}

#[component]
fn LyricRow(index: usize, line: LyricLine, emphasis: LineEmphasis, is_active: bool) -> Element {
    let engine: Arc<SessionEngine> = use_context();
    let style = emphasis.css();

    let on_click = move |_: MouseEvent| {
        let engine = engine.clone();
        spawn(async move {
            engine.jump_to_line(index).await;
        });
    };

    rsx! {
        div {
            id: "lyric-line-{index}",
            class: if is_active { "lyric-line active" } else { "lyric-line" },
            style: "{style}",
            onclick: on_click,

            div { class: "lyric-original", "{line.original}" }
            if emphasis.expanded {
                div { class: "lyric-translation", "{line.translation}" }
                if let Some(note) = line.note() {
                    div { class: "lyric-note", "{note}" }
                }
            }
        }
    }
}
