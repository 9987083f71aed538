use crate::media::{AUDIO_ELEMENT_ID, AUDIO_INPUT_ID};
use crate::state::SessionState;
use anthology_core::{format_time, SessionEngine};
use dioxus::prelude::*;
use std::sync::Arc;

/// Play/pause, skip and seek controls plus the local file picker.
///
/// The file input and audio element are hidden; `media` wires them to the engine.
/// Opening a file is offered only once a song is selected.
#[component]
pub fn TransportBar() -> Element {
    let engine: Arc<SessionEngine> = use_context();
    let session = use_context::<SessionState>();

    let playback = *session.playback.read();
    let has_song = session.song.read().is_some();

    let position_label = format_time(playback.position);
    let duration_label = format_time(playback.duration);
    let mode_label = playback.mode.label();

    let on_back = {
        let engine = engine.clone();
        move |_: MouseEvent| {
            let engine = engine.clone();
            spawn(async move { engine.skip_back().await });
        }
    };
    let on_toggle = {
        let engine = engine.clone();
        move |_: MouseEvent| {
            let engine = engine.clone();
            spawn(async move { engine.toggle_play().await });
        }
    };
    let on_forward = {
        let engine = engine.clone();
        move |_: MouseEvent| {
            let engine = engine.clone();
            spawn(async move { engine.skip_forward().await });
        }
    };
    let on_seek = move |evt: FormEvent| {
        let Ok(position) = evt.value().parse::<f64>() else {
            return;
        };
        let engine = engine.clone();
        spawn(async move { engine.seek(position).await });
    };

    rsx! {
        footer {
            class: "transport",

            // Always mounted so the media listener can attach; usable once a song is picked
            input {
                id: AUDIO_INPUT_ID,
                class: "hidden",
                r#type: "file",
                accept: "audio/*",
                disabled: !has_song,
            }
            if has_song {
                label { r#for: AUDIO_INPUT_ID, "Open audio" }
            }
            audio { id: AUDIO_ELEMENT_ID, class: "hidden", preload: "auto" }

            button { disabled: !has_song, onclick: on_back, "-10s" }
            button {
                disabled: !has_song,
                onclick: on_toggle,
                if playback.is_playing { "Pause" } else { "Play" }
            }
            button { disabled: !has_song, onclick: on_forward, "+10s" }

            span { class: "time", "{position_label}" }
            input {
                class: "seek",
                r#type: "range",
                min: "0",
                max: "{playback.duration}",
                step: "0.1",
                value: "{playback.position}",
                disabled: !has_song,
                oninput: on_seek,
            }
            span { class: "time", "{duration_label}" }
            span { class: "mode", "{mode_label}" }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anthology_core::{EngineSettings, Song, UnavailableProvider};

    fn harness() -> Element {
        let selected: Option<Song> = use_context();
        let mut state = use_context_provider(SessionState::new);
        use_hook(move || state.song.set(selected));
        rsx! { TransportBar {} }
    }

    fn render(selected: Option<Song>) -> String {
        let engine = SessionEngine::new(
            Arc::new(UnavailableProvider::new("offline")),
            None,
            EngineSettings::default(),
        );
        let mut dom = VirtualDom::new(harness);
        dom.provide_root_context(engine);
        dom.provide_root_context(selected);
        dom.rebuild_in_place();
        dioxus_ssr::render(&dom)
    }

    #[tokio::test]
    async fn test_file_picker_hidden_until_song_selected() {
        let html = render(None);
        assert!(!html.contains("Open audio"));
        assert!(html.contains(AUDIO_INPUT_ID));
        assert!(html.contains(AUDIO_ELEMENT_ID));

        let html = render(Some(Song::new(1, "Fortnight", 1, false)));
        assert!(html.contains("Open audio"));
    }
}
