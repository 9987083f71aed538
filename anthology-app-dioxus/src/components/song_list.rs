use crate::state::SessionState;
use anthology_core::{Catalog, SessionEngine, Song};
use dioxus::prelude::*;
use std::sync::Arc;

/// Track list grouped into the standard album and the anthology tracks.
#[component]
pub fn SongList() -> Element {
    let catalog: Arc<Catalog> = use_context();

    rsx! {
        nav {
            class: "song-list",

            h2 { "The Tortured Poets Department" }
            for song in catalog.standard() {
                SongItem { key: "{song.id}", song: song.clone() }
            }

            h2 { "The Anthology" }
            for song in catalog.anthology() {
                SongItem { key: "{song.id}", song: song.clone() }
            }
        }
    }
}

#[component]
fn SongItem(song: Song) -> Element {
    let engine: Arc<SessionEngine> = use_context();
    let session = use_context::<SessionState>();

    let is_selected = session.song.read().as_ref().is_some_and(|s| s.id == song.id);
    let title = song.title.clone();
    let number = song.track_number;

    let on_click = move |_: MouseEvent| {
        let engine = engine.clone();
        let song = song.clone();
        spawn(async move {
            engine.select_song(song).await;
        });
    };

    rsx! {
        button {
            class: if is_selected { "song-item selected" } else { "song-item" },
            onclick: on_click,
            span { class: "song-number", "{number}" }
            span { class: "song-title", "{title}" }
        }
    }
}
