use crate::components::{AnalysisPanel, LyricsPanel, SongList, TransportBar};
use crate::theme::load_theme_css;
use dioxus::prelude::*;

/// Root application component.
/// Song list on the left, lyrics and transport in the middle, analysis on the right.
#[component]
pub fn App() -> Element {
    let css = use_hook(load_theme_css);

    rsx! {
        style { "{css}" }
        div {
            class: "app",

            SongList {}

            main {
                class: "stage",
                LyricsPanel {}
                TransportBar {}
            }

            AnalysisPanel {}
        }
    }
}
