mod analysis_panel;
mod lyrics_view;
mod song_list;
mod transport;

pub use analysis_panel::AnalysisPanel;
pub use lyrics_view::LyricsPanel;
pub use song_list::SongList;
pub use transport::TransportBar;
