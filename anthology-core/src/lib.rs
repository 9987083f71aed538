pub mod analysis;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod display;
pub mod engine;
pub mod error;
pub mod estimator;
pub mod paths;
pub mod playback;
pub mod provider;
pub mod session;
pub mod source;

pub use analysis::{AnalysisPayload, Connection, LyricLine, VocabularyItem};
pub use cache::{cache_key, AnalysisCache, AnalysisStore, MemoryAnalysisCache};
pub use catalog::{Catalog, Song};
pub use config::{
    AnalysisConfig, AnalysisProviderType, AnthologyConfig, DisplayConfig, LoggingConfig,
    LyricsConfig, ManualJumpMode, PlaybackConfig, CONFIG_TEMPLATE,
};
pub use display::{DisplayStyle, LineEmphasis, LyricDisplayController, LyricsView, ManualJumpPolicy};
pub use engine::{EngineSettings, SessionEngine, SessionEvent, SessionSnapshot};
pub use error::{CoreError, Result};
pub use estimator::{estimate_line_index, AverageLineDuration, LineIndexEstimator};
pub use paths::{config_dir, CONFIG_DIR_NAME, CONFIG_FILE_NAME};
pub use playback::{format_time, PlaybackState, TickOutcome, TimeCursor};
pub use provider::{AnalysisProvider, AnalysisRequest, UnavailableProvider};
pub use session::{AnalysisPhase, AnalysisSession, RequestTicket, Resolution};
pub use source::{MediaEvent, MediaResource, MediaTicket, PlaybackMode, SimulatedClock};

/// Re-export toml error type for config parsing error handling
pub use toml::de::Error as TomlParseError;
