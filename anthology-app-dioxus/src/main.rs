#![cfg_attr(feature = "bundle", windows_subsystem = "windows")]
mod app;
mod bridge;
mod components;
mod media;
mod state;
mod theme;

use crate::app::App;
use crate::bridge::use_session_bridge;
use crate::media::use_local_media;
use crate::state::SessionState;
use anthology_analysis_gemini::GeminiProvider;
use anthology_core::config::AnalysisProviderType;
use anthology_core::{
    AnalysisCache, AnalysisProvider, AnalysisStore, AnthologyConfig, Catalog, CoreError,
    EngineSettings, MemoryAnalysisCache, SessionEngine, SessionEvent, TomlParseError,
    UnavailableProvider, CONFIG_TEMPLATE,
};
use dioxus::desktop::{LogicalSize, WindowBuilder};
use dioxus::prelude::*;
use rfd::{MessageButtons, MessageDialog, MessageDialogResult, MessageLevel};
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const APP_NAME: &str = "Anthology";

fn main() {
    // Check config for logging.enabled before full config load
    let file_logging_enabled = check_file_logging_enabled();
    init_tracing(file_logging_enabled);

    let config = match AnthologyConfig::load_or_create() {
        Ok(config) => config,
        Err(CoreError::ConfigNotFound { path }) => {
            // Config was just created - show dialog informing user
            show_new_config_dialog(&path);
            std::process::exit(0);
        }
        Err(CoreError::ConfigParseError(parse_error)) => {
            show_config_parse_error_dialog(&parse_error, &AnthologyConfig::config_path());
            std::process::exit(1);
        }
        Err(e) => {
            error!("{e}");
            show_generic_error_dialog(&e.to_string());
            std::process::exit(1);
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to create tokio runtime: {e}");
            std::process::exit(1);
        }
    };
    // Engine tasks are spawned on this runtime
    let _runtime_guard = runtime.enter();

    let store = create_store(&runtime, &config);
    let provider = create_provider(&config);
    info!("Using analysis provider: {}", provider.name());

    let engine = SessionEngine::new(provider, store, EngineSettings::from(&config));

    // Set up Ctrl+C handler to trigger graceful shutdown
    let cancel_token = CancellationToken::new();
    let ctrlc_token = cancel_token.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received Ctrl+C, shutting down gracefully...");
        ctrlc_token.cancel();
    }) {
        error!("Failed to set Ctrl+C handler: {}", e);
    }

    runtime.spawn(shutdown_on_cancel(engine.clone(), cancel_token));
    runtime.spawn(log_session_events(engine.clone()));

    let window = WindowBuilder::new()
        .with_title(APP_NAME)
        .with_resizable(true)
        .with_inner_size(LogicalSize::new(1280.0, 820.0))
        .with_min_inner_size(LogicalSize::new(960.0, 600.0));

    let dioxus_config = dioxus::desktop::Config::default()
        .with_window(window)
        .with_disable_context_menu(true);

    // Inject the engine and catalog before launch
    dioxus::LaunchBuilder::desktop()
        .with_cfg(dioxus_config)
        .with_context(engine)
        .with_context(Arc::new(Catalog::builtin()))
        .launch(app);
}

/// Root component that sets up context and renders the app
fn app() -> Element {
    let state = use_context_provider(SessionState::new);
    let engine: Arc<SessionEngine> = use_context();

    // Bridge engine events to Dioxus signals
    use_session_bridge(engine.clone(), state);
    // Wire the webview audio element to the engine
    use_local_media(engine);

    rsx! {
        document::Title { "{APP_NAME}" }
        App {}
    }
}

/// Open the analysis cache, falling back to an in-memory one
fn create_store(
    runtime: &tokio::runtime::Runtime,
    config: &AnthologyConfig,
) -> Option<Arc<dyn AnalysisStore>> {
    if !config.analysis.cache_enabled {
        info!("Analysis cache disabled");
        return None;
    }

    let store: Arc<dyn AnalysisStore> = runtime.block_on(async {
        match AnalysisCache::new().await {
            Ok(cache) => Arc::new(cache) as Arc<dyn AnalysisStore>,
            Err(e) => {
                warn!("Failed to open analysis cache, keeping results in memory: {}", e);
                Arc::new(MemoryAnalysisCache::new())
            }
        }
    });
    Some(store)
}

fn create_provider(config: &AnthologyConfig) -> Arc<dyn AnalysisProvider> {
    match config.analysis.provider {
        AnalysisProviderType::Gemini => {
            let Some(api_key) = config.api_key() else {
                warn!("No Gemini API key configured; analyses will be unavailable");
                return Arc::new(UnavailableProvider::new("No API key configured"));
            };
            match GeminiProvider::new(api_key, config.analysis.model.clone()) {
                Ok(provider) => {
                    info!("Initializing Gemini provider ({})", provider.model());
                    Arc::new(provider)
                }
                Err(e) => {
                    error!("Failed to create Gemini provider: {}", e);
                    Arc::new(UnavailableProvider::new(e.to_string()))
                }
            }
        }
    }
}

/// Stop the engine and exit once Ctrl+C was received
async fn shutdown_on_cancel(engine: Arc<SessionEngine>, cancel_token: CancellationToken) {
    cancel_token.cancelled().await;
    engine.shutdown().await;
    std::process::exit(0);
}

/// Show dialog when config is newly created
fn show_new_config_dialog(config_path: &Path) {
    let message = "A configuration file has been created.\n\n\
        Add your Gemini API key to enable song analysis:\n\
        \u{2022} analysis.api_key (or set GEMINI_API_KEY)\n\n\
        Then start Anthology again.";

    let result = MessageDialog::new()
        .set_level(MessageLevel::Info)
        .set_title("Anthology - Configuration Created")
        .set_description(message)
        .set_buttons(MessageButtons::OkCancelCustom(
            "Open Config".into(),
            "Exit".into(),
        ))
        .show();

    if matches!(result, MessageDialogResult::Custom(ref s) if s == "Open Config") {
        if let Err(e) = open::that(config_path) {
            error!("Failed to open config file: {e}");
        }
    }
}

/// Show dialog when config file has TOML parsing errors
fn show_config_parse_error_dialog(parse_error: &TomlParseError, config_path: &Path) {
    let message = format!(
        "Your configuration file has a syntax error and cannot be loaded.\n\n\
        Error: {parse_error}\n\n\
        You can either:\n\
        \u{2022} Open the config file and fix the syntax error\n\
        \u{2022} Reset to a fresh configuration template"
    );

    let result = MessageDialog::new()
        .set_level(MessageLevel::Error)
        .set_title("Anthology - Configuration Error")
        .set_description(&message)
        .set_buttons(MessageButtons::OkCancelCustom(
            "Open Config".into(),
            "Reset Config".into(),
        ))
        .show();

    match result {
        MessageDialogResult::Custom(button) if button == "Open Config" => {
            if let Err(e) = open::that(config_path) {
                error!("Failed to open config file: {e}");
            }
        }
        MessageDialogResult::Custom(button) if button == "Reset Config" => {
            if let Err(e) = std::fs::write(config_path, CONFIG_TEMPLATE) {
                error!("Failed to reset config file: {e}");
                MessageDialog::new()
                    .set_level(MessageLevel::Error)
                    .set_title("Anthology - Reset Failed")
                    .set_description(format!("Failed to reset configuration:\n{e}"))
                    .set_buttons(MessageButtons::Ok)
                    .show();
            } else {
                MessageDialog::new()
                    .set_level(MessageLevel::Info)
                    .set_title("Anthology - Configuration Reset")
                    .set_description(
                        "Configuration has been reset to the default template.\n\n\
                        Please add your API key and restart the app.",
                    )
                    .set_buttons(MessageButtons::Ok)
                    .show();
                if let Err(e) = open::that(config_path) {
                    error!("Failed to open config file: {e}");
                }
            }
        }
        _ => {}
    }
}

/// Show a generic error dialog for unexpected errors
fn show_generic_error_dialog(error_message: &str) {
    let message = format!(
        "An unexpected error occurred:\n\n{error_message}\n\n\
        Please check your configuration file."
    );

    MessageDialog::new()
        .set_level(MessageLevel::Error)
        .set_title("Anthology - Error")
        .set_description(&message)
        .set_buttons(MessageButtons::Ok)
        .show();
}

/// Log session events to the console
async fn log_session_events(engine: Arc<SessionEngine>) {
    let mut rx = engine.subscribe();

    loop {
        match rx.recv().await {
            Ok(event) => match &event {
                SessionEvent::SongSelected { song } => {
                    info!("Song selected: #{} {}", song.track_number, song.title);
                }
                SessionEvent::PlaybackChanged { state } => {
                    info!(
                        "Playback {} at {:.1}s / {:.1}s ({})",
                        if state.is_playing { "playing" } else { "paused" },
                        state.position,
                        state.duration,
                        state.mode.label()
                    );
                }
                SessionEvent::AnalysisChanged { phase, payload } => {
                    info!(
                        "Analysis {:?} ({} lyric lines)",
                        phase,
                        payload.as_ref().map_or(0, |p| p.lyrics.len())
                    );
                }
                SessionEvent::PositionChanged { .. }
                | SessionEvent::ActiveLineChanged { .. }
                | SessionEvent::ScrollToLine { .. } => {
                    // High-frequency; not logged
                }
            },
            Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                info!("Session event channel closed");
                break;
            }
            Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                info!("Missed {} session events", n);
            }
        }
    }
}

/// Check if file logging is enabled by reading the config file.
/// Returns `false` if config doesn't exist or can't be parsed.
fn check_file_logging_enabled() -> bool {
    #[derive(serde::Deserialize)]
    struct PartialConfig {
        #[serde(default)]
        logging: PartialLoggingConfig,
    }
    #[derive(serde::Deserialize, Default)]
    struct PartialLoggingConfig {
        #[serde(default)]
        enabled: bool,
    }

    let config_path = AnthologyConfig::config_path();
    let Ok(content) = std::fs::read_to_string(&config_path) else {
        return false;
    };

    toml::from_str::<PartialConfig>(&content)
        .map(|c| c.logging.enabled)
        .unwrap_or(false)
}

/// Initialize tracing with console output and optional file logging
fn init_tracing(file_logging_enabled: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,reqwest_retry=warn"));

    let fmt_layer = tracing_subscriber::fmt::layer();

    if file_logging_enabled {
        let log_path = anthology_core::paths::log_file_path();

        if let Some(parent) = log_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        match File::create(&log_path) {
            Ok(file) => {
                let file_layer = tracing_subscriber::fmt::layer()
                    .with_writer(Arc::new(file))
                    .with_ansi(false);

                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt_layer)
                    .with(file_layer)
                    .init();

                return;
            }
            Err(e) => {
                eprintln!("Failed to create log file at {}: {e}", log_path.display());
            }
        }
    }

    // Fallback: console only
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}
