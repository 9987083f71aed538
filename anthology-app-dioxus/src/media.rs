//! Local audio playback through a hidden `<audio>` element in the webview.
//!
//! The user picks a file with a hidden file input; the page turns it into an object
//! URL and tells Rust. Rust binds a [`WebAudioElement`] to the engine, and every
//! transport call on it becomes a [`MediaCommand`] executed in the page, in order.
//! Element notifications travel back as [`MediaEvent`]s, tagged with the binding
//! generation the page was attached under.

use anthology_core::{MediaEvent, MediaResource, MediaTicket, SessionEngine};
use dioxus::prelude::*;
use serde::Deserialize;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

const LOG_TARGET: &str = "anthology::media";

/// Element ids shared with the transport bar markup
pub const AUDIO_ELEMENT_ID: &str = "audio-element";
pub const AUDIO_INPUT_ID: &str = "audio-upload";

/// Operations on the page's audio element
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MediaCommand {
    /// Load the most recently picked file under the given binding generation
    Attach(u64),
    Play,
    Pause,
    SeekTo(f64),
    /// Stop and revoke the current object URL
    Release,
}

impl MediaCommand {
    fn script(self) -> String {
        let body = match self {
            Self::Attach(generation) => format!(
                "const url = window.__anthologyPendingUrl;\n\
                window.__anthologyPendingUrl = null;\n\
                window.__anthologyGeneration = {generation};\n\
                if (url) {{ audio.src = url; audio.load(); }}"
            ),
            Self::Play => "audio.play().catch((e) => console.warn('play failed', e));".to_string(),
            Self::Pause => "audio.pause();".to_string(),
            Self::SeekTo(position) => format!("audio.currentTime = {position};"),
            Self::Release => "window.__anthologyGeneration = null;\n\
                audio.pause();\n\
                if (audio.src && audio.src.startsWith('blob:')) URL.revokeObjectURL(audio.src);\n\
                audio.removeAttribute('src');\n\
                audio.load();"
                .to_string(),
        };
        format!(
            "const audio = document.getElementById('{AUDIO_ELEMENT_ID}');\n\
            if (audio) {{\n{body}\n}}"
        )
    }
}

/// Last position and duration the page reported for the element
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct ElementClock {
    pub position: f64,
    pub duration: Option<f64>,
}

impl ElementClock {
    fn observe(&mut self, message: &PageMessage) {
        match message {
            PageMessage::Metadata { duration } => self.duration = Some(*duration),
            PageMessage::Time { position } => self.position = *position,
            PageMessage::Ended => self.position = 0.0,
            PageMessage::Selected { .. } | PageMessage::Ready => {}
        }
    }
}

/// Media resource backed by the webview's audio element
pub struct WebAudioElement {
    commands: mpsc::UnboundedSender<MediaCommand>,
    clock: Arc<Mutex<ElementClock>>,
}

impl WebAudioElement {
    #[must_use]
    pub const fn new(
        commands: mpsc::UnboundedSender<MediaCommand>,
        clock: Arc<Mutex<ElementClock>>,
    ) -> Self {
        Self { commands, clock }
    }

    fn clock(&self) -> ElementClock {
        self.clock.lock().map(|clock| *clock).unwrap_or_default()
    }

    fn send(&self, command: MediaCommand) {
        if self.commands.send(command).is_err() {
            warn!(target: LOG_TARGET, "Media command channel closed, dropping {:?}", command);
        }
    }
}

impl MediaResource for WebAudioElement {
    fn play(&mut self) {
        self.send(MediaCommand::Play);
    }

    fn pause(&mut self) {
        self.send(MediaCommand::Pause);
    }

    fn seek_to(&mut self, position: f64) {
        if let Ok(mut clock) = self.clock.lock() {
            clock.position = position;
        }
        self.send(MediaCommand::SeekTo(position));
    }

    fn current_position(&self) -> f64 {
        self.clock().position
    }

    fn duration(&self) -> Option<f64> {
        self.clock().duration
    }

    fn release(self: Box<Self>) {
        self.send(MediaCommand::Release);
    }
}

/// A page message with the binding generation active when it was posted
#[derive(Debug, Deserialize, PartialEq)]
struct PageEnvelope {
    #[serde(default)]
    generation: Option<u64>,
    #[serde(flatten)]
    message: PageMessage,
}

/// Messages posted by the page script
#[derive(Debug, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum PageMessage {
    Selected { name: String },
    Ready,
    Metadata { duration: f64 },
    Time { position: f64 },
    Ended,
}

impl PageMessage {
    const fn media_event(&self) -> Option<MediaEvent> {
        match self {
            Self::Selected { .. } => None,
            Self::Ready => Some(MediaEvent::Ready),
            Self::Metadata { duration } => Some(MediaEvent::MetadataLoaded {
                duration: *duration,
            }),
            Self::Time { position } => Some(MediaEvent::PositionAdvanced {
                position: *position,
            }),
            Self::Ended => Some(MediaEvent::Ended),
        }
    }
}

/// Installs listeners on the file input and audio element, waiting for both to mount
const LISTEN_JS: &str = r"
const waitFor = async (id) => {
    let el = document.getElementById(id);
    while (!el) {
        await new Promise((resolve) => requestAnimationFrame(resolve));
        el = document.getElementById(id);
    }
    return el;
};

const input = await waitFor('audio-upload');
const audio = await waitFor('audio-element');
const post = (message) =>
    dioxus.send({ ...message, generation: window.__anthologyGeneration ?? null });

input.addEventListener('change', () => {
    const file = input.files && input.files[0];
    if (!file) return;
    if (window.__anthologyPendingUrl) URL.revokeObjectURL(window.__anthologyPendingUrl);
    window.__anthologyPendingUrl = URL.createObjectURL(file);
    input.value = '';
    post({ kind: 'selected', name: file.name });
});

audio.addEventListener('canplay', () => post({ kind: 'ready' }));
audio.addEventListener('loadedmetadata', () => {
    if (Number.isFinite(audio.duration)) {
        post({ kind: 'metadata', duration: audio.duration });
    }
});
audio.addEventListener('timeupdate', () => {
    if (audio.src && Number.isFinite(audio.currentTime)) {
        post({ kind: 'time', position: audio.currentTime });
    }
});
audio.addEventListener('ended', () => post({ kind: 'ended' }));

await new Promise(() => {});
";

/// Hook that connects the page's audio element to the engine
pub fn use_local_media(engine: Arc<SessionEngine>) {
    let commands = use_hook(|| {
        let (tx, rx) = mpsc::unbounded_channel();
        spawn(run_commands(rx));
        tx
    });

    use_future(move || {
        let engine = engine.clone();
        let commands = commands.clone();
        async move { listen(engine, commands).await }
    });
}

/// Execute commands one at a time so release always precedes the next attach
async fn run_commands(mut rx: mpsc::UnboundedReceiver<MediaCommand>) {
    while let Some(command) = rx.recv().await {
        debug!(target: LOG_TARGET, "Media command: {:?}", command);
        if let Err(e) = document::eval(&command.script()).await {
            warn!(target: LOG_TARGET, "Media command {:?} failed: {}", command, e);
        }
    }
}

/// The element binding the engine currently holds
struct Attached {
    ticket: MediaTicket,
    clock: Arc<Mutex<ElementClock>>,
}

impl Attached {
    /// Whether a message was posted while this binding was attached in the page
    fn owns(&self, envelope: &PageEnvelope) -> bool {
        envelope.generation == Some(self.ticket.generation())
    }
}

async fn listen(engine: Arc<SessionEngine>, commands: mpsc::UnboundedSender<MediaCommand>) {
    let mut page = document::eval(LISTEN_JS);
    let mut attached: Option<Attached> = None;

    loop {
        let value = match page.recv::<serde_json::Value>().await {
            Ok(value) => value,
            Err(e) => {
                warn!(target: LOG_TARGET, "Audio listener stopped: {}", e);
                break;
            }
        };

        let envelope = match serde_json::from_value::<PageEnvelope>(value) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(target: LOG_TARGET, "Ignoring malformed media message: {}", e);
                continue;
            }
        };

        if let PageMessage::Selected { name } = &envelope.message {
            info!(target: LOG_TARGET, "Playing local file: {}", name);
            let clock = Arc::new(Mutex::new(ElementClock::default()));
            let element = WebAudioElement::new(commands.clone(), Arc::clone(&clock));
            let ticket = engine.bind_media(Box::new(element)).await;
            if commands.send(MediaCommand::Attach(ticket.generation())).is_err() {
                warn!(target: LOG_TARGET, "Media command channel closed");
            }
            attached = Some(Attached { ticket, clock });
            continue;
        }

        let Some(current) = attached.as_ref().filter(|a| a.owns(&envelope)) else {
            debug!(
                target: LOG_TARGET,
                "Dropping {:?} from a detached audio source", envelope.message
            );
            continue;
        };

        if let Ok(mut clock) = current.clock.lock() {
            clock.observe(&envelope.message);
        }
        if let Some(event) = envelope.message.media_event() {
            engine.on_media_event(current.ticket, event).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element() -> (
        WebAudioElement,
        mpsc::UnboundedReceiver<MediaCommand>,
        Arc<Mutex<ElementClock>>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let clock = Arc::new(Mutex::new(ElementClock::default()));
        (WebAudioElement::new(tx, Arc::clone(&clock)), rx, clock)
    }

    #[test]
    fn test_page_messages_parse() {
        let selected: PageEnvelope = serde_json::from_str(
            r#"{ "kind": "selected", "name": "fortnight.mp3", "generation": null }"#,
        )
        .unwrap();
        assert_eq!(selected.generation, None);
        assert_eq!(
            selected.message,
            PageMessage::Selected {
                name: "fortnight.mp3".to_string()
            }
        );
        assert_eq!(selected.message.media_event(), None);

        let time: PageEnvelope =
            serde_json::from_str(r#"{ "kind": "time", "position": 12.5, "generation": 3 }"#)
                .unwrap();
        assert_eq!(time.generation, Some(3));
        assert_eq!(
            time.message.media_event(),
            Some(MediaEvent::PositionAdvanced { position: 12.5 })
        );

        let ended: PageEnvelope = serde_json::from_str(r#"{ "kind": "ended" }"#).unwrap();
        assert_eq!(ended.generation, None);
        assert_eq!(ended.message.media_event(), Some(MediaEvent::Ended));
    }

    #[test]
    fn test_release_is_one_command() {
        let (element, mut rx, _clock) = element();
        let element: Box<dyn MediaResource> = Box::new(element);
        element.release();

        assert_eq!(rx.try_recv().ok(), Some(MediaCommand::Release));
        // The sender was dropped with the element
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_transport_commands() {
        let (mut element, mut rx, _clock) = element();
        element.play();
        element.seek_to(30.0);
        element.pause();

        assert_eq!(rx.try_recv().ok(), Some(MediaCommand::Play));
        assert_eq!(rx.try_recv().ok(), Some(MediaCommand::SeekTo(30.0)));
        assert_eq!(rx.try_recv().ok(), Some(MediaCommand::Pause));
        assert!((element.current_position() - 30.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_element_reports_page_clock() {
        let (element, _rx, clock) = element();
        assert_eq!(element.duration(), None);

        {
            let mut clock = clock.lock().unwrap();
            clock.observe(&PageMessage::Metadata { duration: 228.0 });
            clock.observe(&PageMessage::Time { position: 61.0 });
        }
        assert_eq!(element.duration(), Some(228.0));
        assert!((element.current_position() - 61.0).abs() < f64::EPSILON);

        clock.lock().unwrap().observe(&PageMessage::Ended);
        assert_eq!(element.current_position(), 0.0);
    }

    #[tokio::test]
    async fn test_attached_binding_owns_only_its_generation() {
        let engine = SessionEngine::new(
            Arc::new(anthology_core::UnavailableProvider::new("offline")),
            None,
            anthology_core::EngineSettings::default(),
        );
        let (first, _first_rx, _) = element();
        let (second, _second_rx, clock) = element();

        let stale = engine.bind_media(Box::new(first)).await;
        let ticket = engine.bind_media(Box::new(second)).await;
        let attached = Attached { ticket, clock };

        let envelope = |generation, message| PageEnvelope {
            generation,
            message,
        };
        assert!(!attached.owns(&envelope(Some(stale.generation()), PageMessage::Ended)));
        assert!(attached.owns(&envelope(Some(ticket.generation()), PageMessage::Ended)));
        assert!(!attached.owns(&envelope(None, PageMessage::Ready)));
    }

    #[test]
    fn test_scripts_target_audio_element() {
        assert!(MediaCommand::SeekTo(4.5)
            .script()
            .contains("audio.currentTime = 4.5;"));
        assert!(MediaCommand::Release.script().contains("URL.revokeObjectURL"));
        assert!(MediaCommand::Release
            .script()
            .contains("window.__anthologyGeneration = null;"));
        let attach = MediaCommand::Attach(7).script();
        assert!(attach.contains("getElementById('audio-element')"));
        assert!(attach.contains("window.__anthologyGeneration = 7;"));
        assert!(LISTEN_JS.contains(AUDIO_INPUT_ID));
    }
}
