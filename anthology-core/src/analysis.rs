//! Analysis payload produced per song by the analysis provider.

use serde::{Deserialize, Serialize};

/// One lyric line with its translation and an optional note
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LyricLine {
    pub original: String,
    pub translation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation: Option<String>,
}

impl LyricLine {
    pub fn new(original: impl Into<String>, translation: impl Into<String>) -> Self {
        Self {
            original: original.into(),
            translation: translation.into(),
            annotation: None,
        }
    }

    #[must_use]
    pub fn with_annotation(mut self, annotation: impl Into<String>) -> Self {
        self.annotation = Some(annotation.into());
        self
    }

    /// Annotation text, treating an empty string the same as no annotation
    #[must_use]
    pub fn note(&self) -> Option<&str> {
        self.annotation
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyItem {
    pub word: String,
    pub definition: String,
    pub context_in_song: String,
}

/// A link from the analysed song to another song
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub song_title: String,
    pub album: String,
    pub explanation: String,
}

/// Complete analysis for one song.
///
/// A payload is replaced wholesale when the selected song changes, never merged.
/// `error` is set only on degraded (fallback) payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisPayload {
    pub background: String,
    pub mood: String,
    pub lyrics: Vec<LyricLine>,
    pub vocabulary: Vec<VocabularyItem>,
    pub connections: Vec<Connection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AnalysisPayload {
    /// Build the degraded payload shown when the provider call fails.
    ///
    /// It always carries a non-empty error marker and a few placeholder lines so the
    /// lyric view is never blank.
    #[must_use]
    pub fn fallback(reason: &str) -> Self {
        let reason = reason.trim();
        let error = if reason.is_empty() {
            "Analysis unavailable".to_string()
        } else {
            reason.to_string()
        };

        Self {
            background: "The analysis service is busy right now, so no in-depth reading \
                could be generated for this song. Playback of a local file and browsing \
                the catalog keep working as usual."
                .to_string(),
            mood: "Offline Mode".to_string(),
            lyrics: vec![
                LyricLine::new("Analysis Unavailable", "解析服务暂时繁忙")
                    .with_annotation("Please try again later"),
                LyricLine::new("Please try again later", "请稍后再试"),
                LyricLine::new("Music plays on...", "音乐继续..."),
            ],
            vocabulary: Vec::new(),
            connections: Vec::new(),
            error: Some(error),
        }
    }

    /// Whether this is a fallback payload
    #[must_use]
    pub const fn is_degraded(&self) -> bool {
        self.error.is_some()
    }

    /// Parse a payload from provider JSON.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::MalformedAnalysis`](crate::CoreError::MalformedAnalysis) when
    /// the text is not valid JSON or does not match the payload schema.
    pub fn from_json(text: &str) -> crate::Result<Self> {
        serde_json::from_str(text).map_err(|e| crate::CoreError::MalformedAnalysis {
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "background": "Written after a breakup",
        "mood": "Wistful",
        "lyrics": [
            { "original": "I was supposed to be sent away", "translation": "我本该被送走", "annotation": "Opening line" },
            { "original": "But they forgot to come and get me", "translation": "但他们忘了来接我" }
        ],
        "vocabulary": [
            { "word": "forgot", "definition": "忘记", "contextInSong": "Nobody came" }
        ],
        "connections": [
            { "songTitle": "Clara Bow", "album": "TTPD", "explanation": "Same era" }
        ]
    }"#;

    #[test]
    fn test_from_json_valid_payload() {
        let payload = AnalysisPayload::from_json(SAMPLE).unwrap();
        assert_eq!(payload.lyrics.len(), 2);
        assert_eq!(payload.lyrics[0].note(), Some("Opening line"));
        assert_eq!(payload.lyrics[1].annotation, None);
        assert_eq!(payload.vocabulary[0].context_in_song, "Nobody came");
        assert_eq!(payload.connections[0].song_title, "Clara Bow");
        assert!(!payload.is_degraded());
    }

    #[test]
    fn test_from_json_missing_required_field() {
        let result = AnalysisPayload::from_json(r#"{ "background": "x", "mood": "y" }"#);
        assert!(matches!(
            result,
            Err(crate::CoreError::MalformedAnalysis { .. })
        ));
    }

    #[test]
    fn test_from_json_not_json() {
        assert!(AnalysisPayload::from_json("").is_err());
        assert!(AnalysisPayload::from_json("not json").is_err());
    }

    #[test]
    fn test_fallback_has_error_and_lines() {
        let payload = AnalysisPayload::fallback("Quota Exceeded");
        assert!(payload.is_degraded());
        assert_eq!(payload.error.as_deref(), Some("Quota Exceeded"));
        assert!(!payload.lyrics.is_empty());
        assert!(payload.vocabulary.is_empty());
        assert!(payload.connections.is_empty());
    }

    #[test]
    fn test_fallback_blank_reason_still_marked() {
        let payload = AnalysisPayload::fallback("   ");
        assert!(payload.error.is_some_and(|e| !e.is_empty()));
    }

    #[test]
    fn test_serialize_uses_camel_case() {
        let payload = AnalysisPayload::from_json(SAMPLE).unwrap();
        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains("contextInSong"));
        assert!(json.contains("songTitle"));
        assert!(!json.contains("\"error\""));
    }

    #[test]
    fn test_empty_annotation_is_no_note() {
        let line = LyricLine::new("a", "b").with_annotation("  ");
        assert_eq!(line.note(), None);
    }
}
