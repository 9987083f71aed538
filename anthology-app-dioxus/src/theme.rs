//! Stylesheet loading.
//!
//! The embedded stylesheet is used unless the user placed a `theme.css` next to
//! their config file, in which case that file replaces it wholesale.

use std::fs;
use std::io::ErrorKind;
use tracing::{info, warn};

/// Embedded default CSS (compiled into the binary)
pub const DEFAULT_CSS: &str = include_str!("../assets/theme.css");

/// Load the user's theme, falling back to the embedded stylesheet
#[must_use]
pub fn load_theme_css() -> String {
    let theme_path = anthology_core::paths::theme_path();

    match fs::read_to_string(&theme_path) {
        Ok(css) => {
            info!("Using theme from {}", theme_path.display());
            css
        }
        Err(e) if e.kind() == ErrorKind::NotFound => DEFAULT_CSS.to_string(),
        Err(e) => {
            warn!("Failed to read theme file, using embedded CSS: {}", e);
            DEFAULT_CSS.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_css_styles_lyric_lines() {
        assert!(DEFAULT_CSS.contains(".lyric-line"));
        assert!(DEFAULT_CSS.contains(".transport"));
    }
}
