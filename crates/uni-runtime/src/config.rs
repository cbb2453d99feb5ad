//! Runtime configuration.

use uni_morph::MorphOptions;

/// CSRF header configuration. When present, the token must be non-empty
/// or initialization fails.
#[derive(Debug, Clone)]
pub struct CsrfConfig {
    /// Header name (e.g. "X-CSRFToken").
    pub header_name: String,
    /// Token value, typically read from a cookie by the embedder.
    pub token: String,
}

/// Everything the entry call needs: message endpoint, CSRF handling and
/// morpher selection.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Base URL of the server message endpoint; the component name is
    /// appended per request.
    pub endpoint: String,
    /// CSRF header, when the server requires one.
    pub csrf: Option<CsrfConfig>,
    /// Morpher selection and options.
    pub morpher: MorphOptions,
    /// Debounce applied when a binding asks for the default (-1).
    pub default_debounce_ms: u64,
    /// Fire a paused poll immediately when the page becomes visible
    /// again, instead of waiting out the remaining interval.
    pub poll_fire_on_resume: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            endpoint: "/message".to_string(),
            csrf: None,
            morpher: MorphOptions::default(),
            default_debounce_ms: 250,
            poll_fire_on_resume: true,
        }
    }
}
