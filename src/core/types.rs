use serde::{Deserialize, Serialize};

/// One anchor rewritten away from the interstitial.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RewrittenLink {
    /// The interstitial address the anchor carried.
    pub original: String,
    /// The decoded destination it now points at.
    pub target: String,
    /// The anchor's visible text.
    pub text: String,
}

/// Result of a rewrite or capture pass, as emitted by the CLI.
#[derive(Debug, Serialize, Deserialize)]
pub struct RewriteReport {
    /// Where the document came from: a URL, a file path, or `stdin`.
    pub source: String,
    /// Anchors inspected, matching or not.
    pub anchors_scanned: usize,
    /// Anchors rewritten by the native pass.
    pub rewritten: Vec<RewrittenLink>,
    /// Redirect anchors the in-page engine left behind (live captures only;
    /// non-zero means the host page re-injected content mid-capture).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining: Option<u64>,
    pub timestamp: String,
}

impl RewriteReport {
    pub fn new(source: impl Into<String>, anchors_scanned: usize, rewritten: Vec<RewrittenLink>) -> Self {
        Self {
            source: source.into(),
            anchors_scanned,
            rewritten,
            remaining: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
