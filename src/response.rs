// src/response.rs
//! Parser for the generator's two-line reply contract.
//!
//! Grammar: the reply may contain, anywhere, at most one line starting with
//! `REASONING: ` and one starting with `POST: `; everything else is ignored.
//! Both lines are optional — a reply without a post line is a valid "no
//! usable output", not an error.

/// Line prefix carrying the model's reasoning.
pub const REASONING_PREFIX: &str = "REASONING:";
/// Line prefix carrying the post text itself.
pub const POST_PREFIX: &str = "POST:";

/// Parsed generator reply. Empty fields mean the line was absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DraftResponse {
    pub reasoning: Option<String>,
    pub post: Option<String>,
}

impl DraftResponse {
    /// Scan the raw reply for the two labeled lines. First occurrence wins.
    pub fn parse(raw: &str) -> Self {
        let mut out = Self::default();
        for line in raw.lines() {
            let line = line.trim_start();
            if out.reasoning.is_none() {
                if let Some(rest) = line.strip_prefix(REASONING_PREFIX) {
                    out.reasoning = Some(rest.trim().to_string());
                    continue;
                }
            }
            if out.post.is_none() {
                if let Some(rest) = line.strip_prefix(POST_PREFIX) {
                    out.post = Some(rest.trim().to_string());
                }
            }
        }
        out
    }

    /// The post text, if present and non-empty.
    pub fn post_text(&self) -> Option<&str> {
        self.post.as_deref().filter(|s| !s.is_empty())
    }

    /// The reasoning text, or empty when the line was absent.
    pub fn reasoning_text(&self) -> &str {
        self.reasoning.as_deref().unwrap_or("")
    }
}
