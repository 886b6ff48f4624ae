//! Decoding of the LLM reply into a [`RawArticleAnalysis`].
//!
//! Models regularly wrap JSON in markdown fences despite being told not to,
//! so fences and stray backticks are stripped before decoding. Anything that
//! is still not JSON is an error; no partial record is built.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Parsed LLM judgement of one article. Each rating may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawArticleAnalysis {
    pub main_themes: Vec<String>,
    pub main_themes_alignment: Option<f64>,
    pub how_fluffy: Option<f64>,
    pub how_descriptive_title: Option<f64>,
}

#[derive(Deserialize)]
struct Wire {
    #[serde(default)]
    main_themes: Option<Vec<String>>,
    #[serde(default)]
    main_themes_alignment: Option<f64>,
    #[serde(default)]
    how_fluffy: Option<f64>,
    #[serde(default)]
    how_descriptive_title: Option<f64>,
}

impl RawArticleAnalysis {
    pub fn from_reply(reply: &str) -> Result<Self> {
        let cleaned = strip_formatting(reply);
        let wire: Wire = serde_json::from_str(cleaned)
            .with_context(|| format!("LLM reply is not valid analysis JSON: {}", preview(cleaned)))?;
        Ok(Self {
            main_themes: wire.main_themes.unwrap_or_default(),
            main_themes_alignment: wire.main_themes_alignment,
            how_fluffy: wire.how_fluffy,
            how_descriptive_title: wire.how_descriptive_title,
        })
    }
}

/// Remove markdown code fences / backticks around a reply. Each prefix and
/// suffix is tried once, in order.
pub fn strip_formatting(reply: &str) -> &str {
    let mut s = reply.trim();
    for prefix in ["```json", "```", "`"] {
        if let Some(rest) = s.strip_prefix(prefix) {
            s = rest;
        }
    }
    for suffix in ["```", "`"] {
        if let Some(rest) = s.strip_suffix(suffix) {
            s = rest;
        }
    }
    s.trim()
}

fn preview(s: &str) -> String {
    let mut out: String = s.chars().take(80).collect();
    if s.chars().count() > 80 {
        out.push('…');
    }
    out
}
