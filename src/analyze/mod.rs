// src/analyze/mod.rs
//! Rating pipeline: LLM analysis in, personalized scores out.
//!
//! Order:
//! 1) theme alignment is taken from the LLM as-is (it already saw the user's interests)
//! 2) fluffiness / title descriptiveness go through the user's calibration models
//! 3) whatever sub-scores exist are merged by `scoring::combine`

pub mod ai_adapter;
pub mod reply;
pub mod scoring;

use anyhow::{bail, Result};
use serde::Serialize;
use tracing::debug;

use crate::calibration::PreferenceModels;

// Re-export convenient types.
pub use crate::analyze::reply::RawArticleAnalysis;
pub use crate::analyze::scoring::combine;

/// Personalized scores for one article.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArticleScores {
    pub main_themes_alignment: Option<f64>,
    pub fluffiness_alignment: Option<f64>,
    pub title_descriptiveness: Option<f64>,
    pub overall: f64,
}

impl ArticleScores {
    fn present(&self) -> Vec<f64> {
        [
            self.main_themes_alignment,
            self.fluffiness_alignment,
            self.title_descriptiveness,
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

pub fn rate_article(analysis: &RawArticleAnalysis, models: &PreferenceModels) -> Result<ArticleScores> {
    let fluffiness_alignment = analysis.how_fluffy.map(|x| models.fluffiness.predict(x));
    let title_descriptiveness = analysis
        .how_descriptive_title
        .map(|x| models.title_descriptiveness.predict(x));

    let mut scores = ArticleScores {
        main_themes_alignment: analysis.main_themes_alignment,
        fluffiness_alignment,
        title_descriptiveness,
        overall: 0.0,
    };

    let present = scores.present();
    if present.is_empty() {
        bail!("analysis has no alignment, fluffiness or title rating; cannot compute an overall score");
    }
    scores.overall = combine(&present)?;

    debug!(
        themes = ?scores.main_themes_alignment,
        fluffiness = ?scores.fluffiness_alignment,
        title = ?scores.title_descriptiveness,
        overall = scores.overall,
        "article rated"
    );
    Ok(scores)
}
