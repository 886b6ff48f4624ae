// src/session.rs
//! One rating session: preferences loaded once, models fitted once, then any
//! number of articles rated and feedback recorded. Failures while analysing a
//! single article never touch the preference store.

use anyhow::{anyhow, Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::analyze::ai_adapter::{build_client_from_config, build_prompt, DynAiClient};
use crate::analyze::{rate_article, ArticleScores, RawArticleAnalysis};
use crate::article::{ArticleMetadata, ArticleSource, HttpArticleSource};
use crate::calibration::{CalibrationConfig, PreferenceModels};
use crate::config::AppConfig;
use crate::feedback::{apply_feedback, Feedback, FeedbackSummary};
use crate::preferences::{self, UserPreferences};

/// An article together with the LLM's raw judgement of it.
#[derive(Debug, Clone)]
pub struct AnalysedArticle {
    pub url: String,
    pub metadata: ArticleMetadata,
    pub analysis: RawArticleAnalysis,
}

pub struct RatingSession {
    preferences_path: PathBuf,
    preferences: UserPreferences,
    models: PreferenceModels,
    ai: DynAiClient,
    articles: Arc<dyn ArticleSource>,
}

impl RatingSession {
    /// Build a session from app config with the real HTTP collaborators.
    pub fn from_config(cfg: &AppConfig) -> Result<Self> {
        let ai = build_client_from_config(&cfg.ai)?;
        let articles = Arc::new(HttpArticleSource::new(Duration::from_secs(
            cfg.fetch_timeout_secs,
        ))?);
        Ok(Self::open(
            cfg.preferences_path.clone(),
            &CalibrationConfig::default(),
            ai,
            articles,
        ))
    }

    /// Load preferences (fail-soft) and fit both calibration models.
    pub fn open(
        preferences_path: PathBuf,
        calibration: &CalibrationConfig,
        ai: DynAiClient,
        articles: Arc<dyn ArticleSource>,
    ) -> Self {
        let preferences = preferences::load(&preferences_path);
        let models = PreferenceModels::fit(&preferences, calibration);
        info!(
            path = %preferences_path.display(),
            interests = preferences.interests.len(),
            fluffiness_tier = ?models.fluffiness.tier().map(|t| t.min_samples),
            title_tier = ?models.title_descriptiveness.tier().map(|t| t.min_samples),
            ai = ai.provider_name(),
            source = articles.name(),
            "rating session opened"
        );
        Self {
            preferences_path,
            preferences,
            models,
            ai,
            articles,
        }
    }

    pub fn preferences(&self) -> &UserPreferences {
        &self.preferences
    }

    pub fn models(&self) -> &PreferenceModels {
        &self.models
    }

    /// Fetch → prompt → LLM → decode.
    pub async fn analyse_url(&self, url: &str) -> Result<AnalysedArticle> {
        let metadata = self
            .articles
            .fetch_and_extract(url)
            .await?
            .ok_or_else(|| anyhow!("could not extract an article from {url}"))?;

        let prompt = build_prompt(&metadata, &self.preferences);
        let reply = self
            .ai
            .analyze(&prompt)
            .await
            .context("LLM analysis failed")?;
        let analysis = RawArticleAnalysis::from_reply(&reply)?;

        info!(
            url,
            host = %metadata.hostname,
            themes = ?analysis.main_themes,
            alignment = ?analysis.main_themes_alignment,
            fluffy = ?analysis.how_fluffy,
            title = ?analysis.how_descriptive_title,
            "article analysed"
        );
        Ok(AnalysedArticle {
            url: url.to_string(),
            metadata,
            analysis,
        })
    }

    pub fn rate(&self, article: &AnalysedArticle) -> Result<ArticleScores> {
        rate_article(&article.analysis, &self.models)
    }

    /// Mutates the in-memory store only; call [`save`](Self::save) to persist.
    pub fn record_feedback(&mut self, article: &AnalysedArticle, feedback: &Feedback) -> FeedbackSummary {
        apply_feedback(&mut self.preferences, &article.analysis, feedback)
    }

    pub fn save(&self) -> Result<()> {
        preferences::save(&self.preferences_path, &self.preferences).map_err(|e| {
            warn!(error = ?e, "saving preferences failed");
            e
        })
    }
}
