//! # Preference updates from user feedback
//! Folds one article's feedback into the store: theme ratings update the
//! running interest means, and the fluffiness / title ratings become new
//! calibration samples paired with the machine ratings the LLM produced.
//!
//! Models are not refitted here; new samples take effect at the next load.

use tracing::{debug, info};

use crate::analyze::RawArticleAnalysis;
use crate::preferences::{CalibrationSample, UserPreferences};

/// The user's own 0–10 judgements for one article. Inputs are validated by the caller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Feedback {
    pub theme_ratings: Vec<(String, f64)>,
    pub fluffiness: Option<f64>,
    pub title_descriptiveness: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedbackSummary {
    pub themes_updated: usize,
    pub themes_added: usize,
    pub fluffiness_samples: usize,
    pub title_samples: usize,
}

pub fn apply_feedback(
    prefs: &mut UserPreferences,
    analysis: &RawArticleAnalysis,
    feedback: &Feedback,
) -> FeedbackSummary {
    let mut summary = FeedbackSummary::default();

    for (theme, rating) in &feedback.theme_ratings {
        if prefs.record_theme_rating(theme, *rating) {
            summary.themes_added += 1;
        } else {
            summary.themes_updated += 1;
        }
    }

    // A sample needs both halves of the pair.
    if let (Some(machine), Some(user)) = (analysis.how_fluffy, feedback.fluffiness) {
        prefs.fluffiness.push(CalibrationSample::new(machine, user));
        summary.fluffiness_samples += 1;
    } else if feedback.fluffiness.is_some() {
        debug!("fluffiness feedback without machine rating, sample skipped");
    }

    if let (Some(machine), Some(user)) = (analysis.how_descriptive_title, feedback.title_descriptiveness) {
        prefs
            .title_descriptiveness
            .push(CalibrationSample::new(machine, user));
        summary.title_samples += 1;
    } else if feedback.title_descriptiveness.is_some() {
        debug!("title feedback without machine rating, sample skipped");
    }

    info!(
        themes_updated = summary.themes_updated,
        themes_added = summary.themes_added,
        fluffiness_samples = summary.fluffiness_samples,
        title_samples = summary.title_samples,
        "feedback recorded"
    );
    summary
}
