// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod analyze;
pub mod article;
pub mod calibration;
pub mod cli;
pub mod config;
pub mod feedback;
pub mod preferences;
pub mod session;

// ---- Re-exports for stable public API ----
pub use analyze::ai_adapter;
pub use analyze::{combine, rate_article, ArticleScores, RawArticleAnalysis};
pub use calibration::{CalibrationConfig, CalibrationModel, PreferenceModels};
pub use feedback::{apply_feedback, Feedback};
pub use preferences::{CalibrationSample, ScoreInformation, UserPreferences};

/// Lower bound of every score in the system.
pub const MIN_SCORE: f64 = 0.0;
/// Upper bound of every score in the system.
pub const MAX_SCORE: f64 = 10.0;
/// Prediction of a calibration model that has no samples yet.
pub const DEFAULT_SCORE: f64 = 0.0;
