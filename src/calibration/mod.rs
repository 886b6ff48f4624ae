//! # Calibration models
//! Maps a raw machine rating to the rating this particular user would give.
//!
//! Capacity grows with the dataset: a small forest of shallow trees for a
//! handful of samples, deeper and larger forests once enough feedback exists.
//! The tier table and the random seed are plain configuration handed to
//! [`CalibrationModel::fit`].

pub mod forest;

use tracing::debug;

use crate::preferences::{CalibrationSample, UserPreferences};
use crate::DEFAULT_SCORE;
use forest::RandomForest;

pub const DEFAULT_SEED: u64 = 42;

/// Forest hyperparameters used once at least `min_samples` samples exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityTier {
    pub min_samples: usize,
    pub trees: usize,
    /// `None` grows trees until leaves are pure or too small.
    pub max_depth: Option<usize>,
    pub min_samples_leaf: usize,
}

impl CapacityTier {
    const fn new(min_samples: usize, trees: usize, max_depth: Option<usize>, min_samples_leaf: usize) -> Self {
        Self {
            min_samples,
            trees,
            max_depth,
            min_samples_leaf,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalibrationConfig {
    tiers: Vec<CapacityTier>,
    pub seed: u64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self::new(
            vec![
                CapacityTier::new(0, 10, Some(2), 1),
                CapacityTier::new(20, 30, Some(4), 2),
                CapacityTier::new(50, 50, Some(8), 3),
                CapacityTier::new(100, 150, None, 4),
                CapacityTier::new(300, 300, None, 5),
            ],
            DEFAULT_SEED,
        )
    }
}

impl CalibrationConfig {
    /// Tiers are kept sorted by `min_samples`.
    pub fn new(mut tiers: Vec<CapacityTier>, seed: u64) -> Self {
        tiers.sort_by_key(|t| t.min_samples);
        Self { tiers, seed }
    }

    pub fn tiers(&self) -> &[CapacityTier] {
        &self.tiers
    }

    /// Tier with the largest key `<= n`; the smallest tier when none qualifies.
    pub fn tier_for(&self, n: usize) -> CapacityTier {
        self.tiers
            .iter()
            .rev()
            .find(|t| t.min_samples <= n)
            .or_else(|| self.tiers.first())
            .copied()
            .unwrap_or(CapacityTier::new(0, 10, Some(2), 1))
    }
}

#[derive(Debug, Clone)]
pub enum CalibrationModel {
    /// No samples yet: every prediction is `DEFAULT_SCORE`.
    Untrained,
    Forest {
        forest: RandomForest,
        tier: CapacityTier,
        samples: usize,
    },
}

impl CalibrationModel {
    pub fn fit(samples: &[CalibrationSample], cfg: &CalibrationConfig) -> Self {
        if samples.is_empty() {
            debug!("no calibration samples, using untrained model");
            return CalibrationModel::Untrained;
        }

        let x: Vec<f64> = samples.iter().map(|s| s.machine_rating).collect();
        let y: Vec<f64> = samples.iter().map(|s| s.user_rating).collect();
        let tier = cfg.tier_for(samples.len());
        debug!(
            samples = samples.len(),
            tier = tier.min_samples,
            trees = tier.trees,
            max_depth = ?tier.max_depth,
            min_samples_leaf = tier.min_samples_leaf,
            "fitting calibration forest"
        );

        CalibrationModel::Forest {
            forest: RandomForest::fit(&x, &y, &tier, cfg.seed),
            tier,
            samples: samples.len(),
        }
    }

    pub fn predict(&self, machine_rating: f64) -> f64 {
        match self {
            CalibrationModel::Untrained => DEFAULT_SCORE,
            CalibrationModel::Forest { forest, .. } => forest.predict(machine_rating),
        }
    }

    pub fn tier(&self) -> Option<CapacityTier> {
        match self {
            CalibrationModel::Untrained => None,
            CalibrationModel::Forest { tier, .. } => Some(*tier),
        }
    }

    pub fn sample_count(&self) -> usize {
        match self {
            CalibrationModel::Untrained => 0,
            CalibrationModel::Forest { samples, .. } => *samples,
        }
    }
}

/// The two per-user calibration models, rebuilt once per session.
#[derive(Debug, Clone)]
pub struct PreferenceModels {
    pub fluffiness: CalibrationModel,
    pub title_descriptiveness: CalibrationModel,
}

impl PreferenceModels {
    pub fn fit(prefs: &UserPreferences, cfg: &CalibrationConfig) -> Self {
        Self {
            fluffiness: CalibrationModel::fit(&prefs.fluffiness, cfg),
            title_descriptiveness: CalibrationModel::fit(&prefs.title_descriptiveness, cfg),
        }
    }
}
