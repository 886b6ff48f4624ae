//! # Preference Store
//! The per-user document: interest scores per theme plus the two calibration
//! datasets (fluffiness, title descriptiveness).
//!
//! JSON shape:
//! {
//!   "interests": { "space": { "score": 8.0, "articles_analysed": 2 } },
//!   "fluffiness": [ { "machine_rating": 6.0, "user_rating": 3.5 } ],
//!   "title_descriptiveness": [ { "machine_rating": 9.0, "user_rating": 8.0 } ]
//! }
//!
//! Loading never fails: a missing, empty or malformed file yields the empty
//! document and a log line. An unreadable or malformed file is first renamed
//! to `<name>.corrupt-<n>` so a later save cannot overwrite it. Saving reports
//! every error to the caller.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};
use tracing::{debug, error, warn};

/// Running mean for one named quantity (usually a theme).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreInformation {
    pub score: f64,
    pub articles_analysed: u32,
}

impl ScoreInformation {
    pub fn new(score: f64, articles_analysed: u32) -> Self {
        Self {
            score,
            articles_analysed,
        }
    }

    /// Fold one more rating into the mean without keeping the history.
    pub fn fold(&mut self, rating: f64) {
        let n = f64::from(self.articles_analysed);
        self.score = (self.score * n + rating) / (n + 1.0);
        self.articles_analysed = self.articles_analysed.saturating_add(1);
    }
}

/// One observed (machine, user) pair. Never edited once stored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationSample {
    pub machine_rating: f64,
    pub user_rating: f64,
}

impl CalibrationSample {
    pub fn new(machine_rating: f64, user_rating: f64) -> Self {
        Self {
            machine_rating,
            user_rating,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserPreferences {
    #[serde(default)]
    pub interests: BTreeMap<String, ScoreInformation>,
    #[serde(default)]
    pub fluffiness: Vec<CalibrationSample>,
    #[serde(default)]
    pub title_descriptiveness: Vec<CalibrationSample>,
}

impl UserPreferences {
    /// Decode a preference document. Absent keys default to empty, unknown keys are ignored.
    pub fn from_json_str(s: &str) -> Result<Self> {
        serde_json::from_str(s).context("decoding user preferences")
    }

    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("encoding user preferences")
    }

    pub fn interest(&self, theme: &str) -> Option<&ScoreInformation> {
        self.interests.get(theme)
    }

    /// Fold a rating into an existing theme or start a new one at `(rating, 1)`.
    /// Returns `true` when the theme was new.
    pub fn record_theme_rating(&mut self, theme: &str, rating: f64) -> bool {
        match self.interests.get_mut(theme) {
            Some(info) => {
                info.fold(rating);
                false
            }
            None => {
                self.interests
                    .insert(theme.to_string(), ScoreInformation::new(rating, 1));
                true
            }
        }
    }

    /// Theme → score map rendered as JSON for the LLM prompt.
    pub fn format_for_llm(&self) -> String {
        let scores: BTreeMap<&str, f64> = self
            .interests
            .iter()
            .map(|(theme, info)| (theme.as_str(), info.score))
            .collect();
        serde_json::to_string(&scores).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Load preferences from `path`, substituting defaults on any problem.
pub fn load<P: AsRef<Path>>(path: P) -> UserPreferences {
    let path = path.as_ref();
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            error!(path = %path.display(), "preferences file not found, starting empty");
            return UserPreferences::default();
        }
        Err(e) => {
            error!(path = %path.display(), error = %e, "cannot read preferences, starting empty");
            set_aside(path);
            return UserPreferences::default();
        }
    };

    if content.trim().is_empty() {
        warn!(path = %path.display(), "preferences file is empty, starting empty");
        return UserPreferences::default();
    }

    match UserPreferences::from_json_str(&content) {
        Ok(prefs) => {
            debug!(
                path = %path.display(),
                interests = prefs.interests.len(),
                fluffiness_samples = prefs.fluffiness.len(),
                title_samples = prefs.title_descriptiveness.len(),
                "preferences loaded"
            );
            prefs
        }
        Err(e) => {
            error!(path = %path.display(), error = ?e, "malformed preferences, starting empty");
            set_aside(path);
            UserPreferences::default()
        }
    }
}

/// Move a file that could not be loaded to the first free `<name>.corrupt-<n>`.
fn set_aside(path: &Path) -> Option<PathBuf> {
    if !path.is_file() {
        return None;
    }
    let name = path.file_name()?.to_string_lossy().into_owned();
    let target = (1u32..)
        .map(|n| path.with_file_name(format!("{name}.corrupt-{n}")))
        .find(|p| !p.exists())?;
    match fs::rename(path, &target) {
        Ok(()) => {
            warn!(
                path = %path.display(),
                moved_to = %target.display(),
                "unloadable preferences kept aside"
            );
            Some(target)
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not move unloadable preferences aside");
            None
        }
    }
}

/// Write the whole document to `path` (temp file + rename).
pub fn save<P: AsRef<Path>>(path: P, prefs: &UserPreferences) -> Result<()> {
    let path = path.as_ref();
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .with_context(|| format!("creating directory {}", dir.display()))?;
    }

    let json = prefs.to_json_string()?;
    let tmp = path.with_extension("json.tmp");
    let mut f =
        fs::File::create(&tmp).with_context(|| format!("creating {}", tmp.display()))?;
    f.write_all(json.as_bytes())
        .with_context(|| format!("writing {}", tmp.display()))?;
    if let Err(e) = f.sync_all() {
        warn!(path = %tmp.display(), error = %e, "fsync of preferences failed");
    }
    fs::rename(&tmp, path).with_context(|| format!("replacing {}", path.display()))?;

    debug!(path = %path.display(), "preferences saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_keys_default_to_empty() {
        let p = UserPreferences::from_json_str(r#"{"interests": {"space": {"score": 7.0, "articles_analysed": 1}}}"#)
            .unwrap();
        assert_eq!(p.interests.len(), 1);
        assert!(p.fluffiness.is_empty());
        assert!(p.title_descriptiveness.is_empty());
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let p = UserPreferences::from_json_str(r#"{"version": 3, "fluffiness": []}"#).unwrap();
        assert_eq!(p, UserPreferences::default());
    }

    #[test]
    fn fold_matches_end_to_end_example() {
        let mut info = ScoreInformation::new(8.0, 2);
        info.fold(10.0);
        assert!((info.score - 26.0 / 3.0).abs() < 1e-9);
        assert_eq!(info.articles_analysed, 3);
    }

    #[test]
    fn record_theme_rating_inserts_then_folds() {
        let mut p = UserPreferences::default();
        assert!(p.record_theme_rating("rust", 6.0));
        assert!(!p.record_theme_rating("rust", 8.0));
        let info = p.interest("rust").unwrap();
        assert!((info.score - 7.0).abs() < 1e-9);
        assert_eq!(info.articles_analysed, 2);
    }

    #[test]
    fn llm_format_lists_scores_only() {
        let mut p = UserPreferences::default();
        p.interests
            .insert("sports".into(), ScoreInformation::new(9.0, 4));
        assert_eq!(p.format_for_llm(), r#"{"sports":9.0}"#);
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let p = load(dir.path().join("nope.json"));
        assert_eq!(p, UserPreferences::default());
    }
}
