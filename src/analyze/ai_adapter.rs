//! AI adapter: provider abstraction + file cache + daily limit.
//!
//! The LLM reads the article and the user's interest map and answers with a
//! JSON object holding the main themes and three 0–10 ratings. This module
//! only moves text; decoding lives in `analyze::reply`.

use std::fs;
use std::future::Future;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::article::ArticleMetadata;
use crate::config::ai::AiConfig;
use crate::preferences::UserPreferences;

pub const SYSTEM_INSTRUCTION: &str = r#"You are a model tasked with analyzing articles and rating certain qualities objectively. You will receive:
- The article title
- The article text
- A dictionary of user interests as theme-score pairs (scores range from 0 = not interested to 10 = main interest)
Your job is to:
1. Rate how "fluffy" the article text is on a scale from 0 to 10:
- 0 = very raw, factual, concise, informative, only facts are presented (like a scientific paper or straightforward report)
- 5 = some filler or vague language, but contains substantial information
- 10 = extremely fluffy, verbose, filled with filler or vague language, where the reader gains little meaningful information despite article length
- Consider the density of meaningful, concrete information versus vague, filler, or redundant content.
2. Rate how well the title describes the article content on a scale from 0 to 10:
- 0 = very clickbait, misleading, or unrelated to the article
- 10 = fully descriptive, accurately reflects the article content
3. Rate how well the article's themes align with the user's interests on a scale from 0 to 10:
- Infer the overall themes even if they are not named explicitly, and match them to the user's interests directly or by close semantic relation.
- 0 = the content is unrelated or uninteresting given the user's interests; 10 = it perfectly matches the user's main interests.
- The alignment must be independent of fluffiness and title descriptiveness.
- If the article mainly covers themes the user rates low, the score must be low even if the topic is important. Ambiguous or neutral content scores around 5.
4. Extract 3 to 7 main themes: very short (1-2 words), general, in English (translate if necessary), like tags.

Respond only with JSON in plain text, without markdown or code fences, in this format:
{"main_themes": ["theme1", "theme2"], "main_themes_alignment": float, "how_fluffy": float, "how_descriptive_title": float}
"#;

/// Prompt body: article metadata followed by the user's interest map.
pub fn build_prompt(article: &ArticleMetadata, prefs: &UserPreferences) -> String {
    format!("{}\n{}", article.format_for_llm(), prefs.format_for_llm())
}

// ------------------------------------------------------------
// Public surface
// ------------------------------------------------------------

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Trait object used by the session and tests.
pub trait AiClient: Send + Sync {
    /// Send a prompt and return the raw reply text.
    fn analyze<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<String>>;
    /// Provider name for diagnostics.
    fn provider_name(&self) -> &'static str;
}

pub type DynAiClient = Arc<dyn AiClient>;

/// Factory: build a client according to config and environment variables.
///
/// * If `AI_TEST_MODE=mock`, returns the mock client (no network).
/// * Else if `config.enabled == false`, returns a disabled client.
/// * Else builds the real provider wrapped with caching + daily limit.
pub fn build_client_from_config(config: &AiConfig) -> Result<DynAiClient> {
    if std::env::var("AI_TEST_MODE")
        .map(|v| v == "mock")
        .unwrap_or(false)
    {
        info!("AI_TEST_MODE=mock, using mock LLM provider");
        return Ok(Arc::new(CachingClient::new(
            MockProvider::neutral(),
            config.cache_dir.clone(),
            config.daily_limit,
        )));
    }

    if !config.enabled {
        return Ok(Arc::new(DisabledClient));
    }

    match config.provider.as_str() {
        "openai" => {
            let provider = OpenAiProvider::new(config)?;
            Ok(Arc::new(CachingClient::new(
                provider,
                config.cache_dir.clone(),
                config.daily_limit,
            )))
        }
        "mock" => Ok(Arc::new(CachingClient::new(
            MockProvider::neutral(),
            config.cache_dir.clone(),
            config.daily_limit,
        ))),
        other => bail!("unsupported AI provider: {other}"),
    }
}

// ------------------------------------------------------------
// Provider abstraction + concrete providers
// ------------------------------------------------------------

/// Low-level provider: does the actual call. Separated so the caching wrapper
/// is shared by production and tests.
pub trait Provider: Send + Sync + 'static {
    fn fetch<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<String>>;
    fn name(&self) -> &'static str;
}

/// Chat Completions compatible provider (OpenAI or any server speaking that API).
pub struct OpenAiProvider {
    http: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl OpenAiProvider {
    pub fn new(config: &AiConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            bail!("AI provider 'openai' enabled but no API key configured");
        }
        let http = reqwest::Client::builder()
            .user_agent(concat!("article-rater/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("building LLM http client")?;
        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
        })
    }
}

impl Provider for OpenAiProvider {
    fn fetch<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            #[derive(Serialize)]
            struct Msg<'a> {
                role: &'a str,
                content: &'a str,
            }
            #[derive(Serialize)]
            struct Req<'a> {
                model: &'a str,
                messages: Vec<Msg<'a>>,
                temperature: f32,
            }
            #[derive(Deserialize)]
            struct Resp {
                choices: Vec<Choice>,
            }
            #[derive(Deserialize)]
            struct Choice {
                message: ChoiceMsg,
            }
            #[derive(Deserialize)]
            struct ChoiceMsg {
                content: String,
            }

            let req = Req {
                model: &self.model,
                messages: vec![
                    Msg {
                        role: "system",
                        content: SYSTEM_INSTRUCTION,
                    },
                    Msg {
                        role: "user",
                        content: prompt,
                    },
                ],
                temperature: 0.0,
            };

            let resp = self
                .http
                .post(&self.endpoint)
                .bearer_auth(&self.api_key)
                .json(&req)
                .send()
                .await
                .context("sending LLM request")?;

            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                bail!("LLM request failed with {status}: {}", body.trim());
            }
            let body: Resp = resp.json().await.context("decoding LLM response envelope")?;
            body.choices
                .into_iter()
                .next()
                .map(|c| c.message.content)
                .filter(|c| !c.trim().is_empty())
                .ok_or_else(|| anyhow!("LLM returned an empty reply"))
        })
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

/// Always fails; used when AI is disabled in config.
pub struct DisabledClient;

impl AiClient for DisabledClient {
    fn analyze<'a>(&'a self, _prompt: &'a str) -> BoxFuture<'a, Result<String>> {
        Box::pin(async { Err(anyhow!("AI analysis is disabled in config")) })
    }
    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}

/// Fixed-reply provider for tests/local runs.
#[derive(Clone)]
pub struct MockProvider {
    pub fixed: String,
}

impl MockProvider {
    pub fn new(fixed: impl Into<String>) -> Self {
        Self {
            fixed: fixed.into(),
        }
    }

    /// Middle-of-the-road analysis.
    pub fn neutral() -> Self {
        Self::new(
            r#"{"main_themes": ["general"], "main_themes_alignment": 5.0, "how_fluffy": 5.0, "how_descriptive_title": 5.0}"#,
        )
    }
}

impl Provider for MockProvider {
    fn fetch<'a>(&'a self, _prompt: &'a str) -> BoxFuture<'a, Result<String>> {
        let out = self.fixed.clone();
        Box::pin(async move { Ok(out) })
    }
    fn name(&self) -> &'static str {
        "mock"
    }
}

impl AiClient for MockProvider {
    fn analyze<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<String>> {
        self.fetch(prompt)
    }
    fn provider_name(&self) -> &'static str {
        self.name()
    }
}

// ------------------------------------------------------------
// Caching client wrapper (file cache + daily limit)
// ------------------------------------------------------------

pub struct CachingClient<P: Provider> {
    inner: P,
    cache_dir: PathBuf,
    daily_limit_max: u32,
    counter: Arc<Mutex<DailyCounter>>,
}

impl<P: Provider> CachingClient<P> {
    pub fn new(inner: P, cache_dir: PathBuf, daily_limit_max: u32) -> Self {
        if let Err(e) = fs::create_dir_all(&cache_dir) {
            warn!(dir = %cache_dir.display(), error = %e, "cannot create AI cache dir");
        }
        let counter = Arc::new(Mutex::new(
            load_daily_counter(&cache_dir).unwrap_or_default(),
        ));
        Self {
            inner,
            cache_dir,
            daily_limit_max,
            counter,
        }
    }

    /// Real calls made today (cache hits excluded).
    pub fn calls_today(&self) -> u32 {
        self.counter.lock().map(|g| g.count).unwrap_or(0)
    }

    async fn analyze_impl(&self, prompt: &str) -> Result<String> {
        // Cache first: a hit costs nothing against the daily limit.
        let key = cache_key(self.inner.name(), prompt);
        if let Some(hit) = read_cache_file(&self.cache_dir, &key) {
            debug!(key = %key, "AI cache hit");
            return Ok(hit.reply);
        }

        {
            let mut g = self
                .counter
                .lock()
                .map_err(|_| anyhow!("AI daily counter poisoned"))?;
            if g.is_expired() {
                g.reset_to_today();
                if let Err(e) = save_daily_counter(&self.cache_dir, &g) {
                    warn!(error = %e, "failed to persist AI daily counter");
                }
            }
            if g.count >= self.daily_limit_max {
                bail!("daily AI call limit of {} reached", self.daily_limit_max);
            }
        }

        let reply = self.inner.fetch(prompt).await?;

        if let Err(e) = write_cache_file(&self.cache_dir, &key, &CachedReply { reply: reply.clone() }) {
            warn!(error = %e, "failed to write AI cache entry");
        }
        let mut g = self
            .counter
            .lock()
            .map_err(|_| anyhow!("AI daily counter poisoned"))?;
        g.count = g.count.saturating_add(1);
        if let Err(e) = save_daily_counter(&self.cache_dir, &g) {
            warn!(error = %e, "failed to persist AI daily counter");
        }
        info!(provider = self.inner.name(), calls_today = g.count, "AI call completed");
        Ok(reply)
    }
}

impl<P: Provider> AiClient for CachingClient<P> {
    fn analyze<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<String>> {
        Box::pin(self.analyze_impl(prompt))
    }
    fn provider_name(&self) -> &'static str {
        self.inner.name()
    }
}

// ------------------------------------------------------------
// File cache helpers
// ------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
struct CachedReply {
    reply: String,
}

fn cache_key(provider: &str, prompt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(provider.as_bytes());
    hasher.update([0u8]);
    hasher.update(SYSTEM_INSTRUCTION.as_bytes());
    hasher.update([0u8]);
    hasher.update(prompt.as_bytes());
    hasher
        .finalize()
        .iter()
        .take(16)
        .map(|b| format!("{b:02x}"))
        .collect()
}

fn cache_path(dir: &Path, key: &str) -> PathBuf {
    dir.join(format!("{key}.json"))
}

fn read_cache_file(dir: &Path, key: &str) -> Option<CachedReply> {
    let buf = fs::read_to_string(cache_path(dir, key)).ok()?;
    serde_json::from_str(&buf).ok()
}

fn write_cache_file(dir: &Path, key: &str, value: &CachedReply) -> io::Result<()> {
    let path = cache_path(dir, key);
    let json = serde_json::to_string(value).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    write_atomic(&path, json.as_bytes())
}

fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let tmp = path.with_extension("json.tmp");
    let mut f = fs::File::create(&tmp)?;
    f.write_all(bytes)?;
    fs::rename(tmp, path)
}

// ------------------------------------------------------------
// Daily counter helpers
// ------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DailyCounter {
    date: String,
    count: u32,
}

impl Default for DailyCounter {
    fn default() -> Self {
        Self {
            date: today(),
            count: 0,
        }
    }
}

impl DailyCounter {
    fn is_expired(&self) -> bool {
        self.date != today()
    }
    fn reset_to_today(&mut self) {
        self.date = today();
        self.count = 0;
    }
}

/// Days since UNIX epoch; enough for rollover detection.
fn today() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    (secs / 86_400).to_string()
}

fn counter_path(dir: &Path) -> PathBuf {
    dir.join("daily_count.json")
}

fn load_daily_counter(dir: &Path) -> io::Result<DailyCounter> {
    let s = fs::read_to_string(counter_path(dir))?;
    serde_json::from_str(&s).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

fn save_daily_counter(dir: &Path, dc: &DailyCounter) -> io::Result<()> {
    let s = serde_json::to_string(dc).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    write_atomic(&counter_path(dir), s.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingProvider {
        calls: Arc<AtomicU32>,
    }

    impl Provider for CountingProvider {
        fn fetch<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let out = format!("reply to {}", prompt.len());
            Box::pin(async move { Ok(out) })
        }
        fn name(&self) -> &'static str {
            "counting"
        }
    }

    #[tokio::test]
    async fn cache_hit_skips_provider() {
        let dir = tempfile::tempdir().unwrap();
        let calls = Arc::new(AtomicU32::new(0));
        let client = CachingClient::new(
            CountingProvider {
                calls: calls.clone(),
            },
            dir.path().to_path_buf(),
            10,
        );
        let a = client.analyze("same prompt").await.unwrap();
        let b = client.analyze("same prompt").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(client.calls_today(), 1);
    }

    #[tokio::test]
    async fn daily_limit_blocks_new_calls() {
        let dir = tempfile::tempdir().unwrap();
        let calls = Arc::new(AtomicU32::new(0));
        let client = CachingClient::new(
            CountingProvider {
                calls: calls.clone(),
            },
            dir.path().to_path_buf(),
            1,
        );
        client.analyze("first").await.unwrap();
        assert!(client.analyze("second").await.is_err());
        // Cached prompt still answers.
        assert!(client.analyze("first").await.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unwritable_cache_dir_still_counts_calls() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where the cache directory should be.
        let blocked = dir.path().join("cache");
        fs::write(&blocked, "x").unwrap();
        let calls = Arc::new(AtomicU32::new(0));
        let client = CachingClient::new(
            CountingProvider {
                calls: calls.clone(),
            },
            blocked,
            2,
        );
        client.analyze("one").await.unwrap();
        client.analyze("one").await.unwrap();
        assert_eq!(client.calls_today(), 2);
        assert!(client.analyze("two").await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn disabled_client_errors() {
        assert!(DisabledClient.analyze("x").await.is_err());
    }

    #[test]
    fn cache_key_depends_on_provider_and_prompt() {
        assert_ne!(cache_key("a", "p"), cache_key("b", "p"));
        assert_ne!(cache_key("a", "p"), cache_key("a", "q"));
        assert_eq!(cache_key("a", "p").len(), 32);
    }

    #[test]
    fn prompt_joins_article_and_interests() {
        let article = ArticleMetadata::new("T", "Body", Some("example.com".into()));
        let mut prefs = UserPreferences::default();
        prefs.record_theme_rating("space", 9.0);
        let p = build_prompt(&article, &prefs);
        assert_eq!(p, "Title: T\nSource: example.com\nText: Body\n{\"space\":9.0}");
    }
}
