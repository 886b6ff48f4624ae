//! Text interface: menu, URL prompt, score prompts and result printing.

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{error, warn};

use crate::analyze::ArticleScores;
use crate::feedback::Feedback;
use crate::session::{AnalysedArticle, RatingSession};
use crate::{MAX_SCORE, MIN_SCORE};

/// Accepts a number within [MIN_SCORE, MAX_SCORE]; anything else is `None`.
pub fn parse_score(input: &str) -> Option<f64> {
    let v: f64 = input.trim().replace(',', ".").parse().ok()?;
    (v.is_finite() && (MIN_SCORE..=MAX_SCORE).contains(&v)).then_some(v)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    Rate,
    RateWithFeedback,
    ShowInterests,
    Quit,
}

pub fn parse_menu_choice(input: &str) -> Option<MenuChoice> {
    match input.trim().to_ascii_lowercase().as_str() {
        "1" | "r" | "rate" => Some(MenuChoice::Rate),
        "2" | "f" | "feedback" => Some(MenuChoice::RateWithFeedback),
        "3" | "i" | "interests" => Some(MenuChoice::ShowInterests),
        "4" | "q" | "quit" | "exit" => Some(MenuChoice::Quit),
        _ => None,
    }
}

pub fn format_scores(scores: &ArticleScores) -> String {
    fn opt(v: Option<f64>) -> String {
        v.map(|x| format!("{x:.2}")).unwrap_or_else(|| "n/a".to_string())
    }
    format!(
        "Theme alignment:       {}\nFluffiness alignment:  {}\nTitle descriptiveness: {}\nOverall:               {:.2}",
        opt(scores.main_themes_alignment),
        opt(scores.fluffiness_alignment),
        opt(scores.title_descriptiveness),
        scores.overall
    )
}

pub struct Console<R, W> {
    input: R,
    output: W,
}

impl<R, W> Console<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub async fn say(&mut self, text: &str) -> Result<()> {
        self.output.write_all(text.as_bytes()).await?;
        self.output.write_all(b"\n").await?;
        self.output.flush().await?;
        Ok(())
    }

    /// `None` on end of input.
    pub async fn ask(&mut self, question: &str) -> Result<Option<String>> {
        self.output.write_all(question.as_bytes()).await?;
        self.output.flush().await?;
        let mut line = String::new();
        if self.input.read_line(&mut line).await? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    /// Repeats until a valid score is given. Blank input skips when `optional`.
    pub async fn ask_score(&mut self, question: &str, optional: bool) -> Result<Option<f64>> {
        loop {
            let Some(answer) = self.ask(question).await? else {
                return Ok(None);
            };
            if optional && answer.is_empty() {
                return Ok(None);
            }
            match parse_score(&answer) {
                Some(v) => return Ok(Some(v)),
                None => {
                    self.say(&format!(
                        "Please enter a number between {MIN_SCORE} and {MAX_SCORE}."
                    ))
                    .await?
                }
            }
        }
    }

    pub async fn collect_feedback(&mut self, article: &AnalysedArticle) -> Result<Feedback> {
        let mut feedback = Feedback::default();
        if !article.analysis.main_themes.is_empty() {
            self.say("How interested are you in each theme? (0-10, blank to skip)")
                .await?;
        }
        for theme in &article.analysis.main_themes {
            if let Some(v) = self.ask_score(&format!("  {theme}: "), true).await? {
                feedback.theme_ratings.push((theme.clone(), v));
            }
        }
        feedback.fluffiness = self
            .ask_score(
                "How happy were you with the amount of filler in the text? (0-10, blank to skip): ",
                true,
            )
            .await?;
        feedback.title_descriptiveness = self
            .ask_score(
                "How happy were you with how well the title described the article? (0-10, blank to skip): ",
                true,
            )
            .await?;
        Ok(feedback)
    }

    pub async fn show_interests(&mut self, session: &RatingSession) -> Result<()> {
        let prefs = session.preferences();
        if prefs.interests.is_empty() {
            return self.say("No interests recorded yet.").await;
        }
        let mut rows: Vec<_> = prefs.interests.iter().collect();
        rows.sort_by(|a, b| b.1.score.total_cmp(&a.1.score));
        for (theme, info) in rows {
            self.say(&format!(
                "{theme:<24} {:>5.2}  ({} articles)",
                info.score, info.articles_analysed
            ))
            .await?;
        }
        Ok(())
    }

    async fn rate_one(&mut self, session: &mut RatingSession, with_feedback: bool) -> Result<()> {
        let Some(url) = self.ask("URL to analyse: ").await? else {
            return Ok(());
        };
        if url.is_empty() {
            return self.say("No URL given.").await;
        }

        let article = match session.analyse_url(&url).await {
            Ok(a) => a,
            Err(e) => {
                warn!(error = ?e, url = %url, "article analysis failed");
                return self.say(&format!("Could not analyse the article: {e:#}")).await;
            }
        };

        self.say(&format!("\n{}", article.metadata.title)).await?;
        if !article.analysis.main_themes.is_empty() {
            self.say(&format!("Themes: {}", article.analysis.main_themes.join(", ")))
                .await?;
        }
        match session.rate(&article) {
            Ok(scores) => self.say(&format_scores(&scores)).await?,
            Err(e) => self.say(&format!("Could not rate the article: {e:#}")).await?,
        }

        if with_feedback {
            let feedback = self.collect_feedback(&article).await?;
            session.record_feedback(&article, &feedback);
            match session.save() {
                Ok(()) => self.say("Feedback saved.").await?,
                Err(e) => {
                    error!(error = ?e, "could not persist feedback");
                    self.say(&format!("Feedback could not be saved: {e:#}")).await?
                }
            }
        }
        Ok(())
    }

    /// Menu loop until quit or end of input.
    pub async fn run(&mut self, session: &mut RatingSession) -> Result<()> {
        loop {
            self.say("\n1) Rate an article\n2) Rate an article and give feedback\n3) Show interests\n4) Quit")
                .await?;
            let Some(answer) = self.ask("> ").await? else {
                return Ok(());
            };
            match parse_menu_choice(&answer) {
                Some(MenuChoice::Rate) => self.rate_one(session, false).await?,
                Some(MenuChoice::RateWithFeedback) => self.rate_one(session, true).await?,
                Some(MenuChoice::ShowInterests) => self.show_interests(session).await?,
                Some(MenuChoice::Quit) => return Ok(()),
                None => self.say("Unknown option.").await?,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_parsing_enforces_bounds() {
        assert_eq!(parse_score("7"), Some(7.0));
        assert_eq!(parse_score(" 3.5 "), Some(3.5));
        assert_eq!(parse_score("2,5"), Some(2.5));
        assert_eq!(parse_score("0"), Some(0.0));
        assert_eq!(parse_score("10"), Some(10.0));
        assert_eq!(parse_score("10.01"), None);
        assert_eq!(parse_score("-1"), None);
        assert_eq!(parse_score("NaN"), None);
        assert_eq!(parse_score("seven"), None);
        assert_eq!(parse_score(""), None);
    }

    #[test]
    fn menu_aliases() {
        assert_eq!(parse_menu_choice("1"), Some(MenuChoice::Rate));
        assert_eq!(parse_menu_choice(" F "), Some(MenuChoice::RateWithFeedback));
        assert_eq!(parse_menu_choice("q"), Some(MenuChoice::Quit));
        assert_eq!(parse_menu_choice("9"), None);
    }

    #[tokio::test]
    async fn ask_score_retries_until_valid() {
        let input: &[u8] = b"eleven\n42\n6.5\n";
        let mut out = Vec::new();
        let mut console = Console::new(input, &mut out);
        let v = console.ask_score("? ", false).await.unwrap();
        assert_eq!(v, Some(6.5));
        drop(console);
        let printed = String::from_utf8(out).unwrap();
        assert_eq!(printed.matches("Please enter a number").count(), 2);
    }

    #[tokio::test]
    async fn optional_score_blank_skips() {
        let input: &[u8] = b"\n";
        let mut out = Vec::new();
        let mut console = Console::new(input, &mut out);
        assert_eq!(console.ask_score("? ", true).await.unwrap(), None);
    }

    #[test]
    fn scores_render_missing_values() {
        let s = ArticleScores {
            main_themes_alignment: Some(7.0),
            fluffiness_alignment: None,
            title_descriptiveness: Some(4.25),
            overall: 5.5,
        };
        let text = format_scores(&s);
        assert!(text.contains("7.00"));
        assert!(text.contains("n/a"));
        assert!(text.contains("Overall:               5.50"));
    }
}
