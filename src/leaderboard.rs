//! Online leaderboard
//!
//! Client side of the score API: player name checks that mirror the server,
//! the JSON wire types, and a fetch-based client for the browser. Failures
//! never reach the game loop; a submission always settles as a
//! `SubmitOutcome` posted to the game's inbox.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::hooks::{InboxMessage, InboxSender, ScoreSubmitter};

/// Longest accepted player name, in Unicode code points
pub const MAX_NAME_CHARS: usize = 5;

/// Default number of rows requested for the table
pub const DEFAULT_SCORE_LIMIT: u32 = 20;

/// API root used when none is configured
pub const DEFAULT_API_BASE: &str = "/api";

/// Country code the server stores when it can't tell
pub const UNKNOWN_COUNTRY: &str = "XX";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameError {
    #[error("Name cannot be empty")]
    Empty,
    #[error("Name must be 5 characters or less")]
    TooLong,
}

#[derive(Debug, Error)]
pub enum LeaderboardError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Server returned HTTP {0}")]
    Status(u16),
    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("{0}")]
    Rejected(String),
}

/// Trimmed name if it would pass the server's length rule
pub fn validate_name(name: &str) -> Result<String, NameError> {
    let trimmed = name.trim();
    match trimmed.chars().count() {
        0 => Err(NameError::Empty),
        n if n > MAX_NAME_CHARS => Err(NameError::TooLong),
        _ => Ok(trimmed.to_string()),
    }
}

/// Cut a typed or pasted name down to what the server accepts
pub fn sanitize_name(name: &str) -> String {
    let kept: String = name.trim().chars().take(MAX_NAME_CHARS).collect();
    kept.trim_end().to_string()
}

/// Flag emoji for an ISO country code; a globe when unknown
pub fn country_flag(code: &str) -> String {
    let code = code.trim();
    if code.len() != 2 || code.eq_ignore_ascii_case(UNKNOWN_COUNTRY) {
        return "\u{1F310}".to_string();
    }
    code.chars()
        .map(|c| c.to_ascii_uppercase())
        .filter_map(|c| {
            if c.is_ascii_uppercase() {
                char::from_u32(0x1F1E6 + (c as u32 - 'A' as u32))
            } else {
                None
            }
        })
        .collect()
}

/// Body of `POST /scores`. Country is derived server-side and never sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub name: String,
    pub score: u64,
    pub strength: u32,
}

/// One row of `GET /scores`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardRow {
    #[serde(alias = "player_name")]
    pub name: String,
    pub score: u64,
    #[serde(default)]
    pub strength: u32,
    #[serde(alias = "country_code", default = "unknown_country")]
    pub country: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

fn unknown_country() -> String {
    UNKNOWN_COUNTRY.to_string()
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    rank: Option<u32>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ScoresResponse {
    #[serde(default)]
    scores: Vec<LeaderboardRow>,
}

#[derive(Debug, Deserialize)]
struct RankResponse {
    #[serde(default)]
    rank: u32,
}

/// How a submission settled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Stored at this rank
    Ranked(u32),
    /// Stored, server didn't report a rank
    Accepted,
    /// Not stored; user-facing reason
    Failed(String),
}

impl From<LeaderboardError> for SubmitOutcome {
    fn from(err: LeaderboardError) -> Self {
        match err {
            LeaderboardError::Rejected(reason) => SubmitOutcome::Failed(reason),
            _ => SubmitOutcome::Failed("Network error".to_string()),
        }
    }
}

pub fn parse_submit_response(body: &str) -> Result<SubmitOutcome, LeaderboardError> {
    let response: SubmitResponse = serde_json::from_str(body)?;
    if response.success {
        Ok(response.rank.map_or(SubmitOutcome::Accepted, SubmitOutcome::Ranked))
    } else {
        Err(LeaderboardError::Rejected(
            response
                .error
                .unwrap_or_else(|| "Submission rejected".to_string()),
        ))
    }
}

pub fn parse_scores(body: &str) -> Result<Vec<LeaderboardRow>, LeaderboardError> {
    let response: ScoresResponse = serde_json::from_str(body)?;
    Ok(response.scores)
}

pub fn parse_rank(body: &str) -> Result<u32, LeaderboardError> {
    let response: RankResponse = serde_json::from_str(body)?;
    Ok(response.rank)
}

/// Score API client
#[derive(Debug, Clone)]
pub struct LeaderboardClient {
    base_url: String,
}

impl Default for LeaderboardClient {
    fn default() -> Self {
        Self::new(DEFAULT_API_BASE)
    }
}

impl LeaderboardClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn submit_url(&self) -> String {
        format!("{}/scores", self.base_url)
    }

    pub fn scores_url(&self, limit: u32) -> String {
        format!("{}/scores?limit={limit}", self.base_url)
    }

    pub fn rank_url(&self, score: u64) -> String {
        format!("{}/scores/rank?score={score}", self.base_url)
    }
}

#[cfg(target_arch = "wasm32")]
mod web {
    use wasm_bindgen::{JsCast, JsValue};
    use wasm_bindgen_futures::JsFuture;
    use web_sys::{Request, RequestInit, RequestMode, Response};

    use super::LeaderboardError;

    fn js_error(value: JsValue) -> LeaderboardError {
        LeaderboardError::Network(format!("{value:?}"))
    }

    /// GET, or POST with a JSON body; returns (status, body text)
    pub async fn fetch_text(
        url: &str,
        json_body: Option<&str>,
    ) -> Result<(u16, String), LeaderboardError> {
        let opts = RequestInit::new();
        opts.set_mode(RequestMode::Cors);
        match json_body {
            Some(body) => {
                opts.set_method("POST");
                opts.set_body(&JsValue::from_str(body));
            }
            None => opts.set_method("GET"),
        }

        let request = Request::new_with_str_and_init(url, &opts).map_err(js_error)?;
        if json_body.is_some() {
            request
                .headers()
                .set("Content-Type", "application/json")
                .map_err(js_error)?;
        }

        let window = web_sys::window()
            .ok_or_else(|| LeaderboardError::Network("no window".to_string()))?;
        let response: Response = JsFuture::from(window.fetch_with_request(&request))
            .await
            .map_err(js_error)?
            .dyn_into()
            .map_err(js_error)?;
        let text = JsFuture::from(response.text().map_err(js_error)?)
            .await
            .map_err(js_error)?;

        Ok((response.status(), text.as_string().unwrap_or_default()))
    }
}

#[cfg(target_arch = "wasm32")]
impl LeaderboardClient {
    pub async fn submit_score(&self, entry: &ScoreEntry) -> Result<SubmitOutcome, LeaderboardError> {
        let body = serde_json::to_string(entry)?;
        let (status, text) = web::fetch_text(&self.submit_url(), Some(&body)).await?;
        // Error responses still carry {success:false, error} when the server can say why
        match parse_submit_response(&text) {
            Err(LeaderboardError::Decode(_)) if !(200..300).contains(&status) => {
                Err(LeaderboardError::Status(status))
            }
            result => result,
        }
    }

    pub async fn fetch_scores(&self, limit: u32) -> Result<Vec<LeaderboardRow>, LeaderboardError> {
        let (status, text) = web::fetch_text(&self.scores_url(limit), None).await?;
        if !(200..300).contains(&status) {
            return Err(LeaderboardError::Status(status));
        }
        parse_scores(&text)
    }

    pub async fn fetch_rank(&self, score: u64) -> Result<u32, LeaderboardError> {
        let (status, text) = web::fetch_text(&self.rank_url(score), None).await?;
        if !(200..300).contains(&status) {
            return Err(LeaderboardError::Status(status));
        }
        parse_rank(&text)
    }
}

#[cfg(target_arch = "wasm32")]
impl ScoreSubmitter for LeaderboardClient {
    fn submit(&mut self, entry: ScoreEntry, reply: InboxSender) {
        let client = self.clone();
        wasm_bindgen_futures::spawn_local(async move {
            let outcome = match client.submit_score(&entry).await {
                Ok(outcome) => outcome,
                Err(err) => {
                    log::warn!("Score submission failed: {err}");
                    SubmitOutcome::from(err)
                }
            };
            reply.post(InboxMessage::ScoreSubmitted(outcome));
        });
    }
}

/// Native stub: there is no network client outside the browser
#[cfg(not(target_arch = "wasm32"))]
impl ScoreSubmitter for LeaderboardClient {
    fn submit(&mut self, entry: ScoreEntry, reply: InboxSender) {
        log::warn!(
            "Leaderboard unavailable natively, dropping {} ({})",
            entry.name,
            entry.score
        );
        reply.post(InboxMessage::ScoreSubmitted(SubmitOutcome::from(
            LeaderboardError::Network("not supported".to_string()),
        )));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name("  ABC "), Ok("ABC".to_string()));
        assert_eq!(validate_name("   "), Err(NameError::Empty));
        assert_eq!(validate_name("ABCDEF"), Err(NameError::TooLong));
        // Code points, not bytes
        assert_eq!(validate_name("猫猫猫猫猫"), Ok("猫猫猫猫猫".to_string()));
        assert_eq!(
            NameError::TooLong.to_string(),
            "Name must be 5 characters or less"
        );
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("  PIXELATED  "), "PIXEL");
        assert_eq!(sanitize_name("ñandú!"), "ñandú");
        assert_eq!(sanitize_name(""), "");
        assert_eq!(sanitize_name("AB   CD"), "AB");
    }

    #[test]
    fn test_country_flag() {
        assert_eq!(country_flag("us"), "\u{1F1FA}\u{1F1F8}");
        assert_eq!(country_flag("XX"), "\u{1F310}");
        assert_eq!(country_flag("USA"), "\u{1F310}");
    }

    #[test]
    fn test_submit_body_has_no_country() {
        let entry = ScoreEntry {
            name: "ACE".into(),
            score: 1200,
            strength: 14,
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"name": "ACE", "score": 1200, "strength": 14})
        );
    }

    #[test]
    fn test_parse_submit_response() {
        assert_eq!(
            parse_submit_response(r#"{"success":true,"rank":4}"#).unwrap(),
            SubmitOutcome::Ranked(4)
        );
        assert_eq!(
            parse_submit_response(r#"{"success":true}"#).unwrap(),
            SubmitOutcome::Accepted
        );

        let err = parse_submit_response(r#"{"success":false,"error":"Name contains inappropriate content"}"#)
            .unwrap_err();
        assert_eq!(
            SubmitOutcome::from(err),
            SubmitOutcome::Failed("Name contains inappropriate content".into())
        );

        let err = parse_submit_response("<html>").unwrap_err();
        assert_eq!(SubmitOutcome::from(err), SubmitOutcome::Failed("Network error".into()));
    }

    #[test]
    fn test_parse_scores_accepts_db_columns() {
        let body = r#"{"scores":[
            {"player_name":"ZED","score":900,"strength":12,"country_code":"DE","created_at":"2025-01-01 10:00:00"},
            {"name":"AMY","score":800}
        ]}"#;
        let rows = parse_scores(body).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "ZED");
        assert_eq!(rows[0].country, "DE");
        assert_eq!(rows[1].country, UNKNOWN_COUNTRY);
        assert_eq!(rows[1].created_at, None);

        assert!(parse_scores("{}").unwrap().is_empty());
    }

    #[test]
    fn test_parse_rank() {
        assert_eq!(parse_rank(r#"{"rank":17}"#).unwrap(), 17);
        assert_eq!(parse_rank("{}").unwrap(), 0);
    }

    #[test]
    fn test_urls() {
        let client = LeaderboardClient::new("https://scores.example/api/");
        assert_eq!(client.submit_url(), "https://scores.example/api/scores");
        assert_eq!(client.scores_url(20), "https://scores.example/api/scores?limit=20");
        assert_eq!(client.rank_url(1500), "https://scores.example/api/scores/rank?score=1500");
    }

    #[test]
    fn test_native_submit_fails_soft() {
        let inbox = crate::hooks::Inbox::new();
        LeaderboardClient::default().submit(
            ScoreEntry {
                name: "ACE".into(),
                score: 5,
                strength: 1,
            },
            inbox.sender(),
        );
        assert_eq!(
            inbox.drain(),
            vec![InboxMessage::ScoreSubmitted(SubmitOutcome::Failed(
                "Network error".into()
            ))]
        );
    }

    proptest! {
        #[test]
        fn prop_sanitized_name_validates(name in "\\PC{0,12}") {
            let clean = sanitize_name(&name);
            if clean.is_empty() {
                prop_assert_eq!(validate_name(&clean), Err(NameError::Empty));
            } else {
                prop_assert_eq!(validate_name(&clean), Ok(clean.clone()));
            }
        }
    }
}
