/// WinProbLive — FACEIT gateway
///
/// Dva nezávislé transporty:
///   A) Data API v4 (open.faceit.com) — stabilní veřejné API, Bearer token
///   B) interní web API (www.faceit.com) — bez auth, ale vyžaduje
///      browser-like fingerprint, jinak vrací challenge page
///
/// Všechny accessory vrací `Option<Value>` — upstream chyba, 404 i ne-200
/// se degradují na None a rozhodnutí nechávají na volajícím.

use serde_json::Value;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

pub const GAME_ID:       &str = "cs2";
pub const DATA_API_BASE: &str = "https://open.faceit.com/data/v4";
pub const WEB_API_BASE:  &str = "https://www.faceit.com";

const DATA_TIMEOUT: Duration = Duration::from_secs(12);
const WEB_TIMEOUT:  Duration = Duration::from_secs(18);
/// Jediný bounded retry po 429.
const RATE_LIMIT_BACKOFF: Duration = Duration::from_secs(2);

/// Room URL pro lidský výstup.
pub fn room_url(match_id: &str) -> String {
    format!("{WEB_API_BASE}/en/{GAME_ID}/room/{match_id}")
}

/// Env bool ve stylu `FACEIT_SSL_VERIFY=false` — cokoliv mimo
/// {0, false, no, off} je true.
pub fn read_bool_env(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(v) => !matches!(v.trim().to_lowercase().as_str(), "0" | "false" | "no" | "off"),
        Err(_) => default,
    }
}

pub fn ssl_verify_enabled() -> bool {
    read_bool_env("FACEIT_SSL_VERIFY", true)
}

fn build_client(timeout: Duration, verify_ssl: bool, browser_like: bool) -> reqwest::Client {
    let mut builder = reqwest::Client::builder().timeout(timeout);

    if browser_like {
        // Imitujeme prohlížeč — interní API jinak odmítá requesty
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Accept", "application/json, text/plain, */*".parse().unwrap());
        headers.insert("Accept-Language", "en-US,en;q=0.5".parse().unwrap());
        builder = builder
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36")
            .default_headers(headers);
    }

    if !verify_ssl {
        warn!("FACEIT_SSL_VERIFY=false: TLS verification disabled (local debug only)");
        builder = builder.danger_accept_invalid_certs(true);
    }

    builder.build().unwrap_or_else(|_| reqwest::Client::new())
}

// ── A) Data API v4 ───────────────────────────────────────────────────────────

pub struct FaceitDataClient {
    client:  reqwest::Client,
    api_key: String,
}

impl FaceitDataClient {
    pub fn new(api_key: impl Into<String>, verify_ssl: bool) -> Self {
        Self {
            client:  build_client(DATA_TIMEOUT, verify_ssl, false),
            api_key: api_key.into(),
        }
    }

    /// GET s auth hlavičkou; 404 → None, 429 → jeden retry po 2s,
    /// jiná chyba → None (a debug log).
    pub async fn get(&self, path: &str, params: &[(&str, String)]) -> Option<Value> {
        let url = format!("{DATA_API_BASE}{path}");

        for attempt in 0..2 {
            let resp = self
                .client
                .get(&url)
                .bearer_auth(&self.api_key)
                .header("Accept", "application/json")
                .query(params)
                .send()
                .await;

            let resp = match resp {
                Ok(r) => r,
                Err(e) => {
                    debug!("Data API request failed for {path}: {e}");
                    return None;
                }
            };

            let status = resp.status();
            if status == reqwest::StatusCode::NOT_FOUND {
                return None;
            }
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS && attempt == 0 {
                debug!("Data API 429 on {path}, backing off {}s", RATE_LIMIT_BACKOFF.as_secs());
                sleep(RATE_LIMIT_BACKOFF).await;
                continue;
            }
            if !status.is_success() {
                debug!("Data API {path} status {status}");
                return None;
            }

            return match resp.json::<Value>().await {
                Ok(v) => Some(v),
                Err(e) => {
                    debug!("Data API JSON parse failed for {path}: {e}");
                    None
                }
            };
        }

        None
    }

    pub async fn get_player_by_nickname(&self, nickname: &str) -> Option<Value> {
        self.get(
            "/players",
            &[("nickname", nickname.to_string()), ("game", GAME_ID.to_string())],
        )
        .await
    }

    pub async fn get_player(&self, player_id: &str) -> Option<Value> {
        self.get(&format!("/players/{player_id}"), &[]).await
    }

    pub async fn get_player_stats_matches(&self, player_id: &str, limit: usize) -> Option<Value> {
        self.get(
            &format!("/players/{player_id}/games/{GAME_ID}/stats"),
            &[("limit", limit.to_string()), ("offset", "0".to_string())],
        )
        .await
    }

    pub async fn get_player_history(
        &self,
        player_id: &str,
        limit: usize,
        from_ts: Option<i64>,
        to_ts: Option<i64>,
    ) -> Option<Value> {
        let mut params = vec![
            ("offset", "0".to_string()),
            ("limit", limit.to_string()),
            ("game", GAME_ID.to_string()),
        ];
        if let Some(from) = from_ts {
            params.push(("from", from.to_string()));
        }
        if let Some(to) = to_ts {
            params.push(("to", to.to_string()));
        }
        self.get(&format!("/players/{player_id}/history"), &params).await
    }

    pub async fn get_match(&self, match_id: &str) -> Option<Value> {
        self.get(&format!("/matches/{match_id}"), &[]).await
    }
}

// ── B) Interní web API ───────────────────────────────────────────────────────

pub struct FaceitWebClient {
    client: reqwest::Client,
}

impl FaceitWebClient {
    pub fn new(verify_ssl: bool) -> Self {
        Self {
            client: build_client(WEB_TIMEOUT, verify_ssl, true),
        }
    }

    async fn get(&self, path: &str, params: &[(&str, String)]) -> Option<Value> {
        let url = format!("{WEB_API_BASE}{path}");
        let resp = match self.client.get(&url).query(params).send().await {
            Ok(r) => r,
            Err(e) => {
                debug!("Web API request failed for {path}: {e}");
                return None;
            }
        };

        let status = resp.status();
        if !status.is_success() {
            debug!("Web API {path} status {status}");
            return None;
        }

        match resp.json::<Value>().await {
            Ok(v) => Some(v),
            Err(e) => {
                debug!("Web API JSON parse failed for {path}: {e}");
                None
            }
        }
    }

    /// Zápasy uživatele seskupené podle lifecycle stavu
    /// (ONGOING, READY, ...) — primární zdroj pro detekci live matche.
    pub async fn group_by_state(&self, user_id: &str) -> Option<Value> {
        self.get(
            "/api/match/v1/matches/groupByState",
            &[("userId", user_id.to_string())],
        )
        .await
    }

    pub async fn match_v2(&self, match_id: &str) -> Option<Value> {
        self.get(&format!("/api/match/v2/match/{match_id}"), &[]).await
    }

    pub async fn match_v1(&self, match_id: &str) -> Option<Value> {
        self.get(&format!("/api/match/v1/matches/{match_id}"), &[]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_env_parsing() {
        std::env::set_var("WINPROB_TEST_BOOL_A", "false");
        assert!(!read_bool_env("WINPROB_TEST_BOOL_A", true));
        std::env::set_var("WINPROB_TEST_BOOL_A", "OFF");
        assert!(!read_bool_env("WINPROB_TEST_BOOL_A", true));
        std::env::set_var("WINPROB_TEST_BOOL_A", "1");
        assert!(read_bool_env("WINPROB_TEST_BOOL_A", false));
        std::env::set_var("WINPROB_TEST_BOOL_A", "anything");
        assert!(read_bool_env("WINPROB_TEST_BOOL_A", false));
        std::env::remove_var("WINPROB_TEST_BOOL_A");
        assert!(read_bool_env("WINPROB_TEST_BOOL_A", true));
        assert!(!read_bool_env("WINPROB_TEST_BOOL_A", false));
    }

    #[test]
    fn room_url_shape() {
        assert_eq!(
            room_url("1-abc-def"),
            "https://www.faceit.com/en/cs2/room/1-abc-def"
        );
    }
}
