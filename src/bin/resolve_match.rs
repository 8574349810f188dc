//! Diagnostická binárka: nickname → aktivní FACEIT match_id
//!
//! Jde jen po nejkratší cestě: Data API resolvne player_id, interní web
//! endpoint groupByState vybere aktivní match. Výstup je jeden řádek
//! s vlastním sentinelem, vhodný pro volání z jiného procesu.
//!
//! Spustit: cargo run --bin resolve-match -- <nickname>

use dotenv::dotenv;
use faceit_api::{room_url, ssl_verify_enabled, FaceitDataClient, FaceitWebClient};
use logger::{sentinel_line, MATCHID_SENTINEL};
use match_resolver::{extract_steam_id_64, pick_match_from_groups};
use serde_json::{json, Value};
use std::env;
use tracing_subscriber::{fmt, EnvFilter};

fn emit(payload: &Value) {
    match sentinel_line(MATCHID_SENTINEL, payload) {
        Ok(line) => println!("{line}"),
        Err(e) => eprintln!("[ERROR] payload serialization failed: {e}"),
    }
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let nickname = env::args().nth(1).unwrap_or_default().trim().to_string();
    if nickname.is_empty() {
        emit(&json!({ "ok": false, "error": "nickname required" }));
        std::process::exit(1);
    }

    let api_key = env::var("FACEIT_API_KEY").unwrap_or_default().trim().to_string();
    if api_key.is_empty() {
        emit(&json!({ "ok": false, "error": "FACEIT_API_KEY missing" }));
        std::process::exit(1);
    }

    let verify_ssl = ssl_verify_enabled();
    let data = FaceitDataClient::new(api_key, verify_ssl);
    let web = FaceitWebClient::new(verify_ssl);

    let Some(lookup) = data.get_player_by_nickname(&nickname).await else {
        emit(&json!({ "ok": false, "nickname": nickname, "error": "player not found" }));
        std::process::exit(1);
    };
    let player_id = lookup
        .get("player_id")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .trim()
        .to_string();
    if player_id.is_empty() {
        emit(&json!({ "ok": false, "nickname": nickname, "error": "player_id missing in lookup" }));
        std::process::exit(1);
    }

    let profile = data.get_player(&player_id).await.unwrap_or(lookup);
    let steam_id_64 = extract_steam_id_64(&profile);

    let groups = web
        .group_by_state(&player_id)
        .await
        .and_then(|r| r.get("payload").cloned())
        .unwrap_or(Value::Null);
    let picked = pick_match_from_groups(&groups);

    let (match_id, state) = match picked {
        Some((id, state)) => (Some(id), Some(state)),
        None => (None, None),
    };

    emit(&json!({
        "ok": true,
        "nickname": nickname,
        "player_id": player_id,
        "steam_id_64": steam_id_64,
        "match_id": match_id,
        "state": state,
        "room_url": match_id.as_deref().map(room_url),
    }));
}
