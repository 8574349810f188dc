/// WinProbLive — Live score fetcher
///
/// Skóre v reálném čase z více zdrojů podle spolehlivosti:
///   1. Data API v4  /matches/{id}        → results.score / teams score
///   2. Web API v2   /api/match/v2/match  → teams stats.score / payload.score
///   3. Web API v1   /api/match/v1/matches → results.score / payload.score
///
/// Zdroje se zkouší sekvenčně, první použitelné skóre vyhrává; když
/// selžou všechny, vrací se nulový snapshot se source "unavailable" —
/// to není chyba, polling pokračuje.

use faceit_api::{FaceitDataClient, FaceitWebClient};
use serde_json::Value;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreSnapshot {
    pub our_rounds:   u32,
    pub enemy_rounds: u32,
    pub source:       &'static str,
    pub our_side:     String,   // "CT" | "T" | ""
    pub enemy_side:   String,
}

impl ScoreSnapshot {
    pub fn unavailable() -> Self {
        Self {
            our_rounds:   0,
            enemy_rounds: 0,
            source:       "unavailable",
            our_side:     String::new(),
            enemy_side:   String::new(),
        }
    }

    pub fn rounds(&self) -> (u32, u32) {
        (self.our_rounds, self.enemy_rounds)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreSource {
    DataApiV4,
    WebApiV2,
    WebApiV1,
}

impl ScoreSource {
    pub fn name(self) -> &'static str {
        match self {
            ScoreSource::DataApiV4 => "data_api_v4",
            ScoreSource::WebApiV2  => "web_api_v2",
            ScoreSource::WebApiV1  => "web_api_v1",
        }
    }
}

/// Pevné pořadí zdrojů — sekvenční, žádné souběžné dotazy navíc.
pub const SOURCE_ORDER: [ScoreSource; 3] =
    [ScoreSource::DataApiV4, ScoreSource::WebApiV2, ScoreSource::WebApiV1];

const SIDE_KEYS: [&str; 7] = [
    "side",
    "current_side",
    "currentSide",
    "team_side",
    "teamSide",
    "starting_side",
    "startingSide",
];

// ── Side labels ──────────────────────────────────────────────────────────────

pub fn normalize_side_label(value: &str) -> String {
    let text = value.trim().to_uppercase();
    match text.as_str() {
        "CT" | "COUNTER_TERRORIST" | "COUNTER-TERRORIST" | "COUNTER TERRORIST"
        | "COUNTERTERRORISTS" => "CT".to_string(),
        "T" | "TERRORIST" | "TERRORISTS" => "T".to_string(),
        _ => String::new(),
    }
}

/// Side label z team objektu — klíče se liší podle zdroje, hledáme je
/// na objektu i v jeho `stats`.
pub fn extract_side_from_team_obj(team: &Value) -> String {
    if !team.is_object() {
        return String::new();
    }
    let stats = team.get("stats");

    for key in SIDE_KEYS {
        if let Some(s) = team.get(key).and_then(|v| v.as_str()) {
            let normalized = normalize_side_label(s);
            if !normalized.is_empty() {
                return normalized;
            }
        }
        if let Some(s) = stats.and_then(|st| st.get(key)).and_then(|v| v.as_str()) {
            let normalized = normalize_side_label(s);
            if !normalized.is_empty() {
                return normalized;
            }
        }
    }

    String::new()
}

// ── Skóre — koerce a extrakce ────────────────────────────────────────────────

fn coerce_rounds(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn rounds_or_zero(value: Option<&Value>) -> u32 {
    value.and_then(coerce_rounds).unwrap_or(0.0).max(0.0) as u32
}

/// Skóre z mapy `{faction_key: rounds}`; literální "faction1"/"faction2"
/// bereme jako náhradní klíče (některé odpovědi je používají i když jsou
/// teams pojmenované jinak).
fn score_from_map(score_map: &Value, our_key: &str, enemy_key: &str) -> Option<(u32, u32)> {
    let map = score_map.as_object()?;
    if map.is_empty() {
        return None;
    }
    let our = rounds_or_zero(map.get(our_key).or_else(|| map.get("faction1")));
    let enemy = rounds_or_zero(map.get(enemy_key).or_else(|| map.get("faction2")));
    Some((our, enemy))
}

/// Zdroj 1: Data API v4. `results.score` bývá přítomné během zápasu nebo
/// až po něm; některé verze API dávají skóre na `teams.<key>.score`.
pub fn extract_score_data_api(match_doc: &Value, our_key: &str, enemy_key: &str) -> Option<(u32, u32)> {
    if let Some(score_map) = match_doc.get("results").and_then(|r| r.get("score")) {
        if let Some((our, enemy)) = score_from_map(score_map, our_key, enemy_key) {
            if our > 0 || enemy > 0 {
                return Some((our, enemy));
            }
        }
    }

    let teams = match_doc.get("teams")?;
    let our_field = teams.get(our_key).and_then(|t| t.get("score"));
    let enemy_field = teams.get(enemy_key).and_then(|t| t.get("score"));
    if our_field.is_some() || enemy_field.is_some() {
        return Some((rounds_or_zero(our_field), rounds_or_zero(enemy_field)));
    }

    None
}

/// Skóre týmu ve web v2 payloadu: nenulové `stats.score` vyhrává,
/// jinak team-level `score` pole (i nulové se počítá jako přítomné).
fn team_score_value(team: &Value) -> Option<f64> {
    let stats_score = team
        .get("stats")
        .and_then(|s| s.get("score"))
        .and_then(coerce_rounds);
    match stats_score {
        Some(v) if v != 0.0 => Some(v),
        _ => team.get("score").and_then(coerce_rounds),
    }
}

fn web_team<'a>(payload: &'a Value, key: &str, fallback: &str) -> Option<&'a Value> {
    let teams = payload.get("teams")?;
    teams.get(key).or_else(|| teams.get(fallback))
}

/// Zdroj 2: Web API v2.
pub fn extract_score_web_v2(payload: &Value, our_key: &str, enemy_key: &str) -> Option<(u32, u32)> {
    let our_score = web_team(payload, our_key, "faction1").and_then(team_score_value);
    let enemy_score = web_team(payload, enemy_key, "faction2").and_then(team_score_value);

    if our_score.is_some() || enemy_score.is_some() {
        return Some((
            our_score.unwrap_or(0.0).max(0.0) as u32,
            enemy_score.unwrap_or(0.0).max(0.0) as u32,
        ));
    }

    // Alternativní tvar: payload.score = {"faction1": 5, "faction2": 3}
    score_from_map(payload.get("score")?, our_key, enemy_key)
}

/// Zdroj 3: Web API v1 — results.score nebo top-level score mapa.
pub fn extract_score_web_v1(payload: &Value, our_key: &str, enemy_key: &str) -> Option<(u32, u32)> {
    let score_map = payload
        .get("results")
        .and_then(|r| r.get("score"))
        .filter(|m| m.as_object().is_some_and(|o| !o.is_empty()))
        .or_else(|| payload.get("score"))?;

    let (our, enemy) = score_from_map(score_map, our_key, enemy_key)?;
    (our > 0 || enemy > 0).then_some((our, enemy))
}

fn sides_from_teams(
    our_team: Option<&Value>,
    enemy_team: Option<&Value>,
) -> (String, String) {
    (
        our_team.map(extract_side_from_team_obj).unwrap_or_default(),
        enemy_team.map(extract_side_from_team_obj).unwrap_or_default(),
    )
}

// ── Fetch ────────────────────────────────────────────────────────────────────

/// Projde zdroje v pevném pořadí a vrátí první použitelný snapshot;
/// všechny upstream chyby se degradují na další zdroj.
pub async fn fetch_live_score(
    data: &FaceitDataClient,
    web: &FaceitWebClient,
    match_id: &str,
    our_key: &str,
    enemy_key: &str,
) -> ScoreSnapshot {
    for source in SOURCE_ORDER {
        match source {
            ScoreSource::DataApiV4 => {
                let Some(doc) = data.get_match(match_id).await else {
                    continue;
                };
                if let Some((our, enemy)) = extract_score_data_api(&doc, our_key, enemy_key) {
                    let teams = doc.get("teams");
                    let (our_side, enemy_side) = sides_from_teams(
                        teams.and_then(|t| t.get(our_key)),
                        teams.and_then(|t| t.get(enemy_key)),
                    );
                    return ScoreSnapshot {
                        our_rounds: our,
                        enemy_rounds: enemy,
                        source: source.name(),
                        our_side,
                        enemy_side,
                    };
                }
            }
            ScoreSource::WebApiV2 | ScoreSource::WebApiV1 => {
                let response = match source {
                    ScoreSource::WebApiV2 => web.match_v2(match_id).await,
                    _ => web.match_v1(match_id).await,
                };
                let Some(response) = response else {
                    continue;
                };
                let payload = response.get("payload").cloned().unwrap_or(Value::Null);
                let score = match source {
                    ScoreSource::WebApiV2 => extract_score_web_v2(&payload, our_key, enemy_key),
                    _ => extract_score_web_v1(&payload, our_key, enemy_key),
                };
                if let Some((our, enemy)) = score {
                    let (our_side, enemy_side) = sides_from_teams(
                        web_team(&payload, our_key, "faction1"),
                        web_team(&payload, enemy_key, "faction2"),
                    );
                    return ScoreSnapshot {
                        our_rounds: our,
                        enemy_rounds: enemy,
                        source: source.name(),
                        our_side,
                        enemy_side,
                    };
                }
            }
        }
        debug!("Score source {} had no usable score for {match_id}", source.name());
    }

    ScoreSnapshot::unavailable()
}
