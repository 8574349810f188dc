/// WinProbLive — Match resolver
///
/// nickname → (player_id, match_id, naše/soupeřova frakce) přes čtyři
/// fallback tiery v pevném pořadí:
///   1. vynucené match_id (CLI/env), pokud projde plausibility checkem
///   2. pole přímo na profilu hráče + bounded-depth scan celého dokumentu
///   3. interní web endpoint groupByState (stavy dle priority)
///   4. nedávná history (24h) + kontrola statusu přes match detail
///
/// Frakce se přiřazuje podle player_id, fallback přes normalizovaný nickname.
/// Roster kontejnery mají u upstreamu víc tvarů (list, mapa podle id,
/// samostatný captain) — podporujeme všechny.

use chrono::Utc;
use faceit_api::{room_url, FaceitDataClient, FaceitWebClient, GAME_ID};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::VecDeque;
use thiserror::Error;
use tracing::{debug, info, warn};
use unicode_normalization::UnicodeNormalization;

/// Statusy znamenající "match právě běží / room je aktivní".
pub const ACTIVE_MATCH_STATUSES: [&str; 8] = [
    "ongoing",
    "in_progress",
    "started",
    "ready",
    "configuring",
    "live",
    "voting",
    "captains_picking",
];

const TERMINAL_STATUSES: [&str; 3] = ["finished", "cancelled", "aborted"];

/// Priorita stavů v groupByState odpovědi.
pub const STATE_PRIORITY: [&str; 7] = [
    "ONGOING",
    "READY",
    "CONFIGURING",
    "VOTING",
    "LIVE",
    "STARTED",
    "IN_PROGRESS",
];

const MATCH_ID_KEYS: [&str; 5] = [
    "active_match_id",
    "ongoing_match_id",
    "current_match_id",
    "match_id",
    "faceit_match_id",
];

const MEMBER_ID_KEYS: [&str; 7] =
    ["player_id", "playerId", "id", "user_id", "userId", "faceit_id", "faceitId"];

const MEMBER_NICK_KEYS: [&str; 5] =
    ["nickname", "nick", "name", "game_player_name", "gamePlayerName"];

const ROSTER_CONTAINER_KEYS: [&str; 5] = ["roster", "players", "members", "lineup", "line_up"];

const DEEP_SEARCH_MAX_DEPTH: usize = 5;
const HISTORY_LOOKBACK_SECS: i64 = 24 * 3600;
const HISTORY_SCAN_LIMIT: usize = 5;
const ROSTER_PREVIEW_LIMIT: usize = 5;

// FACEIT match id vypadá jako UUID nebo "1-<uuid>".
static MATCH_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[0-9]+-)?[0-9a-fA-F-]{20,}$").unwrap());

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("player '{nickname}' not found on FACEIT")]
    PlayerNotFound { nickname: String },

    #[error(
        "no active match found for '{nickname}' — is the player in a CS2 game on FACEIT?\n{detail}"
    )]
    NoActiveMatch { nickname: String, detail: String },

    #[error("could not fetch match {match_id}")]
    MatchUnavailable { match_id: String },

    #[error("unexpected teams structure in match {match_id} ({found} faction keys)")]
    MalformedTeams { match_id: String, found: usize },

    #[error(
        "could not place the player in either roster\n  nickname input    : {nickname}\n  nickname resolved : {resolved_nickname}\n  player_id         : {player_id}\n  match_id          : {match_id}\n  roster preview:\n{roster_preview}"
    )]
    FactionNotFound {
        nickname: String,
        resolved_nickname: String,
        player_id: String,
        match_id: String,
        roster_preview: String,
    },
}

// ── Normalizační utility ─────────────────────────────────────────────────────

pub fn is_plausible_match_id(value: &str) -> bool {
    let text = value.trim();
    !text.is_empty() && MATCH_ID_RE.is_match(text)
}

/// Kanonický tvar nicku pro porovnávání: NFKC, lowercase, bez whitespace.
pub fn normalize_nickname(value: &str) -> String {
    value
        .nfkc()
        .collect::<String>()
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect()
}

pub fn is_active_status(status: &str) -> bool {
    ACTIVE_MATCH_STATUSES.contains(&status.trim().to_lowercase().as_str())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveCheck {
    Active,
    /// Neznámý status bez finished_at — low-confidence fallback.
    PossiblyActive,
    Inactive,
}

/// Posouzení match detailu: explicitně aktivní status vyhrává; match bez
/// terminálního statusu a bez finished_at je *možná* aktivní (heuristika,
/// volající ji smí zapnout/vypnout).
pub fn check_active_match_payload(detail: &Value) -> ActiveCheck {
    let status = detail
        .get("status")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .trim()
        .to_lowercase();

    if !status.is_empty() && is_active_status(&status) {
        return ActiveCheck::Active;
    }

    let finished = detail
        .get("finished_at")
        .map(|v| !v.is_null())
        .unwrap_or(false);

    if !finished && !TERMINAL_STATUSES.contains(&status.as_str()) {
        return ActiveCheck::PossiblyActive;
    }

    ActiveCheck::Inactive
}

// ── Match id z profilu ───────────────────────────────────────────────────────

fn plausible_str(value: &Value) -> Option<String> {
    let text = value.as_str()?.trim();
    is_plausible_match_id(text).then(|| text.to_string())
}

/// Bounded-depth scan celého dokumentu — explicitní worklist s čítačem
/// hloubky místo rekurze.
pub fn find_match_id_deep(doc: &Value) -> Option<String> {
    let mut queue: VecDeque<(&Value, usize)> = VecDeque::new();
    queue.push_back((doc, 0));

    while let Some((node, depth)) = queue.pop_front() {
        match node {
            Value::Object(map) => {
                for (key, value) in map {
                    if MATCH_ID_KEYS.contains(&key.to_lowercase().as_str()) {
                        if let Some(id) = plausible_str(value) {
                            return Some(id);
                        }
                    }
                    if depth < DEEP_SEARCH_MAX_DEPTH {
                        queue.push_back((value, depth + 1));
                    }
                }
            }
            Value::Array(items) => {
                if depth < DEEP_SEARCH_MAX_DEPTH {
                    for item in items {
                        queue.push_back((item, depth + 1));
                    }
                }
            }
            _ => {}
        }
    }

    None
}

/// Kandidátní pole na profilu (root + games.cs2), pak deep scan.
pub fn extract_active_match_id(profile: &Value) -> Option<String> {
    let game = profile
        .get("games")
        .and_then(|g| g.get(GAME_ID))
        .cloned()
        .unwrap_or(Value::Null);

    let candidates = [
        profile.get("active_match_id"),
        profile.get("ongoing_match_id"),
        profile.get("match_id"),
        game.get("active_match_id"),
        game.get("ongoing_match_id"),
        game.get("match_id"),
    ];

    for candidate in candidates.into_iter().flatten() {
        if let Some(id) = plausible_str(candidate) {
            return Some(id);
        }
    }

    find_match_id_deep(profile)
}

/// Tiery 1–2 jsou čistě statické: vynucené id má absolutní přednost,
/// pak profilová pole (detailní profil dřív než lookup odpověď).
pub fn choose_static_match_id(
    forced: Option<&str>,
    profile: &Value,
    lookup: &Value,
) -> Option<(String, &'static str)> {
    if let Some(forced) = forced {
        let forced = forced.trim();
        if is_plausible_match_id(forced) {
            return Some((forced.to_string(), "forced"));
        }
        if !forced.is_empty() {
            warn!("Forced match id '{forced}' is not plausible, falling back to auto-detection");
        }
    }

    extract_active_match_id(profile)
        .or_else(|| extract_active_match_id(lookup))
        .map(|id| (id, "profile"))
}

/// Tier 3: groupByState payload — stavy dle priority, první neprázdná
/// skupina; když žádný známý stav nemá položky, bere se cokoliv neprázdného.
pub fn pick_match_from_groups(payload: &Value) -> Option<(String, String)> {
    let groups = payload.as_object()?;

    let first_id = |items: &Value| -> Option<String> {
        let first = items.as_array()?.first()?;
        let id = first
            .get("id")
            .and_then(|v| v.as_str())
            .or_else(|| first.get("match_id").and_then(|v| v.as_str()))?
            .trim();
        (!id.is_empty()).then(|| id.to_string())
    };

    for state in STATE_PRIORITY {
        if let Some(items) = groups.get(state) {
            if let Some(id) = first_id(items) {
                return Some((id, state.to_string()));
            }
        }
    }

    // Poslední záchrana: libovolná neprázdná skupina.
    for (state, items) in groups {
        if let Some(id) = first_id(items) {
            return Some((id, state.clone()));
        }
    }

    None
}

// ── Roster / frakce ──────────────────────────────────────────────────────────

pub fn extract_member_id(member: &Value) -> Option<String> {
    for key in MEMBER_ID_KEYS {
        if let Some(v) = member.get(key) {
            let text = match v {
                Value::String(s) => s.trim().to_string(),
                Value::Number(n) => n.to_string(),
                _ => continue,
            };
            if !text.is_empty() {
                return Some(text);
            }
        }
    }
    None
}

pub fn extract_member_nickname(member: &Value) -> Option<String> {
    for key in MEMBER_NICK_KEYS {
        if let Some(s) = member.get(key).and_then(|v| v.as_str()) {
            let s = s.trim();
            if !s.is_empty() {
                return Some(s.to_string());
            }
        }
    }
    None
}

/// Posbírá členy týmu přes všechny podporované tvary kontejneru:
/// list memberů, mapa id → member (id doplníme z klíče) i samostatný
/// captain (objekt nebo holé id).
pub fn collect_team_members(team: &Value) -> Vec<Value> {
    let mut members = Vec::new();

    for key in ROSTER_CONTAINER_KEYS {
        match team.get(key) {
            Some(Value::Array(items)) => {
                members.extend(items.iter().filter(|m| m.is_object()).cloned());
            }
            Some(Value::Object(map)) => {
                for (member_key, value) in map {
                    if let Value::Object(obj) = value {
                        let mut candidate = obj.clone();
                        if extract_member_id(value).is_none() {
                            candidate.insert("player_id".to_string(), Value::String(member_key.clone()));
                        }
                        members.push(Value::Object(candidate));
                    }
                }
            }
            _ => {}
        }
    }

    match team.get("captain") {
        Some(cap @ Value::Object(_)) => members.push(cap.clone()),
        Some(Value::String(id)) if !id.trim().is_empty() => {
            members.push(serde_json::json!({ "player_id": id.trim() }));
        }
        Some(Value::Number(id)) => {
            members.push(serde_json::json!({ "player_id": id.to_string() }));
        }
        _ => {}
    }

    members
}

/// Najde frakci obsahující hráče — nejdřív podle id, pak podle
/// normalizovaného nicku. Nezávisí na pořadí procházení frakcí.
pub fn resolve_player_faction(
    teams: &Value,
    player_id: &str,
    nickname_candidates: &[&str],
) -> Option<String> {
    let target_id = player_id.trim();
    let normalized_nicks: Vec<String> = nickname_candidates
        .iter()
        .map(|n| normalize_nickname(n))
        .filter(|n| !n.is_empty())
        .collect();

    for (faction_key, team) in teams.as_object()? {
        for member in collect_team_members(team) {
            if let Some(member_id) = extract_member_id(&member) {
                if !target_id.is_empty() && member_id == target_id {
                    return Some(faction_key.clone());
                }
            }
            if let Some(member_nick) = extract_member_nickname(&member) {
                let member_nick = normalize_nickname(&member_nick);
                if !member_nick.is_empty() && normalized_nicks.contains(&member_nick) {
                    return Some(faction_key.clone());
                }
            }
        }
    }

    None
}

/// Až 5 jmen/id na frakci pro chybovou diagnostiku.
pub fn roster_preview(team: &Value) -> String {
    let mut labels: Vec<String> = Vec::new();
    for member in collect_team_members(team) {
        let label = extract_member_nickname(&member).or_else(|| extract_member_id(&member));
        if let Some(label) = label {
            if !labels.contains(&label) {
                labels.push(label);
            }
        }
        if labels.len() >= ROSTER_PREVIEW_LIMIT {
            break;
        }
    }
    labels.join(", ")
}

// ── Match kontext ────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct MatchContext {
    pub match_id:          String,
    pub our_faction_key:   String,
    pub enemy_faction_key: String,
    pub our_team_name:     String,
    pub enemy_team_name:   String,
    pub map_name:          String,
    pub room_url:          String,
    pub our_roster:        Vec<Value>,
    pub enemy_roster:      Vec<Value>,
}

pub fn extract_map_name(match_doc: &Value) -> String {
    match_doc
        .get("voting")
        .and_then(|v| v.get("map"))
        .and_then(|m| m.get("pick"))
        .and_then(|p| p.as_array())
        .and_then(|picks| picks.first())
        .and_then(|v| v.as_str())
        .unwrap_or("unknown")
        .to_string()
}

pub fn build_match_context(
    match_doc: &Value,
    match_id: &str,
    our_faction_key: &str,
    enemy_faction_key: &str,
) -> MatchContext {
    let teams = match_doc.get("teams").cloned().unwrap_or(Value::Null);
    let team_name = |key: &str| -> String {
        teams
            .get(key)
            .and_then(|t| t.get("name"))
            .and_then(|n| n.as_str())
            .unwrap_or(key)
            .to_string()
    };
    let roster = |key: &str| -> Vec<Value> {
        teams
            .get(key)
            .map(collect_team_members)
            .unwrap_or_default()
    };

    MatchContext {
        match_id:          match_id.to_string(),
        our_faction_key:   our_faction_key.to_string(),
        enemy_faction_key: enemy_faction_key.to_string(),
        our_team_name:     team_name(our_faction_key),
        enemy_team_name:   team_name(enemy_faction_key),
        map_name:          extract_map_name(match_doc),
        room_url:          room_url(match_id),
        our_roster:        roster(our_faction_key),
        enemy_roster:      roster(enemy_faction_key),
    }
}

// ── Profil hráče ─────────────────────────────────────────────────────────────

/// (faceit_elo, skill_level) z games.cs2, s defaulty 1000 / 5.
pub fn player_game_stats(profile: &Value) -> (i64, u32) {
    let game = profile.get("games").and_then(|g| g.get(GAME_ID));
    let elo = game
        .and_then(|g| g.get("faceit_elo"))
        .and_then(|v| v.as_i64())
        .unwrap_or(1000);
    let level = game
        .and_then(|g| g.get("skill_level"))
        .and_then(|v| v.as_u64())
        .unwrap_or(5) as u32;
    (elo, level)
}

/// steam_id_64 s fallbacky — jen pro diagnostický výstup.
pub fn extract_steam_id_64(profile: &Value) -> Option<String> {
    let candidates = [
        profile.get("steam_id_64"),
        profile.get("platforms").and_then(|p| p.get("steam")),
        profile.get("new_steam_id"),
    ];
    for candidate in candidates.into_iter().flatten() {
        if let Some(s) = candidate.as_str() {
            let s = s.trim();
            if !s.is_empty() {
                return Some(s.to_string());
            }
        }
    }
    None
}

// ── Resolver ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Resolution {
    pub player_id:         String,
    pub resolved_nickname: String,
    pub player_elo:        i64,
    pub player_level:      u32,
    pub match_id:          String,
    pub our_faction_key:   String,
    pub enemy_faction_key: String,
    /// Který tier match našel — jde do logů a debug výstupu.
    pub tier:              String,
    pub match_doc:         Value,
}

pub struct MatchResolver<'a> {
    data: &'a FaceitDataClient,
    web:  &'a FaceitWebClient,
    /// Heuristika "neznámý status bez finished_at = možná aktivní" v tieru 4.
    pub lax_active_fallback: bool,
}

impl<'a> MatchResolver<'a> {
    pub fn new(data: &'a FaceitDataClient, web: &'a FaceitWebClient) -> Self {
        Self { data, web, lax_active_fallback: true }
    }

    pub fn with_lax_active_fallback(mut self, enabled: bool) -> Self {
        self.lax_active_fallback = enabled;
        self
    }

    pub async fn resolve(
        &self,
        nickname: &str,
        forced_match_id: Option<&str>,
    ) -> Result<Resolution, ResolveError> {
        // ── Hráč ────────────────────────────────────────────────────────────
        let lookup = self
            .data
            .get_player_by_nickname(nickname)
            .await
            .ok_or_else(|| ResolveError::PlayerNotFound { nickname: nickname.to_string() })?;

        let player_id = lookup
            .get("player_id")
            .and_then(|v| v.as_str())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ResolveError::PlayerNotFound { nickname: nickname.to_string() })?;

        // /players?nickname bývá částečný — refresh detailního profilu.
        let profile = self.data.get_player(&player_id).await.unwrap_or_else(|| lookup.clone());

        let resolved_nickname = profile
            .get("nickname")
            .and_then(|v| v.as_str())
            .or_else(|| lookup.get("nickname").and_then(|v| v.as_str()))
            .unwrap_or(nickname)
            .trim()
            .to_string();
        let (player_elo, player_level) = player_game_stats(&profile);

        // ── Match id přes tiery ─────────────────────────────────────────────
        let mut tried: Vec<String> = Vec::new();

        let found = match choose_static_match_id(forced_match_id, &profile, &lookup) {
            Some((id, tier)) => Some((id, tier.to_string())),
            None => {
                tried.push("forced/profile: no plausible match id".to_string());
                let mut found = self.resolve_via_web_groups(&player_id, &mut tried).await;
                if found.is_none() {
                    found = self.resolve_via_history(&player_id, &mut tried).await;
                }
                found
            }
        };

        let (match_id, tier) = found.ok_or_else(|| ResolveError::NoActiveMatch {
            nickname: nickname.to_string(),
            detail: tried
                .iter()
                .map(|t| format!("  - {t}"))
                .collect::<Vec<_>>()
                .join("\n"),
        })?;

        info!("Match {match_id} resolved via tier '{tier}'");

        // ── Detail + frakce ─────────────────────────────────────────────────
        let match_doc = self
            .data
            .get_match(&match_id)
            .await
            .ok_or_else(|| ResolveError::MatchUnavailable { match_id: match_id.clone() })?;

        let teams = match_doc.get("teams").cloned().unwrap_or(Value::Null);
        let faction_keys: Vec<String> = teams
            .as_object()
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default();

        if faction_keys.len() < 2 {
            return Err(ResolveError::MalformedTeams {
                match_id,
                found: faction_keys.len(),
            });
        }

        let our_faction_key =
            resolve_player_faction(&teams, &player_id, &[nickname, &resolved_nickname])
                .ok_or_else(|| {
                    let preview = faction_keys
                        .iter()
                        .map(|fk| {
                            let members = teams
                                .get(fk)
                                .map(roster_preview)
                                .filter(|p| !p.is_empty())
                                .unwrap_or_else(|| "no members detected".to_string());
                            format!("    - {fk}: {members}")
                        })
                        .collect::<Vec<_>>()
                        .join("\n");
                    ResolveError::FactionNotFound {
                        nickname: nickname.to_string(),
                        resolved_nickname: resolved_nickname.clone(),
                        player_id: player_id.clone(),
                        match_id: match_id.clone(),
                        roster_preview: preview,
                    }
                })?;

        let enemy_faction_key = faction_keys
            .iter()
            .find(|k| **k != our_faction_key)
            .cloned()
            .ok_or_else(|| ResolveError::MalformedTeams {
                match_id: match_id.clone(),
                found: 1,
            })?;

        Ok(Resolution {
            player_id,
            resolved_nickname,
            player_elo,
            player_level,
            match_id,
            our_faction_key,
            enemy_faction_key,
            tier,
            match_doc,
        })
    }

    async fn resolve_via_web_groups(
        &self,
        player_id: &str,
        tried: &mut Vec<String>,
    ) -> Option<(String, String)> {
        let Some(response) = self.web.group_by_state(player_id).await else {
            tried.push("web groupByState: unavailable".to_string());
            return None;
        };
        let payload = response.get("payload").cloned().unwrap_or(Value::Null);
        match pick_match_from_groups(&payload) {
            Some((id, state)) => {
                debug!("groupByState hit: {id} (state {state})");
                Some((id, "web_groups".to_string()))
            }
            None => {
                tried.push("web groupByState: no match in any state group".to_string());
                None
            }
        }
    }

    async fn resolve_via_history(
        &self,
        player_id: &str,
        tried: &mut Vec<String>,
    ) -> Option<(String, String)> {
        let now = Utc::now().timestamp();
        let history = self
            .data
            .get_player_history(
                player_id,
                HISTORY_SCAN_LIMIT,
                Some(now - HISTORY_LOOKBACK_SECS),
                None,
            )
            .await;

        let Some(history) = history else {
            tried.push("history: unavailable".to_string());
            return None;
        };

        let items = history
            .get("items")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();

        let mut checked: Vec<String> = Vec::new();
        for item in &items {
            let mid = item
                .get("match_id")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .trim();
            if !is_plausible_match_id(mid) {
                continue;
            }
            let Some(detail) = self.data.get_match(mid).await else {
                checked.push(format!("{mid}:unreachable"));
                continue;
            };
            let status = detail
                .get("status")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown")
                .to_lowercase();
            checked.push(format!("{mid}:{status}"));

            match check_active_match_payload(&detail) {
                ActiveCheck::Active => return Some((mid.to_string(), "history".to_string())),
                ActiveCheck::PossiblyActive if self.lax_active_fallback => {
                    warn!(
                        "Match {mid} has status '{status}' and no finished_at — \
                         accepting as possibly active (low-confidence fallback)"
                    );
                    return Some((mid.to_string(), "history".to_string()));
                }
                _ => {}
            }
        }

        if checked.is_empty() {
            tried.push("history: no plausible match in the last 24h".to_string());
        } else {
            tried.push(format!("history: none active ({})", checked.join(", ")));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const MID: &str = "1-f00dcafe-1234-5678-9abc-def012345678";

    #[test]
    fn plausibility_pattern() {
        assert!(is_plausible_match_id(MID));
        assert!(is_plausible_match_id("f00dcafe-1234-5678-9abc-def012345678"));
        assert!(is_plausible_match_id("  1-aaaaaaaaaaaaaaaaaaaaaa  "));
        assert!(!is_plausible_match_id(""));
        assert!(!is_plausible_match_id("12345"));
        assert!(!is_plausible_match_id("not-a-match-id"));
        assert!(!is_plausible_match_id("xyz-ghijklmnopqrstuvwxyz"));
    }

    #[test]
    fn nickname_normalization() {
        assert_eq!(normalize_nickname("  S1m ple "), "s1mple");
        assert_eq!(normalize_nickname("NiKo"), "niko");
        assert_eq!(normalize_nickname("\tZy\u{00A0}wOo\n"), "zywoo");
    }

    #[test]
    fn deep_search_respects_depth_bound() {
        let shallow = json!({ "a": { "b": { "match_id": MID } } });
        assert_eq!(find_match_id_deep(&shallow), Some(MID.to_string()));

        // klíč až v hloubce 7 — mimo limit 5
        let deep = json!({
            "l1": { "l2": { "l3": { "l4": { "l5": { "l6": { "match_id": MID } } } } } }
        });
        assert_eq!(find_match_id_deep(&deep), None);
    }

    #[test]
    fn deep_search_ignores_implausible_values() {
        let doc = json!({ "match_id": "garbage", "nested": { "faceit_match_id": MID } });
        assert_eq!(find_match_id_deep(&doc), Some(MID.to_string()));
    }

    #[test]
    fn deep_search_matches_key_case_insensitively() {
        let doc = json!({ "wrapper": { "Active_Match_Id": MID } });
        assert_eq!(find_match_id_deep(&doc), Some(MID.to_string()));
    }

    #[test]
    fn profile_fields_win_over_deep_scan() {
        let profile = json!({
            "games": { "cs2": { "active_match_id": MID } },
            "something": { "match_id": "1-deadbeef-9999-8888-7777-666655554444" }
        });
        assert_eq!(extract_active_match_id(&profile), Some(MID.to_string()));
    }

    #[test]
    fn forced_id_beats_conflicting_profile_id() {
        let other = "1-deadbeef-9999-8888-7777-666655554444";
        let profile = json!({ "active_match_id": other });
        let lookup = json!({});

        let (id, tier) = choose_static_match_id(Some(MID), &profile, &lookup).unwrap();
        assert_eq!(id, MID);
        assert_eq!(tier, "forced");
    }

    #[test]
    fn implausible_forced_id_falls_back_to_profile() {
        let profile = json!({ "active_match_id": MID });
        let (id, tier) = choose_static_match_id(Some("nonsense"), &profile, &json!({})).unwrap();
        assert_eq!(id, MID);
        assert_eq!(tier, "profile");
    }

    #[test]
    fn group_state_priority_order() {
        let payload = json!({
            "READY":   [{ "id": "ready-match" }],
            "ONGOING": [{ "id": "ongoing-match" }],
            "SCHEDULED": [{ "id": "scheduled-match" }]
        });
        let (id, state) = pick_match_from_groups(&payload).unwrap();
        assert_eq!(id, "ongoing-match");
        assert_eq!(state, "ONGOING");
    }

    #[test]
    fn group_state_unknown_group_as_last_resort() {
        let payload = json!({
            "SCHEDULED": [{ "match_id": "sched-match" }],
            "ONGOING": []
        });
        let (id, state) = pick_match_from_groups(&payload).unwrap();
        assert_eq!(id, "sched-match");
        assert_eq!(state, "SCHEDULED");

        assert!(pick_match_from_groups(&json!({})).is_none());
        assert!(pick_match_from_groups(&json!({ "ONGOING": [] })).is_none());
    }

    #[test]
    fn active_payload_check() {
        assert_eq!(
            check_active_match_payload(&json!({ "status": "ONGOING" })),
            ActiveCheck::Active
        );
        assert_eq!(
            check_active_match_payload(&json!({ "status": "finished", "finished_at": 123 })),
            ActiveCheck::Inactive
        );
        // terminální status i bez finished_at je neaktivní
        assert_eq!(
            check_active_match_payload(&json!({ "status": "cancelled" })),
            ActiveCheck::Inactive
        );
        // neznámý status bez finished_at → jen "možná aktivní"
        assert_eq!(
            check_active_match_payload(&json!({ "status": "weird_state" })),
            ActiveCheck::PossiblyActive
        );
        assert_eq!(
            check_active_match_payload(&json!({})),
            ActiveCheck::PossiblyActive
        );
        assert_eq!(
            check_active_match_payload(&json!({ "status": "weird_state", "finished_at": 99 })),
            ActiveCheck::Inactive
        );
    }

    fn sample_teams() -> Value {
        json!({
            "faction_alpha": {
                "name": "Alpha",
                "roster": [
                    { "player_id": "p1", "nickname": "One" },
                    { "player_id": "p2", "nickname": "Two" }
                ]
            },
            "faction_beta": {
                "name": "Beta",
                "players": {
                    "p3": { "nickname": "Three" },
                    "p4": { "nickname": "Four" }
                },
                "captain": "p5"
            }
        })
    }

    #[test]
    fn faction_by_player_id_in_list_roster() {
        let teams = sample_teams();
        assert_eq!(
            resolve_player_faction(&teams, "p2", &[]).as_deref(),
            Some("faction_alpha")
        );
    }

    #[test]
    fn faction_by_id_injected_from_map_key() {
        let teams = sample_teams();
        assert_eq!(
            resolve_player_faction(&teams, "p3", &[]).as_deref(),
            Some("faction_beta")
        );
    }

    #[test]
    fn faction_by_bare_captain_id() {
        let teams = sample_teams();
        assert_eq!(
            resolve_player_faction(&teams, "p5", &[]).as_deref(),
            Some("faction_beta")
        );
    }

    #[test]
    fn faction_by_normalized_nickname_fallback() {
        let teams = sample_teams();
        assert_eq!(
            resolve_player_faction(&teams, "unknown-id", &["  fOuR "]).as_deref(),
            Some("faction_beta")
        );
        assert!(resolve_player_faction(&teams, "unknown-id", &["nobody"]).is_none());
    }

    #[test]
    fn faction_resolution_is_order_independent() {
        // stejný obsah, opačné pořadí vložení klíčů
        let forward = sample_teams();
        let reversed = json!({
            "faction_beta": forward["faction_beta"].clone(),
            "faction_alpha": forward["faction_alpha"].clone(),
        });
        for teams in [&forward, &reversed] {
            assert_eq!(
                resolve_player_faction(teams, "p1", &[]).as_deref(),
                Some("faction_alpha")
            );
            assert_eq!(
                resolve_player_faction(teams, "p4", &[]).as_deref(),
                Some("faction_beta")
            );
        }
    }

    #[test]
    fn roster_preview_caps_at_five() {
        let team = json!({
            "roster": [
                { "player_id": "a", "nickname": "n1" },
                { "player_id": "b", "nickname": "n2" },
                { "player_id": "c", "nickname": "n3" },
                { "player_id": "d", "nickname": "n4" },
                { "player_id": "e", "nickname": "n5" },
                { "player_id": "f", "nickname": "n6" }
            ]
        });
        let preview = roster_preview(&team);
        assert_eq!(preview, "n1, n2, n3, n4, n5");
    }

    #[test]
    fn match_context_extraction() {
        let match_doc = json!({
            "teams": sample_teams(),
            "voting": { "map": { "pick": ["de_mirage"] } }
        });
        let ctx = build_match_context(&match_doc, MID, "faction_alpha", "faction_beta");
        assert_eq!(ctx.our_team_name, "Alpha");
        assert_eq!(ctx.enemy_team_name, "Beta");
        assert_eq!(ctx.map_name, "de_mirage");
        assert_eq!(ctx.our_roster.len(), 2);
        assert_eq!(ctx.enemy_roster.len(), 3); // 2 z mapy + captain
        assert!(ctx.room_url.ends_with(MID));
    }

    #[test]
    fn map_name_defaults_to_unknown() {
        assert_eq!(extract_map_name(&json!({})), "unknown");
        assert_eq!(extract_map_name(&json!({ "voting": { "map": { "pick": [] } } })), "unknown");
    }

    #[test]
    fn steam_id_fallback_chain() {
        assert_eq!(
            extract_steam_id_64(&json!({ "steam_id_64": "765611" })).as_deref(),
            Some("765611")
        );
        assert_eq!(
            extract_steam_id_64(&json!({ "platforms": { "steam": "765622" } })).as_deref(),
            Some("765622")
        );
        assert_eq!(
            extract_steam_id_64(&json!({ "new_steam_id": "STEAM_1:1:1" })).as_deref(),
            Some("STEAM_1:1:1")
        );
        assert!(extract_steam_id_64(&json!({})).is_none());
    }

    #[test]
    fn player_game_stats_defaults() {
        let profile = json!({ "games": { "cs2": { "faceit_elo": 2345, "skill_level": 10 } } });
        assert_eq!(player_game_stats(&profile), (2345, 10));
        assert_eq!(player_game_stats(&json!({})), (1000, 5));
    }
}
