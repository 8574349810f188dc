/// WinProbLive — Logger
/// Machine-readable event stream (sentinel + JSON na stdout), JSONL audit log

use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

/// Prefix na stdout řádcích s JSON payloadem — parent proces podle něj
/// odliší machine eventy od lidsky čitelného výstupu na stejném streamu.
pub const JSON_SENTINEL: &str = "__LIVEWINPROB_JSON__";

/// Sentinel pro diagnostickou binárku resolve-match.
pub const MATCHID_SENTINEL: &str = "__MATCHID_JSON__";

pub struct EventSink {
    json_stdout: bool,
    log_dir:     Option<PathBuf>,
}

impl EventSink {
    pub fn new(json_stdout: bool, log_dir: Option<PathBuf>) -> Self {
        if let Some(ref dir) = log_dir {
            fs::create_dir_all(dir).ok();
        }
        Self { json_stdout, log_dir }
    }

    /// Emituj event: jeden řádek `<sentinel><compact json>` na stdout
    /// (pokud je --json aktivní) + append do denního JSONL auditu.
    pub fn emit<T: Serialize>(&self, event: &T) {
        match sentinel_line(JSON_SENTINEL, event) {
            Ok(line) => {
                if self.json_stdout {
                    println!("{line}");
                    let _ = std::io::stdout().flush();
                }
                if let Err(e) = self.append_jsonl(event) {
                    tracing::warn!("Event log write failed: {e}");
                }
            }
            Err(e) => tracing::warn!("Event serialization failed: {e}"),
        }
    }

    // Audit řádky (na rozdíl od stdout protokolu) nesou timestamp.
    fn append_jsonl<T: Serialize>(&self, event: &T) -> Result<()> {
        let Some(ref dir) = self.log_dir else {
            return Ok(());
        };
        let mut payload = serde_json::to_value(event)?;
        if let serde_json::Value::Object(ref mut map) = payload {
            map.insert("ts".to_string(), serde_json::Value::String(now_iso()));
        }
        let date  = Utc::now().format("%Y-%m-%d").to_string();
        let path  = dir.join(format!("{date}.jsonl"));
        let line  = serde_json::to_string(&payload)?;
        let mut f = OpenOptions::new().create(true).append(true).open(&path)?;
        writeln!(f, "{line}")?;
        Ok(())
    }
}

pub fn sentinel_line<T: Serialize>(sentinel: &str, event: &T) -> Result<String> {
    Ok(format!("{sentinel}{}", serde_json::to_string(event)?))
}

pub fn now_iso() -> String {
    Utc::now().to_rfc3339()
}

/// Zaokrouhlení pravděpodobností pro JSON výstup.
pub fn round6(v: f64) -> f64 {
    (v * 1e6).round() / 1e6
}

pub fn round2(v: f64) -> f64 {
    (v * 1e2).round() / 1e2
}

// ── Event typy ────────────────────────────────────────────────────────────────

#[derive(Serialize, Debug)]
pub struct InitialAnalysisEvent {
    pub ok:         bool,
    #[serde(rename = "type")]
    pub kind:       &'static str,     // "initial_analysis"
    pub nickname:   String,
    pub player_id:  String,
    pub match_id:   String,
    pub map_name:   String,
    pub our_team:   String,
    pub enemy_team: String,
    pub room_url:   String,
    pub base_win_probability:     f64,
    pub base_win_probability_pct: f64,
    pub avg_elo_our:          Option<f64>,
    pub avg_elo_enemy:        Option<f64>,
    pub avg_elo_gap:          Option<f64>,
    pub sample_avg_matches:   Option<f64>,
    pub sample_quality_pct:   Option<f64>,
    pub sample_quality_label: String,
}

#[derive(Serialize, Debug)]
pub struct LiveUpdateEvent {
    pub ok:          bool,
    #[serde(rename = "type")]
    pub kind:        &'static str,    // "live_update"
    pub poll:        u32,
    pub nickname:    String,
    pub player_id:   String,
    pub match_id:    String,
    pub map_name:    String,
    pub our_team:    String,
    pub enemy_team:  String,
    pub score_our:   u32,
    pub score_enemy: u32,
    pub our_side:    String,          // "CT" | "T" | ""
    pub enemy_side:  String,
    pub score_source: String,
    pub base_win_probability:      f64,
    pub score_win_probability:     f64,
    pub dynamic_win_probability:   f64,
    pub dynamic_win_probability_pct: f64,
}

#[derive(Serialize, Debug)]
pub struct MatchOverEvent {
    pub ok:     bool,
    #[serde(rename = "type")]
    pub kind:   &'static str,         // "match_over"
    pub winner: String,
    pub score:  String,               // "13-9"
}

#[derive(Serialize, Debug)]
pub struct ErrorEvent {
    pub ok:       bool,               // vždy false
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    pub error:    String,
}

impl ErrorEvent {
    pub fn new(nickname: Option<String>, error: impl Into<String>) -> Self {
        Self { ok: false, nickname, error: error.into() }
    }
}
