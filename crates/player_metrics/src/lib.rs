/// WinProbLive — Player metrics
///
/// Agregace per-match statistik hráče (posledních N zápasů) do metrik pro
/// skórování. Upstream má dvě varianty casingu klíčů ("Kills" vs "kills"),
/// record s nečíselnými hodnotami se přeskakuje, prázdná historie padá na
/// neutrální priory. Metriky všech ~10 hráčů se stahují souběžně
/// (fan-out/fan-in, každý task má vlastní akumulátor).

use faceit_api::{FaceitDataClient, GAME_ID};
use futures_util::future::join_all;
use match_resolver::{extract_member_id, extract_member_nickname};
use prediction_engine::PlayerMetrics;
use serde_json::Value;
use tracing::debug;

/// Hodnota pod jedním ze dvou casingů; chybějící klíč → default,
/// přítomný ale nečíselný → None (record se zahodí).
fn coerce_stat(stats: &Value, upper: &str, lower: &str, default: f64) -> Option<f64> {
    let value = stats.get(upper).or_else(|| stats.get(lower));
    match value {
        None => Some(default),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    }
}

fn stat_string(stats: &Value, upper: &str, lower: &str, default: &str) -> String {
    match stats.get(upper).or_else(|| stats.get(lower)) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => default.to_string(),
    }
}

struct RecordStats {
    kills:     f64,
    deaths:    f64,
    headshots: f64,
    win:       bool,
    map:       String,
}

fn parse_stats_record(item: &Value) -> Option<RecordStats> {
    let stats = item.get("stats")?;
    Some(RecordStats {
        kills:     coerce_stat(stats, "Kills", "kills", 0.0)?,
        deaths:    coerce_stat(stats, "Deaths", "deaths", 1.0)?,
        headshots: coerce_stat(stats, "Headshots", "headshots", 0.0)?,
        win:       stat_string(stats, "Result", "result", "0") == "1",
        map:       stat_string(stats, "Map", "map", ""),
    })
}

fn clean_map_name(name: &str) -> String {
    name.to_lowercase().replace("de_", "")
}

/// Čistá agregace: items → metriky. `base` nese nickname/id/elo/level,
/// poměry se dopočítají (nebo zůstanou priory, když nejde nic spočítat).
pub fn aggregate_metrics(mut base: PlayerMetrics, items: &[Value], map_name: &str) -> PlayerMetrics {
    base.matches_analyzed = items.len();

    let mut total_kills = 0.0_f64;
    let mut total_deaths = 0.0_f64;
    let mut total_hs = 0.0_f64;
    let mut wins = 0usize;
    let mut parsed = 0usize;
    let mut map_wins = 0usize;
    let mut map_total = 0usize;

    let map_clean = clean_map_name(map_name);

    for item in items {
        let Some(record) = parse_stats_record(item) else {
            debug!("Skipping malformed stats record");
            continue;
        };

        total_kills += record.kills;
        total_deaths += record.deaths;
        total_hs += record.headshots;
        parsed += 1;
        if record.win {
            wins += 1;
        }

        // Win rate na aktuální mapě (substring match po očištění prefixu)
        if !map_clean.is_empty() && clean_map_name(&record.map).contains(&map_clean) {
            map_total += 1;
            if record.win {
                map_wins += 1;
            }
        }
    }

    if parsed > 0 {
        base.kd = total_kills / total_deaths.max(1.0);
        base.winrate = wins as f64 / parsed as f64;
        base.avg_kills = total_kills / parsed as f64;
        base.hs_pct = total_hs / total_kills.max(1.0);
    }

    if map_total > 0 {
        base.map_winrate = map_wins as f64 / map_total as f64;
        base.map_matches = map_total;
    } else {
        // Málo dat na mapě → obecný winrate, map_matches=0 to flaguje
        base.map_winrate = base.winrate;
        base.map_matches = 0;
    }

    base
}

/// Metriky jednoho hráče: elo/level refresh z detailu hráče (roster entry
/// bývá zastaralý), pak stats za posledních `stats_limit` zápasů.
pub async fn fetch_player_metrics(
    client: &FaceitDataClient,
    roster_entry: &Value,
    map_name: &str,
    stats_limit: usize,
) -> PlayerMetrics {
    let nickname = extract_member_nickname(roster_entry).unwrap_or_else(|| "?".to_string());
    let Some(player_id) = extract_member_id(roster_entry) else {
        debug!("Roster entry for '{nickname}' has no player id");
        return PlayerMetrics::neutral(nickname, "");
    };

    let mut base = PlayerMetrics::neutral(nickname, player_id.clone());
    if let Some(elo) = roster_entry.get("faceit_elo").and_then(|v| v.as_i64()) {
        base.elo = elo;
    }
    if let Some(level) = roster_entry.get("game_skill_level").and_then(|v| v.as_u64()) {
        base.level = level as u32;
    }

    if let Some(detail) = client.get_player(&player_id).await {
        let game = detail.get("games").and_then(|g| g.get(GAME_ID));
        if let Some(elo) = game.and_then(|g| g.get("faceit_elo")).and_then(|v| v.as_i64()) {
            base.elo = elo;
        }
        if let Some(level) = game.and_then(|g| g.get("skill_level")).and_then(|v| v.as_u64()) {
            base.level = level as u32;
        }
    }

    let Some(stats) = client.get_player_stats_matches(&player_id, stats_limit).await else {
        return base;
    };
    let items = stats
        .get("items")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default();

    aggregate_metrics(base, &items, map_name)
}

/// Fan-out přes oba rostery najednou, fan-in a rozdělení po frakcích.
/// Žádný sdílený mutable stav — každý fetch vrací immutable výsledek.
pub async fn collect_team_metrics(
    client: &FaceitDataClient,
    our_roster: &[Value],
    enemy_roster: &[Value],
    map_name: &str,
    stats_limit: usize,
) -> (Vec<PlayerMetrics>, Vec<PlayerMetrics>) {
    let tasks = our_roster
        .iter()
        .map(|m| (true, m))
        .chain(enemy_roster.iter().map(|m| (false, m)))
        .map(|(is_ours, member)| async move {
            (is_ours, fetch_player_metrics(client, member, map_name, stats_limit).await)
        });

    let mut our = Vec::new();
    let mut enemy = Vec::new();
    for (is_ours, metrics) in join_all(tasks).await {
        if is_ours {
            our.push(metrics);
        } else {
            enemy.push(metrics);
        }
    }
    (our, enemy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(kills: Value, deaths: Value, hs: Value, result: &str, map: &str) -> Value {
        json!({
            "stats": {
                "Kills": kills,
                "Deaths": deaths,
                "Headshots": hs,
                "Result": result,
                "Map": map
            }
        })
    }

    #[test]
    fn aggregates_uppercase_schema() {
        let items = vec![
            record(json!(20), json!(10), json!(10), "1", "de_mirage"),
            record(json!(10), json!(10), json!(2), "0", "de_inferno"),
        ];
        let m = aggregate_metrics(PlayerMetrics::neutral("p", "id"), &items, "de_mirage");

        assert_eq!(m.matches_analyzed, 2);
        assert!((m.kd - 30.0 / 20.0).abs() < 1e-12);
        assert!((m.winrate - 0.5).abs() < 1e-12);
        assert!((m.avg_kills - 15.0).abs() < 1e-12);
        assert!((m.hs_pct - 12.0 / 30.0).abs() < 1e-12);
        assert_eq!(m.map_matches, 1);
        assert!((m.map_winrate - 1.0).abs() < 1e-12);
    }

    #[test]
    fn aggregates_lowercase_schema_with_string_numbers() {
        let items = vec![json!({
            "stats": { "kills": "18", "deaths": "9", "headshots": "6", "result": "1", "map": "Mirage" }
        })];
        let m = aggregate_metrics(PlayerMetrics::neutral("p", "id"), &items, "de_mirage");
        assert!((m.kd - 2.0).abs() < 1e-12);
        assert!((m.winrate - 1.0).abs() < 1e-12);
        // "mirage" ⊂ "mirage" i bez de_ prefixu
        assert_eq!(m.map_matches, 1);
    }

    #[test]
    fn malformed_record_is_skipped_not_fatal() {
        let items = vec![
            record(json!("garbage"), json!(5), json!(1), "1", "de_nuke"),
            record(json!(20), json!(10), json!(5), "1", "de_nuke"),
        ];
        let m = aggregate_metrics(PlayerMetrics::neutral("p", "id"), &items, "de_nuke");
        // matches_analyzed počítá i nezparsovatelné, poměry jen z validních
        assert_eq!(m.matches_analyzed, 2);
        assert!((m.winrate - 1.0).abs() < 1e-12);
        assert!((m.kd - 2.0).abs() < 1e-12);
    }

    #[test]
    fn empty_history_keeps_neutral_priors() {
        let m = aggregate_metrics(PlayerMetrics::neutral("p", "id"), &[], "de_mirage");
        assert_eq!(m.matches_analyzed, 0);
        assert!((m.kd - 1.0).abs() < 1e-12);
        assert!((m.winrate - 0.5).abs() < 1e-12);
        assert!((m.map_winrate - 0.5).abs() < 1e-12);
        assert!((m.hs_pct - 0.0).abs() < 1e-12);
        assert!((m.avg_kills - 15.0).abs() < 1e-12);
    }

    #[test]
    fn map_winrate_falls_back_to_overall_winrate() {
        let items = vec![
            record(json!(20), json!(10), json!(5), "1", "de_inferno"),
            record(json!(10), json!(12), json!(3), "0", "de_nuke"),
        ];
        let m = aggregate_metrics(PlayerMetrics::neutral("p", "id"), &items, "de_ancient");
        assert_eq!(m.map_matches, 0);
        assert!((m.map_winrate - m.winrate).abs() < 1e-12);
    }

    #[test]
    fn missing_fields_use_defaults() {
        // deaths chybí → default 1, kills/hs chybí → 0
        let items = vec![json!({ "stats": { "Result": "1" } })];
        let m = aggregate_metrics(PlayerMetrics::neutral("p", "id"), &items, "");
        assert!((m.kd - 0.0).abs() < 1e-12);
        assert!((m.avg_kills - 0.0).abs() < 1e-12);
        assert!((m.hs_pct - 0.0).abs() < 1e-12);
        assert!((m.winrate - 1.0).abs() < 1e-12);
    }

    #[test]
    fn record_without_stats_object_is_skipped() {
        let items = vec![json!({ "unexpected": true })];
        let m = aggregate_metrics(PlayerMetrics::neutral("p", "id"), &items, "");
        assert!((m.winrate - 0.5).abs() < 1e-12, "priors must survive");
    }
}
