//! Průchod celým výpočtem nad fixture match dokumentem:
//! frakce → kontext → metriky → base prob → live skóre → dynamic prob.

use live_score::{extract_score_data_api, ScoreSnapshot};
use match_resolver::{build_match_context, resolve_player_faction};
use prediction_engine::{
    base_win_probability, blend_probabilities, compute_score_probability, round_win_probability,
    team_score, ModelConfig, PlayerMetrics,
};
use serde_json::{json, Value};

const MID: &str = "1-f00dcafe-1234-5678-9abc-def012345678";

fn fixture_match_doc() -> Value {
    json!({
        "status": "ONGOING",
        "teams": {
            "red": {
                "name": "Red Squad",
                "roster": (1..=5).map(|i| json!({
                    "player_id": format!("red-{i}"),
                    "nickname": format!("RedPlayer{i}")
                })).collect::<Vec<_>>()
            },
            "blue": {
                "name": "Blue Crew",
                "roster": (1..=5).map(|i| json!({
                    "player_id": format!("blue-{i}"),
                    "nickname": format!("BluePlayer{i}")
                })).collect::<Vec<_>>()
            }
        },
        "voting": { "map": { "pick": ["de_mirage"] } }
    })
}

fn team_metrics(elo: i64, kd: f64, winrate: f64, map_wr: f64, hs: f64, kills: f64) -> Vec<PlayerMetrics> {
    (0..5)
        .map(|i| PlayerMetrics {
            elo,
            kd,
            winrate,
            map_winrate: map_wr,
            hs_pct: hs,
            avg_kills: kills,
            matches_analyzed: 30,
            map_matches: 8,
            ..PlayerMetrics::neutral(format!("p{i}"), format!("id{i}"))
        })
        .collect()
}

#[test]
fn faction_attribution_and_context_from_match_document() {
    let doc = fixture_match_doc();
    let teams = &doc["teams"];

    let our = resolve_player_faction(teams, "red-3", &[]).expect("player must be found");
    assert_eq!(our, "red");
    let enemy = if our == "red" { "blue" } else { "red" };

    let ctx = build_match_context(&doc, MID, &our, enemy);
    assert_eq!(ctx.our_team_name, "Red Squad");
    assert_eq!(ctx.enemy_team_name, "Blue Crew");
    assert_eq!(ctx.map_name, "de_mirage");
    assert_eq!(ctx.our_roster.len(), 5);
    assert_eq!(ctx.enemy_roster.len(), 5);
}

#[test]
fn dynamic_probability_grows_with_a_growing_lead() {
    let cfg = ModelConfig::default();

    let ours = team_metrics(2000, 1.2, 0.60, 0.55, 0.40, 18.0);
    let enemy = team_metrics(1400, 0.9, 0.45, 0.40, 0.30, 14.0);

    let our_score = team_score(&ours, &cfg);
    let enemy_score = team_score(&enemy, &cfg);
    assert!(our_score > enemy_score);

    let base = base_win_probability(our_score, enemy_score, &cfg);
    assert!(base > 0.5 && base <= 0.95, "base out of expected range: {base}");

    let p_round = round_win_probability(base, &cfg);

    let progression = [(0u32, 0u32), (3, 1), (7, 4), (12, 5)];
    let mut previous = 0.0_f64;
    for (our_rounds, enemy_rounds) in progression {
        let score_prob =
            compute_score_probability(our_rounds, enemy_rounds, p_round, cfg.rounds_to_win);
        let dynamic = blend_probabilities(base, score_prob, our_rounds, enemy_rounds, &cfg);

        assert!((0.02..=0.98).contains(&dynamic), "dynamic out of clamp: {dynamic}");
        assert!(
            dynamic >= previous,
            "dynamic must not drop while the lead grows: {previous} -> {dynamic} at {our_rounds}:{enemy_rounds}"
        );
        previous = dynamic;
    }

    assert!(previous >= 0.95, "12:5 lead for the favorite should be decisive, got {previous}");
}

#[test]
fn terminal_score_is_exact_and_dynamic_stays_clamped() {
    let cfg = ModelConfig::default();
    let base = 0.847;
    let p_round = round_win_probability(base, &cfg);

    let score_prob = compute_score_probability(13, 5, p_round, cfg.rounds_to_win);
    assert_eq!(score_prob, 1.0);

    let dynamic = blend_probabilities(base, score_prob, 13, 5, &cfg);
    assert!((dynamic - cfg.dynamic_ceil).abs() < 1e-12, "expected ceiling, got {dynamic}");
}

#[test]
fn extracted_live_score_feeds_the_model() {
    let doc = json!({
        "results": { "score": { "red": 12, "blue": 5 } },
        "teams": { "red": { "name": "Red Squad" }, "blue": { "name": "Blue Crew" } }
    });

    let (our, enemy) = extract_score_data_api(&doc, "red", "blue").expect("score present");
    assert_eq!((our, enemy), (12, 5));

    let prob = compute_score_probability(our, enemy, 0.7, 13);
    assert!(prob > 0.999, "one round from victory must be near-certain, got {prob}");
}

#[test]
fn unavailable_snapshot_is_not_terminal() {
    let cfg = ModelConfig::default();
    let snap = ScoreSnapshot::unavailable();
    assert!(snap.our_rounds < cfg.rounds_to_win && snap.enemy_rounds < cfg.rounds_to_win);

    // "no data yet" se chová jako 0:0 — model vrací čistě base-driven odhad
    let score_prob = compute_score_probability(snap.our_rounds, snap.enemy_rounds, 0.5, 13);
    assert!((score_prob - 0.5).abs() < 1e-12);
}
