//! Konzolový výstup — tabulky hráčů, probability bar, verdikty.
//! Čistá prezentace: stejná čísla jako v JSON event streamu.

use chrono::Local;
use prediction_engine::{player_score, EloGap, ModelConfig, PlayerMetrics, SampleQuality};

const BAR_LEN: usize = 50;
const RULE: &str = "════════════════════════════════════════════════════════════════════════════════";
const THIN_RULE: &str = "────────────────────────────────────────────────────────────────────────────────";

fn prob_bar(prob: f64) -> String {
    let filled = (prob * BAR_LEN as f64).round() as usize;
    let filled = filled.min(BAR_LEN);
    format!("{}{}", "█".repeat(filled), "░".repeat(BAR_LEN - filled))
}

fn verdict_label(prob: f64) -> &'static str {
    if prob >= 0.65 {
        "✅ VERY FAVORABLE"
    } else if prob >= 0.55 {
        "🟢 Slightly favorable"
    } else if prob >= 0.45 {
        "⚖️  Even match"
    } else if prob >= 0.35 {
        "🔴 Unfavorable"
    } else {
        "❌ VERY UNFAVORABLE"
    }
}

/// Tabulka metrik jednoho týmu; vrací průměrné skóre pro kontrolu v patičce.
pub fn print_team_table(
    team_name: &str,
    members: &[PlayerMetrics],
    is_ours: bool,
    cfg: &ModelConfig,
) -> f64 {
    let tag = if is_ours { "  ◄ YOUR TEAM" } else { "" };
    println!("\n{RULE}\n  {}{tag}\n{RULE}", team_name.to_uppercase());
    println!(
        "  {:<20} {:>6} {:>4} {:>6} {:>6} {:>8} {:>6} {:>7}",
        "Player", "ELO", "Lvl", "K/D", "WR%", "Map WR%", "HS%", "Score"
    );
    println!("  {}", "-".repeat(74));

    let mut scores = Vec::with_capacity(members.len());
    for m in members {
        let score = player_score(m, cfg);
        scores.push(score);
        // hvězdička = map winrate spadl na obecný winrate
        let map_wr = format!(
            "{:.0}%{}",
            m.map_winrate * 100.0,
            if m.map_matches == 0 { "*" } else { "" }
        );
        let nickname: String = m.nickname.chars().take(19).collect();
        println!(
            "  {:<20} {:>6} {:>4} {:>6.2} {:>5.0}% {:>8} {:>5.0}% {:>7.3}",
            nickname,
            m.elo,
            m.level,
            m.kd,
            m.winrate * 100.0,
            map_wr,
            m.hs_pct * 100.0,
            score,
        );
    }

    let avg = if scores.is_empty() {
        0.0
    } else {
        scores.iter().sum::<f64>() / scores.len() as f64
    };
    println!("  {}", "-".repeat(74));
    println!("  {:<20} {avg:.4}", "Team average");
    avg
}

fn print_prob_block(team: &str, prob: f64, map_name: &str, label: &str) {
    println!("\n{RULE}");
    if !label.is_empty() {
        println!("  🎯  {label}");
    }
    println!("  🗺️  MAP  : {}", map_name.to_uppercase());
    println!("  Team     : {team}");
    println!("{RULE}");
    println!(
        "\n  [{}]  {:.1}%  ← {}\n",
        prob_bar(prob),
        prob * 100.0,
        verdict_label(prob)
    );
}

pub fn print_static_analysis(
    our_team: &str,
    enemy_team: &str,
    our_metrics: &[PlayerMetrics],
    enemy_metrics: &[PlayerMetrics],
    base_prob: f64,
    map_name: &str,
    cfg: &ModelConfig,
    elo_gap: &EloGap,
    quality: &SampleQuality,
) {
    println!("\n\n{RULE}");
    println!("  📊  INITIAL ANALYSIS (player stats only, no live score yet)");
    println!("{RULE}");
    print_team_table(our_team, our_metrics, true, cfg);
    print_team_table(enemy_team, enemy_metrics, false, cfg);
    print_prob_block(our_team, base_prob, map_name, "BASE (stats only)");

    if let Some(gap) = elo_gap.avg_elo_gap {
        println!("  Avg ELO gap (us - them) : {gap:+.0}");
    }
    if let (Some(avg), Some(pct)) = (quality.sample_avg_matches, quality.sample_quality_pct) {
        println!(
            "  Sample quality          : {} ({avg:.1}/{} matches/player, {pct:.0}%)",
            quality.sample_quality_label, quality.sample_target_matches
        );
    }
    println!();
}

pub fn print_polling_banner(poll_interval_secs: u64, run_once: bool) {
    println!("\n{RULE}");
    println!("  🔴 LIVE TRACKING STARTED  (refresh every {poll_interval_secs}s)");
    println!("     Press Ctrl+C to stop.");
    if run_once {
        println!("     --once: one live snapshot will be computed, then exit.");
    }
    println!("{RULE}\n");
}

#[allow(clippy::too_many_arguments)]
pub fn print_live_update(
    our_team: &str,
    enemy_team: &str,
    our_rounds: u32,
    enemy_rounds: u32,
    our_side: &str,
    enemy_side: &str,
    base_prob: f64,
    score_prob: f64,
    dynamic_prob: f64,
    source: &str,
    poll_num: u32,
    rounds_to_win: u32,
) {
    let ts = Local::now().format("%H:%M:%S");
    let side = |s: &str| {
        if s.is_empty() {
            String::new()
        } else {
            format!(" [{s}]")
        }
    };

    println!("\n{THIN_RULE}");
    println!("  🔴 LIVE — Poll #{poll_num}  [{ts}]  Source: {source}");
    println!(
        "  Score : {our_team}{} {our_rounds} – {enemy_rounds} {enemy_team}{}",
        side(our_side),
        side(enemy_side)
    );
    println!(
        "  Rounds played : {} / ~{}",
        our_rounds + enemy_rounds,
        2 * (rounds_to_win - 1)
    );
    println!("{THIN_RULE}");

    println!(
        "\n  Win probability (DYNAMIC)   [{}]  {:.1}%",
        prob_bar(dynamic_prob),
        dynamic_prob * 100.0
    );
    println!("  ├─ Base (player stats)    : {:.1}%", base_prob * 100.0);
    println!("  └─ Score (match state)    : {:.1}%", score_prob * 100.0);

    println!(
        "\n  Rounds to win : {our_team} — {} | {enemy_team} — {}",
        rounds_to_win.saturating_sub(our_rounds),
        rounds_to_win.saturating_sub(enemy_rounds)
    );
    println!("\n  Verdict : {}\n", verdict_label(dynamic_prob));
}

pub fn print_match_over(winner: &str, our_rounds: u32, enemy_rounds: u32, we_won: bool) {
    if we_won {
        println!("\n  🏆  VICTORY for {winner} ({our_rounds}–{enemy_rounds})!\n");
    } else {
        println!("\n  ❌  DEFEAT against {winner} ({our_rounds}–{enemy_rounds}).\n");
    }
}
