/// WinProbLive — Live Win Probability
///
/// Co dělá:
///   1. Resolvne player_id a match_id (Data API v4 + interní web API, 4 tiery)
///   2. Stáhne stats posledních 30 zápasů všech 10 hráčů → base_prob
///   3. Polling loop: live skóre každých 115s z více zdrojů
///   4. Kombinuje base_prob (kvalita hráčů) + score_prob (stav zápasu)
///      s vahou rostoucí podle průběhu zápasu
///
/// Spuštění:
///   cargo run --bin live-winprob -- <nickname>            # auto-detekce zápasu
///   cargo run --bin live-winprob -- <nickname> --json     # machine-readable stream
///   cargo run --bin live-winprob -- <nickname> --once     # jeden snapshot a konec
///   cargo run --bin live-winprob -- <nickname> -m <match_id>

mod display;

use anyhow::Result;
use dotenv::dotenv;
use faceit_api::{read_bool_env, ssl_verify_enabled, FaceitDataClient, FaceitWebClient};
use live_score::fetch_live_score;
use logger::{
    round2, round6, ErrorEvent, EventSink, InitialAnalysisEvent, LiveUpdateEvent, MatchOverEvent,
};
use match_resolver::{build_match_context, is_plausible_match_id, MatchResolver};
use player_metrics::collect_team_metrics;
use prediction_engine::{
    base_win_probability, blend_probabilities, compute_avg_elo_gap, compute_sample_quality,
    compute_score_probability, round_win_probability, skill_level_label, team_score, ModelConfig,
};
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

// ── Konfigurace ──────────────────────────────────────────────────────────────

struct AppConfig {
    api_key:             String,
    poll_interval:       Duration,
    stats_limit:         usize,
    verify_ssl:          bool,
    forced_match_id:     Option<String>,
    lax_active_fallback: bool,
    log_dir:             Option<PathBuf>,
}

impl AppConfig {
    fn from_env() -> Option<Self> {
        let api_key = env::var("FACEIT_API_KEY").ok()?.trim().to_string();
        if api_key.is_empty() {
            return None;
        }

        let poll_interval_secs = env::var("WINPROB_POLL_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(115);
        let stats_limit = env::var("WINPROB_STATS_LIMIT")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(30)
            .clamp(1, 100);

        Some(Self {
            api_key,
            poll_interval: Duration::from_secs(poll_interval_secs.max(5)),
            stats_limit,
            verify_ssl: ssl_verify_enabled(),
            forced_match_id: env::var("FACEIT_MATCH_ID")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            lax_active_fallback: read_bool_env("WINPROB_LAX_ACTIVE_FALLBACK", true),
            log_dir: env::var("WINPROB_LOG_DIR").ok().map(PathBuf::from),
        })
    }
}

fn model_config_from_env() -> ModelConfig {
    let mut cfg = ModelConfig::default();
    if let Some(target) = env::var("WINPROB_ROUNDS_TO_WIN")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
    {
        cfg.rounds_to_win = target.clamp(1, 64);
    }
    cfg
}

// ── CLI ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct CliArgs {
    nickname:        Option<String>,
    forced_match_id: Option<String>,
    output_json:     bool,
    run_once:        bool,
}

fn parse_args(argv: &[String]) -> CliArgs {
    let mut args = CliArgs::default();
    let mut positional: Vec<String> = Vec::new();

    let mut i = 0;
    while i < argv.len() {
        let token = argv[i].trim();
        match token {
            "--json" => args.output_json = true,
            "--once" | "--one-shot" => args.run_once = true,
            "--match-id" | "-m" => {
                if i + 1 < argv.len() {
                    args.forced_match_id = Some(argv[i + 1].trim().to_string());
                    i += 1;
                }
            }
            _ => positional.push(token.to_string()),
        }
        i += 1;
    }

    if let Some(first) = positional.first() {
        args.nickname = Some(first.clone());
    }
    // Druhý positional smí být match_id, pokud vypadá věrohodně
    if args.forced_match_id.is_none() {
        if let Some(second) = positional.get(1) {
            if is_plausible_match_id(second) {
                args.forced_match_id = Some(second.clone());
            }
        }
    }

    args
}

// ── Main ─────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let argv: Vec<String> = env::args().skip(1).collect();
    let args = parse_args(&argv);

    let Some(nickname) = args.nickname.clone() else {
        eprintln!("Usage: live-winprob <nickname> [--json] [--once] [-m <match_id>]");
        let sink = EventSink::new(args.output_json, None);
        sink.emit(&ErrorEvent::new(None, "nickname required"));
        std::process::exit(1);
    };

    let Some(mut cfg) = AppConfig::from_env() else {
        eprintln!("[ERROR] FACEIT_API_KEY missing (.env or environment)");
        let sink = EventSink::new(args.output_json, None);
        sink.emit(&ErrorEvent::new(Some(nickname), "FACEIT_API_KEY missing"));
        std::process::exit(1);
    };
    if args.forced_match_id.is_some() {
        cfg.forced_match_id = args.forced_match_id.clone();
    }

    let model = model_config_from_env();
    let sink = EventSink::new(args.output_json, cfg.log_dir.clone());

    info!("=== WinProbLive — FACEIT CS2 win probability ===");
    info!("Poll interval: {}s | stats lookback: {} matches", cfg.poll_interval.as_secs(), cfg.stats_limit);

    let data = FaceitDataClient::new(cfg.api_key.clone(), cfg.verify_ssl);
    let web = FaceitWebClient::new(cfg.verify_ssl);

    // ── [1/4] + [2/4] Resolve hráče a matche ────────────────────────────────
    info!("[1/4] Resolving player '{nickname}'...");
    let resolver =
        MatchResolver::new(&data, &web).with_lax_active_fallback(cfg.lax_active_fallback);

    let resolution = match resolver.resolve(&nickname, cfg.forced_match_id.as_deref()).await {
        Ok(r) => r,
        Err(e) => {
            eprintln!("[ERROR] {e}");
            sink.emit(&ErrorEvent::new(Some(nickname), e.to_string()));
            std::process::exit(1);
        }
    };

    info!(
        "  ✓ {} — ELO {} ({})",
        resolution.resolved_nickname,
        resolution.player_elo,
        skill_level_label(resolution.player_elo)
    );

    let ctx = build_match_context(
        &resolution.match_doc,
        &resolution.match_id,
        &resolution.our_faction_key,
        &resolution.enemy_faction_key,
    );

    info!("[2/4] Match {} (via {})", ctx.match_id, resolution.tier);
    info!("  ✓ Map   : {}", ctx.map_name);
    info!("  ✓ Teams : {} vs {}", ctx.our_team_name, ctx.enemy_team_name);
    info!("  ✓ Room  : {}", ctx.room_url);

    // ── [3/4] Stats všech hráčů (concurrent fan-out) ────────────────────────
    info!(
        "[3/4] Analyzing stats of {} players ({} recent matches each)...",
        ctx.our_roster.len() + ctx.enemy_roster.len(),
        cfg.stats_limit
    );
    let (our_metrics, enemy_metrics) = collect_team_metrics(
        &data,
        &ctx.our_roster,
        &ctx.enemy_roster,
        &ctx.map_name,
        cfg.stats_limit,
    )
    .await;

    if our_metrics.is_empty() || enemy_metrics.is_empty() {
        warn!("One of the rosters produced no metrics — base probability will be weak");
    }

    // ── [4/4] Base probability ──────────────────────────────────────────────
    let our_score = team_score(&our_metrics, &model);
    let enemy_score = team_score(&enemy_metrics, &model);
    let base_prob = base_win_probability(our_score, enemy_score, &model);

    let elo_gap = compute_avg_elo_gap(&our_metrics, &enemy_metrics);
    let all_metrics: Vec<_> = our_metrics
        .iter()
        .chain(enemy_metrics.iter())
        .cloned()
        .collect();
    let quality = compute_sample_quality(&all_metrics, cfg.stats_limit);

    display::print_static_analysis(
        &ctx.our_team_name,
        &ctx.enemy_team_name,
        &our_metrics,
        &enemy_metrics,
        base_prob,
        &ctx.map_name,
        &model,
        &elo_gap,
        &quality,
    );

    sink.emit(&InitialAnalysisEvent {
        ok: true,
        kind: "initial_analysis",
        nickname: nickname.clone(),
        player_id: resolution.player_id.clone(),
        match_id: ctx.match_id.clone(),
        map_name: ctx.map_name.clone(),
        our_team: ctx.our_team_name.clone(),
        enemy_team: ctx.enemy_team_name.clone(),
        room_url: ctx.room_url.clone(),
        base_win_probability: round6(base_prob),
        base_win_probability_pct: round2(base_prob * 100.0),
        avg_elo_our: elo_gap.avg_elo_our,
        avg_elo_enemy: elo_gap.avg_elo_enemy,
        avg_elo_gap: elo_gap.avg_elo_gap,
        sample_avg_matches: quality.sample_avg_matches,
        sample_quality_pct: quality.sample_quality_pct,
        sample_quality_label: quality.sample_quality_label.to_string(),
    });

    display::print_polling_banner(cfg.poll_interval.as_secs(), args.run_once);

    // ── Polling loop ────────────────────────────────────────────────────────
    let mut poll_num: u32 = 0;
    let mut last_emitted: Option<(u32, u32)> = None;

    loop {
        poll_num += 1;
        let snapshot = fetch_live_score(
            &data,
            &web,
            &ctx.match_id,
            &ctx.our_faction_key,
            &ctx.enemy_faction_key,
        )
        .await;

        let p_round = round_win_probability(base_prob, &model);
        let score_prob = compute_score_probability(
            snapshot.our_rounds,
            snapshot.enemy_rounds,
            p_round,
            model.rounds_to_win,
        );
        let dynamic_prob = blend_probabilities(
            base_prob,
            score_prob,
            snapshot.our_rounds,
            snapshot.enemy_rounds,
            &model,
        );

        // Výstup jen při změně skóre (nebo na prvním pollu)
        let score_changed = last_emitted != Some(snapshot.rounds());
        if score_changed || poll_num == 1 {
            display::print_live_update(
                &ctx.our_team_name,
                &ctx.enemy_team_name,
                snapshot.our_rounds,
                snapshot.enemy_rounds,
                &snapshot.our_side,
                &snapshot.enemy_side,
                base_prob,
                score_prob,
                dynamic_prob,
                snapshot.source,
                poll_num,
                model.rounds_to_win,
            );
            last_emitted = Some(snapshot.rounds());

            sink.emit(&LiveUpdateEvent {
                ok: true,
                kind: "live_update",
                poll: poll_num,
                nickname: nickname.clone(),
                player_id: resolution.player_id.clone(),
                match_id: ctx.match_id.clone(),
                map_name: ctx.map_name.clone(),
                our_team: ctx.our_team_name.clone(),
                enemy_team: ctx.enemy_team_name.clone(),
                score_our: snapshot.our_rounds,
                score_enemy: snapshot.enemy_rounds,
                our_side: snapshot.our_side.clone(),
                enemy_side: snapshot.enemy_side.clone(),
                score_source: snapshot.source.to_string(),
                base_win_probability: round6(base_prob),
                score_win_probability: round6(score_prob),
                dynamic_win_probability: round6(dynamic_prob),
                dynamic_win_probability_pct: round2(dynamic_prob * 100.0),
            });
        }

        if args.run_once {
            break;
        }

        // Konec zápasu
        if snapshot.our_rounds >= model.rounds_to_win {
            display::print_match_over(
                &ctx.our_team_name,
                snapshot.our_rounds,
                snapshot.enemy_rounds,
                true,
            );
            sink.emit(&MatchOverEvent {
                ok: true,
                kind: "match_over",
                winner: ctx.our_team_name.clone(),
                score: format!("{}-{}", snapshot.our_rounds, snapshot.enemy_rounds),
            });
            break;
        }
        if snapshot.enemy_rounds >= model.rounds_to_win {
            display::print_match_over(
                &ctx.enemy_team_name,
                snapshot.our_rounds,
                snapshot.enemy_rounds,
                false,
            );
            sink.emit(&MatchOverEvent {
                ok: true,
                kind: "match_over",
                winner: ctx.enemy_team_name.clone(),
                score: format!("{}-{}", snapshot.our_rounds, snapshot.enemy_rounds),
            });
            break;
        }

        // Čekání na další tick — Ctrl+C ukončí okamžitě, bez terminálního eventu
        tokio::select! {
            _ = sleep(cfg.poll_interval) => {}
            _ = tokio::signal::ctrl_c() => {
                println!("\n  ↩ Live tracking interrupted.\n");
                break;
            }
        }
    }

    Ok(())
}
