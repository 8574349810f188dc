//! Prediction Engine pro FACEIT CS2 win probability
//! Čistá matematika, žádné I/O — skórování hráčů, logistická base prob,
//! kombinatorická score prob (race to 13) a progress-weighted blend.

use serde::Serialize;

// ── Model konfigurace ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub struct FeatureBounds {
    pub min: f64,
    pub max: f64,
}

/// Váhy metrik ve finálním skóre hráče (součet = 1.0).
#[derive(Debug, Clone, Copy)]
pub struct FeatureWeights {
    pub elo:         f64,
    pub kd:          f64,
    pub winrate:     f64,
    pub map_winrate: f64,
    pub hs_pct:      f64,
    pub avg_kills:   f64,
}

/// Normalizační meze jednotlivých metrik (kontext CS2 FACEIT).
#[derive(Debug, Clone, Copy)]
pub struct FeatureNorms {
    pub elo:         FeatureBounds,
    pub kd:          FeatureBounds,
    pub winrate:     FeatureBounds,
    pub map_winrate: FeatureBounds,
    pub hs_pct:      FeatureBounds,
    pub avg_kills:   FeatureBounds,
}

/// Všechny konstanty modelu pohromadě — postaví se jednou při startu
/// a předává se komponentám, žádný globální stav.
#[derive(Debug, Clone, Copy)]
pub struct ModelConfig {
    pub rounds_to_win:      u32,   // první na 13 roundů
    pub logistic_k:         f64,   // strmost logistické křivky
    pub base_prob_floor:    f64,
    pub base_prob_ceil:     f64,
    /// Tlumí extrémy base_prob pro round-by-round výpočet.
    pub round_win_influence: f64,
    /// Nižší = skóre přebírá váhu dřív.
    pub score_blend_power:  f64,
    /// Minimální váha skóre i na začátku zápasu.
    pub score_min_weight:   f64,
    /// Bonus váhy podle rozdílu roundů.
    pub score_gap_weight:   f64,
    pub score_max_weight:   f64,
    pub dynamic_floor:      f64,
    pub dynamic_ceil:       f64,
    pub weights:            FeatureWeights,
    pub norms:              FeatureNorms,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            rounds_to_win:       13,
            logistic_k:          10.0,
            base_prob_floor:     0.05,
            base_prob_ceil:      0.95,
            round_win_influence: 0.55,
            score_blend_power:   0.35,
            score_min_weight:    0.25,
            score_gap_weight:    0.55,
            score_max_weight:    0.97,
            dynamic_floor:       0.02,
            dynamic_ceil:        0.98,
            weights: FeatureWeights {
                elo:         0.30,
                kd:          0.20,
                winrate:     0.20,
                map_winrate: 0.20,
                hs_pct:      0.05,
                avg_kills:   0.05,
            },
            norms: FeatureNorms {
                elo:         FeatureBounds { min: 500.0, max: 4000.0 },
                kd:          FeatureBounds { min: 0.4,   max: 2.5 },
                winrate:     FeatureBounds { min: 0.2,   max: 0.9 },
                map_winrate: FeatureBounds { min: 0.1,   max: 1.0 },
                hs_pct:      FeatureBounds { min: 0.0,   max: 0.70 },
                avg_kills:   FeatureBounds { min: 5.0,   max: 30.0 },
            },
        }
    }
}

// ── Metriky hráče ─────────────────────────────────────────────────────────────

/// Agregované metriky jednoho hráče za posledních N zápasů.
#[derive(Debug, Clone, Serialize)]
pub struct PlayerMetrics {
    pub nickname:    String,
    pub player_id:   String,
    pub elo:         i64,
    pub level:       u32,
    pub kd:          f64,
    pub winrate:     f64,
    pub map_winrate: f64,
    pub hs_pct:      f64,
    pub avg_kills:   f64,
    pub matches_analyzed: usize,
    /// 0 = map_winrate spadl na obecný winrate (málo dat na mapě).
    pub map_matches: usize,
}

impl PlayerMetrics {
    /// Neutrální priory — prázdná historie nesmí shodit výpočet.
    pub fn neutral(nickname: impl Into<String>, player_id: impl Into<String>) -> Self {
        Self {
            nickname:    nickname.into(),
            player_id:   player_id.into(),
            elo:         1000,
            level:       5,
            kd:          1.0,
            winrate:     0.5,
            map_winrate: 0.5,
            hs_pct:      0.0,
            avg_kills:   15.0,
            matches_analyzed: 0,
            map_matches: 0,
        }
    }
}

// ── Normalizace a skórování ──────────────────────────────────────────────────

/// Lineární škálování do [0,1] s clampem; monotónní i mimo meze.
pub fn normalize(value: f64, bounds: FeatureBounds) -> f64 {
    let span = bounds.max - bounds.min;
    if span <= 0.0 {
        return 0.0;
    }
    ((value - bounds.min) / span).clamp(0.0, 1.0)
}

/// Vážený součet normalizovaných metrik, clamp do [0,1].
pub fn player_score(m: &PlayerMetrics, cfg: &ModelConfig) -> f64 {
    let w = &cfg.weights;
    let n = &cfg.norms;
    let score = w.elo         * normalize(m.elo as f64, n.elo)
              + w.kd          * normalize(m.kd,          n.kd)
              + w.winrate     * normalize(m.winrate,     n.winrate)
              + w.map_winrate * normalize(m.map_winrate, n.map_winrate)
              + w.hs_pct      * normalize(m.hs_pct,      n.hs_pct)
              + w.avg_kills   * normalize(m.avg_kills,   n.avg_kills);
    score.clamp(0.0, 1.0)
}

/// Průměrné skóre týmu; roster může mít méně než 5 hráčů.
pub fn team_score(members: &[PlayerMetrics], cfg: &ModelConfig) -> f64 {
    let sum: f64 = members.iter().map(|m| player_score(m, cfg)).sum();
    sum / members.len().max(1) as f64
}

// ── Pravděpodobnosti ──────────────────────────────────────────────────────────

fn logistic(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Statická (pre-match) pravděpodobnost výhry z rozdílu týmových skóre.
/// Počítá se jednou na začátku session a drží se fixní.
pub fn base_win_probability(our_team_score: f64, enemy_team_score: f64, cfg: &ModelConfig) -> f64 {
    let diff = our_team_score - enemy_team_score;
    logistic(cfg.logistic_k * diff).clamp(cfg.base_prob_floor, cfg.base_prob_ceil)
}

/// Pravděpodobnost výhry jednoho roundu odvozená z base_prob,
/// s tlumeným extrémem aby live odhad nepřestřeloval.
pub fn round_win_probability(base_prob: f64, cfg: &ModelConfig) -> f64 {
    0.5 + (base_prob.clamp(0.0, 1.0) - 0.5) * cfg.round_win_influence
}

/// Analytická pravděpodobnost dohrát zápas z aktuálního skóre.
///
/// DP přes "kolik roundů ještě chybí": dp[a][b] = P(výhra | nám chybí a,
/// soupeři b), dp[0][*] = 1, dp[*][0] = 0,
/// dp[a][b] = p·dp[a-1][b] + (1-p)·dp[a][b-1].
/// Přesná race-to-N matematika, žádná heuristika.
pub fn compute_score_probability(
    our_rounds: u32,
    enemy_rounds: u32,
    p_round_win: f64,
    target: u32,
) -> f64 {
    let p = p_round_win.clamp(0.05, 0.95);

    // Terminální zkratky ještě před stavbou tabulky.
    if our_rounds >= target {
        return 1.0;
    }
    if enemy_rounds >= target {
        return 0.0;
    }

    let need_us    = (target - our_rounds) as usize;
    let need_enemy = (target - enemy_rounds) as usize;

    let mut dp = vec![vec![0.0_f64; need_enemy + 1]; need_us + 1];
    for b in 1..=need_enemy {
        dp[0][b] = 1.0; // my už máme dohráno
    }
    // dp[a][0] zůstává 0.0 — soupeř už dohrál

    for a in 1..=need_us {
        for b in 1..=need_enemy {
            dp[a][b] = p * dp[a - 1][b] + (1.0 - p) * dp[a][b - 1];
        }
    }

    dp[need_us][need_enemy]
}

/// Smíchá statickou (stats hráčů) a dynamickou (aktuální skóre)
/// pravděpodobnost. Váha skóre roste s počtem odehraných roundů a
/// s rozdílem ve skóre — na 0:0 rozhodují stats, v koncovce skóre,
/// ale nikdy nespadne úplně na 0/1 dokud není matematicky rozhodnuto.
pub fn blend_probabilities(
    base_prob: f64,
    score_prob: f64,
    our_rounds: u32,
    enemy_rounds: u32,
    cfg: &ModelConfig,
) -> f64 {
    let rounds_played = (our_rounds + enemy_rounds) as f64;
    let max_rounds_before_win = (2 * (cfg.rounds_to_win.saturating_sub(1))).max(1) as f64;
    let progress = (rounds_played / max_rounds_before_win).clamp(0.0, 1.0);

    let weight_progress = progress.powf(cfg.score_blend_power);

    let round_gap = our_rounds.abs_diff(enemy_rounds) as f64;
    let gap_span  = (cfg.rounds_to_win.saturating_sub(1)).max(1) as f64;
    let gap_boost = (round_gap / gap_span).clamp(0.0, 1.0) * cfg.score_gap_weight;

    let weight = (weight_progress.max(cfg.score_min_weight) + gap_boost)
        .clamp(cfg.score_min_weight, cfg.score_max_weight);

    (base_prob * (1.0 - weight) + score_prob * weight)
        .clamp(cfg.dynamic_floor, cfg.dynamic_ceil)
}

// ── Pomocné agregace pro výstup ──────────────────────────────────────────────

const LEVEL_THRESHOLDS: [i64; 10] = [500, 750, 900, 1050, 1200, 1350, 1530, 1750, 2000, 2250];

/// FACEIT level label odvozený z ELO.
pub fn skill_level_label(elo: i64) -> String {
    for (i, t) in LEVEL_THRESHOLDS.iter().enumerate() {
        if elo < *t {
            return format!("Level {}", i + 1);
        }
    }
    "Level 10".to_string()
}

#[derive(Debug, Clone, Serialize)]
pub struct EloGap {
    pub avg_elo_our:     Option<f64>,
    pub avg_elo_enemy:   Option<f64>,
    pub avg_elo_gap:     Option<f64>,
    pub avg_elo_gap_abs: Option<f64>,
}

pub fn compute_avg_elo_gap(our: &[PlayerMetrics], enemy: &[PlayerMetrics]) -> EloGap {
    if our.is_empty() || enemy.is_empty() {
        return EloGap {
            avg_elo_our:     None,
            avg_elo_enemy:   None,
            avg_elo_gap:     None,
            avg_elo_gap_abs: None,
        };
    }
    let avg = |ms: &[PlayerMetrics]| ms.iter().map(|m| m.elo as f64).sum::<f64>() / ms.len() as f64;
    let avg_our   = avg(our);
    let avg_enemy = avg(enemy);
    let gap = avg_our - avg_enemy;
    EloGap {
        avg_elo_our:     Some((avg_our * 100.0).round() / 100.0),
        avg_elo_enemy:   Some((avg_enemy * 100.0).round() / 100.0),
        avg_elo_gap:     Some((gap * 100.0).round() / 100.0),
        avg_elo_gap_abs: Some((gap.abs() * 100.0).round() / 100.0),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SampleQuality {
    pub sample_avg_matches:   Option<f64>,
    pub sample_quality_ratio: Option<f64>,
    pub sample_quality_pct:   Option<f64>,
    pub sample_quality_label: &'static str,
    pub sample_target_matches: usize,
    pub sample_player_count:   usize,
}

/// Kolik dat jsme reálně měli — průměr matches_analyzed vs. stats limit.
pub fn compute_sample_quality(all: &[PlayerMetrics], target_matches: usize) -> SampleQuality {
    if all.is_empty() {
        return SampleQuality {
            sample_avg_matches:   None,
            sample_quality_ratio: None,
            sample_quality_pct:   None,
            sample_quality_label: "unknown",
            sample_target_matches: target_matches,
            sample_player_count:   0,
        };
    }
    let avg = all.iter().map(|m| m.matches_analyzed as f64).sum::<f64>() / all.len() as f64;
    let ratio = (avg / target_matches.max(1) as f64).clamp(0.0, 1.0);
    let label = if ratio >= 0.8 {
        "high"
    } else if ratio >= 0.5 {
        "medium"
    } else {
        "low"
    };
    SampleQuality {
        sample_avg_matches:   Some((avg * 100.0).round() / 100.0),
        sample_quality_ratio: Some((ratio * 10_000.0).round() / 10_000.0),
        sample_quality_pct:   Some((ratio * 1000.0).round() / 10.0),
        sample_quality_label: label,
        sample_target_matches: target_matches,
        sample_player_count:   all.len(),
    }
}
