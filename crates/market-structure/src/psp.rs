//! Precision swing point (PSP) setups.
//!
//! A PSP is a liquidity sweep of a swing followed by displacement, a pullback
//! into the 50-79% retracement of the displacement leg, and continuation
//! beyond the leg extreme. Every swing is evaluated as its own candidate; the
//! best-scoring one is reported.

use analysis_core::{Candle, Direction, Timeframe};
use serde::{Deserialize, Serialize};
use technical_analysis::last_atr;
use tracing::debug;

use crate::swings::{detect_swings, SwingPoint, SwingType};

const SWEEP_POINTS: u32 = 25;
const DISPLACEMENT_POINTS: u32 = 25;
const PULLBACK_POINTS: u32 = 20;
const CONTINUATION_POINTS: u32 = 20;
const BONUS_POINTS: u32 = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PspConfig {
    pub swing_bars: usize,
    pub atr_period: usize,
    pub tick_size: f64,
    /// Sweep buffer as a fraction of ATR
    pub buffer_atr_mult: f64,
    /// Minimum sweep buffer in ticks
    pub buffer_min_ticks: f64,
    /// Only sweeps within this many most recent bars qualify
    pub sweep_window: usize,
    pub displacement_bars: usize,
    pub displacement_atr_mult: f64,
    pub strong_body_atr_mult: f64,
    pub min_strong_bodies: usize,
    pub single_body_atr_mult: f64,
    pub pullback_min: f64,
    pub pullback_max: f64,
    pub pullback_window: usize,
    pub continuation_window: usize,
    pub deep_sweep_atr_mult: f64,
    pub big_leg_atr_mult: f64,
    pub ttl_secs: i64,
}

impl Default for PspConfig {
    fn default() -> Self {
        Self {
            swing_bars: 2,
            atr_period: 14,
            tick_size: 0.25,
            buffer_atr_mult: 0.15,
            buffer_min_ticks: 4.0,
            sweep_window: 24,
            displacement_bars: 6,
            displacement_atr_mult: 0.7,
            strong_body_atr_mult: 0.35,
            min_strong_bodies: 2,
            single_body_atr_mult: 1.0,
            pullback_min: 0.5,
            pullback_max: 0.79,
            pullback_window: 10,
            continuation_window: 12,
            deep_sweep_atr_mult: 0.25,
            big_leg_atr_mult: 1.0,
            ttl_secs: 3 * 3600,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PspState {
    #[default]
    None,
    Forming,
    Confirmed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PspChecklist {
    pub sweep: bool,
    pub displacement: bool,
    pub pullback: bool,
    pub continuation: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PspLevels {
    pub entry_low: f64,
    pub entry_high: f64,
    /// Sweep extreme
    pub invalidation: f64,
    pub swing: f64,
    pub peak: f64,
}

impl PspLevels {
    pub fn overlaps(&self, low: f64, high: f64) -> bool {
        self.entry_low <= high && low <= self.entry_high
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PspMeta {
    pub tf: Timeframe,
    pub detected_at_ms: Option<i64>,
    pub expires_at_ms: Option<i64>,
    pub age_minutes: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PspDebug {
    pub atr: f64,
    pub sweep_buffer: f64,
    pub sweep_index: Option<usize>,
    pub sweep_depth: f64,
    pub displacement_index: Option<usize>,
    pub displacement_leg: f64,
    pub strong_bodies: usize,
    pub pullback_index: Option<usize>,
    pub continuation_index: Option<usize>,
    pub invalidated: bool,
    pub candidates_evaluated: usize,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PspResult {
    pub state: PspState,
    pub direction: Direction,
    pub score: u32,
    pub checklist: PspChecklist,
    pub levels: Option<PspLevels>,
    pub meta: PspMeta,
    pub debug: PspDebug,
}

impl PspResult {
    pub fn none(tf: Timeframe, debug: PspDebug) -> Self {
        Self {
            state: PspState::None,
            direction: Direction::Neutral,
            score: 0,
            checklist: PspChecklist::default(),
            levels: None,
            meta: PspMeta {
                tf,
                detected_at_ms: None,
                expires_at_ms: None,
                age_minutes: None,
            },
            debug,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state != PspState::None
    }

    pub fn is_expired(&self, now: i64) -> bool {
        self.meta.expires_at_ms.map_or(false, |expires| expires <= now * 1000)
    }

    /// The result as read at `now`: age refreshed, expired setups downgraded
    /// to NONE with a zero score. The checklist is left intact.
    pub fn at(&self, now: i64) -> PspResult {
        let mut result = self.clone();
        if let Some(detected) = result.meta.detected_at_ms {
            result.meta.age_minutes = Some((now * 1000 - detected) / 60_000);
        }
        if self.is_expired(now) {
            result.state = PspState::None;
            result.direction = Direction::Neutral;
            result.score = 0;
            result.debug.reason = Some("expired".to_string());
        }
        result
    }
}

struct Candidate {
    direction: Direction,
    score: u32,
    state: PspState,
    checklist: PspChecklist,
    levels: Option<PspLevels>,
    sweep_index: usize,
    sweep_time: i64,
    debug: PspDebug,
}

pub struct PspDetector {
    config: PspConfig,
}

impl Default for PspDetector {
    fn default() -> Self {
        Self::new(PspConfig::default())
    }
}

impl PspDetector {
    pub fn new(config: PspConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PspConfig {
        &self.config
    }

    pub fn detect(&self, candles: &[Candle], tf: Timeframe, now: i64) -> PspResult {
        let cfg = &self.config;
        if candles.len() < cfg.atr_period + 1 {
            return PspResult::none(
                tf,
                PspDebug {
                    reason: Some(format!("need {} candles, have {}", cfg.atr_period + 1, candles.len())),
                    ..Default::default()
                },
            );
        }

        let atr = match last_atr(candles, cfg.atr_period) {
            Some(atr) if atr > 0.0 => atr,
            _ => {
                return PspResult::none(
                    tf,
                    PspDebug {
                        reason: Some("zero ATR".to_string()),
                        ..Default::default()
                    },
                )
            }
        };
        let buffer = (cfg.buffer_atr_mult * atr).max(cfg.buffer_min_ticks * cfg.tick_size);

        let swings = detect_swings(candles, cfg.swing_bars, cfg.swing_bars);
        let best = swings
            .iter()
            .filter_map(|swing| self.evaluate(candles, swing, atr, buffer))
            .max_by_key(|c| (c.score, c.sweep_index, c.direction == Direction::Long));

        let Some(best) = best else {
            return PspResult::none(
                tf,
                PspDebug {
                    atr,
                    sweep_buffer: buffer,
                    candidates_evaluated: swings.len(),
                    reason: Some("no qualifying sweep".to_string()),
                    ..Default::default()
                },
            );
        };

        debug!(
            "PSP best candidate: {:?} score={} state={:?} sweep_index={}",
            best.direction, best.score, best.state, best.sweep_index
        );

        let detected_at_ms = best.sweep_time * 1000;
        let mut debug = best.debug;
        debug.candidates_evaluated = swings.len();

        let result = PspResult {
            state: best.state,
            direction: if best.state == PspState::None { Direction::Neutral } else { best.direction },
            score: best.score,
            checklist: best.checklist,
            levels: best.levels,
            meta: PspMeta {
                tf,
                detected_at_ms: Some(detected_at_ms),
                expires_at_ms: Some(detected_at_ms + cfg.ttl_secs * 1000),
                age_minutes: None,
            },
            debug,
        };

        result.at(now)
    }

    fn evaluate(&self, candles: &[Candle], swing: &SwingPoint, atr: f64, buffer: f64) -> Option<Candidate> {
        let cfg = &self.config;
        let n = candles.len();
        let long = swing.kind == SwingType::Low;
        let direction = if long { Direction::Long } else { Direction::Short };

        // 1. sweep
        let window_start = n.saturating_sub(cfg.sweep_window);
        let sweep_index = ((swing.index + 1).max(window_start)..n).find(|&j| {
            let c = &candles[j];
            if long {
                c.low <= swing.price - buffer && c.close > swing.price
            } else {
                c.high >= swing.price + buffer && c.close < swing.price
            }
        })?;
        let sweep = &candles[sweep_index];
        let sweep_extreme = if long { sweep.low } else { sweep.high };
        let sweep_depth = (swing.price - sweep_extreme).abs();

        let mut checklist = PspChecklist {
            sweep: true,
            ..Default::default()
        };
        let mut debug = PspDebug {
            atr,
            sweep_buffer: buffer,
            sweep_index: Some(sweep_index),
            sweep_depth,
            ..Default::default()
        };
        let mut score = SWEEP_POINTS;
        if sweep_depth > cfg.deep_sweep_atr_mult * atr {
            score += BONUS_POINTS;
        }

        // 2. displacement
        let disp_end = (sweep_index + cfg.displacement_bars).min(n - 1);
        let mut levels = None;
        let mut peak_index = None;
        if sweep_index < disp_end {
            let window = sweep_index + 1..=disp_end;
            let (idx, peak) = window.clone().fold((sweep_index + 1, f64::NAN), |(best_i, best), i| {
                let value = if long { candles[i].high } else { candles[i].low };
                let better = best.is_nan() || if long { value > best } else { value < best };
                if better {
                    (i, value)
                } else {
                    (best_i, best)
                }
            });

            let leg = (peak - sweep_extreme).abs();
            let bodies: Vec<f64> = window.map(|i| candles[i].directional_body(direction)).collect();
            let strong = bodies.iter().filter(|&&b| b > cfg.strong_body_atr_mult * atr).count();
            let single = bodies.iter().any(|&b| b > cfg.single_body_atr_mult * atr);

            debug.displacement_leg = leg;
            debug.strong_bodies = strong;

            if leg > cfg.displacement_atr_mult * atr && (strong >= cfg.min_strong_bodies || single) {
                checklist.displacement = true;
                debug.displacement_index = Some(idx);
                peak_index = Some(idx);
                score += DISPLACEMENT_POINTS;
                if leg > cfg.big_leg_atr_mult * atr {
                    score += BONUS_POINTS;
                }

                let near = leg * cfg.pullback_min;
                let far = leg * cfg.pullback_max;
                levels = Some(if long {
                    PspLevels {
                        entry_low: peak - far,
                        entry_high: peak - near,
                        invalidation: sweep_extreme,
                        swing: swing.price,
                        peak,
                    }
                } else {
                    PspLevels {
                        entry_low: peak + near,
                        entry_high: peak + far,
                        invalidation: sweep_extreme,
                        swing: swing.price,
                        peak,
                    }
                });
            }
        }

        // 3. pullback, re-breach of the sweep extreme takes priority over the touch
        let mut touch_index = None;
        if let (Some(peak_idx), Some(lv)) = (peak_index, levels) {
            let end = (peak_idx + cfg.pullback_window).min(n - 1);
            for j in peak_idx + 1..=end {
                let c = &candles[j];
                let (breached, touched) = if long {
                    (c.low < sweep_extreme, c.low <= lv.entry_high)
                } else {
                    (c.high > sweep_extreme, c.high >= lv.entry_low)
                };
                if breached {
                    debug.invalidated = true;
                    break;
                }
                if touched {
                    touch_index = Some(j);
                    break;
                }
            }
        }

        if let Some(touch) = touch_index {
            checklist.pullback = true;
            debug.pullback_index = Some(touch);
            score += PULLBACK_POINTS;

            // 4. continuation
            if let Some(lv) = levels {
                let end = (touch + cfg.continuation_window).min(n - 1);
                let continuation = (touch + 1..=end).find(|&k| {
                    let close = candles[k].close;
                    if long {
                        close > lv.peak
                    } else {
                        close < lv.peak
                    }
                });
                if let Some(k) = continuation {
                    checklist.continuation = true;
                    debug.continuation_index = Some(k);
                    score += CONTINUATION_POINTS;
                }
            }
        }

        let state = if debug.invalidated {
            score = 0;
            debug.reason = Some("sweep extreme re-breached before pullback".to_string());
            PspState::None
        } else if checklist.continuation {
            PspState::Confirmed
        } else {
            PspState::Forming
        };

        Some(Candidate {
            direction,
            score: score.min(100),
            state,
            checklist,
            levels,
            sweep_index,
            sweep_time: sweep.time,
            debug,
        })
    }
}
