//! Price-action detectors: swings, structure, liquidity, imbalances,
//! inter-market divergence, PSP setups and volume/daily reference levels.
//!
//! Every detector is a pure function of the candle slice it is given.

pub mod fvg;
pub mod levels;
pub mod liquidity;
pub mod psp;
pub mod smt;
pub mod structure;
pub mod swings;
pub mod volume_profile;

pub use fvg::{detect_fvgs, Fvg};
pub use levels::{compute_daily_levels, current_day, key_open_times, DailyLevels, KeyOpenTimes};
pub use liquidity::{
    detect_liquidity, latest_sweep, LiquidityPool, LiquiditySweep, PoolType, DEFAULT_LIQUIDITY_TOLERANCE,
};
pub use psp::{PspChecklist, PspConfig, PspDebug, PspDetector, PspLevels, PspMeta, PspResult, PspState};
pub use smt::{detect_smt, detect_smt_all, SmtDivergence, DEFAULT_SMT_TOLERANCE_BARS};
pub use structure::{analyze_structure, classify_trend, detect_breaks, BreakEvent, MarketStructure, Polarity, TrendType};
pub use swings::{detect_swings, SwingPoint, SwingType, DEFAULT_SWING_BARS};
pub use volume_profile::{build_volume_profile, NodeType, VolumeLevel, VolumeNode, VolumeProfile};
