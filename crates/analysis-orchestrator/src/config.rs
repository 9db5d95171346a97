use std::str::FromStr;

use analysis_core::{AnalysisError, Timeframe};
use anyhow::{anyhow, Context, Result};
use market_regime_detector::RegimeConfig;
use market_structure::{PspConfig, DEFAULT_LIQUIDITY_TOLERANCE, DEFAULT_SMT_TOLERANCE_BARS, DEFAULT_SWING_BARS};
use serde::{Deserialize, Serialize};
use trade_scenarios::{BiasMode, ScenarioConfig, DEFAULT_MIDNIGHT_BUFFER};

/// Pipeline configuration. Detector tunables without an environment variable
/// keep their per-detector defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisConfig {
    pub tick_size: f64,
    /// Fractal window for structure, liquidity and regime swings
    pub swing_bars: usize,
    pub liquidity_tolerance: f64,
    pub midnight_buffer: f64,
    pub bias_mode: BiasMode,
    /// Series the PSP machine runs on; the execution series when unset or missing
    pub psp_timeframe: Option<Timeframe>,
    /// SMT time tolerance in bars of the execution timeframe
    pub smt_tolerance_bars: i64,
    /// Bars back a pool sweep still counts for confluence
    pub sweep_lookback: usize,
    pub psp: PspConfig,
    pub scenarios: ScenarioConfig,
    pub regime: RegimeConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            tick_size: 0.25,
            swing_bars: DEFAULT_SWING_BARS,
            liquidity_tolerance: DEFAULT_LIQUIDITY_TOLERANCE,
            midnight_buffer: DEFAULT_MIDNIGHT_BUFFER,
            bias_mode: BiasMode::default(),
            psp_timeframe: None,
            smt_tolerance_bars: DEFAULT_SMT_TOLERANCE_BARS,
            sweep_lookback: 10,
            psp: PspConfig::default(),
            scenarios: ScenarioConfig::default(),
            regime: RegimeConfig::default(),
        }
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow!("{}", e))
            .with_context(|| format!("Invalid value for {}: {:?}", name, raw)),
        _ => Ok(None),
    }
}

impl AnalysisConfig {
    /// Defaults overridden by any environment variables that are set
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(tick) = parse_var::<f64>(&lookup, "TICK_SIZE")? {
            config.tick_size = tick;
            config.psp.tick_size = tick;
        }
        if let Some(bars) = parse_var(&lookup, "SWING_BARS")? {
            config.swing_bars = bars;
        }
        if let Some(bars) = parse_var(&lookup, "PSP_SWING_BARS")? {
            config.psp.swing_bars = bars;
        }
        if let Some(tol) = parse_var(&lookup, "LIQUIDITY_TOLERANCE")? {
            config.liquidity_tolerance = tol;
        }
        if let Some(buffer) = parse_var(&lookup, "MIDNIGHT_BUFFER")? {
            config.midnight_buffer = buffer;
        }
        if let Some(mode) = parse_var(&lookup, "BIAS_MODE")? {
            config.bias_mode = mode;
        }
        if let Some(raw) = lookup("PSP_TIMEFRAME").filter(|s| !s.trim().is_empty()) {
            let tf = Timeframe::parse(raw.trim()).with_context(|| format!("Invalid value for PSP_TIMEFRAME: {:?}", raw))?;
            config.psp_timeframe = Some(tf);
        }
        if let Some(bars) = parse_var(&lookup, "SMT_TOLERANCE_BARS")? {
            config.smt_tolerance_bars = bars;
        }
        if let Some(rr) = parse_var(&lookup, "FVG_MIN_RR")? {
            config.scenarios.fvg_min_rr = rr;
        }
        if let Some(rr) = parse_var(&lookup, "SWEEP_MIN_RR")? {
            config.scenarios.sweep_min_rr = rr;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        if !(self.tick_size > 0.0) {
            return Err(AnalysisError::Config(format!("tick size must be positive, got {}", self.tick_size)));
        }
        if self.swing_bars == 0 || self.psp.swing_bars == 0 {
            return Err(AnalysisError::Config("swing window must be at least one bar".to_string()));
        }
        if !(0.0..1.0).contains(&self.liquidity_tolerance) {
            return Err(AnalysisError::Config(format!(
                "liquidity tolerance must be in [0, 1), got {}",
                self.liquidity_tolerance
            )));
        }
        if self.midnight_buffer < 0.0 {
            return Err(AnalysisError::Config(format!("midnight buffer must be >= 0, got {}", self.midnight_buffer)));
        }
        Ok(())
    }

    /// SMT tolerance in seconds for the given execution timeframe
    pub fn smt_tolerance_secs(&self, timeframe: Timeframe) -> i64 {
        self.smt_tolerance_bars * timeframe.to_seconds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_without_env() {
        let config = AnalysisConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, AnalysisConfig::default());
        assert_eq!(config.swing_bars, 3);
        assert_eq!(config.psp.swing_bars, 2);
        assert_eq!(config.bias_mode, BiasMode::Composite);
    }

    #[test]
    fn test_overrides() {
        let config = AnalysisConfig::from_lookup(lookup(&[
            ("TICK_SIZE", "0.1"),
            ("SWING_BARS", "5"),
            ("BIAS_MODE", "midnight_open"),
            ("PSP_TIMEFRAME", "5m"),
            ("SWEEP_MIN_RR", "2.0"),
        ]))
        .unwrap();

        assert_eq!(config.tick_size, 0.1);
        assert_eq!(config.psp.tick_size, 0.1);
        assert_eq!(config.swing_bars, 5);
        assert_eq!(config.bias_mode, BiasMode::MidnightOpen);
        assert_eq!(config.psp_timeframe, Some(Timeframe::Minute5));
        assert_eq!(config.scenarios.sweep_min_rr, 2.0);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(AnalysisConfig::from_lookup(lookup(&[("SWING_BARS", "three")])).is_err());
        assert!(AnalysisConfig::from_lookup(lookup(&[("TICK_SIZE", "-1")])).is_err());
        assert!(AnalysisConfig::from_lookup(lookup(&[("PSP_TIMEFRAME", "7m")])).is_err());
    }

    #[test]
    fn test_smt_tolerance_secs() {
        let config = AnalysisConfig::default();
        assert_eq!(config.smt_tolerance_secs(Timeframe::Minute15), 1800);
    }
}
