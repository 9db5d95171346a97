//! Candle feed over JSON files on disk.

use std::collections::HashMap;
use std::path::PathBuf;

use analysis_core::{AnalysisError, Candle, CandleFeed, CandleNormalizer, ColumnarNormalizer, ColumnarQuote, Timeframe};
use async_trait::async_trait;

/// Serves each (symbol, timeframe) pair from its own file. Files hold either a
/// columnar quote (`{"t":[..],"o":[..],...}`) or an array of candle objects.
#[derive(Default)]
pub struct FileFeed {
    files: HashMap<(String, Timeframe), PathBuf>,
}

impl FileFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, symbol: &str, timeframe: Timeframe, path: impl Into<PathBuf>) {
        self.files.insert((symbol.to_string(), timeframe), path.into());
    }
}

pub fn parse_candles(raw: &str) -> Result<Vec<Candle>, AnalysisError> {
    if raw.trim_start().starts_with('[') {
        let candles: Vec<Candle> =
            serde_json::from_str(raw).map_err(|e| AnalysisError::InvalidData(format!("candle array: {}", e)))?;
        return Ok(analysis_core::sanitize(candles));
    }

    let quote: ColumnarQuote =
        serde_json::from_str(raw).map_err(|e| AnalysisError::InvalidData(format!("columnar quote: {}", e)))?;
    ColumnarNormalizer.normalize(&quote)
}

#[async_trait]
impl CandleFeed for FileFeed {
    async fn fetch(&self, symbol: &str, timeframe: Timeframe) -> Result<Vec<Candle>, AnalysisError> {
        let path = self
            .files
            .get(&(symbol.to_string(), timeframe))
            .ok_or_else(|| AnalysisError::Feed(format!("no file registered for {} {}", symbol, timeframe)))?;

        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| AnalysisError::Feed(format!("{}: {}", path.display(), e)))?;
        let candles = parse_candles(&raw)?;

        tracing::debug!("Loaded {} {} candles for {} from {}", candles.len(), timeframe, symbol, path.display());
        Ok(candles)
    }
}
