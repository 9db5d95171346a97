//! Candle-based volume profile with value area and volume nodes.

use analysis_core::{Candle, Direction};
use serde::{Deserialize, Serialize};

/// Target number of price buckets across the range
const TARGET_BUCKETS: f64 = 48.0;
/// Share of total volume inside the value area
const VALUE_AREA_SHARE: f64 = 0.70;
const HVN_MULT: f64 = 1.5;
const LVN_MULT: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeLevel {
    pub price: f64,
    pub volume: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeType {
    Hvn,
    Lvn,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeNode {
    pub price: f64,
    pub volume: f64,
    #[serde(rename = "type")]
    pub kind: NodeType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeProfile {
    pub bucket_size: f64,
    /// Non-empty buckets, ascending by price
    pub levels: Vec<VolumeLevel>,
    pub poc: f64,
    pub vah: f64,
    pub val: f64,
    pub nodes: Vec<VolumeNode>,
}

impl VolumeProfile {
    /// Fade back toward value: below VAL is a long location, above VAH a short one
    pub fn value_side(&self, price: f64) -> Direction {
        if price < self.val {
            Direction::Long
        } else if price > self.vah {
            Direction::Short
        } else {
            Direction::Neutral
        }
    }

    pub fn in_value_area(&self, price: f64) -> bool {
        price >= self.val && price <= self.vah
    }
}

/// Build a profile from candles, assigning each candle's volume to the bucket
/// of its typical price. Returns `None` without candles or volume.
pub fn build_volume_profile(candles: &[Candle], tick_size: f64) -> Option<VolumeProfile> {
    let total: f64 = candles.iter().map(|c| c.volume).sum();
    if candles.is_empty() || total <= 0.0 {
        return None;
    }

    let low = candles.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
    let high = candles.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max);
    let tick = if tick_size > 0.0 { tick_size } else { 0.01 };
    let bucket_size = ((high - low) / TARGET_BUCKETS / tick).ceil().max(1.0) * tick;
    let count = ((high - low) / bucket_size).floor() as usize + 1;

    let mut volumes = vec![0.0; count];
    for c in candles {
        let idx = (((c.typical_price() - low) / bucket_size).floor().max(0.0) as usize).min(count - 1);
        volumes[idx] += c.volume;
    }
    let price_of = |i: usize| low + (i as f64 + 0.5) * bucket_size;

    let mut poc_idx = 0;
    for (i, &v) in volumes.iter().enumerate() {
        if v > volumes[poc_idx] {
            poc_idx = i;
        }
    }

    // Grow the value area from the POC toward the heavier neighbour
    let target = total * VALUE_AREA_SHARE;
    let (mut lo, mut hi) = (poc_idx, poc_idx);
    let mut accumulated = volumes[poc_idx];
    while accumulated < target && (lo > 0 || hi < count - 1) {
        let below = if lo > 0 { volumes[lo - 1] } else { -1.0 };
        let above = if hi < count - 1 { volumes[hi + 1] } else { -1.0 };
        if below >= above {
            lo -= 1;
            accumulated += below;
        } else {
            hi += 1;
            accumulated += above;
        }
    }
    let val = low + lo as f64 * bucket_size;
    let vah = low + (hi + 1) as f64 * bucket_size;

    let filled: Vec<usize> = (0..count).filter(|&i| volumes[i] > 0.0).collect();
    let mean = total / filled.len() as f64;

    let nodes = filled
        .iter()
        .filter_map(|&i| {
            let volume = volumes[i];
            let price = price_of(i);
            if volume >= HVN_MULT * mean {
                Some(VolumeNode { price, volume, kind: NodeType::Hvn })
            } else if volume <= LVN_MULT * mean && price >= val && price <= vah {
                Some(VolumeNode { price, volume, kind: NodeType::Lvn })
            } else {
                None
            }
        })
        .collect();

    Some(VolumeProfile {
        bucket_size,
        levels: filled.iter().map(|&i| VolumeLevel { price: price_of(i), volume: volumes[i] }).collect(),
        poc: price_of(poc_idx),
        vah,
        val,
        nodes,
    })
}
