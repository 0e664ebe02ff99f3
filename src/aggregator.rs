use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::LocationError;
use crate::geo::distance_km;
use crate::history::{LocationSample, in_window};

/// 一个时间窗口内的移动距离，每次查询重新计算
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistanceResult {
    pub total_distance_km: f64,
    pub samples_in_window: Vec<LocationSample>,
}

pub fn validate_window(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), LocationError> {
    if start > end {
        return Err(LocationError::InvalidWindow { start, end });
    }
    Ok(())
}

/// 计算 (start, end) 窗口内相邻样本之间的距离之和
///
/// 只累加两端都在窗口内的相邻样本对。窗口开始之前的最后一个样本
/// 不参与累加，所以跨越窗口边界的那一段不计入。
pub fn compute(
    history: &[LocationSample],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<DistanceResult, LocationError> {
    validate_window(start, end)?;

    let mut samples: Vec<LocationSample> = history
        .iter()
        .filter(|s| in_window(s.timestamp, Some(start), Some(end)))
        .cloned()
        .collect();
    // 存储在并发写入下不一定保证顺序
    samples.sort_by_key(|s| s.timestamp);

    if samples.len() < 2 {
        return Ok(DistanceResult {
            total_distance_km: 0.0,
            samples_in_window: samples,
        });
    }

    let total_distance_km = samples
        .windows(2)
        .map(|pair| distance_km(&pair[0].coordinate, &pair[1].coordinate))
        .sum();

    Ok(DistanceResult {
        total_distance_km,
        samples_in_window: samples,
    })
}
