use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::aggregator::DistanceResult;
use crate::geo::Coordinate;
use crate::history::LocationSample;

#[derive(Debug, Deserialize)]
pub struct RegisterLocationRequest {
    pub user_id: String,
    pub coordinate: Coordinate,
    /// RFC3339，省略时取服务器当前时间
    pub timestamp: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LocationRecord {
    pub coordinate: Coordinate,
    pub timestamp: DateTime<Utc>,
}

impl From<&LocationSample> for LocationRecord {
    fn from(sample: &LocationSample) -> Self {
        Self {
            coordinate: sample.coordinate,
            timestamp: sample.timestamp,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterLocationResponse {
    pub user_id: String,
    pub location_records: Vec<LocationRecord>,
}

impl RegisterLocationResponse {
    pub fn new(user_id: String, history: &[LocationSample]) -> Self {
        Self {
            user_id,
            location_records: history.iter().map(LocationRecord::from).collect(),
        }
    }
}

// 距离查询参数，时间均为RFC3339
#[derive(Debug, Deserialize)]
pub struct DistanceQuery {
    pub user_id: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DistanceResponse {
    pub user_id: String,
    pub distance_km: f64,
    pub history: Vec<LocationRecord>,
}

impl DistanceResponse {
    pub fn new(user_id: String, result: &DistanceResult) -> Self {
        Self {
            user_id,
            distance_km: result.total_distance_km,
            history: result
                .samples_in_window
                .iter()
                .map(LocationRecord::from)
                .collect(),
        }
    }
}
