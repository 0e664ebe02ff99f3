use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::Coordinate;
use crate::routes::location::LocationRecord;
use crate::users::UserProfile;

#[derive(Debug, Deserialize)]
pub struct UserLocationRequest {
    pub user_name: String,
    pub coordinate: Coordinate,
}

#[derive(Debug, Serialize)]
pub struct CreateUserResponse {
    pub user: UserProfile,
    pub location_records: Vec<LocationRecord>,
}

// 附近搜索参数：lat/lon 必填，r 为半径（公里）
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub r: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NearbyUserView {
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    pub coordinate: Coordinate,
    pub distance_km: f64,
    pub last_updated: DateTime<Utc>,
}
