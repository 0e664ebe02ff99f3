// 位置服务
// 把历史存储和附近用户索引接在一起，对外提供注册位置、计算距离和附近搜索

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::aggregator::{self, DistanceResult};
use crate::error::LocationError;
use crate::geo::Coordinate;
use crate::history::{HistoryStore, LocationHistoryStore, UserHistory};
use crate::proximity::{DEFAULT_SEARCH_RADIUS_KM, ProximityIndex};

/// 默认距离统计窗口（小时）
pub const DEFAULT_WINDOW_HOURS: i64 = 24;

/// 附近用户及其距离
#[derive(Debug, Clone, Serialize)]
pub struct NearbyUser {
    pub user_id: String,
    pub coordinate: Coordinate,
    pub last_updated: DateTime<Utc>,
    pub distance_km: f64,
}

pub struct LocationService {
    history: HistoryStore,
    index: ProximityIndex,
    default_radius_km: f64,
    default_window: Duration,
}

impl LocationService {
    pub fn new(history: HistoryStore) -> Self {
        Self {
            history,
            index: ProximityIndex::new(),
            default_radius_km: DEFAULT_SEARCH_RADIUS_KM,
            default_window: Duration::hours(DEFAULT_WINDOW_HOURS),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(HistoryStore::InMemory(LocationHistoryStore::new()))
    }

    pub fn with_default_radius(mut self, radius_km: f64) -> Self {
        self.default_radius_km = radius_km;
        self
    }

    pub fn with_default_window(mut self, window: Duration) -> Self {
        self.default_window = window;
        self
    }

    pub fn index(&self) -> &ProximityIndex {
        &self.index
    }

    pub fn backend_name(&self) -> &'static str {
        self.history.backend_name()
    }

    /// 记录一次位置，并刷新该用户的附近快照
    pub async fn register_location(
        &self,
        user_id: &str,
        coordinate: Coordinate,
        timestamp: DateTime<Utc>,
    ) -> Result<UserHistory, LocationError> {
        let history = self.history.append(user_id, coordinate, timestamp).await?;

        // 此时历史存储的锁已经释放，两把锁不会同时持有。
        // 快照取时间最新的样本，并发刷新时较旧的结果不会覆盖较新的快照。
        if let Some(latest) = history.last() {
            self.index
                .refresh_snapshot(user_id, latest.coordinate, latest.timestamp);
        }

        tracing::info!(user_id, samples = history.len(), "location registered");
        Ok(history)
    }

    /// 计算用户在窗口内的移动距离
    ///
    /// 两端都省略时窗口为 [now - 默认窗口, now]；只给 start 时 end 取 now；
    /// 只给 end 时 start 取 end - 默认窗口。
    pub async fn calculate_distance(
        &self,
        user_id: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<DistanceResult, LocationError> {
        let (start, end) = self.resolve_window(start, end, Utc::now());
        aggregator::validate_window(start, end)?;

        let samples = self
            .history
            .range_query(user_id, Some(start), Some(end))
            .await?;
        let result = aggregator::compute(&samples, start, end)?;

        tracing::debug!(
            user_id,
            total_distance_km = result.total_distance_km,
            samples = result.samples_in_window.len(),
            "distance calculated"
        );
        Ok(result)
    }

    pub fn resolve_window(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> (DateTime<Utc>, DateTime<Utc>) {
        match (start, end) {
            (Some(start), Some(end)) => (start, end),
            (Some(start), None) => (start, now),
            (None, Some(end)) => (end - self.default_window, end),
            (None, None) => (now - self.default_window, now),
        }
    }

    /// 半径内的用户ID，按用户ID排序
    pub fn search_nearby(&self, center: &Coordinate, radius_km: Option<f64>) -> Vec<String> {
        let radius_km = radius_km.unwrap_or(self.default_radius_km);
        self.index.search(center, radius_km)
    }

    pub fn search_nearby_detailed(
        &self,
        center: &Coordinate,
        radius_km: Option<f64>,
    ) -> Vec<NearbyUser> {
        let radius_km = radius_km.unwrap_or(self.default_radius_km);
        self.index
            .search_with_distance(center, radius_km)
            .into_iter()
            .map(|(snapshot, distance_km)| NearbyUser {
                user_id: snapshot.user_id,
                coordinate: snapshot.coordinate,
                last_updated: snapshot.last_updated,
                distance_km,
            })
            .collect()
    }

    /// 用户删除事件：移除历史和快照，返回是否存在过
    pub async fn remove_user(&self, user_id: &str) -> Result<bool, LocationError> {
        let had_history = self.history.remove_user(user_id).await?;
        let had_snapshot = self.index.remove(user_id);
        tracing::info!(user_id, had_history, had_snapshot, "user removed");
        Ok(had_history || had_snapshot)
    }
}
