// 位置历史模块
// 按用户保存按时间排序的位置样本，支持追加和时间范围查询

pub mod pg;

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::LocationError;
use crate::geo::Coordinate;
use crate::validation;

pub use pg::PgHistoryStore;

/// 一次带时间戳的位置观测，创建后不再修改
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationSample {
    pub user_id: String,
    pub coordinate: Coordinate,
    pub timestamp: DateTime<Utc>,
}

/// 单个用户的位置历史，按时间戳升序
pub type UserHistory = Vec<LocationSample>;

/// 时间戳是否严格落在 (start, end) 之内，None 表示该侧不设界
pub fn in_window(
    timestamp: DateTime<Utc>,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> bool {
    start.is_none_or(|start| timestamp > start) && end.is_none_or(|end| timestamp < end)
}

/// 内存中的位置历史存储
///
/// 整个存储共用一把读写锁：追加持有写锁，查询持有读锁，
/// 所以读者不会看到写了一半的历史。
#[derive(Default)]
pub struct LocationHistoryStore {
    histories: RwLock<HashMap<String, UserHistory>>,
}

impl LocationHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一条位置记录，返回追加后的完整历史
    pub fn append(
        &self,
        user_id: &str,
        coordinate: Coordinate,
        timestamp: DateTime<Utc>,
    ) -> Result<UserHistory, LocationError> {
        // 先校验，校验失败时不做任何修改
        let coordinate = validation::validate(coordinate.latitude, coordinate.longitude)?;
        let sample = LocationSample {
            user_id: user_id.to_string(),
            coordinate,
            timestamp,
        };

        let mut histories = self.histories.write();
        let history = histories.entry(user_id.to_string()).or_default();
        // 乱序到达的样本插到所有不晚于它的样本之后，相同时间戳保持写入顺序
        let position = history.partition_point(|s| s.timestamp <= timestamp);
        history.insert(position, sample);

        tracing::debug!(user_id, samples = history.len(), "location appended");
        Ok(history.clone())
    }

    /// 返回 start < timestamp < end 的样本，按时间升序
    pub fn range_query(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<LocationSample>, LocationError> {
        self.range_query_open(user_id, Some(start), Some(end))
    }

    pub fn range_query_open(
        &self,
        user_id: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<LocationSample>, LocationError> {
        let histories = self.histories.read();
        let history = histories
            .get(user_id)
            .ok_or_else(|| LocationError::UserNotFound(user_id.to_string()))?;

        Ok(history
            .iter()
            .filter(|s| in_window(s.timestamp, start, end))
            .cloned()
            .collect())
    }

    pub fn remove_user(&self, user_id: &str) -> bool {
        self.histories.write().remove(user_id).is_some()
    }

    pub fn contains(&self, user_id: &str) -> bool {
        self.histories.read().contains_key(user_id)
    }
}

/// 历史存储后端，由配置选择
pub enum HistoryStore {
    InMemory(LocationHistoryStore),
    Postgres(PgHistoryStore),
}

impl HistoryStore {
    pub async fn append(
        &self,
        user_id: &str,
        coordinate: Coordinate,
        timestamp: DateTime<Utc>,
    ) -> Result<UserHistory, LocationError> {
        match self {
            HistoryStore::InMemory(store) => store.append(user_id, coordinate, timestamp),
            HistoryStore::Postgres(store) => store.append(user_id, coordinate, timestamp).await,
        }
    }

    pub async fn range_query(
        &self,
        user_id: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<LocationSample>, LocationError> {
        match self {
            HistoryStore::InMemory(store) => store.range_query_open(user_id, start, end),
            HistoryStore::Postgres(store) => store.range_query(user_id, start, end).await,
        }
    }

    pub async fn remove_user(&self, user_id: &str) -> Result<bool, LocationError> {
        match self {
            HistoryStore::InMemory(store) => Ok(store.remove_user(user_id)),
            HistoryStore::Postgres(store) => store.remove_user(user_id).await,
        }
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            HistoryStore::InMemory(_) => "memory",
            HistoryStore::Postgres(_) => "postgres",
        }
    }
}
