// 基于Postgres的位置历史存储
// 每个用户一行，history列是只追加的JSONB数组

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use sqlx::types::Json;

use super::{LocationSample, UserHistory, in_window};
use crate::error::{LocationError, StoreFailure};
use crate::geo::Coordinate;
use crate::validation;

/// 连接建立后执行的会话设置，服务端语句超时与客户端超时一致
pub fn session_setup_sql(timeout: Duration) -> String {
    format!(
        "SET application_name = 'geotrack_backend'; SET statement_timeout = {};",
        timeout.as_millis().max(1)
    )
}

/// 持久化的数组元素：{coordinate: {latitude, longitude}, timestamp}
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredSample {
    coordinate: Coordinate,
    timestamp: DateTime<Utc>,
}

pub struct PgHistoryStore {
    pool: PgPool,
    timeout: Duration,
}

impl PgHistoryStore {
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    /// 创建历史表（如不存在）
    pub async fn ensure_schema(&self) -> Result<(), LocationError> {
        self.bounded(
            sqlx::query(
                r#"
                CREATE TABLE IF NOT EXISTS location_histories (
                    user_id TEXT PRIMARY KEY,
                    history JSONB NOT NULL DEFAULT '[]'::jsonb,
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                )
                "#,
            )
            .execute(&self.pool),
        )
        .await?;
        Ok(())
    }

    /// 单条语句完成"不存在则创建，存在则追加"，超时取消时不会留下部分写入
    pub async fn append(
        &self,
        user_id: &str,
        coordinate: Coordinate,
        timestamp: DateTime<Utc>,
    ) -> Result<UserHistory, LocationError> {
        let coordinate = validation::validate(coordinate.latitude, coordinate.longitude)?;
        let entry = Json(vec![StoredSample {
            coordinate,
            timestamp,
        }]);

        let Json(stored) = self
            .bounded(
                sqlx::query_scalar::<_, Json<Vec<StoredSample>>>(
                    r#"
                    INSERT INTO location_histories (user_id, history, updated_at)
                    VALUES ($1, $2, NOW())
                    ON CONFLICT (user_id) DO UPDATE
                    SET history = location_histories.history || EXCLUDED.history,
                        updated_at = NOW()
                    RETURNING history
                    "#,
                )
                .bind(user_id)
                .bind(entry)
                .fetch_one(&self.pool),
            )
            .await?;

        Ok(into_history(user_id, stored))
    }

    pub async fn range_query(
        &self,
        user_id: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<LocationSample>, LocationError> {
        let stored = self
            .bounded(
                sqlx::query_scalar::<_, Json<Vec<StoredSample>>>(
                    "SELECT history FROM location_histories WHERE user_id = $1",
                )
                .bind(user_id)
                .fetch_optional(&self.pool),
            )
            .await?;

        let Some(Json(stored)) = stored else {
            return Err(LocationError::UserNotFound(user_id.to_string()));
        };

        Ok(into_history(user_id, stored)
            .into_iter()
            .filter(|s| in_window(s.timestamp, start, end))
            .collect())
    }

    pub async fn remove_user(&self, user_id: &str) -> Result<bool, LocationError> {
        let result = self
            .bounded(
                sqlx::query("DELETE FROM location_histories WHERE user_id = $1")
                    .bind(user_id)
                    .execute(&self.pool),
            )
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// 给存储调用加上超时，驱动错误和超时都转成 UserStoreFailure
    ///
    /// 服务端的 statement_timeout（见 [`session_setup_sql`]）会中止超时的语句并回滚；
    /// 但客户端超时与服务端提交几乎同时发生时，语句可能已经提交，调用方仍会拿到
    /// UserStoreFailure。这时样本已经写入，附近快照要等该用户下一次注册才刷新。
    async fn bounded<T, F>(&self, operation: F) -> Result<T, LocationError>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        match tokio::time::timeout(self.timeout, operation).await {
            Ok(result) => result.map_err(|err| {
                tracing::error!("location history store error: {:?}", err);
                LocationError::from(StoreFailure::Database(err))
            }),
            Err(_) => {
                tracing::warn!("location history store timed out after {:?}", self.timeout);
                Err(StoreFailure::Timeout(self.timeout).into())
            }
        }
    }
}

// 数组按写入顺序保存，读出后按时间戳稳定排序
fn into_history(user_id: &str, stored: Vec<StoredSample>) -> UserHistory {
    let mut history: UserHistory = stored
        .into_iter()
        .map(|s| LocationSample {
            user_id: user_id.to_string(),
            coordinate: s.coordinate,
            timestamp: s.timestamp,
        })
        .collect();
    history.sort_by_key(|s| s.timestamp);
    history
}
