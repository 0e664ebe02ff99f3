// 位置更新事件的进程内消费者
// 事件进入有界队列，后台任务按到达顺序写入位置服务

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::IngestClosed;
use crate::geo::Coordinate;
use crate::service::LocationService;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationEvent {
    pub user_id: String,
    pub coordinate: Coordinate,
}

#[derive(Clone)]
pub struct IngestHandle {
    tx: mpsc::Sender<LocationEvent>,
}

impl IngestHandle {
    /// 发布事件，队列满时等待
    pub async fn publish(&self, event: LocationEvent) -> Result<(), IngestClosed> {
        self.tx.send(event).await.map_err(|_| IngestClosed)
    }
}

/// 启动消费任务，所有 IngestHandle 被丢弃后任务结束并返回处理成功的事件数
pub fn spawn_ingest_worker(
    service: Arc<LocationService>,
    capacity: usize,
) -> (IngestHandle, JoinHandle<usize>) {
    let (tx, mut rx) = mpsc::channel::<LocationEvent>(capacity.max(1));

    let worker = tokio::spawn(async move {
        let mut registered = 0usize;
        while let Some(event) = rx.recv().await {
            // 时间戳取消费时刻
            let now = Utc::now();
            match service
                .register_location(&event.user_id, event.coordinate, now)
                .await
            {
                Ok(history) => {
                    registered += 1;
                    tracing::debug!(
                        user_id = %event.user_id,
                        samples = history.len(),
                        "location event consumed"
                    );
                }
                Err(err) => {
                    tracing::warn!("failed to register location for {}: {}", event.user_id, err);
                }
            }
        }
        tracing::info!("ingest worker stopped after {} events", registered);
        registered
    });

    (IngestHandle { tx }, worker)
}
