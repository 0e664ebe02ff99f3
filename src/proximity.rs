// 附近用户索引
// 每个用户只保留最新位置快照，查询时线性扫描并用球面距离过滤

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;

use crate::geo::{Coordinate, distance_km};

/// 默认搜索半径（公里）
pub const DEFAULT_SEARCH_RADIUS_KM: f64 = 5.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProximitySnapshot {
    pub user_id: String,
    pub coordinate: Coordinate,
    pub last_updated: DateTime<Utc>,
}

#[derive(Default)]
pub struct ProximityIndex {
    // BTreeMap 让查询结果按用户ID稳定排序
    snapshots: RwLock<BTreeMap<String, ProximitySnapshot>>,
}

impl ProximityIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// 覆盖用户之前的快照，相同输入重复调用结果不变
    pub fn upsert_snapshot(&self, user_id: &str, coordinate: Coordinate, timestamp: DateTime<Utc>) {
        let snapshot = ProximitySnapshot {
            user_id: user_id.to_string(),
            coordinate,
            last_updated: timestamp,
        };
        self.snapshots.write().insert(user_id.to_string(), snapshot);
    }

    /// 只有 timestamp 不早于现有快照时才替换，返回是否写入
    ///
    /// 并发注册时各自的刷新顺序不确定，比较和写入在同一把写锁内完成。
    pub fn refresh_snapshot(
        &self,
        user_id: &str,
        coordinate: Coordinate,
        timestamp: DateTime<Utc>,
    ) -> bool {
        let mut snapshots = self.snapshots.write();
        match snapshots.get_mut(user_id) {
            Some(existing) if existing.last_updated > timestamp => false,
            Some(existing) => {
                existing.coordinate = coordinate;
                existing.last_updated = timestamp;
                true
            }
            None => {
                snapshots.insert(
                    user_id.to_string(),
                    ProximitySnapshot {
                        user_id: user_id.to_string(),
                        coordinate,
                        last_updated: timestamp,
                    },
                );
                true
            }
        }
    }

    /// 查找距离中心点不超过 radius_km 的用户，边界上的用户也算在内
    ///
    /// 半径小于等于0不是错误：0只匹配完全相同的坐标，负数不匹配任何用户。
    pub fn search(&self, center: &Coordinate, radius_km: f64) -> Vec<String> {
        self.search_with_distance(center, radius_km)
            .into_iter()
            .map(|(snapshot, _)| snapshot.user_id)
            .collect()
    }

    /// 同 [`search`](Self::search)，附带快照和距离
    pub fn search_with_distance(
        &self,
        center: &Coordinate,
        radius_km: f64,
    ) -> Vec<(ProximitySnapshot, f64)> {
        let snapshots = self.snapshots.read();
        snapshots
            .values()
            .filter_map(|snapshot| {
                let distance = distance_km(center, &snapshot.coordinate);
                (distance <= radius_km).then(|| (snapshot.clone(), distance))
            })
            .collect()
    }

    pub fn remove(&self, user_id: &str) -> bool {
        self.snapshots.write().remove(user_id).is_some()
    }

    pub fn snapshot(&self, user_id: &str) -> Option<ProximitySnapshot> {
        self.snapshots.read().get(user_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.snapshots.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap()
    }

    fn seeded() -> ProximityIndex {
        let index = ProximityIndex::new();
        index.upsert_snapshot("user1", Coordinate::new(51.1182, 16.9907), t0());
        index.upsert_snapshot("user2", Coordinate::new(51.1196, 17.0570), t0());
        index.upsert_snapshot("user3", Coordinate::new(52.2355, 20.9846), t0());
        index
    }

    #[test]
    fn search_within_city_radius() {
        let index = seeded();
        let found = index.search(&Coordinate::new(51.1182, 16.9907), 10.0);
        assert_eq!(found, vec!["user1", "user2"]);
    }

    #[test]
    fn search_with_large_radius_finds_everyone() {
        let index = seeded();
        let found = index.search(&Coordinate::new(51.1182, 16.9907), 1000.0);
        assert_eq!(found, vec!["user1", "user2", "user3"]);
    }

    #[test]
    fn zero_radius_matches_exact_coordinate_only() {
        let index = seeded();
        let found = index.search(&Coordinate::new(51.1196, 17.0570), 0.0);
        assert_eq!(found, vec!["user2"]);
    }

    #[test]
    fn negative_radius_is_empty_not_error() {
        let index = seeded();
        assert!(index.search(&Coordinate::new(51.1196, 17.0570), -1.0).is_empty());
    }

    #[test]
    fn boundary_distance_is_included() {
        let index = seeded();
        let center = Coordinate::new(51.1182, 16.9907);
        let exact = distance_km(&center, &Coordinate::new(51.1196, 17.0570));
        let found = index.search(&center, exact);
        assert!(found.contains(&"user2".to_string()));
    }

    #[test]
    fn upsert_replaces_previous_snapshot() {
        let index = seeded();
        index.upsert_snapshot("user3", Coordinate::new(51.1183, 16.9908), t0() + Duration::hours(1));

        let snapshot = index.snapshot("user3").unwrap();
        assert_eq!(snapshot.coordinate, Coordinate::new(51.1183, 16.9908));
        assert_eq!(snapshot.last_updated, t0() + Duration::hours(1));
        assert_eq!(index.len(), 3);
        assert_eq!(
            index.search(&Coordinate::new(51.1182, 16.9907), 10.0),
            vec!["user1", "user2", "user3"]
        );
    }

    #[test]
    fn upsert_is_idempotent() {
        let index = ProximityIndex::new();
        for _ in 0..3 {
            index.upsert_snapshot("user1", Coordinate::new(1.0, 1.0), t0());
        }
        assert_eq!(index.len(), 1);
        assert_eq!(index.snapshot("user1").unwrap().last_updated, t0());
    }

    #[test]
    fn refresh_keeps_newer_snapshot() {
        let index = ProximityIndex::new();
        assert!(index.refresh_snapshot("user1", Coordinate::new(60.0, 16.0), t0() + Duration::minutes(9)));
        assert!(!index.refresh_snapshot("user1", Coordinate::new(51.0, 16.0), t0()));

        let snapshot = index.snapshot("user1").unwrap();
        assert_eq!(snapshot.coordinate, Coordinate::new(60.0, 16.0));
        assert_eq!(snapshot.last_updated, t0() + Duration::minutes(9));

        // 同一时刻的刷新仍然生效
        assert!(index.refresh_snapshot("user1", Coordinate::new(61.0, 16.0), t0() + Duration::minutes(9)));
        assert_eq!(index.snapshot("user1").unwrap().coordinate, Coordinate::new(61.0, 16.0));
    }

    #[test]
    fn removed_user_is_no_longer_found() {
        let index = seeded();
        assert!(index.remove("user2"));
        assert!(!index.remove("user2"));
        assert_eq!(index.search(&Coordinate::new(51.1182, 16.9907), 10.0), vec!["user1"]);
    }

    #[test]
    fn search_with_distance_reports_distance() {
        let index = seeded();
        let hits = index.search_with_distance(&Coordinate::new(51.1182, 16.9907), 10.0);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].1, 0.0);
        assert!((hits[1].1 - 4.6).abs() < 0.5);
    }
}
