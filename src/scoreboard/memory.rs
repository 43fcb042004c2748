//! 内存版 Score Store
//!
//! 单进程部署的默认后端：
//! - 每个国家一个原子计数器，自增无锁、不同国家之间零竞争
//! - 纪元边界用一把读写锁保护：自增持读锁、轮转持写锁，
//!   保证在途的点击要么完整落在旧纪元、要么完整落在新纪元
//! - 已结束的纪元冻结成有序聚合保留在内存里，可供审计查询

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::{RwLock, RwLockReadGuard};
use tracing::{debug, trace};

use super::epoch::EpochId;
use super::store::{CountryScore, CountryStanding, ScoreStore, StandingsSnapshot};
use crate::errors::{ClickWarError, Result};

/// 纪元锁的有界等待，超时说明轮转卡住了，返回 EpochTransition 让调用方重试
const EPOCH_LOCK_TIMEOUT: Duration = Duration::from_secs(2);

struct CountryEntry {
    /// 首次创建时的展示名，纪元内不再变化
    name: String,
    score: AtomicU64,
    updated_at_ms: AtomicI64,
}

impl CountryEntry {
    fn new(name: String, now_ms: i64) -> Self {
        Self {
            name,
            score: AtomicU64::new(0),
            updated_at_ms: AtomicI64::new(now_ms),
        }
    }
}

/// 一个纪元的活跃计分状态
struct EpochScores {
    epoch_id: EpochId,
    /// 国家代码 → 计分行（使用 Arc<str> 减少克隆开销）
    entries: DashMap<Arc<str>, CountryEntry>,
    /// 纪元内总点击数
    total: AtomicU64,
}

impl EpochScores {
    fn new(epoch_id: EpochId) -> Self {
        Self {
            epoch_id,
            entries: DashMap::new(),
            total: AtomicU64::new(0),
        }
    }
}

pub struct MemoryScoreStore {
    current: RwLock<EpochScores>,
    /// 已结束纪元的冻结聚合
    history: RwLock<HashMap<EpochId, Vec<CountryScore>>>,
    lock_timeout: Duration,
}

impl MemoryScoreStore {
    pub fn new() -> Self {
        Self::with_epoch(EpochId::from_datetime(Utc::now()))
    }

    /// 从指定纪元启动（测试和恢复场景）
    pub fn with_epoch(epoch_id: EpochId) -> Self {
        Self {
            current: RwLock::new(EpochScores::new(epoch_id)),
            history: RwLock::new(HashMap::new()),
            lock_timeout: EPOCH_LOCK_TIMEOUT,
        }
    }

    fn busy() -> ClickWarError {
        ClickWarError::epoch_transition("epoch rollover in progress, retry shortly")
    }

    /// 拿到当前纪元的读守卫，必要时先惰性补做轮转
    ///
    /// 读守卫在手意味着轮转不可能同时进行：守卫存活期间完成的自增
    /// 一定完整落在守卫对应的纪元里。
    fn current_guard(&self, now: DateTime<Utc>) -> Result<RwLockReadGuard<'_, EpochScores>> {
        let today = EpochId::from_datetime(now);
        {
            let guard = self
                .current
                .try_read_for(self.lock_timeout)
                .ok_or_else(Self::busy)?;
            // 只有严格早于今天才算过期；时钟回拨时保持现有纪元
            if guard.epoch_id >= today {
                return Ok(guard);
            }
        }

        self.advance_epoch(today)?;
        self.current
            .try_read_for(self.lock_timeout)
            .ok_or_else(Self::busy)
    }

    /// 推进到目标纪元：冻结旧纪元进历史，换上空白状态
    ///
    /// 返回 false 表示别人已经完成了轮转（幂等）。
    fn advance_epoch(&self, target: EpochId) -> Result<bool> {
        let mut cur = self
            .current
            .try_write_for(self.lock_timeout)
            .ok_or_else(Self::busy)?;
        if cur.epoch_id >= target {
            return Ok(false);
        }

        let old_id = cur.epoch_id;
        let frozen = Self::collect_sorted(&cur);
        // 持有写锁期间完成冻结 + 替换，读不到半新半旧的状态
        self.history.write().insert(old_id, frozen);
        *cur = EpochScores::new(target);

        debug!("Epoch advanced: {} -> {}", old_id, target);
        Ok(true)
    }

    /// 聚合为有序行：score 降序，同分按 country_code 升序
    fn collect_sorted(cur: &EpochScores) -> Vec<CountryScore> {
        let mut rows: Vec<CountryScore> = cur
            .entries
            .iter()
            .map(|entry| CountryScore {
                country_code: entry.key().to_string(),
                country_name: entry.value().name.clone(),
                score: entry.value().score.load(Ordering::Acquire),
                epoch_id: cur.epoch_id,
                updated_at: DateTime::from_timestamp_millis(
                    entry.value().updated_at_ms.load(Ordering::Acquire),
                )
                .unwrap_or_default(),
            })
            .collect();

        rows.sort_unstable_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| a.country_code.cmp(&b.country_code))
        });
        rows
    }
}

impl Default for MemoryScoreStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ScoreStore for MemoryScoreStore {
    async fn increment(
        &self,
        country_code: &str,
        country_name: &str,
        amount: u64,
    ) -> Result<CountryScore> {
        let now = Utc::now();
        let now_ms = now.timestamp_millis();
        let guard = self.current_guard(now)?;
        let epoch_id = guard.epoch_id;

        // 优化：先尝试 get 更新已存在的 key（无 Arc 分配）
        // 高并发下大多数点击是热点国家，可显著减少分配开销
        let (new_score, name) = if let Some(entry) = guard.entries.get(country_code) {
            let new_score = entry.score.fetch_add(amount, Ordering::AcqRel) + amount;
            entry.updated_at_ms.store(now_ms, Ordering::Release);
            (new_score, entry.name.clone())
        } else {
            // 只有新国家才需要分配 Arc
            // 注意：这里有 TOCTOU 窗口，entry() 内部会重新检查，
            // 最坏情况只是多分配一次 Arc，计数不会丢
            let entry = guard
                .entries
                .entry(Arc::from(country_code))
                .or_insert_with(|| CountryEntry::new(country_name.to_string(), now_ms));
            let new_score = entry.score.fetch_add(amount, Ordering::AcqRel) + amount;
            entry.updated_at_ms.store(now_ms, Ordering::Release);
            (new_score, entry.name.clone())
        };

        guard.total.fetch_add(amount, Ordering::Relaxed);
        trace!("Incremented {}: score={}", country_code, new_score);

        Ok(CountryScore {
            country_code: country_code.to_string(),
            country_name: name,
            score: new_score,
            epoch_id,
            updated_at: now,
        })
    }

    async fn get_all(&self) -> Result<Vec<CountryScore>> {
        let guard = self.current_guard(Utc::now())?;
        Ok(Self::collect_sorted(&guard))
    }

    async fn get_total(&self) -> Result<u64> {
        let guard = self.current_guard(Utc::now())?;
        Ok(guard.total.load(Ordering::Acquire))
    }

    async fn current_epoch(&self) -> Result<EpochId> {
        let guard = self.current_guard(Utc::now())?;
        Ok(guard.epoch_id)
    }

    async fn snapshot(&self) -> Result<StandingsSnapshot> {
        let guard = self.current_guard(Utc::now())?;
        let rows = Self::collect_sorted(&guard);
        // 总数从同一批行里算出来，和列表保持一致
        let total_clicks = rows.iter().map(|r| r.score).sum();
        Ok(StandingsSnapshot {
            epoch_id: guard.epoch_id,
            total_clicks,
            countries: rows.iter().map(CountryStanding::from).collect(),
        })
    }

    async fn history(&self, epoch: EpochId) -> Result<Option<Vec<CountryScore>>> {
        Ok(self.history.read().get(&epoch).cloned())
    }

    async fn rollover_if_stale(&self, now: DateTime<Utc>) -> Result<Option<EpochId>> {
        let target = EpochId::from_datetime(now);
        if self.advance_epoch(target)? {
            Ok(Some(target))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_increment_creates_row_lazily() {
        let store = MemoryScoreStore::new();
        let row = store.increment("FR", "France", 1).await.unwrap();
        assert_eq!(row.country_code, "FR");
        assert_eq!(row.country_name, "France");
        assert_eq!(row.score, 1);

        let row = store.increment("FR", "France", 1).await.unwrap();
        assert_eq!(row.score, 2);
    }

    #[tokio::test]
    async fn test_first_seen_name_wins() {
        let store = MemoryScoreStore::new();
        store.increment("DE", "Germany", 1).await.unwrap();
        let row = store.increment("DE", "Deutschland", 1).await.unwrap();
        assert_eq!(row.country_name, "Germany");
    }

    #[tokio::test]
    async fn test_get_all_ordering() {
        let store = MemoryScoreStore::new();
        store.increment("BR", "Brazil", 2).await.unwrap();
        store.increment("AR", "Argentina", 2).await.unwrap();
        store.increment("CL", "Chile", 5).await.unwrap();

        let rows = store.get_all().await.unwrap();
        let codes: Vec<&str> = rows.iter().map(|r| r.country_code.as_str()).collect();
        // CL 最高，AR/BR 同分按代码升序
        assert_eq!(codes, vec!["CL", "AR", "BR"]);
    }

    #[tokio::test]
    async fn test_snapshot_consistent_totals() {
        let store = MemoryScoreStore::new();
        store.increment("FR", "France", 3).await.unwrap();
        store.increment("DE", "Germany", 1).await.unwrap();

        let snapshot = store.snapshot().await.unwrap();
        assert_eq!(snapshot.total_clicks, 4);
        assert_eq!(snapshot.countries.len(), 2);
        assert_eq!(store.get_total().await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_rollover_freezes_history() {
        let store = MemoryScoreStore::new();
        store.increment("FR", "France", 3).await.unwrap();
        let old_epoch = store.current_epoch().await.unwrap();

        let tomorrow = Utc::now() + chrono::Duration::days(1);
        let rolled = store.rollover_if_stale(tomorrow).await.unwrap();
        assert_eq!(rolled, Some(EpochId::from_datetime(tomorrow)));

        // 再轮转一次是 no-op
        assert!(store.rollover_if_stale(tomorrow).await.unwrap().is_none());

        // 旧纪元被冻结，新纪元从零开始
        let frozen = store.history(old_epoch).await.unwrap().unwrap();
        assert_eq!(frozen.len(), 1);
        assert_eq!(frozen[0].score, 3);
    }

    #[tokio::test]
    async fn test_lazy_rollover_on_first_access() {
        let yesterday = EpochId::from_datetime(Utc::now() - chrono::Duration::days(1));
        let store = MemoryScoreStore::with_epoch(yesterday);

        // 第一次读就把过期纪元补轮转掉
        let rows = store.get_all().await.unwrap();
        assert!(rows.is_empty());
        assert!(store.current_epoch().await.unwrap() > yesterday);
        assert!(store.history(yesterday).await.unwrap().is_some());
    }
}
