use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::epoch::EpochId;
use crate::errors::Result;

/// 某个国家在一个纪元内的完整计分行
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryScore {
    /// ISO 3166-1 alpha-2 国家代码 (e.g., "CN", "US")
    pub country_code: String,
    /// 展示名，取该代码在本纪元内首次出现时的值
    pub country_name: String,
    /// 非负计数器，纪元内单调递增
    pub score: u64,
    /// 分数归属的纪元（UTC 日期）
    pub epoch_id: EpochId,
    /// 最后一次自增的时间戳
    pub updated_at: DateTime<Utc>,
}

/// 排行榜中的一行（对外快照形状，供查询端点和订阅者使用）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryStanding {
    pub country_code: String,
    pub country_name: String,
    pub score: u64,
}

impl From<&CountryScore> for CountryStanding {
    fn from(row: &CountryScore) -> Self {
        Self {
            country_code: row.country_code.clone(),
            country_name: row.country_name.clone(),
            score: row.score,
        }
    }
}

/// 完整排行榜快照，一次广播 / 一次查询返回一份
///
/// 快照是某一时刻的一致视图：不会混合两个纪元的数据。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandingsSnapshot {
    pub epoch_id: EpochId,
    pub total_clicks: u64,
    /// 按 score 降序排列，分数相同时按 country_code 升序
    pub countries: Vec<CountryStanding>,
}

/// Score Store 抽象
///
/// 唯一的可变共享资源。所有变更都经过 `increment` 或纪元轮转，
/// 两者对同一国家的行互斥：轮转不会吞掉正在进行的自增。
#[async_trait]
pub trait ScoreStore: Send + Sync {
    /// 原子地给当前纪元内 `country_code` 的分数加上 `amount`，
    /// 行不存在时惰性创建（`country_name` 只在首次创建时生效），
    /// 返回自增后的完整行。
    ///
    /// 对同一国家的并发调用不会丢失更新；调用失败时不能假设分数已应用。
    async fn increment(&self, country_code: &str, country_name: &str, amount: u64)
    -> Result<CountryScore>;

    /// 当前纪元的所有行，score 降序、同分按 country_code 升序
    async fn get_all(&self) -> Result<Vec<CountryScore>>;

    /// 当前纪元所有分数之和
    async fn get_total(&self) -> Result<u64>;

    /// 当前活跃纪元
    async fn current_epoch(&self) -> Result<EpochId>;

    /// 当前纪元的一致快照（排行榜 + 总数 + 纪元）
    async fn snapshot(&self) -> Result<StandingsSnapshot>;

    /// 查询某个已结束纪元的冻结聚合，未知纪元返回 None
    async fn history(&self, epoch: EpochId) -> Result<Option<Vec<CountryScore>>>;

    /// 如果存储的纪元早于 `now` 所在的 UTC 日期则执行轮转，
    /// 返回新纪元；已经是当天则返回 None（幂等）。
    async fn rollover_if_stale(&self, now: DateTime<Utc>) -> Result<Option<EpochId>>;
}
