//! 计分纪元
//!
//! 一个纪元就是一个 UTC 日期：所有国家的计数器在每天 00:00 UTC 重置。
//! 轮转有两条触发路径：
//! 1. `ResetScheduler` 的定时任务在零点触发
//! 2. 进程跨零点宕机重启后，Store 在第一次读写时惰性检测并补做轮转
//!
//! 两条路径都走 `rollover_if_stale`，天然幂等。

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, info, trace, warn};

use super::publisher::StandingsPublisher;
use super::store::ScoreStore;

/// 纪元标识：分数归属的 UTC 日期，序列化为 "YYYY-MM-DD"
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct EpochId(NaiveDate);

impl EpochId {
    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        Self(at.date_naive())
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }
}

impl fmt::Display for EpochId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

/// `now` 之后的下一个 UTC 零点
pub fn next_utc_midnight(now: DateTime<Utc>) -> DateTime<Utc> {
    let tomorrow = now.date_naive().succ_opt().unwrap_or(now.date_naive());
    tomorrow.and_time(NaiveTime::MIN).and_utc()
}

/// 纪元轮转调度器
///
/// 睡到下一个 UTC 零点，触发 Store 轮转并通知 Publisher 广播重置后的
/// 排行榜。精确的时钟触发只是优化：就算这个任务死掉，Store 的惰性
/// 检测也会在下一次请求时完成轮转。
pub struct ResetScheduler {
    store: Arc<dyn ScoreStore>,
    publisher: Arc<StandingsPublisher>,
}

impl ResetScheduler {
    pub fn new(store: Arc<dyn ScoreStore>, publisher: Arc<StandingsPublisher>) -> Self {
        Self { store, publisher }
    }

    /// 启动调度循环（作为异步方法运行，不会返回）
    pub async fn run(&self) {
        loop {
            let now = Utc::now();
            let next = next_utc_midnight(now);
            let wait = (next - now)
                .to_std()
                .unwrap_or(std::time::Duration::from_secs(1));
            trace!(
                "ResetScheduler: sleeping {}s until {}",
                wait.as_secs(),
                next
            );
            sleep(wait).await;

            match self.store.rollover_if_stale(Utc::now()).await {
                Ok(Some(epoch)) => {
                    info!("ResetScheduler: epoch rolled over to {}", epoch);
                    self.publisher.mark_dirty();
                }
                Ok(None) => {
                    // 惰性路径抢先完成了轮转
                    debug!("ResetScheduler: epoch already current, nothing to do");
                }
                Err(e) => {
                    warn!("ResetScheduler: rollover failed: {}, will retry next tick", e);
                }
            }
        }
    }
}
