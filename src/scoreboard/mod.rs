//! 计分板核心
//!
//! 管理国家 → 分数的聚合状态，支持：
//! - 高并发原子自增（使用 DashMap，无全局锁热路径）
//! - UTC 零点纪元轮转（定时 + 惰性双触发，可崩溃恢复）
//! - 去抖合并的排行榜快照广播

pub mod epoch;
pub mod memory;
pub mod publisher;
pub mod store;

pub use epoch::{EpochId, ResetScheduler, next_utc_midnight};
pub use memory::MemoryScoreStore;
pub use publisher::{StandingsPublisher, Subscription};
pub use store::{CountryScore, CountryStanding, ScoreStore, StandingsSnapshot};
