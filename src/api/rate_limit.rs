//! 点击限流
//!
//! 基于 governor（GCRA）的按客户端 IP 限流。滥用防护是 best-effort：
//! 近似限流即可，被拒绝的点击不消耗配额，客户端退避后重试不吃亏。

use std::num::NonZeroU32;
use std::time::Duration;

use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use tokio::time::sleep;
use tracing::trace;

use crate::errors::{ClickWarError, Result};

pub struct ClickRateLimiter {
    limiter: DefaultKeyedRateLimiter<String>,
}

impl ClickRateLimiter {
    /// 每秒 `clicks_per_second` 次、突发 `burst_size` 次的按键限流器
    pub fn new(clicks_per_second: u32, burst_size: u32) -> Self {
        let per_second = NonZeroU32::new(clicks_per_second).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(burst_size).unwrap_or(NonZeroU32::MIN);
        let quota = Quota::per_second(per_second).allow_burst(burst);
        Self {
            limiter: RateLimiter::keyed(quota),
        }
    }

    /// 检查这个客户端的下一次点击是否放行
    pub fn check(&self, key: &str) -> Result<()> {
        self.limiter
            .check_key(&key.to_string())
            .map_err(|_| ClickWarError::rate_limited("too many clicks, slow down"))
    }

    /// 清理长时间不活跃的 key，防止状态表无限增长
    pub fn retain_recent(&self) {
        self.limiter.retain_recent();
    }

    /// 定期清理任务（作为异步方法运行，不会返回）
    pub async fn run_gc(&self, interval: Duration) {
        loop {
            sleep(interval).await;
            self.retain_recent();
            trace!("ClickRateLimiter: stale keys pruned");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burst_then_limited() {
        let limiter = ClickRateLimiter::new(1, 2);

        assert!(limiter.check("1.2.3.4").is_ok());
        assert!(limiter.check("1.2.3.4").is_ok());
        // 突发额度用完
        let err = limiter.check("1.2.3.4").unwrap_err();
        assert!(matches!(err, ClickWarError::RateLimited(_)));
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = ClickRateLimiter::new(1, 1);

        assert!(limiter.check("1.2.3.4").is_ok());
        assert!(limiter.check("1.2.3.4").is_err());
        // 另一个客户端不受影响
        assert!(limiter.check("5.6.7.8").is_ok());
    }

    #[test]
    fn test_zero_config_degrades_to_minimum() {
        // 配置为 0 时退化到每秒 1 次，而不是 panic
        let limiter = ClickRateLimiter::new(0, 0);
        assert!(limiter.check("1.2.3.4").is_ok());
        assert!(limiter.check("1.2.3.4").is_err());
    }
}
