//! HTTP API 层
//!
//! 请求处理、限流和响应构建。业务状态都在 `scoreboard` 里，
//! 这一层只做校验、超时包装和错误 → 状态码的映射。

pub mod rate_limit;
pub mod services;

pub use rate_limit::ClickRateLimiter;
