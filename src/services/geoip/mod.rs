//! GeoIP 服务模块
//!
//! 把客户端 IP 解析成国家，供 /locate 端点使用：
//! - 按优先级尝试多个外部查询 API，拿到第一个格式合法的结果就停
//! - 全部失败时由调用方回退到配置的默认国家

mod external_api;
mod provider;

pub use external_api::ExternalApiProvider;
pub use provider::{CountryLookup, GeoLocation, ProviderChain};
