//! GeoIP Provider 抽象层
//!
//! 统一的国家查询接口。和单 provider 不同，这里是一条按优先级
//! 排列的链：逐个尝试，第一个返回结构合法结果的 provider 胜出，
//! 全部失败返回 None（调用方负责回退到默认国家）。

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use super::external_api::ExternalApiProvider;
use crate::config::GeoIpConfig;
use crate::utils::country::normalize_country_code;

/// 地理位置信息：客户端归属的国家
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeoLocation {
    /// ISO 3166-1 alpha-2 国家代码 (e.g., "CN", "US")
    pub country_code: String,
    /// 展示名
    pub country_name: String,
}

/// 国家查询 trait
#[async_trait]
pub trait CountryLookup: Send + Sync {
    /// 查询 IP 地址归属的国家，失败或无结果返回 None
    async fn lookup(&self, ip: &str) -> Option<GeoLocation>;

    /// 获取 provider 名称（用于日志）
    fn name(&self) -> &'static str;
}

/// 按优先级排列的 provider 链
pub struct ProviderChain {
    providers: Vec<Arc<dyn CountryLookup>>,
}

impl ProviderChain {
    /// 根据 GeoIpConfig 初始化：每个 URL 模板一个外部 API provider
    pub fn from_config(config: &GeoIpConfig) -> Self {
        let providers: Vec<Arc<dyn CountryLookup>> = config
            .providers
            .iter()
            .map(|url| Arc::new(ExternalApiProvider::new(url)) as Arc<dyn CountryLookup>)
            .collect();

        info!("GeoIP: Initialized chain with {} providers", providers.len());
        Self { providers }
    }

    #[cfg(test)]
    pub fn from_providers(providers: Vec<Arc<dyn CountryLookup>>) -> Self {
        Self { providers }
    }

    /// 逐个尝试 provider，返回第一个格式合法的结果
    ///
    /// provider 返回的内容是不可信输入：国家代码不符合两位字母
    /// 格式的结果按失败处理，继续尝试下一个。
    pub async fn resolve(&self, ip: &str) -> Option<GeoLocation> {
        for provider in &self.providers {
            let Some(raw) = provider.lookup(ip).await else {
                debug!("GeoIP: provider {} returned no result for {}", provider.name(), ip);
                continue;
            };

            match normalize_country_code(&raw.country_code) {
                Ok(code) => {
                    let name = if raw.country_name.trim().is_empty() {
                        code.clone()
                    } else {
                        raw.country_name.trim().to_string()
                    };
                    debug!("GeoIP: {} resolved {} -> {}", provider.name(), ip, code);
                    return Some(GeoLocation {
                        country_code: code,
                        country_name: name,
                    });
                }
                Err(_) => {
                    debug!(
                        "GeoIP: provider {} returned malformed code {:?}, trying next",
                        provider.name(),
                        raw.country_code
                    );
                }
            }
        }
        None
    }
}
