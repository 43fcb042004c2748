//! 客户端国家检测
//!
//! 前端启动时调用一次 `GET /locate`，拿到点击应该归属的国家。
//! 解析链：私有/本地 IP 直接给默认国家；公网 IP 走 provider 链，
//! 全部失败同样回退默认。结果只做格式校验，不保证地理真实性。

use std::net::IpAddr;
use std::sync::Arc;

use actix_web::{HttpRequest, HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::config::get_config;
use crate::services::geoip::{GeoLocation, ProviderChain};
use crate::utils::ip::{extract_client_ip, is_private_or_local};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocateResponse {
    pub country_code: String,
    pub country_name: String,
}

impl From<GeoLocation> for LocateResponse {
    fn from(loc: GeoLocation) -> Self {
        Self {
            country_code: loc.country_code,
            country_name: loc.country_name,
        }
    }
}

pub struct LocateService {}

impl LocateService {
    pub async fn locate(
        req: HttpRequest,
        chain: web::Data<Arc<ProviderChain>>,
    ) -> impl Responder {
        let config = get_config();
        let fallback = GeoLocation {
            country_code: config.geoip.fallback_country_code.clone(),
            country_name: config.geoip.fallback_country_name.clone(),
        };

        let Some(ip) = extract_client_ip(&req) else {
            trace!("Locate: no client IP, using fallback country");
            return HttpResponse::Ok().json(LocateResponse::from(fallback));
        };

        // 私有/本地地址查不出有意义的结果，不浪费外部 API 配额
        if let Ok(ip_addr) = ip.parse::<IpAddr>()
            && is_private_or_local(&ip_addr)
        {
            trace!("Locate: private IP {}, using fallback country", ip);
            return HttpResponse::Ok().json(LocateResponse::from(fallback));
        }

        let location = match chain.resolve(&ip).await {
            Some(location) => location,
            None => {
                debug!("Locate: all providers failed for {}, using fallback", ip);
                fallback
            }
        };

        HttpResponse::Ok().json(LocateResponse::from(location))
    }
}

/// Locate 路由配置
pub fn locate_routes() -> actix_web::Scope {
    web::scope("").route("/locate", web::get().to(LocateService::locate))
}
