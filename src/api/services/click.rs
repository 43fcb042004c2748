//! 点击接入端点
//!
//! 整条热路径：校验国家代码 → 按客户端 IP 限流 → 有界等待的
//! 原子自增 → 标记广播器。每个被接受的点击恰好调用一次
//! `increment`；Store 确认了自增，响应里才会带上新分数，
//! 两者严格绑定，不会出现重复计数。

use std::sync::Arc;
use std::time::Duration;

use actix_web::{HttpRequest, HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use tracing::{trace, warn};

use super::error_response;
use crate::api::rate_limit::ClickRateLimiter;
use crate::config::get_config;
use crate::errors::ClickWarError;
use crate::scoreboard::{ScoreStore, StandingsPublisher};
use crate::utils::country::{normalize_country_code, sanitize_country_name};
use crate::utils::ip::extract_client_ip;

#[derive(Debug, Clone, Deserialize)]
pub struct ClickRequest {
    pub country_code: String,
    /// 只在该国家本纪元首次出现时生效
    #[serde(default)]
    pub country_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClickResponse {
    pub success: bool,
    pub country_code: String,
    pub country_name: String,
    pub score: u64,
}

pub struct ClickService {}

impl ClickService {
    pub async fn handle_click(
        req: HttpRequest,
        payload: web::Json<ClickRequest>,
        store: web::Data<Arc<dyn ScoreStore>>,
        limiter: web::Data<Arc<ClickRateLimiter>>,
        publisher: web::Data<Arc<StandingsPublisher>>,
    ) -> impl Responder {
        let body = payload.into_inner();

        let code = match normalize_country_code(&body.country_code) {
            Ok(code) => code,
            Err(e) => {
                trace!("Click rejected, malformed code: {:?}", body.country_code);
                return error_response(&e);
            }
        };

        // 限流键：真实客户端 IP；拿不到时（如单元测试）退回固定键
        let client_key = extract_client_ip(&req).unwrap_or_else(|| "unknown".to_string());
        if let Err(e) = limiter.check(&client_key) {
            trace!("Click from {} rejected: rate limited", client_key);
            // 被拒绝的点击没有进 Store，客户端重试不会被重复计数
            return error_response(&e);
        }

        let config = get_config();
        let name = sanitize_country_name(&body.country_name, &code, config.game.country_name_max_len);

        let store_call = store.increment(&code, &name, 1);
        match timeout(Duration::from_secs(config.game.store_timeout_secs), store_call).await {
            Ok(Ok(row)) => {
                publisher.mark_dirty();
                HttpResponse::Ok().json(ClickResponse {
                    success: true,
                    country_code: row.country_code,
                    country_name: row.country_name,
                    score: row.score,
                })
            }
            Ok(Err(e)) => error_response(&e),
            Err(_) => {
                warn!("Score store increment timed out for {}", code);
                error_response(&ClickWarError::store_unavailable(
                    "increment timed out, click not confirmed",
                ))
            }
        }
    }
}

/// Click 路由配置
pub fn click_routes() -> actix_web::Scope {
    web::scope("").route("/click", web::post().to(ClickService::handle_click))
}
