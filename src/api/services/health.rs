use std::sync::Arc;
use std::time::{Duration, Instant};

use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use tracing::{error, trace};

use crate::scoreboard::ScoreStore;

// 应用启动时间结构体
#[derive(Clone, Debug)]
pub struct AppStartTime {
    pub start_datetime: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub epoch_id: Option<String>,
    pub total_clicks: Option<u64>,
    pub uptime_seconds: u32,
    pub response_time_ms: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Health Service
///
/// 注意：此 service 直接探测 Score Store，不经过 API 层的限流和
/// 超时配置。基础设施探针（k8s probes）要求简单直接、快速响应。
pub struct HealthService;

impl HealthService {
    pub async fn health_check(
        store: web::Data<Arc<dyn ScoreStore>>,
        app_start_time: web::Data<AppStartTime>,
    ) -> impl Responder {
        let start_time = Instant::now();
        trace!("Received health check request");

        // 探测存储健康状况（只取总数和纪元，不做全量聚合）
        let probe = tokio::time::timeout(Duration::from_secs(5), async {
            let total = store.get_total().await?;
            let epoch = store.current_epoch().await?;
            Ok::<_, crate::errors::ClickWarError>((total, epoch))
        })
        .await;

        let now = chrono::Utc::now();
        let uptime_seconds = (now - app_start_time.start_datetime).num_seconds().max(0) as u32;

        let (is_healthy, response) = match probe {
            Ok(Ok((total, epoch))) => (
                true,
                HealthResponse {
                    status: "healthy".to_string(),
                    epoch_id: Some(epoch.to_string()),
                    total_clicks: Some(total),
                    uptime_seconds,
                    response_time_ms: start_time.elapsed().as_millis() as u32,
                    error: None,
                },
            ),
            Ok(Err(e)) => {
                error!("Score store health check failed: {}", e);
                (
                    false,
                    HealthResponse {
                        status: "unhealthy".to_string(),
                        epoch_id: None,
                        total_clicks: None,
                        uptime_seconds,
                        response_time_ms: start_time.elapsed().as_millis() as u32,
                        error: Some(e.format_simple()),
                    },
                )
            }
            Err(_) => {
                error!("Score store health check timeout");
                (
                    false,
                    HealthResponse {
                        status: "unhealthy".to_string(),
                        epoch_id: None,
                        total_clicks: None,
                        uptime_seconds,
                        response_time_ms: start_time.elapsed().as_millis() as u32,
                        error: Some("timeout".to_string()),
                    },
                )
            }
        };

        let response_status = if is_healthy {
            actix_web::http::StatusCode::OK
        } else {
            actix_web::http::StatusCode::SERVICE_UNAVAILABLE
        };

        HttpResponse::build(response_status).json(response)
    }

    // 活跃性检查，检查基本服务可用性
    pub async fn liveness_check() -> impl Responder {
        trace!("Received liveness check request");

        HttpResponse::NoContent().finish()
    }
}

/// Health 路由配置
pub fn health_routes() -> actix_web::Scope {
    web::scope("/health")
        .route("", web::get().to(HealthService::health_check))
        .route("", web::head().to(HealthService::health_check))
        .route("/live", web::get().to(HealthService::liveness_check))
        .route("/live", web::head().to(HealthService::liveness_check))
}
