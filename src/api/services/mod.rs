pub mod click;
pub mod health;
pub mod locate;
pub mod scores;

pub use click::{ClickService, click_routes};
pub use health::{AppStartTime, HealthService, health_routes};
pub use locate::{LocateService, locate_routes};
pub use scores::{ScoreService, scores_routes};

use actix_web::HttpResponse;
use actix_web::http::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::ClickWarError;

/// 错误响应体，所有端点共用
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// 错误 → HTTP 响应的统一映射
///
/// 客户端错误（400/429）不值得重试，瞬时错误（503）可以退避后重试。
pub(crate) fn error_response(err: &ClickWarError) -> HttpResponse {
    let status = match err {
        ClickWarError::InvalidCountryCode(_) => StatusCode::BAD_REQUEST,
        ClickWarError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
        ClickWarError::StoreUnavailable(_) | ClickWarError::EpochTransition(_) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        ClickWarError::Serialization(_) | ClickWarError::Configuration(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    debug!("Request rejected [{}]: {}", err.code(), err);
    HttpResponse::build(status).json(ErrorBody {
        error: err.format_simple(),
    })
}
