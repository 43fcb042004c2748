//! 排行榜查询与实时推送
//!
//! `GET /scores` 给新来的或轮询的观察者一份一致的即时快照；
//! `GET /scores/stream` 用 SSE 把广播器的快照流推给长连接观察者
//! （订阅契约在 `scoreboard::publisher`，这里只是传输层）。

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use actix_web::{HttpResponse, Responder, web};
use futures_util::stream;
use serde::Deserialize;
use tokio::time::timeout;
use tracing::{debug, warn};

use super::error_response;
use crate::config::get_config;
use crate::errors::ClickWarError;
use crate::scoreboard::{ScoreStore, StandingsPublisher, StandingsSnapshot};

#[derive(Debug, Deserialize)]
pub struct ScoresQuery {
    /// 只要前 N 名（排行榜 UI 一般取 10）
    pub limit: Option<usize>,
}

pub struct ScoreService {}

impl ScoreService {
    pub async fn get_scores(
        query: web::Query<ScoresQuery>,
        store: web::Data<Arc<dyn ScoreStore>>,
    ) -> impl Responder {
        let config = get_config();

        match timeout(
            Duration::from_secs(config.game.store_timeout_secs),
            store.snapshot(),
        )
        .await
        {
            Ok(Ok(mut snapshot)) => {
                if let Some(limit) = query.limit {
                    snapshot.countries.truncate(limit);
                }
                HttpResponse::Ok().json(snapshot)
            }
            Ok(Err(e)) => error_response(&e),
            Err(_) => {
                warn!("Score store snapshot timed out");
                error_response(&ClickWarError::store_unavailable("snapshot timed out"))
            }
        }
    }

    pub async fn stream_scores(
        publisher: web::Data<Arc<StandingsPublisher>>,
    ) -> impl Responder {
        let subscription = publisher.subscribe();
        debug!("SSE stream opened, subscriber {}", subscription.id());

        // 新订阅者标记一次变更，首帧在一个去抖间隔内到达，
        // 不用干等下一次点击
        publisher.mark_dirty();

        // 连接断开时 stream 被丢弃，Subscription 的 Drop 负责退订
        let stream = stream::unfold(subscription, |mut sub| async move {
            match sub.recv().await {
                Some(snapshot) => Some((Ok::<_, Infallible>(sse_frame(&snapshot)), sub)),
                None => None,
            }
        });

        HttpResponse::Ok()
            .insert_header(("Content-Type", "text/event-stream"))
            .insert_header(("Cache-Control", "no-cache"))
            .streaming(stream)
    }
}

fn sse_frame(snapshot: &StandingsSnapshot) -> web::Bytes {
    let payload = serde_json::to_string(snapshot).unwrap_or_else(|_| "{}".to_string());
    web::Bytes::from(format!("data: {}\n\n", payload))
}

/// Scores 路由配置
pub fn scores_routes() -> actix_web::Scope {
    web::scope("")
        .route("/scores", web::get().to(ScoreService::get_scores))
        .route("/scores/stream", web::get().to(ScoreService::stream_scores))
}
