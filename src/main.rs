use std::sync::Arc;
use std::time::Duration;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware::Compress, web};
use tracing::info;

use clickwar::api::rate_limit::ClickRateLimiter;
use clickwar::api::services::{
    AppStartTime, click_routes, health_routes, locate_routes, scores_routes,
};
use clickwar::config::{get_config, init_config};
use clickwar::scoreboard::{
    MemoryScoreStore, ResetScheduler, ScoreStore, StandingsPublisher,
};
use clickwar::services::geoip::ProviderChain;

fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::new(level.to_string());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_level(true)
        .init();
}

fn build_cors(origins: &[String]) -> Cors {
    let mut cors = Cors::default()
        .allowed_methods(vec!["GET", "POST"])
        .allowed_header(actix_web::http::header::CONTENT_TYPE)
        .max_age(3600);

    if origins.iter().any(|o| o == "*") {
        cors = cors.allow_any_origin();
    } else {
        for origin in origins {
            cors = cors.allowed_origin(origin);
        }
    }
    cors
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // 记录程序启动时间
    let app_start_time = AppStartTime {
        start_datetime: chrono::Utc::now(),
    };

    dotenvy::dotenv().ok();
    init_config();
    let config = get_config();
    init_logging(&config.logging.level);

    // 计分核心：Store + 广播器 + 纪元调度器
    let store: Arc<dyn ScoreStore> = Arc::new(MemoryScoreStore::new());
    if let Ok(epoch) = store.current_epoch().await {
        info!("Score store ready, current epoch {}", epoch);
    }

    let publisher = Arc::new(StandingsPublisher::new(
        Arc::clone(&store),
        Duration::from_millis(config.game.publish_debounce_ms),
        config.game.subscriber_buffer,
    ));
    {
        let publisher = Arc::clone(&publisher);
        tokio::spawn(async move { publisher.run().await });
    }

    let scheduler = ResetScheduler::new(Arc::clone(&store), Arc::clone(&publisher));
    tokio::spawn(async move { scheduler.run().await });

    // 限流器 + 定期清理
    let limiter = Arc::new(ClickRateLimiter::new(
        config.rate_limit.clicks_per_second,
        config.rate_limit.burst_size,
    ));
    {
        let limiter = Arc::clone(&limiter);
        tokio::spawn(async move { limiter.run_gc(Duration::from_secs(60)).await });
    }

    // 地理位置解析链
    let geoip = Arc::new(ProviderChain::from_config(&config.geoip));

    let bind_address = format!("{}:{}", config.server.host, config.server.port);
    let cpu_count = config.server.cpu_count.min(32);
    info!(
        "Starting server at http://{} with {} workers",
        bind_address, cpu_count
    );

    HttpServer::new(move || {
        App::new()
            .wrap(build_cors(&config.server.cors_allowed_origins))
            .wrap(Compress::default())
            .app_data(web::Data::new(Arc::clone(&store)))
            .app_data(web::Data::new(Arc::clone(&publisher)))
            .app_data(web::Data::new(Arc::clone(&limiter)))
            .app_data(web::Data::new(Arc::clone(&geoip)))
            .app_data(web::Data::new(app_start_time.clone()))
            .service(health_routes())
            .service(click_routes())
            .service(scores_routes())
            .service(locate_routes())
    })
    .workers(cpu_count)
    .bind(bind_address)?
    .run()
    .await
}
