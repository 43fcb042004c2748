use std::env;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub game: GameConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub geoip: GeoIpConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
    #[serde(default = "default_cpu_count")]
    pub cpu_count: usize,
    /// 允许跨域访问的来源，"*" 表示任意来源（游戏前端通常部署在别的域名下）
    #[serde(default = "default_cors_origins")]
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    /// Standings Publisher 合并广播的去抖间隔（毫秒）
    #[serde(default = "default_publish_debounce_ms")]
    pub publish_debounce_ms: u64,
    /// 每个订阅者的快照通道容量，慢订阅者超过后丢弃中间快照
    #[serde(default = "default_subscriber_buffer")]
    pub subscriber_buffer: usize,
    /// country_name 的最大长度，超出部分截断
    #[serde(default = "default_country_name_max_len")]
    pub country_name_max_len: usize,
    /// Score Store 调用的有界等待（秒），超时返回 StoreUnavailable
    #[serde(default = "default_store_timeout_secs")]
    pub store_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// 每个客户端每秒允许的点击数
    #[serde(default = "default_clicks_per_second")]
    pub clicks_per_second: u32,
    /// 突发容量
    #[serde(default = "default_burst_size")]
    pub burst_size: u32,
    /// 可信反向代理（单 IP 或 CIDR），匹配时才信任 X-Forwarded-For
    #[serde(default)]
    pub trusted_proxies: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoIpConfig {
    /// 按优先级排列的外部查询 API，使用 {ip} 作为占位符
    #[serde(default = "default_geoip_providers")]
    pub providers: Vec<String>,
    /// 所有 provider 都失败时回退的国家
    #[serde(default = "default_fallback_country_code")]
    pub fallback_country_code: String,
    #[serde(default = "default_fallback_country_name")]
    pub fallback_country_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default value functions
fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    8080
}

fn default_cpu_count() -> usize {
    num_cpus::get()
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_publish_debounce_ms() -> u64 {
    200
}

fn default_subscriber_buffer() -> usize {
    8
}

fn default_country_name_max_len() -> usize {
    128
}

fn default_store_timeout_secs() -> u64 {
    3
}

fn default_clicks_per_second() -> u32 {
    10
}

fn default_burst_size() -> u32 {
    20
}

fn default_geoip_providers() -> Vec<String> {
    vec![
        "http://ip-api.com/json/{ip}?fields=status,countryCode,country".to_string(),
        "https://ipapi.co/{ip}/json/".to_string(),
    ]
}

fn default_fallback_country_code() -> String {
    "US".to_string()
}

fn default_fallback_country_name() -> String {
    "United States".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            game: GameConfig::default(),
            rate_limit: RateLimitConfig::default(),
            geoip: GeoIpConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            cpu_count: default_cpu_count(),
            cors_allowed_origins: default_cors_origins(),
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            publish_debounce_ms: default_publish_debounce_ms(),
            subscriber_buffer: default_subscriber_buffer(),
            country_name_max_len: default_country_name_max_len(),
            store_timeout_secs: default_store_timeout_secs(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            clicks_per_second: default_clicks_per_second(),
            burst_size: default_burst_size(),
            trusted_proxies: Vec::new(),
        }
    }
}

impl Default for GeoIpConfig {
    fn default() -> Self {
        Self {
            providers: default_geoip_providers(),
            fallback_country_code: default_fallback_country_code(),
            fallback_country_name: default_fallback_country_name(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// 加载配置：TOML 文件（可选）→ 环境变量覆盖
    pub fn load() -> Self {
        let mut config = if let Ok(path) = env::var("CONFIG_FILE") {
            Self::load_from_file(&path).unwrap_or_else(|| {
                warn!("Failed to load config file {}, using defaults", path);
                Config::default()
            })
        } else {
            Config::default()
        };

        config.apply_env_overrides();
        config
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Option<Self> {
        let content = fs::read_to_string(path.as_ref()).ok()?;
        match toml::from_str(&content) {
            Ok(config) => {
                debug!("Loaded config from {}", path.as_ref().display());
                Some(config)
            }
            Err(e) => {
                warn!("Invalid config file {}: {}", path.as_ref().display(), e);
                None
            }
        }
    }

    fn apply_env_overrides(&mut self) {
        // Server config
        if let Ok(host) = env::var("SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = env::var("SERVER_PORT")
            && let Ok(port) = port.parse()
        {
            self.server.port = port;
        }
        if let Ok(cpu_count) = env::var("CPU_COUNT")
            && let Ok(count) = cpu_count.parse()
        {
            self.server.cpu_count = count;
        }
        if let Ok(origins) = env::var("CORS_ALLOWED_ORIGINS") {
            self.server.cors_allowed_origins =
                origins.split(',').map(|s| s.trim().to_string()).collect();
        }

        // Game config
        if let Ok(debounce) = env::var("PUBLISH_DEBOUNCE_MS")
            && let Ok(ms) = debounce.parse()
        {
            self.game.publish_debounce_ms = ms;
        }
        if let Ok(timeout) = env::var("STORE_TIMEOUT_SECS")
            && let Ok(secs) = timeout.parse()
        {
            self.game.store_timeout_secs = secs;
        }

        // Rate limit config
        if let Ok(cps) = env::var("CLICKS_PER_SECOND")
            && let Ok(cps) = cps.parse()
        {
            self.rate_limit.clicks_per_second = cps;
        }
        if let Ok(burst) = env::var("CLICK_BURST_SIZE")
            && let Ok(burst) = burst.parse()
        {
            self.rate_limit.burst_size = burst;
        }
        if let Ok(proxies) = env::var("TRUSTED_PROXIES") {
            self.rate_limit.trusted_proxies =
                proxies.split(',').map(|s| s.trim().to_string()).collect();
        }

        // GeoIP config
        if let Ok(providers) = env::var("GEOIP_PROVIDERS") {
            self.geoip.providers = providers.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Ok(code) = env::var("FALLBACK_COUNTRY_CODE") {
            self.geoip.fallback_country_code = code;
        }
        if let Ok(name) = env::var("FALLBACK_COUNTRY_NAME") {
            self.geoip.fallback_country_name = name;
        }

        // Logging config
        if let Ok(log_level) = env::var("RUST_LOG") {
            self.logging.level = log_level;
        }
    }
}

// Global configuration instance
use std::sync::OnceLock;
static CONFIG: OnceLock<Config> = OnceLock::new();

/// Get the global configuration instance
pub fn get_config() -> &'static Config {
    CONFIG.get_or_init(Config::load)
}

/// Initialize the global configuration
pub fn init_config() {
    CONFIG.get_or_init(Config::load);
}
