use std::fmt;

#[derive(Debug, Clone)]
pub enum ClickWarError {
    InvalidCountryCode(String),
    RateLimited(String),
    StoreUnavailable(String),
    EpochTransition(String),
    Serialization(String),
    Configuration(String),
}

impl ClickWarError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            ClickWarError::InvalidCountryCode(_) => "E001",
            ClickWarError::RateLimited(_) => "E002",
            ClickWarError::StoreUnavailable(_) => "E003",
            ClickWarError::EpochTransition(_) => "E004",
            ClickWarError::Serialization(_) => "E005",
            ClickWarError::Configuration(_) => "E006",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            ClickWarError::InvalidCountryCode(_) => "Invalid Country Code",
            ClickWarError::RateLimited(_) => "Rate Limited",
            ClickWarError::StoreUnavailable(_) => "Score Store Unavailable",
            ClickWarError::EpochTransition(_) => "Epoch Transition In Progress",
            ClickWarError::Serialization(_) => "Serialization Error",
            ClickWarError::Configuration(_) => "Configuration Error",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            ClickWarError::InvalidCountryCode(msg) => msg,
            ClickWarError::RateLimited(msg) => msg,
            ClickWarError::StoreUnavailable(msg) => msg,
            ClickWarError::EpochTransition(msg) => msg,
            ClickWarError::Serialization(msg) => msg,
            ClickWarError::Configuration(msg) => msg,
        }
    }

    /// 客户端错误不值得重试，瞬时错误可以退避后重试
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ClickWarError::StoreUnavailable(_) | ClickWarError::EpochTransition(_)
        )
    }

    /// 格式化为简洁输出
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for ClickWarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // 默认使用简洁格式
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for ClickWarError {}

// 便捷的构造函数
impl ClickWarError {
    pub fn invalid_country_code<T: Into<String>>(msg: T) -> Self {
        ClickWarError::InvalidCountryCode(msg.into())
    }

    pub fn rate_limited<T: Into<String>>(msg: T) -> Self {
        ClickWarError::RateLimited(msg.into())
    }

    pub fn store_unavailable<T: Into<String>>(msg: T) -> Self {
        ClickWarError::StoreUnavailable(msg.into())
    }

    pub fn epoch_transition<T: Into<String>>(msg: T) -> Self {
        ClickWarError::EpochTransition(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        ClickWarError::Serialization(msg.into())
    }

    pub fn configuration<T: Into<String>>(msg: T) -> Self {
        ClickWarError::Configuration(msg.into())
    }
}

// 为常见的错误类型实现 From trait
impl From<serde_json::Error> for ClickWarError {
    fn from(err: serde_json::Error) -> Self {
        ClickWarError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for ClickWarError {
    fn from(err: std::io::Error) -> Self {
        ClickWarError::Configuration(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ClickWarError>;
