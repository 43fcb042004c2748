//! 国家代码与展示名处理
//!
//! 国家代码来自不可信的客户端或外部 GeoIP API，这里只校验格式
//! （ISO 3166-1 alpha-2 的形），不校验地理真实性。

use crate::errors::{ClickWarError, Result};

/// 检查是否为合法的两位字母国家代码（大小写均可）
pub fn is_valid_country_code(code: &str) -> bool {
    let bytes = code.as_bytes();
    bytes.len() == 2 && bytes.iter().all(|b| b.is_ascii_alphabetic())
}

/// 校验并规范化国家代码：两个 ASCII 字母，统一大写
pub fn normalize_country_code(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if is_valid_country_code(trimmed) {
        Ok(trimmed.to_ascii_uppercase())
    } else {
        Err(ClickWarError::invalid_country_code(format!(
            "code {:?} is not ISO 3166-1 alpha-2",
            raw
        )))
    }
}

/// 清洗展示名：去首尾空白、按字符截断到 max_len，为空时退回国家代码
pub fn sanitize_country_name(raw: &str, code: &str, max_len: usize) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return code.to_string();
    }
    if trimmed.chars().count() > max_len {
        trimmed.chars().take(max_len).collect()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_codes() {
        assert!(is_valid_country_code("US"));
        assert!(is_valid_country_code("fr"));
        assert!(is_valid_country_code("De"));
    }

    #[test]
    fn test_invalid_codes() {
        assert!(!is_valid_country_code(""));
        assert!(!is_valid_country_code("U"));
        assert!(!is_valid_country_code("USA"));
        assert!(!is_valid_country_code("U1"));
        assert!(!is_valid_country_code("中国"));
    }

    #[test]
    fn test_normalize_uppercases() {
        assert_eq!(normalize_country_code("fr").unwrap(), "FR");
        assert_eq!(normalize_country_code(" de ").unwrap(), "DE");
        assert!(normalize_country_code("FRA").is_err());
    }

    #[test]
    fn test_sanitize_name_falls_back_to_code() {
        assert_eq!(sanitize_country_name("  ", "FR", 128), "FR");
        assert_eq!(sanitize_country_name("France", "FR", 128), "France");
    }

    #[test]
    fn test_sanitize_name_truncates_by_chars() {
        let long = "日本日本日本日本";
        assert_eq!(sanitize_country_name(long, "JP", 4), "日本日本");
    }
}
