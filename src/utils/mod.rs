pub mod country;
pub mod ip;

pub use country::{is_valid_country_code, normalize_country_code, sanitize_country_name};
