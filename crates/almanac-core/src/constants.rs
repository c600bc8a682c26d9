/// Product name, logged at startup
pub const PRODUCT_NAME: &str = "Almanac";

pub const PRODUCT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = const_str::convert_ascii_case!(upper, PRODUCT_NAME);
