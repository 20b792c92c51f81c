pub mod config;
pub mod error;

pub use config::Config;
pub use error::{Error, Result};

/// Base URL for the newsfilter API
pub const NEWSFILTER_BASE_URL: &str = "https://api.newsfilter.io";

/// Daily API call budget (calls per 24 hour window)
pub const DEFAULT_MAX_DAILY_REQUESTS: u32 = 100;

/// Hour of day (0-23, host-local) at which the daily budget resets
pub const DEFAULT_RESET_HOUR: u32 = 0;

/// Articles requested per page fetch
pub const DEFAULT_PAGE_LIMIT: u32 = 50;
