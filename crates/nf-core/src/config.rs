//! Configuration management for the newsfilter API client

use crate::error::{Error, Result};
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::env;

/// Main configuration struct for the newsfilter API client
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
  /// Newsfilter API key
  pub api_key: String,

  /// Request timeout in seconds
  pub timeout_secs: u64,

  /// Maximum retries for failed requests
  pub max_retries: u32,

  /// Base delay between retries in milliseconds
  pub retry_base_delay_ms: u64,

  /// Base URL for the newsfilter API
  pub base_url: String,
}

impl Config {
  /// Load configuration from environment variables
  pub fn from_env() -> Result<Self> {
    dotenv().ok();

    let api_key = env::var("NEWSFILTER_API_KEY")
      .map_err(|_| Error::ApiKey("NEWSFILTER_API_KEY not set".to_string()))?;

    let timeout_secs = env::var("NF_TIMEOUT_SECS")
      .unwrap_or_else(|_| "30".to_string())
      .parse()
      .map_err(|_| Error::Config("Invalid NF_TIMEOUT_SECS".to_string()))?;

    let max_retries = env::var("NF_MAX_RETRIES")
      .unwrap_or_else(|_| "3".to_string())
      .parse()
      .map_err(|_| Error::Config("Invalid NF_MAX_RETRIES".to_string()))?;

    let retry_base_delay_ms = env::var("NF_RETRY_BASE_DELAY_MS")
      .unwrap_or_else(|_| "1000".to_string())
      .parse()
      .map_err(|_| Error::Config("Invalid NF_RETRY_BASE_DELAY_MS".to_string()))?;

    let base_url =
      env::var("NF_BASE_URL").unwrap_or_else(|_| crate::NEWSFILTER_BASE_URL.to_string());

    Ok(Config { api_key, timeout_secs, max_retries, retry_base_delay_ms, base_url })
  }

  /// Create a config with default values (for testing)
  pub fn default_with_key(api_key: String) -> Self {
    Config {
      api_key,
      timeout_secs: 30,
      max_retries: 3,
      retry_base_delay_ms: 1000,
      base_url: crate::NEWSFILTER_BASE_URL.to_string(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_config_from_env() {
    env::set_var("NEWSFILTER_API_KEY", "test_key");
    let config = Config::from_env().unwrap();
    assert_eq!(config.api_key, "test_key");
    assert_eq!(config.max_retries, 3);
  }

  #[test]
  fn test_default_with_key() {
    let config = Config::default_with_key("k".to_string());
    assert_eq!(config.base_url, crate::NEWSFILTER_BASE_URL);
    assert_eq!(config.timeout_secs, 30);
  }
}
