use thiserror::Error;

/// The main error type for nf-* crates
#[derive(Error, Debug)]
pub enum Error {
  /// Configuration error
  #[error("Configuration error: {0}")]
  Config(String),

  /// API key error
  #[error("Failed to retrieve API key: {0}")]
  ApiKey(String),

  /// HTTP transport error
  #[error("HTTP error: {0}")]
  Http(String),

  /// API error from newsfilter
  #[error("API error: {0}")]
  Api(String),

  /// Parse error for data processing
  #[error("Parse error: {0}")]
  Parse(String),
}

/// Result type alias for nf-* crates
pub type Result<T> = std::result::Result<T, Error>;
