/*
 *
 *
 *
 *
 * MIT License
 * Copyright (c) 2025. Dwight J. Browne
 * dwight[-at-]dwightjbrowne[-dot-]com
 *
 *
 * Permission is hereby granted, free of charge, to any person obtaining a copy
 * of this software and associated documentation files (the "Software"), to deal
 * in the Software without restriction, including without limitation the rights
 * to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
 * copies of the Software, and to permit persons to whom the Software is
 * furnished to do so, subject to the following conditions:
 *
 * The above copyright notice and this permission notice shall be included in all
 * copies or substantial portions of the Software.
 *
 * THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
 * IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
 * FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
 * AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
 * LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
 * OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
 * SOFTWARE.
 */

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum IngestError {
  #[error("API error: {0}")]
  ApiError(String),

  #[error("Database error: {0}")]
  DatabaseError(String),

  #[error("IO error: {0}")]
  IoError(String),

  #[error("Serialization error: {0}")]
  SerializationError(String),

  #[error("Invalid data: {0}")]
  InvalidData(String),

  #[error("Lock error: {0}")]
  LockError(String),

  #[error("Configuration error: {0}")]
  ConfigurationError(String),
}

// Implement conversions manually
impl From<std::io::Error> for IngestError {
  fn from(err: std::io::Error) -> Self {
    IngestError::IoError(err.to_string())
  }
}

impl From<serde_json::Error> for IngestError {
  fn from(err: serde_json::Error) -> Self {
    IngestError::SerializationError(err.to_string())
  }
}

impl From<nf_core::Error> for IngestError {
  fn from(err: nf_core::Error) -> Self {
    IngestError::ApiError(err.to_string())
  }
}

impl From<diesel::result::Error> for IngestError {
  fn from(err: diesel::result::Error) -> Self {
    IngestError::DatabaseError(err.to_string())
  }
}

impl From<diesel::ConnectionError> for IngestError {
  fn from(err: diesel::ConnectionError) -> Self {
    IngestError::DatabaseError(err.to_string())
  }
}

pub type IngestResult<T> = Result<T, IngestError>;
