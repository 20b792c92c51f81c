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

use crate::transport::Transport;
use nf_core::{Config, Result};
use nf_models::ArticlePage;
use std::sync::Arc;
use tracing::instrument;

/// Typed newsfilter API client.
///
/// Wraps the transport with the article-feed endpoint. The client is
/// deliberately thin: pagination semantics and HTTP success/failure
/// are its whole surface; budget enforcement lives with the caller.
///
/// # Examples
///
/// ```ignore
/// use nf_client::NewsfilterClient;
/// use nf_core::Config;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = Config::from_env()?;
///     let client = NewsfilterClient::new(&config)?;
///
///     let page = client.fetch_page(None, 50).await?;
///     println!("fetched {} articles", page.articles.len());
///
///     Ok(())
/// }
/// ```
pub struct NewsfilterClient {
  transport: Arc<Transport>,
}

impl NewsfilterClient {
  /// Create a new newsfilter API client
  ///
  /// # Errors
  ///
  /// Returns an error if the HTTP client cannot be created.
  pub fn new(config: &Config) -> Result<Self> {
    Ok(Self { transport: Arc::new(Transport::new(config)?) })
  }

  /// Fetch one page of the article feed.
  ///
  /// # Arguments
  ///
  /// * `cursor` - Pagination cursor from the previous page, or `None`
  ///   for the first page
  /// * `limit` - Maximum number of articles per page
  #[instrument(skip(self), fields(cursor = cursor.unwrap_or("<first>"), limit))]
  pub async fn fetch_page(&self, cursor: Option<&str>, limit: u32) -> Result<ArticlePage> {
    let mut params = vec![("limit", limit.to_string())];
    if let Some(cursor) = cursor {
      params.push(("cursor", cursor.to_string()));
    }

    self.transport.get("/articles", &params).await
  }
}

impl std::fmt::Debug for NewsfilterClient {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("NewsfilterClient")
      .field("base_url", &self.transport.base_url())
      .finish()
  }
}
