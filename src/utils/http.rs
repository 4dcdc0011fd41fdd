// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use crate::error::Result;
use crate::models::HttpConfig;

/// Create a configured asynchronous HTTP client.
pub fn create_client(config: &HttpConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

/// Fetch a response body, failing on non-success status.
pub async fn fetch_text(request: reqwest::RequestBuilder) -> Result<String> {
    let response = request.send().await?.error_for_status()?;
    Ok(response.text().await?)
}
