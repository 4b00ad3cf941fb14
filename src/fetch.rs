//! Plain-HTTP fetch for the static rewrite path.
//!
//! No browser, no JS — just the document as served, with headers shaped like
//! an ordinary navigation so the host does not hand back a bot page.

use std::time::Duration;

use tracing::info;

use crate::browser::manager::random_user_agent;
use crate::core::config::ToolConfig;
use crate::core::error::DirectError;

/// Headers an ordinary browser navigation sends.
pub fn stealth_headers() -> Vec<(&'static str, &'static str)> {
    vec![
        (
            "Accept",
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
        ),
        ("Accept-Language", "zh-CN,zh;q=0.9,en;q=0.8"),
        ("Upgrade-Insecure-Requests", "1"),
        ("Sec-Fetch-Dest", "document"),
        ("Sec-Fetch-Mode", "navigate"),
        ("Sec-Fetch-Site", "none"),
        ("Cache-Control", "max-age=0"),
    ]
}

/// Fetch a page's HTML with a realistic desktop User-Agent and navigation
/// headers.
pub async fn fetch_html(url: &str, config: &ToolConfig) -> Result<String, DirectError> {
    url::Url::parse(url)?;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.http_timeout_secs()))
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()?;

    let mut request = client.get(url).header("User-Agent", random_user_agent());
    for (name, value) in stealth_headers() {
        request = request.header(name, value);
    }

    let response = request.send().await?;
    let status = response.status();
    let html = response.text().await?;
    info!("✅ Fetched {} ({}, {} chars)", url, status, html.len());
    Ok(html)
}
