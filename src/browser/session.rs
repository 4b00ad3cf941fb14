//! Live bypass session: one browser, one page, the engine registered for
//! every new document.

use chromiumoxide::browser::Browser;
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::browser::{inject, manager};
use crate::core::config::ToolConfig;
use crate::core::error::DirectError;

/// Launch-time knobs for a session.
#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    pub headless: bool,
    pub width: u32,
    pub height: u32,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            headless: true,
            width: 1280,
            height: 900,
        }
    }
}

/// Process-wide context owning the browser, the page, and the CDP
/// event-handler task. Dropped implicitly at process exit, but callers should
/// prefer the explicit [`BypassSession::shutdown`] hook.
pub struct BypassSession {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
}

impl BypassSession {
    /// Launch a browser and register the in-page engine so it runs on every
    /// new document — the earliest injection point, ahead of host-page
    /// scripts.
    pub async fn launch(
        config: &ToolConfig,
        options: SessionOptions,
    ) -> Result<Self, DirectError> {
        let exe = config
            .chrome_executable()
            .or_else(manager::find_chrome_executable)
            .ok_or(DirectError::BrowserUnavailable)?;

        info!(
            "🚀 Launching browser: {} (headless: {})",
            exe, options.headless
        );
        let browser_config =
            manager::build_config(&exe, options.headless, options.width, options.height)?;
        let (browser, mut handler_stream) = Browser::launch(browser_config)
            .await
            .map_err(|e| DirectError::Launch(format!("{exe}: {e}")))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler_stream.next().await {
                if let Err(e) = event {
                    warn!("CDP handler error: {}", e);
                }
            }
        });

        let page = browser.new_page("about:blank").await.map_err(cdp_err)?;

        info!("💉 Registering bypass engine at document-start");
        page.execute(AddScriptToEvaluateOnNewDocumentParams::new(
            inject::page_script(),
        ))
        .await
        .map_err(cdp_err)?;

        Ok(Self {
            browser,
            page,
            handler,
        })
    }

    /// Navigate and wait for the network to settle.
    pub async fn open(&self, url: &str, quiet_ms: u64, timeout_ms: u64) -> Result<(), DirectError> {
        info!("🌐 Navigating: {}", url);
        self.page.goto(url).await.map_err(cdp_err)?;
        manager::wait_until_stable(&self.page, quiet_ms, timeout_ms).await;
        Ok(())
    }

    /// Count anchors still pointing at the interstitial. Zero once the
    /// engine's pass has run, unless the host page re-injected content in the
    /// same tick.
    pub async fn remaining_redirect_anchors(&self) -> Result<u64, DirectError> {
        let count = self
            .page
            .evaluate(inject::remaining_anchor_probe())
            .await
            .map_err(cdp_err)?
            .into_value::<serde_json::Value>()
            .ok()
            .and_then(|v| v.as_u64())
            .unwrap_or(0);
        Ok(count)
    }

    /// Snapshot the current document.
    pub async fn capture_html(&self) -> Result<String, DirectError> {
        self.page.content().await.map_err(cdp_err)
    }

    /// Explicit shutdown hook: closes the page and the browser, then stops
    /// the event-handler task.
    pub async fn shutdown(mut self) {
        drop(self.page);
        if let Err(e) = self.browser.close().await {
            warn!("Browser close error (non-fatal): {}", e);
        }
        self.handler.abort();
        info!("🛑 Bypass session shut down");
    }
}

fn cdp_err(e: chromiumoxide::error::CdpError) -> DirectError {
    DirectError::Cdp(e.to_string())
}
