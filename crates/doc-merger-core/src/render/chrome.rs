use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::page::PrintToPdfParams;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::{Paper, RenderConfig};
use crate::error::ConvertError;
use super::traits::{HtmlRenderer, RenderSession};

/// Interval between `document.readyState` checks
const LOAD_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Headless Chromium driven over the DevTools protocol.
/// Works with: Chrome, Chromium, Edge (any Chromium build with headless mode).
pub struct ChromeRenderer {
    config: RenderConfig,
}

impl ChromeRenderer {
    pub const fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    fn browser_config(&self) -> Result<BrowserConfig, ConvertError> {
        let mut builder = BrowserConfig::builder().request_timeout(self.config.timeout());

        if let Some(ref executable) = self.config.chrome_executable {
            builder = builder.chrome_executable(executable);
        }
        if !self.config.sandbox {
            builder = builder.no_sandbox();
        }

        builder
            .build()
            .map_err(|e| ConvertError::rendering(format!("invalid browser configuration: {e}")))
    }
}

#[async_trait]
impl HtmlRenderer for ChromeRenderer {
    fn name(&self) -> &'static str {
        "chromium"
    }

    async fn start(&self) -> Result<Box<dyn RenderSession>, ConvertError> {
        let config = self.browser_config()?;

        let (browser, mut handler) = tokio::time::timeout(self.config.timeout(), Browser::launch(config))
            .await
            .map_err(|_| ConvertError::rendering("timed out launching browser"))?
            .map_err(|e| ConvertError::rendering(format!("failed to launch browser: {e}")))?;

        // The handler must be polled for the browser connection to make progress
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("Browser handler event error: {}", e);
                }
            }
        });

        debug!("Browser launched");

        Ok(Box::new(ChromeSession {
            browser,
            handler_task: Some(handler_task),
            timeout: self.config.timeout(),
            paper: self.config.paper,
        }))
    }
}

/// One running browser process.
pub struct ChromeSession {
    browser: Browser,
    handler_task: Option<JoinHandle<()>>,
    timeout: Duration,
    paper: Paper,
}

impl ChromeSession {
    fn print_params(&self) -> PrintToPdfParams {
        let (width, height) = self.paper.inches();
        PrintToPdfParams {
            print_background: Some(true),
            paper_width: Some(width),
            paper_height: Some(height),
            ..Default::default()
        }
    }
}

#[async_trait]
impl RenderSession for ChromeSession {
    async fn render(&mut self, html: &str) -> Result<Vec<u8>, ConvertError> {
        if self.handler_task.is_none() {
            return Err(ConvertError::rendering("render session already stopped"));
        }

        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| ConvertError::rendering(format!("failed to open page: {e}")))?;

        let params = self.print_params();
        let result = tokio::time::timeout(self.timeout, render_page(&page, html, params))
            .await
            .unwrap_or_else(|_| {
                Err(ConvertError::rendering(format!(
                    "timed out after {}s",
                    self.timeout.as_secs()
                )))
            });

        if let Err(e) = page.close().await {
            warn!("Failed to close render page: {}", e);
        }

        result
    }

    async fn stop(&mut self) -> Result<(), ConvertError> {
        let Some(handler_task) = self.handler_task.take() else {
            return Ok(());
        };

        let closed = self
            .browser
            .close()
            .await
            .map(|_| ())
            .map_err(|e| ConvertError::rendering(format!("failed to close browser: {e}")));

        if let Err(e) = self.browser.wait().await {
            warn!("Failed to reap browser process: {}", e);
        }
        handler_task.abort();

        debug!("Browser stopped");
        closed
    }
}

async fn render_page(
    page: &Page,
    html: &str,
    params: PrintToPdfParams,
) -> Result<Vec<u8>, ConvertError> {
    page.set_content(html)
        .await
        .map_err(|e| ConvertError::rendering(format!("failed to load HTML: {e}")))?;

    wait_for_load(page).await?;

    page.pdf(params)
        .await
        .map_err(|e| ConvertError::rendering(format!("print to PDF failed: {e}")))
}

/// Poll until the page reports a complete load, images included.
async fn wait_for_load(page: &Page) -> Result<(), ConvertError> {
    loop {
        let state: String = page
            .evaluate("document.readyState")
            .await
            .map_err(|e| ConvertError::rendering(format!("failed to query load state: {e}")))?
            .into_value()
            .map_err(|e| ConvertError::rendering(format!("unexpected load state: {e}")))?;

        if state == "complete" {
            return Ok(());
        }
        tokio::time::sleep(LOAD_POLL_INTERVAL).await;
    }
}
