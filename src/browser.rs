//! Headless Chrome session via chromiumoxide

use crate::error::RenderError;
use crate::page::{HtmlDom, PageRenderer, RENDERED_HREF_ATTR, RENDERED_TEXT_ATTR};
use async_trait::async_trait;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// One browser and one tab, shared by every page of a run
pub struct ChromeSession {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    timeout_ms: u64,
}

impl ChromeSession {
    /// Launch headless Chrome with a 1920x1080 window
    pub async fn launch(timeout_ms: u64) -> Result<Self, RenderError> {
        let config = BrowserConfig::builder()
            .no_sandbox()
            .window_size(1920, 1080)
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-setuid-sandbox")
            .arg("--no-first-run")
            .arg("--headless=new")
            .build()
            .map_err(|e| RenderError::Launch(format!("Browser config error: {}", e)))?;

        let (browser, mut handler) = Browser::launch(config).await.map_err(|e| {
            RenderError::Launch(format!("{} (is Chrome/Chromium installed?)", e))
        })?;

        // Drive the CDP connection in the background
        let handler = tokio::spawn(async move { while handler.next().await.is_some() {} });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| RenderError::Launch(e.to_string()))?;
        page.execute(
            chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams::new(
                USER_AGENT,
            ),
        )
        .await
        .map_err(|e| RenderError::Launch(e.to_string()))?;

        debug!("Chrome session started");
        Ok(Self {
            browser,
            page,
            handler,
            timeout_ms,
        })
    }

    /// Navigate and wait for the load, bounded by the session timeout
    async fn goto(&self, url: &str) -> Result<(), RenderError> {
        let nav_result = tokio::time::timeout(
            Duration::from_millis(self.timeout_ms),
            self.page.goto(url),
        )
        .await;

        match nav_result {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(RenderError::Navigation {
                url: url.to_string(),
                message: format!("{}: {}", classify_error(&e.to_string()), e),
            }),
            Err(_) => Err(RenderError::Navigation {
                url: url.to_string(),
                message: "Navigation timeout".to_string(),
            }),
        }
    }

    /// Copy each anchor's rendered `innerText` and resolved `href` property into
    /// attributes, so the serialized page carries what the browser shows
    async fn stamp_anchors(&self, url: &str) {
        let script = format!(
            r#"(() => {{
                const anchors = document.querySelectorAll('a');
                anchors.forEach(a => {{
                    a.setAttribute('{text}', a.innerText || '');
                    if (a.hasAttribute('href')) {{
                        a.setAttribute('{href}', a.href);
                    }}
                }});
                return anchors.length;
            }})()"#,
            text = RENDERED_TEXT_ATTR,
            href = RENDERED_HREF_ATTR,
        );

        match self.page.evaluate(script).await {
            Ok(result) => debug!(url, anchors = ?result.value(), "Anchors stamped"),
            Err(e) => warn!(url, "Falling back to markup text: {}", e),
        }
    }

    /// Close the browser; always called once at the end of a run
    pub async fn close(mut self) -> Result<(), RenderError> {
        let result = self
            .browser
            .close()
            .await
            .map(|_| ())
            .map_err(|e| RenderError::Launch(format!("Failed to close browser: {}", e)));
        self.handler.abort();
        debug!("Chrome session closed");
        result
    }
}

#[async_trait(?Send)]
impl PageRenderer for ChromeSession {
    type Dom = HtmlDom;

    async fn render(&mut self, url: &str) -> Result<HtmlDom, RenderError> {
        self.goto(url).await?;
        self.stamp_anchors(url).await;

        let html = self.page.content().await.map_err(|e| RenderError::Content {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        let final_url = self.page.url().await.ok().flatten();

        Ok(HtmlDom::with_final_url(url, final_url.as_deref(), &html))
    }
}

fn classify_error(error: &str) -> &'static str {
    if error.contains("ERR_NAME_NOT_RESOLVED") {
        "DNS_FAILED"
    } else if error.contains("ERR_CONNECTION_REFUSED") {
        "CONNECTION_REFUSED"
    } else if error.contains("ERR_CONNECTION_TIMED_OUT") {
        "TIMEOUT"
    } else if error.contains("ERR_CERT") || error.contains("SSL") {
        "SSL_ERROR"
    } else {
        "NETWORK_ERROR"
    }
}
