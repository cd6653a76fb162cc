//! Browser capture service.
//!
//! Owns one headless Chrome process and a bounded pool of page sessions.
//! A capture request checks a page out of the pool for the duration of
//! navigation-through-rasterization and returns it on every exit path, so
//! concurrent captures for different channels never share page state.
//! Captures for the same link are mutually exclusive: a second request for
//! an in-flight link is rejected rather than queued.

use std::collections::HashSet;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::element::Element;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::page::Page;
use futures_util::StreamExt;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::{BrowserSettings, VIEWPORT_HEIGHT, VIEWPORT_WIDTH};

/// Desktop user agent applied to every pooled page.
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/95.0.4638.69 Safari/537.36";

/// Grace period after navigation for late network activity to settle.
const SETTLE_DELAY_MS: u64 = 500;

/// Interval between selector visibility polls.
const SELECTOR_POLL_INTERVAL_MS: u64 = 250;

/// Browser automation failures, distinguished so operators can tell "page
/// never loaded" from "selector never appeared" from "the channel's bypass
/// script is broken".
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("selector '{selector}' not found within {timeout_secs}s")]
    SelectorNotFound { selector: String, timeout_secs: u64 },

    #[error("bypass script failed: {0}")]
    BypassScript(String),

    #[error("a capture for {0} is already in flight")]
    LinkBusy(String),

    #[error("browser session error: {0}")]
    Session(String),
}

/// One capture request: which link to shoot and how.
#[derive(Debug, Clone)]
pub struct CaptureRequest {
    pub channel: String,
    pub url: String,
    pub selector: String,
    /// Operator-authored script evaluated in the page before capture.
    /// Trusted code; failures are isolated, not sanitized away.
    pub bypass_script: Option<String>,
}

impl CaptureRequest {
    fn link_key(&self) -> String {
        format!("{}/{}", self.channel, self.url)
    }
}

/// Tracks links with a capture currently in flight.
///
/// Claiming an already-claimed key fails; the claim is released when the
/// returned guard drops.
#[derive(Default)]
struct InFlightSet {
    keys: Arc<StdMutex<HashSet<String>>>,
}

impl InFlightSet {
    fn claim(&self, key: &str) -> Option<InFlightClaim> {
        let mut keys = self.keys.lock().expect("in-flight set mutex poisoned");
        if keys.insert(key.to_string()) {
            Some(InFlightClaim {
                key: key.to_string(),
                keys: Arc::clone(&self.keys),
            })
        } else {
            None
        }
    }
}

struct InFlightClaim {
    key: String,
    keys: Arc<StdMutex<HashSet<String>>>,
}

impl Drop for InFlightClaim {
    fn drop(&mut self) {
        self.keys
            .lock()
            .expect("in-flight set mutex poisoned")
            .remove(&self.key);
    }
}

/// Headless-browser capture service with a bounded page pool.
pub struct CaptureService {
    browser: tokio::sync::Mutex<Browser>,
    handler_task: JoinHandle<()>,
    permits: Arc<Semaphore>,
    idle_pages: StdMutex<Vec<Page>>,
    in_flight: InFlightSet,
    navigation_timeout: Duration,
    selector_timeout: Duration,
}

impl CaptureService {
    /// Launch the browser process and build the page pool.
    pub async fn launch(settings: &BrowserSettings) -> Result<Self, CaptureError> {
        let viewport = Viewport {
            width: VIEWPORT_WIDTH,
            height: VIEWPORT_HEIGHT,
            ..Viewport::default()
        };

        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .window_size(VIEWPORT_WIDTH, VIEWPORT_HEIGHT)
            .viewport(viewport);

        if let Some(ref executable) = settings.executable {
            builder = builder.chrome_executable(executable);
        }

        let config = builder.build().map_err(CaptureError::Session)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| CaptureError::Session(format!("failed to launch browser: {}", e)))?;

        // Drive CDP events for the lifetime of the browser process.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        info!(
            pool_size = settings.pool_size,
            viewport = %format!("{}x{}", VIEWPORT_WIDTH, VIEWPORT_HEIGHT),
            "capture service started"
        );

        Ok(CaptureService {
            browser: tokio::sync::Mutex::new(browser),
            handler_task,
            permits: Arc::new(Semaphore::new(settings.pool_size)),
            idle_pages: StdMutex::new(Vec::new()),
            in_flight: InFlightSet::default(),
            navigation_timeout: Duration::from_secs(settings.navigation_timeout_secs),
            selector_timeout: Duration::from_secs(settings.selector_timeout_secs),
        })
    }

    /// Capture the element identified by the request's selector as PNG bytes.
    ///
    /// Writes nothing; the caller owns persistence.
    pub async fn capture(&self, request: &CaptureRequest) -> Result<Vec<u8>, CaptureError> {
        let key = request.link_key();
        let _claim = self
            .in_flight
            .claim(&key)
            .ok_or_else(|| CaptureError::LinkBusy(key.clone()))?;

        let mut lease = self.acquire_page().await?;
        let result = self.capture_on_page(lease.page(), request).await;

        match result {
            // Navigation left the page in an unknown state; retire it. The
            // remaining failure kinds happen on a loaded page, which resets
            // like a successful capture does.
            Err(CaptureError::Navigation { .. }) | Err(CaptureError::Session(_)) => {
                lease.poison();
            }
            _ => {
                if lease.page().goto("about:blank").await.is_err() {
                    lease.poison();
                }
            }
        }

        result
    }

    async fn capture_on_page(
        &self,
        page: &Page,
        request: &CaptureRequest,
    ) -> Result<Vec<u8>, CaptureError> {
        let navigation = async {
            page.goto(request.url.as_str()).await?;
            page.wait_for_navigation().await?;
            Ok::<(), chromiumoxide::error::CdpError>(())
        };

        match tokio::time::timeout(self.navigation_timeout, navigation).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                return Err(CaptureError::Navigation {
                    url: request.url.clone(),
                    reason: e.to_string(),
                });
            }
            Err(_) => {
                return Err(CaptureError::Navigation {
                    url: request.url.clone(),
                    reason: format!(
                        "timed out after {}s",
                        self.navigation_timeout.as_secs()
                    ),
                });
            }
        }

        tokio::time::sleep(Duration::from_millis(SETTLE_DELAY_MS)).await;

        if let Some(ref script) = request.bypass_script {
            debug!(channel = %request.channel, "running bypass script");
            let wrapped = format!("(async () => {{ {} }})()", script);
            if let Err(e) = page.evaluate(wrapped).await {
                return Err(CaptureError::BypassScript(e.to_string()));
            }
        }

        let element = self.wait_for_selector(page, &request.selector).await?;

        // Raise the element above any overlay before rasterizing it.
        let elevate = format!(
            "document.querySelector({}).style.zIndex = '1000000'",
            js_string_literal(&request.selector)
        );
        if let Err(e) = page.evaluate(elevate).await {
            debug!(selector = %request.selector, "failed to elevate element: {}", e);
        }

        element
            .screenshot(CaptureScreenshotFormat::Png)
            .await
            .map_err(|e| CaptureError::Session(format!("screenshot failed: {}", e)))
    }

    /// Poll for the selector until it appears or the timeout elapses.
    async fn wait_for_selector(
        &self,
        page: &Page,
        selector: &str,
    ) -> Result<Element, CaptureError> {
        let deadline = tokio::time::Instant::now() + self.selector_timeout;

        loop {
            if let Ok(element) = page.find_element(selector).await {
                return Ok(element);
            }

            if tokio::time::Instant::now() >= deadline {
                return Err(CaptureError::SelectorNotFound {
                    selector: selector.to_string(),
                    timeout_secs: self.selector_timeout.as_secs(),
                });
            }

            tokio::time::sleep(Duration::from_millis(SELECTOR_POLL_INTERVAL_MS)).await;
        }
    }

    async fn acquire_page(&self) -> Result<PageLease<'_>, CaptureError> {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| CaptureError::Session("capture pool is shut down".to_string()))?;

        let existing = self
            .idle_pages
            .lock()
            .expect("page pool mutex poisoned")
            .pop();

        let page = match existing {
            Some(page) => page,
            None => self.new_page().await?,
        };

        Ok(PageLease {
            page: Some(page),
            service: self,
            _permit: permit,
            poisoned: false,
        })
    }

    async fn new_page(&self) -> Result<Page, CaptureError> {
        let browser = self.browser.lock().await;
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| CaptureError::Session(format!("failed to open page: {}", e)))?;
        page.set_user_agent(USER_AGENT)
            .await
            .map_err(|e| CaptureError::Session(format!("failed to set user agent: {}", e)))?;
        Ok(page)
    }

    /// Close all pooled pages and the browser process.
    pub async fn shutdown(&self) {
        self.permits.close();

        let pages: Vec<Page> = self
            .idle_pages
            .lock()
            .expect("page pool mutex poisoned")
            .drain(..)
            .collect();
        for page in pages {
            let _ = page.close().await;
        }

        let mut browser = self.browser.lock().await;
        if let Err(e) = browser.close().await {
            warn!("failed to close browser cleanly: {}", e);
        }
        let _ = browser.wait().await;
        self.handler_task.abort();

        info!("capture service stopped");
    }
}

/// A page checked out of the pool. Returned to the pool on drop unless
/// poisoned, in which case the tab is closed and a fresh one is created on
/// the next checkout.
struct PageLease<'a> {
    page: Option<Page>,
    service: &'a CaptureService,
    _permit: OwnedSemaphorePermit,
    poisoned: bool,
}

impl PageLease<'_> {
    fn page(&self) -> &Page {
        self.page.as_ref().expect("lease holds a page until drop")
    }

    fn poison(&mut self) {
        self.poisoned = true;
    }
}

impl Drop for PageLease<'_> {
    fn drop(&mut self) {
        if let Some(page) = self.page.take() {
            if self.poisoned {
                if let Ok(handle) = tokio::runtime::Handle::try_current() {
                    handle.spawn(async move {
                        let _ = page.close().await;
                    });
                }
            } else {
                self.service
                    .idle_pages
                    .lock()
                    .expect("page pool mutex poisoned")
                    .push(page);
            }
        }
    }
}

/// Quote a selector as a JavaScript string literal.
fn js_string_literal(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| format!("\"{}\"", s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_key_combines_channel_and_url() {
        let request = CaptureRequest {
            channel: "facebook".to_string(),
            url: "https://www.facebook.com/page/posts/1".to_string(),
            selector: "div[role=article]".to_string(),
            bypass_script: None,
        };
        assert_eq!(
            request.link_key(),
            "facebook/https://www.facebook.com/page/posts/1"
        );
    }

    #[test]
    fn test_in_flight_claims_are_exclusive_until_dropped() {
        let set = InFlightSet::default();

        let claim = set.claim("facebook/url").expect("first claim succeeds");
        assert!(set.claim("facebook/url").is_none());
        assert!(set.claim("twitter/url").is_some());

        drop(claim);
        assert!(set.claim("facebook/url").is_some());
    }

    #[test]
    fn test_js_string_literal_escapes_quotes() {
        assert_eq!(
            js_string_literal(r#"div[data-test="post"]"#),
            r#""div[data-test=\"post\"]""#
        );
    }
}
