use headless_chrome::{Browser, LaunchOptionsBuilder, Tab};
use std::{
    path::PathBuf,
    sync::Arc,
    thread::sleep,
    time::{Duration, Instant},
};
use url::Url;

use super::{PageRenderer, RenderError};
use crate::config::ScrapeConfig;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Resource entry count once the document has loaded, -1 before.
const RESOURCE_COUNT_JS: &str = "document.readyState === 'complete' \
     ? performance.getEntriesByType('resource').length : -1";

const OUTER_HTML_JS: &str = "document.documentElement.outerHTML";

/// Closes the tab when dropped. Declared before the browser in
/// [`RenderSession`] so the tab goes first and the process after it.
struct TabGuard(Arc<Tab>);

impl Drop for TabGuard {
    fn drop(&mut self) {
        if let Err(err) = self.0.close(true) {
            log::debug!("failed to close tab: {err}");
        }
    }
}

struct RenderSession {
    tab: TabGuard,
    // dropping the browser kills the chrome process
    _browser: Browser,
}

impl RenderSession {
    fn open(config: &ScrapeConfig) -> Result<Self, RenderError> {
        let proxy = config.proxy.as_deref().filter(|p| !p.is_empty());

        let options = LaunchOptionsBuilder::default()
            .headless(true)
            .sandbox(false)
            .proxy_server(proxy)
            .path(config.chrome_path.as_ref().map(PathBuf::from))
            .idle_browser_timeout(Duration::from_secs(config.render_timeout_secs * 2))
            .build()
            .map_err(|err| RenderError::Launch(err.to_string()))?;

        let browser = Browser::new(options).map_err(|err| RenderError::Launch(err.to_string()))?;

        let tab = browser
            .new_tab()
            .map_err(|err| RenderError::Launch(err.to_string()))?;

        tab.set_default_timeout(Duration::from_secs(config.render_timeout_secs));

        if let Err(err) = tab.set_user_agent(&config.user_agent, Some("en-US,en"), None) {
            log::debug!("failed to set user agent: {err}");
        }

        Ok(Self {
            tab: TabGuard(tab),
            _browser: browser,
        })
    }

    fn tab(&self) -> &Tab {
        &self.tab.0
    }
}

fn resource_count(tab: &Tab) -> Option<i64> {
    tab.evaluate(RESOURCE_COUNT_JS, false)
        .ok()
        .and_then(|obj| obj.value)
        .and_then(|v| v.as_i64())
}

/// Wait until the resource count has not changed for `idle`, or `deadline`.
fn wait_for_network_idle(tab: &Tab, idle: Duration, deadline: Instant) -> bool {
    let mut last = resource_count(tab);
    let mut stable_since = Instant::now();

    while Instant::now() < deadline {
        sleep(POLL_INTERVAL);

        let count = resource_count(tab);
        if count != last || count.map_or(true, |c| c < 0) {
            last = count;
            stable_since = Instant::now();
            continue;
        }

        if stable_since.elapsed() >= idle {
            return true;
        }
    }

    false
}

pub struct ChromeRenderer {
    config: ScrapeConfig,
}

impl ChromeRenderer {
    pub fn new(config: ScrapeConfig) -> Self {
        Self { config }
    }
}

impl PageRenderer for ChromeRenderer {
    fn render(&self, url: &Url) -> Result<String, RenderError> {
        let host = url.host_str().unwrap_or_default();
        let session = RenderSession::open(&self.config)?;
        let tab = session.tab();

        log::debug!("{host}: navigating");

        tab.navigate_to(url.as_str())
            .and_then(|tab| tab.wait_until_navigated())
            .map_err(|err| RenderError::Navigation(err.to_string()))?;

        let deadline = Instant::now() + Duration::from_secs(self.config.render_timeout_secs);
        let idle = Duration::from_millis(self.config.network_idle_ms);
        if !wait_for_network_idle(tab, idle, deadline) {
            log::debug!("{host}: network never went idle, capturing anyway");
        }

        let html = tab
            .evaluate(OUTER_HTML_JS, false)
            .map_err(|err| RenderError::Capture(err.to_string()))?
            .value
            .and_then(|v| v.as_str().map(str::to_owned))
            .ok_or_else(|| RenderError::Capture("document has no outer html".into()))?;

        Ok(html)
    }
}
