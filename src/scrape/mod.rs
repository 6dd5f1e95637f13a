#[cfg(feature = "headless")]
pub mod headless;
pub mod meta;

use std::{error::Error, sync::Arc, time::Duration};

use url::Url;

use crate::config::ScrapeConfig;
use crate::preview::errors::StageError;
pub use meta::{get_meta_tags, MetaTags};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The server answered with a non-success status.
    #[error("server responded with status {status}")]
    Status { status: u16 },

    /// The request went out but no usable response came back.
    #[error("no response: {0}")]
    NoResponse(String),

    /// The request could not be built.
    #[error("request setup failed: {0}")]
    Setup(String),

    #[error("response body is empty")]
    EmptyBody,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("headless rendering is disabled")]
    Disabled,

    #[cfg_attr(feature = "headless", allow(dead_code))]
    #[error("built without headless browser support")]
    Unavailable,

    #[error("failed to launch browser: {0}")]
    Launch(String),

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("failed to capture document: {0}")]
    Capture(String),
}

/// Plain HTTP GET of a page.
pub trait PageFetcher: Send + Sync {
    fn fetch(&self, url: &Url) -> Result<String, FetchError>;
}

/// Script-capable rendering of a page, returning the final document HTML.
pub trait PageRenderer: Send + Sync {
    fn render(&self, url: &Url) -> Result<String, RenderError>;
}

fn get_error(error: &reqwest::Error) -> String {
    match error.source() {
        Some(e) => match e.source() {
            Some(e) => e.to_string(),
            None => e.to_string(),
        },
        None => error.to_string(),
    }
}

fn classify(error: &reqwest::Error) -> FetchError {
    if let Some(status) = error.status() {
        FetchError::Status {
            status: status.as_u16(),
        }
    } else if error.is_builder() {
        FetchError::Setup(get_error(error))
    } else {
        FetchError::NoResponse(get_error(error))
    }
}

pub struct ReqwestFetcher {
    client: reqwest::blocking::Client,
}

impl ReqwestFetcher {
    pub fn new(config: &ScrapeConfig) -> Result<Self, FetchError> {
        let mut builder = reqwest::blocking::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_idle_timeout(Duration::from_secs(10));

        if let Some(proxy) = config.proxy.as_deref().filter(|p| !p.is_empty()) {
            log::debug!("using proxy {proxy}");
            let proxy = reqwest::Proxy::all(proxy).map_err(|err| classify(&err))?;
            builder = builder.proxy(proxy);
        }

        let client = builder.build().map_err(|err| classify(&err))?;

        Ok(Self { client })
    }
}

impl PageFetcher for ReqwestFetcher {
    fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        let host = url.host_str().unwrap_or_default();
        let iden = format!("{host}{}", url.path());

        log::debug!("{iden}: requesting");

        let resp = self
            .client
            .get(url.as_str())
            .send()
            .and_then(|resp| resp.error_for_status())
            .map_err(|err| {
                log::debug!("{iden}: {err}");
                classify(&err)
            })?;

        let body = resp.text().map_err(|err| classify(&err))?;

        if body.trim().is_empty() {
            return Err(FetchError::EmptyBody);
        }

        Ok(body)
    }
}

/// Renderer used when headless rendering is turned off or not compiled in.
pub struct NoRenderer(pub RenderError);

impl PageRenderer for NoRenderer {
    fn render(&self, _url: &Url) -> Result<String, RenderError> {
        Err(self.0.clone())
    }
}

/// Pick the renderer the configuration asks for.
pub fn renderer_from_config(config: &ScrapeConfig) -> Arc<dyn PageRenderer> {
    if !config.headless {
        return Arc::new(NoRenderer(RenderError::Disabled));
    }

    #[cfg(feature = "headless")]
    return Arc::new(headless::ChromeRenderer::new(config.clone()));

    #[cfg(not(feature = "headless"))]
    return Arc::new(NoRenderer(RenderError::Unavailable));
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrapeOutcome {
    Scraped(MetaTags),
    Failed(Vec<StageError>),
}

/// Direct fetch first, headless render when that yields no document.
pub struct Scraper {
    fetcher: Arc<dyn PageFetcher>,
    renderer: Arc<dyn PageRenderer>,
}

impl Scraper {
    pub fn new(fetcher: Arc<dyn PageFetcher>, renderer: Arc<dyn PageRenderer>) -> Self {
        Self { fetcher, renderer }
    }

    pub fn scrape(&self, url: &Url) -> ScrapeOutcome {
        let mut errors = Vec::new();

        let html = match self.fetcher.fetch(url) {
            Ok(html) => {
                log::info!("stage=fetch outcome=success url={url}");
                Some(html)
            }
            Err(err) => {
                log::warn!("stage=fetch outcome=error url={url} err={err}");
                errors.push(StageError::fetch(&err));
                None
            }
        };

        let html = html.or_else(|| match self.renderer.render(url) {
            Ok(html) if !html.trim().is_empty() => {
                log::info!("stage=render outcome=success url={url}");
                Some(html)
            }
            Ok(_) => {
                let err = RenderError::Capture("rendered document is empty".into());
                log::warn!("stage=render outcome=error url={url} err={err}");
                errors.push(StageError::render(&err));
                None
            }
            Err(err) => {
                log::warn!("stage=render outcome=error url={url} err={err}");
                errors.push(StageError::render(&err));
                None
            }
        });

        match html {
            Some(html) => ScrapeOutcome::Scraped(get_meta_tags(&html, url)),
            None => ScrapeOutcome::Failed(errors),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preview::errors::{ErrorKind, Stage};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StaticFetcher(Result<String, FetchError>);

    impl PageFetcher for StaticFetcher {
        fn fetch(&self, _url: &Url) -> Result<String, FetchError> {
            self.0.clone()
        }
    }

    #[derive(Default)]
    struct CountingRenderer {
        html: Option<String>,
        calls: AtomicUsize,
    }

    impl PageRenderer for CountingRenderer {
        fn render(&self, _url: &Url) -> Result<String, RenderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.html
                .clone()
                .ok_or_else(|| RenderError::Navigation("net::ERR_NAME_NOT_RESOLVED".into()))
        }
    }

    fn url() -> Url {
        Url::parse("https://example.com/article").unwrap()
    }

    #[test]
    fn test_direct_fetch_skips_render() {
        let renderer = Arc::new(CountingRenderer::default());
        let scraper = Scraper::new(
            Arc::new(StaticFetcher(Ok("<title>Direct</title>".into()))),
            renderer.clone(),
        );

        match scraper.scrape(&url()) {
            ScrapeOutcome::Scraped(m) => assert_eq!(m.title, "Direct"),
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_fetch_failure_falls_back_to_render() {
        let renderer = Arc::new(CountingRenderer {
            html: Some("<title>Rendered</title>".into()),
            ..Default::default()
        });
        let scraper = Scraper::new(
            Arc::new(StaticFetcher(Err(FetchError::Status { status: 403 }))),
            renderer.clone(),
        );

        match scraper.scrape(&url()) {
            ScrapeOutcome::Scraped(m) => assert_eq!(m.title, "Rendered"),
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_both_paths_failing_reports_errors() {
        let scraper = Scraper::new(
            Arc::new(StaticFetcher(Err(FetchError::NoResponse("timed out".into())))),
            Arc::new(CountingRenderer::default()),
        );

        match scraper.scrape(&url()) {
            ScrapeOutcome::Failed(errors) => {
                assert_eq!(errors.len(), 2);
                assert_eq!(errors[0].stage, Stage::Fetch);
                assert_eq!(errors[0].kind, ErrorKind::FetchNoResponse);
                assert_eq!(errors[1].stage, Stage::Render);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn test_empty_render_counts_as_failure() {
        let scraper = Scraper::new(
            Arc::new(StaticFetcher(Err(FetchError::EmptyBody))),
            Arc::new(CountingRenderer {
                html: Some("   ".into()),
                ..Default::default()
            }),
        );

        assert!(matches!(scraper.scrape(&url()), ScrapeOutcome::Failed(e) if e.len() == 2));
    }

    #[test]
    fn test_disabled_renderer() {
        let config = ScrapeConfig {
            headless: false,
            ..Default::default()
        };
        let renderer = renderer_from_config(&config);
        assert_eq!(renderer.render(&url()), Err(RenderError::Disabled));
    }
}
