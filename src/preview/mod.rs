pub mod domain;
pub mod errors;
pub mod images;
pub mod request;

use serde::Serialize;
use std::{sync::Arc, thread};

use crate::config::Config;
use crate::image_search::{GoogleImageSearch, ImageSearch, ImageSearchError};
use crate::scrape::{self, MetaTags, ReqwestFetcher, ScrapeOutcome, Scraper};
use domain::RootDomain;
use errors::{PreviewError, Stage, StageError};
pub use request::{decode_target_url, TargetUrl};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta_tags: Option<MetaTags>,
    /// Query whose results make up the base of `image_results`.
    pub image_search: String,
    pub image_results: Vec<String>,
}

/// A processed request: the result plus every error recovered along the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preview {
    pub result: PreviewResult,
    pub errors: Vec<StageError>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub kind: &'static str,
    pub message: String,
}

/// JSON body returned for every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Envelope {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<PreviewResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<StageError>>,
}

impl From<Preview> for Envelope {
    fn from(preview: Preview) -> Self {
        Self {
            success: true,
            result: Some(preview.result),
            error: None,
            errors: (!preview.errors.is_empty()).then_some(preview.errors),
        }
    }
}

impl From<&PreviewError> for Envelope {
    fn from(err: &PreviewError) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(ErrorBody {
                kind: err.kind(),
                message: err.to_string(),
            }),
            errors: None,
        }
    }
}

/// Builds a link preview: scraped meta tags plus related images.
pub struct Previewer {
    scraper: Scraper,
    images: Arc<dyn ImageSearch>,
}

impl Previewer {
    pub fn new(scraper: Scraper, images: Arc<dyn ImageSearch>) -> Self {
        Self { scraper, images }
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let fetcher = ReqwestFetcher::new(&config.scrape)?;
        let renderer = scrape::renderer_from_config(&config.scrape);
        let images = GoogleImageSearch::new(config.image_search.clone())?;

        if config.image_search.api_key.is_none() || config.image_search.engine_id.is_none() {
            log::warn!("image search credentials are missing; every image search will fail");
        }

        Ok(Self::new(
            Scraper::new(Arc::new(fetcher), renderer),
            Arc::new(images),
        ))
    }

    /// Decode the raw request value and build its preview.
    pub fn preview_encoded(&self, raw: &str) -> Result<Preview, PreviewError> {
        let target = decode_target_url(raw)?;
        log::debug!("decoded target url: {}", target.as_str());
        self.preview(&target)
    }

    pub fn preview(&self, target: &TargetUrl) -> Result<Preview, PreviewError> {
        let root = RootDomain::from_target(target)?;
        log::debug!(
            "{}: root domain {} label {}",
            target.host(),
            root.domain,
            root.label
        );

        // the root-domain search does not depend on the page, so it runs
        // while the page is being scraped
        let (root_search, scraped) = thread::scope(|s| {
            let root_search = s.spawn(|| self.search(Stage::RootDomainSearch, &root.label));
            let scraped = self.scraper.scrape(target.as_url());
            let root_search = root_search.join().unwrap_or_else(|_| {
                Err(ImageSearchError::Request("image search worker panicked".into()))
            });
            (root_search, scraped)
        });

        let mut errors = Vec::new();

        let root_images = match root_search {
            Ok(images) => images,
            Err(err) => {
                errors.push(StageError::image_search(Stage::RootDomainSearch, &err));
                Vec::new()
            }
        };

        let meta_tags = match scraped {
            ScrapeOutcome::Scraped(meta) => Some(meta),
            ScrapeOutcome::Failed(scrape_errors) => {
                errors.extend(scrape_errors);
                None
            }
        };

        let page_query = meta_tags
            .as_ref()
            .filter(|meta| images::has_title(&meta.title))
            .map(|meta| images::page_search_query(&meta.title, &root.label));

        let (image_search, image_results) = match page_query {
            Some(query) => match self.search(Stage::PageSearch, &query) {
                Ok(page_images) => (query, images::merge_images(page_images, &root_images)),
                Err(err) => {
                    errors.push(StageError::image_search(Stage::PageSearch, &err));
                    (root.label.clone(), root_images)
                }
            },
            None => {
                log::info!("stage=page_search outcome=skip url={target} reason=no title");
                (root.label.clone(), root_images)
            }
        };

        Ok(Preview {
            result: PreviewResult {
                meta_tags,
                image_search,
                image_results,
            },
            errors,
        })
    }

    fn search(&self, stage: Stage, query: &str) -> Result<Vec<String>, ImageSearchError> {
        let stage_name = match stage {
            Stage::RootDomainSearch => "root_domain_search",
            _ => "page_search",
        };

        match self.images.search(query) {
            Ok(images) => {
                log::info!(
                    "stage={stage_name} outcome=success query={query:?} results={}",
                    images.len()
                );
                Ok(images)
            }
            Err(err) => {
                log::warn!("stage={stage_name} outcome=error query={query:?} err={err}");
                Err(err)
            }
        }
    }
}
