
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use url::Url;

use crate::image_search::{ImageSearch, ImageSearchError};
use crate::preview::Previewer;
use crate::scrape::{FetchError, PageFetcher, PageRenderer, RenderError, Scraper};

pub struct FakeFetcher {
    response: Result<String, FetchError>,
    calls: AtomicUsize,
}

impl FakeFetcher {
    pub fn new(response: Result<String, FetchError>) -> Arc<Self> {
        Arc::new(Self {
            response,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PageFetcher for FakeFetcher {
    fn fetch(&self, _url: &Url) -> Result<String, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.response.clone()
    }
}

pub struct FakeRenderer {
    response: Result<String, RenderError>,
    calls: AtomicUsize,
}

impl FakeRenderer {
    pub fn new(response: Result<String, RenderError>) -> Arc<Self> {
        Arc::new(Self {
            response,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PageRenderer for FakeRenderer {
    fn render(&self, _url: &Url) -> Result<String, RenderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.response.clone()
    }
}

/// Answers known queries, fails unknown ones, remembers what it was asked.
#[derive(Default)]
pub struct FakeImageSearch {
    responses: HashMap<String, Result<Vec<String>, ImageSearchError>>,
    queries: Mutex<Vec<String>>,
}

impl FakeImageSearch {
    pub fn with(mut self, query: &str, response: Result<Vec<String>, ImageSearchError>) -> Self {
        self.responses.insert(query.to_string(), response);
        self
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

impl ImageSearch for FakeImageSearch {
    fn search(&self, query: &str) -> Result<Vec<String>, ImageSearchError> {
        self.queries.lock().unwrap().push(query.to_string());
        self.responses
            .get(query)
            .cloned()
            .unwrap_or_else(|| {
                Err(ImageSearchError::Status {
                    status: 500,
                    message: format!("no canned response for {query:?}"),
                })
            })
    }
}

pub fn urls(prefix: &str, n: usize) -> Vec<String> {
    (0..n)
        .map(|i| format!("https://img.example.net/{prefix}{i}.jpg"))
        .collect()
}

pub fn previewer(
    fetcher: &Arc<FakeFetcher>,
    renderer: &Arc<FakeRenderer>,
    images: &Arc<FakeImageSearch>,
) -> Previewer {
    Previewer::new(
        Scraper::new(fetcher.clone(), renderer.clone()),
        images.clone(),
    )
}
