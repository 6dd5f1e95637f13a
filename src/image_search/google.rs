use serde_json::Value;
use std::time::Duration;

use super::{ImageSearch, ImageSearchError};
use crate::config::ImageSearchConfig;

/// Google Custom Search JSON API, image mode.
pub struct GoogleImageSearch {
    client: reqwest::blocking::Client,
    config: ImageSearchConfig,
}

impl GoogleImageSearch {
    pub fn new(config: ImageSearchConfig) -> Result<Self, ImageSearchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| ImageSearchError::Request(err.to_string()))?;

        Ok(Self { client, config })
    }

    fn credentials(&self) -> Result<(&str, &str), ImageSearchError> {
        let api_key = self.config.api_key.as_deref().filter(|k| !k.is_empty());
        let engine_id = self.config.engine_id.as_deref().filter(|k| !k.is_empty());

        match (api_key, engine_id) {
            (Some(key), Some(cx)) => Ok((key, cx)),
            _ => Err(ImageSearchError::MissingCredential),
        }
    }
}

impl ImageSearch for GoogleImageSearch {
    fn search(&self, query: &str) -> Result<Vec<String>, ImageSearchError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ImageSearchError::EmptyQuery);
        }

        let (key, cx) = self.credentials()?;
        let num = self.config.num_results.clamp(1, 10).to_string();

        let resp = self
            .client
            .get(&self.config.endpoint)
            .query(&[
                ("key", key),
                ("cx", cx),
                ("q", query),
                ("searchType", "image"),
                ("num", num.as_str()),
            ])
            .send()
            .map_err(|err| ImageSearchError::Request(err.without_url().to_string()))?;

        let status = resp.status();
        let body = resp
            .json::<Value>()
            .map_err(|err| ImageSearchError::Decode(err.to_string()));

        if !status.is_success() {
            let message = body
                .ok()
                .as_ref()
                .and_then(provider_error_message)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string());

            log::warn!("image search error: status={status} message={message}");
            return Err(ImageSearchError::Status {
                status: status.as_u16(),
                message,
            });
        }

        Ok(extract_image_links(&body?))
    }
}

/// `items[].link`, in provider order.
pub fn extract_image_links(resp: &Value) -> Vec<String> {
    resp.get("items")
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.get("link").and_then(|v| v.as_str()))
                .filter(|link| !link.is_empty())
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default()
}

fn provider_error_message(resp: &Value) -> Option<String> {
    resp.get("error")
        .and_then(|e| e.get("message"))
        .and_then(|v| v.as_str())
        .map(str::to_owned)
}
