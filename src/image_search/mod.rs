pub mod google;

pub use google::GoogleImageSearch;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ImageSearchError {
    #[error("image search credentials are not configured")]
    MissingCredential,

    #[error("image search query is empty")]
    EmptyQuery,

    #[error("image search request failed: {0}")]
    Request(String),

    #[error("image search provider responded with status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("failed to decode image search response: {0}")]
    Decode(String),
}

/// Text query in, image URLs out, most relevant first.
pub trait ImageSearch: Send + Sync {
    fn search(&self, query: &str) -> Result<Vec<String>, ImageSearchError>;
}
