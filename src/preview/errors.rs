use serde::Serialize;

use crate::image_search::ImageSearchError;
use crate::scrape::{FetchError, RenderError};

/// Request-level failures. Any of these aborts the request with `success: false`.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PreviewError {
    #[error("expected exactly one url value")]
    InvalidInput,

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("method not allowed")]
    MethodNotAllowed,

    #[error("no registrable domain for host {0}")]
    RootDomainNotFound(String),

    #[error("no second-level label in domain {0}")]
    SldNotFound(String),

    #[error("could not parse domain: {0}")]
    DomainParseError(String),
}

impl PreviewError {
    pub fn kind(&self) -> &'static str {
        match self {
            PreviewError::InvalidInput => "invalid_input",
            PreviewError::InvalidUrl(_) => "invalid_url",
            PreviewError::MethodNotAllowed => "method_not_allowed",
            PreviewError::RootDomainNotFound(_) => "root_domain_not_found",
            PreviewError::SldNotFound(_) => "sld_not_found",
            PreviewError::DomainParseError(_) => "domain_parse_error",
        }
    }
}

/// Pipeline stage a recovered error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Fetch,
    Render,
    RootDomainSearch,
    PageSearch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    FetchStatus,
    FetchNoResponse,
    FetchSetup,
    FetchEmptyBody,
    Render,
    ImageSearch,
}

/// A recovered error, reported in the `errors` list of a partial result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageError {
    pub stage: Stage,
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl StageError {
    pub fn fetch(err: &FetchError) -> Self {
        let (kind, status) = match err {
            FetchError::Status { status } => (ErrorKind::FetchStatus, Some(*status)),
            FetchError::NoResponse(_) => (ErrorKind::FetchNoResponse, None),
            FetchError::Setup(_) => (ErrorKind::FetchSetup, None),
            FetchError::EmptyBody => (ErrorKind::FetchEmptyBody, None),
        };

        Self {
            stage: Stage::Fetch,
            kind,
            message: err.to_string(),
            status,
        }
    }

    pub fn render(err: &RenderError) -> Self {
        Self {
            stage: Stage::Render,
            kind: ErrorKind::Render,
            message: err.to_string(),
            status: None,
        }
    }

    pub fn image_search(stage: Stage, err: &ImageSearchError) -> Self {
        let status = match err {
            ImageSearchError::Status { status, .. } => Some(*status),
            _ => None,
        };

        Self {
            stage,
            kind: ErrorKind::ImageSearch,
            message: err.to_string(),
            status,
        }
    }
}
