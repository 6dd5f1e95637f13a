use crate::preview::{
    errors::PreviewError,
    request::single_value,
    Envelope, Previewer,
};
use axum::{
    extract::{Path, RawQuery, State},
    http::{Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use std::{net::SocketAddr, sync::Arc};
use tokio::signal;

#[derive(Clone)]
struct SharedState {
    previewer: Arc<Previewer>,
}

pub fn router(previewer: Arc<Previewer>) -> Router {
    let shared_state = SharedState { previewer };

    Router::new()
        .route(
            "/api/preview",
            get(preview_query)
                .head(method_not_allowed)
                .fallback(method_not_allowed),
        )
        .route(
            "/api/preview/*encoded",
            get(preview_path)
                .head(method_not_allowed)
                .fallback(method_not_allowed),
        )
        .fallback(not_found)
        .layer(
            tower_http::trace::TraceLayer::new_for_http()
                .make_span_with(
                    tower_http::trace::DefaultMakeSpan::new().level(tracing::Level::INFO),
                )
                .on_response(
                    tower_http::trace::DefaultOnResponse::new().level(tracing::Level::INFO),
                ),
        )
        .with_state(shared_state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            log::error!("failed to install Ctrl+C handler: {err}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => log::error!("failed to install signal handler: {err}"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    log::warn!("shutting down");
}

async fn start_app(previewer: Arc<Previewer>, addr: SocketAddr) -> anyhow::Result<()> {
    let app = router(previewer);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

pub fn start_daemon(previewer: Arc<Previewer>, addr: SocketAddr) -> anyhow::Result<()> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(start_app(previewer, addr))
}

#[derive(Debug)]
struct HttpError(PreviewError);

impl IntoResponse for HttpError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.0 {
            PreviewError::MethodNotAllowed => StatusCode::NOT_FOUND,
            PreviewError::InvalidInput | PreviewError::InvalidUrl(_) => StatusCode::BAD_REQUEST,
            PreviewError::RootDomainNotFound(_)
            | PreviewError::SldNotFound(_)
            | PreviewError::DomainParseError(_) => {
                log::warn!("{self:?}");
                StatusCode::BAD_REQUEST
            }
        };

        (status, Json(Envelope::from(&self.0))).into_response()
    }
}

impl<E> From<E> for HttpError
where
    E: Into<PreviewError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

/// All `url` values of the query string.
fn url_query_values(query: Option<&str>) -> Vec<String> {
    query
        .map(|query| {
            url::form_urlencoded::parse(query.as_bytes())
                .filter(|(key, _)| key == "url")
                // form decoding turns a literal '+' into a space; base64 never has spaces
                .map(|(_, value)| value.replace(' ', "+"))
                .collect()
        })
        .unwrap_or_default()
}

async fn preview_query(
    State(state): State<SharedState>,
    RawQuery(query): RawQuery,
) -> Result<Json<Envelope>, HttpError> {
    respond(state, url_query_values(query.as_deref()))
}

async fn preview_path(
    State(state): State<SharedState>,
    Path(encoded): Path<String>,
    RawQuery(query): RawQuery,
) -> Result<Json<Envelope>, HttpError> {
    let mut values = vec![encoded];
    values.extend(url_query_values(query.as_deref()));

    respond(state, values)
}

fn respond(state: SharedState, values: Vec<String>) -> Result<Json<Envelope>, HttpError> {
    let raw = single_value(values)?;

    log::debug!("raw url: {raw}");

    let previewer = state.previewer.clone();
    let preview = tokio::task::block_in_place(move || previewer.preview_encoded(&raw))?;

    Ok(Json(preview.into()))
}

async fn method_not_allowed() -> HttpError {
    HttpError(PreviewError::MethodNotAllowed)
}

// the wildcard route never matches an empty tail
async fn not_found(method: Method, uri: Uri) -> Response {
    if uri.path() != "/api/preview/" {
        return StatusCode::NOT_FOUND.into_response();
    }

    let err = if method == Method::GET {
        PreviewError::InvalidInput
    } else {
        PreviewError::MethodNotAllowed
    };

    HttpError(err).into_response()
}
