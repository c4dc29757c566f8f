/// Web server - pages, static assets and the contact API over HTTP/1.1
use crate::config::Config;
use crate::contact_store::ContactStore;
use crate::error::{Result, SiteError};
use crate::submission::{self, SubmissionOutcome};
use crate::{assets, pages};
use bytes::Bytes;
use http::header::{self, HeaderMap, HeaderValue};
use http_body_util::{BodyExt, Full};
use hyper::body::Body;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{debug, error, info, warn};

const CONTACT_API: &str = "/api/contact";
const STATIC_PREFIX: &str = "/static/";

const PAGE_METHODS: &str = "GET, HEAD, OPTIONS";
const API_METHODS: &str = "POST, OPTIONS";

/// Everything a request handler needs
pub struct SiteState {
    pub config: Config,
    pub contacts: ContactStore,
}

impl SiteState {
    pub fn new(config: Config, contacts: ContactStore) -> Self {
        Self { config, contacts }
    }

    /// Load the contact store named by `config`
    pub fn open(config: Config) -> Result<Self> {
        let contacts = ContactStore::open(config.contacts_path())?;
        Ok(Self::new(config, contacts))
    }
}

/// Bind the configured address and serve until Ctrl+C / SIGTERM
pub async fn start_server(state: Arc<SiteState>) -> Result<()> {
    let listener = TcpListener::bind(state.config.listen_addr)
        .await
        .map_err(SiteError::Io)?;
    serve(listener, state, shutdown_signal()).await
}

/// Accept connections on `listener` until `shutdown` resolves
pub async fn serve<F>(listener: TcpListener, state: Arc<SiteState>, shutdown: F) -> Result<()>
where
    F: Future<Output = ()>,
{
    let addr = listener.local_addr().map_err(SiteError::Io)?;
    info!("Site listening on http://{}", addr);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer)) => {
                        let io = TokioIo::new(stream);
                        let state = state.clone();

                        tokio::spawn(async move {
                            let service = service_fn(move |req| handle_request(req, state.clone()));

                            if let Err(err) = http1::Builder::new()
                                .serve_connection(io, service)
                                .await
                            {
                                error!("Error serving connection from {}: {:?}", peer, err);
                            }
                        });
                    }
                    Err(e) => {
                        error!("Failed to accept connection: {}", e);
                    }
                }
            }
            _ = &mut shutdown => {
                info!("Shutdown signal received, no longer accepting connections");
                break;
            }
        }
    }

    Ok(())
}

/// Wait for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Ctrl+C received"),
            Err(e) => {
                warn!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                info!("SIGTERM received");
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Route one request. Never fails: errors become HTTP status codes.
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<SiteState>,
) -> std::result::Result<Response<Full<Bytes>>, Infallible>
where
    B: Body,
    B::Error: std::fmt::Display,
{
    debug!("{} {}", req.method(), req.uri().path());

    let mut response = if *req.method() == Method::OPTIONS {
        preflight(req.headers())
    } else {
        route(req, &state).await
    };

    apply_common_headers(response.headers_mut());
    Ok(response)
}

async fn route<B>(req: Request<B>, state: &SiteState) -> Response<Full<Bytes>>
where
    B: Body,
    B::Error: std::fmt::Display,
{
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let readable = method == Method::GET || method == Method::HEAD;

    if path == CONTACT_API {
        if method != Method::POST {
            return method_not_allowed(API_METHODS);
        }
        let outcome = match req.into_body().collect().await {
            Ok(collected) => submission::submit(&state.contacts, &collected.to_bytes()).await,
            Err(e) => SubmissionOutcome::Failed(SiteError::InvalidBody(format!(
                "failed to read request body: {}",
                e
            ))),
        };
        return api_response(&outcome, state.config.expose_errors);
    }

    if let Some(asset_path) = path.strip_prefix(STATIC_PREFIX) {
        if !readable {
            return method_not_allowed(PAGE_METHODS);
        }
        return match assets::load(&state.config.static_dir, asset_path).await {
            Ok(Some((bytes, content_type))) => respond(StatusCode::OK, content_type, bytes),
            Ok(None) => not_found(),
            Err(e) => {
                error!("Error reading asset {}: {}", asset_path, e);
                internal_error()
            }
        };
    }

    if let Some(template) = pages::template_for(&path) {
        if !readable {
            return method_not_allowed(PAGE_METHODS);
        }
        return match pages::render(&state.config.templates_dir, template).await {
            Ok(html) => respond(StatusCode::OK, "text/html; charset=utf-8", html),
            Err(e) => {
                error!("Error rendering {}: {}", path, e);
                internal_error()
            }
        };
    }

    not_found()
}

fn api_response(outcome: &SubmissionOutcome, expose_errors: bool) -> Response<Full<Bytes>> {
    let status = if outcome.is_success() {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    match serde_json::to_vec(&outcome.to_api_response(expose_errors)) {
        Ok(json) => respond(status, "application/json", json),
        Err(e) => {
            error!("Failed to serialize API response: {}", e);
            internal_error()
        }
    }
}

fn respond(status: StatusCode, content_type: &'static str, body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

fn not_found() -> Response<Full<Bytes>> {
    respond(StatusCode::NOT_FOUND, "text/plain; charset=utf-8", "Not Found")
}

fn internal_error() -> Response<Full<Bytes>> {
    respond(
        StatusCode::INTERNAL_SERVER_ERROR,
        "text/plain; charset=utf-8",
        "Internal Server Error",
    )
}

fn method_not_allowed(allow: &'static str) -> Response<Full<Bytes>> {
    let mut response = respond(
        StatusCode::METHOD_NOT_ALLOWED,
        "text/plain; charset=utf-8",
        "Method Not Allowed",
    );
    response
        .headers_mut()
        .insert(header::ALLOW, HeaderValue::from_static(allow));
    response
}

/// CORS preflight: any origin, echo the requested headers
fn preflight(request_headers: &HeaderMap) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::new()));
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, HEAD, POST, OPTIONS"),
    );
    let allow_headers = request_headers
        .get(header::ACCESS_CONTROL_REQUEST_HEADERS)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static("Content-Type"));
    headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, allow_headers);
    response
}

/// No caching anywhere, cross-origin allowed from everywhere
fn apply_common_headers(headers: &mut HeaderMap) {
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-cache, no-store, must-revalidate"),
    );
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(header::EXPIRES, HeaderValue::from_static("0"));
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
}
