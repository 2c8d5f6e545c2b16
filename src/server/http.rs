//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo for async handling.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::header::{self, HeaderValue};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{HeaderMap, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde::Serialize;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use super::health;
use super::routes::{self, Route, API_VERSION};
use crate::config::Args;
use crate::context::RequestContext;
use crate::delivery::{Delivery, EntryRequest, SectionRequest};
use crate::types::{DeliveryError, Result};

type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub delivery: Delivery,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(args: Args, delivery: Delivery) -> Self {
        Self {
            args,
            delivery,
            started_at: Instant::now(),
        }
    }
}

/// Run the HTTP server
pub async fn run(state: Arc<AppState>) -> Result<()> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!(
        "frame-delivery listening on {} as node {}",
        state.args.listen, state.args.node_id
    );

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> std::result::Result<Response<BoxBody>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let query = req.uri().query().map(str::to_string);

    info!("[{}] {} {}", addr, method, path);

    let Some(route) = Route::parse(&method, &path) else {
        return Ok(to_boxed(not_found_response(&path)));
    };

    let response = match route {
        Route::Health => health::health_check(&state),
        route => match dispatch(&state, route, req.headers(), query.as_deref()).await {
            Ok(response) => response,
            Err(e) => {
                match status_for(&e) {
                    status if status.is_server_error() => warn!("{} {} failed: {}", method, path, e),
                    _ => debug!("{} {} rejected: {}", method, path, e),
                }
                error_response(&e)
            }
        },
    };

    Ok(to_boxed(response))
}

/// A delivery call with its parsed parameters
enum Call {
    Entries(String, EntryRequest),
    Sections(String, SectionRequest),
    Items(String, u32),
}

async fn dispatch(
    state: &AppState,
    route: Route,
    headers: &HeaderMap,
    query: Option<&str>,
) -> Result<Response<Full<Bytes>>> {
    let scope = routes::scope_from_headers(headers)?;
    let call = match route {
        Route::Entries(code) => Call::Entries(code, routes::entry_request(query)?),
        Route::Sections(code) => Call::Sections(code, routes::section_request(query)?),
        Route::Items(code) => Call::Items(code, routes::depth_level(query)?),
        Route::Health => return Ok(health::health_check(state)),
    };

    let context = RequestContext::new(scope);
    let deadline = state.args.request_timeout();
    with_deadline(&context, deadline, serve(&state.delivery, &context, call)).await
}

/// Resolve the project languages and run the call, all under one deadline
async fn serve(
    delivery: &Delivery,
    context: &RequestContext,
    call: Call,
) -> Result<Response<Full<Bytes>>> {
    let languages = delivery.project_languages(context).await?;
    // Clones share the cancellation token
    let context = context.clone().with_languages(languages);

    match call {
        Call::Entries(code, request) => {
            let data = delivery.list_entries(&context, &code, &request).await?;
            Ok(json_response(StatusCode::OK, &serde_json::json!({ "data": data })))
        }
        Call::Sections(code, request) => {
            let tree = delivery.section_tree(&context, &code, &request).await?;
            Ok(json_response(StatusCode::OK, &tree))
        }
        Call::Items(code, depth) => {
            let tree = delivery.menu_tree(&context, &code, depth).await?;
            Ok(json_response(StatusCode::OK, &tree))
        }
    }
}

/// Fail the request with `Cancelled` once `deadline` passes, cancelling every in-flight call
async fn with_deadline<T, F>(context: &RequestContext, deadline: Duration, work: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(deadline, work).await {
        Ok(result) => result,
        Err(_) => {
            context.cancellation().cancel();
            Err(DeliveryError::Cancelled)
        }
    }
}

/// HTTP status for a delivery error
pub fn status_for(error: &DeliveryError) -> StatusCode {
    match error {
        DeliveryError::CollectionNotFound(_) => StatusCode::NOT_FOUND,
        DeliveryError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        DeliveryError::Upstream { .. }
        | DeliveryError::DocumentFetchFailed(_)
        | DeliveryError::Http(_)
        | DeliveryError::Json(_) => StatusCode::BAD_GATEWAY,
        DeliveryError::Cancelled => StatusCode::GATEWAY_TIMEOUT,
        DeliveryError::TranslationFetchFailed(_) | DeliveryError::Io(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// JSON response carrying the API version header
pub(super) fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    let body = serde_json::to_vec(body)
        .unwrap_or_else(|_| br#"{"error":"Serialization failed"}"#.to_vec());

    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;

    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert("x-api-version", HeaderValue::from_static(API_VERSION));

    response
}

fn error_response(error: &DeliveryError) -> Response<Full<Bytes>> {
    json_response(
        status_for(error),
        &serde_json::json!({ "error": error.to_string() }),
    )
}

fn not_found_response(path: &str) -> Response<Full<Bytes>> {
    json_response(
        StatusCode::NOT_FOUND,
        &serde_json::json!({ "error": "Not Found", "path": path }),
    )
}

/// Convert a Full<Bytes> body to BoxBody
fn to_boxed(response: Response<Full<Bytes>>) -> Response<BoxBody> {
    response.map(|body| body.map_err(|never| match never {}).boxed())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Scope;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_for(&DeliveryError::CollectionNotFound("blog".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(&DeliveryError::InvalidRequest("x".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&DeliveryError::Upstream {
                service: "content",
                message: "invalid".to_string()
            }),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_for(&DeliveryError::DocumentFetchFailed("x".to_string())),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(status_for(&DeliveryError::Cancelled), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn test_error_response_body() {
        let response = error_response(&DeliveryError::CollectionNotFound("blog".to_string()));
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers().get("x-api-version").unwrap(),
            API_VERSION
        );
    }

    #[tokio::test]
    async fn test_deadline_cancels_context() {
        let context = RequestContext::new(Scope::new("u1", "p1"));
        let result: Result<()> = with_deadline(&context, Duration::from_millis(5), async {
            std::future::pending::<()>().await;
            Ok(())
        })
        .await;

        assert!(matches!(result, Err(DeliveryError::Cancelled)));
        assert!(context.is_cancelled());
    }
}
