//! Development server bootstrap and request routing.
//!
//! Requests under the base path are answered from the public directory
//! first and then from the [`ModuleResolver`]. The listener is owned by the
//! serve task; stopping the server drops it and lets in-flight requests
//! drain for a bounded grace period.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};
use kiln_config::{BaseMatch, BuildConfig, PathRewriter, PublicDirPolicy};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower::ServiceExt;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::{debug, error, info, warn};

use crate::dev::resolver::{ModuleResolver, PipelineResolver};
use crate::dev::state::{ServerControl, ServerController, ServerPhase};
use crate::error::ServerError;

/// How long in-flight requests may run after a stop request.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// Development server.
pub struct DevServer {
    config: Arc<BuildConfig>,
    resolver: Arc<dyn ModuleResolver>,
    control: Arc<ServerControl>,
    grace_period: Duration,
}

impl DevServer {
    /// Create a new development server.
    ///
    /// # Arguments
    ///
    /// * `config` - Resolved build configuration
    /// * `resolver` - Handles requests the public directory does not answer
    pub fn new(config: Arc<BuildConfig>, resolver: Arc<dyn ModuleResolver>) -> Self {
        Self {
            config,
            resolver,
            control: Arc::new(ServerControl::new()),
            grace_period: DEFAULT_GRACE_PERIOD,
        }
    }

    /// Server that resolves modules through the configured plugin pipeline.
    pub fn from_config(config: Arc<BuildConfig>) -> Self {
        let resolver = Arc::new(PipelineResolver::from_config(&config));
        Self::new(config, resolver)
    }

    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    pub fn phase(&self) -> ServerPhase {
        self.control.phase()
    }

    /// Handle for observing or stopping the server, usable before `start`.
    pub fn controller(&self) -> ServerController {
        ServerController::new(self.control.clone())
    }

    /// Bind the configured address and start serving.
    ///
    /// # Errors
    ///
    /// - `InvalidState` if the server was already started or stopped
    /// - `PublicDirMissing` under `publicDirPolicy = "require"`
    /// - `BindFailed` if the socket cannot be acquired; never retried
    pub async fn start(&self) -> Result<ServerHandle, ServerError> {
        self.control.transition(ServerPhase::Binding, "start")?;

        if let Err(err) = self.check_public_dir() {
            self.control.transition(ServerPhase::Failed, "start")?;
            return Err(err);
        }

        let server = self.config.server();
        let addr = server.display_addr();

        let bound = TcpListener::bind((server.host.as_str(), server.port))
            .await
            .and_then(|listener| {
                let local_addr = listener.local_addr()?;
                Ok((listener, local_addr))
            });

        let (listener, local_addr) = match bound {
            Ok(bound) => bound,
            Err(source) => {
                self.control.transition(ServerPhase::Failed, "start")?;
                let err = ServerError::BindFailed { addr, source };
                error!("{err}");
                return Err(err);
            }
        };

        // A stop that arrived while binding wins: release the socket right away.
        if self.control.stop_requested() {
            drop(listener);
            self.control.transition(ServerPhase::Stopped, "start")?;
            debug!(addr = %local_addr, "stop requested during bind; listener released");
            return Ok(ServerHandle {
                local_addr,
                control: self.control.clone(),
                task: None,
                grace_period: self.grace_period,
            });
        }

        self.control.transition(ServerPhase::Serving, "start")?;
        info!(addr = %local_addr, base = self.config.base(), "dev server listening");

        let router = self.router();
        let control = self.control.clone();
        let task = tokio::spawn(async move {
            let shutdown = {
                let control = control.clone();
                async move { control.stopped().await }
            };

            let result = axum::serve(listener, router)
                .with_graceful_shutdown(shutdown)
                .await
                .map_err(|e| ServerError::Serve {
                    message: e.to_string(),
                });

            control.finish();
            result
        });

        Ok(ServerHandle {
            local_addr,
            control: self.control.clone(),
            task: Some(task),
            grace_period: self.grace_period,
        })
    }

    /// Build the axum router.
    ///
    /// Exposed so routing can be exercised without opening a socket.
    pub fn router(&self) -> Router {
        let public_dir = match self.config.public_dir_path() {
            Some(dir) if dir.is_dir() => Some(dir),
            Some(dir) => {
                debug!(path = %dir.display(), "public directory missing; nothing will be served from it");
                None
            }
            None => None,
        };

        let state = Arc::new(RouterState {
            rewriter: self.config.rewriter().clone(),
            public_dir,
            resolver: self.resolver.clone(),
        });

        let router = Router::new().fallback(handle_request).with_state(state);

        if self.config.server().cors {
            router.layer(
                // CORS: Allow all origins for dev
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            )
        } else {
            router
        }
    }

    fn check_public_dir(&self) -> Result<(), ServerError> {
        if self.config.public_dir_policy() != PublicDirPolicy::Require {
            return Ok(());
        }

        match self.config.public_dir_path() {
            Some(path) if !path.is_dir() => Err(ServerError::PublicDirMissing { path }),
            _ => Ok(()),
        }
    }
}

/// Running server returned by [`DevServer::start`].
///
/// Dropping the handle requests a stop without waiting for it.
pub struct ServerHandle {
    local_addr: SocketAddr,
    control: Arc<ServerControl>,
    task: Option<JoinHandle<Result<(), ServerError>>>,
    grace_period: Duration,
}

impl ServerHandle {
    /// Address actually bound, after host name resolution.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn phase(&self) -> ServerPhase {
        self.control.phase()
    }

    pub fn controller(&self) -> ServerController {
        ServerController::new(self.control.clone())
    }

    /// Stop accepting connections, drain in-flight requests for at most the
    /// grace period, then abort whatever is left.
    pub async fn stop(mut self) -> Result<(), ServerError> {
        self.control.request_stop();

        let Some(mut task) = self.task.take() else {
            self.control.finish();
            return Ok(());
        };

        let result = match tokio::time::timeout(self.grace_period, &mut task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(ServerError::Serve {
                message: join_err.to_string(),
            }),
            Err(_) => {
                warn!(
                    grace_ms = self.grace_period.as_millis() as u64,
                    "grace period elapsed; aborting remaining connections"
                );
                task.abort();
                let _ = task.await;
                Ok(())
            }
        };

        self.control.finish();
        info!(addr = %self.local_addr, "dev server stopped");
        result
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        if self.task.is_some() {
            self.control.request_stop();
        }
    }
}

struct RouterState {
    rewriter: PathRewriter,
    public_dir: Option<PathBuf>,
    resolver: Arc<dyn ModuleResolver>,
}

async fn handle_request(State(state): State<Arc<RouterState>>, request: Request) -> Response {
    let path = request.uri().path().to_string();

    match state.rewriter.strip(&path) {
        BaseMatch::Outside => outside_base(&state.rewriter, &path),
        BaseMatch::MissingTrailingSlash => {
            let mut location = state.rewriter.base().to_string();
            if let Some(query) = request.uri().query() {
                location.push('?');
                location.push_str(query);
            }
            found(&location)
        }
        BaseMatch::Inside(rest) => {
            let rest = rest.to_string();
            let is_read = matches!(*request.method(), Method::GET | Method::HEAD);

            // Only reads are answered from the public directory; everything
            // else goes to the module resolver.
            if let Some(dir) = state.public_dir.as_deref().filter(|_| is_read) {
                if let Some(response) = serve_public(&state.rewriter, dir, &rest, request).await {
                    return response;
                }
            }

            serve_module(&state, &path, &rest).await
        }
    }
}

/// Try the public directory; `None` when it has nothing for this path.
async fn serve_public(
    rewriter: &PathRewriter,
    dir: &Path,
    rest: &str,
    mut request: Request,
) -> Option<Response> {
    let mut target = format!("/{rest}");
    if let Some(query) = request.uri().query() {
        target.push('?');
        target.push_str(query);
    }

    *request.uri_mut() = target.parse::<Uri>().ok()?;

    let response = match ServeDir::new(dir).oneshot(request).await {
        Ok(response) => response,
        Err(never) => match never {},
    };

    if matches!(
        response.status(),
        StatusCode::NOT_FOUND | StatusCode::METHOD_NOT_ALLOWED
    ) {
        return None;
    }

    let mut response = response.map(Body::new);

    // Directory redirects from ServeDir are relative to the public root.
    if response.status().is_redirection() {
        let location = response
            .headers()
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .filter(|value| value.starts_with('/'))
            .map(|value| rewriter.rewrite(value));

        if let Some(value) = location.and_then(|l| HeaderValue::from_str(&l).ok()) {
            response.headers_mut().insert(header::LOCATION, value);
        }
    }

    Some(response)
}

async fn serve_module(state: &RouterState, path: &str, rest: &str) -> Response {
    // ServeDir decodes on its own; the resolver gets the decoded path too.
    let Ok(rest) = urlencoding::decode(rest) else {
        return (
            StatusCode::BAD_REQUEST,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            format!("Invalid percent-encoding in {path}"),
        )
            .into_response();
    };

    match state.resolver.resolve(&rest).await {
        Ok(Some(module)) => {
            let body = if module.content_type.starts_with("text/html") {
                let html = String::from_utf8_lossy(&module.body);
                rewrite_html_urls(&html, &state.rewriter).into_bytes()
            } else {
                module.body
            };

            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, module.content_type),
                    (header::CACHE_CONTROL, "no-cache"),
                ],
                body,
            )
                .into_response()
        }
        Ok(None) => (
            StatusCode::NOT_FOUND,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            format!("File not found: {path}"),
        )
            .into_response(),
        Err(e) => {
            error!(path, "module resolution failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                e.to_string(),
            )
                .into_response()
        }
    }
}

fn outside_base(rewriter: &PathRewriter, path: &str) -> Response {
    let body = format!(
        "{path} is outside the base path {base}. Did you mean {suggestion}?",
        base = rewriter.base(),
        suggestion = rewriter.rewrite(path),
    );

    (
        StatusCode::NOT_FOUND,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        body,
    )
        .into_response()
}

fn found(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => (StatusCode::FOUND, [(header::LOCATION, value)]).into_response(),
        Err(_) => StatusCode::BAD_REQUEST.into_response(),
    }
}

const URL_ATTRIBUTES: &[&str] = &["src=\"", "src='", "href=\"", "href='"];

/// Prefix root-absolute `src`/`href` values with the base path.
///
/// Protocol-relative and external URLs are left alone, and values already
/// under the base are not prefixed twice.
pub(crate) fn rewrite_html_urls(html: &str, rewriter: &PathRewriter) -> String {
    if rewriter.is_root() {
        return html.to_string();
    }

    let mut out = String::with_capacity(html.len() + 64);
    let mut rest = html;

    while let Some((value_start, quote)) = next_url_attribute(rest) {
        out.push_str(&rest[..value_start]);

        let tail = &rest[value_start..];
        let value_end = tail.find(quote).unwrap_or(tail.len());
        let value = &tail[..value_end];

        if value.starts_with('/') && !value.starts_with("//") {
            out.push_str(&rewriter.rewrite(value));
        } else {
            out.push_str(value);
        }

        rest = &tail[value_end..];
    }

    out.push_str(rest);
    out
}

/// Byte offset just past the opening quote of the next URL attribute.
fn next_url_attribute(html: &str) -> Option<(usize, char)> {
    URL_ATTRIBUTES
        .iter()
        .filter_map(|attr| {
            let quote = attr.chars().last()?;
            let mut from = 0;
            while let Some(pos) = html[from..].find(attr) {
                let at = from + pos;
                let bounded = html[..at]
                    .chars()
                    .next_back()
                    .is_none_or(|c| c.is_ascii_whitespace());
                if bounded {
                    return Some((at + attr.len(), quote));
                }
                from = at + attr.len();
            }
            None
        })
        .min_by_key(|(offset, _)| *offset)
}
