//! SPA fallback handler
//!
//! Resolves a request path against the static root and decides between
//! serving the matching file and substituting the index document, so that
//! client-side routing works on full-page loads and refreshes. Unknown
//! routes fall through to the index document instead of a 404.

use crate::config::Config;
use crate::handler::static_files;
use crate::http;
use crate::logger;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Method, Request, Response};
use percent_encoding::percent_decode_str;
use std::convert::Infallible;
use std::io;
use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// Request context encapsulating information needed for request processing
pub struct RequestContext<'a> {
    pub path: &'a str,
    pub is_head: bool,
    pub if_none_match: Option<String>,
    pub range_header: Option<String>,
}

/// Outcome of resolving a request path against the static root
#[derive(Debug, PartialEq, Eq)]
pub enum Resolution {
    /// Path maps to an existing file or directory under the root
    Asset(PathBuf),
    /// Nothing exists at the candidate path, serve the index document
    Fallback,
    /// Request path could not be normalized
    BadRequest(String),
    /// Existence check failed for a reason other than absence
    LookupError(String),
}

/// Main entry point for HTTP request handling
pub async fn handle_request(
    req: Request<hyper::body::Incoming>,
    cfg: Arc<Config>,
    remote_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    let query = req.uri().query().map(ToOwned::to_owned);

    let mut entry = logger::AccessLogEntry::new(
        remote_addr.ip().to_string(),
        method.to_string(),
        path.clone(),
    );
    entry.query = query;
    entry.http_version = format!("{:?}", req.version());
    entry.referer = header_value(&req, "referer");
    entry.user_agent = header_value(&req, "user-agent");

    let ctx = RequestContext {
        path: &path,
        is_head: method == Method::HEAD,
        if_none_match: header_value(&req, "if-none-match"),
        range_header: header_value(&req, "range"),
    };

    let mut response = match method {
        Method::GET | Method::HEAD => dispatch(&ctx, &cfg).await,
        Method::OPTIONS => http::build_options_response(),
        _ => {
            logger::log_warning(&format!("Method not allowed: {method}"));
            http::build_405_response()
        }
    };

    if cfg.http.enable_cors {
        http::apply_cors_headers(&mut response);
    }

    if cfg.logging.access_log {
        entry.status = response.status().as_u16();
        entry.body_bytes = response
            .headers()
            .get("content-length")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        logger::log_access(&entry, &cfg.logging.access_log_format);
    }

    Ok(response)
}

/// Resolve the request path and serve the chosen document
///
/// Stateless and read-only; safe for concurrent invocation.
pub async fn dispatch(ctx: &RequestContext<'_>, cfg: &Config) -> Response<Full<Bytes>> {
    let root = Path::new(&cfg.static_files.root);

    match resolve(root, ctx.path).await {
        Resolution::Asset(candidate) => {
            static_files::serve_asset(ctx, &candidate, &cfg.static_files.index).await
        }
        Resolution::Fallback => {
            static_files::serve_file(ctx, &root.join(&cfg.static_files.index)).await
        }
        Resolution::BadRequest(reason) => {
            logger::log_warning(&format!("Bad request path '{}': {reason}", ctx.path));
            http::build_400_response(&reason)
        }
        Resolution::LookupError(reason) => {
            logger::log_error(&format!("Stat failed for '{}': {reason}", ctx.path));
            http::build_500_response(&reason)
        }
    }
}

/// Resolve a request path to a candidate under the static root
///
/// Normalization happens before any file system access; a path that cannot
/// be normalized never reaches the stat call.
pub async fn resolve(root: &Path, raw_path: &str) -> Resolution {
    let relative = match normalize_request_path(raw_path) {
        Ok(p) => p,
        Err(reason) => return Resolution::BadRequest(reason),
    };

    let candidate = root.join(relative);
    match tokio::fs::metadata(&candidate).await {
        Ok(_) => Resolution::Asset(candidate),
        Err(err) => classify_stat_error(&err),
    }
}

/// Normalize a URL path into a relative path safe to join under the root
///
/// Percent-decodes the path, then lexically collapses `.` and `..` segments
/// and redundant separators. Traversal segments are resolved here, before the
/// join, so the composed candidate can never climb above the static root.
pub fn normalize_request_path(raw: &str) -> Result<PathBuf, String> {
    let decoded = percent_decode_str(raw)
        .decode_utf8()
        .map_err(|e| format!("invalid percent-encoding in path: {e}"))?;

    if decoded.contains('\0') {
        return Err("path contains NUL byte".to_owned());
    }

    let mut normalized = PathBuf::new();
    for component in Path::new(decoded.as_ref()).components() {
        match component {
            Component::RootDir | Component::CurDir => {}
            // ".." pops at most back to the (virtual) root
            Component::ParentDir => {
                normalized.pop();
            }
            Component::Normal(segment) => normalized.push(segment),
            Component::Prefix(_) => {
                return Err("path prefix not allowed".to_owned());
            }
        }
    }

    Ok(normalized)
}

/// Map a stat failure to a resolution
///
/// Absence is not an error: it selects the index fallback. Anything else
/// (permissions, I/O) is an internal lookup failure.
fn classify_stat_error(err: &io::Error) -> Resolution {
    if err.kind() == io::ErrorKind::NotFound {
        Resolution::Fallback
    } else {
        Resolution::LookupError(err.to_string())
    }
}

fn header_value(req: &Request<hyper::body::Incoming>, name: &str) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}
