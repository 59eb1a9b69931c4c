//! Static file serving module
//!
//! The delegated static-file facility: loads file bytes and builds responses
//! with content-type, `ETag`/conditional and Range support. The fallback
//! decision itself lives in the `spa` module; by the time a path reaches this
//! module it has already been confined to the static root.

use crate::handler::spa::RequestContext;
use crate::http::{self, cache, mime, range::RangeParseResult};
use crate::logger;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;
use std::path::Path;
use tokio::fs;

/// Serve an existing candidate path (file or directory)
///
/// For a directory the facility probes the index document inside it and
/// returns 404 when none is present.
pub async fn serve_asset(
    ctx: &RequestContext<'_>,
    candidate: &Path,
    index_name: &str,
) -> Response<Full<Bytes>> {
    let is_dir = fs::metadata(candidate)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false);

    if is_dir {
        let index_path = candidate.join(index_name);
        match fs::metadata(&index_path).await {
            Ok(m) if m.is_file() => serve_file(ctx, &index_path).await,
            _ => http::build_404_response(),
        }
    } else {
        serve_file(ctx, candidate).await
    }
}

/// Serve a single file
///
/// A read failure here is an internal error: the index document on the
/// fallback branch, or an asset that vanished between stat and read.
pub async fn serve_file(ctx: &RequestContext<'_>, path: &Path) -> Response<Full<Bytes>> {
    match fs::read(path).await {
        Ok(content) => build_file_response(&content, mime::from_path(path), ctx),
        Err(e) => {
            logger::log_error(&format!("Failed to read file '{}': {e}", path.display()));
            http::build_500_response(&e.to_string())
        }
    }
}

/// Build a file response with `ETag` and Range support
fn build_file_response(
    data: &[u8],
    content_type: &str,
    ctx: &RequestContext<'_>,
) -> Response<Full<Bytes>> {
    let etag = cache::generate_etag(data);
    let total_size = data.len();

    // Client already has the current version
    if cache::check_etag_match(ctx.if_none_match.as_deref(), &etag) {
        return http::response::build_304_response(&etag);
    }

    match http::parse_range_header(ctx.range_header.as_deref(), total_size) {
        RangeParseResult::Valid(range) => {
            let start = range.start;
            let end = range.end_position(total_size);

            let body = if ctx.is_head {
                Bytes::new()
            } else {
                Bytes::from(data[start..=end].to_vec())
            };

            http::response::build_partial_response(
                body,
                content_type,
                &etag,
                start,
                end,
                total_size,
                ctx.is_head,
            )
        }
        RangeParseResult::NotSatisfiable => http::build_416_response(total_size),
        RangeParseResult::None => {
            let body = if ctx.is_head {
                Bytes::new()
            } else {
                Bytes::from(data.to_owned())
            };

            http::response::build_cached_response(body, content_type, &etag, ctx.is_head)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs as std_fs;
    use tempfile::TempDir;

    fn ctx<'a>(
        path: &'a str,
        is_head: bool,
        if_none_match: Option<&str>,
        range_header: Option<&str>,
    ) -> RequestContext<'a> {
        RequestContext {
            path,
            is_head,
            if_none_match: if_none_match.map(ToOwned::to_owned),
            range_header: range_header.map(ToOwned::to_owned),
        }
    }

    #[tokio::test]
    async fn test_serve_file_with_content_type() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("style.css");
        std_fs::write(&file, "body{}").unwrap();

        let response = serve_file(&ctx("/style.css", false, None, None), &file).await;
        assert_eq!(response.status(), 200);
        assert_eq!(response.headers()["Content-Type"], "text/css");
        assert_eq!(response.headers()["Content-Length"], "6");
    }

    #[tokio::test]
    async fn test_head_has_headers_only() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("app.js");
        std_fs::write(&file, "let x=1;").unwrap();

        let response = serve_file(&ctx("/app.js", true, None, None), &file).await;
        assert_eq!(response.status(), 200);
        assert_eq!(response.headers()["Content-Length"], "8");
    }

    #[tokio::test]
    async fn test_conditional_request_304() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("index.html");
        std_fs::write(&file, "<html/>").unwrap();

        let first = serve_file(&ctx("/", false, None, None), &file).await;
        let etag = first.headers()["ETag"].to_str().unwrap().to_owned();

        let second = serve_file(&ctx("/", false, Some(&etag), None), &file).await;
        assert_eq!(second.status(), 304);
    }

    #[tokio::test]
    async fn test_range_request_206() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("data.bin");
        std_fs::write(&file, b"0123456789").unwrap();

        let response = serve_file(&ctx("/data.bin", false, None, Some("bytes=2-5")), &file).await;
        assert_eq!(response.status(), 206);
        assert_eq!(response.headers()["Content-Range"], "bytes 2-5/10");
        assert_eq!(response.headers()["Content-Length"], "4");
    }

    #[tokio::test]
    async fn test_range_beyond_file_416() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("data.bin");
        std_fs::write(&file, b"0123456789").unwrap();

        let response = serve_file(&ctx("/data.bin", false, None, Some("bytes=50-")), &file).await;
        assert_eq!(response.status(), 416);
        assert_eq!(response.headers()["Content-Range"], "bytes */10");
    }

    #[tokio::test]
    async fn test_directory_without_index_404() {
        let dir = TempDir::new().unwrap();
        std_fs::create_dir(dir.path().join("assets")).unwrap();

        let response = serve_asset(
            &ctx("/assets", false, None, None),
            &dir.path().join("assets"),
            "index.html",
        )
        .await;
        assert_eq!(response.status(), 404);
    }

    #[tokio::test]
    async fn test_directory_with_index() {
        let dir = TempDir::new().unwrap();
        std_fs::create_dir(dir.path().join("docs")).unwrap();
        std_fs::write(dir.path().join("docs/index.html"), "<html>docs</html>").unwrap();

        let response = serve_asset(
            &ctx("/docs", false, None, None),
            &dir.path().join("docs"),
            "index.html",
        )
        .await;
        assert_eq!(response.status(), 200);
        assert_eq!(
            response.headers()["Content-Type"],
            "text/html; charset=utf-8"
        );
    }
}
