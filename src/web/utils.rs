//! Web utility functions

use axum::http::{HeaderMap, header};
use std::path::Path;
use url::Url;

use crate::imaging::OutputFormat;

/// `https` when a proxy tells us the client used TLS, otherwise `http`
pub fn request_scheme(headers: &HeaderMap) -> &'static str {
    let forwarded_https = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|proto| proto.trim().eq_ignore_ascii_case("https"));

    if forwarded_https { "https" } else { "http" }
}

/// Host the client addressed, falling back to `fallback` when absent
pub fn request_host(headers: &HeaderMap, fallback: &str) -> String {
    headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .filter(|host| !host.is_empty())
        .unwrap_or(fallback)
        .to_string()
}

/// `<scheme>://<host>`, rejecting hosts that cannot form a URL
pub fn download_base(scheme: &str, host: &str) -> Result<Url, url::ParseError> {
    Url::parse(&format!("{scheme}://{host}"))
}

/// `<base>/api/download/<id>?token=<token>`
pub fn download_url(base: &Url, id: &str, token: &str) -> String {
    let mut url = base.clone();
    url.set_path(&format!("/api/download/{id}"));
    url.query_pairs_mut().append_pair("token", token);
    url.into()
}

/// Name offered to the browser for a compressed upload:
/// `<upload stem>_compressed.<ext>`, restricted to safe characters
pub fn download_filename(upload_name: Option<&str>, format: OutputFormat) -> String {
    let stem = upload_name
        .map(Path::new)
        .and_then(|path| path.file_stem())
        .and_then(|stem| stem.to_str())
        .map(sanitize)
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| "image".to_string());

    format!("{}_compressed.{}", stem, format.extension())
}

/// `attachment; filename="..."`
pub fn content_disposition(filename: &str) -> String {
    format!("attachment; filename=\"{}\"", sanitize(filename))
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
