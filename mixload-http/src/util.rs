use bytes::Bytes;
use http_body_util::Full;
use hyper::Request;
use std::collections::BTreeMap;

use super::{Error, HttpRequest, Result};

/// Validates the URL and turns `req` into a hyper request with explicit `Host` and
/// `Content-Length` headers. Caller-supplied values for either win.
pub(super) fn build_hyper_request(req: HttpRequest) -> Result<Request<Full<Bytes>>> {
    let parsed = url::Url::parse(&req.url).map_err(|_| Error::InvalidUrl(req.url.clone()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(Error::UnsupportedScheme(req.url));
    }

    let uri: hyper::Uri = req
        .url
        .parse()
        .map_err(|_| Error::InvalidUrl(req.url.clone()))?;

    let mut builder = Request::builder().method(req.method).uri(uri);

    if !has_header(&req.headers, "host")
        && let Some(host) = host_header_value(&parsed)
    {
        builder = builder.header(http::header::HOST, host);
    }
    if !req.body.is_empty() && !has_header(&req.headers, "content-length") {
        builder = builder.header(http::header::CONTENT_LENGTH, req.body.len());
    }

    for (k, v) in req.headers {
        let name = http::header::HeaderName::from_bytes(k.as_bytes())?;
        let value = http::header::HeaderValue::from_str(&v)?;
        builder = builder.header(name, value);
    }

    Ok(builder.body(Full::new(req.body))?)
}

/// Lowercased names in sorted order; repeated headers are joined with ", ".
pub(super) fn merge_headers(headers: &http::HeaderMap) -> Vec<(String, String)> {
    let mut merged: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let v = String::from_utf8_lossy(value.as_bytes()).into_owned();
        merged
            .entry(name.as_str().to_ascii_lowercase())
            .and_modify(|cur| {
                if !cur.is_empty() {
                    cur.push_str(", ");
                }
                cur.push_str(&v);
            })
            .or_insert(v);
    }
    merged.into_iter().collect()
}

fn has_header(headers: &[(String, String)], name: &str) -> bool {
    headers.iter().any(|(k, _)| k.eq_ignore_ascii_case(name))
}

/// `Host` header value. `Url::port` is `None` for the scheme's default port.
fn host_header_value(parsed: &url::Url) -> Option<String> {
    let host = parsed.host_str()?;
    match parsed.port() {
        Some(port) => Some(format!("{host}:{port}")),
        None => Some(host.to_string()),
    }
}
