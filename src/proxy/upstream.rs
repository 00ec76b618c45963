//! Upstream Module
//!
//! Forwards requests to the single origin and converts its responses back
//! into axum responses.

use std::net::{IpAddr, SocketAddr};

use axum::{
    body::{Body, Bytes},
    extract::{ConnectInfo, Request},
    http::{
        header::{self, HeaderName},
        HeaderMap, HeaderValue, StatusCode, Uri,
    },
    response::Response,
};
use reqwest::{redirect, Client, Url};
use tracing::debug;

use crate::error::ProxyError;

/// Headers that describe a single connection and are never forwarded.
const HOP_BY_HOP: [&str; 9] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

// == Upstream ==
/// HTTP client bound to one origin.
#[derive(Debug, Clone)]
pub struct Upstream {
    client: Client,
    target: Url,
}

impl Upstream {
    // == Constructor ==
    /// Creates a client for `target`. Redirects are relayed, never followed.
    pub fn new(target: Url) -> reqwest::Result<Self> {
        let client = Client::builder()
            .redirect(redirect::Policy::none())
            .build()?;
        Ok(Self { client, target })
    }

    pub fn target(&self) -> &Url {
        &self.target
    }

    // == URL Join ==
    /// Maps an inbound request URI onto the origin.
    ///
    /// Paths are joined with exactly one `/`; origin and inbound queries are
    /// both kept.
    pub fn url_for(&self, uri: &Uri) -> Url {
        let mut url = self.target.clone();

        let base = self.target.path();
        let path = uri.path();
        let joined = match (base.ends_with('/'), path.starts_with('/')) {
            (true, true) => format!("{base}{}", &path[1..]),
            (false, false) => format!("{base}/{path}"),
            _ => format!("{base}{path}"),
        };
        url.set_path(&joined);

        let query = match (self.target.query(), uri.query()) {
            (Some(t), Some(r)) if !t.is_empty() && !r.is_empty() => Some(format!("{t}&{r}")),
            (Some(t), None) | (Some(t), Some("")) => Some(t.to_string()),
            (_, Some(r)) => Some(r.to_string()),
            (None, None) => None,
        };
        url.set_query(query.as_deref());
        url
    }

    // == Forward ==
    /// Sends `req` to the origin and returns the response head, with the body
    /// still unread.
    pub async fn forward(&self, req: Request) -> Result<reqwest::Response, ProxyError> {
        let client_ip = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());
        let (parts, body) = req.into_parts();

        let url = self.url_for(&parts.uri);
        let mut headers = parts.headers;
        strip_hop_by_hop(&mut headers);
        // reqwest fills in the origin's host
        headers.remove(header::HOST);
        if let Some(ip) = client_ip {
            append_forwarded_for(&mut headers, ip);
        }

        let body = axum::body::to_bytes(body, usize::MAX)
            .await
            .map_err(|err| ProxyError::RequestBody(err.to_string()))?;

        debug!(method = %parts.method, url = %url, "Forwarding request upstream");

        let mut builder = self.client.request(parts.method, url).headers(headers);
        if !body.is_empty() {
            builder = builder.body(body);
        }
        builder.send().await.map_err(ProxyError::Upstream)
    }
}

/// Removes hop-by-hop headers, including any named by `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let named: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in named {
        headers.remove(name);
    }
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
}

fn append_forwarded_for(headers: &mut HeaderMap, ip: IpAddr) {
    let prior: Vec<&str> = headers
        .get_all("x-forwarded-for")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();

    let value = if prior.is_empty() {
        ip.to_string()
    } else {
        format!("{}, {ip}", prior.join(", "))
    };

    if let Ok(value) = HeaderValue::from_str(&value) {
        headers.insert("x-forwarded-for", value);
    }
}

/// Relays an upstream response to the client without buffering its body.
pub fn stream_response(upstream: reqwest::Response) -> Response {
    let status = upstream.status();
    let mut headers = upstream.headers().clone();
    strip_hop_by_hop(&mut headers);

    let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

/// Builds a response from a fully buffered body.
pub fn buffered_response(status: StatusCode, headers: HeaderMap, body: Bytes) -> Response {
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}
