//! Cache key derivation.

use axum::http::{header::HOST, Method, Request};

/// Derives the cache key for a request from its method, host and full URL.
///
/// No normalization is applied: differences in case or query parameter order
/// produce different keys.
pub fn generate<B>(req: &Request<B>) -> String {
    let host = req
        .headers()
        .get(HOST)
        .and_then(|h| h.to_str().ok())
        .or_else(|| req.uri().host())
        .unwrap_or_default();

    compose(req.method(), host, &req.uri().to_string())
}

/// Joins the three key components. Methods and hosts never contain `|`,
/// so the encoding is unambiguous.
pub fn compose(method: &Method, host: &str, url: &str) -> String {
    format!("{method}|{host}|{url}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn request(method: &str, host: &str, uri: &str) -> Request<()> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(HOST, host)
            .body(())
            .unwrap()
    }

    #[test]
    fn test_key_includes_method_host_and_url() {
        let key = generate(&request("GET", "a.com", "/x?y=1"));
        assert_eq!(key, "GET|a.com|/x?y=1");
    }

    #[test]
    fn test_key_is_deterministic() {
        assert_eq!(
            generate(&request("GET", "a.com", "/x")),
            generate(&request("GET", "a.com", "/x"))
        );
    }

    #[test]
    fn test_key_differs_per_component() {
        let base = generate(&request("GET", "a.com", "/x"));

        assert_ne!(base, generate(&request("GET", "a.com", "/y")));
        assert_ne!(base, generate(&request("GET", "b.com", "/x")));
        assert_ne!(base, generate(&request("HEAD", "a.com", "/x")));
    }

    #[test]
    fn test_key_does_not_normalize() {
        assert_ne!(
            generate(&request("GET", "a.com", "/x?a=1&b=2")),
            generate(&request("GET", "a.com", "/x?b=2&a=1"))
        );
        assert_ne!(
            generate(&request("GET", "a.com", "/X")),
            generate(&request("GET", "a.com", "/x"))
        );
    }

    #[test]
    fn test_key_falls_back_to_uri_authority() {
        let req = Request::builder()
            .uri("http://origin.test/data")
            .body(())
            .unwrap();
        assert_eq!(generate(&req), "GET|origin.test|http://origin.test/data");
    }

    proptest! {
        #[test]
        fn prop_distinct_paths_give_distinct_keys(
            a in "/[a-z0-9]{0,8}(\\?[a-z]=[0-9])?",
            b in "/[a-z0-9]{0,8}(\\?[a-z]=[0-9])?"
        ) {
            let key_a = generate(&request("GET", "a.com", &a));
            let key_b = generate(&request("GET", "a.com", &b));
            prop_assert_eq!(key_a == key_b, a == b);
        }
    }
}
