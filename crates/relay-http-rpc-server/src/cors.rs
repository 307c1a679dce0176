//! CORS (Cross-Origin Resource Sharing) support

use hyper::HeaderMap;
use hyper::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    ACCESS_CONTROL_MAX_AGE, ACCESS_CONTROL_REQUEST_HEADERS, HeaderValue,
};

const ALLOWED_METHODS: &str = "POST, OPTIONS";
const DEFAULT_ALLOWED_HEADERS: &str = "Content-Type, Accept, Authorization";

/// CORS layer for adding appropriate headers
pub struct CorsLayer;

impl CorsLayer {
    /// Apply CORS headers to a response
    pub fn apply_cors_headers(headers: &mut HeaderMap) {
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
        headers.insert(
            ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOWED_METHODS),
        );
        headers.insert(
            ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(DEFAULT_ALLOWED_HEADERS),
        );
        headers.insert(ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static("86400"));
    }

    /// Preflight variant: services read custom headers (an `auth` token, for
    /// instance), so whatever the browser asks for is allowed.
    pub fn apply_preflight_headers(headers: &mut HeaderMap, request_headers: &HeaderMap) {
        Self::apply_cors_headers(headers);
        if let Some(requested) = request_headers.get(ACCESS_CONTROL_REQUEST_HEADERS) {
            headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, requested.clone());
        }
    }
}
