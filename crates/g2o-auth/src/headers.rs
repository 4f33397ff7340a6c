//! Wire header names and extraction from HTTP request parts.

/// Header carrying the comma-separated authentication data.
pub const AUTH_DATA_HEADER: &str = "X-Akamai-G2O-Auth-Data";

/// Header carrying the base64 signature.
pub const AUTH_SIGN_HEADER: &str = "X-Akamai-G2O-Auth-Sign";

/// The G2O values found on a request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct G2oHeaders<'a> {
    /// Request path and query, used as the sign-string.
    pub sign_string: &'a str,
    /// Value of [`AUTH_DATA_HEADER`], empty when absent or not valid ASCII.
    pub data: &'a str,
    /// Value of [`AUTH_SIGN_HEADER`], empty when absent or not valid ASCII.
    pub signature: &'a str,
}

/// Pull the G2O headers and the sign-string out of a request.
///
/// # Examples
///
/// ```
/// use g2o_auth::headers::{AUTH_SIGN_HEADER, extract};
///
/// let (parts, ()) = http::Request::builder()
///     .uri("http://origin.example.com/abc?x=1")
///     .header(AUTH_SIGN_HEADER, "c2ln")
///     .body(())
///     .unwrap()
///     .into_parts();
///
/// let headers = extract(&parts);
/// assert_eq!(headers.sign_string, "/abc?x=1");
/// assert_eq!(headers.signature, "c2ln");
/// assert!(headers.data.is_empty());
/// ```
#[must_use]
pub fn extract(parts: &http::request::Parts) -> G2oHeaders<'_> {
    G2oHeaders {
        sign_string: parts
            .uri
            .path_and_query()
            .map_or_else(|| parts.uri.path(), http::uri::PathAndQuery::as_str),
        data: header_value(parts, AUTH_DATA_HEADER),
        signature: header_value(parts, AUTH_SIGN_HEADER),
    }
}

/// Extract a header value as a string, returning an empty string if missing.
fn header_value<'a>(parts: &'a http::request::Parts, name: &str) -> &'a str {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}
