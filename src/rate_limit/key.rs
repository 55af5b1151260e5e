//! Client key derivation from proxy headers.
//!
//! The key is whatever the proxy chain claims; it is never parsed as an address.

use http::HeaderMap;

/// Key used when no address header is present.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Proxy chain header, consulted first. Only its first hop is used.
pub const FORWARDED_FOR: &str = "x-forwarded-for";
/// Client address set by Cloudflare.
pub const CF_CONNECTING_IP: &str = "cf-connecting-ip";
/// Client address set by nginx-style proxies.
pub const REAL_IP: &str = "x-real-ip";

/// Longest key kept, in bytes.
pub const MAX_KEY_LEN: usize = 256;

/// Derive the limiter key for a request.
///
/// # Examples
/// ```
/// use http::HeaderMap;
/// use taskgate::rate_limit::client_key;
/// let mut headers = HeaderMap::new();
/// headers.insert("x-forwarded-for", "203.0.113.7, 10.0.0.1".parse().unwrap());
/// assert_eq!(client_key(&headers), "203.0.113.7");
/// assert_eq!(client_key(&HeaderMap::new()), "unknown");
/// ```
pub fn client_key(headers: &HeaderMap) -> String {
    let forwarded = header_str(headers, FORWARDED_FOR).and_then(|v| non_empty(v.split(',').next()));
    let key = forwarded
        .or_else(|| non_empty(header_str(headers, CF_CONNECTING_IP)))
        .or_else(|| non_empty(header_str(headers, REAL_IP)))
        .unwrap_or(UNKNOWN_CLIENT);
    truncate(key).to_owned()
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn truncate(key: &str) -> &str {
    if key.len() <= MAX_KEY_LEN {
        return key;
    }
    let mut end = MAX_KEY_LEN;
    while !key.is_char_boundary(end) {
        end -= 1;
    }
    &key[..end]
}
