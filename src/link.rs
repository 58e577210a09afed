use std::net::SocketAddr;

use axum::http::HeaderMap;

/// A fully parsed secure-link request, built once by the boundary layer
/// and discarded after the decision is produced.
#[derive(Debug, Clone)]
pub struct LinkDescriptor {
    pub location: String,
    /// Not-valid-after expiry, Unix seconds.
    pub nva: i64,
    /// Directory-depth count as supplied in the link. Trusted at face
    /// value; it is part of the signed canonical string, so tampering
    /// invalidates the token anyway.
    pub dirs: u32,
    /// Slash-joined segments, no leading or trailing slash.
    pub path: String,
    pub file: String,
    /// Lowercase hex digest from the link.
    pub token: String,
    /// Resolved client address (forwarded-for aware).
    pub client_ip: String,
}

/// Parse the auth path segment:
/// `token=nva=<unix-seconds>~dirs=<uint>~hash=0<hex>`.
///
/// The literal `0` between `hash=` and the digest is a fixed marker in the
/// URL grammar, not part of the token; it is required and stripped here.
/// Returns `None` for any malformed field (non-numeric nva/dirs, missing
/// separators, empty token).
pub fn parse_auth_segment(segment: &str) -> Option<(i64, u32, String)> {
    let rest = segment.strip_prefix("token=nva=")?;
    let (nva, rest) = rest.split_once("~dirs=")?;
    let (dirs, hash) = rest.split_once("~hash=")?;
    let token = hash.strip_prefix('0')?;

    let nva: i64 = nva.parse().ok()?;
    let dirs: u32 = dirs.parse().ok()?;
    if token.is_empty() {
        return None;
    }
    Some((nva, dirs, token.to_string()))
}

/// Split the trailing wildcard into `(path, file)` at the last slash.
/// The grammar requires at least one path segment before the leaf name.
pub fn split_content_path(rest: &str) -> Option<(String, String)> {
    let rest = rest.trim_matches('/');
    let (path, file) = rest.rsplit_once('/')?;
    if path.is_empty() || file.is_empty() {
        return None;
    }
    Some((path.to_string(), file.to_string()))
}

/// Resolve the client address: first entry of `X-Forwarded-For` when
/// present, else the connection's remote address.
pub fn client_ip(headers: &HeaderMap, remote: SocketAddr) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| remote.ip().to_string())
}
