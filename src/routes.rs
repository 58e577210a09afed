use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Path, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;

use crate::decision::{Decision, RouteShape};
use crate::link;
use crate::state::AppState;

const TOKEN_STATUS: &str = "X-Auth-Token-Status";
const TIMESTAMP_STATUS: &str = "X-Auth-Timestamp-Status";
const GEOIP_STATUS: &str = "X-Auth-GeoIP-Status";
const TOKEN_PATH: &str = "X-Auth-Token-Path";
const ORIGINAL_PATH: &str = "X-Auth-Original-Path";

/// Build the full axum Router. Static prefixes (`/ip`, `/geo`, `/geoip`,
/// `/geocheck`) take precedence over the bare location capture, so the
/// original plain-link grammar stays intact at the root.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/geocheck/{location}", get(geo_probe_observed))
        .route("/geocheck/{location}/{ip}", get(geo_probe_explicit))
        .route("/ip/{location}/{auth}/{*rest}", get(ip_bound_link))
        .route("/geo/{location}/{auth}/{*rest}", get(geo_link))
        .route("/geoip/{location}/{auth}/{*rest}", get(geo_ip_link))
        .route("/{location}/{auth}/{*rest}", get(plain_link))
        .with_state(state)
}

/// GET / — nothing is served at the root; answer probes with a rejection.
async fn index() -> Response {
    reject_malformed()
}

async fn plain_link(
    State(state): State<AppState>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path((location, auth, rest)): Path<(String, String, String)>,
) -> Response {
    handle_link(&state, &headers, remote, location, auth, rest, RouteShape::Plain)
}

async fn ip_bound_link(
    State(state): State<AppState>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path((location, auth, rest)): Path<(String, String, String)>,
) -> Response {
    handle_link(&state, &headers, remote, location, auth, rest, RouteShape::IpBound)
}

async fn geo_link(
    State(state): State<AppState>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path((location, auth, rest)): Path<(String, String, String)>,
) -> Response {
    handle_link(&state, &headers, remote, location, auth, rest, RouteShape::Geo)
}

async fn geo_ip_link(
    State(state): State<AppState>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path((location, auth, rest)): Path<(String, String, String)>,
) -> Response {
    handle_link(&state, &headers, remote, location, auth, rest, RouteShape::GeoIpBound)
}

/// GET /geocheck/{location} — geo probe against the caller's observed address.
async fn geo_probe_observed(
    State(state): State<AppState>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path(location): Path<String>,
) -> Response {
    let client_ip = link::client_ip(&headers, remote);
    probe_response(state.engine.probe_geo(&client_ip, &location))
}

/// GET /geocheck/{location}/{ip} — geo probe against an explicit address.
async fn geo_probe_explicit(
    State(state): State<AppState>,
    Path((location, ip)): Path<(String, String)>,
) -> Response {
    probe_response(state.engine.probe_geo(&ip, &location))
}

fn handle_link(
    state: &AppState,
    headers: &HeaderMap,
    remote: SocketAddr,
    location: String,
    auth: String,
    rest: String,
    shape: RouteShape,
) -> Response {
    let Some((nva, dirs, token)) = link::parse_auth_segment(&auth) else {
        tracing::warn!("Malformed auth segment {:?}", auth);
        return reject_malformed();
    };
    let Some((path, file)) = link::split_content_path(&rest) else {
        tracing::warn!("Malformed content path {:?}", rest);
        return reject_malformed();
    };
    if location.is_empty() {
        return reject_malformed();
    }

    let descriptor = link::LinkDescriptor {
        location,
        nva,
        dirs,
        path,
        file,
        token,
        client_ip: link::client_ip(headers, remote),
    };
    tracing::debug!(
        "Got request parameters - location {} token {} nva {} dirs {} path {} file {}",
        descriptor.location,
        descriptor.token,
        descriptor.nva,
        descriptor.dirs,
        descriptor.path,
        descriptor.file
    );

    render(state.engine.authorize(&descriptor, shape), shape)
}

fn render(decision: Decision, shape: RouteShape) -> Response {
    let geo_aware = matches!(shape, RouteShape::Geo | RouteShape::GeoIpBound);
    let mut headers = HeaderMap::new();

    match decision {
        Decision::InvalidTimestamp => {
            headers.insert(TIMESTAMP_STATUS, HeaderValue::from_static("Invalid"));
            headers.insert(TOKEN_STATUS, HeaderValue::from_static("Invalid"));
            (StatusCode::FORBIDDEN, headers).into_response()
        }
        Decision::GeoBlocked => {
            headers.insert(TIMESTAMP_STATUS, HeaderValue::from_static("Valid"));
            headers.insert(GEOIP_STATUS, HeaderValue::from_static("Banned"));
            headers.insert(TOKEN_STATUS, HeaderValue::from_static("Invalid"));
            (StatusCode::FORBIDDEN, headers).into_response()
        }
        Decision::InvalidToken => {
            headers.insert(TIMESTAMP_STATUS, HeaderValue::from_static("Valid"));
            if geo_aware {
                headers.insert(GEOIP_STATUS, HeaderValue::from_static("Valid"));
            }
            headers.insert(TOKEN_STATUS, HeaderValue::from_static("Invalid"));
            (StatusCode::FORBIDDEN, headers).into_response()
        }
        Decision::Valid { content_path } => {
            let Ok(path_value) = HeaderValue::from_str(&content_path) else {
                tracing::warn!("Content path {:?} not representable as a header", content_path);
                return reject_malformed();
            };
            headers.insert(TIMESTAMP_STATUS, HeaderValue::from_static("Valid"));
            if geo_aware {
                headers.insert(GEOIP_STATUS, HeaderValue::from_static("Valid"));
            }
            headers.insert(TOKEN_STATUS, HeaderValue::from_static("Valid"));
            headers.insert(TOKEN_PATH, path_value.clone());
            headers.insert(ORIGINAL_PATH, path_value);
            (StatusCode::OK, headers).into_response()
        }
    }
}

fn probe_response(allowed: bool) -> Response {
    let mut headers = HeaderMap::new();
    if allowed {
        headers.insert(GEOIP_STATUS, HeaderValue::from_static("Valid"));
        (StatusCode::OK, headers).into_response()
    } else {
        headers.insert(GEOIP_STATUS, HeaderValue::from_static("Banned"));
        (StatusCode::FORBIDDEN, headers).into_response()
    }
}

fn reject_malformed() -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(TOKEN_STATUS, HeaderValue::from_static("Invalid"));
    (StatusCode::FORBIDDEN, headers).into_response()
}
