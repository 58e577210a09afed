//! End-to-end tests for the secure-link routes: expired links, valid links,
//! tampered tokens, IP binding, and malformed requests.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use hmac::{Hmac, Mac};
use sha1::Sha1;
use tokio::net::TcpListener;

use seclink_server::clock::SystemClock;
use seclink_server::decision::DecisionEngine;
use seclink_server::geo::GeoValidator;
use seclink_server::routes;
use seclink_server::secrets::{GeoBlacklistTable, SecretTable};
use seclink_server::state::AppState;
use seclink_server::token::TokenCalculator;

const SECRET: &str = "H3ll0!S3c&8";
const LOCATION: &str = "lbcgrouplive";

/// Helper: start the server on a random port and return the base URL.
async fn start_test_server() -> String {
    let clock = Arc::new(SystemClock);

    let mut secrets = HashMap::new();
    secrets.insert(LOCATION.to_string(), SECRET.to_string());
    let secrets = Arc::new(SecretTable::new("my-secret".to_string(), secrets));
    let blacklists = Arc::new(GeoBlacklistTable::new(Vec::new(), HashMap::new()));

    let engine = DecisionEngine::new(
        TokenCalculator::new(secrets, 60, clock.clone()),
        GeoValidator::new(blacklists, None, 60, clock.clone()),
        clock,
    );

    let app = routes::build_router(AppState {
        engine: Arc::new(engine),
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    format!("http://{}", addr)
}

/// Compute a link token client-side, the way an issuing CDN would.
fn sign(path: &str, nva: i64, dirs: u32, ip: Option<&str>) -> String {
    let line = match ip {
        Some(ip) => format!("/{}/?nva={}&ip={}&dirs={}", path, nva, ip, dirs),
        None => format!("/{}/?nva={}&dirs={}", path, nva, dirs),
    };
    let mut mac =
        Hmac::<Sha1>::new_from_slice(SECRET.as_bytes()).expect("HMAC accepts any key length");
    mac.update(line.as_bytes());
    let mut digest = hex::encode(mac.finalize().into_bytes());
    digest.truncate(20);
    digest
}

fn future_nva() -> i64 {
    chrono::Utc::now().timestamp() + 3600
}

fn link_url(base: &str, nva: i64, token: &str) -> String {
    format!(
        "{}/{}/token=nva={}~dirs=1~hash=0{}/lbclive.smil/playlist.m3u8",
        base, LOCATION, nva, token
    )
}

fn header<'a>(resp: &'a reqwest::Response, name: &str) -> &'a str {
    resp.headers()
        .get(name)
        .map(|v| v.to_str().unwrap())
        .unwrap_or("")
}

#[tokio::test]
async fn expired_link_is_rejected() {
    let base = start_test_server().await;
    let client = reqwest::Client::new();

    // nva from 2018; token is correctly signed but the link has lapsed
    let resp = client
        .get(link_url(&base, 1538337566, "04acb40fa3d37b94fdcd"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 403);
    assert_eq!(header(&resp, "X-Auth-Timestamp-Status"), "Invalid");
    assert_eq!(header(&resp, "X-Auth-Token-Status"), "Invalid");
}

#[tokio::test]
async fn valid_link_passes_with_path_headers() {
    let base = start_test_server().await;
    let client = reqwest::Client::new();

    let nva = future_nva();
    let token = sign("lbclive.smil", nva, 1, None);
    let resp = client.get(link_url(&base, nva, &token)).send().await.unwrap();

    assert_eq!(resp.status(), 200);
    assert_eq!(header(&resp, "X-Auth-Token-Status"), "Valid");
    assert_eq!(header(&resp, "X-Auth-Timestamp-Status"), "Valid");
    assert_eq!(
        header(&resp, "X-Auth-Token-Path"),
        "lbclive.smil/playlist.m3u8"
    );
    assert_eq!(
        header(&resp, "X-Auth-Original-Path"),
        "lbclive.smil/playlist.m3u8"
    );
}

#[tokio::test]
async fn tampered_token_is_rejected() {
    let base = start_test_server().await;
    let client = reqwest::Client::new();

    let nva = future_nva();
    let mut token = sign("lbclive.smil", nva, 1, None);
    // Flip the first character
    let flipped = if token.starts_with('0') { "1" } else { "0" };
    token.replace_range(0..1, flipped);

    let resp = client.get(link_url(&base, nva, &token)).send().await.unwrap();

    assert_eq!(resp.status(), 403);
    assert_eq!(header(&resp, "X-Auth-Timestamp-Status"), "Valid");
    assert_eq!(header(&resp, "X-Auth-Token-Status"), "Invalid");
}

#[tokio::test]
async fn ip_bound_link_verifies_against_the_connection_address() {
    let base = start_test_server().await;
    let client = reqwest::Client::new();

    // The test client connects from 127.0.0.1
    let nva = future_nva();
    let token = sign("lbclive.smil", nva, 1, Some("127.0.0.1"));
    let url = format!(
        "{}/ip/{}/token=nva={}~dirs=1~hash=0{}/lbclive.smil/playlist.m3u8",
        base, LOCATION, nva, token
    );
    let resp = client.get(&url).send().await.unwrap();
    assert_eq!(resp.status(), 200);

    // A token signed without the address must not verify on the IP route
    let unbound = sign("lbclive.smil", nva, 1, None);
    let url = format!(
        "{}/ip/{}/token=nva={}~dirs=1~hash=0{}/lbclive.smil/playlist.m3u8",
        base, LOCATION, nva, unbound
    );
    let resp = client.get(&url).send().await.unwrap();
    assert_eq!(resp.status(), 403);
}

#[tokio::test]
async fn dirs_is_signed_not_recomputed() {
    let base = start_test_server().await;
    let client = reqwest::Client::new();

    // dirs=3 does not match the single path segment; the field is taken at
    // face value on both sides, so the link still verifies
    let nva = future_nva();
    let token = sign("lbclive.smil", nva, 3, None);
    let url = format!(
        "{}/{}/token=nva={}~dirs=3~hash=0{}/lbclive.smil/playlist.m3u8",
        base, LOCATION, nva, token
    );
    let resp = client.get(&url).send().await.unwrap();
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn malformed_requests_get_403_not_500() {
    let base = start_test_server().await;
    let client = reqwest::Client::new();

    for url in [
        format!("{}/", base),
        // Non-numeric nva
        format!(
            "{}/{}/token=nva=soon~dirs=1~hash=0abc/lbclive.smil/playlist.m3u8",
            base, LOCATION
        ),
        // Missing the literal 0 marker before the hash
        format!(
            "{}/{}/token=nva={}~dirs=1~hash=abc/lbclive.smil/playlist.m3u8",
            base,
            LOCATION,
            future_nva()
        ),
        // No file segment after the path
        format!(
            "{}/{}/token=nva={}~dirs=1~hash=0abc/playlist.m3u8",
            base,
            LOCATION,
            future_nva()
        ),
    ] {
        let resp = client.get(&url).send().await.unwrap();
        assert_eq!(resp.status(), 403, "expected 403 for {}", url);
        assert_eq!(header(&resp, "X-Auth-Token-Status"), "Invalid");
    }
}

#[tokio::test]
async fn unknown_location_falls_back_to_the_default_secret() {
    let base = start_test_server().await;
    let client = reqwest::Client::new();

    let nva = future_nva();
    let mut mac =
        Hmac::<Sha1>::new_from_slice(b"my-secret").expect("HMAC accepts any key length");
    mac.update(format!("/lbclive.smil/?nva={}&dirs=1", nva).as_bytes());
    let mut token = hex::encode(mac.finalize().into_bytes());
    token.truncate(20);

    let url = format!(
        "{}/otherlocation/token=nva={}~dirs=1~hash=0{}/lbclive.smil/playlist.m3u8",
        base, nva, token
    );
    let resp = client.get(&url).send().await.unwrap();
    assert_eq!(resp.status(), 200);
}
