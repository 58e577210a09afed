use std::sync::Arc;

use hmac::{Hmac, Mac};
use sha1::Sha1;
use subtle::ConstantTimeEq;

use crate::cache::TtlCache;
use crate::clock::Clock;
use crate::secrets::SecretTable;

type HmacSha1 = Hmac<Sha1>;

/// Number of hex characters of the HMAC-SHA1 digest carried in links.
pub const TOKEN_LEN: usize = 20;

/// Build the exact byte string that is signed. Field order and punctuation
/// are a wire contract shared with externally generated links; any change
/// invalidates every previously issued link.
///
/// - without IP: `/{path}/?nva={nva}&dirs={dirs}`
/// - with IP:    `/{path}/?nva={nva}&ip={ip}&dirs={dirs}`
pub fn canonical_string(path: &str, nva: i64, dirs: u32, ip: Option<&str>) -> String {
    match ip {
        Some(ip) => format!("/{}/?nva={}&ip={}&dirs={}", path, nva, ip, dirs),
        None => format!("/{}/?nva={}&dirs={}", path, nva, dirs),
    }
}

/// Full argument tuple of a token computation; cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TokenKey {
    pub location: String,
    pub nva: i64,
    pub dirs: u32,
    pub path: String,
    pub ip: Option<String>,
}

/// Computes and caches the expected link token for a request.
pub struct TokenCalculator {
    secrets: Arc<SecretTable>,
    cache: TtlCache<TokenKey, String>,
}

impl TokenCalculator {
    pub fn new(secrets: Arc<SecretTable>, ttl_secs: i64, clock: Arc<dyn Clock>) -> Self {
        Self {
            secrets,
            cache: TtlCache::new(ttl_secs, clock),
        }
    }

    /// HMAC-SHA1 over the canonical string keyed with the location's
    /// secret, rendered as lowercase hex and truncated to `TOKEN_LEN`
    /// characters. Cached; the cache is a pure performance layer since
    /// secrets are immutable for the life of the process.
    pub fn calculate(&self, key: &TokenKey) -> String {
        self.cache.get_or_compute(key.clone(), || {
            let line = canonical_string(&key.path, key.nva, key.dirs, key.ip.as_deref());
            tracing::debug!("Calculating token of {}", line);

            let mut mac = HmacSha1::new_from_slice(self.secrets.secret_for(&key.location))
                .expect("HMAC accepts any key length");
            mac.update(line.as_bytes());
            let mut digest = hex::encode(mac.finalize().into_bytes());
            digest.truncate(TOKEN_LEN);
            digest
        })
    }

    /// Constant-time comparison of the supplied token against the expected
    /// one, over the first `TOKEN_LEN` characters. A supplied token shorter
    /// than that is a plain mismatch; trailing characters are ignored.
    pub fn is_valid(&self, supplied: &str, key: &TokenKey) -> bool {
        let expected = self.calculate(key);
        tracing::debug!(
            "Validating token - expected {} nva {} dirs {} path {}",
            expected,
            key.nva,
            key.dirs,
            key.path
        );

        let supplied = supplied.as_bytes();
        if supplied.len() < TOKEN_LEN {
            return false;
        }
        bool::from(expected.as_bytes().ct_eq(&supplied[..TOKEN_LEN]))
    }
}
