use std::net::IpAddr;
use std::path::Path;
use std::sync::Arc;

use maxminddb::{geoip2, MaxMindDBError, Reader};

use crate::cache::TtlCache;
use crate::clock::Clock;
use crate::secrets::GeoBlacklistTable;

/// Resolves an IP address to an ISO-3166 country code.
/// A seam so tests can substitute a fixed mapping for the MaxMind reader.
pub trait CountryLookup: Send + Sync + 'static {
    fn country_code(&self, ip: IpAddr) -> Result<Option<String>, MaxMindDBError>;
}

/// Country lookup backed by a MaxMind GeoLite2/GeoIP2 database.
pub struct MaxmindLookup {
    reader: Reader<Vec<u8>>,
}

impl MaxmindLookup {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, MaxMindDBError> {
        let reader = Reader::open_readfile(path)?;
        Ok(Self { reader })
    }
}

impl CountryLookup for MaxmindLookup {
    fn country_code(&self, ip: IpAddr) -> Result<Option<String>, MaxMindDBError> {
        let record: geoip2::Country = self.reader.lookup(ip)?;
        Ok(record
            .country
            .and_then(|c| c.iso_code)
            .map(str::to_owned))
    }
}

/// Country-blacklist check for a client address, cached per
/// `(address, location)` since database lookups are comparatively
/// expensive. On any lookup failure the check fails open: availability is
/// prioritized over blocking on infrastructure error.
pub struct GeoValidator {
    blacklists: Arc<GeoBlacklistTable>,
    lookup: Option<Arc<dyn CountryLookup>>,
    cache: TtlCache<(String, String), bool>,
}

impl GeoValidator {
    pub fn new(
        blacklists: Arc<GeoBlacklistTable>,
        lookup: Option<Arc<dyn CountryLookup>>,
        ttl_secs: i64,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            blacklists,
            lookup,
            cache: TtlCache::new(ttl_secs, clock),
        }
    }

    /// True if `client_ip` may reach content under `location`.
    ///
    /// Loopback addresses always pass (operator self-check). An empty
    /// resolved blacklist means no restriction. Unparsable addresses,
    /// a missing database, and lookup errors all pass after logging.
    pub fn is_allowed(&self, client_ip: &str, location: &str) -> bool {
        if let Ok(addr) = client_ip.parse::<IpAddr>() {
            if addr.is_loopback() {
                tracing::debug!("Loopback address {}, skipping geo check", client_ip);
                return true;
            }
        }

        let blacklist = self.blacklists.blacklist_for(location);
        if blacklist.is_empty() {
            return true;
        }

        self.cache.get_or_compute(
            (client_ip.to_string(), location.to_string()),
            || self.check_country(client_ip, location),
        )
    }

    fn check_country(&self, client_ip: &str, location: &str) -> bool {
        let addr: IpAddr = match client_ip.parse() {
            Ok(addr) => addr,
            Err(e) => {
                tracing::warn!("Unparsable client address {}: {}, allowing", client_ip, e);
                return true;
            }
        };

        let lookup = match &self.lookup {
            Some(lookup) => lookup,
            None => {
                tracing::warn!("Geo database unavailable, allowing {}", client_ip);
                return true;
            }
        };

        match lookup.country_code(addr) {
            Ok(Some(code)) => {
                let banned = self
                    .blacklists
                    .blacklist_for(location)
                    .iter()
                    .any(|c| c.eq_ignore_ascii_case(&code));
                if banned {
                    tracing::warn!(
                        "Address {} resolves to banned country {} for location {}",
                        client_ip,
                        code,
                        location
                    );
                }
                !banned
            }
            Ok(None) => {
                tracing::debug!("No country record for {}, allowing", client_ip);
                true
            }
            Err(e) => {
                tracing::warn!("Geo lookup failed for {}: {}, allowing", client_ip, e);
                true
            }
        }
    }
}
