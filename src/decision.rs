use std::sync::Arc;

use crate::clock::Clock;
use crate::geo::GeoValidator;
use crate::link::LinkDescriptor;
use crate::token::{TokenCalculator, TokenKey};

/// Terminal outcome of an authorization request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Valid { content_path: String },
    InvalidTimestamp,
    InvalidToken,
    GeoBlocked,
}

/// Which optional checks a route runs. The token of an IP-bound shape is
/// computed over a canonical string that includes the client address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteShape {
    Plain,
    IpBound,
    Geo,
    GeoIpBound,
}

impl RouteShape {
    fn checks_geo(self) -> bool {
        matches!(self, RouteShape::Geo | RouteShape::GeoIpBound)
    }

    fn binds_ip(self) -> bool {
        matches!(self, RouteShape::IpBound | RouteShape::GeoIpBound)
    }
}

/// Orchestrates timestamp, geo, and token validation into a `Decision`.
/// Checks run in strict order and short-circuit: a later check never runs
/// once an earlier one has failed.
pub struct DecisionEngine {
    tokens: TokenCalculator,
    geo: GeoValidator,
    clock: Arc<dyn Clock>,
}

impl DecisionEngine {
    pub fn new(tokens: TokenCalculator, geo: GeoValidator, clock: Arc<dyn Clock>) -> Self {
        Self {
            tokens,
            geo,
            clock,
        }
    }

    /// The link's `nva` is a not-valid-after bound: the request must still
    /// be strictly before it. A timestamp equal to the current second is
    /// already expired.
    pub fn is_not_expired(&self, nva: i64) -> bool {
        let now = self.clock.now_unix();
        tracing::debug!("Validating timestamp - now {} nva {}", now, nva);
        now < nva
    }

    pub fn authorize(&self, link: &LinkDescriptor, shape: RouteShape) -> Decision {
        if !self.is_not_expired(link.nva) {
            tracing::warn!("Timestamp {} is invalid", link.nva);
            return Decision::InvalidTimestamp;
        }

        if shape.checks_geo() && !self.geo.is_allowed(&link.client_ip, &link.location) {
            return Decision::GeoBlocked;
        }

        let key = TokenKey {
            location: link.location.clone(),
            nva: link.nva,
            dirs: link.dirs,
            path: link.path.clone(),
            ip: shape.binds_ip().then(|| link.client_ip.clone()),
        };
        if !self.tokens.is_valid(&link.token, &key) {
            tracing::warn!("Token {} is invalid", link.token);
            return Decision::InvalidToken;
        }

        Decision::Valid {
            content_path: format!("{}/{}", link.path, link.file),
        }
    }

    /// Standalone geo check for the operational probe routes.
    pub fn probe_geo(&self, client_ip: &str, location: &str) -> bool {
        self.geo.is_allowed(client_ip, location)
    }
}
