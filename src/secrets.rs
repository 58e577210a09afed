use std::collections::HashMap;

/// Per-location signing secrets with a process-wide default.
/// Loaded once from config and immutable afterwards; lookups never fail.
pub struct SecretTable {
    default: String,
    per_location: HashMap<String, String>,
}

impl SecretTable {
    pub fn new(default: String, per_location: HashMap<String, String>) -> Self {
        Self {
            default,
            per_location,
        }
    }

    /// Resolve the signing secret for a location, falling back to the
    /// default for unknown locations.
    pub fn secret_for(&self, location: &str) -> &[u8] {
        match self.per_location.get(location) {
            Some(secret) => {
                tracing::debug!("Found secret for location {}", location);
                secret.as_bytes()
            }
            None => {
                tracing::debug!("Using default secret for location {}", location);
                self.default.as_bytes()
            }
        }
    }
}

/// Per-location banned-country lists with a process-wide default.
/// Country codes are normalized to uppercase ASCII at load time.
pub struct GeoBlacklistTable {
    default: Vec<String>,
    per_location: HashMap<String, Vec<String>>,
}

impl GeoBlacklistTable {
    pub fn new(default: Vec<String>, per_location: HashMap<String, Vec<String>>) -> Self {
        let normalize = |codes: Vec<String>| -> Vec<String> {
            codes.into_iter().map(|c| c.to_ascii_uppercase()).collect()
        };
        Self {
            default: normalize(default),
            per_location: per_location
                .into_iter()
                .map(|(loc, codes)| (loc, normalize(codes)))
                .collect(),
        }
    }

    /// Resolve the banned-country list for a location (possibly empty),
    /// falling back to the default for unknown locations.
    pub fn blacklist_for(&self, location: &str) -> &[String] {
        self.per_location
            .get(location)
            .map(Vec::as_slice)
            .unwrap_or(&self.default)
    }
}
