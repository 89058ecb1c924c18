//! Schema fingerprints.
//!
//! A fingerprint is the first [`FINGERPRINT_LEN`] bytes of the SHA-256
//! digest of a schema's canonical form. It is the sole key of the
//! [`SchemaStore`](crate::SchemaStore) and travels in every message header.

use crate::error::SchemaError;
use crate::schema::Schema;
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Width of a fingerprint on the wire.
pub const FINGERPRINT_LEN: usize = 8;

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; FINGERPRINT_LEN]);

impl Fingerprint {
    /// Returns the fingerprint of `schema`. Cached on the schema after the
    /// first call.
    #[must_use]
    pub fn of(schema: &Schema) -> Self {
        schema.fingerprint()
    }

    /// Digests a canonical form directly.
    #[must_use]
    pub fn digest(canonical_form: &str) -> Self {
        let hash = Sha256::digest(canonical_form.as_bytes());
        let mut bytes = [0u8; FINGERPRINT_LEN];
        bytes.copy_from_slice(&hash[..FINGERPRINT_LEN]);
        Self(bytes)
    }

    #[must_use]
    pub const fn from_bytes(bytes: [u8; FINGERPRINT_LEN]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; FINGERPRINT_LEN] {
        &self.0
    }

    /// Parses a fingerprint from its hex form.
    pub fn parse(s: &str) -> Result<Self, SchemaError> {
        let raw = hex::decode(s).map_err(|e| SchemaError::InvalidFingerprint(e.to_string()))?;
        let bytes: [u8; FINGERPRINT_LEN] = raw.try_into().map_err(|raw: Vec<u8>| {
            SchemaError::InvalidFingerprint(format!(
                "expected {FINGERPRINT_LEN} bytes, got {}",
                raw.len()
            ))
        })?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({self})")
    }
}

impl FromStr for Fingerprint {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
