use std::fmt;
use std::str::FromStr;

use filament_verify::{Hasher, Sha256Hasher};
use serde::{Deserialize, Serialize};

use crate::Error;

const SHORT_LEN: usize = 8;

/// Identity of a cache slot.
///
/// Derived from the source URL plus any explicit name/extension override, so two requests
/// that would materialize different files never share a slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn derive(url: &str, name: Option<&str>, extension: Option<&str>) -> Self {
        let mut hasher = Sha256Hasher::new();
        write_field(&mut hasher, Some(url));
        write_field(&mut hasher, name);
        write_field(&mut hasher, extension);
        CacheKey(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str { &self.0 }

    /// Leading hex characters, used to disambiguate colliding file names.
    pub fn short(&self) -> &str { &self.0[..SHORT_LEN.min(self.0.len())] }
}

fn write_field(hasher: &mut Sha256Hasher, field: Option<&str>) {
    match field {
        Some(value) => {
            hasher.update(&[1]);
            hasher.update(&(value.len() as u64).to_le_bytes());
            hasher.update(value.as_bytes());
        }
        None => hasher.update(&[0]),
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl FromStr for CacheKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.len() != 64 || !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::InvalidKey(s.to_string()));
        }
        Ok(CacheKey(s.to_ascii_lowercase()))
    }
}
