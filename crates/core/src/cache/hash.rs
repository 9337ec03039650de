//! Request fingerprints for the API result cache.

use sha2::{Digest, Sha256};

/// Compute a stable cache key for a request.
///
/// Query pairs are sorted first, so parameter order does not matter.
pub fn fingerprint(method: &str, path: &str, query: &[(String, String)]) -> String {
    let mut pairs: Vec<&(String, String)> = query.iter().collect();
    pairs.sort();

    let mut hasher = Sha256::new();
    hasher.update(method.to_ascii_uppercase().as_bytes());
    hasher.update(b"\n");
    hasher.update(path.as_bytes());
    for (name, value) in pairs {
        hasher.update(b"\n");
        hasher.update(name.as_bytes());
        hasher.update(b"=");
        hasher.update(value.as_bytes());
    }
    hex::encode(hasher.finalize())
}
