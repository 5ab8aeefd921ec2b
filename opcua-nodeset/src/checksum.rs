use hashbrown::HashSet;
use sha2::{Digest, Sha256};

/// Compute the content fingerprint of a document: the lowercase hex SHA-256 of its
/// raw bytes. Any difference in content, including whitespace, gives a different
/// fingerprint.
pub fn checksum(content: &[u8]) -> String {
    let digest = Sha256::digest(content);
    format!("{digest:x}")
}

/// Check whether a fingerprint is among the known fingerprints. A missing fingerprint
/// is never a duplicate.
pub fn detect_duplicate(fingerprint: Option<&str>, known: &HashSet<String>) -> bool {
    fingerprint.is_some_and(|f| known.contains(f))
}
