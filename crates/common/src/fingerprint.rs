//! Certificate fingerprinting.
//!
//! Both the keychain reader and the provisioning-profile parser fingerprint
//! certificates with this helper, so the two sides compare equal.

use sha2::{Digest, Sha256};

/// Compute the lowercase hex SHA-256 fingerprint of a DER-encoded certificate.
pub fn certificate_fingerprint(der: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(der);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_stable() {
        let fp = certificate_fingerprint(b"hello world");
        assert_eq!(
            fp,
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
        assert_eq!(fp, certificate_fingerprint(b"hello world"));
    }

    #[test]
    fn test_fingerprint_distinguishes_inputs() {
        assert_ne!(
            certificate_fingerprint(b"cert-a"),
            certificate_fingerprint(b"cert-b")
        );
    }
}
