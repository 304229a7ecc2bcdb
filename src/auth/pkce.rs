//! PKCE (RFC 7636) verifier and challenge generation.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::Rng;
use sha2::{Digest, Sha256};

/// Alphabet the verifier is drawn from.
const VERIFIER_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Default verifier length.
pub const VERIFIER_LENGTH: usize = 128;

/// PKCE code verifier and challenge pair.
#[derive(Debug)]
pub struct PkceChallenge {
    /// The code verifier (persisted locally, sent in the token exchange).
    pub verifier: String,
    /// The code challenge (SHA256 hash of the verifier, sent in the auth request).
    pub challenge: String,
}

impl PkceChallenge {
    /// Generate a new PKCE challenge pair.
    ///
    /// The caller is responsible for persisting the verifier until the
    /// token exchange consumes it.
    pub fn new() -> Self {
        let verifier = generate_verifier(VERIFIER_LENGTH);
        let challenge = derive_challenge(&verifier);

        Self {
            verifier,
            challenge,
        }
    }
}

impl Default for PkceChallenge {
    fn default() -> Self {
        Self::new()
    }
}

/// Generate a random verifier of `length` alphanumeric characters.
///
/// `thread_rng` is a CSPRNG; each drawn value is mapped modulo the
/// 62-character alphabet.
pub fn generate_verifier(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| {
            let value: u32 = rng.gen();
            VERIFIER_ALPHABET[value as usize % VERIFIER_ALPHABET.len()] as char
        })
        .collect()
}

/// Derive the code challenge: BASE64URL(SHA256(verifier)), no padding.
pub fn derive_challenge(verifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(verifier.as_bytes());
    let hash = hasher.finalize();
    URL_SAFE_NO_PAD.encode(hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verifier_length_and_alphabet() {
        for length in [1, 43, 128] {
            let verifier = generate_verifier(length);
            assert_eq!(verifier.len(), length);
            assert!(verifier.bytes().all(|b| VERIFIER_ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn test_challenge_deterministic() {
        let verifier = generate_verifier(128);
        assert_eq!(derive_challenge(&verifier), derive_challenge(&verifier));
    }

    #[test]
    fn test_challenge_is_base64url() {
        let challenge = derive_challenge(&generate_verifier(128));
        assert!(!challenge.contains('+'));
        assert!(!challenge.contains('/'));
        assert!(!challenge.contains('='));
        // SHA-256 digest is 32 bytes, 43 characters unpadded
        assert_eq!(challenge.len(), 43);
    }

    #[test]
    fn test_challenge_known_vector() {
        // RFC 7636 appendix B
        assert_eq!(
            derive_challenge("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }

    #[test]
    fn test_pair_generation() {
        let pkce = PkceChallenge::new();
        assert_eq!(pkce.verifier.len(), VERIFIER_LENGTH);
        assert_eq!(pkce.challenge, derive_challenge(&pkce.verifier));
        assert_ne!(pkce.verifier, pkce.challenge);
    }
}
