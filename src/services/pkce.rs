// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! PKCE (Proof Key for Code Exchange) parameters.
//!
//! One context is generated per process lifetime at auth-service
//! construction, used exactly once during interactive authorization, and
//! never persisted.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::Rng;
use sha2::{Digest, Sha256};

/// PKCE verifier/challenge pair plus the anti-CSRF `state` token.
#[derive(Debug, Clone)]
pub struct PkceContext {
    /// Random verifier, sent in the token exchange. 64 random bytes encode
    /// to 86 characters, within the RFC 7636 [43, 128] bounds.
    pub verifier: String,
    /// base64url(SHA-256(verifier)) without padding, embedded in the
    /// authorization URL.
    pub challenge: String,
    /// Opaque anti-CSRF token, verified against the callback URL.
    pub state: String,
}

impl PkceContext {
    pub fn generate() -> Self {
        let mut verifier_bytes = [0u8; 64];
        rand::rng().fill(&mut verifier_bytes[..]);
        let verifier = URL_SAFE_NO_PAD.encode(verifier_bytes);

        let mut state_bytes = [0u8; 32];
        rand::rng().fill(&mut state_bytes[..]);
        let state = URL_SAFE_NO_PAD.encode(state_bytes);

        let challenge = challenge_for(&verifier);

        Self {
            verifier,
            challenge,
            state,
        }
    }
}

/// S256 challenge for a verifier.
fn challenge_for(verifier: &str) -> String {
    let digest = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verifier_length_in_rfc_bounds() {
        let pkce = PkceContext::generate();
        assert!(pkce.verifier.len() >= 43);
        assert!(pkce.verifier.len() <= 128);
    }

    #[test]
    fn test_challenge_matches_rfc7636_vector() {
        // Appendix B of RFC 7636.
        assert_eq!(
            challenge_for("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }

    #[test]
    fn test_no_base64_padding() {
        let pkce = PkceContext::generate();
        assert!(!pkce.verifier.contains('='));
        assert!(!pkce.challenge.contains('='));
        assert!(!pkce.state.contains('='));
    }

    #[test]
    fn test_contexts_are_unique() {
        let a = PkceContext::generate();
        let b = PkceContext::generate();
        assert_ne!(a.verifier, b.verifier);
        assert_ne!(a.state, b.state);
    }
}
