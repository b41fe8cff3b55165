//! Credential collaborators: password hashing and session tokens.
//!
//! The tree never depends on these directly; [`crate::AccountService`] uses
//! them at the registration and login boundary.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine as _;
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use spillover_core::{MemberCode, MemberId, TreeError};

/// One-way password hashing.
pub trait CredentialHasher: Send + Sync {
    fn hash(&self, password: &str) -> String;
    fn verify(&self, password: &str, stored: &str) -> bool;
}

/// Issues and checks bearer tokens.
pub trait TokenIssuer: Send + Sync {
    fn issue(&self, id: MemberId, member_code: &MemberCode) -> Result<String, TreeError>;
    fn verify(&self, token: &str) -> Result<Claims, TreeError>;
}

/// Token payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub id: MemberId,
    pub member_code: MemberCode,
    pub iat: i64,
    pub exp: i64,
}

/// Iterated, salted SHA-256. Stored as `sha256$<iterations>$<salt>$<digest>`.
pub struct SaltedSha256Hasher {
    iterations: u32,
}

impl SaltedSha256Hasher {
    pub const DEFAULT_ITERATIONS: u32 = 10_000;
    const SALT_LEN: usize = 16;

    pub fn new(iterations: u32) -> Self {
        Self {
            iterations: iterations.max(1),
        }
    }

    fn digest(salt: &[u8], password: &str, iterations: u32) -> Vec<u8> {
        let mut hash = Sha256::new()
            .chain_update(salt)
            .chain_update(password.as_bytes())
            .finalize()
            .to_vec();
        for _ in 1..iterations {
            hash = Sha256::new()
                .chain_update(&hash)
                .chain_update(salt)
                .finalize()
                .to_vec();
        }
        hash
    }
}

impl Default for SaltedSha256Hasher {
    fn default() -> Self {
        Self::new(Self::DEFAULT_ITERATIONS)
    }
}

impl CredentialHasher for SaltedSha256Hasher {
    fn hash(&self, password: &str) -> String {
        let mut salt = [0u8; Self::SALT_LEN];
        rand::thread_rng().fill_bytes(&mut salt);
        let digest = Self::digest(&salt, password, self.iterations);
        format!(
            "sha256${}${}${}",
            self.iterations,
            STANDARD_NO_PAD.encode(salt),
            STANDARD_NO_PAD.encode(digest)
        )
    }

    fn verify(&self, password: &str, stored: &str) -> bool {
        let mut parts = stored.split('$');
        let (Some("sha256"), Some(iterations), Some(salt), Some(expected), None) = (
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
        ) else {
            return false;
        };
        let Ok(iterations) = iterations.parse::<u32>() else {
            return false;
        };
        let (Ok(salt), Ok(expected)) = (STANDARD_NO_PAD.decode(salt), STANDARD_NO_PAD.decode(expected))
        else {
            return false;
        };
        let actual = Self::digest(&salt, password, iterations.max(1));
        actual.len() == expected.len()
            && actual.iter().zip(&expected).fold(0u8, |acc, (a, b)| acc | (a ^ b)) == 0
    }
}

/// HS256 JSON Web Tokens.
pub struct JwtIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl JwtIssuer {
    pub fn new(secret: &SecretString, ttl: Duration) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(bytes),
            decoding: DecodingKey::from_secret(bytes),
            ttl,
        }
    }
}

impl TokenIssuer for JwtIssuer {
    fn issue(&self, id: MemberId, member_code: &MemberCode) -> Result<String, TreeError> {
        let iat = Utc::now().timestamp();
        let ttl = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        let claims = Claims {
            id,
            member_code: member_code.clone(),
            iat,
            exp: iat.saturating_add(ttl),
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TreeError::Storage(format!("token signing: {e}")))
    }

    fn verify(&self, token: &str) -> Result<Claims, TreeError> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
            .map(|data| data.claims)
            .map_err(|_| TreeError::AuthFailure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer(secret: &str) -> JwtIssuer {
        JwtIssuer::new(&SecretString::from(secret.to_string()), Duration::from_secs(3600))
    }

    #[test]
    fn hash_verifies_and_is_salted() {
        let hasher = SaltedSha256Hasher::new(10);
        let a = hasher.hash("hunter2");
        let b = hasher.hash("hunter2");
        assert_ne!(a, b);
        assert!(a.starts_with("sha256$10$"));
        assert!(hasher.verify("hunter2", &a));
        assert!(hasher.verify("hunter2", &b));
        assert!(!hasher.verify("hunter3", &a));
    }

    #[test]
    fn verify_rejects_malformed() {
        let hasher = SaltedSha256Hasher::new(10);
        assert!(!hasher.verify("x", ""));
        assert!(!hasher.verify("x", "$2b$10$bcryptstyle"));
        assert!(!hasher.verify("x", "sha256$abc$AAAA$AAAA"));
        assert!(!hasher.verify("x", "sha256$10$!!$AAAA"));
    }

    #[test]
    fn stored_iterations_win_over_configured() {
        let stored = SaltedSha256Hasher::new(5).hash("pw");
        assert!(SaltedSha256Hasher::new(50).verify("pw", &stored));
    }

    #[test]
    fn token_roundtrip() {
        let jwt = issuer("secret");
        let code = MemberCode::from_raw("MEM1");
        let token = jwt.issue(MemberId::from_raw(1), &code).unwrap();
        let claims = jwt.verify(&token).unwrap();
        assert_eq!(claims.id, MemberId::from_raw(1));
        assert_eq!(claims.member_code, code);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn token_from_other_secret_is_rejected() {
        let token = issuer("one")
            .issue(MemberId::from_raw(1), &MemberCode::from_raw("MEM1"))
            .unwrap();
        assert_eq!(issuer("two").verify(&token), Err(TreeError::AuthFailure));
        assert_eq!(issuer("one").verify("garbage"), Err(TreeError::AuthFailure));
    }
}
