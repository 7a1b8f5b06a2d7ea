use crate::domain::auth::Claims;
use crate::error::SessionError;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

const HMAC_ALGORITHMS: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

#[derive(Deserialize)]
struct RawHeader {
    alg: String,
}

/// Signs and verifies `header.payload.signature` tokens with a shared HMAC secret.
///
/// Expiry is not checked here; see `SessionService`.
#[derive(Clone)]
pub struct TokenSigner {
    encoding_key: Arc<EncodingKey>,
    decoding_key: Arc<DecodingKey>,
    validation: Arc<Validation>,
}

impl fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSigner").finish_non_exhaustive()
    }
}

impl TokenSigner {
    #[must_use]
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = HMAC_ALGORITHMS.to_vec();
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        Self {
            encoding_key: Arc::new(EncodingKey::from_secret(secret)),
            decoding_key: Arc::new(DecodingKey::from_secret(secret)),
            validation: Arc::new(validation),
        }
    }

    /// Signs `claims` with HS256.
    ///
    /// # Errors
    /// Returns `SessionError::Signing` if the claims cannot be serialized.
    pub fn sign(&self, claims: &Claims) -> Result<String, SessionError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key).map_err(|e| {
            tracing::error!(error = %e, "Failed to encode token");
            SessionError::Signing
        })
    }

    /// Checks the token's structure, algorithm and signature and returns its claims.
    ///
    /// # Errors
    /// - `MalformedToken` for anything that is not three decodable segments
    ///   carrying a well-formed header and payload.
    /// - `UnsupportedAlgorithm` when the header names a non-HMAC algorithm.
    /// - `InvalidSignature` when the signature is undecodable or does not match.
    pub fn verify(&self, token: &str) -> Result<Claims, SessionError> {
        let token = token.trim();
        let mut segments = token.split('.');
        let (Some(header), Some(payload), Some(signature), None) =
            (segments.next(), segments.next(), segments.next(), segments.next())
        else {
            return Err(SessionError::MalformedToken);
        };

        let header = URL_SAFE_NO_PAD.decode(header).map_err(|_| SessionError::MalformedToken)?;
        let header: RawHeader = serde_json::from_slice(&header).map_err(|_| SessionError::MalformedToken)?;
        let is_hmac = Algorithm::from_str(&header.alg).is_ok_and(|alg| HMAC_ALGORITHMS.contains(&alg));
        if !is_hmac {
            return Err(SessionError::UnsupportedAlgorithm(header.alg));
        }

        URL_SAFE_NO_PAD.decode(payload).map_err(|_| SessionError::MalformedToken)?;
        URL_SAFE_NO_PAD.decode(signature).map_err(|_| SessionError::InvalidSignature)?;

        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => SessionError::InvalidSignature,
                ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
                    SessionError::UnsupportedAlgorithm(header.alg.clone())
                }
                _ => SessionError::MalformedToken,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::session::Session;
    use time::{Duration, OffsetDateTime};
    use uuid::Uuid;

    fn claims() -> Claims {
        let session = Session::new("jane@example.com", Uuid::new_v4(), "https://shop.example.com");
        let now = OffsetDateTime::now_utc();
        Claims::new(&session, "token-id".into(), now, now + Duration::hours(1))
    }

    fn forge(header: &serde_json::Value, payload: &[u8], signature: &str) -> String {
        format!(
            "{}.{}.{signature}",
            URL_SAFE_NO_PAD.encode(header.to_string()),
            URL_SAFE_NO_PAD.encode(payload)
        )
    }

    #[test]
    fn test_sign_verify_roundtrip() {
        let signer = TokenSigner::new(b"test_secret");
        let claims = claims();

        let token = signer.sign(&claims).unwrap();
        assert_eq!(token.split('.').count(), 3);
        assert_eq!(signer.verify(&token).unwrap(), claims);
    }

    #[test]
    fn test_signing_is_deterministic() {
        let signer = TokenSigner::new(b"test_secret");
        let claims = claims();
        assert_eq!(signer.sign(&claims).unwrap(), signer.sign(&claims).unwrap());
    }

    #[test]
    fn test_wrong_secret() {
        let token = TokenSigner::new(b"secret1").sign(&claims()).unwrap();
        let result = TokenSigner::new(b"secret2").verify(&token);
        assert_eq!(result, Err(SessionError::InvalidSignature));
    }

    #[test]
    fn test_every_signature_byte_is_checked() {
        let signer = TokenSigner::new(b"test_secret");
        let token = signer.sign(&claims()).unwrap();
        let sig_start = token.rfind('.').unwrap() + 1;

        for i in sig_start..token.len() {
            let mut bytes = token.clone().into_bytes();
            bytes[i] = if bytes[i] == b'A' { b'B' } else { b'A' };
            let tampered = String::from_utf8(bytes).unwrap();

            assert_eq!(signer.verify(&tampered), Err(SessionError::InvalidSignature), "byte {i}");
        }
    }

    #[test]
    fn test_tampered_payload() {
        let signer = TokenSigner::new(b"test_secret");
        let token = signer.sign(&claims()).unwrap();
        let parts: Vec<&str> = token.split('.').collect();

        let mut forged = claims();
        forged.email = "mallory@example.com".into();
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged).unwrap());
        let tampered = format!("{}.{payload}.{}", parts[0], parts[2]);

        assert_eq!(signer.verify(&tampered), Err(SessionError::InvalidSignature));
    }

    #[test]
    fn test_malformed_structure() {
        let signer = TokenSigner::new(b"test_secret");
        for token in ["", "   ", "abc", "a.b", "a.b.c.d", "!!!.???.###"] {
            assert_eq!(signer.verify(token), Err(SessionError::MalformedToken), "{token:?}");
        }
    }

    #[test]
    fn test_none_algorithm_rejected() {
        let signer = TokenSigner::new(b"test_secret");
        let payload = serde_json::to_vec(&claims()).unwrap();
        let token = forge(&serde_json::json!({"alg": "none", "typ": "JWT"}), &payload, "");

        assert_eq!(signer.verify(&token), Err(SessionError::UnsupportedAlgorithm("none".into())));
    }

    #[test]
    fn test_asymmetric_algorithm_rejected() {
        let signer = TokenSigner::new(b"test_secret");
        let payload = serde_json::to_vec(&claims()).unwrap();
        let token = forge(&serde_json::json!({"alg": "RS256", "typ": "JWT"}), &payload, "c2ln");

        assert_eq!(signer.verify(&token), Err(SessionError::UnsupportedAlgorithm("RS256".into())));
    }

    #[test]
    fn test_other_hmac_variant_accepted() {
        let signer = TokenSigner::new(b"test_secret");
        let claims = claims();
        let token = encode(&Header::new(Algorithm::HS512), &claims, &EncodingKey::from_secret(b"test_secret")).unwrap();

        assert_eq!(signer.verify(&token).unwrap(), claims);
    }

    #[test]
    fn test_incomplete_payload_is_malformed() {
        let signer = TokenSigner::new(b"test_secret");
        let partial = serde_json::json!({ "sub": "jane@example.com", "exp": 4_000_000_000_i64 });
        let token = encode(&Header::new(Algorithm::HS256), &partial, &EncodingKey::from_secret(b"test_secret")).unwrap();

        assert_eq!(signer.verify(&token), Err(SessionError::MalformedToken));
    }

    #[test]
    fn test_expired_claims_still_verify() {
        let signer = TokenSigner::new(b"test_secret");
        let mut claims = claims();
        claims.exp = OffsetDateTime::now_utc().unix_timestamp() - 60;

        let token = signer.sign(&claims).unwrap();
        assert_eq!(signer.verify(&token).unwrap(), claims);
    }
}
