//! Signed Token Envelope
//! Mission: Wrap a flat claims record in a compact JWT and open it again
//!
//! Expiry is left to the claim types; this layer only answers "is it well formed"
//! and "was it signed with our key".

use crate::auth::errors::AuthError;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{de::DeserializeOwned, Serialize};

/// Signing strategy behind the envelope
pub trait TokenSigner: Send + Sync {
    /// Written to the header and the only algorithm accepted on decode
    fn algorithm(&self) -> Algorithm;

    fn encoding_key(&self) -> &EncodingKey;

    fn decoding_key(&self) -> &DecodingKey;
}

/// Symmetric HMAC-SHA256 (`HS256`)
pub struct HmacSha256Signer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl HmacSha256Signer {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        let secret = secret.as_ref();
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
        }
    }
}

impl TokenSigner for HmacSha256Signer {
    fn algorithm(&self) -> Algorithm {
        Algorithm::HS256
    }

    fn encoding_key(&self) -> &EncodingKey {
        &self.encoding_key
    }

    fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }
}

/// Serialize `claims` and sign them into a compact token string
pub fn seal<C: Serialize>(signer: &dyn TokenSigner, claims: &C) -> Result<String, AuthError> {
    encode(&Header::new(signer.algorithm()), claims, signer.encoding_key())
        .map_err(|e| AuthError::Signing(e.to_string()))
}

/// Check structure, algorithm and signature, then decode the claims
pub fn open<C: DeserializeOwned>(signer: &dyn TokenSigner, token: &str) -> Result<C, AuthError> {
    let mut validation = Validation::new(signer.algorithm());
    validation.leeway = 0;
    validation.validate_exp = false;
    validation.required_spec_claims.clear();

    decode::<C>(token.trim(), signer.decoding_key(), &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::InvalidSignature => AuthError::BadSignature,
            ErrorKind::ExpiredSignature => AuthError::Expired,
            _ => AuthError::Malformed,
        })
}
