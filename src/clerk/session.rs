use anyhow::{Result, anyhow};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

use crate::config::AuthConfig;

/// Claims of a Clerk session token
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionClaims {
    /// Subject (user identifier)
    pub sub: String,
    /// Expiration time (as Unix timestamp)
    pub exp: u64,
    /// Issued at (as Unix timestamp)
    #[serde(default)]
    pub iat: Option<u64>,
    /// Session identifier
    #[serde(default)]
    pub sid: Option<String>,
    /// Authorized party, the frontend origin that requested the token
    #[serde(default)]
    pub azp: Option<String>,
}

/// Verifies session tokens against the instance's public key
#[derive(Clone)]
pub struct SessionVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for SessionVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionVerifier")
            .field("algorithms", &self.validation.algorithms)
            .finish_non_exhaustive()
    }
}

impl SessionVerifier {
    pub fn from_config(config: &AuthConfig) -> Result<Self> {
        let pem = config
            .public_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| anyhow!("session verification key is not configured (set CLERK_JWT_KEY)"))?;

        let key = match config.algorithm {
            Algorithm::RS256
            | Algorithm::RS384
            | Algorithm::RS512
            | Algorithm::PS256
            | Algorithm::PS384
            | Algorithm::PS512 => DecodingKey::from_rsa_pem(pem.as_bytes())?,
            Algorithm::ES256 | Algorithm::ES384 => DecodingKey::from_ec_pem(pem.as_bytes())?,
            Algorithm::EdDSA => DecodingKey::from_ed_pem(pem.as_bytes())?,
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => {
                DecodingKey::from_secret(pem.as_bytes())
            }
        };

        let mut validation = Validation::new(config.algorithm);
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.set_required_spec_claims(&["exp", "sub"]);
        if let Some(issuer) = config.issuer.as_deref() {
            validation.set_issuer(&[issuer]);
        }

        Ok(Self { key, validation })
    }

    pub fn verify(&self, token: &str) -> Result<SessionClaims, jsonwebtoken::errors::Error> {
        let token_data = decode::<SessionClaims>(token, &self.key, &self.validation)?;
        Ok(token_data.claims)
    }
}
