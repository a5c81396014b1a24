use actix_web::dev::Payload;
use actix_web::http::header::AUTHORIZATION;
use actix_web::{web, Error, FromRequest, HttpRequest};
use futures::future::{ready, Ready};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use tracing::debug;

use crate::config::AuthConfig;
use crate::error::{AppError, Result};

#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
}

/// Decodes a bearer credential into a viewer id
pub trait IdentityResolver: Send + Sync {
    /// `None` for anything that does not verify
    fn resolve(&self, token: &str) -> Option<String>;
}

/// Verifies RS256 or HS256 tokens; without a key every request is anonymous
pub struct JwtIdentityResolver {
    key: Option<(DecodingKey, Algorithm)>,
}

impl JwtIdentityResolver {
    pub fn from_config(config: &AuthConfig) -> Result<Self> {
        if let Some(pem) = &config.jwt_public_key_pem {
            let key = DecodingKey::from_rsa_pem(pem.as_bytes())
                .map_err(|e| AppError::Internal(format!("Invalid JWT public key: {}", e)))?;
            return Ok(Self {
                key: Some((key, Algorithm::RS256)),
            });
        }

        Ok(match &config.jwt_secret {
            Some(secret) => Self::hs256(secret.as_bytes()),
            None => Self::anonymous(),
        })
    }

    pub fn hs256(secret: &[u8]) -> Self {
        Self {
            key: Some((DecodingKey::from_secret(secret), Algorithm::HS256)),
        }
    }

    pub fn anonymous() -> Self {
        Self { key: None }
    }
}

impl IdentityResolver for JwtIdentityResolver {
    fn resolve(&self, token: &str) -> Option<String> {
        let (key, algorithm) = self.key.as_ref()?;
        match decode::<Claims>(token, key, &Validation::new(*algorithm)) {
            Ok(data) => Some(data.claims.sub),
            Err(e) => {
                debug!(error = %e, "Ignoring invalid bearer token");
                None
            }
        }
    }
}

/// Viewer id from `Authorization: Bearer`, if it verifies. Never rejects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionalViewer(pub Option<String>);

impl OptionalViewer {
    pub fn into_inner(self) -> Option<String> {
        self.0
    }
}

fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

impl FromRequest for OptionalViewer {
    type Error = Error;
    type Future = Ready<std::result::Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let viewer_id = match (
            bearer_token(req),
            req.app_data::<web::Data<dyn IdentityResolver>>(),
        ) {
            (Some(token), Some(resolver)) => resolver.resolve(token),
            _ => None,
        };
        ready(Ok(OptionalViewer(viewer_id)))
    }
}
