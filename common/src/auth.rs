// Authentication: credential verification and session tokens

use crate::config::{AllowedUser, AuthConfig};
use crate::errors::AuthError;
use crate::models::{Credentials, Identity, SessionClaims};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::sync::Arc;
use tracing::{error, instrument, warn};

/// Decides whether submitted credentials belong to a known user
pub trait CredentialVerifier: Send + Sync {
    /// The matching identity, or `None` when the credentials are rejected
    fn verify(&self, credentials: &Credentials) -> Option<Identity>;
}

/// Allow-list of users taken from configuration
#[derive(Clone, Default)]
pub struct StaticCredentialVerifier {
    users: Vec<AllowedUser>,
}

impl StaticCredentialVerifier {
    pub fn new(users: Vec<AllowedUser>) -> Self {
        Self { users }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(config.users.clone())
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

fn password_matches(user: &AllowedUser, password: &str) -> bool {
    if let Some(hash) = &user.password_hash {
        return match bcrypt::verify(password, hash) {
            Ok(valid) => valid,
            Err(e) => {
                error!(error = %e, first = %user.first, "Invalid bcrypt hash in allow-list");
                false
            }
        };
    }
    user.password.as_deref() == Some(password)
}

impl CredentialVerifier for StaticCredentialVerifier {
    #[instrument(skip(self))]
    fn verify(&self, credentials: &Credentials) -> Option<Identity> {
        let matched = self.users.iter().find(|u| {
            u.first == credentials.first
                && u.last == credentials.last
                && password_matches(u, &credentials.password)
        });

        match matched {
            Some(user) => Some(Identity {
                first: user.first.clone(),
                last: user.last.clone(),
            }),
            None => {
                warn!(first = %credentials.first, last = %credentials.last, "Login rejected");
                None
            }
        }
    }
}

/// Issues and validates signed session tokens
#[derive(Clone)]
pub struct SessionService {
    encoding_key: Arc<EncodingKey>,
    decoding_key: Arc<DecodingKey>,
    expiration_hours: u64,
}

impl SessionService {
    /// Create a new session service with the given secret and expiration
    #[instrument(skip(secret))]
    pub fn new(secret: &str, expiration_hours: u64) -> Self {
        Self {
            encoding_key: Arc::new(EncodingKey::from_secret(secret.as_bytes())),
            decoding_key: Arc::new(DecodingKey::from_secret(secret.as_bytes())),
            expiration_hours,
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(&config.jwt_secret, config.session_hours)
    }

    /// Session lifetime, or an error when the configured hours do not fit
    pub fn lifetime(&self) -> Result<Duration, AuthError> {
        i64::try_from(self.expiration_hours)
            .ok()
            .and_then(Duration::try_hours)
            .ok_or_else(|| {
                AuthError::AuthenticationFailed(format!(
                    "Session lifetime of {} hours is out of range",
                    self.expiration_hours
                ))
            })
    }

    /// Sign a session token for `identity`
    #[instrument(skip(self))]
    pub fn issue(&self, identity: &Identity) -> Result<String, AuthError> {
        let now = Utc::now();
        let expires_at = now.checked_add_signed(self.lifetime()?).ok_or_else(|| {
            AuthError::AuthenticationFailed("Session expiry is out of range".to_string())
        })?;
        let claims = SessionClaims {
            sub: identity.display_name(),
            first: identity.first.clone(),
            last: identity.last.clone(),
            exp: expires_at.timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| {
            error!(error = %e, "Failed to encode session token");
            AuthError::AuthenticationFailed(format!("Failed to encode token: {}", e))
        })
    }

    /// Decode and validate a session token
    #[instrument(skip(self, token))]
    pub fn validate(&self, token: &str) -> Result<Identity, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        let data = decode::<SessionClaims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken(format!("Token validation failed: {}", e)),
            }
        })?;

        Ok(Identity {
            first: data.claims.first,
            last: data.claims.last,
        })
    }
}
