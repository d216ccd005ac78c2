use async_trait::async_trait;
use jsonwebtoken::{DecodingKey, Validation, decode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use ts_rs::TS;
use uuid::Uuid;

use crate::error::GuardDecisionError;

/// Role
///
/// The two access levels the portal distinguishes. Reporters submit and track
/// their own issues; admins triage everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, Default)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    #[default]
    User,
    Admin,
}

/// Claims
///
/// The payload structure expected inside a session token. Claims are signed
/// by the token issuer (an external service); this crate only verifies the
/// signature and reads the decoded fields.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the UUID of the signed-in user.
    pub sub: Uuid,
    /// The user's access level, baked into the token at issue time.
    pub role: Role,
    /// Expiration time (exp): timestamp after which the token is rejected.
    pub exp: usize,
    /// Issued at (iat): timestamp when the token was created.
    pub iat: usize,
}

/// Session
///
/// The resolved identity of a browsing context. This is all the guard and the
/// page gate ever look at; everything cryptographic stays behind the
/// `SessionProvider` boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub subject: Uuid,
    pub role: Role,
}

impl Session {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// SessionProvider
///
/// Collaborator contract for turning a raw credential into a verified
/// session. `Ok(None)` means an anonymous visitor. `Err` means a credential
/// was presented but failed verification; the guard downgrades that to
/// anonymous rather than failing the navigation.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn resolve(
        &self,
        credential: Option<&str>,
    ) -> Result<Option<Session>, GuardDecisionError>;
}

/// The shared handle the guard holds on the session provider.
pub type SessionProviderState = Arc<dyn SessionProvider>;

/// JwtSessionVerifier
///
/// The shipped provider: decodes an HS256 session token with the configured
/// secret and maps the claims into a `Session`. Expiration is always
/// validated.
pub struct JwtSessionVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtSessionVerifier {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::default();
        validation.validate_exp = true;

        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }
}

#[async_trait]
impl SessionProvider for JwtSessionVerifier {
    async fn resolve(
        &self,
        credential: Option<&str>,
    ) -> Result<Option<Session>, GuardDecisionError> {
        let Some(raw) = credential else {
            return Ok(None);
        };

        // Credentials may arrive either bare or as an Authorization value.
        let token = raw.strip_prefix("Bearer ").unwrap_or(raw);

        match decode::<Claims>(token, &self.decoding_key, &self.validation) {
            Ok(data) => Ok(Some(Session {
                subject: data.claims.sub,
                role: data.claims.role,
            })),
            Err(e) => match e.kind() {
                // Expired tokens are the common case for returning visitors;
                // everything else (bad signature, malformed) is lumped together.
                ErrorKind::ExpiredSignature => Err(GuardDecisionError::Expired),
                _ => Err(GuardDecisionError::Invalid(e.to_string())),
            },
        }
    }
}

/// StaticSessionProvider
///
/// A provider with a fixed outcome, used in tests and in local development
/// where no token issuer is running.
pub struct StaticSessionProvider {
    session: Option<Session>,
    failure: Option<GuardDecisionError>,
}

impl StaticSessionProvider {
    /// Every resolution yields an anonymous visitor.
    pub fn anonymous() -> Self {
        Self {
            session: None,
            failure: None,
        }
    }

    /// Every resolution yields the given session, regardless of credential.
    pub fn with_session(session: Session) -> Self {
        Self {
            session: Some(session),
            failure: None,
        }
    }

    /// Every resolution fails verification with the given error.
    pub fn failing(failure: GuardDecisionError) -> Self {
        Self {
            session: None,
            failure: Some(failure),
        }
    }
}

#[async_trait]
impl SessionProvider for StaticSessionProvider {
    async fn resolve(
        &self,
        _credential: Option<&str>,
    ) -> Result<Option<Session>, GuardDecisionError> {
        match &self.failure {
            Some(err) => Err(err.clone()),
            None => Ok(self.session.clone()),
        }
    }
}
