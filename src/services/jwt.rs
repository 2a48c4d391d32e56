use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::services::otp::{SubjectKind, SubjectRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,        // account id
    pub email: String,
    pub kind: SubjectKind,
    pub role: String,
    pub token_type: TokenType,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
}

impl Claims {
    pub fn subject(&self) -> SubjectRef {
        SubjectRef::new(self.kind, self.sub.clone())
    }
}

/// Identity a session is minted for.
#[derive(Debug, Clone)]
pub struct SessionClaims {
    pub subject: SubjectRef,
    pub email: String,
    pub role: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Session expired")]
    Expired,

    #[error("Invalid session token")]
    Invalid,

    #[error("Token signing failed: {0}")]
    Signing(String),
}

impl From<SessionError> for crate::error::AppError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Signing(e) => crate::error::AppError::Internal(e),
            other => crate::error::AppError::Unauthorized(other.to_string()),
        }
    }
}

/// Stateless access/refresh token issuer.
///
/// There is no revocation list: logging out deletes the client's copy and a
/// leaked token stays valid until it expires.
pub struct JwtService {
    secret: String,
    access_token_duration: Duration,
    refresh_token_duration: Duration,
}

impl JwtService {
    pub fn new(secret: String) -> Self {
        Self {
            secret,
            access_token_duration: Duration::days(7),
            refresh_token_duration: Duration::days(30),
        }
    }

    pub fn with_durations(mut self, access: Duration, refresh: Duration) -> Self {
        self.access_token_duration = access;
        self.refresh_token_duration = refresh;
        self
    }

    pub fn issue(&self, session: &SessionClaims) -> Result<TokenPair, SessionError> {
        Ok(TokenPair {
            access_token: self.sign(session, TokenType::Access, self.access_token_duration)?,
            refresh_token: self.sign(session, TokenType::Refresh, self.refresh_token_duration)?,
            expires_in: self.access_token_duration.num_seconds(),
        })
    }

    pub fn verify_access(&self, token: &str) -> Result<Claims, SessionError> {
        self.verify(token, TokenType::Access)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<Claims, SessionError> {
        self.verify(token, TokenType::Refresh)
    }

    fn sign(
        &self,
        session: &SessionClaims,
        token_type: TokenType,
        ttl: Duration,
    ) -> Result<String, SessionError> {
        let now = Utc::now();
        let claims = Claims {
            sub: session.subject.id.clone(),
            email: session.email.clone(),
            kind: session.subject.kind,
            role: session.role.clone(),
            token_type,
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        self.encode_claims(&claims)
    }

    fn encode_claims(&self, claims: &Claims) -> Result<String, SessionError> {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| SessionError::Signing(e.to_string()))
    }

    fn verify(&self, token: &str, expected: TokenType) -> Result<Claims, SessionError> {
        let mut validation = Validation::default();
        validation.leeway = 0;

        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => SessionError::Expired,
            _ => SessionError::Invalid,
        })?;

        if data.claims.token_type != expected {
            return Err(SessionError::Invalid);
        }

        Ok(data.claims)
    }
}
