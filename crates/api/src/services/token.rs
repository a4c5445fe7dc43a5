//! Bearer token issue and verification.
//!
//! Tokens are compact HS256 JWTs with claims `{sub, iat, exp}` where `sub` is
//! the decimal user ID. Verification fails closed: every way a token can be
//! bad collapses to "no identity" at [`TokenService::resolve`].

use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use conduit_core::UserId;

use crate::config::{MAX_SESSION_SECONDS, MIN_JWT_SECRET_LENGTH, TokenConfig, secret_bytes};

/// Errors constructing the service or signing a token.
///
/// Verification never produces one of these.
#[derive(Debug, Error)]
pub enum TokenError {
    /// Signing secret shorter than a 256-bit key.
    #[error("signing secret must be at least 32 bytes")]
    WeakSecret,

    /// Session lifetime is zero or too long.
    #[error("session lifetime must be between one second and one year")]
    InvalidLifetime,

    /// `now + lifetime` does not fit in a timestamp.
    #[error("token expiry is out of range")]
    ExpiryOutOfRange,

    /// Signing failed.
    #[error("failed to encode token: {0}")]
    Encode(#[from] jsonwebtoken::errors::Error),
}

/// Why a presented token was not accepted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
enum TokenRejection {
    #[error("not a well-formed token")]
    Malformed,
    #[error("signature does not verify")]
    BadSignature,
    #[error("unexpected algorithm")]
    WrongAlgorithm,
    #[error("token has expired")]
    Expired,
    #[error("missing claim `{0}`")]
    MissingClaim(String),
    #[error("subject is not a user id")]
    InvalidSubject,
}

impl From<jsonwebtoken::errors::Error> for TokenRejection {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            ErrorKind::InvalidSignature => Self::BadSignature,
            ErrorKind::InvalidAlgorithm => Self::WrongAlgorithm,
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::MissingRequiredClaim(claim) => Self::MissingClaim(claim.clone()),
            _ => Self::Malformed,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    iat: i64,
    exp: i64,
}

/// Issues and verifies bearer tokens with a process-wide secret.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    lifetime: TimeDelta,
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService")
            .field("lifetime", &self.lifetime)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    /// Build the service from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::WeakSecret` for a secret under 32 bytes and
    /// `TokenError::InvalidLifetime` for a zero or oversized lifetime.
    pub fn new(config: &TokenConfig) -> Result<Self, TokenError> {
        let secret = secret_bytes(config);
        if secret.len() < MIN_JWT_SECRET_LENGTH {
            return Err(TokenError::WeakSecret);
        }

        let seconds = config.session_lifetime.as_secs();
        if seconds == 0 || seconds > MAX_SESSION_SECONDS {
            return Err(TokenError::InvalidLifetime);
        }
        let lifetime = TimeDelta::from_std(config.session_lifetime)
            .map_err(|_| TokenError::InvalidLifetime)?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            lifetime,
        })
    }

    /// How long issued tokens stay valid.
    #[must_use]
    pub const fn lifetime(&self) -> TimeDelta {
        self.lifetime
    }

    /// Issue a token for `user_id` that expires `lifetime` after `now`.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::ExpiryOutOfRange` if the expiry overflows, or
    /// `TokenError::Encode` if signing fails.
    pub fn issue(&self, user_id: UserId, now: DateTime<Utc>) -> Result<String, TokenError> {
        let expires_at = now
            .checked_add_signed(self.lifetime)
            .ok_or(TokenError::ExpiryOutOfRange)?;
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        Ok(jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding,
        )?)
    }

    /// Verify `token` and return the user it was issued to.
    ///
    /// Returns `None` for anything that is not a current, correctly signed
    /// token with a numeric subject.
    #[must_use]
    pub fn resolve(&self, token: &str) -> Option<UserId> {
        match self.verify(token, Utc::now()) {
            Ok(user_id) => Some(user_id),
            Err(rejection) => {
                tracing::debug!(reason = %rejection, "bearer token rejected");
                None
            }
        }
    }

    fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<UserId, TokenRejection> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)?;

        if data.claims.exp <= now.timestamp() {
            return Err(TokenRejection::Expired);
        }

        data.claims
            .sub
            .parse::<UserId>()
            .map_err(|_| TokenRejection::InvalidSubject)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use secrecy::SecretString;

    use super::*;

    const SECRET: &str = "q8Zr!3vLx@9TmK2#pW7s$Nd4&Hf6*Jb1";
    const OTHER_SECRET: &str = "Mx7#Lp2$Qv9!Rt4&Wz6*Bn3@Hk8^Jd5%";

    fn service(secret: &str, seconds: u64) -> TokenService {
        TokenService::new(&TokenConfig {
            secret: SecretString::from(secret),
            session_lifetime: Duration::from_secs(seconds),
        })
        .unwrap()
    }

    #[test]
    fn test_issue_then_resolve() {
        let tokens = service(SECRET, 3600);
        let token = tokens.issue(UserId::new(42), Utc::now()).unwrap();
        assert_eq!(tokens.resolve(&token), Some(UserId::new(42)));
    }

    #[test]
    fn test_issue_near_max_time_is_an_error() {
        let tokens = service(SECRET, 3600);
        assert!(matches!(
            tokens.issue(UserId::new(1), DateTime::<Utc>::MAX_UTC),
            Err(TokenError::ExpiryOutOfRange)
        ));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let tokens = service(SECRET, 60);
        let issued = Utc::now() - TimeDelta::seconds(120);
        let token = tokens.issue(UserId::new(1), issued).unwrap();

        assert_eq!(tokens.resolve(&token), None);
        assert_eq!(
            tokens.verify(&token, Utc::now()),
            Err(TokenRejection::Expired)
        );
    }

    #[test]
    fn test_token_is_dead_at_exact_expiry() {
        let tokens = service(SECRET, 60);
        let now = Utc::now();
        let token = tokens.issue(UserId::new(1), now).unwrap();

        let at_expiry = now + TimeDelta::seconds(60);
        assert_eq!(
            tokens.verify(&token, at_expiry),
            Err(TokenRejection::Expired)
        );
    }

    #[test]
    fn test_other_secret_is_rejected() {
        let ours = service(SECRET, 3600);
        let theirs = service(OTHER_SECRET, 3600);
        let token = theirs.issue(UserId::new(7), Utc::now()).unwrap();

        assert_eq!(ours.resolve(&token), None);
        assert_eq!(
            ours.verify(&token, Utc::now()),
            Err(TokenRejection::BadSignature)
        );
    }

    #[test]
    fn test_garbage_is_rejected() {
        let tokens = service(SECRET, 3600);
        assert_eq!(tokens.resolve("not-a-token"), None);
        assert_eq!(tokens.resolve(""), None);
        assert_eq!(tokens.resolve("a.b.c"), None);
    }

    #[test]
    fn test_tampered_payload_is_rejected() {
        let tokens = service(SECRET, 3600);
        let token = tokens.issue(UserId::new(1), Utc::now()).unwrap();
        let forged = tokens.issue(UserId::new(2), Utc::now()).unwrap();

        // Graft the payload of one token onto the signature of another.
        let mut parts: Vec<&str> = token.split('.').collect();
        let forged_payload = forged.split('.').nth(1).unwrap();
        parts[1] = forged_payload;
        let spliced = parts.join(".");

        assert_eq!(tokens.resolve(&spliced), None);
    }

    #[test]
    fn test_non_numeric_subject_is_rejected() {
        let tokens = service(SECRET, 3600);
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: "alice".to_owned(),
            iat: now,
            exp: now + 3600,
        };
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert_eq!(
            tokens.verify(&token, Utc::now()),
            Err(TokenRejection::InvalidSubject)
        );
        assert_eq!(tokens.resolve(&token), None);
    }

    #[test]
    fn test_weak_config_is_rejected() {
        let short = TokenService::new(&TokenConfig {
            secret: SecretString::from("too-short"),
            session_lifetime: Duration::from_secs(60),
        });
        assert!(matches!(short, Err(TokenError::WeakSecret)));

        let zero = TokenService::new(&TokenConfig {
            secret: SecretString::from(SECRET),
            session_lifetime: Duration::ZERO,
        });
        assert!(matches!(zero, Err(TokenError::InvalidLifetime)));
    }
}
