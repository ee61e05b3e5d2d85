//! Account registration, login, and bearer token issuance.
//!
//! Tokens are HS256 JWTs. Logging out records the token's `jti` in
//! `revoked_tokens` until the token would have expired anyway.

use anyhow::{Context, Result, anyhow};
use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{
    Algorithm as Argon2Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier,
    Version,
};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppError, AppResult, is_unique_violation};
use crate::models::{LoginRequest, RegisterUser, User};

/// JWT issuer claim value.
const ISSUER: &str = "quill";

/// Shortest accepted password, in characters.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Longest accepted name or email, in characters.
const MAX_FIELD_LEN: usize = 255;

/// JWT token claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Issuer.
    pub iss: String,
    /// Subject (user ID).
    pub sub: String,
    /// Issued at (Unix timestamp).
    pub iat: i64,
    /// Expiration (Unix timestamp).
    pub exp: i64,
    /// JWT ID (unique per token, for revocation).
    pub jti: String,
}

/// A freshly signed bearer token.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Authentication service.
#[derive(Clone)]
pub struct AuthService {
    pool: SqlitePool,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_lifetime: i64,
    argon2_params: Params,
}

impl AuthService {
    /// Create a new auth service from configuration.
    pub fn new(pool: SqlitePool, config: &Config) -> Result<Self> {
        let argon2_params = Params::new(
            config.argon2_memory_kib,
            config.argon2_iterations,
            1,
            None,
        )
        .map_err(|e| anyhow!("invalid argon2 parameters: {e}"))?;

        Ok(Self {
            pool,
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            token_lifetime: config.token_lifetime_secs,
            argon2_params,
        })
    }

    /// Create an account and sign a token for it.
    pub async fn register(&self, input: RegisterUser) -> AppResult<(User, IssuedToken)> {
        let (name, email) = validate_registration(&input)?;

        if User::find_by_email(&self.pool, &email).await?.is_some() {
            return Err(email_taken());
        }

        let hash = self.hash_password(input.password).await?;
        let user = match User::insert(&self.pool, &name, &email, &hash).await {
            Ok(user) => user,
            Err(e) if is_unique_violation(&e) => return Err(email_taken()),
            Err(e) => return Err(e.into()),
        };

        let token = self.issue_token(user.id)?;
        info!(user_id = user.id, "user registered");
        Ok((user, token))
    }

    /// Check credentials and sign a token.
    pub async fn login(&self, input: LoginRequest) -> AppResult<(User, IssuedToken)> {
        let email = input.email.trim().to_lowercase();
        let Some(user) = User::find_by_email(&self.pool, &email).await? else {
            debug!("login attempt for unknown email");
            return Err(AppError::InvalidCredentials);
        };

        if !verify_password(user.password.clone(), input.password).await {
            debug!(user_id = user.id, "login attempt with wrong password");
            return Err(AppError::InvalidCredentials);
        }

        let token = self.issue_token(user.id)?;
        info!(user_id = user.id, "user logged in");
        Ok((user, token))
    }

    /// Revoke a token until its expiry.
    pub async fn logout(&self, jti: &str, exp: i64) -> AppResult<()> {
        let now = crate::db::now();

        sqlx::query("DELETE FROM revoked_tokens WHERE expires_at < ?")
            .bind(now)
            .execute(&self.pool)
            .await
            .context("failed to purge expired revocations")?;

        sqlx::query("INSERT OR IGNORE INTO revoked_tokens (jti, expires_at) VALUES (?, ?)")
            .bind(jti)
            .bind(exp)
            .execute(&self.pool)
            .await
            .context("failed to revoke token")?;

        debug!(jti = %jti, "token revoked");
        Ok(())
    }

    /// Load the user a verified token belongs to.
    pub async fn current_user(&self, user_id: i64) -> AppResult<User> {
        User::find_by_id(&self.pool, user_id)
            .await?
            .ok_or(AppError::Unauthorized)
    }

    /// Sign a token for a user.
    pub fn issue_token(&self, user_id: i64) -> Result<IssuedToken> {
        let now = crate::db::now();

        let claims = TokenClaims {
            iss: ISSUER.to_string(),
            sub: user_id.to_string(),
            iat: now,
            exp: now + self.token_lifetime,
            jti: Uuid::now_v7().to_string(),
        };

        let header = Header::new(Algorithm::HS256);
        let token = jsonwebtoken::encode(&header, &claims, &self.encoding_key)
            .context("failed to encode access token")?;

        Ok(IssuedToken {
            token,
            token_type: "Bearer".to_string(),
            expires_in: self.token_lifetime,
        })
    }

    /// Verify a token's signature, issuer, and expiry.
    pub fn verify_token(&self, token: &str) -> Result<TokenClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[ISSUER]);
        validation.leeway = 0;

        let data = jsonwebtoken::decode::<TokenClaims>(token, &self.decoding_key, &validation)
            .context("invalid token")?;

        Ok(data.claims)
    }

    /// Whether a token id has been revoked.
    pub async fn is_revoked(&self, jti: &str) -> Result<bool> {
        let revoked: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM revoked_tokens WHERE jti = ?)")
                .bind(jti)
                .fetch_one(&self.pool)
                .await
                .context("failed to check revocation")?;

        Ok(revoked)
    }

    /// Hash a password with Argon2id on the blocking pool.
    async fn hash_password(&self, password: String) -> Result<String> {
        let params = self.argon2_params.clone();

        tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            let argon2 = Argon2::new(Argon2Algorithm::Argon2id, Version::V0x13, params);
            argon2
                .hash_password(password.as_bytes(), &salt)
                .map(|hash| hash.to_string())
                .map_err(|e| anyhow!("failed to hash password: {e}"))
        })
        .await
        .context("password hashing task failed")?
    }
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService")
            .field("token_lifetime", &self.token_lifetime)
            .finish()
    }
}

/// Check a stored hash against a password on the blocking pool.
async fn verify_password(hash: String, password: String) -> bool {
    tokio::task::spawn_blocking(move || {
        let Ok(parsed) = PasswordHash::new(&hash) else {
            return false;
        };
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    })
    .await
    .unwrap_or(false)
}

/// Normalize and check registration input, returning `(name, email)`.
fn validate_registration(input: &RegisterUser) -> AppResult<(String, String)> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("the name field is required".to_string()));
    }
    if name.chars().count() > MAX_FIELD_LEN {
        return Err(AppError::Validation(format!(
            "the name may not be greater than {MAX_FIELD_LEN} characters"
        )));
    }

    let email = input.email.trim().to_lowercase();
    let well_formed = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !well_formed || email.chars().count() > MAX_FIELD_LEN {
        return Err(AppError::Validation(
            "the email must be a valid email address".to_string(),
        ));
    }

    if input.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "the password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    Ok((name.to_string(), email))
}

fn email_taken() -> AppError {
    AppError::Validation("the email has already been taken".to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn registration(name: &str, email: &str, password: &str) -> RegisterUser {
        RegisterUser {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    fn create_and_verify(secret: &[u8], issuer: &str) -> Result<TokenClaims> {
        let now = crate::db::now();
        let claims = TokenClaims {
            iss: issuer.to_string(),
            sub: "42".to_string(),
            iat: now,
            exp: now + 3600,
            jti: Uuid::now_v7().to_string(),
        };
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret),
        )
        .unwrap();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[ISSUER]);
        Ok(
            jsonwebtoken::decode::<TokenClaims>(&token, &DecodingKey::from_secret(secret), &validation)?
                .claims,
        )
    }

    #[test]
    fn token_roundtrip() {
        let claims = create_and_verify(b"an-adequately-long-test-signing-key", ISSUER).unwrap();
        assert_eq!(claims.sub, "42");
        assert_eq!(claims.iss, "quill");
    }

    #[test]
    fn wrong_issuer_rejected() {
        assert!(create_and_verify(b"an-adequately-long-test-signing-key", "someone-else").is_err());
    }

    #[test]
    fn registration_normalizes_email() {
        let (name, email) =
            validate_registration(&registration(" Ada ", " Ada@Example.COM ", "long-enough")).unwrap();
        assert_eq!(name, "Ada");
        assert_eq!(email, "ada@example.com");
    }

    #[test]
    fn registration_rejects_bad_input() {
        for input in [
            registration("", "ada@example.com", "long-enough"),
            registration("Ada", "not-an-email", "long-enough"),
            registration("Ada", "@example.com", "long-enough"),
            registration("Ada", "ada@example.com", "short"),
        ] {
            assert!(matches!(
                validate_registration(&input),
                Err(AppError::Validation(_))
            ));
        }
    }

    #[tokio::test]
    async fn password_verification() {
        let params = Params::new(Params::MIN_M_COST, 1, 1, None).unwrap();
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::new(Argon2Algorithm::Argon2id, Version::V0x13, params)
            .hash_password(b"correct horse", &salt)
            .unwrap()
            .to_string();

        assert!(hash.starts_with("$argon2id"));
        assert!(verify_password(hash.clone(), "correct horse".to_string()).await);
        assert!(!verify_password(hash, "wrong horse".to_string()).await);
        assert!(!verify_password("garbage".to_string(), "x".to_string()).await);
    }
}
