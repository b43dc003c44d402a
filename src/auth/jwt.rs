//! JWT issuance and verification
//!
//! Tokens are HS256-signed. Claims are decoded into a typed [`Claims`]
//! once, at verification; downstream code never touches raw claim maps.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::types::{FolioError, Result};

/// Secret used when running in dev mode without `JWT_SECRET`
const DEV_SECRET: &str = "folio-dev-secret-not-for-production";

/// Default token lifetime (72 hours)
pub const DEFAULT_EXPIRY_SECONDS: u64 = 72 * 60 * 60;

/// Verified token claims
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// User id (hex ObjectId)
    pub sub: String,
    pub username: String,
    /// Role tags held at login time
    #[serde(default)]
    pub roles: Vec<String>,
    /// Whether the user held the admin role at login time
    #[serde(default)]
    pub admin: bool,
    pub iat: u64,
    pub exp: u64,
}

/// What a new token asserts about its bearer
#[derive(Debug, Clone)]
pub struct TokenInput {
    pub user_id: String,
    pub username: String,
    pub roles: Vec<String>,
    pub admin: bool,
}

/// Outcome of [`JwtValidator::verify_token`]
#[derive(Debug, Clone)]
pub struct TokenValidationResult {
    pub valid: bool,
    pub claims: Option<Claims>,
    pub error: Option<String>,
}

impl TokenValidationResult {
    fn ok(claims: Claims) -> Self {
        Self {
            valid: true,
            claims: Some(claims),
            error: None,
        }
    }

    fn invalid(error: impl Into<String>) -> Self {
        Self {
            valid: false,
            claims: None,
            error: Some(error.into()),
        }
    }

    /// Claims, or `Unauthorized` carrying the failure reason
    pub fn into_claims(self) -> Result<Claims> {
        match self.claims {
            Some(claims) if self.valid => Ok(claims),
            _ => Err(FolioError::Unauthorized(
                self.error.unwrap_or_else(|| "Invalid token".into()),
            )),
        }
    }
}

/// Issues and verifies tokens with one shared secret
#[derive(Clone)]
pub struct JwtValidator {
    encoding: EncodingKey,
    decoding: DecodingKey,
    expiry_seconds: u64,
}

impl std::fmt::Debug for JwtValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtValidator")
            .field("expiry_seconds", &self.expiry_seconds)
            .finish_non_exhaustive()
    }
}

impl JwtValidator {
    pub fn new(secret: String, expiry_seconds: u64) -> Result<Self> {
        if secret.is_empty() {
            return Err(FolioError::Config("JWT secret must not be empty".into()));
        }
        if expiry_seconds == 0 {
            return Err(FolioError::Config("JWT expiry must be positive".into()));
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            expiry_seconds,
        })
    }

    /// Validator with a fixed insecure secret
    pub fn new_dev() -> Self {
        Self {
            encoding: EncodingKey::from_secret(DEV_SECRET.as_bytes()),
            decoding: DecodingKey::from_secret(DEV_SECRET.as_bytes()),
            expiry_seconds: DEFAULT_EXPIRY_SECONDS,
        }
    }

    pub fn expiry_seconds(&self) -> u64 {
        self.expiry_seconds
    }

    /// Sign a token for `input`
    pub fn generate_token(&self, input: TokenInput) -> Result<String> {
        let now = chrono::Utc::now().timestamp().max(0) as u64;
        let claims = Claims {
            sub: input.user_id,
            username: input.username,
            roles: input.roles,
            admin: input.admin,
            iat: now,
            exp: now + self.expiry_seconds,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| FolioError::Internal(format!("Failed to sign token: {e}")))
    }

    /// Verify signature and expiry, decoding the claims
    pub fn verify_token(&self, token: &str) -> TokenValidationResult {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        match decode::<Claims>(token, &self.decoding, &validation) {
            Ok(data) => TokenValidationResult::ok(data.claims),
            Err(e) => match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    TokenValidationResult::invalid("Token expired")
                }
                _ => TokenValidationResult::invalid(format!("Invalid token: {e}")),
            },
        }
    }
}

/// Token from an `Authorization: Bearer <token>` header value
pub fn extract_token_from_header(header: Option<&str>) -> Option<&str> {
    let value = header?.trim();
    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))?
        .trim();
    (!token.is_empty()).then_some(token)
}
