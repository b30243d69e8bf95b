use actix_web::{dev::Payload, FromRequest, HttpRequest};
use actix_web_httpauth::extractors::bearer::BearerAuth;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::env;
use std::future::{ready, Ready};

use crate::error::ApiError;
use crate::models::{Id, Profile};

#[derive(thiserror::Error, Debug)]
pub enum AuthError {
    #[error("JWT_SECRET not set")]
    MissingSecret,
    #[error("invalid token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),
    #[error("wrong token type")]
    WrongTokenType,
    #[error("malformed subject")]
    BadSubject,
    #[error("password hashing failed: {0}")]
    Hash(String),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// Profile fields baked into every token at issue time. They are not
/// refreshed until the user logs in again.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProfileClaims {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub bio: String,
    pub gender: Option<String>,
    pub profile_picture: Option<String>,
    pub location: String,
    pub phone_number: Option<String>,
    pub website: Option<String>,
    pub date_of_birth: Option<String>,
    pub age: Option<i32>,
    pub followers_count: usize,
    pub following_count: usize,
}

impl From<&Profile> for ProfileClaims {
    fn from(p: &Profile) -> Self {
        let u = &p.user;
        Self {
            username: u.username.clone(),
            email: u.email.clone(),
            first_name: u.first_name.clone(),
            last_name: u.last_name.clone(),
            bio: u.bio.clone(),
            gender: u.gender.clone(),
            profile_picture: u.profile_picture.clone(),
            location: u.location.clone(),
            phone_number: u.phone_number.clone(),
            website: u.website.clone(),
            date_of_birth: u.date_of_birth.map(|d| d.to_string()),
            age: u.age,
            followers_count: p.followers.len(),
            following_count: p.following.len(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user id
    pub token_type: TokenType,
    pub exp: usize,
    pub iat: usize,
    pub jti: String,
    #[serde(flatten)]
    pub profile: ProfileClaims,
}

impl Claims {
    pub fn user_id(&self) -> Result<Id, AuthError> {
        self.sub.parse().map_err(|_| AuthError::BadSubject)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Token lifetimes, from `JWT_ACCESS_TTL_SECS` / `JWT_REFRESH_TTL_SECS`.
#[derive(Debug, Clone, Copy)]
pub struct TokenSettings {
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl TokenSettings {
    pub fn from_env() -> Self {
        fn secs(name: &str, default: i64) -> Duration {
            Duration::seconds(env::var(name).ok().and_then(|v| v.parse().ok()).unwrap_or(default))
        }
        Self {
            access_ttl: secs("JWT_ACCESS_TTL_SECS", 3600),
            refresh_ttl: secs("JWT_REFRESH_TTL_SECS", 86_400),
        }
    }

    fn ttl(&self, kind: TokenType) -> Duration {
        match kind {
            TokenType::Access => self.access_ttl,
            TokenType::Refresh => self.refresh_ttl,
        }
    }
}

fn secret() -> Result<String, AuthError> {
    env::var("JWT_SECRET").map_err(|_| AuthError::MissingSecret)
}

fn sign(claims: &Claims) -> Result<String, AuthError> {
    let key = EncodingKey::from_secret(secret()?.as_bytes());
    Ok(encode(&Header::default(), claims, &key)?)
}

fn issue(user_id: Id, profile: ProfileClaims, kind: TokenType, settings: &TokenSettings) -> Result<String, AuthError> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id.to_string(),
        token_type: kind,
        exp: (now + settings.ttl(kind)).timestamp() as usize,
        iat: now.timestamp() as usize,
        jti: uuid::Uuid::new_v4().to_string(),
        profile,
    };
    sign(&claims)
}

/// Access + refresh pair for a freshly authenticated user.
pub fn issue_token_pair(profile: &Profile) -> Result<TokenPair, AuthError> {
    let settings = TokenSettings::from_env();
    let snapshot = ProfileClaims::from(profile);
    Ok(TokenPair {
        access: issue(profile.user.id, snapshot.clone(), TokenType::Access, &settings)?,
        refresh: issue(profile.user.id, snapshot, TokenType::Refresh, &settings)?,
    })
}

/// Validate a JWT (signature and expiry) and return its claims.
pub fn decode_token(token: &str) -> Result<Claims, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    let data = decode::<Claims>(token, &DecodingKey::from_secret(secret()?.as_bytes()), &validation)?;
    Ok(data.claims)
}

/// Mint a new access token from a refresh token. The profile snapshot is
/// carried over as-is.
pub fn refresh_access(refresh_token: &str) -> Result<String, AuthError> {
    let claims = decode_token(refresh_token)?;
    if claims.token_type != TokenType::Refresh {
        return Err(AuthError::WrongTokenType);
    }
    let user_id = claims.user_id()?;
    issue(user_id, claims.profile, TokenType::Access, &TokenSettings::from_env())
}

/// Extractor yielding the acting user from a valid access token.
/// Use `Option<Auth>` on routes that also serve anonymous callers.
#[derive(Debug, Clone)]
pub struct Auth {
    pub user_id: Id,
    pub claims: Claims,
}

impl Auth {
    fn from_token(token: &str) -> Result<Self, AuthError> {
        let claims = decode_token(token)?;
        if claims.token_type != TokenType::Access {
            return Err(AuthError::WrongTokenType);
        }
        Ok(Auth { user_id: claims.user_id()?, claims })
    }
}

impl FromRequest for Auth {
    type Error = ApiError;
    type Future = Ready<Result<Self, ApiError>>;

    fn from_request(req: &HttpRequest, pl: &mut Payload) -> Self::Future {
        // Delegate to BearerAuth to parse the header.
        let Ok(bearer) = BearerAuth::from_request(req, pl).into_inner() else {
            return ready(Err(ApiError::Unauthorized("Authentication credentials were not provided.".into())));
        };
        ready(Auth::from_token(bearer.token()).map_err(|e| {
            log::debug!("rejected bearer token: {e}");
            ApiError::Unauthorized("Given token not valid for any token type".into())
        }))
    }
}
