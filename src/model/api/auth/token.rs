use std::marker::PhantomData;

use chrono::{serde::ts_seconds, DateTime, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, TokenData, Validation};
use mongodb::Database;
use rocket::{
    http::{Cookie, SameSite},
    request::{FromRequest, Outcome},
    time::Duration,
    Request, State,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::mongodb::Id;
use crate::Config;

use super::user::{exists, Rights, User};

pub const AUTH_TOKEN_COOKIE: &str = "auth_token";
const BEARER: &str = "Bearer ";

/// An authentication token representing a specific user with specific rights.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthToken<U> {
    pub id: Id,
    #[serde(rename = "rgt")]
    pub rights: Rights,
    #[serde(skip)]
    phantom: PhantomData<U>,
}

impl<U> AuthToken<U> {
    /// Does this token permit the given rights?
    pub fn permits(&self, target: Rights) -> bool {
        self.rights == target
    }
}

impl<U> AuthToken<U>
where
    U: User,
{
    /// Create a new [`AuthToken`] for the given user, with the correct rights for that user type.
    pub fn new(user: &U) -> Self {
        Self {
            id: user.id(),
            rights: U::RIGHTS,
            phantom: PhantomData,
        }
    }

    /// Sign this token, valid from `now` for the configured lifetime.
    pub fn encode(self, now: DateTime<Utc>, config: &Config) -> Result<String> {
        let claims = Claims {
            token: self,
            expire_at: now + config.auth_ttl(),
        };
        Ok(jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret()),
        )?)
    }

    /// Check a signed token, rejecting bad signatures and expired tokens.
    pub fn decode(token: &str, config: &Config) -> Result<Self> {
        let token = jsonwebtoken::decode(
            token,
            &DecodingKey::from_secret(config.jwt_secret()),
            &Validation::default(),
        )
        .map(|claims: TokenData<Claims<U>>| claims.claims.token)?;
        Ok(token)
    }
}

/// The cookie carrying a signed token, for browser clients.
pub fn auth_cookie(token: String, config: &Config) -> Cookie<'static> {
    Cookie::build(AUTH_TOKEN_COOKIE, token)
        .max_age(Duration::seconds(config.auth_ttl().num_seconds()))
        .http_only(true)
        .same_site(SameSite::Strict)
        .path("/")
        .finish()
}

/// Token claims: the token itself plus an expiry datetime.
#[derive(Serialize, Deserialize)]
struct Claims<U> {
    #[serde(flatten, bound = "")]
    token: AuthToken<U>,
    #[serde(rename = "exp", with = "ts_seconds")]
    expire_at: DateTime<Utc>,
}

/// The raw token from the `Authorization` header, or failing that the cookie.
fn raw_token(req: &Request<'_>) -> Option<String> {
    req.headers()
        .get_one("Authorization")
        .and_then(|header| header.strip_prefix(BEARER))
        .map(|token| token.trim().to_string())
        .or_else(|| {
            req.cookies()
                .get(AUTH_TOKEN_COOKIE)
                .map(|cookie| cookie.value().to_string())
        })
}

#[rocket::async_trait]
impl<'r, U> FromRequest<'r> for AuthToken<U>
where
    U: User + Send + Sync,
{
    type Error = Error;

    /// Get an [`AuthToken`] from the request and verify that it has the
    /// correct rights for this user type, and that the user still exists.
    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        // Unwrap is safe as `Config` is always managed.
        let config = req.guard::<&State<Config>>().await.unwrap();

        let Some(raw) = raw_token(req) else {
            return Error::Authentication("Missing authentication token".to_string()).fail(req);
        };
        let token = match Self::decode(&raw, config) {
            Ok(token) => token,
            Err(_) => {
                return Error::Authentication("Invalid or expired authentication token".to_string())
                    .fail(req)
            }
        };

        if !token.permits(U::RIGHTS) {
            return Error::Forbidden(format!("This action requires {} rights", U::RIGHTS))
                .fail(req);
        }

        // Unwrap is safe as `Database` is always managed.
        let db = req.guard::<&State<Database>>().await.unwrap();
        match exists::<U>(db, token.id).await {
            Ok(true) => Outcome::Success(token),
            Ok(false) => {
                Error::Authentication(format!("No {} with ID {}", U::RIGHTS, token.id)).fail(req)
            }
            Err(e) => Error::from(e).fail(req),
        }
    }
}
