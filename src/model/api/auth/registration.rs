use chrono::{serde::ts_seconds, DateTime, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, TokenData, Validation};
use rocket::{
    http::{Cookie, SameSite},
    request::{self, FromRequest},
    time::Duration,
    Request, State,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::common::Nid;
use crate::Config;

pub const REGISTRATION_COOKIE: &str = "registration";

/// Proof that the holder verified an OTP for `nid`, entitling them to
/// register an account for it.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationToken {
    pub nid: Nid,
}

impl RegistrationToken {
    pub fn new(nid: Nid) -> Self {
        Self { nid }
    }

    /// Convert into a cookie, valid from `now` for the registration window.
    pub fn into_cookie(self, now: DateTime<Utc>, config: &Config) -> Result<Cookie<'static>> {
        let claims = Claims {
            registration: self,
            expire_at: now + config.registration_ttl(),
        };
        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret()),
        )?;
        Ok(Cookie::build(REGISTRATION_COOKIE, token)
            .max_age(Duration::seconds(config.registration_ttl().num_seconds()))
            .http_only(true)
            .same_site(SameSite::Strict)
            .path("/")
            .finish())
    }

    /// Deserialize a registration token from a cookie.
    pub fn from_cookie(cookie: &Cookie<'static>, config: &Config) -> Result<Self> {
        let registration = jsonwebtoken::decode(
            cookie.value(),
            &DecodingKey::from_secret(config.jwt_secret()),
            &Validation::default(),
        )
        .map(|claims: TokenData<Claims>| claims.claims.registration)?;
        Ok(registration)
    }
}

/// Cookie claims: the registration itself plus an expiry datetime.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    #[serde(flatten)]
    registration: RegistrationToken,
    #[serde(rename = "exp", with = "ts_seconds")]
    expire_at: DateTime<Utc>,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for RegistrationToken {
    type Error = Error;

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        // Unwrap is safe as `Config` is always managed.
        let config = req.guard::<&State<Config>>().await.unwrap();

        let Some(cookie) = req.cookies().get_private(REGISTRATION_COOKIE) else {
            return Error::Authentication("Verify an OTP before registering".to_string())
                .fail(req);
        };
        match Self::from_cookie(&cookie, config) {
            Ok(registration) => request::Outcome::Success(registration),
            Err(_) => Error::Authentication(
                "The registration window has closed, verify a new OTP".to_string(),
            )
            .fail(req),
        }
    }
}
