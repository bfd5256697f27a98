use argon2::Error as Argon2Error;
use jsonwebtoken::errors::{Error as JwtError, ErrorKind as JwtErrorKind};
use mongodb::{
    bson::{de::Error as BsonDeError, ser::Error as BsonError},
    error::Error as DbError,
};
use rocket::{
    http::Status,
    request::{self, Outcome},
    response::Responder,
    serde::json::Json,
    Catcher, Request,
};
use serde::Serialize;
use thiserror::Error;

use crate::model::{common::BallotStatus, mongodb::Id};

pub type Result<T> = std::result::Result<T, Error>;

/// Message shown in place of internal faults.
const RETRY_LATER: &str = "Something went wrong on our side, please try again later";

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("NID {0} is already registered")]
    AlreadyRegistered(String),
    #[error("You have already voted in ballot {0}")]
    AlreadyVoted(Id),
    #[error("{0} already exists")]
    Duplicate(String),
    #[error("The OTP is invalid or has expired, please request a new one")]
    InvalidOrExpiredOtp,
    #[error("Voting in ballot {0} is not open (ballot is {1:?})")]
    VotingNotOpen(Id, BallotStatus),
    #[error("Candidate {0} is not on ballot {1}")]
    InvalidCandidate(Id, Id),
    #[error("{0}")]
    Authentication(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("SMS gateway failure: {0}")]
    Sms(String),
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Bson(#[from] BsonError),
    #[error(transparent)]
    BsonDe(#[from] BsonDeError),
    #[error(transparent)]
    Jwt(#[from] JwtError),
    #[error(transparent)]
    Argon2(#[from] Argon2Error),
}

impl Error {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation(reason.into())
    }

    /// The HTTP status this error is reported with.
    pub fn status(&self) -> Status {
        match self {
            Self::Validation(_)
            | Self::AlreadyRegistered(_)
            | Self::AlreadyVoted(_)
            | Self::Duplicate(_)
            | Self::VotingNotOpen(..)
            | Self::InvalidCandidate(..) => Status::BadRequest,
            Self::NotFound(_) => Status::NotFound,
            Self::InvalidOrExpiredOtp | Self::Authentication(_) => Status::Unauthorized,
            Self::Forbidden(_) => Status::Forbidden,
            Self::Jwt(err) => match err.kind() {
                JwtErrorKind::ExpiredSignature
                | JwtErrorKind::ImmatureSignature
                | JwtErrorKind::InvalidSignature
                | JwtErrorKind::InvalidToken => Status::Unauthorized,
                _ => Status::InternalServerError,
            },
            Self::Db(_) | Self::Bson(_) | Self::BsonDe(_) | Self::Argon2(_) | Self::Sms(_) => {
                Status::InternalServerError
            }
        }
    }

    /// The stable, machine-readable name of this kind of error.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "ValidationError",
            Self::NotFound(_) => "NotFoundError",
            Self::AlreadyRegistered(_) => "AlreadyRegisteredError",
            Self::AlreadyVoted(_) => "AlreadyVotedError",
            Self::Duplicate(_) => "DuplicateError",
            Self::InvalidOrExpiredOtp => "InvalidOrExpiredOtpError",
            Self::VotingNotOpen(..) => "VotingNotOpenError",
            Self::InvalidCandidate(..) => "InvalidCandidateError",
            Self::Authentication(_) | Self::Jwt(_) => "AuthenticationError",
            Self::Forbidden(_) => "ForbiddenError",
            Self::Sms(_) => "SmsGatewayError",
            Self::Db(_) | Self::Bson(_) | Self::BsonDe(_) | Self::Argon2(_) => "StorageError",
        }
    }

    /// The response body for this error, logging it on the way.
    fn body(&self, req: &Request<'_>) -> ErrorBody {
        let message = if self.status() == Status::InternalServerError {
            error!("{} {}: {self}", req.method(), req.uri());
            RETRY_LATER.to_string()
        } else {
            debug!("{} {}: {self}", req.method(), req.uri());
            self.to_string()
        };
        ErrorBody {
            error: self.kind(),
            message,
        }
    }

    /// Fail a request guard with this error. The error is kept with the
    /// request so that the catcher can report it.
    pub fn fail<T>(self, req: &Request<'_>) -> request::Outcome<T, Self> {
        let status = self.status();
        let body = self.body(req);
        req.local_cache(|| GuardFailure(Some((status, body))));
        Outcome::Failure((status, self))
    }
}

/// The JSON body of every error response.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, req: &'r Request<'_>) -> rocket::response::Result<'o> {
        (self.status(), Json(self.body(req))).respond_to(req)
    }
}

/// The first request guard failure of a request, if any.
struct GuardFailure(Option<(Status, ErrorBody)>);

/// Errors raised outside of route handlers: failed guards, unparseable
/// bodies and unknown routes.
#[catch(default)]
fn catch_all(status: Status, req: &Request<'_>) -> (Status, Json<ErrorBody>) {
    if let GuardFailure(Some((failed, body))) = req.local_cache(|| GuardFailure(None)) {
        if *failed == status {
            return (status, Json(body.clone()));
        }
    }
    let (error, message) = match status.code {
        400 => ("ValidationError", "The request is malformed"),
        401 => ("AuthenticationError", "Log in to continue"),
        403 => ("ForbiddenError", "You may not do this"),
        404 => ("NotFoundError", "No such resource"),
        422 => ("ValidationError", "The request body could not be understood"),
        code if code >= 500 => ("InternalError", RETRY_LATER),
        _ => ("RequestError", "The request could not be handled"),
    };
    (
        status,
        Json(ErrorBody {
            error,
            message: message.to_string(),
        }),
    )
}

pub fn catchers() -> Vec<Catcher> {
    catchers![catch_all]
}
