mod registration;
mod request;
mod token;
mod user;

pub use registration::{RegistrationToken, REGISTRATION_COOKIE};
pub use request::{
    AdminCredentials, AdminLoginResponse, CitizenLoginResponse, LoginRequest, OtpIssued,
    PrecheckRequest, PrecheckResponse, RegisterRequest, SendOtpRequest, VerifyOtpRequest,
};
pub use token::{auth_cookie, AuthToken, AUTH_TOKEN_COOKIE};
pub use user::{Rights, User};
