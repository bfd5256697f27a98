use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::{api::account::AccountDescription, common::Nid};
#[cfg(test)]
use crate::model::common::Code;

/// Check that an NID and date of birth match the citizen roll.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrecheckRequest {
    pub nid: Nid,
    pub dob: NaiveDate,
}

/// What an unauthenticated caller may learn about a matching citizen.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrecheckResponse {
    pub name: String,
    pub voting_area: String,
    pub mobile: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendOtpRequest {
    pub nid: Nid,
}

/// Where the code went and how long it lasts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpIssued {
    pub mobile: String,
    pub expires_in: i64,
    /// Test builds send no SMS, so the code travels back in the response.
    #[cfg(test)]
    pub code: Code,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyOtpRequest {
    pub nid: Nid,
    pub otp: String,
}

/// Raw registration details, received from a user. The password is never
/// stored directly.
#[derive(Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub nid: Nid,
    pub password: String,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub nid: Nid,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CitizenLoginResponse {
    pub token: String,
    pub account: AccountDescription,
}

/// Raw admin credentials, received from a user.
#[derive(Clone, Serialize, Deserialize)]
pub struct AdminCredentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AdminLoginResponse {
    pub token: String,
}
