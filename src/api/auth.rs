use aws_sdk_sns::Client as SnsClient;
use chrono::Utc;
use rocket::{
    http::{Cookie, CookieJar, Status},
    serde::json::Json,
    Route, State,
};

use crate::{
    error::{Error, Result},
    model::{
        api::{
            account::AccountDescription,
            auth::{
                auth_cookie, AuthToken, CitizenLoginResponse, LoginRequest, OtpIssued,
                PrecheckRequest, PrecheckResponse, RegisterRequest, RegistrationToken,
                SendOtpRequest, VerifyOtpRequest, AUTH_TOKEN_COOKIE, REGISTRATION_COOKIE,
            },
        },
        common::{Code, Sms},
        db::{account::Account, citizen::Citizen, otp::OtpRecord},
        mongodb::Coll,
    },
    Config,
};

pub fn routes() -> Vec<Route> {
    routes![precheck, send_otp, verify_otp, register, login, me, logout]
}

/// The citizen's number as recorded on the roll.
fn sms_for(citizen: &Citizen) -> Result<Sms> {
    citizen.mobile.parse().map_err(|e| {
        Error::Sms(format!(
            "Citizen {} has an unusable mobile number: {e}",
            citizen.nid
        ))
    })
}

#[post("/api/auth/precheck", data = "<request>", format = "json")]
pub async fn precheck(
    request: Json<PrecheckRequest>,
    citizens: Coll<Citizen>,
) -> Result<Json<PrecheckResponse>> {
    let citizen = Citizen::precheck(&citizens, &request.nid, request.dob).await?;
    let mobile = sms_for(&citizen)?.masked();
    let Citizen { citizen, .. } = citizen;
    Ok(Json(PrecheckResponse {
        name: citizen.name,
        voting_area: citizen.voting_area,
        mobile,
    }))
}

#[cfg_attr(test, allow(unused_variables))]
#[post("/api/auth/send-otp", data = "<request>", format = "json")]
pub async fn send_otp(
    request: Json<SendOtpRequest>,
    citizens: Coll<Citizen>,
    otps: Coll<OtpRecord>,
    config: &State<Config>,
    sender: &State<SnsClient>,
) -> Result<Json<OtpIssued>> {
    let citizen = Citizen::find_by_nid(&citizens, &request.nid).await?;
    if citizen.is_registered {
        return Err(Error::AlreadyRegistered(citizen.nid.to_string()));
    }
    let sms = sms_for(&citizen)?;

    let code = OtpRecord::issue(&otps, &citizen.nid, Utc::now(), config).await?;

    #[cfg(not(test))]
    sender
        .publish()
        .phone_number(sms.e164())
        .message(format!("Your Nirapod Vote verification code is {code}"))
        .send()
        .await
        .map_err(|e| Error::Sms(format!("Failed to send OTP for NID {}: {e}", citizen.nid)))?;

    Ok(Json(OtpIssued {
        mobile: sms.masked(),
        expires_in: config.otp_ttl().num_seconds(),
        #[cfg(test)]
        code,
    }))
}

#[post("/api/auth/verify-otp", data = "<request>", format = "json")]
pub async fn verify_otp(
    request: Json<VerifyOtpRequest>,
    otps: Coll<OtpRecord>,
    cookies: &CookieJar<'_>,
    config: &State<Config>,
) -> Result<()> {
    let code: Code = request
        .otp
        .trim()
        .parse()
        .map_err(|e| Error::validation(format!("Malformed OTP: {e}")))?;
    let now = Utc::now();
    OtpRecord::verify(&otps, &request.nid, &code, now, config).await?;

    let registration = RegistrationToken::new(request.0.nid);
    cookies.add_private(registration.into_cookie(now, config)?);
    Ok(())
}

#[post("/api/auth/register", data = "<request>", format = "json")]
pub async fn register(
    request: Json<RegisterRequest>,
    registration: RegistrationToken,
    cookies: &CookieJar<'_>,
    accounts: Coll<Account>,
    citizens: Coll<Citizen>,
) -> Result<Json<AccountDescription>> {
    if registration.nid != request.nid {
        return Err(Error::Authentication(format!(
            "No OTP has been verified for NID {}",
            request.nid
        )));
    }

    let account = Account::register(&accounts, &citizens, &request.nid, &request.password).await?;
    cookies.remove_private(Cookie::named(REGISTRATION_COOKIE));
    Ok(Json(account.into()))
}

#[post("/api/auth/login", data = "<request>", format = "json")]
pub async fn login(
    request: Json<LoginRequest>,
    cookies: &CookieJar<'_>,
    accounts: Coll<Account>,
    config: &State<Config>,
) -> Result<Json<CitizenLoginResponse>> {
    let account = Account::login(&accounts, &request.nid, &request.password).await?;
    let token = AuthToken::new(&account).encode(Utc::now(), config)?;
    cookies.add(auth_cookie(token.clone(), config));
    info!("NID {} logged in", account.nid);

    Ok(Json(CitizenLoginResponse {
        token,
        account: account.into(),
    }))
}

#[get("/api/auth/me")]
pub async fn me(
    token: AuthToken<Account>,
    accounts: Coll<Account>,
) -> Result<Json<AccountDescription>> {
    let account = Account::find_by_id(&accounts, token.id).await?;
    Ok(Json(account.into()))
}

#[post("/api/auth/logout")]
pub fn logout(cookies: &CookieJar<'_>) -> Status {
    cookies.remove(Cookie::named(AUTH_TOKEN_COOKIE));
    Status::Ok
}
