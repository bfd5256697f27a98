use chrono::{DateTime as ChronoDateTime, Utc};
use data_encoding::HEXLOWER;
use hmac::{Hmac, Mac};
use mongodb::{
    bson::{doc, DateTime},
    options::ReplaceOptions,
};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::{Error, Result};
use crate::model::{
    common::{Code, Nid},
    mongodb::{is_duplicate_key_error, Coll},
};
use crate::Config;

pub type HmacSha256 = Hmac<Sha256>;

/// The live one-time code for an NID. At most one exists per NID; the
/// database removes it some time after `expire_at`, and verification
/// ignores it from `expire_at` onwards regardless.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OtpRecord {
    pub nid: Nid,
    /// Hex HMAC of `nid:code`; the code itself is never stored.
    pub code_hmac: String,
    pub expire_at: DateTime,
    pub consumed: bool,
    pub created_at: DateTime,
}

impl OtpRecord {
    fn code_hmac(nid: &Nid, code: &Code, config: &Config) -> String {
        let mut hmac = HmacSha256::new_from_slice(config.hmac_secret())
            .expect("HMAC can take key of any size");
        hmac.update(nid.as_bytes());
        hmac.update(b":");
        hmac.update(code.to_string().as_bytes());
        HEXLOWER.encode(&hmac.finalize().into_bytes())
    }

    /// Generate a fresh code for `nid`, replacing any previous code.
    pub async fn issue(
        otps: &Coll<OtpRecord>,
        nid: &Nid,
        now: ChronoDateTime<Utc>,
        config: &Config,
    ) -> Result<Code> {
        let code = Code::random();
        let record = OtpRecord {
            nid: nid.clone(),
            code_hmac: Self::code_hmac(nid, &code, config),
            expire_at: DateTime::from_chrono(now + config.otp_ttl()),
            consumed: false,
            created_at: DateTime::from_chrono(now),
        };

        let filter = doc! { "nid": nid };
        let upsert = ReplaceOptions::builder().upsert(true).build();
        let result = otps
            .replace_one(filter.clone(), &record, upsert.clone())
            .await;
        match result {
            Ok(_) => {}
            // Two concurrent upserts for a new NID; the other one has now
            // created the document, so a second replace will match it.
            Err(e) if is_duplicate_key_error(&e) => {
                otps.replace_one(filter, &record, upsert).await?;
            }
            Err(e) => return Err(e.into()),
        }

        info!("Issued OTP for NID {nid}");
        Ok(code)
    }

    /// Consume the code for `nid`. Succeeds at most once per issued code,
    /// and only before it expires.
    pub async fn verify(
        otps: &Coll<OtpRecord>,
        nid: &Nid,
        code: &Code,
        now: ChronoDateTime<Utc>,
        config: &Config,
    ) -> Result<()> {
        let filter = doc! {
            "nid": nid,
            "code_hmac": Self::code_hmac(nid, code, config),
            "consumed": false,
            "expire_at": { "$gt": DateTime::from_chrono(now) },
        };
        let update = doc! {
            "$set": { "consumed": true },
        };
        match otps.find_one_and_update(filter, update, None).await? {
            Some(_) => {
                info!("Verified OTP for NID {nid}");
                Ok(())
            }
            None => {
                warn!("Rejected OTP for NID {nid}");
                Err(Error::InvalidOrExpiredOtp)
            }
        }
    }
}
