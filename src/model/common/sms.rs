use std::{ops::Deref, str::FromStr};

use phonenumber::{country, Mode, PhoneNumber};
use serde::{Deserialize, Serialize};

/// A citizen's SMS number. Numbers without a country code are read as
/// Bangladeshi, so both `01712345678` and `+8801712345678` are accepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Sms {
    inner: PhoneNumber,
}

/// Numbers are equal when they reach the same phone, however they were
/// written.
impl PartialEq for Sms {
    fn eq(&self, other: &Self) -> bool {
        self.inner.country().code() == other.inner.country().code()
            && self.inner.national() == other.inner.national()
    }
}

impl Eq for Sms {}

impl Deref for Sms {
    type Target = PhoneNumber;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl Sms {
    /// The number in E.164 form, as required by the SMS gateway.
    pub fn e164(&self) -> String {
        self.inner.format().mode(Mode::E164).to_string()
    }

    /// The number with all but the last three digits hidden, safe to echo
    /// back to an unauthenticated caller.
    pub fn masked(&self) -> String {
        let digits = self.e164();
        let visible = digits.len().saturating_sub(3);
        digits
            .chars()
            .enumerate()
            .map(|(i, c)| if i < visible && i > 3 { '*' } else { c })
            .collect()
    }
}

impl FromStr for Sms {
    type Err = phonenumber::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Sms {
            inner: phonenumber::parse(Some(country::Id::BD), s)?,
        })
    }
}

impl TryFrom<String> for Sms {
    type Error = phonenumber::ParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Sms> for String {
    fn from(sms: Sms) -> Self {
        sms.e164()
    }
}
