use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::str::FromStr;

use mongodb::bson::Bson;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lengths that a national identification number can have: the legacy
/// 13- and 17-digit forms and the 10-digit smart card form.
pub const VALID_LENGTHS: [usize; 3] = [10, 13, 17];

/// A national identification number. Always a string of digits of one of
/// the [`VALID_LENGTHS`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Nid(String);

impl Deref for Nid {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for Nid {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Nid {
    type Err = NidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(c) = s.chars().find(|c| !c.is_ascii_digit()) {
            return Err(NidError::InvalidChar(c));
        }
        if !VALID_LENGTHS.contains(&s.len()) {
            return Err(NidError::InvalidLength(s.len()));
        }
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for Nid {
    type Error = NidError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Nid> for String {
    fn from(nid: Nid) -> Self {
        nid.0
    }
}

impl From<Nid> for Bson {
    fn from(nid: Nid) -> Self {
        Bson::String(nid.0)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NidError {
    #[error("NID must be 10, 13 or 17 digits long, got {0}")]
    InvalidLength(usize),
    #[error("NID must only contain digits, found '{0}'")]
    InvalidChar(char),
}
