use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{api::id::ApiId, common::Nid, db::account::Account};

/// A citizen's own view of their account. Never includes the password hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountDescription {
    pub id: ApiId,
    pub nid: Nid,
    pub name: String,
    pub father_name: String,
    pub mother_name: String,
    pub dob: NaiveDate,
    pub mobile: String,
    pub voting_area: String,
    pub is_verified: bool,
    pub has_voted: bool,
    pub voted_at: Option<DateTime<Utc>>,
    pub voted_candidate: Option<ApiId>,
    pub last_login: Option<DateTime<Utc>>,
}

impl From<Account> for AccountDescription {
    fn from(account: Account) -> Self {
        let Account { id, account } = account;
        Self {
            id: id.into(),
            nid: account.nid,
            name: account.name,
            father_name: account.father_name,
            mother_name: account.mother_name,
            dob: account.dob,
            mobile: account.mobile,
            voting_area: account.voting_area,
            is_verified: account.is_verified,
            has_voted: account.has_voted,
            voted_at: account.voted_at.map(|t| t.to_chrono()),
            voted_candidate: account.voted_candidate.map(ApiId::from),
            last_login: account.last_login.map(|t| t.to_chrono()),
        }
    }
}
