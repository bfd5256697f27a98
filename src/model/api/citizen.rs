use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::{common::Nid, db::citizen::NewCitizen};

/// One entry of a citizen roll import.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CitizenRecord {
    pub nid: Nid,
    pub name: String,
    pub father_name: String,
    pub mother_name: String,
    pub dob: NaiveDate,
    pub mobile: String,
    pub voting_area: String,
}

impl From<CitizenRecord> for NewCitizen {
    fn from(record: CitizenRecord) -> Self {
        Self {
            nid: record.nid,
            name: record.name,
            father_name: record.father_name,
            mother_name: record.mother_name,
            dob: record.dob,
            mobile: record.mobile,
            voting_area: record.voting_area,
            is_registered: false,
        }
    }
}

#[cfg(test)]
mod examples {
    use super::*;

    impl From<NewCitizen> for CitizenRecord {
        fn from(citizen: NewCitizen) -> Self {
            Self {
                nid: citizen.nid,
                name: citizen.name,
                father_name: citizen.father_name,
                mother_name: citizen.mother_name,
                dob: citizen.dob,
                mobile: citizen.mobile,
                voting_area: citizen.voting_area,
            }
        }
    }
}
