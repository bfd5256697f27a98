use std::ops::{Deref, DerefMut};

use chrono::NaiveDate;
use mongodb::bson::doc;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    common::Nid,
    mongodb::{is_duplicate_key_error, Coll, Id},
};

/// An entry on the citizen roll, as stored in the database.
///
/// The roll is imported by administrators; the only field the application
/// ever changes is `is_registered`, and only from false to true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitizenCore {
    pub nid: Nid,
    pub name: String,
    pub father_name: String,
    pub mother_name: String,
    pub dob: NaiveDate,
    pub mobile: String,
    pub voting_area: String,
    #[serde(default)]
    pub is_registered: bool,
}

/// A citizen without an ID.
pub type NewCitizen = CitizenCore;

/// A citizen from the database, with its unique ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Citizen {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub citizen: CitizenCore,
}

impl Deref for Citizen {
    type Target = CitizenCore;

    fn deref(&self) -> &Self::Target {
        &self.citizen
    }
}

impl DerefMut for Citizen {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.citizen
    }
}

/// Outcome of importing a batch of roll entries.
#[derive(Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub inserted: usize,
    pub skipped: Vec<Nid>,
}

impl Citizen {
    /// Look up a citizen by NID.
    pub async fn find_by_nid(citizens: &Coll<Citizen>, nid: &Nid) -> Result<Citizen> {
        citizens
            .find_one(doc! { "nid": nid }, None)
            .await?
            .ok_or_else(|| Error::not_found(format!("Citizen with NID {nid}")))
    }

    /// Find the citizen with exactly this NID and date of birth, provided
    /// they have not registered yet.
    pub async fn precheck(citizens: &Coll<Citizen>, nid: &Nid, dob: NaiveDate) -> Result<Citizen> {
        let filter = doc! {
            "nid": nid,
            "dob": dob.to_string(),
        };
        let citizen = citizens.find_one(filter, None).await?.ok_or_else(|| {
            Error::not_found("Citizen with the given NID and date of birth".to_string())
        })?;
        if citizen.is_registered {
            return Err(Error::AlreadyRegistered(nid.to_string()));
        }
        Ok(citizen)
    }

    /// Flip `is_registered` to true. Fails if it was already true, so that
    /// of two racing registrations only one can win.
    pub async fn mark_registered(citizens: &Coll<Citizen>, nid: &Nid) -> Result<()> {
        let filter = doc! {
            "nid": nid,
            "is_registered": false,
        };
        let update = doc! {
            "$set": { "is_registered": true },
        };
        let result = citizens.update_one(filter, update, None).await?;
        if result.modified_count == 1 {
            Ok(())
        } else {
            Err(Error::AlreadyRegistered(nid.to_string()))
        }
    }
}

impl NewCitizen {
    /// Seed the roll with the given entries. Entries whose NID is already on
    /// the roll are left untouched and reported back.
    pub async fn import(
        citizens: &Coll<NewCitizen>,
        entries: impl IntoIterator<Item = NewCitizen>,
    ) -> Result<ImportSummary> {
        let mut summary = ImportSummary::default();
        for mut entry in entries {
            // Registration can only ever happen through the application.
            entry.is_registered = false;
            match citizens.insert_one(&entry, None).await {
                Ok(_) => summary.inserted += 1,
                Err(e) if is_duplicate_key_error(&e) => summary.skipped.push(entry.nid),
                Err(e) => return Err(e.into()),
            }
        }
        info!(
            "Imported {} citizens into the roll, skipped {}",
            summary.inserted,
            summary.skipped.len()
        );
        Ok(summary)
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl CitizenCore {
        pub fn example() -> Self {
            Self {
                nid: Nid::example(),
                name: "Rahim Uddin".to_string(),
                father_name: "Karim Uddin".to_string(),
                mother_name: "Fatema Begum".to_string(),
                dob: NaiveDate::from_ymd_opt(1990, 1, 15).unwrap(),
                mobile: "01712345678".to_string(),
                voting_area: "Dhaka-10".to_string(),
                is_registered: false,
            }
        }

        pub fn example2() -> Self {
            Self {
                nid: Nid::example2(),
                name: "Ayesha Khatun".to_string(),
                father_name: "Abdul Malek".to_string(),
                mother_name: "Rokeya Begum".to_string(),
                dob: NaiveDate::from_ymd_opt(1985, 6, 30).unwrap(),
                mobile: "01898765432".to_string(),
                voting_area: "Dhaka-10".to_string(),
                is_registered: false,
            }
        }

        pub fn example_other_area() -> Self {
            Self {
                nid: Nid::example3(),
                name: "Jamal Hossain".to_string(),
                father_name: "Kamal Hossain".to_string(),
                mother_name: "Nasima Akter".to_string(),
                dob: NaiveDate::from_ymd_opt(1978, 12, 1).unwrap(),
                mobile: "01555123456".to_string(),
                voting_area: "Chattogram-9".to_string(),
                is_registered: false,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use mongodb::Database;

    use super::*;

    #[backend_test]
    async fn precheck_and_register_once(db: Database) {
        let new_citizens = Coll::<NewCitizen>::from_db(&db);
        let citizens = Coll::<Citizen>::from_db(&db);
        NewCitizen::import(&new_citizens, [NewCitizen::example()])
            .await
            .unwrap();

        // Wrong date of birth.
        let wrong_dob = NaiveDate::from_ymd_opt(1990, 1, 16).unwrap();
        let err = Citizen::precheck(&citizens, &Nid::example(), wrong_dob)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        // Correct details.
        let citizen = Citizen::precheck(&citizens, &Nid::example(), NewCitizen::example().dob)
            .await
            .unwrap();
        assert_eq!(citizen.citizen, NewCitizen::example());

        // Registration flips exactly once.
        Citizen::mark_registered(&citizens, &Nid::example())
            .await
            .unwrap();
        let err = Citizen::mark_registered(&citizens, &Nid::example())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AlreadyRegistered(_)));

        // And precheck now refuses.
        let err = Citizen::precheck(&citizens, &Nid::example(), NewCitizen::example().dob)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AlreadyRegistered(_)));
    }

    #[backend_test]
    async fn import_skips_existing(db: Database) {
        let new_citizens = Coll::<NewCitizen>::from_db(&db);
        let first = NewCitizen::import(&new_citizens, [NewCitizen::example()])
            .await
            .unwrap();
        assert_eq!(first.inserted, 1);

        let mut changed = NewCitizen::example();
        changed.voting_area = "Elsewhere".to_string();
        changed.is_registered = true;
        let second = NewCitizen::import(&new_citizens, [changed, NewCitizen::example2()])
            .await
            .unwrap();
        assert_eq!(second.inserted, 1);
        assert_eq!(second.skipped, vec![Nid::example()]);

        // The original entry was not overwritten.
        let stored = Citizen::find_by_nid(&new_citizens.clone_with_type(), &Nid::example())
            .await
            .unwrap();
        assert_eq!(stored.voting_area, "Dhaka-10");
        assert!(!stored.is_registered);
    }
}
