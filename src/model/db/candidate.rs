use std::ops::{Deref, DerefMut};

use mongodb::{
    bson::{doc, to_document, DateTime},
    options::FindOptions,
};
use rocket::futures::TryStreamExt;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    common::CandidateStatus,
    mongodb::{Coll, Id},
};

/// Core candidate data, as stored in the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateCore {
    pub name: String,
    pub party: String,
    pub photo: Option<String>,
    pub symbol: String,
    pub area: String,
    pub biography: String,
    pub education: String,
    pub status: CandidateStatus,
}

impl CandidateCore {
    /// Check the required fields are present.
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("name", &self.name),
            ("party", &self.party),
            ("symbol", &self.symbol),
            ("area", &self.area),
        ] {
            if value.trim().is_empty() {
                return Err(Error::validation(format!(
                    "Candidate {field} must not be empty"
                )));
            }
        }
        Ok(())
    }
}

/// A candidate without an ID.
pub type NewCandidate = CandidateCore;

/// A candidate from the directory, with its unique ID and bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub candidate: CandidateCore,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Deref for Candidate {
    type Target = CandidateCore;

    fn deref(&self) -> &Self::Target {
        &self.candidate
    }
}

impl DerefMut for Candidate {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.candidate
    }
}

impl Candidate {
    /// Validate and insert a new candidate.
    pub async fn create(candidates: &Coll<Candidate>, candidate: NewCandidate) -> Result<Candidate> {
        candidate.validate()?;
        let now = DateTime::now();
        let candidate = Candidate {
            id: Id::new(),
            candidate,
            created_at: now,
            updated_at: now,
        };
        candidates.insert_one(&candidate, None).await?;
        info!("Created candidate {} ({})", candidate.id, candidate.name);
        Ok(candidate)
    }

    pub async fn find_by_id(candidates: &Coll<Candidate>, id: Id) -> Result<Candidate> {
        candidates
            .find_one(id.as_doc(), None)
            .await?
            .ok_or_else(|| Error::not_found(format!("Candidate {id}")))
    }

    /// All candidates, optionally only those standing in `area`, by name.
    pub async fn list(candidates: &Coll<Candidate>, area: Option<&str>) -> Result<Vec<Candidate>> {
        let filter = area.map(|area| doc! { "area": area });
        let options = FindOptions::builder().sort(doc! { "name": 1 }).build();
        Ok(candidates.find(filter, options).await?.try_collect().await?)
    }

    /// Replace the directory entry's details.
    ///
    /// Ballots keep the snapshot they took when the candidate was added, so
    /// this never changes what a ballot shows.
    pub async fn update(
        candidates: &Coll<Candidate>,
        id: Id,
        candidate: NewCandidate,
    ) -> Result<Candidate> {
        candidate.validate()?;
        let mut fields = to_document(&candidate)?;
        fields.insert("updated_at", DateTime::now());
        let result = candidates
            .update_one(id.as_doc(), doc! { "$set": fields }, None)
            .await?;
        if result.matched_count == 0 {
            return Err(Error::not_found(format!("Candidate {id}")));
        }
        Self::find_by_id(candidates, id).await
    }

    pub async fn delete(candidates: &Coll<Candidate>, id: Id) -> Result<()> {
        let result = candidates.delete_one(id.as_doc(), None).await?;
        if result.deleted_count == 0 {
            Err(Error::not_found(format!("Candidate {id}")))
        } else {
            Ok(())
        }
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl CandidateCore {
        pub fn example() -> Self {
            Self {
                name: "Sheikh Anwar".to_string(),
                party: "Nouka Jote".to_string(),
                photo: Some("https://img.example.com/anwar.jpg".to_string()),
                symbol: "Boat".to_string(),
                area: "Dhaka-10".to_string(),
                biography: "Two-term ward councillor.".to_string(),
                education: "MA, University of Dhaka".to_string(),
                status: CandidateStatus::Active,
            }
        }

        pub fn example2() -> Self {
            Self {
                name: "Mirza Selim".to_string(),
                party: "Dhaner Shish Dal".to_string(),
                photo: None,
                symbol: "Sheaf of Paddy".to_string(),
                area: "Dhaka-10".to_string(),
                biography: "Businessman and philanthropist.".to_string(),
                education: "BCom".to_string(),
                status: CandidateStatus::Active,
            }
        }

        pub fn example_inactive() -> Self {
            Self {
                name: "Retired Candidate".to_string(),
                status: CandidateStatus::Inactive,
                ..Self::example()
            }
        }
    }
}
