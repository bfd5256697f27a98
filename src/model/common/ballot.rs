use chrono::{DateTime, Utc};
use mongodb::bson::{to_bson, Bson};
use serde::{Deserialize, Serialize};

/// Stages in a ballot's lifecycle. The order of the variants is the only
/// order in which a ballot may move: upcoming, then active, then completed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BallotStatus {
    /// Voting has not opened yet.
    Upcoming,
    /// Voting is open.
    Active,
    /// Voting has closed.
    Completed,
}

impl BallotStatus {
    /// The status of a ballot with the window `[start, end]` at time `now`.
    ///
    /// Both ends of the window are inclusive. This is the only source of
    /// truth for a ballot's status: any stored status is a hint at best.
    pub fn at(now: DateTime<Utc>, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        if now < start {
            Self::Upcoming
        } else if now <= end {
            Self::Active
        } else {
            Self::Completed
        }
    }
}

impl From<BallotStatus> for Bson {
    fn from(status: BallotStatus) -> Self {
        to_bson(&status).expect("Serialisation is infallible")
    }
}

/// Whether a candidate can currently be placed on ballots.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateStatus {
    #[default]
    Active,
    Inactive,
}

impl From<CandidateStatus> for Bson {
    fn from(status: CandidateStatus) -> Self {
        to_bson(&status).expect("Serialisation is infallible")
    }
}
