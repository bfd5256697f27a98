use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    api::id::ApiId,
    common::BallotStatus,
    db::ballot::{Ballot, BallotResults, CandidateSnapshot, VoterBallot},
};

/// A ballot as submitted by an admin.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BallotSpec {
    pub name: String,
    pub location: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    /// Directory candidates to place on the ballot.
    #[serde(default)]
    pub candidates: Vec<ApiId>,
}

/// A new voting window for an existing ballot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BallotDates {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddCandidateRequest {
    pub candidate_id: ApiId,
}

/// A candidate as they appear on a ballot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallotCandidate {
    pub id: ApiId,
    pub name: String,
    pub party: String,
    pub photo: Option<String>,
    pub symbol: String,
}

impl From<CandidateSnapshot> for BallotCandidate {
    fn from(snapshot: CandidateSnapshot) -> Self {
        Self {
            id: snapshot.id.into(),
            name: snapshot.name,
            party: snapshot.party,
            photo: snapshot.photo,
            symbol: snapshot.symbol,
        }
    }
}

/// A ballot with its status as of the time of the request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BallotDescription {
    pub id: ApiId,
    pub name: String,
    pub location: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: BallotStatus,
    pub candidates: Vec<BallotCandidate>,
}

impl BallotDescription {
    pub fn new(ballot: Ballot, now: DateTime<Utc>) -> Self {
        let status = ballot.status_at(now);
        Self::with_status(ballot, status)
    }

    fn with_status(ballot: Ballot, status: BallotStatus) -> Self {
        let Ballot { id, ballot } = ballot;
        Self {
            id: id.into(),
            name: ballot.name,
            location: ballot.location,
            start_date: ballot.start_date,
            end_date: ballot.end_date,
            status,
            candidates: ballot.candidates.into_iter().map(Into::into).collect(),
        }
    }
}

/// A ballot as seen by one citizen.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoterBallotDescription {
    #[serde(flatten)]
    pub ballot: BallotDescription,
    pub has_voted: bool,
}

impl From<VoterBallot> for VoterBallotDescription {
    fn from(voter_ballot: VoterBallot) -> Self {
        Self {
            ballot: BallotDescription::with_status(voter_ballot.ballot, voter_ballot.status),
            has_voted: voter_ballot.has_voted,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateCount {
    pub candidate: BallotCandidate,
    pub votes: u64,
}

/// Vote statistics for one ballot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BallotResultsDescription {
    pub ballot_id: ApiId,
    pub name: String,
    pub status: BallotStatus,
    pub results: Vec<CandidateCount>,
    pub total_votes: u64,
}

impl From<BallotResults> for BallotResultsDescription {
    fn from(results: BallotResults) -> Self {
        Self {
            ballot_id: results.ballot.id.into(),
            name: results.ballot.ballot.name,
            status: results.status,
            results: results
                .counts
                .into_iter()
                .map(|(candidate, votes)| CandidateCount {
                    candidate: candidate.into(),
                    votes,
                })
                .collect(),
            total_votes: results.total,
        }
    }
}
