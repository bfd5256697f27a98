use std::collections::{HashMap, HashSet};
use std::net::IpAddr;
use std::ops::Deref;

use chrono::{DateTime as ChronoDateTime, Utc};
use mongodb::bson::{doc, from_document, DateTime};
use rocket::futures::TryStreamExt;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    common::{BallotStatus, Nid},
    mongodb::{is_duplicate_key_error, Coll, Id},
};

use super::{account::Account, ballot::Ballot};

/// A cast vote. Votes are never updated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteCore {
    pub ballot_id: Id,
    pub candidate_id: Id,
    pub voter_nid: Nid,
    pub cast_at: DateTime,
    pub ip: Option<String>,
}

/// A vote from the ledger, with its unique ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vote {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub vote: VoteCore,
}

impl Deref for Vote {
    type Target = VoteCore;

    fn deref(&self) -> &Self::Target {
        &self.vote
    }
}

/// One row of the per-candidate tally aggregation.
#[derive(Debug, Deserialize)]
struct TallyRow {
    #[serde(rename = "_id")]
    candidate_id: Id,
    count: u64,
}

impl Vote {
    /// Record `voter`'s vote for `candidate_id` in `ballot_id`.
    ///
    /// The ballot must be active at `now`, the candidate must be on it, and
    /// the ballot must be held in the voter's area. The vote itself is a
    /// single insert that the unique `(ballot_id, voter_nid)` index turns
    /// away if the voter already has a vote in this ballot, so concurrent
    /// attempts for the same pair yield exactly one vote.
    #[allow(clippy::too_many_arguments)]
    pub async fn cast(
        ballots: &Coll<Ballot>,
        votes: &Coll<Vote>,
        accounts: &Coll<Account>,
        voter: &Account,
        ballot_id: Id,
        candidate_id: Id,
        ip: Option<IpAddr>,
        now: ChronoDateTime<Utc>,
    ) -> Result<Vote> {
        let ballot = Ballot::find_by_id(ballots, ballot_id).await?;

        let status = ballot.status_at(now);
        if status != BallotStatus::Active {
            return Err(Error::VotingNotOpen(ballot_id, status));
        }

        if ballot.candidate(candidate_id).is_none() {
            return Err(Error::InvalidCandidate(candidate_id, ballot_id));
        }

        if ballot.location != voter.voting_area {
            return Err(Error::Forbidden(format!(
                "Ballot {ballot_id} is not held in your voting area"
            )));
        }

        let cast_at = DateTime::from_chrono(now);
        let vote = Vote {
            id: Id::new(),
            vote: VoteCore {
                ballot_id,
                candidate_id,
                voter_nid: voter.nid.clone(),
                cast_at,
                ip: ip.map(|ip| ip.to_string()),
            },
        };
        match votes.insert_one(&vote, None).await {
            Ok(_) => {}
            Err(e) if is_duplicate_key_error(&e) => {
                warn!(
                    "Rejected repeat vote by NID {} in ballot {ballot_id}",
                    voter.nid
                );
                return Err(Error::AlreadyVoted(ballot_id));
            }
            Err(e) => return Err(e.into()),
        }
        info!("NID {} voted in ballot {ballot_id}", voter.nid);

        // Informational copy on the account; the vote above is what counts.
        let update = doc! {
            "$set": {
                "has_voted": true,
                "voted_at": cast_at,
                "voted_candidate": candidate_id,
            },
        };
        if let Err(e) = accounts.update_one(voter.id.as_doc(), update, None).await {
            warn!("Vote recorded but account {} not updated: {e}", voter.id);
        }

        Ok(vote)
    }

    /// Whether `voter_nid` has a vote in `ballot_id`.
    pub async fn has_voted(votes: &Coll<Vote>, ballot_id: Id, voter_nid: &Nid) -> Result<bool> {
        let filter = doc! {
            "ballot_id": ballot_id,
            "voter_nid": voter_nid,
        };
        Ok(votes.find_one(filter, None).await?.is_some())
    }

    /// Which of `ballot_ids` `voter_nid` has voted in.
    pub async fn voted_ballots(
        votes: &Coll<Vote>,
        voter_nid: &Nid,
        ballot_ids: &[Id],
    ) -> Result<HashSet<Id>> {
        if ballot_ids.is_empty() {
            return Ok(HashSet::new());
        }
        let filter = doc! {
            "voter_nid": voter_nid,
            "ballot_id": { "$in": ballot_ids.iter().copied().collect::<Vec<_>>() },
        };
        let voted: Vec<Vote> = votes.find(filter, None).await?.try_collect().await?;
        Ok(voted.into_iter().map(|v| v.ballot_id).collect())
    }

    /// Number of votes per candidate in `ballot_id`. Candidates without votes
    /// are absent.
    pub async fn tally(votes: &Coll<Vote>, ballot_id: Id) -> Result<HashMap<Id, u64>> {
        let pipeline = [
            doc! { "$match": { "ballot_id": ballot_id } },
            doc! { "$group": { "_id": "$candidate_id", "count": { "$sum": 1 } } },
        ];
        let mut cursor = votes.aggregate(pipeline, None).await?;
        let mut tally = HashMap::new();
        while let Some(row) = cursor.try_next().await? {
            let row: TallyRow = from_document(row)?;
            tally.insert(row.candidate_id, row.count);
        }
        Ok(tally)
    }
}
