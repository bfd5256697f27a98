use std::collections::{HashMap, HashSet};
use std::ops::{Deref, DerefMut};

use chrono::{DateTime, SubsecRound, Utc};
use mongodb::{
    bson::{doc, serde_helpers::chrono_datetime_as_bson_datetime},
    options::FindOptions,
};
use rocket::futures::TryStreamExt;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    common::{BallotStatus, CandidateStatus, Nid},
    mongodb::{Coll, Id},
};

use super::{candidate::Candidate, vote::Vote};

/// A candidate as they were when added to a ballot. Later edits to the
/// candidate directory do not reach this copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateSnapshot {
    pub id: Id,
    pub name: String,
    pub party: String,
    pub photo: Option<String>,
    pub symbol: String,
}

impl From<&Candidate> for CandidateSnapshot {
    fn from(candidate: &Candidate) -> Self {
        Self {
            id: candidate.id,
            name: candidate.name.clone(),
            party: candidate.party.clone(),
            photo: candidate.photo.clone(),
            symbol: candidate.symbol.clone(),
        }
    }
}

/// Core ballot data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallotCore {
    pub name: String,
    /// The voting area this ballot is held in.
    pub location: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub start_date: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub end_date: DateTime<Utc>,
    /// Status as of the last write to this ballot. Reads always use
    /// [`BallotCore::status_at`] instead.
    pub status: BallotStatus,
    pub candidates: Vec<CandidateSnapshot>,
}

impl BallotCore {
    /// Build a new ballot, validating its details.
    pub fn new(
        name: &str,
        location: &str,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
        candidates: Vec<CandidateSnapshot>,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        if name.trim().is_empty() {
            return Err(Error::validation("Ballot name must not be empty"));
        }
        if location.trim().is_empty() {
            return Err(Error::validation("Ballot location must not be empty"));
        }
        let (start_date, end_date) = stored_window(start_date, end_date)?;
        let mut seen = HashSet::new();
        if let Some(dup) = candidates.iter().find(|c| !seen.insert(c.id)) {
            return Err(Error::Duplicate(format!("Candidate {} on ballot", dup.id)));
        }

        Ok(Self {
            name: name.trim().to_string(),
            location: location.trim().to_string(),
            start_date,
            end_date,
            status: BallotStatus::at(now, start_date, end_date),
            candidates,
        })
    }

    /// The status of this ballot at `now`.
    pub fn status_at(&self, now: DateTime<Utc>) -> BallotStatus {
        BallotStatus::at(now, self.start_date, self.end_date)
    }

    /// Find a candidate on this ballot.
    pub fn candidate(&self, id: Id) -> Option<&CandidateSnapshot> {
        self.candidates.iter().find(|c| c.id == id)
    }
}

/// Dates are stored with millisecond precision; truncate so that what is
/// returned matches what is stored.
fn stored_window(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let (start, end) = (start.trunc_subsecs(3), end.trunc_subsecs(3));
    validate_window(start, end)?;
    Ok((start, end))
}

fn validate_window(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<()> {
    if end <= start {
        return Err(Error::validation(
            "Ballot end date must be after its start date",
        ));
    }
    Ok(())
}

/// A ballot from the database, with its unique ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ballot {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub ballot: BallotCore,
}

impl Deref for Ballot {
    type Target = BallotCore;

    fn deref(&self) -> &Self::Target {
        &self.ballot
    }
}

impl DerefMut for Ballot {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.ballot
    }
}

/// A ballot as seen by one citizen.
#[derive(Debug, Clone)]
pub struct VoterBallot {
    pub ballot: Ballot,
    pub status: BallotStatus,
    pub has_voted: bool,
}

/// Vote counts for one ballot.
#[derive(Debug, Clone)]
pub struct BallotResults {
    pub ballot: Ballot,
    pub status: BallotStatus,
    /// Every candidate on the ballot with their count, in ballot order.
    pub counts: Vec<(CandidateSnapshot, u64)>,
    pub total: u64,
}

/// Look up candidates by ID for placing on a ballot: each must exist and be
/// active.
async fn snapshot_candidates(
    candidates: &Coll<Candidate>,
    ids: &[Id],
) -> Result<Vec<CandidateSnapshot>> {
    let mut snapshots = Vec::with_capacity(ids.len());
    for id in ids {
        let candidate = Candidate::find_by_id(candidates, *id).await?;
        if candidate.status != CandidateStatus::Active {
            return Err(Error::validation(format!(
                "Candidate {id} is inactive and cannot be placed on a ballot"
            )));
        }
        snapshots.push(CandidateSnapshot::from(&candidate));
    }
    Ok(snapshots)
}

impl Ballot {
    /// Create a ballot with the given candidates, copied from the directory.
    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        ballots: &Coll<Ballot>,
        candidates: &Coll<Candidate>,
        name: &str,
        location: &str,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
        candidate_ids: &[Id],
        now: DateTime<Utc>,
    ) -> Result<Ballot> {
        // Validate the cheap things before touching the directory.
        BallotCore::new(name, location, start_date, end_date, Vec::new(), now)?;
        let snapshots = snapshot_candidates(candidates, candidate_ids).await?;
        let ballot = Ballot {
            id: Id::new(),
            ballot: BallotCore::new(name, location, start_date, end_date, snapshots, now)?,
        };
        ballots.insert_one(&ballot, None).await?;
        info!(
            "Created ballot {} '{}' for {} ({:?})",
            ballot.id, ballot.name, ballot.location, ballot.status
        );
        Ok(ballot)
    }

    pub async fn find_by_id(ballots: &Coll<Ballot>, id: Id) -> Result<Ballot> {
        ballots
            .find_one(id.as_doc(), None)
            .await?
            .ok_or_else(|| Error::not_found(format!("Ballot {id}")))
    }

    /// All ballots, soonest first.
    pub async fn list_all(ballots: &Coll<Ballot>) -> Result<Vec<Ballot>> {
        let options = FindOptions::builder().sort(doc! { "start_date": 1 }).build();
        Ok(ballots.find(None, options).await?.try_collect().await?)
    }

    /// The ballots held in `area`, each with its status at `now` and whether
    /// `voter_nid` has voted in it according to the vote ledger.
    pub async fn list_for_area(
        ballots: &Coll<Ballot>,
        votes: &Coll<Vote>,
        area: &str,
        voter_nid: &Nid,
        now: DateTime<Utc>,
    ) -> Result<Vec<VoterBallot>> {
        let options = FindOptions::builder().sort(doc! { "start_date": 1 }).build();
        let area_ballots: Vec<Ballot> = ballots
            .find(doc! { "location": area }, options)
            .await?
            .try_collect()
            .await?;
        let ids: Vec<Id> = area_ballots.iter().map(|b| b.id).collect();
        let voted = Vote::voted_ballots(votes, voter_nid, &ids).await?;

        Ok(area_ballots
            .into_iter()
            .map(|ballot| VoterBallot {
                status: ballot.status_at(now),
                has_voted: voted.contains(&ballot.id),
                ballot,
            })
            .collect())
    }

    /// Copy a directory candidate onto a ballot.
    ///
    /// The check for an existing entry is part of the update filter, so the
    /// same candidate can never be added twice.
    pub async fn add_candidate(
        ballots: &Coll<Ballot>,
        candidates: &Coll<Candidate>,
        ballot_id: Id,
        candidate_id: Id,
        now: DateTime<Utc>,
    ) -> Result<Ballot> {
        let ballot = Self::find_by_id(ballots, ballot_id).await?;
        if ballot.status_at(now) == BallotStatus::Completed {
            return Err(Error::validation(format!(
                "Ballot {ballot_id} has completed, its candidates are final"
            )));
        }
        let snapshot = snapshot_candidates(candidates, &[candidate_id])
            .await?
            .remove(0);

        let filter = doc! {
            "_id": ballot_id,
            "candidates.id": { "$ne": candidate_id },
        };
        let update = doc! {
            "$push": { "candidates": mongodb::bson::to_document(&snapshot)? },
        };
        let result = ballots.update_one(filter, update, None).await?;
        if result.modified_count == 0 {
            return Err(Error::Duplicate(format!(
                "Candidate {candidate_id} on ballot {ballot_id}"
            )));
        }
        info!("Added candidate {candidate_id} to ballot {ballot_id}");
        Self::find_by_id(ballots, ballot_id).await
    }

    /// Change a ballot's voting window. The status is recomputed from the
    /// new dates, and a change that would move the ballot backwards through
    /// its lifecycle is refused.
    pub async fn update_dates(
        ballots: &Coll<Ballot>,
        ballot_id: Id,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Ballot> {
        let (start_date, end_date) = stored_window(start_date, end_date)?;
        let ballot = Self::find_by_id(ballots, ballot_id).await?;
        let current = ballot.status_at(now);
        let next = BallotStatus::at(now, start_date, end_date);
        if next < current {
            return Err(Error::validation(format!(
                "Ballot {ballot_id} is {current:?}; new dates would make it {next:?}"
            )));
        }

        // Guard against a concurrent edit having moved the window meanwhile.
        let filter = doc! {
            "_id": ballot_id,
            "start_date": mongodb::bson::DateTime::from_chrono(ballot.start_date),
            "end_date": mongodb::bson::DateTime::from_chrono(ballot.end_date),
        };
        let update = doc! {
            "$set": {
                "start_date": mongodb::bson::DateTime::from_chrono(start_date),
                "end_date": mongodb::bson::DateTime::from_chrono(end_date),
                "status": next,
            },
        };
        let result = ballots.update_one(filter, update, None).await?;
        if result.matched_count == 0 {
            return Err(Error::validation(format!(
                "Ballot {ballot_id} was modified concurrently, please retry"
            )));
        }
        info!("Moved ballot {ballot_id} window to {start_date} - {end_date}");
        Self::find_by_id(ballots, ballot_id).await
    }

    /// Count the committed votes for each candidate on a ballot.
    pub async fn results(
        ballots: &Coll<Ballot>,
        votes: &Coll<Vote>,
        ballot_id: Id,
        now: DateTime<Utc>,
    ) -> Result<BallotResults> {
        let ballot = Self::find_by_id(ballots, ballot_id).await?;
        let mut tally: HashMap<Id, u64> = Vote::tally(votes, ballot_id).await?;
        let counts = ballot
            .candidates
            .iter()
            .map(|c| (c.clone(), tally.remove(&c.id).unwrap_or(0)))
            .collect::<Vec<_>>();
        if !tally.is_empty() {
            // Should be impossible: votes are only accepted for ballot candidates.
            error!("Ballot {ballot_id} has votes for unknown candidates: {tally:?}");
        }
        let total = counts.iter().map(|(_, n)| n).sum();
        Ok(BallotResults {
            status: ballot.status_at(now),
            ballot,
            counts,
            total,
        })
    }
}


#[cfg(test)]
mod tests {
    use chrono::Duration;
    use mongodb::{bson::Document, Database};

    use crate::model::db::candidate::NewCandidate;

    use super::*;

    fn snapshot(name: &str) -> CandidateSnapshot {
        CandidateSnapshot {
            id: Id::new(),
            name: name.to_string(),
            party: "Independent".to_string(),
            photo: None,
            symbol: "Lamp".to_string(),
        }
    }

    #[test]
    fn new_validates() {
        let now = Utc::now();
        let later = now + Duration::hours(1);
        assert!(matches!(
            BallotCore::new("", "Dhaka-10", now, later, vec![], now),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            BallotCore::new("Ballot", "  ", now, later, vec![], now),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            BallotCore::new("Ballot", "Dhaka-10", later, later, vec![], now),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            BallotCore::new("Ballot", "Dhaka-10", later, now, vec![], now),
            Err(Error::Validation(_))
        ));

        let dup = snapshot("Twice");
        assert!(matches!(
            BallotCore::new("Ballot", "Dhaka-10", now, later, vec![dup.clone(), dup], now),
            Err(Error::Duplicate(_))
        ));
    }

    #[test]
    fn window_survives_storage_exactly() {
        let now = Utc::now();
        let start = now - Duration::nanoseconds(1_234_567);
        let end = now + Duration::hours(1) + Duration::nanoseconds(987_654_321);
        let ballot = BallotCore::new("Ballot", "Dhaka-10", start, end, vec![], now).unwrap();
        assert_eq!(ballot.end_date.timestamp_subsec_nanos() % 1_000_000, 0);
        assert!(ballot.end_date <= end);

        let stored: BallotCore =
            mongodb::bson::from_document(mongodb::bson::to_document(&ballot).unwrap()).unwrap();
        assert_eq!(stored.start_date, ballot.start_date);
        assert_eq!(stored.end_date, ballot.end_date);
        assert_eq!(stored.status_at(ballot.end_date), BallotStatus::Active);
    }

    #[test]
    fn stored_status_is_computed_at_creation() {
        let now = Utc::now();
        let upcoming = BallotCore::new(
            "Ballot",
            "Dhaka-10",
            now + Duration::hours(1),
            now + Duration::hours(2),
            vec![],
            now,
        )
        .unwrap();
        assert_eq!(upcoming.status, BallotStatus::Upcoming);

        let active = BallotCore::example_active(now, vec![]);
        assert_eq!(active.status, BallotStatus::Active);

        let completed = BallotCore::new(
            "Ballot",
            "Dhaka-10",
            now - Duration::hours(2),
            now - Duration::hours(1),
            vec![],
            now,
        )
        .unwrap();
        assert_eq!(completed.status, BallotStatus::Completed);
    }

    #[test]
    fn status_ignores_stored_value() {
        let now = Utc::now();
        let mut ballot = BallotCore::example_active(now, vec![]);
        ballot.status = BallotStatus::Upcoming;
        assert_eq!(ballot.status_at(now), BallotStatus::Active);
        assert_eq!(
            ballot.status_at(now + Duration::days(1)),
            BallotStatus::Completed
        );
    }

    #[test]
    fn candidate_lookup() {
        let now = Utc::now();
        let a = snapshot("A");
        let ballot = BallotCore::example_active(now, vec![a.clone(), snapshot("B")]);
        assert_eq!(ballot.candidate(a.id), Some(&a));
        assert_eq!(ballot.candidate(Id::new()), None);
    }

    async fn active_candidates(candidates: &Coll<Candidate>) -> (Candidate, Candidate) {
        let a = Candidate::create(candidates, NewCandidate::example())
            .await
            .unwrap();
        let b = Candidate::create(candidates, NewCandidate::example2())
            .await
            .unwrap();
        (a, b)
    }

    #[backend_test]
    async fn add_candidate_once(ballots: Coll<Ballot>, candidates: Coll<Candidate>) {
        let now = Utc::now();
        let (a, b) = active_candidates(&candidates).await;
        let ballot = Ballot::create(
            &ballots,
            &candidates,
            "Dhaka-10 by-election",
            "Dhaka-10",
            now + Duration::hours(1),
            now + Duration::hours(9),
            &[a.id],
            now,
        )
        .await
        .unwrap();

        let updated = Ballot::add_candidate(&ballots, &candidates, ballot.id, b.id, now)
            .await
            .unwrap();
        assert_eq!(updated.candidates.len(), 2);

        let err = Ballot::add_candidate(&ballots, &candidates, ballot.id, b.id, now)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Duplicate(_)));
        let stored = Ballot::find_by_id(&ballots, ballot.id).await.unwrap();
        assert_eq!(stored.candidates.len(), 2);

        assert!(matches!(
            Ballot::add_candidate(&ballots, &candidates, Id::new(), b.id, now).await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            Ballot::add_candidate(&ballots, &candidates, ballot.id, Id::new(), now).await,
            Err(Error::NotFound(_))
        ));

        let inactive = Candidate::create(&candidates, NewCandidate::example_inactive())
            .await
            .unwrap();
        assert!(matches!(
            Ballot::add_candidate(&ballots, &candidates, ballot.id, inactive.id, now).await,
            Err(Error::Validation(_))
        ));

        // Once the ballot is over its candidates are final.
        let later = now + Duration::days(1);
        let c = Candidate::create(&candidates, NewCandidate::example())
            .await
            .unwrap();
        assert!(matches!(
            Ballot::add_candidate(&ballots, &candidates, ballot.id, c.id, later).await,
            Err(Error::Validation(_))
        ));
    }

    #[backend_test]
    async fn status_recomputed_without_writes(db: Database) {
        let now = Utc::now();
        let ballots = Coll::<Ballot>::from_db(&db);
        let candidates = Coll::<Candidate>::from_db(&db);
        let ballot = Ballot::create(
            &ballots,
            &candidates,
            "Dhaka-10 by-election",
            "Dhaka-10",
            now + Duration::hours(1),
            now + Duration::hours(9),
            &[],
            now,
        )
        .await
        .unwrap();
        let before = (*ballots)
            .clone_with_type::<Document>()
            .find_one(ballot.id.as_doc(), None)
            .await
            .unwrap()
            .unwrap();

        let votes = Coll::<Vote>::from_db(&db);
        let listed = Ballot::list_for_area(&ballots, &votes, "Dhaka-10", &Nid::example(), now)
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].status, BallotStatus::Upcoming);
        assert!(!listed[0].has_voted);

        let listed = Ballot::list_for_area(
            &ballots,
            &votes,
            "Dhaka-10",
            &Nid::example(),
            now + Duration::hours(2),
        )
        .await
        .unwrap();
        assert_eq!(listed[0].status, BallotStatus::Active);

        let after = (*ballots)
            .clone_with_type::<Document>()
            .find_one(ballot.id.as_doc(), None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(before, after);
        assert_eq!(
            after.get_str("status").unwrap(),
            "upcoming",
            "stored status is never refreshed by reads"
        );

        // Other areas see nothing.
        let elsewhere = Ballot::list_for_area(&ballots, &votes, "Khulna-2", &Nid::example(), now)
            .await
            .unwrap();
        assert!(elsewhere.is_empty());
    }

    #[backend_test]
    async fn snapshot_survives_directory_edits(ballots: Coll<Ballot>, candidates: Coll<Candidate>) {
        let now = Utc::now();
        let (a, _) = active_candidates(&candidates).await;
        let ballot = Ballot::create(
            &ballots,
            &candidates,
            "Dhaka-10 by-election",
            "Dhaka-10",
            now,
            now + Duration::hours(8),
            &[a.id],
            now,
        )
        .await
        .unwrap();

        let mut edited = a.candidate.clone();
        edited.name = "Sheikh Anwar Hossain".to_string();
        edited.party = "Independent".to_string();
        Candidate::update(&candidates, a.id, edited).await.unwrap();

        let stored = Ballot::find_by_id(&ballots, ballot.id).await.unwrap();
        let on_ballot = stored.candidate(a.id).unwrap();
        assert_eq!(on_ballot, &CandidateSnapshot::from(&a));
        assert_eq!(on_ballot.name, "Sheikh Anwar");
        assert_eq!(on_ballot.party, "Nouka Jote");
    }

    #[backend_test]
    async fn dates_never_move_backwards(ballots: Coll<Ballot>, candidates: Coll<Candidate>) {
        let now = Utc::now();
        let ballot = Ballot::create(
            &ballots,
            &candidates,
            "Dhaka-10 by-election",
            "Dhaka-10",
            now - Duration::hours(1),
            now + Duration::hours(7),
            &[],
            now,
        )
        .await
        .unwrap();

        // Active -> upcoming is refused.
        let err = Ballot::update_dates(
            &ballots,
            ballot.id,
            now + Duration::hours(1),
            now + Duration::hours(2),
            now,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        // Inverted window is refused.
        let err = Ballot::update_dates(&ballots, ballot.id, now, now, now)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        // Extending an active ballot is fine.
        let extended = Ballot::update_dates(
            &ballots,
            ballot.id,
            now - Duration::hours(1),
            now + Duration::hours(10),
            now,
        )
        .await
        .unwrap();
        assert_eq!(extended.end_date.timestamp(), (now + Duration::hours(10)).timestamp());
        assert_eq!(extended.status, BallotStatus::Active);

        // Closing it early moves it forward.
        let closed = Ballot::update_dates(
            &ballots,
            ballot.id,
            now - Duration::hours(2),
            now - Duration::minutes(1),
            now,
        )
        .await
        .unwrap();
        assert_eq!(closed.status_at(now), BallotStatus::Completed);
        assert_eq!(closed.status, BallotStatus::Completed);

        assert!(matches!(
            Ballot::update_dates(&ballots, Id::new(), now, now + Duration::hours(1), now).await,
            Err(Error::NotFound(_))
        ));
    }
}
