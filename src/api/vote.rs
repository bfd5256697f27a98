use std::net::IpAddr;

use chrono::Utc;
use rocket::{serde::json::Json, Route};

use crate::{
    error::Result,
    model::{
        api::{
            auth::AuthToken,
            ballot::VoterBallotDescription,
            vote::{VoteReceipt, VoteRequest, VoteStatus},
        },
        db::{account::Account, ballot::Ballot, vote::Vote},
        mongodb::{Coll, Id},
    },
};

pub fn routes() -> Vec<Route> {
    routes![voter_ballots, cast_vote, vote_status]
}

#[get("/api/vote/ballots")]
async fn voter_ballots(
    token: AuthToken<Account>,
    accounts: Coll<Account>,
    ballots: Coll<Ballot>,
    votes: Coll<Vote>,
) -> Result<Json<Vec<VoterBallotDescription>>> {
    let account = Account::find_by_id(&accounts, token.id).await?;
    let area_ballots =
        Ballot::list_for_area(&ballots, &votes, &account.voting_area, &account.nid, Utc::now())
            .await?;
    Ok(Json(area_ballots.into_iter().map(Into::into).collect()))
}

#[post("/api/vote/vote", data = "<request>", format = "json")]
async fn cast_vote(
    token: AuthToken<Account>,
    request: Json<VoteRequest>,
    ip: Option<IpAddr>,
    accounts: Coll<Account>,
    ballots: Coll<Ballot>,
    votes: Coll<Vote>,
) -> Result<Json<VoteReceipt>> {
    let voter = Account::find_by_id(&accounts, token.id).await?;
    let vote = Vote::cast(
        &ballots,
        &votes,
        &accounts,
        &voter,
        *request.ballot_id,
        *request.candidate_id,
        ip,
        Utc::now(),
    )
    .await?;
    Ok(Json(vote.into()))
}

#[get("/api/vote/status/<ballot_id>")]
async fn vote_status(
    token: AuthToken<Account>,
    ballot_id: Id,
    accounts: Coll<Account>,
    votes: Coll<Vote>,
) -> Result<Json<VoteStatus>> {
    let account = Account::find_by_id(&accounts, token.id).await?;
    let has_voted = Vote::has_voted(&votes, ballot_id, &account.nid).await?;
    Ok(Json(VoteStatus {
        ballot_id: ballot_id.into(),
        has_voted,
    }))
}
