use chrono::Utc;
use rocket::{serde::json::Json, Either, Route};

use crate::{
    error::{Error, Result},
    model::{
        api::{
            auth::AuthToken,
            ballot::{
                AddCandidateRequest, BallotDates, BallotDescription, BallotResultsDescription,
                BallotSpec, VoterBallotDescription,
            },
        },
        db::{
            account::Account, admin::Admin, ballot::Ballot, candidate::Candidate, vote::Vote,
        },
        mongodb::{Coll, Id},
    },
};

pub fn routes() -> Vec<Route> {
    routes![
        create_ballot,
        list_ballots,
        get_ballot,
        update_dates,
        add_candidate,
        get_results,
    ]
}

#[post("/api/ballot/create", data = "<spec>", format = "json")]
async fn create_ballot(
    _token: AuthToken<Admin>,
    spec: Json<BallotSpec>,
    ballots: Coll<Ballot>,
    candidates: Coll<Candidate>,
) -> Result<Json<BallotDescription>> {
    let now = Utc::now();
    let candidate_ids = spec.candidates.iter().map(|id| **id).collect::<Vec<Id>>();
    let ballot = Ballot::create(
        &ballots,
        &candidates,
        &spec.name,
        &spec.location,
        spec.start_date,
        spec.end_date,
        &candidate_ids,
        now,
    )
    .await?;
    Ok(Json(BallotDescription::new(ballot, now)))
}

/// Admins see every ballot. Citizens see the ballots of their own voting
/// area, each marked with whether they have voted in it.
#[get("/api/ballot/list")]
async fn list_ballots(
    admin: Option<AuthToken<Admin>>,
    citizen: Option<AuthToken<Account>>,
    ballots: Coll<Ballot>,
    votes: Coll<Vote>,
    accounts: Coll<Account>,
) -> Result<Either<Json<Vec<BallotDescription>>, Json<Vec<VoterBallotDescription>>>> {
    let now = Utc::now();
    if admin.is_some() {
        let all = Ballot::list_all(&ballots).await?;
        return Ok(Either::Left(Json(
            all.into_iter()
                .map(|ballot| BallotDescription::new(ballot, now))
                .collect(),
        )));
    }

    let token = citizen.ok_or_else(|| {
        Error::Authentication("Log in to see the ballots open to you".to_string())
    })?;
    let account = Account::find_by_id(&accounts, token.id).await?;
    let area_ballots =
        Ballot::list_for_area(&ballots, &votes, &account.voting_area, &account.nid, now).await?;
    Ok(Either::Right(Json(
        area_ballots.into_iter().map(Into::into).collect(),
    )))
}

#[get("/api/ballot/<ballot_id>")]
async fn get_ballot(ballot_id: Id, ballots: Coll<Ballot>) -> Result<Json<BallotDescription>> {
    let ballot = Ballot::find_by_id(&ballots, ballot_id).await?;
    Ok(Json(BallotDescription::new(ballot, Utc::now())))
}

#[put("/api/ballot/<ballot_id>/dates", data = "<dates>", format = "json")]
async fn update_dates(
    _token: AuthToken<Admin>,
    ballot_id: Id,
    dates: Json<BallotDates>,
    ballots: Coll<Ballot>,
) -> Result<Json<BallotDescription>> {
    let now = Utc::now();
    let ballot =
        Ballot::update_dates(&ballots, ballot_id, dates.start_date, dates.end_date, now).await?;
    Ok(Json(BallotDescription::new(ballot, now)))
}

#[post("/api/ballot/<ballot_id>/candidates", data = "<request>", format = "json")]
async fn add_candidate(
    _token: AuthToken<Admin>,
    ballot_id: Id,
    request: Json<AddCandidateRequest>,
    ballots: Coll<Ballot>,
    candidates: Coll<Candidate>,
) -> Result<Json<BallotDescription>> {
    let now = Utc::now();
    let ballot =
        Ballot::add_candidate(&ballots, &candidates, ballot_id, *request.candidate_id, now)
            .await?;
    Ok(Json(BallotDescription::new(ballot, now)))
}

#[get("/api/ballot/<ballot_id>/results")]
pub async fn get_results(
    ballot_id: Id,
    ballots: Coll<Ballot>,
    votes: Coll<Vote>,
) -> Result<Json<BallotResultsDescription>> {
    let results = Ballot::results(&ballots, &votes, ballot_id, Utc::now()).await?;
    Ok(Json(results.into()))
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration};
    use mongodb::Database;
    use rocket::{
        http::{ContentType, Status},
        local::asynchronous::{Client, LocalResponse},
        serde::json::serde_json::json,
    };

    use crate::model::{
        api::{ballot::BallotCandidate, candidate::CandidateSpec, id::ApiId},
        common::BallotStatus,
        db::{ballot::CandidateSnapshot, candidate::NewCandidate, citizen::NewCitizen},
    };

    use super::*;

    async fn seed_candidates(db: &Database) -> Vec<Candidate> {
        let candidates = Coll::<Candidate>::from_db(db);
        let mut seeded = Vec::new();
        for candidate in [NewCandidate::example(), NewCandidate::example2()] {
            seeded.push(Candidate::create(&candidates, candidate).await.unwrap());
        }
        seeded
    }

    async fn create<'c>(
        client: &'c Client,
        location: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        candidates: &[Id],
    ) -> LocalResponse<'c> {
        let candidates: Vec<ApiId> = candidates.iter().copied().map(ApiId::from).collect();
        client
            .post(uri!(create_ballot))
            .header(ContentType::JSON)
            .body(
                json!({
                    "name": format!("{location} by-election"),
                    "location": location,
                    "startDate": start,
                    "endDate": end,
                    "candidates": candidates,
                })
                .to_string(),
            )
            .dispatch()
            .await
    }

    #[backend_test(admin)]
    async fn create_and_get(client: Client, db: Database) {
        let seeded = seed_candidates(&db).await;
        let now = Utc::now();

        let response = create(
            &client,
            "Dhaka-10",
            now - Duration::hours(1),
            now + Duration::hours(7),
            &[seeded[0].id],
        )
        .await;
        assert_eq!(Status::Ok, response.status());
        let created: BallotDescription = response.into_json().await.unwrap();
        assert_eq!(created.status, BallotStatus::Active);
        assert_eq!(created.candidates.len(), 1);
        assert_eq!(created.candidates[0].name, seeded[0].name);

        let response = client
            .get(uri!(get_ballot(ballot_id = *created.id)))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let fetched: BallotDescription = response.into_json().await.unwrap();
        assert_eq!(fetched.id, created.id);
        assert_eq!(fetched.candidates, created.candidates);

        let response = client
            .get(uri!(get_ballot(ballot_id = Id::new())))
            .dispatch()
            .await;
        assert_eq!(Status::NotFound, response.status());
    }

    #[backend_test(admin)]
    async fn create_rejects_bad_input(client: Client, db: Database) {
        let seeded = seed_candidates(&db).await;
        let now = Utc::now();

        // End before start.
        let response = create(&client, "Dhaka-10", now, now - Duration::hours(1), &[]).await;
        assert_eq!(Status::BadRequest, response.status());

        // Empty location.
        let response = create(&client, " ", now, now + Duration::hours(1), &[]).await;
        assert_eq!(Status::BadRequest, response.status());

        // Same candidate twice.
        let id = seeded[0].id;
        let response = create(&client, "Dhaka-10", now, now + Duration::hours(1), &[id, id]).await;
        assert_eq!(Status::BadRequest, response.status());

        // Unknown candidate.
        let response =
            create(&client, "Dhaka-10", now, now + Duration::hours(1), &[Id::new()]).await;
        assert_eq!(Status::NotFound, response.status());
    }

    #[backend_test(admin)]
    async fn add_candidate_twice(client: Client, db: Database) {
        let seeded = seed_candidates(&db).await;
        let now = Utc::now();
        let created: BallotDescription = create(
            &client,
            "Dhaka-10",
            now + Duration::hours(1),
            now + Duration::hours(9),
            &[],
        )
        .await
        .into_json()
        .await
        .unwrap();

        let add = || {
            client
                .post(uri!(add_candidate(ballot_id = *created.id)))
                .header(ContentType::JSON)
                .body(json!({ "candidateId": ApiId::from(seeded[1].id) }).to_string())
                .dispatch()
        };
        let response = add().await;
        assert_eq!(Status::Ok, response.status());
        let updated: BallotDescription = response.into_json().await.unwrap();
        assert_eq!(
            updated.candidates,
            vec![BallotCandidate::from(CandidateSnapshot::from(&seeded[1]))]
        );

        let response = add().await;
        assert_eq!(Status::BadRequest, response.status());
        let response = client
            .get(uri!(get_ballot(ballot_id = *created.id)))
            .dispatch()
            .await;
        let fetched: BallotDescription = response.into_json().await.unwrap();
        assert_eq!(fetched.candidates.len(), 1);
    }

    #[backend_test(admin)]
    async fn edited_candidate_keeps_ballot_snapshot(client: Client, db: Database) {
        let seeded = seed_candidates(&db).await;
        let now = Utc::now();
        let created: BallotDescription = create(
            &client,
            "Dhaka-10",
            now,
            now + Duration::hours(8),
            &[seeded[0].id],
        )
        .await
        .into_json()
        .await
        .unwrap();

        let mut edited = CandidateSpec::from(seeded[0].candidate.clone());
        edited.name = "Renamed Candidate".to_string();
        edited.symbol = "Lamp".to_string();
        let response = client
            .put(uri!(crate::api::candidate::update_candidate(
                candidate_id = seeded[0].id
            )))
            .header(ContentType::JSON)
            .body(json!(edited).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());

        let fetched: BallotDescription = client
            .get(uri!(get_ballot(ballot_id = *created.id)))
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();
        assert_eq!(fetched.candidates, created.candidates);
        assert_eq!(fetched.candidates[0].name, seeded[0].name);
        assert_eq!(fetched.candidates[0].symbol, seeded[0].symbol);
    }

    #[backend_test(admin)]
    async fn update_dates_forward_only(client: Client) {
        let now = Utc::now();
        let created: BallotDescription = create(
            &client,
            "Dhaka-10",
            now - Duration::hours(1),
            now + Duration::hours(7),
            &[],
        )
        .await
        .into_json()
        .await
        .unwrap();

        let response = client
            .put(uri!(update_dates(ballot_id = *created.id)))
            .header(ContentType::JSON)
            .body(
                json!({
                    "startDate": now + Duration::hours(1),
                    "endDate": now + Duration::hours(2),
                })
                .to_string(),
            )
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());

        let response = client
            .put(uri!(update_dates(ballot_id = *created.id)))
            .header(ContentType::JSON)
            .body(
                json!({
                    "startDate": now - Duration::hours(3),
                    "endDate": now - Duration::hours(2),
                })
                .to_string(),
            )
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let closed: BallotDescription = response.into_json().await.unwrap();
        assert_eq!(closed.status, BallotStatus::Completed);
    }

    #[backend_test(admin)]
    async fn admin_lists_everything(client: Client) {
        let now = Utc::now();
        for area in ["Dhaka-10", "Chattogram-9"] {
            let response = create(&client, area, now, now + Duration::hours(1), &[]).await;
            assert_eq!(Status::Ok, response.status());
        }

        let response = client.get(uri!(list_ballots)).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let listed: Vec<BallotDescription> = response.into_json().await.unwrap();
        assert_eq!(listed.len(), 2);
    }

    #[backend_test(citizen)]
    async fn citizen_lists_own_area(client: Client, db: Database, ballots: Coll<Ballot>) {
        let now = Utc::now();
        let candidates = Coll::<Candidate>::from_db(&db);
        for area in ["Dhaka-10", "Chattogram-9"] {
            Ballot::create(
                &ballots,
                &candidates,
                &format!("{area} by-election"),
                area,
                now + Duration::hours(1),
                now + Duration::hours(2),
                &[],
                now,
            )
            .await
            .unwrap();
        }

        let response = client.get(uri!(list_ballots)).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let listed: Vec<VoterBallotDescription> = response.into_json().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].ballot.location, NewCitizen::example().voting_area);
        assert_eq!(listed[0].ballot.status, BallotStatus::Upcoming);
        assert!(!listed[0].has_voted);

        // Citizens cannot manage ballots.
        let response = create(&client, "Dhaka-10", now, now + Duration::hours(1), &[]).await;
        assert_eq!(Status::Forbidden, response.status());
    }

    #[backend_test]
    async fn list_needs_login(client: Client) {
        let response = client.get(uri!(list_ballots)).dispatch().await;
        assert_eq!(Status::Unauthorized, response.status());
    }
}
