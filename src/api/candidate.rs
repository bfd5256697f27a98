use rocket::{serde::json::Json, Route};

use crate::{
    error::Result,
    model::{
        api::{
            auth::AuthToken,
            candidate::{CandidateDescription, CandidateSpec},
        },
        db::{admin::Admin, candidate::Candidate},
        mongodb::{Coll, Id},
    },
};

pub fn routes() -> Vec<Route> {
    routes![
        list_candidates,
        get_candidate,
        create_candidate,
        update_candidate,
        delete_candidate,
    ]
}

#[get("/api/candidates?<area>")]
async fn list_candidates(
    area: Option<&str>,
    candidates: Coll<Candidate>,
) -> Result<Json<Vec<CandidateDescription>>> {
    let listed = Candidate::list(&candidates, area).await?;
    Ok(Json(listed.into_iter().map(Into::into).collect()))
}

#[get("/api/candidates/<candidate_id>")]
async fn get_candidate(
    candidate_id: Id,
    candidates: Coll<Candidate>,
) -> Result<Json<CandidateDescription>> {
    let candidate = Candidate::find_by_id(&candidates, candidate_id).await?;
    Ok(Json(candidate.into()))
}

#[post("/api/candidates", data = "<spec>", format = "json")]
async fn create_candidate(
    _token: AuthToken<Admin>,
    spec: Json<CandidateSpec>,
    candidates: Coll<Candidate>,
) -> Result<Json<CandidateDescription>> {
    let candidate = Candidate::create(&candidates, spec.0.into()).await?;
    Ok(Json(candidate.into()))
}

/// Replace a candidate's directory entry. Ballots the candidate already
/// stands on are unaffected.
#[put("/api/candidates/<candidate_id>", data = "<spec>", format = "json")]
pub async fn update_candidate(
    token: AuthToken<Admin>,
    candidate_id: Id,
    spec: Json<CandidateSpec>,
    candidates: Coll<Candidate>,
) -> Result<Json<CandidateDescription>> {
    let candidate = Candidate::update(&candidates, candidate_id, spec.0.into()).await?;
    info!("Admin {} updated candidate {candidate_id}", token.id);
    Ok(Json(candidate.into()))
}

#[delete("/api/candidates/<candidate_id>")]
async fn delete_candidate(
    token: AuthToken<Admin>,
    candidate_id: Id,
    candidates: Coll<Candidate>,
) -> Result<()> {
    Candidate::delete(&candidates, candidate_id).await?;
    warn!("Admin {} deleted candidate {candidate_id}", token.id);
    Ok(())
}
