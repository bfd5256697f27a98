use rocket::{serde::json::Json, Route};

use crate::{
    error::Result,
    model::{
        api::{
            auth::AuthToken,
            complaint::{ComplaintDescription, ComplaintPage, ComplaintSpec, ComplaintStatusUpdate},
        },
        db::{account::Account, admin::Admin, complaint::Complaint},
        mongodb::{Coll, Id},
        pagination::Pagination,
    },
};

pub fn routes() -> Vec<Route> {
    routes![lodge_complaint, my_complaints, list_complaints, update_status]
}

#[post("/api/complaints", data = "<spec>", format = "json")]
async fn lodge_complaint(
    token: AuthToken<Account>,
    spec: Json<ComplaintSpec>,
    accounts: Coll<Account>,
    complaints: Coll<Complaint>,
) -> Result<Json<ComplaintDescription>> {
    let account = Account::find_by_id(&accounts, token.id).await?;
    let complaint =
        Complaint::lodge(&complaints, &account.nid, &spec.subject, &spec.description).await?;
    Ok(Json(complaint.into()))
}

#[get("/api/complaints/mine")]
async fn my_complaints(
    token: AuthToken<Account>,
    accounts: Coll<Account>,
    complaints: Coll<Complaint>,
) -> Result<Json<Vec<ComplaintDescription>>> {
    let account = Account::find_by_id(&accounts, token.id).await?;
    let mine = Complaint::for_citizen(&complaints, &account.nid).await?;
    Ok(Json(mine.into_iter().map(Into::into).collect()))
}

#[get("/api/complaints")]
async fn list_complaints(
    _token: AuthToken<Admin>,
    pagination: Pagination,
    complaints: Coll<Complaint>,
) -> Result<Json<ComplaintPage>> {
    let (page, total) = Complaint::page(&complaints, &pagination).await?;
    Ok(Json(ComplaintPage {
        complaints: page.into_iter().map(Into::into).collect(),
        pagination: pagination.result(total),
    }))
}

#[put("/api/complaints/<complaint_id>/status", data = "<update>", format = "json")]
async fn update_status(
    token: AuthToken<Admin>,
    complaint_id: Id,
    update: Json<ComplaintStatusUpdate>,
    complaints: Coll<Complaint>,
) -> Result<Json<ComplaintDescription>> {
    let complaint = Complaint::advance(&complaints, complaint_id, update.status).await?;
    info!(
        "Admin {} moved complaint {complaint_id} to {:?}",
        token.id, complaint.status
    );
    Ok(Json(complaint.into()))
}
