use chrono::Utc;
use mongodb::bson::doc;
use rocket::{futures::TryStreamExt, http::CookieJar, serde::json::Json, Route, State};

use crate::{
    error::{Error, Result},
    model::{
        api::{
            admin::{AdminDescription, AdminUsername},
            auth::{auth_cookie, AdminCredentials, AdminLoginResponse, AuthToken},
            citizen::CitizenRecord,
        },
        db::{
            admin::{Admin, NewAdmin},
            citizen::{ImportSummary, NewCitizen},
        },
        mongodb::Coll,
    },
    Config,
};

pub fn routes() -> Vec<Route> {
    routes![login, get_admins, create_admin, delete_admin, import_citizens]
}

#[post("/api/admin/login", data = "<credentials>", format = "json")]
pub async fn login(
    credentials: Json<AdminCredentials>,
    cookies: &CookieJar<'_>,
    admins: Coll<Admin>,
    config: &State<Config>,
) -> Result<Json<AdminLoginResponse>> {
    let admin = Admin::login(&admins, &credentials.username, &credentials.password).await?;
    let token = AuthToken::new(&admin).encode(Utc::now(), config)?;
    cookies.add(auth_cookie(token.clone(), config));
    info!("Admin {} logged in", admin.username);

    Ok(Json(AdminLoginResponse { token }))
}

#[get("/api/admin/admins")]
async fn get_admins(
    _token: AuthToken<Admin>,
    admins: Coll<Admin>,
) -> Result<Json<Vec<AdminDescription>>> {
    let admin_list: Vec<Admin> = admins.find(None, None).await?.try_collect().await?;
    Ok(Json(admin_list.into_iter().map(Into::into).collect()))
}

#[post("/api/admin/admins", data = "<new_admin>", format = "json")]
async fn create_admin(
    token: AuthToken<Admin>,
    new_admin: Json<AdminCredentials>,
    new_admins: Coll<NewAdmin>,
    admins: Coll<Admin>,
) -> Result<Json<AdminDescription>> {
    let admin = NewAdmin::new(&new_admin.username, &new_admin.password)?;
    let username = admin.username.clone();
    admin.insert(&new_admins).await?;
    info!("Admin {} created admin {username}", token.id);

    let admin = admins
        .find_one(doc! { "username": &username }, None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Admin {username}")))?;
    Ok(Json(admin.into()))
}

#[delete("/api/admin/admins", data = "<target>", format = "json")]
async fn delete_admin(
    token: AuthToken<Admin>,
    target: Json<AdminUsername>,
    admins: Coll<Admin>,
) -> Result<()> {
    // Prevent deleting the last admin.
    let count = admins.count_documents(None, None).await?;
    if count <= 1 {
        return Err(Error::validation("Cannot delete the last admin"));
    }

    let result = admins
        .delete_one(doc! { "username": &target.username }, None)
        .await?;
    if result.deleted_count == 0 {
        return Err(Error::not_found(format!("Admin {}", target.username)));
    }
    warn!("Admin {} deleted admin {}", token.id, target.username);
    Ok(())
}

/// Seed the citizen roll. NIDs already on the roll are skipped.
#[post("/api/admin/citizens", data = "<records>", format = "json")]
async fn import_citizens(
    _token: AuthToken<Admin>,
    records: Json<Vec<CitizenRecord>>,
    citizens: Coll<NewCitizen>,
) -> Result<Json<ImportSummary>> {
    let summary =
        NewCitizen::import(&citizens, records.0.into_iter().map(NewCitizen::from)).await?;
    Ok(Json(summary))
}
