use rocket::Route;

pub mod admin;
pub mod auth;
pub mod ballot;
pub mod candidate;
pub mod complaint;
pub mod notice;
pub mod vote;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(auth::routes());
    routes.extend(admin::routes());
    routes.extend(ballot::routes());
    routes.extend(vote::routes());
    routes.extend(candidate::routes());
    routes.extend(notice::routes());
    routes.extend(complaint::routes());
    routes
}
