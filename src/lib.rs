#[macro_use]
extern crate rocket;
#[macro_use]
extern crate log;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use aws_sdk_sns::Client as SnsClient;
use mongodb::Client as MongoClient;
use rocket::{Build, Rocket};

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;

pub use config::Config;

use config::{AwsFairing, ConfigFairing, DatabaseFairing};
use logging::LoggerFairing;

/// Build the server. Settings, the database and the SMS gateway are loaded
/// by fairings at ignition.
pub fn build() -> Rocket<Build> {
    rocket::build()
        .mount("/", api::routes())
        .register("/", error::catchers())
        .attach(LoggerFairing)
        .attach(ConfigFairing)
        .attach(DatabaseFairing)
        .attach(AwsFairing)
}

/// Build the server around an existing database connection and SMS client.
/// The database is still prepared (indexes and default admin) at ignition.
pub fn rocket_for_db_and_notifier(
    db_client: MongoClient,
    db_name: &str,
    notifier: SnsClient,
) -> Rocket<Build> {
    let db = db_client.database(db_name);
    rocket::build()
        .mount("/", api::routes())
        .register("/", error::catchers())
        .manage(db_client)
        .manage(db)
        .manage(notifier)
        .attach(LoggerFairing)
        .attach(ConfigFairing)
        .attach(DatabaseFairing)
}

/// A client for the database named in the test configuration.
#[cfg(test)]
pub(crate) async fn db_client() -> MongoClient {
    log4rs_test_utils::test_logging::init_logging_once_for(
        ["nirapod_vote"],
        None,
        None,
    );
    let db_uri = rocket::Config::figment()
        .extract_inner::<String>("db_uri")
        .expect("`db_uri` must be configured for tests");
    MongoClient::with_uri_str(&db_uri)
        .await
        .expect("Failed to connect to test database")
}

/// A fresh database name for one test.
#[cfg(test)]
pub(crate) fn database() -> String {
    config::database_name()
}
