use aws_config::{BehaviorVersion, SdkConfig};
use aws_credential_types::provider::SharedCredentialsProvider;
use aws_sdk_sns::{
    config::{Credentials, Region},
    Client as SnsClient,
};
use chrono::Duration;
use mongodb::{Client as MongoClient, Database};
use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};
use serde::{de::DeserializeOwned, Deserialize};

use crate::error::Result;
use crate::model::{
    db::admin::ensure_admin_exists,
    mongodb::{ensure_indexes_exist, Coll},
};

/// Lifetimes and signing keys, read from `Rocket.toml` or `ROCKET_*`
/// variables. Lifetimes are in seconds.
#[derive(Deserialize)]
pub struct Config {
    otp_ttl: u32,
    auth_ttl: u32,
    registration_ttl: u32,
    // secrets
    jwt_secret: String,
    hmac_secret: String,
}

impl Config {
    /// Valid lifetime of an OTP code.
    pub fn otp_ttl(&self) -> Duration {
        Duration::seconds(self.otp_ttl.into())
    }

    /// Valid lifetime of session tokens.
    pub fn auth_ttl(&self) -> Duration {
        Duration::seconds(self.auth_ttl.into())
    }

    /// How long after verifying an OTP a citizen may still register.
    pub fn registration_ttl(&self) -> Duration {
        Duration::seconds(self.registration_ttl.into())
    }

    /// Secret key used to sign JWTs.
    pub fn jwt_secret(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }

    /// Secret key used to HMAC OTP codes at rest.
    pub fn hmac_secret(&self) -> &[u8] {
        self.hmac_secret.as_bytes()
    }
}

#[cfg(test)]
impl Config {
    pub fn example() -> Self {
        Self {
            otp_ttl: 120,
            auth_ttl: 3600,
            registration_ttl: 900,
            jwt_secret: "example-jwt-secret".to_string(),
            hmac_secret: "example-hmac-secret".to_string(),
        }
    }
}

/// Pull one section of settings out of the figment, printing Rocket's
/// diagnostics if it is missing or malformed.
fn extract<T: DeserializeOwned>(rocket: &Rocket<Build>, what: &str) -> Option<T> {
    match rocket.figment().extract::<T>() {
        Ok(config) => Some(config),
        Err(e) => {
            error!("Invalid {what} settings");
            rocket::config::pretty_print_error(e);
            None
        }
    }
}

/// Places [`Config`] in managed state.
pub struct ConfigFairing;

#[rocket::async_trait]
impl Fairing for ConfigFairing {
    fn info(&self) -> Info {
        Info {
            name: "Config",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        match extract::<Config>(&rocket, "application") {
            Some(config) => Ok(rocket.manage(config)),
            None => Err(rocket),
        }
    }
}

#[derive(Deserialize)]
struct DbConfig {
    // secrets
    db_uri: String,
    default_admin_password: String,
}

/// Connects to MongoDB and manages the `Client` and `Database`, unless a
/// `Database` is already managed. Either way the database gets its indexes
/// and a default admin before launch.
pub struct DatabaseFairing;

#[rocket::async_trait]
impl Fairing for DatabaseFairing {
    fn info(&self) -> Info {
        Info {
            name: "MongoDB",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        let Some(config) = extract::<DbConfig>(&rocket, "database") else {
            return Err(rocket);
        };

        let db = if let Some(db) = rocket.state::<Database>() {
            db.clone()
        } else {
            info!("Loaded database config, connecting...");
            let client = match MongoClient::with_uri_str(&config.db_uri).await {
                Ok(client) => client,
                Err(e) => {
                    error!("Failed to connect to database: {e}");
                    return Err(rocket);
                }
            };
            let db = client.database(&database_name());
            rocket = rocket.manage(client).manage(db.clone());
            db
        };

        if let Err(e) = prepare_database(&db, &config.default_admin_password).await {
            error!("Failed to set up database {}: {e}", db.name());
            return Err(rocket);
        }
        info!("...database {} online!", db.name());

        Ok(rocket)
    }
}

/// Create the indexes, and the default admin if there are no admins.
async fn prepare_database(db: &Database, default_admin_password: &str) -> Result<()> {
    ensure_indexes_exist(db).await?;
    ensure_admin_exists(&Coll::from_db(db), default_admin_password).await
}

#[cfg(not(test))]
pub(crate) fn database_name() -> String {
    "nirapod_vote".to_string()
}

/// Each test gets a database of its own.
#[cfg(test)]
pub(crate) fn database_name() -> String {
    let random: u32 = rand::random();
    let db = format!("test{random}");
    info!("Using database {db}");
    db
}

#[derive(Deserialize)]
struct AwsConfig {
    // non-secrets
    aws_region: String,
    aws_access_key_id: String,
    // secrets
    aws_secret_access_key: String,
}

/// A fairing that loads the AWS config and places an SNS `Client`, used to
/// deliver OTP codes, into managed state.
pub struct AwsFairing;

#[rocket::async_trait]
impl Fairing for AwsFairing {
    fn info(&self) -> Info {
        Info {
            name: "AWS SNS",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        let Some(config) = extract::<AwsConfig>(&rocket, "AWS") else {
            return Err(rocket);
        };
        let aws_config = SdkConfig::builder()
            .region(Region::new(config.aws_region))
            .credentials_provider(SharedCredentialsProvider::new(Credentials::new(
                config.aws_access_key_id,
                config.aws_secret_access_key,
                None,
                None,
                "rocket config",
            )))
            .behavior_version(BehaviorVersion::latest())
            .build();
        info!("Loaded Amazon SNS config");

        Ok(rocket.manage(SnsClient::new(&aws_config)))
    }
}
