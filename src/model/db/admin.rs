use std::ops::{Deref, DerefMut};

use mongodb::bson::doc;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    mongodb::{is_duplicate_key_error, Coll, Id},
    password,
};

pub const DEFAULT_ADMIN_USERNAME: &str = "admin";

/// Core admin user data.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminCore {
    pub username: String,
    pub password_hash: String,
}

impl AdminCore {
    /// Create a new admin, hashing the password. The username must be
    /// non-empty and the password must meet the minimum length.
    pub fn new(username: &str, password: &str) -> Result<Self> {
        let username = username.trim();
        if username.is_empty() {
            return Err(Error::validation("Admin username must not be empty"));
        }
        Ok(Self {
            username: username.to_string(),
            password_hash: password::hash(password)?,
        })
    }

    /// Check whether the given password is correct.
    pub fn verify_password(&self, password: &str) -> bool {
        password::verify(&self.password_hash, password)
    }
}

/// An admin without an ID.
pub type NewAdmin = AdminCore;

/// An admin user from the database, with its unique ID.
#[derive(Debug, Serialize, Deserialize)]
pub struct Admin {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub admin: AdminCore,
}

impl Deref for Admin {
    type Target = AdminCore;

    fn deref(&self) -> &Self::Target {
        &self.admin
    }
}

impl DerefMut for Admin {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.admin
    }
}

impl Admin {
    /// Authenticate an admin by username and password.
    pub async fn login(admins: &Coll<Admin>, username: &str, password: &str) -> Result<Admin> {
        admins
            .find_one(doc! { "username": username }, None)
            .await?
            .filter(|admin| admin.verify_password(password))
            .ok_or_else(|| {
                Error::Authentication(
                    "No admin found with the provided username and password combination."
                        .to_string(),
                )
            })
    }
}

impl NewAdmin {
    /// Insert this admin, failing if the username is taken.
    pub async fn insert(self, admins: &Coll<NewAdmin>) -> Result<()> {
        match admins.insert_one(&self, None).await {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_key_error(&e) => {
                Err(Error::Duplicate(format!("Admin {}", self.username)))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Ensure that at least one admin exists, creating the default admin with
/// the given password if the collection is empty.
pub async fn ensure_admin_exists(admins: &Coll<NewAdmin>, default_password: &str) -> Result<()> {
    if admins.count_documents(None, None).await? == 0 {
        warn!("No admins found, creating default admin '{DEFAULT_ADMIN_USERNAME}'");
        NewAdmin::new(DEFAULT_ADMIN_USERNAME, default_password)?
            .insert(admins)
            .await?;
    }
    Ok(())
}
