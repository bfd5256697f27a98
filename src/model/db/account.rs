use std::ops::{Deref, DerefMut};

use chrono::{NaiveDate, Utc};
use mongodb::bson::{doc, DateTime};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    common::Nid,
    mongodb::{is_duplicate_key_error, Coll, Id},
    password,
};

use super::citizen::Citizen;

/// A registered citizen's login identity, as stored in the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountCore {
    pub nid: Nid,
    pub password_hash: String,
    pub is_verified: bool,
    // Copied from the roll at registration time.
    pub name: String,
    pub father_name: String,
    pub mother_name: String,
    pub dob: NaiveDate,
    pub mobile: String,
    pub voting_area: String,
    /// Informational only: set after any successful vote. Whether a citizen
    /// has voted in a particular ballot is answered by the vote ledger.
    #[serde(default)]
    pub has_voted: bool,
    pub voted_at: Option<DateTime>,
    pub voted_candidate: Option<Id>,
    pub created_at: DateTime,
    pub last_login: Option<DateTime>,
}

impl AccountCore {
    /// Create the account for a citizen, hashing their password.
    pub fn new(citizen: &Citizen, password: &str) -> Result<Self> {
        Ok(Self {
            nid: citizen.nid.clone(),
            password_hash: password::hash(password)?,
            is_verified: true,
            name: citizen.name.clone(),
            father_name: citizen.father_name.clone(),
            mother_name: citizen.mother_name.clone(),
            dob: citizen.dob,
            mobile: citizen.mobile.clone(),
            voting_area: citizen.voting_area.clone(),
            has_voted: false,
            voted_at: None,
            voted_candidate: None,
            created_at: DateTime::now(),
            last_login: None,
        })
    }

    /// Check whether the given password is correct.
    pub fn verify_password(&self, password: &str) -> bool {
        password::verify(&self.password_hash, password)
    }
}

/// An account from the database, with its unique ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub account: AccountCore,
}

impl Deref for Account {
    type Target = AccountCore;

    fn deref(&self) -> &Self::Target {
        &self.account
    }
}

impl DerefMut for Account {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.account
    }
}

impl Account {
    /// Create the account for a verified citizen and mark them as registered
    /// on the roll.
    ///
    /// The unique NID index on accounts decides between racing registrations;
    /// the loser gets [`Error::AlreadyRegistered`] and writes nothing.
    pub async fn register(
        accounts: &Coll<Account>,
        citizens: &Coll<Citizen>,
        nid: &Nid,
        password: &str,
    ) -> Result<Account> {
        let citizen = Citizen::find_by_nid(citizens, nid).await?;
        if citizen.is_registered {
            return Err(Error::AlreadyRegistered(nid.to_string()));
        }

        let account = Account {
            id: Id::new(),
            account: AccountCore::new(&citizen, password)?,
        };
        match accounts.insert_one(&account, None).await {
            Ok(_) => {}
            Err(e) if is_duplicate_key_error(&e) => {
                // An earlier attempt may have stopped before flagging the citizen.
                match Citizen::mark_registered(citizens, nid).await {
                    Ok(()) => warn!("Completed interrupted registration for NID {nid}"),
                    Err(Error::AlreadyRegistered(_)) => {}
                    Err(e) => return Err(e),
                }
                return Err(Error::AlreadyRegistered(nid.to_string()));
            }
            Err(e) => return Err(e.into()),
        }

        // Only reachable by the single successful insert above.
        Citizen::mark_registered(citizens, nid).await?;
        info!("Registered account for NID {nid}");

        Ok(account)
    }

    /// Authenticate a citizen by NID and password, recording the login.
    pub async fn login(accounts: &Coll<Account>, nid: &Nid, password: &str) -> Result<Account> {
        let mut account = accounts
            .find_one(doc! { "nid": nid }, None)
            .await?
            .filter(|account| account.verify_password(password))
            .ok_or_else(|| {
                Error::Authentication("No account found with that NID and password".to_string())
            })?;

        let now = DateTime::from_chrono(Utc::now());
        accounts
            .update_one(account.id.as_doc(), doc! { "$set": { "last_login": now } }, None)
            .await?;
        account.last_login = Some(now);
        Ok(account)
    }

    /// Look up an account by its ID.
    pub async fn find_by_id(accounts: &Coll<Account>, id: Id) -> Result<Account> {
        accounts
            .find_one(id.as_doc(), None)
            .await?
            .ok_or_else(|| Error::not_found(format!("Account {id}")))
    }
}

#[cfg(test)]
mod tests {
    use mongodb::Database;

    use crate::model::db::citizen::NewCitizen;

    use super::*;

    #[backend_test]
    async fn register_then_login(db: Database) {
        let accounts = Coll::<Account>::from_db(&db);
        let citizens = Coll::<Citizen>::from_db(&db);
        NewCitizen::import(&citizens.clone_with_type(), [NewCitizen::example()])
            .await
            .unwrap();

        let account = Account::register(&accounts, &citizens, &Nid::example(), "shapla-1971")
            .await
            .unwrap();
        assert!(account.is_verified);
        assert!(!account.has_voted);
        assert_eq!(account.voting_area, "Dhaka-10");
        assert_ne!(account.password_hash, "shapla-1971");

        let citizen = Citizen::find_by_nid(&citizens, &Nid::example()).await.unwrap();
        assert!(citizen.is_registered);

        // A second registration is refused.
        let err = Account::register(&accounts, &citizens, &Nid::example(), "shapla-1971")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AlreadyRegistered(_)));

        // Wrong password.
        let err = Account::login(&accounts, &Nid::example(), "wrong-password")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Authentication(_)));

        // Right password.
        let logged_in = Account::login(&accounts, &Nid::example(), "shapla-1971")
            .await
            .unwrap();
        assert_eq!(logged_in.id, account.id);
        assert!(logged_in.last_login.is_some());
    }

    #[backend_test]
    async fn interrupted_registration_is_completed(
        accounts: Coll<Account>,
        citizens: Coll<Citizen>,
    ) {
        NewCitizen::import(&citizens.clone_with_type(), [NewCitizen::example()])
            .await
            .unwrap();
        let citizen = Citizen::find_by_nid(&citizens, &Nid::example()).await.unwrap();

        // The account was written but the roll never flagged.
        let orphan = Account {
            id: Id::new(),
            account: AccountCore::new(&citizen, "shapla-1971").unwrap(),
        };
        accounts.insert_one(&orphan, None).await.unwrap();

        let err = Account::register(&accounts, &citizens, &Nid::example(), "shapla-1971")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AlreadyRegistered(_)));
        let citizen = Citizen::find_by_nid(&citizens, &Nid::example()).await.unwrap();
        assert!(citizen.is_registered);
    }

    #[backend_test]
    async fn register_unknown_citizen(db: Database) {
        let err = Account::register(
            &Coll::from_db(&db),
            &Coll::from_db(&db),
            &Nid::example(),
            "shapla-1971",
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
