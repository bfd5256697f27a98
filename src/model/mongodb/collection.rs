use std::ops::Deref;

use mongodb::{
    bson::doc, error::Error as DbError, options::IndexOptions, Collection, Database, IndexModel,
};
use rocket::{
    request::{self, FromRequest, Request},
    State,
};

use crate::model::db::{
    account::Account,
    admin::{Admin, NewAdmin},
    ballot::Ballot,
    candidate::{Candidate, NewCandidate},
    citizen::{Citizen, NewCitizen},
    complaint::Complaint,
    notice::Notice,
    otp::OtpRecord,
    vote::Vote,
};

/// A type that can be directly inserted/read to/from the database.
pub trait MongoCollection {
    /// The name of the collection.
    const NAME: &'static str;
}

/// A database collection of the given type.
pub struct Coll<T>(Collection<T>);

impl<T> Coll<T>
where
    T: MongoCollection,
{
    /// Get a handle on this collection in the given database.
    pub fn from_db(db: &Database) -> Self {
        Self(db.collection(T::NAME))
    }
}

impl<T> Coll<T> {
    /// View the same collection as a different type, e.g. `NewCitizen` as `Citizen`.
    pub fn clone_with_type<U>(&self) -> Coll<U>
    where
        U: MongoCollection,
    {
        Coll(self.0.clone_with_type())
    }
}

// `Derive(Clone)` would only derive if `T: Clone`, but we don't need that bound.
impl<T> Clone for Coll<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Deref for Coll<T> {
    type Target = Collection<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[rocket::async_trait]
impl<'r, T> FromRequest<'r> for Coll<T>
where
    T: MongoCollection,
{
    type Error = ();

    /// Get the database connection from the managed state and wrap it in a collection.
    ///
    /// Panics iff the [`Database`] is not managed by [`rocket::Rocket`].
    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let db = req.guard::<&State<Database>>().await.unwrap();
        request::Outcome::Success(Coll::from_db(db))
    }
}

macro_rules! collection {
    ($name:expr => $($ty:ty),+) => {
        $(
            impl MongoCollection for $ty {
                const NAME: &'static str = $name;
            }
        )+
    };
}

const CITIZENS: &str = "citizens";
const ACCOUNTS: &str = "accounts";
const ADMINS: &str = "admins";
const OTPS: &str = "otps";
const BALLOTS: &str = "ballots";
const VOTES: &str = "votes";
const CANDIDATES: &str = "candidates";
const NOTICES: &str = "notices";
const COMPLAINTS: &str = "complaints";

collection!(CITIZENS => Citizen, NewCitizen);
collection!(ACCOUNTS => Account);
collection!(ADMINS => Admin, NewAdmin);
collection!(OTPS => OtpRecord);
collection!(BALLOTS => Ballot);
collection!(VOTES => Vote);
collection!(CANDIDATES => Candidate, NewCandidate);
collection!(NOTICES => Notice);
collection!(COMPLAINTS => Complaint);

/// Ensure that all the required indexes exist on the given database.
///
/// This operation is idempotent.
pub async fn ensure_indexes_exist(db: &Database) -> Result<(), DbError> {
    debug!("Ensuring collection indexes exist");

    let unique = IndexOptions::builder().unique(true).build();

    // Citizen roll and accounts are both keyed by NID.
    let citizen_index = IndexModel::builder()
        .keys(doc! {"nid": 1})
        .options(unique.clone())
        .build();
    Coll::<Citizen>::from_db(db)
        .create_index(citizen_index, None)
        .await?;

    let account_index = IndexModel::builder()
        .keys(doc! {"nid": 1})
        .options(unique.clone())
        .build();
    Coll::<Account>::from_db(db)
        .create_index(account_index, None)
        .await?;

    // Admin collection.
    let admin_index = IndexModel::builder()
        .keys(doc! {"username": 1})
        .options(unique.clone())
        .build();
    Coll::<Admin>::from_db(db)
        .create_index(admin_index, None)
        .await?;

    // OTP collection: one live code per NID, removed by the server once expired.
    let otp_index = IndexModel::builder()
        .keys(doc! {"nid": 1})
        .options(unique.clone())
        .build();
    let otp_ttl_index = IndexModel::builder()
        .keys(doc! {"expire_at": 1})
        .options(
            IndexOptions::builder()
                .expire_after(std::time::Duration::from_secs(0))
                .build(),
        )
        .build();
    Coll::<OtpRecord>::from_db(db)
        .create_indexes([otp_index, otp_ttl_index], None)
        .await?;

    // Ballot collection.
    let ballot_index = IndexModel::builder().keys(doc! {"location": 1}).build();
    Coll::<Ballot>::from_db(db)
        .create_index(ballot_index, None)
        .await?;

    // Vote collection. The compound unique index is what makes a vote one-shot.
    let vote_index = IndexModel::builder()
        .keys(doc! {"ballot_id": 1, "voter_nid": 1})
        .options(unique.clone())
        .build();
    let tally_index = IndexModel::builder()
        .keys(doc! {"ballot_id": 1, "candidate_id": 1})
        .build();
    Coll::<Vote>::from_db(db)
        .create_indexes([vote_index, tally_index], None)
        .await?;

    // Directories.
    let candidate_index = IndexModel::builder().keys(doc! {"area": 1}).build();
    Coll::<Candidate>::from_db(db)
        .create_index(candidate_index, None)
        .await?;

    let notice_index = IndexModel::builder().keys(doc! {"created_at": -1}).build();
    Coll::<Notice>::from_db(db)
        .create_index(notice_index, None)
        .await?;

    let complaint_index = IndexModel::builder().keys(doc! {"nid": 1}).build();
    Coll::<Complaint>::from_db(db)
        .create_index(complaint_index, None)
        .await?;

    Ok(())
}
