use std::fmt::Display;

use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::model::{
    db::{account::Account, admin::Admin},
    mongodb::{Coll, Id, MongoCollection},
};

/// Someone who can log in. Each kind of user lives in its own collection
/// and carries one fixed level of rights.
pub trait User: MongoCollection {
    const RIGHTS: Rights;

    fn id(&self) -> Id;
}

/// Serialised as a bare integer in token claims.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum Rights {
    Citizen = 0,
    Admin = 1,
}

impl Display for Rights {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Citizen => "citizen",
            Self::Admin => "admin",
        })
    }
}

impl User for Account {
    const RIGHTS: Rights = Rights::Citizen;

    fn id(&self) -> Id {
        self.id
    }
}

impl User for Admin {
    const RIGHTS: Rights = Rights::Admin;

    fn id(&self) -> Id {
        self.id
    }
}

/// Whether the subject of a token is still on record.
pub(super) async fn exists<U: User>(db: &mongodb::Database, id: Id) -> mongodb::error::Result<bool> {
    Coll::<U>::from_db(db)
        .count_documents(id.as_doc(), None)
        .await
        .map(|count| count > 0)
}
