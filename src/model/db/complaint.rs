use std::ops::Deref;

use mongodb::{
    bson::{doc, DateTime},
    options::FindOptions,
};
use rocket::futures::TryStreamExt;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    common::{ComplaintStatus, Nid},
    mongodb::{Coll, Id},
    pagination::Pagination,
};

/// A complaint lodged by a citizen, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplaintCore {
    pub nid: Nid,
    pub subject: String,
    pub description: String,
    pub status: ComplaintStatus,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

/// A complaint from the database, with its unique ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Complaint {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub complaint: ComplaintCore,
}

impl Deref for Complaint {
    type Target = ComplaintCore;

    fn deref(&self) -> &Self::Target {
        &self.complaint
    }
}

impl Complaint {
    pub async fn lodge(
        complaints: &Coll<Complaint>,
        nid: &Nid,
        subject: &str,
        description: &str,
    ) -> Result<Complaint> {
        if subject.trim().is_empty() || description.trim().is_empty() {
            return Err(Error::validation(
                "Complaint subject and description must not be empty",
            ));
        }
        let now = DateTime::now();
        let complaint = Complaint {
            id: Id::new(),
            complaint: ComplaintCore {
                nid: nid.clone(),
                subject: subject.trim().to_string(),
                description: description.to_string(),
                status: ComplaintStatus::Pending,
                created_at: now,
                updated_at: now,
            },
        };
        complaints.insert_one(&complaint, None).await?;
        info!("NID {nid} lodged complaint {}", complaint.id);
        Ok(complaint)
    }

    /// Complaints lodged by one citizen, newest first.
    pub async fn for_citizen(complaints: &Coll<Complaint>, nid: &Nid) -> Result<Vec<Complaint>> {
        let options = FindOptions::builder()
            .sort(doc! { "created_at": -1, "_id": -1 })
            .build();
        Ok(complaints
            .find(doc! { "nid": nid }, options)
            .await?
            .try_collect()
            .await?)
    }

    /// One page of all complaints, newest first, and the total count.
    pub async fn page(
        complaints: &Coll<Complaint>,
        pagination: &Pagination,
    ) -> Result<(Vec<Complaint>, u64)> {
        let options = FindOptions::builder()
            .sort(doc! { "created_at": -1, "_id": -1 })
            .skip(pagination.skip())
            .limit(pagination.limit())
            .build();
        let page = complaints.find(None, options).await?.try_collect().await?;
        let total = complaints.count_documents(None, None).await?;
        Ok((page, total))
    }

    /// Move a complaint forward through its handling stages.
    pub async fn advance(
        complaints: &Coll<Complaint>,
        id: Id,
        next: ComplaintStatus,
    ) -> Result<Complaint> {
        let complaint = complaints
            .find_one(id.as_doc(), None)
            .await?
            .ok_or_else(|| Error::not_found(format!("Complaint {id}")))?;
        if !complaint.status.can_become(next) {
            return Err(Error::validation(format!(
                "Complaint {id} is {:?} and cannot become {next:?}",
                complaint.status
            )));
        }

        // Only apply if nobody else moved it in the meantime.
        let filter = doc! { "_id": id, "status": complaint.status };
        let update = doc! { "$set": { "status": next, "updated_at": DateTime::now() } };
        let result = complaints.update_one(filter, update, None).await?;
        if result.modified_count == 0 {
            return Err(Error::validation(format!(
                "Complaint {id} was updated concurrently, please retry"
            )));
        }
        complaints
            .find_one(id.as_doc(), None)
            .await?
            .ok_or_else(|| Error::not_found(format!("Complaint {id}")))
    }
}
