use std::ops::Deref;

use mongodb::{
    bson::{doc, DateTime},
    options::FindOptions,
};
use rocket::futures::TryStreamExt;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    mongodb::{Coll, Id},
    pagination::Pagination,
};

/// A public announcement, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoticeCore {
    pub title: String,
    pub body: String,
    pub created_at: DateTime,
}

/// A notice from the database, with its unique ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notice {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub notice: NoticeCore,
}

impl Deref for Notice {
    type Target = NoticeCore;

    fn deref(&self) -> &Self::Target {
        &self.notice
    }
}

impl Notice {
    pub async fn publish(notices: &Coll<Notice>, title: &str, body: &str) -> Result<Notice> {
        if title.trim().is_empty() || body.trim().is_empty() {
            return Err(Error::validation("Notice title and body must not be empty"));
        }
        let notice = Notice {
            id: Id::new(),
            notice: NoticeCore {
                title: title.trim().to_string(),
                body: body.to_string(),
                created_at: DateTime::now(),
            },
        };
        notices.insert_one(&notice, None).await?;
        info!("Published notice {}", notice.id);
        Ok(notice)
    }

    /// One page of notices, newest first, and the total count.
    pub async fn page(notices: &Coll<Notice>, pagination: &Pagination) -> Result<(Vec<Notice>, u64)> {
        let options = FindOptions::builder()
            .sort(doc! { "created_at": -1, "_id": -1 })
            .skip(pagination.skip())
            .limit(pagination.limit())
            .build();
        let page = notices.find(None, options).await?.try_collect().await?;
        let total = notices.count_documents(None, None).await?;
        Ok((page, total))
    }

    pub async fn delete(notices: &Coll<Notice>, id: Id) -> Result<()> {
        let result = notices.delete_one(id.as_doc(), None).await?;
        if result.deleted_count == 0 {
            Err(Error::not_found(format!("Notice {id}")))
        } else {
            Ok(())
        }
    }
}
