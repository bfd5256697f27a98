use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{api::id::ApiId, db::notice::Notice, pagination::PaginationResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoticeSpec {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoticeDescription {
    pub id: ApiId,
    pub title: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

impl From<Notice> for NoticeDescription {
    fn from(notice: Notice) -> Self {
        Self {
            id: notice.id.into(),
            title: notice.notice.title,
            body: notice.notice.body,
            created_at: notice.notice.created_at.to_chrono(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NoticePage {
    pub notices: Vec<NoticeDescription>,
    pub pagination: PaginationResult,
}
