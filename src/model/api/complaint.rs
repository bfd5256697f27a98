use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    api::id::ApiId,
    common::{ComplaintStatus, Nid},
    db::complaint::Complaint,
    pagination::PaginationResult,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplaintSpec {
    pub subject: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplaintStatusUpdate {
    pub status: ComplaintStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplaintDescription {
    pub id: ApiId,
    pub nid: Nid,
    pub subject: String,
    pub description: String,
    pub status: ComplaintStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Complaint> for ComplaintDescription {
    fn from(complaint: Complaint) -> Self {
        let Complaint { id, complaint } = complaint;
        Self {
            id: id.into(),
            nid: complaint.nid,
            subject: complaint.subject,
            description: complaint.description,
            status: complaint.status,
            created_at: complaint.created_at.to_chrono(),
            updated_at: complaint.updated_at.to_chrono(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ComplaintPage {
    pub complaints: Vec<ComplaintDescription>,
    pub pagination: PaginationResult,
}
