use serde::{Deserialize, Serialize};

use crate::model::{api::id::ApiId, db::admin::Admin};

/// An admin as shown to other admins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminDescription {
    pub id: ApiId,
    pub username: String,
}

impl From<Admin> for AdminDescription {
    fn from(admin: Admin) -> Self {
        Self {
            id: admin.id.into(),
            username: admin.admin.username,
        }
    }
}

/// Identifies an admin to delete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminUsername {
    pub username: String,
}
