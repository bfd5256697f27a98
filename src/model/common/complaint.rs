use mongodb::bson::{to_bson, Bson};
use serde::{Deserialize, Serialize};

/// Handling stages of a citizen complaint, in the only order they may be
/// passed through.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplaintStatus {
    #[default]
    Pending,
    InReview,
    Resolved,
}

impl ComplaintStatus {
    /// Can a complaint in this state be moved to `next`?
    pub fn can_become(self, next: Self) -> bool {
        next > self
    }
}

impl From<ComplaintStatus> for Bson {
    fn from(status: ComplaintStatus) -> Self {
        to_bson(&status).expect("Serialisation is infallible")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_only() {
        use ComplaintStatus::*;
        assert!(Pending.can_become(InReview));
        assert!(Pending.can_become(Resolved));
        assert!(InReview.can_become(Resolved));
        assert!(!Resolved.can_become(InReview));
        assert!(!InReview.can_become(InReview));
    }
}
