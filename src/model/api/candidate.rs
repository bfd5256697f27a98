use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    api::id::ApiId,
    common::CandidateStatus,
    db::candidate::{Candidate, NewCandidate},
};

/// A candidate as submitted by an admin, for creation or replacement.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateSpec {
    pub name: String,
    pub party: String,
    #[serde(default)]
    pub photo: Option<String>,
    pub symbol: String,
    pub area: String,
    #[serde(default)]
    pub biography: String,
    #[serde(default)]
    pub education: String,
    #[serde(default)]
    pub status: CandidateStatus,
}

impl From<CandidateSpec> for NewCandidate {
    fn from(spec: CandidateSpec) -> Self {
        Self {
            name: spec.name,
            party: spec.party,
            photo: spec.photo,
            symbol: spec.symbol,
            area: spec.area,
            biography: spec.biography,
            education: spec.education,
            status: spec.status,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateDescription {
    pub id: ApiId,
    pub name: String,
    pub party: String,
    pub photo: Option<String>,
    pub symbol: String,
    pub area: String,
    pub biography: String,
    pub education: String,
    pub status: CandidateStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Candidate> for CandidateDescription {
    fn from(candidate: Candidate) -> Self {
        let Candidate {
            id,
            candidate,
            created_at,
            updated_at,
        } = candidate;
        Self {
            id: id.into(),
            name: candidate.name,
            party: candidate.party,
            photo: candidate.photo,
            symbol: candidate.symbol,
            area: candidate.area,
            biography: candidate.biography,
            education: candidate.education,
            status: candidate.status,
            created_at: created_at.to_chrono(),
            updated_at: updated_at.to_chrono(),
        }
    }
}
