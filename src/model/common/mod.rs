//! Types shared between the database and API representations.

pub mod ballot;
pub mod complaint;
pub mod nid;
pub mod otp;
pub mod sms;

pub use ballot::{BallotStatus, CandidateStatus};
pub use complaint::ComplaintStatus;
pub use nid::Nid;
pub use otp::Code;
pub use sms::Sms;
