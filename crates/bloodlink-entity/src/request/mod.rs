//! Blood request entities.

pub mod geo;
pub mod model;
pub mod status;

pub use geo::{BoundingBox, Coordinates};
pub use model::{BloodRequest, Hospital, MatchedDonor, PatientInfo};
pub use status::{MatchStatus, RequestStatus};
