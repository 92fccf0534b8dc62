//! Donor matching: compatibility, distance and candidate selection.

pub mod compatibility;
pub mod geo;
pub mod selector;

pub use compatibility::{can_donate, compatible_donors};
pub use geo::{EARTH_RADIUS_KM, bounding_box, distance_km, within_radius};
pub use selector::{DonorSelector, Selection};
