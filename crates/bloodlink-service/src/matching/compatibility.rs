//! Red cell transfusion compatibility.

use bloodlink_entity::blood::BloodType;
use bloodlink_entity::blood::BloodType::{AbNeg, AbPos, ANeg, APos, BNeg, BPos, ONeg, OPos};

/// Donor groups that may give red cells to a patient of `patient` group.
///
/// O- appears in every set and AB+ receives from all eight groups.
pub fn compatible_donors(patient: BloodType) -> &'static [BloodType] {
    match patient {
        ONeg => &[ONeg],
        OPos => &[ONeg, OPos],
        ANeg => &[ONeg, ANeg],
        APos => &[ONeg, OPos, ANeg, APos],
        BNeg => &[ONeg, BNeg],
        BPos => &[ONeg, OPos, BNeg, BPos],
        AbNeg => &[ONeg, ANeg, BNeg, AbNeg],
        AbPos => &[ONeg, OPos, ANeg, APos, BNeg, BPos, AbNeg, AbPos],
    }
}

/// Whether a `donor` may give to a `patient`.
pub fn can_donate(donor: BloodType, patient: BloodType) -> bool {
    compatible_donors(patient).contains(&donor)
}
