//! Blood group and urgency value types.

text_enum!(
    /// ABO group with Rh factor.
    BloodType {
        /// O negative, the universal donor.
        ONeg => "O-",
        /// O positive.
        OPos => "O+",
        /// A negative.
        ANeg => "A-",
        /// A positive.
        APos => "A+",
        /// B negative.
        BNeg => "B-",
        /// B positive.
        BPos => "B+",
        /// AB negative.
        AbNeg => "AB-",
        /// AB positive, the universal recipient.
        AbPos => "AB+",
    }
);

impl BloodType {
    /// Parse user input, tolerating surrounding whitespace and lower case.
    pub fn parse_lenient(input: &str) -> Result<Self, bloodlink_core::AppError> {
        let normalized = input.trim().to_ascii_uppercase();
        if normalized.is_empty() {
            return Err(bloodlink_core::AppError::validation("Blood type is required"));
        }
        normalized.parse()
    }

    /// Whether the Rh factor is negative.
    pub fn is_negative(&self) -> bool {
        matches!(self, Self::ONeg | Self::ANeg | Self::BNeg | Self::AbNeg)
    }
}

text_enum!(
    /// How quickly a request must be served.
    Urgency {
        /// Life-threatening, hours matter.
        Critical => "critical",
        /// Needed within the day.
        Urgent => "urgent",
        /// Planned transfusion.
        Standard => "standard",
    }
);

impl Urgency {
    /// Whether notifications for this urgency are flagged as urgent in-app.
    pub fn is_urgent(&self) -> bool {
        !matches!(self, Self::Standard)
    }
}
