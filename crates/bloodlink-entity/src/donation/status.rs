//! Donation confirmation status.

text_enum!(
    /// Confirmation state of a donation.
    DonationStatus {
        /// Neither party has confirmed.
        Pending => "pending",
        /// Only the donor has confirmed.
        DonorConfirmed => "donor_confirmed",
        /// Both parties confirmed. Terminal.
        Completed => "completed",
        /// A party reported a mismatch. Terminal for the engine.
        Disputed => "disputed",
    }
);

impl DonationStatus {
    /// Check if no further confirmation may change the record.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Disputed)
    }
}

text_enum!(
    /// Which side of the donation is confirming.
    ConfirmingParty {
        /// The person who gave blood.
        Donor => "donor",
        /// The requester who received it.
        Recipient => "recipient",
    }
);
