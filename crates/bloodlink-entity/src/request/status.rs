//! Request and match status enumerations.

text_enum!(
    /// Lifecycle of a blood request.
    RequestStatus {
        /// Accepting donors.
        Active => "active",
        /// Every required unit has been donated.
        Fulfilled => "fulfilled",
        /// Deadline passed before fulfillment.
        Expired => "expired",
        /// Withdrawn by the requester.
        Cancelled => "cancelled",
    }
);

impl RequestStatus {
    /// Check if the request no longer accepts donors.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Active)
    }
}

text_enum!(
    /// A matched donor's answer.
    MatchStatus {
        /// Notified, no answer yet.
        Pending => "pending",
        /// Agreed to donate.
        Accepted => "accepted",
        /// Declined.
        Declined => "declined",
    }
);
