use serde::{Deserialize, Serialize};

/// Closed set of labels describing what a guest message is trying to
/// accomplish. Classification never produces anything outside this set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentLabel {
    Greeting,
    BookingInquiry,
    ServiceRequest,
    Complaint,
    Compliment,
    Emergency,
    GeneralQuestion,
    LoyaltyInquiry,
    PaymentIssue,
    Other,
}

impl IntentLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Greeting => "greeting",
            Self::BookingInquiry => "booking_inquiry",
            Self::ServiceRequest => "service_request",
            Self::Complaint => "complaint",
            Self::Compliment => "compliment",
            Self::Emergency => "emergency",
            Self::GeneralQuestion => "general_question",
            Self::LoyaltyInquiry => "loyalty_inquiry",
            Self::PaymentIssue => "payment_issue",
            Self::Other => "other",
        }
    }

    pub const ALL: [IntentLabel; 10] = [
        Self::Greeting,
        Self::BookingInquiry,
        Self::ServiceRequest,
        Self::Complaint,
        Self::Compliment,
        Self::Emergency,
        Self::GeneralQuestion,
        Self::LoyaltyInquiry,
        Self::PaymentIssue,
        Self::Other,
    ];
}

impl std::fmt::Display for IntentLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
