use crate::domain::intent::IntentLabel;

/// The two execution paths a classified message can take.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoutePath {
    /// Grounded answer straight from knowledge retrieval; no tool loop.
    Knowledge,
    /// Full generation loop with tool proposals.
    Generation,
}

/// Pure, swappable decision table mapping intents onto paths. The default
/// table sends factual lookups to retrieval and everything conversational
/// or actionable to the generation loop.
#[derive(Clone, Debug)]
pub struct RoutePolicy {
    knowledge_intents: Vec<IntentLabel>,
}

impl Default for RoutePolicy {
    fn default() -> Self {
        Self {
            knowledge_intents: vec![
                IntentLabel::GeneralQuestion,
                IntentLabel::ServiceRequest,
                IntentLabel::BookingInquiry,
            ],
        }
    }
}

impl RoutePolicy {
    pub fn with_knowledge_intents(knowledge_intents: Vec<IntentLabel>) -> Self {
        Self { knowledge_intents }
    }

    pub fn route(&self, intent: IntentLabel) -> RoutePath {
        if self.knowledge_intents.contains(&intent) {
            RoutePath::Knowledge
        } else {
            RoutePath::Generation
        }
    }
}

/// Routes with the default policy table.
pub fn route(intent: IntentLabel) -> RoutePath {
    RoutePolicy::default().route(intent)
}

#[cfg(test)]
mod tests {
    use crate::domain::intent::IntentLabel;

    use super::{route, RoutePath, RoutePolicy};

    #[test]
    fn default_table_sends_lookup_intents_to_knowledge() {
        for intent in [
            IntentLabel::GeneralQuestion,
            IntentLabel::ServiceRequest,
            IntentLabel::BookingInquiry,
        ] {
            assert_eq!(route(intent), RoutePath::Knowledge, "{intent}");
        }
    }

    #[test]
    fn all_remaining_labels_go_to_generation() {
        for intent in [
            IntentLabel::Greeting,
            IntentLabel::Complaint,
            IntentLabel::Compliment,
            IntentLabel::Emergency,
            IntentLabel::LoyaltyInquiry,
            IntentLabel::PaymentIssue,
            IntentLabel::Other,
        ] {
            assert_eq!(route(intent), RoutePath::Generation, "{intent}");
        }
    }

    #[test]
    fn policy_table_is_swappable() {
        let policy = RoutePolicy::with_knowledge_intents(vec![IntentLabel::LoyaltyInquiry]);
        assert_eq!(policy.route(IntentLabel::LoyaltyInquiry), RoutePath::Knowledge);
        assert_eq!(policy.route(IntentLabel::GeneralQuestion), RoutePath::Generation);
    }
}
