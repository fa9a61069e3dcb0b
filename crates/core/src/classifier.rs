use crate::domain::intent::IntentLabel;

/// Label plus calibrated confidence in [0, 1].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Classification {
    pub intent: IntentLabel,
    pub confidence: f32,
}

/// Confidence assigned when nothing matched and the engine falls back to
/// `other`. Kept below the default escalation threshold on purpose.
pub const FALLBACK_CONFIDENCE: f32 = 0.2;

/// Deterministic keyword classifier over the closed intent set.
///
/// Labels are evaluated in a fixed precedence order so overlapping cues
/// resolve the same way on every run: an emergency never loses to a
/// greeting, and a payment dispute never drops to a general question.
#[derive(Clone, Debug, Default)]
pub struct MessageClassifier;

struct LabelCues {
    label: IntentLabel,
    base_confidence: f32,
    words: &'static [&'static str],
    phrases: &'static [&'static str],
}

const CUE_TABLE: &[LabelCues] = &[
    LabelCues {
        label: IntentLabel::Emergency,
        base_confidence: 0.95,
        words: &["emergency", "fire", "ambulance", "911"],
        phrases: &["medical emergency", "call a doctor", "help right now", "someone collapsed"],
    },
    LabelCues {
        label: IntentLabel::PaymentIssue,
        base_confidence: 0.8,
        words: &["refund", "overcharged", "invoice", "billing"],
        phrases: &["charged twice", "card declined", "wrong charge", "payment failed",
            "charge on my bill"],
    },
    LabelCues {
        label: IntentLabel::Complaint,
        base_confidence: 0.75,
        words: &["complaint", "unacceptable", "disappointed", "terrible", "awful", "dirty"],
        phrases: &["not working", "too noisy", "too cold", "too hot", "still waiting",
            "never arrived"],
    },
    LabelCues {
        label: IntentLabel::BookingInquiry,
        base_confidence: 0.8,
        words: &["book", "booking", "reserve", "reservation"],
        phrases: &["table for", "any availability", "free slot", "make a reservation"],
    },
    LabelCues {
        label: IntentLabel::ServiceRequest,
        base_confidence: 0.75,
        words: &["towels", "housekeeping", "laundry", "taxi", "toiletries"],
        phrases: &["room service", "wake-up call", "extra pillow", "extra pillows",
            "clean my room", "send up", "can you bring", "order some"],
    },
    LabelCues {
        label: IntentLabel::LoyaltyInquiry,
        base_confidence: 0.75,
        words: &["loyalty", "points", "rewards", "membership"],
        phrases: &["member tier", "status match", "redeem my"],
    },
    LabelCues {
        label: IntentLabel::Compliment,
        base_confidence: 0.7,
        words: &["thanks", "wonderful", "amazing", "excellent", "fantastic", "lovely"],
        phrases: &["thank you", "great stay", "loved the", "really enjoyed"],
    },
    LabelCues {
        label: IntentLabel::Greeting,
        base_confidence: 0.7,
        words: &["hello", "hi", "hey", "greetings"],
        phrases: &["good morning", "good afternoon", "good evening"],
    },
];

impl MessageClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Pure function of the text and the label set. Never errors outward:
    /// anything that matches no cue collapses to `other` with low confidence.
    pub fn classify(&self, text: &str) -> Classification {
        let normalized = text.to_ascii_lowercase();
        let tokens = tokenize(&normalized);

        if tokens.is_empty() {
            return Classification {
                intent: IntentLabel::Other,
                confidence: FALLBACK_CONFIDENCE,
            };
        }

        for cues in CUE_TABLE {
            let word_hits =
                cues.words.iter().filter(|word| tokens.iter().any(|t| t == **word)).count();
            let phrase_hits =
                cues.phrases.iter().filter(|phrase| normalized.contains(**phrase)).count();
            let hits = word_hits + phrase_hits;
            if hits > 0 {
                let confidence =
                    (cues.base_confidence + 0.05 * (hits.saturating_sub(1) as f32)).min(0.95);
                return Classification { intent: cues.label, confidence };
            }
        }

        if looks_like_question(&normalized, &tokens) {
            return Classification { intent: IntentLabel::GeneralQuestion, confidence: 0.6 };
        }

        Classification { intent: IntentLabel::Other, confidence: FALLBACK_CONFIDENCE }
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_ascii_alphanumeric() && c != '-')
        .filter(|token| !token.is_empty())
        .map(|token| token.to_string())
        .collect()
}

fn looks_like_question(normalized: &str, tokens: &[String]) -> bool {
    if normalized.trim_end().ends_with('?') {
        return true;
    }
    let openers =
        ["what", "where", "when", "how", "why", "which", "who", "do", "does", "is", "are", "can"];
    tokens.first().is_some_and(|first| openers.contains(&first.as_str()))
}
