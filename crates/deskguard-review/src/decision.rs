//! Escalation decision engine.
//!
//! Given the metadata of an AI-drafted response and a [`ReviewPolicy`],
//! [`decide`] returns whether the draft may be sent automatically, must wait
//! for a human reviewer, or must be escalated.
//!
//! The engine is an ordered table of named rules evaluated first-match-wins.
//! The ordering is a contract, not an implementation detail: the checks are
//! not commutative (a critical-priority veto fires before the confidence
//! checks ever run, so even a 0.99-confidence draft on a critical ticket is
//! escalated). Each rule is independently unit-testable and the winning
//! rule's name is carried on the [`Decision`] for audit.
//!
//! The engine is pure: no I/O, no side effects, identical inputs produce
//! identical decisions.

use serde::{Deserialize, Serialize};

use crate::types::{Intent, Priority, Sentiment, Verdict};

/// Confidence floor below which an unclassified intent forces escalation.
///
/// Intent classification and generation confidence are independent signals:
/// a confidently-generated response whose intent could not be classified is
/// not escalated by this rule.
pub const UNKNOWN_INTENT_CONFIDENCE_FLOOR: f32 = 0.70;

/// Confidence floor below which non-angry negative sentiment forces
/// escalation.
pub const NEGATIVE_SENTIMENT_CONFIDENCE_FLOOR: f32 = 0.75;

/// Metadata of a drafted response, as supplied by the draft source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftSignals {
    /// Generation confidence in [0, 1].
    pub confidence: f32,
    /// Classified intent of the requester message.
    pub intent: Intent,
    /// Detected sentiment of the requester message.
    pub sentiment: Sentiment,
    /// Priority of the underlying ticket or task.
    pub priority: Priority,
    /// Whether the requester is flagged as a VIP account.
    pub requester_is_vip: bool,
}

/// Policy configuration for the decision engine.
///
/// Loaded from application config; all fields have the documented defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewPolicy {
    /// Confidence at or above this, with no veto, allows auto-send.
    #[serde(default = "default_min_confidence_for_auto")]
    pub min_confidence_for_auto: f32,

    /// Confidence strictly below this forces escalation.
    #[serde(default = "default_auto_escalate_threshold")]
    pub auto_escalate_threshold: f32,

    /// Escalate when the requester sounds angry.
    #[serde(default = "default_true")]
    pub escalate_on_angry_sentiment: bool,

    /// Escalate when the requester is a VIP account.
    #[serde(default = "default_true")]
    pub escalate_on_vip: bool,

    /// Escalate urgent and critical priority tickets.
    #[serde(default = "default_true")]
    pub escalate_on_critical_priority: bool,
}

fn default_min_confidence_for_auto() -> f32 {
    0.85
}

fn default_auto_escalate_threshold() -> f32 {
    0.60
}

fn default_true() -> bool {
    true
}

impl Default for ReviewPolicy {
    fn default() -> Self {
        Self {
            min_confidence_for_auto: default_min_confidence_for_auto(),
            auto_escalate_threshold: default_auto_escalate_threshold(),
            escalate_on_angry_sentiment: true,
            escalate_on_vip: true,
            escalate_on_critical_priority: true,
        }
    }
}

/// The engine's verdict for one draft, with the reason and winning rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub verdict: Verdict,
    /// Human-readable reason, surfaced in the review UI and audit trail.
    pub reason: String,
    /// Name of the rule that produced the verdict.
    pub rule: &'static str,
}

type RuleFn = fn(&DraftSignals, &ReviewPolicy) -> Option<(Verdict, String)>;

struct Rule {
    name: &'static str,
    check: RuleFn,
}

/// The rule table. Order is the evaluation contract.
const RULES: &[Rule] = &[
    Rule {
        name: "critical_priority",
        check: check_critical_priority,
    },
    Rule {
        name: "angry_sentiment",
        check: check_angry_sentiment,
    },
    Rule {
        name: "vip_requester",
        check: check_vip_requester,
    },
    Rule {
        name: "low_confidence",
        check: check_low_confidence,
    },
    Rule {
        name: "unknown_intent",
        check: check_unknown_intent,
    },
    Rule {
        name: "negative_sentiment",
        check: check_negative_sentiment,
    },
    Rule {
        name: "confident",
        check: check_confident,
    },
];

fn check_critical_priority(signals: &DraftSignals, policy: &ReviewPolicy) -> Option<(Verdict, String)> {
    if policy.escalate_on_critical_priority && signals.priority.is_escalation_worthy() {
        return Some((
            Verdict::Escalate,
            format!("{} priority requires a human response", signals.priority),
        ));
    }
    None
}

fn check_angry_sentiment(signals: &DraftSignals, policy: &ReviewPolicy) -> Option<(Verdict, String)> {
    if policy.escalate_on_angry_sentiment && signals.sentiment == Sentiment::Angry {
        return Some((
            Verdict::Escalate,
            "angry customer sentiment detected".to_string(),
        ));
    }
    None
}

fn check_vip_requester(signals: &DraftSignals, policy: &ReviewPolicy) -> Option<(Verdict, String)> {
    if policy.escalate_on_vip && signals.requester_is_vip {
        return Some((Verdict::Escalate, "VIP requester".to_string()));
    }
    None
}

fn check_low_confidence(signals: &DraftSignals, policy: &ReviewPolicy) -> Option<(Verdict, String)> {
    if signals.confidence < policy.auto_escalate_threshold {
        return Some((
            Verdict::Escalate,
            format!("low confidence ({:.2})", signals.confidence),
        ));
    }
    None
}

fn check_unknown_intent(signals: &DraftSignals, _policy: &ReviewPolicy) -> Option<(Verdict, String)> {
    if signals.intent.is_unknown() && signals.confidence < UNKNOWN_INTENT_CONFIDENCE_FLOOR {
        return Some((
            Verdict::Escalate,
            "low confidence on undetermined intent".to_string(),
        ));
    }
    None
}

fn check_negative_sentiment(
    signals: &DraftSignals,
    _policy: &ReviewPolicy,
) -> Option<(Verdict, String)> {
    if signals.sentiment == Sentiment::Negative
        && signals.confidence < NEGATIVE_SENTIMENT_CONFIDENCE_FLOOR
    {
        return Some((
            Verdict::Escalate,
            format!(
                "negative sentiment with marginal confidence ({:.2})",
                signals.confidence
            ),
        ));
    }
    None
}

fn check_confident(signals: &DraftSignals, policy: &ReviewPolicy) -> Option<(Verdict, String)> {
    if signals.confidence >= policy.min_confidence_for_auto {
        return Some((
            Verdict::AutoSend,
            format!(
                "confidence {:.2} meets the auto-send threshold",
                signals.confidence
            ),
        ));
    }
    None
}

/// Decide the fate of a drafted response.
///
/// Deterministic and side-effect free; safe to call concurrently and to
/// retry.
pub fn decide(signals: &DraftSignals, policy: &ReviewPolicy) -> Decision {
    for rule in RULES {
        if let Some((verdict, reason)) = (rule.check)(signals, policy) {
            return Decision {
                verdict,
                reason,
                rule: rule.name,
            };
        }
    }

    Decision {
        verdict: Verdict::HoldForReview,
        reason: "confidence below the auto-send threshold; held for human review".to_string(),
        rule: "hold_for_review",
    }
}

/// Decide for a draft that could not be generated at all.
///
/// A failed generation is treated as maximally untrusted (confidence 0.0),
/// which forces escalation regardless of policy thresholds.
pub fn decide_for_failed_generation(_policy: &ReviewPolicy) -> Decision {
    Decision {
        verdict: Verdict::Escalate,
        reason: "draft generation failed; response treated as untrusted".to_string(),
        rule: "generation_failed",
    }
}

/// Names of the rules in evaluation order.
pub fn rule_names() -> Vec<&'static str> {
    RULES.iter().map(|r| r.name).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signals(confidence: f32) -> DraftSignals {
        DraftSignals {
            confidence,
            intent: Intent::new("refund"),
            sentiment: Sentiment::Neutral,
            priority: Priority::Normal,
            requester_is_vip: false,
        }
    }

    #[test]
    fn test_rule_order_is_the_contract() {
        assert_eq!(
            rule_names(),
            vec![
                "critical_priority",
                "angry_sentiment",
                "vip_requester",
                "low_confidence",
                "unknown_intent",
                "negative_sentiment",
                "confident",
            ]
        );
    }

    #[test]
    fn test_decision_is_deterministic() {
        let policy = ReviewPolicy::default();
        let s = DraftSignals {
            confidence: 0.72,
            intent: Intent::unknown(),
            sentiment: Sentiment::Negative,
            priority: Priority::High,
            requester_is_vip: false,
        };
        let first = decide(&s, &policy);
        for _ in 0..10 {
            assert_eq!(decide(&s, &policy), first);
        }
    }

    #[test]
    fn test_critical_priority_overrides_high_confidence() {
        let policy = ReviewPolicy::default();
        let mut s = signals(0.95);
        s.priority = Priority::Critical;

        let decision = decide(&s, &policy);
        assert_eq!(decision.verdict, Verdict::Escalate);
        assert!(decision.reason.contains("critical"));
        assert_eq!(decision.rule, "critical_priority");
    }

    #[test]
    fn test_urgent_priority_escalates() {
        let policy = ReviewPolicy::default();
        let mut s = signals(0.99);
        s.priority = Priority::Urgent;

        let decision = decide(&s, &policy);
        assert_eq!(decision.verdict, Verdict::Escalate);
        assert!(decision.reason.contains("urgent"));
    }

    #[test]
    fn test_priority_veto_can_be_disabled() {
        let policy = ReviewPolicy {
            escalate_on_critical_priority: false,
            ..Default::default()
        };
        let mut s = signals(0.95);
        s.priority = Priority::Critical;

        assert_eq!(decide(&s, &policy).verdict, Verdict::AutoSend);
    }

    #[test]
    fn test_angry_sentiment_escalates() {
        let policy = ReviewPolicy::default();
        let mut s = signals(0.95);
        s.sentiment = Sentiment::Angry;

        let decision = decide(&s, &policy);
        assert_eq!(decision.verdict, Verdict::Escalate);
        assert_eq!(decision.rule, "angry_sentiment");
    }

    #[test]
    fn test_angry_veto_can_be_disabled() {
        let policy = ReviewPolicy {
            escalate_on_angry_sentiment: false,
            ..Default::default()
        };
        let mut s = signals(0.95);
        s.sentiment = Sentiment::Angry;

        assert_eq!(decide(&s, &policy).verdict, Verdict::AutoSend);
    }

    #[test]
    fn test_vip_escalates_before_confidence_rules() {
        let policy = ReviewPolicy::default();
        let mut s = signals(0.99);
        s.requester_is_vip = true;

        let decision = decide(&s, &policy);
        assert_eq!(decision.verdict, Verdict::Escalate);
        assert_eq!(decision.rule, "vip_requester");
    }

    #[test]
    fn test_low_confidence_escalates() {
        let policy = ReviewPolicy::default();
        let decision = decide(&signals(0.55), &policy);
        assert_eq!(decision.verdict, Verdict::Escalate);
        assert!(decision.reason.contains("low confidence"));
    }

    #[test]
    fn test_auto_escalate_threshold_is_exclusive() {
        let policy = ReviewPolicy::default();
        // Exactly at the threshold: rule 4 does not fire.
        let decision = decide(&signals(0.60), &policy);
        assert_eq!(decision.verdict, Verdict::HoldForReview);
    }

    #[test]
    fn test_unknown_intent_with_middling_confidence_escalates() {
        let policy = ReviewPolicy::default();
        let mut s = signals(0.65);
        s.intent = Intent::unknown();

        let decision = decide(&s, &policy);
        assert_eq!(decision.verdict, Verdict::Escalate);
        assert!(decision.reason.contains("undetermined intent"));
    }

    #[test]
    fn test_unknown_intent_with_confident_draft_is_not_escalated() {
        // Intent classification and generation confidence are independent
        // signals: a confident draft with an unknown intent label passes.
        let policy = ReviewPolicy::default();
        let mut s = signals(0.72);
        s.intent = Intent::unknown();
        assert_eq!(decide(&s, &policy).verdict, Verdict::HoldForReview);

        s.confidence = 0.90;
        assert_eq!(decide(&s, &policy).verdict, Verdict::AutoSend);
    }

    #[test]
    fn test_negative_sentiment_with_marginal_confidence_escalates() {
        let policy = ReviewPolicy::default();
        let mut s = signals(0.74);
        s.sentiment = Sentiment::Negative;

        let decision = decide(&s, &policy);
        assert_eq!(decision.verdict, Verdict::Escalate);
        assert_eq!(decision.rule, "negative_sentiment");
    }

    #[test]
    fn test_negative_sentiment_above_floor_holds() {
        let policy = ReviewPolicy::default();
        let mut s = signals(0.76);
        s.sentiment = Sentiment::Negative;
        assert_eq!(decide(&s, &policy).verdict, Verdict::HoldForReview);

        s.confidence = 0.90;
        assert_eq!(decide(&s, &policy).verdict, Verdict::AutoSend);
    }

    #[test]
    fn test_auto_send_boundary() {
        let policy = ReviewPolicy::default();
        assert_eq!(decide(&signals(0.85), &policy).verdict, Verdict::AutoSend);
        assert_eq!(
            decide(&signals(0.849_999), &policy).verdict,
            Verdict::HoldForReview
        );
    }

    #[test]
    fn test_default_fallback_holds_for_review() {
        let policy = ReviewPolicy::default();
        let decision = decide(&signals(0.75), &policy);
        assert_eq!(decision.verdict, Verdict::HoldForReview);
        assert_eq!(decision.rule, "hold_for_review");
    }

    #[test]
    fn test_nan_confidence_falls_through_to_hold() {
        let policy = ReviewPolicy::default();
        let decision = decide(&signals(f32::NAN), &policy);
        assert_eq!(decision.verdict, Verdict::HoldForReview);
    }

    #[test]
    fn test_nan_confidence_still_hits_unconditional_vetoes() {
        let policy = ReviewPolicy::default();
        let mut s = signals(f32::NAN);
        s.sentiment = Sentiment::Angry;
        assert_eq!(decide(&s, &policy).verdict, Verdict::Escalate);
    }

    #[test]
    fn test_failed_generation_forces_escalation() {
        let policy = ReviewPolicy::default();
        let decision = decide_for_failed_generation(&policy);
        assert_eq!(decision.verdict, Verdict::Escalate);
        assert_eq!(decision.rule, "generation_failed");
    }

    #[test]
    fn test_policy_deserializes_with_defaults() {
        let policy: ReviewPolicy = serde_json::from_str("{}").unwrap();
        assert!((policy.min_confidence_for_auto - 0.85).abs() < f32::EPSILON);
        assert!((policy.auto_escalate_threshold - 0.60).abs() < f32::EPSILON);
        assert!(policy.escalate_on_angry_sentiment);
        assert!(policy.escalate_on_vip);
        assert!(policy.escalate_on_critical_priority);
    }
}
