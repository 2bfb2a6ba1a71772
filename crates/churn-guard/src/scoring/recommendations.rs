use serde::Serialize;

use super::risk::RiskTier;

/// A single retention step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RecommendedAction {
    pub title: &'static str,
    pub detail: &'static str,
}

/// Fixed retention playbook for one risk tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ActionPlan {
    pub tier: RiskTier,
    pub headline: &'static str,
    pub actions: &'static [RecommendedAction],
}

const HIGH_RISK_PLAN: ActionPlan = ActionPlan {
    tier: RiskTier::High,
    headline: "Urgent action: high churn risk",
    actions: &[
        RecommendedAction {
            title: "Direct contact",
            detail: "Call the customer within the day",
        },
        RecommendedAction {
            title: "VIP offer",
            detail: "25-30% off the service fee for six months",
        },
        RecommendedAction {
            title: "Contract migration",
            detail: "Propose a one- or two-year contract with special incentives",
        },
        RecommendedAction {
            title: "Retention budget",
            detail: "One free month of a premium service",
        },
    ],
};

const MEDIUM_RISK_PLAN: ActionPlan = ActionPlan {
    tier: RiskTier::Medium,
    headline: "Close monitoring: medium churn risk",
    actions: &[
        RecommendedAction {
            title: "Personalised e-mail",
            detail: "Send offers tailored to the customer's usage pattern",
        },
        RecommendedAction {
            title: "Incentive",
            detail: "10-15% discount for moving to a long-term contract",
        },
        RecommendedAction {
            title: "Education",
            detail: "Introduce features the customer has not used yet",
        },
        RecommendedAction {
            title: "Check-in call",
            detail: "Call to ask about satisfaction",
        },
    ],
};

const LOW_RISK_PLAN: ActionPlan = ActionPlan {
    tier: RiskTier::Low,
    headline: "Maintain and grow: loyal customer",
    actions: &[
        RecommendedAction {
            title: "Loyalty rewards",
            detail: "Reward points and birthday offers",
        },
        RecommendedAction {
            title: "Smart upsell",
            detail: "Suggest a premium plan that fits current usage",
        },
        RecommendedAction {
            title: "Referral programme",
            detail: "Reward the customer for referring friends",
        },
        RecommendedAction {
            title: "VIP treatment",
            detail: "Priority support and early access to new features",
        },
    ],
};

/// Look up the action plan for `tier`.
pub const fn select(tier: RiskTier) -> ActionPlan {
    match tier {
        RiskTier::High => HIGH_RISK_PLAN,
        RiskTier::Medium => MEDIUM_RISK_PLAN,
        RiskTier::Low => LOW_RISK_PLAN,
    }
}
