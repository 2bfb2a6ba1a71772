use super::domain::CustomerRecord;

/// Returned alone when no risk rule fires, so callers always have a line to show.
pub const STABLE_PROFILE: &str = "Stable customer profile";

const HIGH_MONTHLY_CHARGES: f64 = 70.0;
const NEW_CUSTOMER_TENURE_MONTHS: i64 = 12;

/// One row of the decision table: a predicate over the raw record and the message it yields.
pub struct FactorRule {
    pub key: &'static str,
    pub message: &'static str,
    pub applies: fn(&CustomerRecord) -> bool,
}

/// Evaluated top to bottom; output order follows this table.
pub const FACTOR_RULES: &[FactorRule] = &[
    FactorRule {
        key: "month_to_month_contract",
        message: "Month-to-month contract (short-term commitment raises risk)",
        applies: |record| record.contract == "Month-to-month",
    },
    FactorRule {
        key: "new_customer",
        message: "New customer (tenure under 12 months raises risk)",
        applies: |record| record.tenure < NEW_CUSTOMER_TENURE_MONTHS,
    },
    FactorRule {
        key: "fiber_without_security",
        message: "Fiber optic without online security add-on",
        applies: |record| {
            record.internet_service == "Fiber optic" && record.online_security == "No"
        },
    },
    FactorRule {
        key: "electronic_check",
        message: "Pays by electronic check",
        applies: |record| record.payment_method == "Electronic check",
    },
    FactorRule {
        key: "high_monthly_charges",
        message: "High monthly charges (over $70)",
        applies: |record| record.monthly_charges > HIGH_MONTHLY_CHARGES,
    },
];

/// Collect the message of every rule that holds for `record`, or the stable-profile sentinel.
pub fn analyze(record: &CustomerRecord) -> Vec<&'static str> {
    let factors: Vec<&'static str> = FACTOR_RULES
        .iter()
        .filter(|rule| (rule.applies)(record))
        .map(|rule| rule.message)
        .collect();

    if factors.is_empty() {
        vec![STABLE_PROFILE]
    } else {
        factors
    }
}
