use serde::{Deserialize, Serialize};

use super::recommendations::ActionPlan;
use super::risk::RiskTier;
use super::schema::Field;

/// Raw customer attributes as supplied by the caller for a single scoring request.
///
/// Categorical attributes are carried verbatim; domain checks happen in the encoder so that a
/// rejected record can name the offending field and value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CustomerRecord {
    #[serde(rename = "gender")]
    pub gender: String,
    #[serde(rename = "SeniorCitizen")]
    pub senior_citizen: SeniorCitizen,
    #[serde(rename = "Partner")]
    pub partner: String,
    #[serde(rename = "Dependents")]
    pub dependents: String,
    #[serde(rename = "tenure")]
    pub tenure: i64,
    #[serde(rename = "PhoneService")]
    pub phone_service: String,
    #[serde(rename = "MultipleLines")]
    pub multiple_lines: String,
    #[serde(rename = "InternetService")]
    pub internet_service: String,
    #[serde(rename = "OnlineSecurity")]
    pub online_security: String,
    #[serde(rename = "OnlineBackup")]
    pub online_backup: String,
    #[serde(rename = "DeviceProtection")]
    pub device_protection: String,
    #[serde(rename = "TechSupport")]
    pub tech_support: String,
    #[serde(rename = "StreamingTV")]
    pub streaming_tv: String,
    #[serde(rename = "StreamingMovies")]
    pub streaming_movies: String,
    #[serde(rename = "Contract")]
    pub contract: String,
    #[serde(rename = "PaperlessBilling")]
    pub paperless_billing: String,
    #[serde(rename = "PaymentMethod")]
    pub payment_method: String,
    #[serde(rename = "MonthlyCharges")]
    pub monthly_charges: f64,
    #[serde(rename = "TotalCharges")]
    pub total_charges: f64,
}

impl CustomerRecord {
    /// Borrow the raw value stored for `field`.
    pub fn value(&self, field: Field) -> RawValue<'_> {
        match field {
            Field::Gender => RawValue::Label(&self.gender),
            Field::SeniorCitizen => RawValue::Senior(&self.senior_citizen),
            Field::Partner => RawValue::Label(&self.partner),
            Field::Dependents => RawValue::Label(&self.dependents),
            Field::Tenure => RawValue::Integer(self.tenure),
            Field::PhoneService => RawValue::Label(&self.phone_service),
            Field::MultipleLines => RawValue::Label(&self.multiple_lines),
            Field::InternetService => RawValue::Label(&self.internet_service),
            Field::OnlineSecurity => RawValue::Label(&self.online_security),
            Field::OnlineBackup => RawValue::Label(&self.online_backup),
            Field::DeviceProtection => RawValue::Label(&self.device_protection),
            Field::TechSupport => RawValue::Label(&self.tech_support),
            Field::StreamingTV => RawValue::Label(&self.streaming_tv),
            Field::StreamingMovies => RawValue::Label(&self.streaming_movies),
            Field::Contract => RawValue::Label(&self.contract),
            Field::PaperlessBilling => RawValue::Label(&self.paperless_billing),
            Field::PaymentMethod => RawValue::Label(&self.payment_method),
            Field::MonthlyCharges => RawValue::Real(self.monthly_charges),
            Field::TotalCharges => RawValue::Real(self.total_charges),
        }
    }
}

/// Borrowed view of one attribute of a [`CustomerRecord`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawValue<'a> {
    Label(&'a str),
    Senior(&'a SeniorCitizen),
    Integer(i64),
    Real(f64),
}

/// `SeniorCitizen` arrives either pre-binarized (`0`/`1`, the dataset export) or as a form label
/// (`"No"`/`"Yes"`). The encoder coerces both to the label before lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SeniorCitizen {
    Flag(i64),
    Label(String),
}

impl SeniorCitizen {
    /// Parse a CSV cell, which carries no type information.
    pub fn from_cell(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.parse::<i64>() {
            Ok(flag) => Self::Flag(flag),
            Err(_) => Self::Label(trimmed.to_string()),
        }
    }
}

impl From<bool> for SeniorCitizen {
    fn from(value: bool) -> Self {
        Self::Flag(i64::from(value))
    }
}

impl std::fmt::Display for SeniorCitizen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Flag(flag) => write!(f, "{flag}"),
            Self::Label(label) => f.write_str(label),
        }
    }
}

/// Fixed-order numeric encoding of a customer record, one value per schema field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct EncodedFeatureVector(Vec<f64>);

impl EncodedFeatureVector {
    pub(crate) fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: Field) -> Option<f64> {
        self.0.get(field as usize).copied()
    }
}

impl From<Vec<f64>> for EncodedFeatureVector {
    fn from(values: Vec<f64>) -> Self {
        Self(values)
    }
}

/// Everything the caller needs to present one scored customer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoringResult {
    pub predicted_label: u8,
    pub probability: f64,
    pub risk_tier: RiskTier,
    pub factors: Vec<String>,
    pub recommendation: ActionPlan,
}

impl ScoringResult {
    pub fn will_churn(&self) -> bool {
        self.predicted_label == 1
    }

    pub fn churn_label(&self) -> &'static str {
        if self.will_churn() {
            "Yes"
        } else {
            "No"
        }
    }
}
