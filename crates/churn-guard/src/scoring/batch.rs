//! Scoring for CSV exports in the customer dataset layout.
//!
//! Rows that fail validation are reported and skipped; a missing or broken artifact, or an
//! inference failure, aborts the whole batch because every remaining row would fail the same way.

use serde::{Deserialize, Deserializer, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tracing::{info, warn};

use super::artifacts::ArtifactStore;
use super::domain::{CustomerRecord, ScoringResult, SeniorCitizen};
use super::risk::RiskTier;
use super::service::{ChurnScoringService, ScoringError};

/// Fatal batch failures.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("failed to read batch input: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid batch CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Scoring(ScoringError),
}

/// Outcome for one data row (1-based, header excluded).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchOutcome {
    pub row: usize,
    pub customer_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ScoringResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_churn: Option<bool>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TierCounts {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
}

impl TierCounts {
    fn record(&mut self, tier: RiskTier) {
        match tier {
            RiskTier::Low => self.low += 1,
            RiskTier::Medium => self.medium += 1,
            RiskTier::High => self.high += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    pub rows: usize,
    pub scored: usize,
    pub rejected: usize,
    pub tiers: TierCounts,
    pub mean_probability: Option<f64>,
    /// Rows carrying a usable `Churn` label.
    pub labelled: usize,
    /// Share of labelled rows whose predicted label matches `Churn`.
    pub accuracy: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    pub summary: BatchSummary,
    pub outcomes: Vec<BatchOutcome>,
}

impl BatchReport {
    fn from_outcomes(outcomes: Vec<BatchOutcome>) -> Self {
        let mut tiers = TierCounts::default();
        let mut probability_sum = 0.0;
        let mut scored = 0;
        let mut labelled = 0;
        let mut correct = 0;

        for outcome in &outcomes {
            let Some(result) = &outcome.result else {
                continue;
            };
            scored += 1;
            probability_sum += result.probability;
            tiers.record(result.risk_tier);

            if let Some(actual) = outcome.actual_churn {
                labelled += 1;
                if actual == result.will_churn() {
                    correct += 1;
                }
            }
        }

        let summary = BatchSummary {
            rows: outcomes.len(),
            scored,
            rejected: outcomes.len() - scored,
            tiers,
            mean_probability: (scored > 0).then(|| probability_sum / scored as f64),
            labelled,
            accuracy: (labelled > 0).then(|| correct as f64 / labelled as f64),
        };

        Self { summary, outcomes }
    }
}

/// Score every row of a CSV export.
pub fn score_reader<R, S>(
    service: &ChurnScoringService<S>,
    reader: R,
) -> Result<BatchReport, BatchError>
where
    R: Read,
    S: ArtifactStore,
{
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut outcomes = Vec::new();

    for (index, row) in csv_reader.deserialize::<CustomerRow>().enumerate() {
        let row_number = index + 1;
        let row = match row {
            Ok(row) => row,
            Err(err) if matches!(err.kind(), csv::ErrorKind::Deserialize { .. }) => {
                warn!(row = row_number, error = %err, "skipping malformed batch row");
                outcomes.push(BatchOutcome {
                    row: row_number,
                    customer_id: None,
                    result: None,
                    error: Some(err.to_string()),
                    actual_churn: None,
                });
                continue;
            }
            Err(err) => return Err(err.into()),
        };

        let customer_id = row.customer_id.clone();
        let actual_churn = row.actual_churn();
        let outcome = match row.into_record() {
            Ok(record) => match service.score(&record) {
                Ok(result) => BatchOutcome {
                    row: row_number,
                    customer_id,
                    result: Some(result),
                    error: None,
                    actual_churn,
                },
                Err(ScoringError::Validation(err)) => BatchOutcome {
                    row: row_number,
                    customer_id,
                    result: None,
                    error: Some(err.to_string()),
                    actual_churn,
                },
                Err(fatal) => return Err(BatchError::Scoring(fatal)),
            },
            Err(reason) => BatchOutcome {
                row: row_number,
                customer_id,
                result: None,
                error: Some(reason),
                actual_churn,
            },
        };
        outcomes.push(outcome);
    }

    let report = BatchReport::from_outcomes(outcomes);
    info!(
        rows = report.summary.rows,
        scored = report.summary.scored,
        rejected = report.summary.rejected,
        "batch scoring complete"
    );
    Ok(report)
}

pub fn score_path<S>(
    service: &ChurnScoringService<S>,
    path: impl AsRef<Path>,
) -> Result<BatchReport, BatchError>
where
    S: ArtifactStore,
{
    let file = File::open(path)?;
    score_reader(service, file)
}

/// Write one CSV line per outcome.
pub fn write_outcomes<W: Write>(outcomes: &[BatchOutcome], writer: W) -> Result<(), BatchError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for outcome in outcomes {
        csv_writer.serialize(OutcomeRow::from(outcome))?;
    }
    csv_writer.flush()?;
    Ok(())
}

#[derive(Debug, Serialize)]
struct OutcomeRow<'a> {
    customer_id: &'a str,
    row: usize,
    predicted_label: Option<u8>,
    churn_probability: Option<f64>,
    risk_tier: Option<RiskTier>,
    factors: String,
    error: &'a str,
}

impl<'a> From<&'a BatchOutcome> for OutcomeRow<'a> {
    fn from(outcome: &'a BatchOutcome) -> Self {
        let result = outcome.result.as_ref();
        Self {
            customer_id: outcome.customer_id.as_deref().unwrap_or_default(),
            row: outcome.row,
            predicted_label: result.map(|result| result.predicted_label),
            churn_probability: result.map(|result| result.probability),
            risk_tier: result.map(|result| result.risk_tier),
            factors: result
                .map(|result| result.factors.join("; "))
                .unwrap_or_default(),
            error: outcome.error.as_deref().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CustomerRow {
    #[serde(rename = "customerID", default, deserialize_with = "empty_string_as_none")]
    customer_id: Option<String>,
    gender: String,
    #[serde(rename = "SeniorCitizen")]
    senior_citizen: String,
    #[serde(rename = "Partner")]
    partner: String,
    #[serde(rename = "Dependents")]
    dependents: String,
    tenure: i64,
    #[serde(rename = "PhoneService")]
    phone_service: String,
    #[serde(rename = "MultipleLines")]
    multiple_lines: String,
    #[serde(rename = "InternetService")]
    internet_service: String,
    #[serde(rename = "OnlineSecurity")]
    online_security: String,
    #[serde(rename = "OnlineBackup")]
    online_backup: String,
    #[serde(rename = "DeviceProtection")]
    device_protection: String,
    #[serde(rename = "TechSupport")]
    tech_support: String,
    #[serde(rename = "StreamingTV")]
    streaming_tv: String,
    #[serde(rename = "StreamingMovies")]
    streaming_movies: String,
    #[serde(rename = "Contract")]
    contract: String,
    #[serde(rename = "PaperlessBilling")]
    paperless_billing: String,
    #[serde(rename = "PaymentMethod")]
    payment_method: String,
    #[serde(rename = "MonthlyCharges")]
    monthly_charges: f64,
    #[serde(rename = "TotalCharges", default, deserialize_with = "empty_string_as_none")]
    total_charges: Option<String>,
    #[serde(rename = "Churn", default, deserialize_with = "empty_string_as_none")]
    churn: Option<String>,
}

impl CustomerRow {
    fn actual_churn(&self) -> Option<bool> {
        match self.churn.as_deref() {
            Some("Yes") | Some("1") => Some(true),
            Some("No") | Some("0") => Some(false),
            _ => None,
        }
    }

    /// The public export leaves `TotalCharges` blank for customers with zero tenure; those are
    /// read as 0.0.
    fn into_record(self) -> Result<CustomerRecord, String> {
        let total_charges = match self.total_charges.as_deref() {
            None => 0.0,
            Some(raw) => raw
                .parse::<f64>()
                .map_err(|_| format!("TotalCharges {raw:?} is not a number"))?,
        };

        Ok(CustomerRecord {
            gender: self.gender,
            senior_citizen: SeniorCitizen::from_cell(&self.senior_citizen),
            partner: self.partner,
            dependents: self.dependents,
            tenure: self.tenure,
            phone_service: self.phone_service,
            multiple_lines: self.multiple_lines,
            internet_service: self.internet_service,
            online_security: self.online_security,
            online_backup: self.online_backup,
            device_protection: self.device_protection,
            tech_support: self.tech_support,
            streaming_tv: self.streaming_tv,
            streaming_movies: self.streaming_movies,
            contract: self.contract,
            paperless_billing: self.paperless_billing,
            payment_method: self.payment_method,
            monthly_charges: self.monthly_charges,
            total_charges,
        })
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.and_then(|raw| {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }))
}
