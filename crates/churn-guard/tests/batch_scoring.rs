use std::path::PathBuf;

use churn_guard::scoring::batch::{score_path, write_outcomes};
use churn_guard::scoring::{ChurnScoringService, FileArtifactStore, RiskTier, TierCounts};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn service() -> ChurnScoringService<FileArtifactStore> {
    ChurnScoringService::new(
        FileArtifactStore::new(fixture("model.json")).with_scaler(fixture("scaler.json"), true),
    )
}

#[test]
fn scores_the_customer_export() {
    let report = score_path(&service(), fixture("customers.csv")).expect("batch scores");
    let summary = &report.summary;

    assert_eq!(summary.rows, 8);
    assert_eq!(summary.scored, 8);
    assert_eq!(summary.rejected, 0);
    assert_eq!(
        summary.tiers,
        TierCounts {
            low: 4,
            medium: 2,
            high: 2,
        }
    );
    assert_eq!(summary.labelled, 8);
    assert_eq!(summary.accuracy, Some(0.875));

    let churned = report
        .outcomes
        .iter()
        .find(|outcome| outcome.customer_id.as_deref() == Some("9305-CDSKC"))
        .and_then(|outcome| outcome.result.as_ref())
        .expect("fiber customer scored");
    assert_eq!(churned.risk_tier, RiskTier::High);
}

#[test]
fn outcomes_round_out_to_csv() {
    let report = score_path(&service(), fixture("customers.csv")).expect("batch scores");

    let mut buffer = Vec::new();
    write_outcomes(&report.outcomes, &mut buffer).expect("csv written");

    let mut reader = csv::Reader::from_reader(buffer.as_slice());
    let tiers: Vec<String> = reader
        .records()
        .map(|record| record.expect("valid row")[4].to_string())
        .collect();
    assert_eq!(
        tiers,
        vec!["medium", "low", "low", "low", "medium", "high", "low", "high"]
    );
}

#[test]
fn missing_input_file_is_an_io_error() {
    let err = score_path(&service(), fixture("absent.csv")).expect_err("file missing");
    assert!(err.to_string().contains("failed to read batch input"));
}
