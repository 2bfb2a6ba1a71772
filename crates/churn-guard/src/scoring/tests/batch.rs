use super::common::*;
use crate::scoring::batch::{score_reader, write_outcomes, BatchError};
use crate::scoring::risk::RiskTier;
use crate::scoring::service::ScoringError;
use crate::scoring::TierCounts;

#[test]
fn scores_rows_and_summarises_the_batch() {
    let service = build_service();

    let report = score_reader(&*service, BATCH_CSV.as_bytes()).expect("batch scores");
    let summary = &report.summary;

    assert_eq!(summary.rows, 5);
    assert_eq!(summary.scored, 4);
    assert_eq!(summary.rejected, 1);
    assert_eq!(
        summary.tiers,
        TierCounts {
            low: 2,
            medium: 0,
            high: 2,
        }
    );
    assert_eq!(summary.labelled, 4);
    assert_eq!(summary.accuracy, Some(0.75));
    assert!(summary.mean_probability.is_some());

    let first = &report.outcomes[0];
    assert_eq!(first.row, 1);
    assert_eq!(first.customer_id.as_deref(), Some("7590-VHVEG"));
    assert_eq!(first.actual_churn, Some(false));
    let result = first.result.as_ref().expect("first row scored");
    assert_eq!(result.risk_tier, RiskTier::High);
}

#[test]
fn blank_total_charges_are_read_as_zero() {
    let service = build_service();

    let report = score_reader(&*service, BATCH_CSV.as_bytes()).expect("batch scores");
    let zero_tenure = &report.outcomes[3];

    assert_eq!(zero_tenure.customer_id.as_deref(), Some("4472-LVYGI"));
    assert!(zero_tenure.error.is_none());
    let result = zero_tenure.result.as_ref().expect("row scored");
    assert_eq!(result.risk_tier, RiskTier::Low);
}

#[test]
fn invalid_rows_are_reported_and_skipped() {
    let service = build_service();

    let report = score_reader(&*service, BATCH_CSV.as_bytes()).expect("batch scores");
    let rejected = &report.outcomes[4];

    assert!(rejected.result.is_none());
    assert_eq!(rejected.actual_churn, None);
    let error = rejected.error.as_deref().expect("error recorded");
    assert!(error.contains("Weekly"));
}

#[test]
fn undeserializable_rows_do_not_abort_the_batch() {
    let service = build_service();
    let mut lines = BATCH_CSV.lines();
    let header = lines.next().expect("header");
    let valid = lines.next().expect("first row");
    let broken = valid.replacen(",1,No,No phone service", ",one,No,No phone service", 1);
    let input = format!("{header}\n{broken}\n{valid}\n");

    let report = score_reader(&*service, input.as_bytes()).expect("batch scores");

    assert_eq!(report.summary.rows, 2);
    assert_eq!(report.summary.scored, 1);
    assert!(report.outcomes[0].error.is_some());
    assert!(report.outcomes[1].result.is_some());
}

#[test]
fn missing_model_aborts_the_batch() {
    let service = missing_model_service();

    match score_reader(&*service, BATCH_CSV.as_bytes()) {
        Err(BatchError::Scoring(ScoringError::ArtifactNotFound { .. })) => {}
        other => panic!("expected fatal artifact error, got {other:?}"),
    }
}

#[test]
fn empty_input_produces_an_empty_report() {
    let service = build_service();
    let header = BATCH_CSV.lines().next().expect("header");

    let report = score_reader(&*service, header.as_bytes()).expect("batch scores");

    assert_eq!(report.summary.rows, 0);
    assert_eq!(report.summary.mean_probability, None);
    assert_eq!(report.summary.accuracy, None);
}

#[test]
fn writes_one_csv_line_per_outcome() {
    let service = build_service();
    let report = score_reader(&*service, BATCH_CSV.as_bytes()).expect("batch scores");

    let mut buffer = Vec::new();
    write_outcomes(&report.outcomes, &mut buffer).expect("csv written");
    let written = String::from_utf8(buffer).expect("utf8 output");
    let lines: Vec<&str> = written.lines().collect();

    assert_eq!(
        lines[0],
        "customer_id,row,predicted_label,churn_probability,risk_tier,factors,error"
    );
    assert_eq!(lines.len(), 6);
    assert!(lines[1].starts_with("7590-VHVEG,1,1,"));
    assert!(lines[1].contains(",high,"));
    assert!(lines[5].starts_with("9999-BROKE,5,,,,,"));
}

#[test]
fn csv_tiers_match_the_json_encoding() {
    let service = build_service();
    let report = score_reader(&*service, BATCH_CSV.as_bytes()).expect("batch scores");

    let mut buffer = Vec::new();
    write_outcomes(&report.outcomes, &mut buffer).expect("csv written");
    let mut reader = csv::Reader::from_reader(buffer.as_slice());

    for (record, outcome) in reader.records().zip(&report.outcomes) {
        let record = record.expect("valid row");
        let expected = outcome
            .result
            .as_ref()
            .map(|result| serde_json::to_value(result.risk_tier).expect("tier serializes"));
        match expected {
            Some(serde_json::Value::String(tier)) => assert_eq!(&record[4], tier.as_str()),
            _ => assert_eq!(&record[4], ""),
        }
    }
}
