use crate::infra::{reference_store, ArtifactArgs};
use clap::Args;
use churn_guard::error::AppError;
use churn_guard::scoring::batch::{score_path, write_outcomes, BatchSummary};
use churn_guard::scoring::{
    ChurnScoringService, CustomerRecord, ScoreResponse, ScoringResult, SchemaRegistry,
    SeniorCitizen,
};
use std::fs::File;
use std::io::{BufWriter, Read};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    /// JSON customer record, or `-` to read stdin
    #[arg(long)]
    pub(crate) record: String,
    /// Print the full response as JSON instead of a summary
    #[arg(long)]
    pub(crate) json: bool,
    #[command(flatten)]
    pub(crate) artifacts: ArtifactArgs,
}

#[derive(Args, Debug)]
pub(crate) struct BatchArgs {
    /// CSV export in the customer dataset layout
    #[arg(long)]
    pub(crate) input: PathBuf,
    /// Where to write one scored line per input row
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
    #[command(flatten)]
    pub(crate) artifacts: ArtifactArgs,
}

pub(crate) fn run_score(args: ScoreArgs) -> Result<(), AppError> {
    let raw = read_record_source(&args.record)?;
    let record: CustomerRecord = serde_json::from_str(&raw)?;

    let service = ChurnScoringService::new(args.artifacts.store()?);
    let result = service.score(&record)?;
    let model = service.model_info()?;

    if args.json {
        let response = ScoreResponse::new(result, model);
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        println!("Model {} ({}, {})", model.name, model.version, model.classifier);
        render_result(&result);
    }
    Ok(())
}

pub(crate) fn run_batch(args: BatchArgs) -> Result<(), AppError> {
    let service = ChurnScoringService::new(args.artifacts.store()?);
    let report = score_path(&service, &args.input)?;

    println!("Batch scoring for {}", args.input.display());
    render_summary(&report.summary);

    for outcome in report.outcomes.iter().filter(|outcome| outcome.error.is_some()) {
        println!(
            "  - row {} ({}): {}",
            outcome.row,
            outcome.customer_id.as_deref().unwrap_or("no id"),
            outcome.error.as_deref().unwrap_or_default()
        );
    }

    if let Some(path) = &args.output {
        let file = File::create(path)?;
        write_outcomes(&report.outcomes, BufWriter::new(file))?;
        println!("Wrote {} rows to {}", report.outcomes.len(), path.display());
    }
    Ok(())
}

pub(crate) fn run_schema() -> Result<(), AppError> {
    let description = SchemaRegistry::global().describe();
    println!("{}", serde_json::to_string_pretty(&description)?);
    Ok(())
}

pub(crate) fn run_demo() -> Result<(), AppError> {
    let service = ChurnScoringService::new(reference_store());
    let model = service.warm_up()?;
    println!(
        "Churn scoring demo (model {} {}, scaled: {})",
        model.name, model.version, model.scaled
    );

    for (label, record) in demo_profiles() {
        println!("\n{label}");
        match service.score(&record) {
            Ok(result) => render_result(&result),
            Err(err) => println!("  Scoring unavailable: {}", err),
        }
    }
    Ok(())
}

fn read_record_source(source: &str) -> Result<String, AppError> {
    if source == "-" {
        let mut raw = String::new();
        std::io::stdin().read_to_string(&mut raw)?;
        Ok(raw)
    } else {
        Ok(std::fs::read_to_string(source)?)
    }
}

fn render_result(result: &ScoringResult) {
    println!(
        "- Prediction: {} | churn probability {:.1}% | {} risk",
        if result.will_churn() { "will churn" } else { "will stay" },
        result.probability * 100.0,
        result.risk_tier
    );
    println!("  Risk factors:");
    for factor in &result.factors {
        println!("    - {}", factor);
    }
    println!("  {}", result.recommendation.headline);
    for action in result.recommendation.actions {
        println!("    - {}: {}", action.title, action.detail);
    }
}

fn render_summary(summary: &BatchSummary) {
    println!(
        "- {} rows | {} scored | {} rejected",
        summary.rows, summary.scored, summary.rejected
    );
    println!(
        "- Tiers: {} high / {} medium / {} low",
        summary.tiers.high, summary.tiers.medium, summary.tiers.low
    );
    if let Some(mean) = summary.mean_probability {
        println!("- Mean churn probability {:.1}%", mean * 100.0);
    }
    if let Some(accuracy) = summary.accuracy {
        println!(
            "- Accuracy against Churn column: {:.1}% over {} labelled rows",
            accuracy * 100.0,
            summary.labelled
        );
    }
}

fn demo_profiles() -> Vec<(&'static str, CustomerRecord)> {
    let new_fiber = CustomerRecord {
        gender: "Female".to_string(),
        senior_citizen: SeniorCitizen::Flag(0),
        partner: "No".to_string(),
        dependents: "No".to_string(),
        tenure: 3,
        phone_service: "Yes".to_string(),
        multiple_lines: "No".to_string(),
        internet_service: "Fiber optic".to_string(),
        online_security: "No".to_string(),
        online_backup: "No".to_string(),
        device_protection: "No".to_string(),
        tech_support: "No".to_string(),
        streaming_tv: "Yes".to_string(),
        streaming_movies: "Yes".to_string(),
        contract: "Month-to-month".to_string(),
        paperless_billing: "Yes".to_string(),
        payment_method: "Electronic check".to_string(),
        monthly_charges: 85.0,
        total_charges: 255.0,
    };

    let new_dsl = CustomerRecord {
        partner: "Yes".to_string(),
        tenure: 1,
        phone_service: "No".to_string(),
        multiple_lines: "No phone service".to_string(),
        internet_service: "DSL".to_string(),
        online_backup: "Yes".to_string(),
        streaming_tv: "No".to_string(),
        streaming_movies: "No".to_string(),
        monthly_charges: 29.85,
        total_charges: 29.85,
        ..new_fiber.clone()
    };

    let long_contract = CustomerRecord {
        gender: "Male".to_string(),
        senior_citizen: SeniorCitizen::Label("Yes".to_string()),
        partner: "Yes".to_string(),
        dependents: "Yes".to_string(),
        tenure: 24,
        multiple_lines: "Yes".to_string(),
        internet_service: "No".to_string(),
        online_security: "No internet service".to_string(),
        online_backup: "No internet service".to_string(),
        device_protection: "No internet service".to_string(),
        tech_support: "No internet service".to_string(),
        streaming_tv: "No internet service".to_string(),
        streaming_movies: "No internet service".to_string(),
        contract: "Two year".to_string(),
        paperless_billing: "No".to_string(),
        payment_method: "Mailed check".to_string(),
        monthly_charges: 50.0,
        total_charges: 1200.0,
        ..new_fiber.clone()
    };

    vec![
        ("Loyal two-year phone customer", long_contract),
        ("New DSL customer on a monthly plan", new_dsl),
        ("New fiber customer paying by electronic check", new_fiber),
    ]
}
