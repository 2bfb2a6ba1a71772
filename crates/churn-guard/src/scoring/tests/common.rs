use std::sync::{Arc, Mutex};
use std::thread::ThreadId;

use axum::response::Response;
use serde_json::Value;

use crate::scoring::artifacts::{
    ArtifactError, ArtifactStore, Classifier, InMemoryArtifactStore, ModelArtifact, ScalerArtifact,
};
use crate::scoring::domain::{CustomerRecord, SeniorCitizen};
use crate::scoring::schema::Field;
use crate::scoring::service::ChurnScoringService;

/// Month-to-month fiber customer paying by electronic check: trips every risk rule.
pub(super) fn high_risk_record() -> CustomerRecord {
    CustomerRecord {
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
    }
}

pub(super) const HIGH_RISK_VECTOR: [f64; Field::COUNT] = [
    0.0, 0.0, 0.0, 0.0, 3.0, 1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 2.0, 2.0, 0.0, 1.0, 2.0, 85.0,
    255.0,
];

/// Long-contract phone-only customer: no risk rule fires.
pub(super) fn stable_record() -> CustomerRecord {
    CustomerRecord {
        gender: "Male".to_string(),
        senior_citizen: SeniorCitizen::Label("Yes".to_string()),
        partner: "Yes".to_string(),
        dependents: "Yes".to_string(),
        tenure: 24,
        phone_service: "Yes".to_string(),
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
    }
}

pub(super) const STABLE_VECTOR: [f64; Field::COUNT] = [
    1.0, 1.0, 1.0, 1.0, 24.0, 1.0, 2.0, 2.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 2.0, 0.0, 3.0, 50.0,
    1200.0,
];

/// One-year DSL customer that lands in the medium tier under [`tenure_model`].
pub(super) fn medium_risk_record() -> CustomerRecord {
    CustomerRecord {
        internet_service: "DSL".to_string(),
        online_security: "Yes".to_string(),
        contract: "One year".to_string(),
        payment_method: "Credit card (automatic)".to_string(),
        tenure: 10,
        monthly_charges: 70.0,
        total_charges: 700.0,
        ..high_risk_record()
    }
}

/// Logistic regression driven by contract, tenure and monthly charges only.
///
/// logit = 0.5 - 2.0 * contract - 0.05 * tenure + 0.03 * monthly_charges
pub(super) fn tenure_model() -> ModelArtifact {
    let mut coefficients = vec![0.0; Field::COUNT];
    coefficients[Field::Contract as usize] = -2.0;
    coefficients[Field::Tenure as usize] = -0.05;
    coefficients[Field::MonthlyCharges as usize] = 0.03;

    ModelArtifact {
        name: "tenure-logreg".to_string(),
        version: "test".to_string(),
        feature_names: None,
        classifier: Classifier::LogisticRegression {
            coefficients,
            intercept: 0.5,
        },
    }
}

/// All-zero weights: every vector scores exactly 0.5.
pub(super) fn coin_flip_model() -> ModelArtifact {
    ModelArtifact {
        name: "coin-flip".to_string(),
        version: "test".to_string(),
        feature_names: None,
        classifier: Classifier::LogisticRegression {
            coefficients: vec![0.0; Field::COUNT],
            intercept: 0.0,
        },
    }
}

pub(super) fn logistic(logit: f64) -> f64 {
    1.0 / (1.0 + (-logit).exp())
}

pub(super) fn build_service() -> Arc<ChurnScoringService<InMemoryArtifactStore>> {
    Arc::new(ChurnScoringService::new(InMemoryArtifactStore::new(
        tenure_model(),
    )))
}

pub(super) fn missing_model_service() -> Arc<ChurnScoringService<InMemoryArtifactStore>> {
    Arc::new(ChurnScoringService::new(InMemoryArtifactStore::empty()))
}

/// Remembers which thread performed the model load.
pub(super) struct ThreadRecordingStore {
    inner: InMemoryArtifactStore,
    loaded_on: Mutex<Option<ThreadId>>,
}

impl ThreadRecordingStore {
    pub(super) fn new(model: ModelArtifact) -> Self {
        Self {
            inner: InMemoryArtifactStore::new(model),
            loaded_on: Mutex::new(None),
        }
    }

    pub(super) fn loaded_on(&self) -> Option<ThreadId> {
        *self.loaded_on.lock().expect("thread lock poisoned")
    }
}

impl ArtifactStore for ThreadRecordingStore {
    fn load_model(&self) -> Result<ModelArtifact, ArtifactError> {
        *self.loaded_on.lock().expect("thread lock poisoned") = Some(std::thread::current().id());
        self.inner.load_model()
    }

    fn load_scaler(&self) -> Result<Option<ScalerArtifact>, ArtifactError> {
        self.inner.load_scaler()
    }

    fn describe(&self) -> String {
        self.inner.describe()
    }
}

pub(super) async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body readable");
    serde_json::from_slice(&bytes).expect("json body")
}

pub(super) const BATCH_CSV: &str = "\
customerID,gender,SeniorCitizen,Partner,Dependents,tenure,PhoneService,MultipleLines,InternetService,OnlineSecurity,OnlineBackup,DeviceProtection,TechSupport,StreamingTV,StreamingMovies,Contract,PaperlessBilling,PaymentMethod,MonthlyCharges,TotalCharges,Churn
7590-VHVEG,Female,0,Yes,No,1,No,No phone service,DSL,No,Yes,No,No,No,No,Month-to-month,Yes,Electronic check,29.85,29.85,No
5575-GNVDE,Male,0,No,No,34,Yes,No,DSL,Yes,No,Yes,No,No,No,One year,No,Mailed check,56.95,1889.5,No
3668-QPYBK,Male,1,No,No,2,Yes,No,Fiber optic,No,No,No,No,No,No,Month-to-month,Yes,Electronic check,99.65,199.3,Yes
4472-LVYGI,Female,0,Yes,Yes,0,No,No phone service,DSL,Yes,No,Yes,Yes,Yes,No,Two year,Yes,Bank transfer (automatic),52.55, ,No
9999-BROKE,Female,0,Yes,Yes,12,Yes,No,DSL,Yes,No,Yes,Yes,Yes,No,Weekly,Yes,Mailed check,40.00,480.0,
";
