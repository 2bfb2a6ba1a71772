use serde::Serialize;
use std::fmt;
use std::sync::OnceLock;

/// The nineteen customer attributes recognised by the scoring pipeline, in encoding order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Field {
    #[serde(rename = "gender")]
    Gender,
    SeniorCitizen,
    Partner,
    Dependents,
    #[serde(rename = "tenure")]
    Tenure,
    PhoneService,
    MultipleLines,
    InternetService,
    OnlineSecurity,
    OnlineBackup,
    DeviceProtection,
    TechSupport,
    StreamingTV,
    StreamingMovies,
    Contract,
    PaperlessBilling,
    PaymentMethod,
    MonthlyCharges,
    TotalCharges,
}

impl Field {
    pub const COUNT: usize = 19;

    /// Declared order. This is the feature vector layout the model was trained on and must never
    /// be replaced by a name-sorted order.
    pub const fn ordered() -> [Self; Self::COUNT] {
        [
            Self::Gender,
            Self::SeniorCitizen,
            Self::Partner,
            Self::Dependents,
            Self::Tenure,
            Self::PhoneService,
            Self::MultipleLines,
            Self::InternetService,
            Self::OnlineSecurity,
            Self::OnlineBackup,
            Self::DeviceProtection,
            Self::TechSupport,
            Self::StreamingTV,
            Self::StreamingMovies,
            Self::Contract,
            Self::PaperlessBilling,
            Self::PaymentMethod,
            Self::MonthlyCharges,
            Self::TotalCharges,
        ]
    }

    /// Attribute name as it appears in request payloads, CSV headers and artifacts.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Gender => "gender",
            Self::SeniorCitizen => "SeniorCitizen",
            Self::Partner => "Partner",
            Self::Dependents => "Dependents",
            Self::Tenure => "tenure",
            Self::PhoneService => "PhoneService",
            Self::MultipleLines => "MultipleLines",
            Self::InternetService => "InternetService",
            Self::OnlineSecurity => "OnlineSecurity",
            Self::OnlineBackup => "OnlineBackup",
            Self::DeviceProtection => "DeviceProtection",
            Self::TechSupport => "TechSupport",
            Self::StreamingTV => "StreamingTV",
            Self::StreamingMovies => "StreamingMovies",
            Self::Contract => "Contract",
            Self::PaperlessBilling => "PaperlessBilling",
            Self::PaymentMethod => "PaymentMethod",
            Self::MonthlyCharges => "MonthlyCharges",
            Self::TotalCharges => "TotalCharges",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

const YES_NO: &[&str] = &["Yes", "No"];
const INTERNET_ADDON: &[&str] = &["No", "Yes", "No internet service"];

/// Allowed values for a single attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldDomain {
    /// Finite set of labels, stored sorted lexicographically.
    Categorical(Vec<&'static str>),
    /// Whole number with an inclusive lower bound.
    Integer { min: i64 },
    /// Finite real with an inclusive lower bound.
    Real { min: f64 },
}

impl FieldDomain {
    fn categorical(declared: &[&'static str]) -> Self {
        let mut values = declared.to_vec();
        values.sort_unstable();
        values.dedup();
        Self::Categorical(values)
    }

    /// Zero-based position of `value` within the sorted domain.
    pub fn index_of(&self, value: &str) -> Option<usize> {
        match self {
            Self::Categorical(values) => values.binary_search_by(|probe| (*probe).cmp(value)).ok(),
            Self::Integer { .. } | Self::Real { .. } => None,
        }
    }
}

/// Domain and vector position for one attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaEntry {
    pub field: Field,
    pub position: usize,
    pub domain: FieldDomain,
}

impl SchemaEntry {
    pub fn describe(&self) -> FieldDescription {
        let (kind, values, min) = match &self.domain {
            FieldDomain::Categorical(values) => (
                FieldKind::Categorical,
                Some(values.iter().map(|value| value.to_string()).collect()),
                None,
            ),
            FieldDomain::Integer { min } => (FieldKind::Integer, None, Some(*min as f64)),
            FieldDomain::Real { min } => (FieldKind::Real, None, Some(*min)),
        };

        FieldDescription {
            field: self.field.name(),
            position: self.position,
            kind,
            values,
            min,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Categorical,
    Integer,
    Real,
}

/// Serializable view of a schema entry for the `schema` command and endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDescription {
    pub field: &'static str,
    pub position: usize,
    pub kind: FieldKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
}

/// Process-wide table of attribute domains, indexed by encoding position.
#[derive(Debug)]
pub struct SchemaRegistry {
    entries: Vec<SchemaEntry>,
}

static REGISTRY: OnceLock<SchemaRegistry> = OnceLock::new();

impl SchemaRegistry {
    pub fn global() -> &'static SchemaRegistry {
        REGISTRY.get_or_init(Self::build)
    }

    fn build() -> Self {
        let entries = Field::ordered()
            .into_iter()
            .enumerate()
            .map(|(position, field)| SchemaEntry {
                field,
                position,
                domain: declared_domain(field),
            })
            .collect();

        Self { entries }
    }

    pub fn entries(&self) -> &[SchemaEntry] {
        &self.entries
    }

    pub fn entry(&self, field: Field) -> &SchemaEntry {
        // Entries are built from `Field::ordered`, so the discriminant is the position.
        &self.entries[field as usize]
    }

    pub fn width(&self) -> usize {
        self.entries.len()
    }

    pub fn feature_names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|entry| entry.field.name()).collect()
    }

    pub fn describe(&self) -> Vec<FieldDescription> {
        self.entries.iter().map(SchemaEntry::describe).collect()
    }
}

fn declared_domain(field: Field) -> FieldDomain {
    match field {
        Field::Gender => FieldDomain::categorical(&["Male", "Female"]),
        Field::SeniorCitizen => FieldDomain::categorical(&["No", "Yes"]),
        Field::Partner | Field::Dependents | Field::PhoneService | Field::PaperlessBilling => {
            FieldDomain::categorical(YES_NO)
        }
        Field::Tenure => FieldDomain::Integer { min: 0 },
        Field::MultipleLines => FieldDomain::categorical(&["No", "Yes", "No phone service"]),
        Field::InternetService => FieldDomain::categorical(&["DSL", "Fiber optic", "No"]),
        Field::OnlineSecurity
        | Field::OnlineBackup
        | Field::DeviceProtection
        | Field::TechSupport
        | Field::StreamingTV
        | Field::StreamingMovies => FieldDomain::categorical(INTERNET_ADDON),
        Field::Contract => FieldDomain::categorical(&["Month-to-month", "One year", "Two year"]),
        Field::PaymentMethod => FieldDomain::categorical(&[
            "Electronic check",
            "Mailed check",
            "Bank transfer (automatic)",
            "Credit card (automatic)",
        ]),
        Field::MonthlyCharges | Field::TotalCharges => FieldDomain::Real { min: 0.0 },
    }
}
