use tracing::debug;

use super::domain::{CustomerRecord, EncodedFeatureVector, RawValue, SeniorCitizen};
use super::schema::{Field, FieldDomain, SchemaEntry, SchemaRegistry};

/// Raised when a record carries a value outside a field's registered domain.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid value {value:?} for {field}: expected {expected}")]
pub struct ValidationError {
    pub field: Field,
    pub value: String,
    pub expected: String,
}

impl ValidationError {
    fn new(entry: &SchemaEntry, value: impl ToString) -> Self {
        let expected = match &entry.domain {
            FieldDomain::Categorical(values) => format!("one of {values:?}"),
            FieldDomain::Integer { min } => format!("a whole number >= {min}"),
            FieldDomain::Real { min } => format!("a finite number >= {min}"),
        };

        Self {
            field: entry.field,
            value: value.to_string(),
            expected,
        }
    }
}

/// Maps customer records onto the feature layout declared by the [`SchemaRegistry`].
#[derive(Debug, Clone, Copy)]
pub struct FeatureEncoder {
    registry: &'static SchemaRegistry,
}

impl Default for FeatureEncoder {
    fn default() -> Self {
        Self::new(SchemaRegistry::global())
    }
}

impl FeatureEncoder {
    pub fn new(registry: &'static SchemaRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &'static SchemaRegistry {
        self.registry
    }

    /// Encode every field in registry order. Categorical values become their index in the sorted
    /// domain; numeric values pass through once their range is checked.
    pub fn encode(&self, record: &CustomerRecord) -> Result<EncodedFeatureVector, ValidationError> {
        let values = self
            .registry
            .entries()
            .iter()
            .map(|entry| encode_field(entry, record.value(entry.field)))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(width = values.len(), "encoded customer record");
        Ok(EncodedFeatureVector::new(values))
    }
}

fn encode_field(entry: &SchemaEntry, value: RawValue<'_>) -> Result<f64, ValidationError> {
    match (&entry.domain, value) {
        (FieldDomain::Categorical(_), RawValue::Label(label)) => categorical_index(entry, label),
        (FieldDomain::Categorical(_), RawValue::Senior(senior)) => {
            let label = senior_citizen_label(entry, senior)?;
            categorical_index(entry, label)
        }
        (FieldDomain::Integer { min }, RawValue::Integer(number)) if number >= *min => {
            Ok(number as f64)
        }
        (FieldDomain::Real { min }, RawValue::Real(number))
            if number.is_finite() && number >= *min =>
        {
            Ok(number)
        }
        (_, RawValue::Label(label)) => Err(ValidationError::new(entry, label)),
        (_, RawValue::Senior(senior)) => Err(ValidationError::new(entry, senior)),
        (_, RawValue::Integer(number)) => Err(ValidationError::new(entry, number)),
        (_, RawValue::Real(number)) => Err(ValidationError::new(entry, number)),
    }
}

fn categorical_index(entry: &SchemaEntry, label: &str) -> Result<f64, ValidationError> {
    entry
        .domain
        .index_of(label)
        .map(|index| index as f64)
        .ok_or_else(|| ValidationError::new(entry, label))
}

/// Flag `1` is `"Yes"` and flag `0` is `"No"`; labels must already be one of the two.
fn senior_citizen_label<'a>(
    entry: &SchemaEntry,
    senior: &'a SeniorCitizen,
) -> Result<&'a str, ValidationError> {
    match senior {
        SeniorCitizen::Flag(1) => Ok("Yes"),
        SeniorCitizen::Flag(0) => Ok("No"),
        SeniorCitizen::Label(label) if label == "Yes" || label == "No" => Ok(label.as_str()),
        other => Err(ValidationError::new(entry, other)),
    }
}
