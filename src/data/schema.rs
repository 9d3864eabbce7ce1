//! Dataset schema types and the `model.json` document format.
//!
//! A [`DatasetSchema`] is an ordered list of named fields with contiguous
//! zero-based indices and an optional designated target field. It is owned by
//! the scoring host and only read here; the crate derives per-model lookup
//! tables (name → index, categorical code → label) from it at load time.
//!
//! The JSON wire format matches the schema document persisted next to a model
//! binary: `targetIndex` (negative = no target) and `fieldSchemas`, each with
//! `fieldName`, `fieldIndex` and a `valueSchema` tagged by `@type`.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;

/// Well-known schema document filename inside a model directory.
pub const SCHEMA_FILE_NAME: &str = "model.json";

/// Value domain of a single field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "@type", rename_all = "lowercase")]
pub enum ValueSchema {
    /// Continuous numeric value.
    Numeric {
        #[serde(rename = "allowMissing")]
        allow_missing: bool,
    },

    /// Categorical value stored as a numeric code.
    ///
    /// Codes are assigned `0..n` in the declared order of `nominal_values`;
    /// that order is part of the model contract and must match the order used
    /// when the model was trained.
    Categorical {
        #[serde(rename = "allowMissing")]
        allow_missing: bool,
        #[serde(rename = "nominalValues")]
        nominal_values: Vec<String>,
    },

    /// Free-form string value. Not scorable by this provider; schemas with
    /// string fields are rejected at train time.
    String {
        #[serde(rename = "allowMissing")]
        allow_missing: bool,
    },
}

impl ValueSchema {
    /// Whether missing values are allowed for this field.
    pub fn allow_missing(&self) -> bool {
        match self {
            ValueSchema::Numeric { allow_missing }
            | ValueSchema::Categorical { allow_missing, .. }
            | ValueSchema::String { allow_missing } => *allow_missing,
        }
    }

    /// Returns true for categorical fields.
    pub fn is_categorical(&self) -> bool {
        matches!(self, ValueSchema::Categorical { .. })
    }

    /// Returns true for string fields.
    pub fn is_string(&self) -> bool {
        matches!(self, ValueSchema::String { .. })
    }

    /// Declared nominal values of a categorical field.
    pub fn nominal_values(&self) -> Option<&[String]> {
        match self {
            ValueSchema::Categorical { nominal_values, .. } => Some(nominal_values),
            _ => None,
        }
    }

    /// Numeric code of a nominal value (its position in declared order).
    pub fn code_of(&self, value: &str) -> Option<usize> {
        self.nominal_values()?.iter().position(|v| v == value)
    }

    /// Nominal value for a numeric code.
    ///
    /// Returns `None` for codes outside the declared vocabulary; such codes
    /// are still scorable (the native library treats them as unseen
    /// categories), they just have no label.
    pub fn value_of(&self, code: usize) -> Option<&str> {
        self.nominal_values()?.get(code).map(String::as_str)
    }
}

/// One field of a dataset schema.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldSchema {
    #[serde(rename = "fieldName")]
    pub name: String,

    /// Zero-based position, stable for the schema's lifetime.
    #[serde(rename = "fieldIndex")]
    pub index: usize,

    #[serde(rename = "valueSchema")]
    pub value: ValueSchema,
}

impl FieldSchema {
    /// Field name as the native library stores it in the model binary.
    ///
    /// LightGBM replaces spaces with underscores when persisting feature
    /// names, so every name comparison against the model goes through this.
    pub fn native_name(&self) -> String {
        self.name.replace(' ', "_")
    }
}

/// Ordered field schemas plus an optional designated target field.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(try_from = "RawDatasetSchema", into = "RawDatasetSchema")]
pub struct DatasetSchema {
    target_index: Option<usize>,
    fields: Vec<FieldSchema>,
    name_index: HashMap<String, usize>,
}

impl DatasetSchema {
    /// Build a schema, validating name uniqueness, index contiguity and the
    /// target reference.
    pub fn new(
        target_index: Option<usize>,
        fields: Vec<FieldSchema>,
    ) -> Result<Self, SchemaError> {
        let mut name_index = HashMap::with_capacity(fields.len());
        for (expected, field) in fields.iter().enumerate() {
            if field.index != expected {
                return Err(SchemaError::NonContiguousIndex {
                    name: field.name.clone(),
                    index: field.index,
                    expected,
                });
            }
            if name_index.insert(field.name.clone(), field.index).is_some() {
                return Err(SchemaError::DuplicateFieldName {
                    name: field.name.clone(),
                });
            }
        }
        if let Some(index) = target_index {
            if index >= fields.len() {
                return Err(SchemaError::TargetOutOfRange {
                    index,
                    len: fields.len(),
                });
            }
        }
        Ok(Self {
            target_index,
            fields,
            name_index,
        })
    }

    /// Parse a schema from its JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, SchemaError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a schema document from disk.
    ///
    /// If `path` is a directory, the well-known [`SCHEMA_FILE_NAME`] inside
    /// it is read.
    pub fn from_json_file(path: &Path) -> Result<Self, SchemaError> {
        let file = if path.is_dir() {
            path.join(SCHEMA_FILE_NAME)
        } else {
            path.to_path_buf()
        };
        Self::from_json_str(&fs::read_to_string(file)?)
    }

    /// Number of fields, including the target.
    pub fn n_fields(&self) -> usize {
        self.fields.len()
    }

    /// All fields in index order.
    pub fn fields(&self) -> &[FieldSchema] {
        &self.fields
    }

    /// Index of the designated target field, if any.
    pub fn target_index(&self) -> Option<usize> {
        self.target_index
    }

    /// The designated target field, if any.
    pub fn target_field(&self) -> Option<&FieldSchema> {
        self.target_index.map(|i| &self.fields[i])
    }

    /// All fields except the target, in ascending index order.
    pub fn predictive_fields(&self) -> impl Iterator<Item = &FieldSchema> {
        let target = self.target_index;
        self.fields
            .iter()
            .filter(move |f| Some(f.index) != target)
    }

    /// Number of predictive fields.
    pub fn n_predictive_fields(&self) -> usize {
        self.fields.len() - usize::from(self.target_index.is_some())
    }

    /// Look up a field index by name.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.name_index.get(name).copied()
    }

    /// Whether any field is string-typed.
    pub fn has_string_fields(&self) -> bool {
        self.fields.iter().any(|f| f.value.is_string())
    }
}

/// Serde-facing shape of the schema document.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDatasetSchema {
    /// Negative values mean "no target".
    #[serde(default = "no_target")]
    target_index: i64,
    field_schemas: Vec<FieldSchema>,
}

fn no_target() -> i64 {
    -1
}

impl TryFrom<RawDatasetSchema> for DatasetSchema {
    type Error = SchemaError;

    fn try_from(raw: RawDatasetSchema) -> Result<Self, Self::Error> {
        let target_index = usize::try_from(raw.target_index).ok();
        DatasetSchema::new(target_index, raw.field_schemas)
    }
}

impl From<DatasetSchema> for RawDatasetSchema {
    fn from(schema: DatasetSchema) -> Self {
        RawDatasetSchema {
            target_index: schema.target_index.map_or(-1, |i| i as i64),
            field_schemas: schema.fields,
        }
    }
}
