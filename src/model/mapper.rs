//! Mapping host instances into the native model's flat feature row.
//!
//! The model binary reports the feature names it was trained with, in the
//! exact order the native library expects them; the schema only tells us
//! where each of those fields lives on an incoming instance. A [`RowMapper`]
//! resolves that once per loaded model: position `j` of the scratch row is
//! read from schema field `schema_index(j)`.
//!
//! Categorical values travel as their numeric codes and are copied through
//! unchanged. A code outside the declared vocabulary is deliberately not
//! rejected: the native library scores unseen categories on its own, and a
//! production scorer must not refuse the event.

use std::collections::HashMap;

use crate::data::{DatasetSchema, Instance};
use crate::error::SchemaError;

#[derive(Debug)]
struct MappedField {
    /// Feature name as stored in the model binary.
    name: String,

    /// Index of the corresponding field on incoming instances.
    schema_index: usize,

    /// Code → label decode table for categorical fields, in the schema's
    /// declared nominal-value order (the order codes were assigned at
    /// training time).
    nominal_values: Option<Vec<String>>,
}

/// Per-model mapping from schema field indices to native feature positions.
pub struct RowMapper {
    fields: Vec<MappedField>,
}

impl RowMapper {
    /// Resolve the model's reported feature names against a schema.
    ///
    /// Schema names are normalized the way the model binary stores them
    /// (spaces become underscores). A model feature absent from the schema is
    /// a schema/model mismatch and fails the build.
    pub fn new(
        schema: &DatasetSchema,
        model_feature_names: &[String],
    ) -> Result<Self, SchemaError> {
        let by_native_name: HashMap<String, usize> = schema
            .predictive_fields()
            .map(|field| (field.native_name(), field.index))
            .collect();

        let fields = model_feature_names
            .iter()
            .map(|name| {
                let schema_index = by_native_name
                    .get(name)
                    .copied()
                    .ok_or_else(|| SchemaError::MissingFeature { name: name.clone() })?;
                let nominal_values = schema.fields()[schema_index]
                    .value
                    .nominal_values()
                    .map(<[String]>::to_vec);
                Ok(MappedField {
                    name: name.clone(),
                    schema_index,
                    nominal_values,
                })
            })
            .collect::<Result<Vec<_>, SchemaError>>()?;

        Ok(Self { fields })
    }

    /// Number of native feature positions.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the model has no features.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Feature names in native model order.
    pub fn feature_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Schema field index feeding native position `position`.
    pub fn schema_index(&self, position: usize) -> usize {
        self.fields[position].schema_index
    }

    /// Decode a categorical code at a native feature position.
    ///
    /// Returns `None` for numeric features and for codes outside the
    /// declared vocabulary (out-of-vocabulary codes are scored as-is).
    pub fn decode(&self, position: usize, code: usize) -> Option<&str> {
        self.fields[position]
            .nominal_values
            .as_deref()?
            .get(code)
            .map(String::as_str)
    }

    /// Copy one instance into the flat native row.
    ///
    /// Values are written in model feature order, read from the instance at
    /// each position's schema index, unchanged.
    ///
    /// # Panics
    ///
    /// Panics if `row` is not exactly [`len`](Self::len) long; the scratch
    /// buffer is allocated from the model's feature count, so a mismatch is a
    /// bug, not an input error.
    pub fn fill_row(&self, instance: &dyn Instance, row: &mut [f64]) {
        assert_eq!(row.len(), self.fields.len(), "scratch row length mismatch");
        for (slot, field) in row.iter_mut().zip(&self.fields) {
            *slot = instance.value(field.schema_index);
        }
    }
}
