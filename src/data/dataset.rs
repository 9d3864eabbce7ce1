//! Host-side dataset and instance abstractions.
//!
//! The scoring host owns the data; this crate only reads field values by
//! index. [`Instance`] is the per-event view used both for scoring and for
//! streaming training rows, and [`Dataset`] couples a schema with a
//! single-pass row iterator. [`VecDataset`] is the in-memory implementation
//! used by tests, benches and small training jobs.

use crate::data::schema::DatasetSchema;

/// One field-indexed event.
///
/// Categorical fields are represented by their numeric code (see
/// [`ValueSchema::code_of`](crate::data::schema::ValueSchema::code_of));
/// missing numeric values are `f64::NAN`.
pub trait Instance {
    /// Raw numeric value of the field at `field_index`.
    fn value(&self, field_index: usize) -> f64;
}

impl Instance for [f64] {
    #[inline]
    fn value(&self, field_index: usize) -> f64 {
        self[field_index]
    }
}

impl Instance for Vec<f64> {
    #[inline]
    fn value(&self, field_index: usize) -> f64 {
        self[field_index]
    }
}

/// A schema plus a single-pass stream of instances.
///
/// The row iterator may be consumed exactly once per training call; its size
/// is not known up front.
pub trait Dataset {
    /// Schema describing every instance of this dataset.
    fn schema(&self) -> &DatasetSchema;

    /// Iterate over the instances.
    fn instances(&self) -> Box<dyn Iterator<Item = &dyn Instance> + '_>;
}

/// In-memory dataset backed by row vectors.
///
/// Each row holds one value per schema field, target included.
pub struct VecDataset {
    schema: DatasetSchema,
    rows: Vec<Vec<f64>>,
}

impl VecDataset {
    /// Create a dataset from full rows (one value per schema field).
    ///
    /// # Panics
    ///
    /// Panics if any row length differs from the schema's field count.
    pub fn new(schema: DatasetSchema, rows: Vec<Vec<f64>>) -> Self {
        for (i, row) in rows.iter().enumerate() {
            assert_eq!(
                row.len(),
                schema.n_fields(),
                "row {i} has {} values, schema has {} fields",
                row.len(),
                schema.n_fields()
            );
        }
        Self { schema, rows }
    }

    /// Number of rows.
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    /// Row access for assertions in tests.
    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }
}

impl Dataset for VecDataset {
    fn schema(&self) -> &DatasetSchema {
        &self.schema
    }

    fn instances(&self) -> Box<dyn Iterator<Item = &dyn Instance> + '_> {
        Box::new(self.rows.iter().map(|row| row as &dyn Instance))
    }
}
