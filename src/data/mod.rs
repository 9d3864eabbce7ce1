//! Data handling: schemas, host dataset abstractions and the chunked
//! buffers that stream training data to the native library.

mod chunked;
mod dataset;
mod schema;

pub use chunked::ChunkedArray;
pub use dataset::{Dataset, Instance, VecDataset};
pub use schema::{DatasetSchema, FieldSchema, ValueSchema, SCHEMA_FILE_NAME};
