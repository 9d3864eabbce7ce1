//! Model training: parameter preprocessing, chunked train-data buffers and
//! the train/save/reload orchestration.

pub mod params;
mod train_data;
mod trainer;

pub use params::{ParamMap, DEFAULT_NUM_ITERATIONS, NUM_ITERATIONS_PARAMETER, SOFT_LABEL_PARAMETER};
pub use train_data::TrainData;
pub use trainer::{fit, fit_with_chunk_size, train_to_file, DEFAULT_INSTANCES_PER_CHUNK};
