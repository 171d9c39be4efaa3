//! Shared helpers: numeric validation and size presentation

pub mod size;
pub mod validation;

pub use size::{compression_ratio, format_file_size};
pub use validation::NumericValidator;
