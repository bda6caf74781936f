//! This module defines the core, strongly-typed data representations used
//! throughout the columnar-marshal engine: the canonical series data type
//! and the per-series metadata descriptor.

mod metadata;
mod series_data_type;

pub use metadata::SeriesMetadata;
pub use series_data_type::SeriesDataType;
