//! This file is the root of the `columnar_marshal` Rust crate.
//!
//! The crate is a generic columnar data-marshaling engine: it converts
//! collections of arbitrary domain objects into named, typed columns, and
//! converts tabular input back into in-place mutations of those objects.
//! The domain objects themselves, the engines producing them, and the host
//! runtime consuming the columns are all external collaborators; this crate
//! only owns the mapping machinery and the column layouts.

//==================================================================================
// 0. Constants
//==================================================================================
/// The crate version, automatically set from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//==================================================================================
// 1. Module Declarations
//==================================================================================
pub mod builder;
pub mod error;
pub mod handler;
pub mod logging;
pub mod mapper;
pub mod series;
pub mod source;
pub mod types;

//==================================================================================
// 2. Public Re-exports
//==================================================================================
pub use builder::DataframeMapperBuilder;
pub use error::MarshalError;
pub use handler::{
    ColumnsHandler, DataframeHandler, NativeDataframe, NativeHandler, NativeSeries, NativeSlice,
    Series, SeriesValues, SeriesWriter,
};
pub use mapper::{AttributeFilter, DataframeMapper, ItemResolver};
pub use series::SeriesMapper;
pub use source::{InMemoryDataframe, UpdatingDataframe};
pub use types::{SeriesDataType, SeriesMetadata};
