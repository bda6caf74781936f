// In: src/handler/mod.rs

// ====================================================================================
// ARCHITECTURAL OVERVIEW: The Handler Layer
// ====================================================================================
//
// The handler is the destination abstraction of the creation path. The mapper
// drives every handler through one single-pass write protocol:
//
//   1. [Mapper]  -> allocate(selected_series_count)
//         |
//   2.    `-> for each selected series, in registration order:
//         |
//         |      new_<type>_series / new_<type>_index (name, row_count)
//         |            -> returns a typed writer borrowing the handler
//         |
//         `----> writer.set(row, value) for every row, then the writer drops
//
// The protocol is sequential by design, not an arbitrary random-access API:
// the native sink advances a write cursor across these calls and rejects any
// other order. A handler instance is single-use and not thread-safe.
//
// ====================================================================================

pub mod columns;
pub mod native;

pub use columns::{ColumnsHandler, Series, SeriesValues};
pub use native::{NativeDataframe, NativeHandler, NativeSeries, NativeSlice};

use crate::error::MarshalError;

/// A typed writer for one column, valid for exactly one fill pass.
pub trait SeriesWriter<V> {
    fn set(&mut self, row: usize, value: V) -> Result<(), MarshalError>;
}

/// The output sink driven by the mapper during dataframe creation.
pub trait DataframeHandler {
    /// Announces how many series the mapper is about to write, letting the
    /// sink pre-size whatever backing storage it needs.
    fn allocate(&mut self, series_count: usize);

    fn new_string_series(
        &mut self,
        name: &str,
        size: usize,
    ) -> Result<Box<dyn SeriesWriter<String> + '_>, MarshalError>;

    fn new_string_index(
        &mut self,
        name: &str,
        size: usize,
    ) -> Result<Box<dyn SeriesWriter<String> + '_>, MarshalError>;

    fn new_int_series(
        &mut self,
        name: &str,
        size: usize,
    ) -> Result<Box<dyn SeriesWriter<i32> + '_>, MarshalError>;

    fn new_int_index(
        &mut self,
        name: &str,
        size: usize,
    ) -> Result<Box<dyn SeriesWriter<i32> + '_>, MarshalError>;

    fn new_double_series(
        &mut self,
        name: &str,
        size: usize,
    ) -> Result<Box<dyn SeriesWriter<f64> + '_>, MarshalError>;

    fn new_double_index(
        &mut self,
        name: &str,
        size: usize,
    ) -> Result<Box<dyn SeriesWriter<f64> + '_>, MarshalError>;

    fn new_boolean_series(
        &mut self,
        name: &str,
        size: usize,
    ) -> Result<Box<dyn SeriesWriter<bool> + '_>, MarshalError>;

    /// An int column whose cells may individually be absent. At the native
    /// boundary this becomes the dual data+mask layout.
    fn new_optional_int_series(
        &mut self,
        name: &str,
        size: usize,
    ) -> Result<Box<dyn SeriesWriter<Option<i32>> + '_>, MarshalError>;
}
