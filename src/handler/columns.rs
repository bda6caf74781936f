// In: src/handler/columns.rs

//! The in-process sink: each column is backed by an owned, appropriately
//! typed contiguous `Vec`, and the finished dataframe is a list of immutable
//! named [`Series`] values in selection order.

use crate::error::MarshalError;
use crate::types::SeriesDataType;

use super::{DataframeHandler, SeriesWriter};

//==================================================================================
// I. The Finished Column Value
//==================================================================================

/// The tagged union over the per-type backing vectors of one column.
#[derive(Debug, Clone, PartialEq)]
pub enum SeriesValues {
    Strings(Vec<String>),
    Doubles(Vec<f64>),
    Ints(Vec<i32>),
    OptionalInts(Vec<Option<i32>>),
    Booleans(Vec<bool>),
}

impl SeriesValues {
    pub fn data_type(&self) -> SeriesDataType {
        match self {
            Self::Strings(_) => SeriesDataType::String,
            Self::Doubles(_) => SeriesDataType::Double,
            Self::Ints(_) | Self::OptionalInts(_) => SeriesDataType::Int,
            Self::Booleans(_) => SeriesDataType::Boolean,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Strings(v) => v.len(),
            Self::Doubles(v) => v.len(),
            Self::Ints(v) => v.len(),
            Self::OptionalInts(v) => v.len(),
            Self::Booleans(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One finished, immutable named column.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub name: String,
    pub is_index: bool,
    pub values: SeriesValues,
}

impl Series {
    fn mismatch(&self, requested: &str) -> MarshalError {
        MarshalError::TypeMismatch(format!(
            "series '{}' holds {} data, not {}",
            self.name,
            self.values.data_type(),
            requested
        ))
    }

    pub fn strings(&self) -> Result<&[String], MarshalError> {
        match &self.values {
            SeriesValues::Strings(v) => Ok(v),
            _ => Err(self.mismatch("string")),
        }
    }

    pub fn doubles(&self) -> Result<&[f64], MarshalError> {
        match &self.values {
            SeriesValues::Doubles(v) => Ok(v),
            _ => Err(self.mismatch("double")),
        }
    }

    pub fn ints(&self) -> Result<&[i32], MarshalError> {
        match &self.values {
            SeriesValues::Ints(v) => Ok(v),
            _ => Err(self.mismatch("int")),
        }
    }

    pub fn optional_ints(&self) -> Result<&[Option<i32>], MarshalError> {
        match &self.values {
            SeriesValues::OptionalInts(v) => Ok(v),
            _ => Err(self.mismatch("optional int")),
        }
    }

    pub fn booleans(&self) -> Result<&[bool], MarshalError> {
        match &self.values {
            SeriesValues::Booleans(v) => Ok(v),
            _ => Err(self.mismatch("boolean")),
        }
    }
}

//==================================================================================
// II. The Sink
//==================================================================================

/// Vec-backed [`DataframeHandler`]. Single-use: fill it once, then take the
/// finished columns with [`ColumnsHandler::into_series`].
#[derive(Default)]
pub struct ColumnsHandler {
    series: Vec<Series>,
}

impl ColumnsHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// The finished columns, in the order the mapper wrote them.
    pub fn into_series(self) -> Vec<Series> {
        self.series
    }
}

struct VecWriter<'a, V> {
    name: &'a str,
    cells: &'a mut Vec<V>,
}

impl<V> SeriesWriter<V> for VecWriter<'_, V> {
    fn set(&mut self, row: usize, value: V) -> Result<(), MarshalError> {
        let size = self.cells.len();
        match self.cells.get_mut(row) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(MarshalError::InternalError(format!(
                "write at row {row} past the end of series '{}' ({size} rows)",
                self.name
            ))),
        }
    }
}

/// Generates one vec-backed writer factory: push a pre-sized column, then
/// hand back a writer over its cells.
macro_rules! vec_backed_factory {
    ($fn_name:ident, $variant:ident, $value_ty:ty, $fill:expr, $is_index:expr) => {
        fn $fn_name(
            &mut self,
            name: &str,
            size: usize,
        ) -> Result<Box<dyn SeriesWriter<$value_ty> + '_>, MarshalError> {
            self.series.push(Series {
                name: name.to_string(),
                is_index: $is_index,
                values: SeriesValues::$variant(vec![$fill; size]),
            });
            let Some(Series {
                name,
                values: SeriesValues::$variant(cells),
                ..
            }) = self.series.last_mut()
            else {
                return Err(MarshalError::InternalError(
                    "freshly pushed series is missing".to_string(),
                ));
            };
            Ok(Box::new(VecWriter { name, cells }))
        }
    };
}

impl DataframeHandler for ColumnsHandler {
    fn allocate(&mut self, series_count: usize) {
        self.series.reserve(series_count);
    }

    vec_backed_factory!(new_string_series, Strings, String, String::new(), false);
    vec_backed_factory!(new_string_index, Strings, String, String::new(), true);
    vec_backed_factory!(new_int_series, Ints, i32, 0, false);
    vec_backed_factory!(new_int_index, Ints, i32, 0, true);
    vec_backed_factory!(new_double_series, Doubles, f64, 0.0, false);
    vec_backed_factory!(new_double_index, Doubles, f64, 0.0, true);
    vec_backed_factory!(new_boolean_series, Booleans, bool, false, false);
    vec_backed_factory!(new_optional_int_series, OptionalInts, Option<i32>, None, false);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_and_finishes_in_write_order() {
        let mut handler = ColumnsHandler::new();
        handler.allocate(2);
        {
            let mut w = handler.new_string_index("id", 2).unwrap();
            w.set(0, "a".to_string()).unwrap();
            w.set(1, "b".to_string()).unwrap();
        }
        {
            let mut w = handler.new_double_series("p", 2).unwrap();
            w.set(0, 1.5).unwrap();
            w.set(1, 2.5).unwrap();
        }

        let series = handler.into_series();
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].name, "id");
        assert!(series[0].is_index);
        assert_eq!(series[0].strings().unwrap(), &["a", "b"]);
        assert_eq!(series[1].doubles().unwrap(), &[1.5, 2.5]);
    }

    #[test]
    fn typed_accessor_mismatch_fails() {
        let mut handler = ColumnsHandler::new();
        handler.allocate(1);
        handler.new_int_series("n", 1).unwrap().set(0, 7).unwrap();
        let series = handler.into_series();
        let err = series[0].doubles().unwrap_err();
        assert!(matches!(err, MarshalError::TypeMismatch(_)));
        assert_eq!(series[0].ints().unwrap(), &[7]);
    }

    #[test]
    fn out_of_bounds_write_is_rejected() {
        let mut handler = ColumnsHandler::new();
        handler.allocate(1);
        let mut w = handler.new_boolean_series("b", 1).unwrap();
        assert!(w.set(0, true).is_ok());
        assert!(w.set(1, false).is_err());
    }
}
