// In: src/source.rs

//! The input side of the engine: an updating dataframe supplies named typed
//! columns, any of which may be absent. An absent column means "leave the
//! corresponding item property unchanged"; nothing is intrinsically
//! mandatory except whatever identity column(s) the resolver needs.

use hashbrown::HashMap;

use crate::error::MarshalError;
use crate::types::{SeriesDataType, SeriesMetadata};

//==================================================================================
// I. The Updating Dataframe Trait
//==================================================================================

/// Columnar input for an update operation.
///
/// Implementations are supplied by the caller per call and are not expected
/// to be thread-safe. The typed accessors return `None` both for columns
/// that were not supplied and for columns supplied under a different type;
/// the declared type lives in `series_metadata()`.
pub trait UpdatingDataframe {
    /// Number of rows every supplied column must have.
    fn row_count(&self) -> usize;

    /// Descriptors of every supplied column, in supply order.
    fn series_metadata(&self) -> Vec<SeriesMetadata>;

    fn get_strings(&self, name: &str) -> Option<&[String]>;
    fn get_ints(&self, name: &str) -> Option<&[i32]>;
    fn get_doubles(&self, name: &str) -> Option<&[f64]>;

    /// Per-row scalar convenience reader over `get_strings`.
    fn get_string_value(&self, name: &str, row: usize) -> Option<&str> {
        self.get_strings(name)
            .and_then(|cells| cells.get(row))
            .map(String::as_str)
    }

    fn get_int_value(&self, name: &str, row: usize) -> Option<i32> {
        self.get_ints(name).and_then(|cells| cells.get(row)).copied()
    }

    fn get_double_value(&self, name: &str, row: usize) -> Option<f64> {
        self.get_doubles(name)
            .and_then(|cells| cells.get(row))
            .copied()
    }
}

//==================================================================================
// II. In-Memory Implementation
//==================================================================================

/// A plain owned-column implementation of [`UpdatingDataframe`].
pub struct InMemoryDataframe {
    row_count: usize,
    metadata: Vec<SeriesMetadata>,
    strings: HashMap<String, Vec<String>>,
    ints: HashMap<String, Vec<i32>>,
    doubles: HashMap<String, Vec<f64>>,
}

impl InMemoryDataframe {
    pub fn new(row_count: usize) -> Self {
        Self {
            row_count,
            metadata: Vec::new(),
            strings: HashMap::new(),
            ints: HashMap::new(),
            doubles: HashMap::new(),
        }
    }

    fn register(&mut self, name: &str, data_type: SeriesDataType, len: usize) -> Result<(), MarshalError> {
        if len != self.row_count {
            return Err(MarshalError::LengthMismatch(self.row_count, len));
        }
        if self.metadata.iter().any(|m| m.name == name) {
            return Err(MarshalError::DuplicateKey(name.to_string()));
        }
        self.metadata.push(SeriesMetadata::attribute(name, data_type));
        Ok(())
    }

    pub fn add_string_column(mut self, name: &str, values: Vec<String>) -> Result<Self, MarshalError> {
        self.register(name, SeriesDataType::String, values.len())?;
        self.strings.insert(name.to_string(), values);
        Ok(self)
    }

    pub fn add_int_column(mut self, name: &str, values: Vec<i32>) -> Result<Self, MarshalError> {
        self.register(name, SeriesDataType::Int, values.len())?;
        self.ints.insert(name.to_string(), values);
        Ok(self)
    }

    pub fn add_double_column(mut self, name: &str, values: Vec<f64>) -> Result<Self, MarshalError> {
        self.register(name, SeriesDataType::Double, values.len())?;
        self.doubles.insert(name.to_string(), values);
        Ok(self)
    }
}

impl UpdatingDataframe for InMemoryDataframe {
    fn row_count(&self) -> usize {
        self.row_count
    }

    fn series_metadata(&self) -> Vec<SeriesMetadata> {
        self.metadata.clone()
    }

    fn get_strings(&self, name: &str) -> Option<&[String]> {
        self.strings.get(name).map(Vec::as_slice)
    }

    fn get_ints(&self, name: &str) -> Option<&[i32]> {
        self.ints.get(name).map(Vec::as_slice)
    }

    fn get_doubles(&self, name: &str) -> Option<&[f64]> {
        self.doubles.get(name).map(Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_and_mistyped_columns_read_as_none() {
        let df = InMemoryDataframe::new(2)
            .add_int_column("count", vec![1, 2])
            .unwrap();
        assert!(df.get_strings("count").is_none());
        assert!(df.get_ints("missing").is_none());
        assert_eq!(df.get_int_value("count", 1), Some(2));
        assert_eq!(df.get_int_value("count", 2), None);
    }

    #[test]
    fn rejects_wrong_length_and_duplicate_columns() {
        let err = InMemoryDataframe::new(3)
            .add_double_column("p", vec![1.0])
            .err().unwrap();
        assert!(matches!(err, MarshalError::LengthMismatch(3, 1)));

        let err = InMemoryDataframe::new(1)
            .add_int_column("x", vec![1])
            .unwrap()
            .add_double_column("x", vec![2.0])
            .err().unwrap();
        assert!(matches!(err, MarshalError::DuplicateKey(_)));
    }
}
