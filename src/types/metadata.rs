//! The immutable per-series descriptor: name, scalar type, and the two
//! flags driving attribute filtering and row identity.

use serde::{Deserialize, Serialize};

use super::SeriesDataType;

/// Describes one named, typed column of a mapper or dataframe.
///
/// Names are unique within a mapper (enforced at build time). `is_index`
/// marks columns used for row identity, not bulk iteration order; an index
/// column is always a default attribute and is never filtered out.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct SeriesMetadata {
    pub name: String,
    pub data_type: SeriesDataType,
    pub is_index: bool,
    pub is_default: bool,
}

impl SeriesMetadata {
    pub fn new(name: &str, data_type: SeriesDataType, is_index: bool, is_default: bool) -> Self {
        Self {
            name: name.to_string(),
            data_type,
            // Index columns always participate, whatever the filter says.
            is_default: is_default || is_index,
            is_index,
        }
    }

    /// Shorthand for an index column descriptor.
    pub fn index(name: &str, data_type: SeriesDataType) -> Self {
        Self::new(name, data_type, true, true)
    }

    /// Shorthand for a plain, non-index column descriptor.
    pub fn attribute(name: &str, data_type: SeriesDataType) -> Self {
        Self::new(name, data_type, false, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_columns_are_always_default() {
        let meta = SeriesMetadata::new("id", SeriesDataType::String, true, false);
        assert!(meta.is_default);
    }

    #[test]
    fn serializes_with_snake_case_fields() {
        let meta = SeriesMetadata::index("id", SeriesDataType::String);
        let json = serde_json::to_string(&meta).unwrap();
        assert!(json.contains("\"data_type\":\"string\""));
        assert!(json.contains("\"is_index\":true"));
    }
}
