//! This module defines the canonical, type-safe representation of series
//! data types used throughout the marshaling engine.

use crate::error::MarshalError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The canonical representation of a series' scalar type.
///
/// The enum is closed: every column a mapper can produce or consume is one
/// of these four types. Optional integers are `Int` columns with a presence
/// mask at the native boundary; enum-valued columns are `String` columns
/// converting through the case name.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SeriesDataType {
    String,
    Double,
    Int,
    Boolean,
}

impl SeriesDataType {
    /// Converts the type to its stable boundary tag.
    ///
    /// These numbers are part of the cross-boundary contract of the native
    /// flat-buffer layout and must never be renumbered.
    pub fn to_tag(self) -> i32 {
        match self {
            Self::String => 0,
            Self::Double => 1,
            Self::Int => 2,
            Self::Boolean => 3,
        }
    }

    /// Converts a boundary tag back into a `SeriesDataType`.
    pub fn from_tag(tag: i32) -> Result<Self, MarshalError> {
        match tag {
            0 => Ok(Self::String),
            1 => Ok(Self::Double),
            2 => Ok(Self::Int),
            3 => Ok(Self::Boolean),
            t => Err(MarshalError::TypeMismatch(format!(
                "unknown series data type tag: {t}"
            ))),
        }
    }
}

/// Provides the canonical string representation for a `SeriesDataType`.
impl fmt::Display for SeriesDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_are_stable_boundary_numbers() {
        assert_eq!(SeriesDataType::String.to_tag(), 0);
        assert_eq!(SeriesDataType::Double.to_tag(), 1);
        assert_eq!(SeriesDataType::Int.to_tag(), 2);
        assert_eq!(SeriesDataType::Boolean.to_tag(), 3);
    }

    #[test]
    fn tag_round_trip() {
        for dt in [
            SeriesDataType::String,
            SeriesDataType::Double,
            SeriesDataType::Int,
            SeriesDataType::Boolean,
        ] {
            assert_eq!(SeriesDataType::from_tag(dt.to_tag()).unwrap(), dt);
        }
        assert!(SeriesDataType::from_tag(4).is_err());
    }
}
