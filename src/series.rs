// In: src/series.rs

//! The series mapper family: one closed sum type binding a column name to
//! a typed extraction closure and an optional update closure over an item.
//!
//! Dispatch on the scalar type happens by matching `SeriesKind` exhaustively
//! once per column, never per row. The context type `C` is a caller-supplied
//! generic threaded through every extract and update call; the engine never
//! inspects it.

use crate::error::MarshalError;
use crate::types::{SeriesDataType, SeriesMetadata};

//==================================================================================
// I. Closure Aliases
//==================================================================================

pub(crate) type ExtractFn<U, C, V> = Box<dyn Fn(&U, &C) -> V + Send + Sync>;

pub(crate) type StringUpdateFn<U, C> =
    Box<dyn Fn(&mut U, &str, &C) -> Result<(), MarshalError> + Send + Sync>;
pub(crate) type IntUpdateFn<U, C> =
    Box<dyn Fn(&mut U, i32, &C) -> Result<(), MarshalError> + Send + Sync>;
pub(crate) type DoubleUpdateFn<U, C> =
    Box<dyn Fn(&mut U, f64, &C) -> Result<(), MarshalError> + Send + Sync>;
pub(crate) type BoolUpdateFn<U, C> =
    Box<dyn Fn(&mut U, bool, &C) -> Result<(), MarshalError> + Send + Sync>;

//==================================================================================
// II. The Series Kind Sum Type
//==================================================================================

/// The closed set of series variants, each carrying its typed capability pair.
///
/// An `update` of `None` marks the series read-only. `OptionalInt` extracts
/// `Option<i32>` ("no value" is distinct from every valid integer) but is
/// updated through a plain `i32`, matching the dual data+mask native layout.
pub(crate) enum SeriesKind<U, C> {
    String {
        extract: ExtractFn<U, C, String>,
        update: Option<StringUpdateFn<U, C>>,
    },
    Int {
        extract: ExtractFn<U, C, i32>,
        update: Option<IntUpdateFn<U, C>>,
    },
    OptionalInt {
        extract: ExtractFn<U, C, Option<i32>>,
        update: Option<IntUpdateFn<U, C>>,
    },
    Double {
        extract: ExtractFn<U, C, f64>,
        update: Option<DoubleUpdateFn<U, C>>,
    },
    Boolean {
        extract: ExtractFn<U, C, bool>,
        update: Option<BoolUpdateFn<U, C>>,
    },
}

impl<U, C> SeriesKind<U, C> {
    pub(crate) fn data_type(&self) -> SeriesDataType {
        match self {
            Self::String { .. } => SeriesDataType::String,
            Self::Int { .. } | Self::OptionalInt { .. } => SeriesDataType::Int,
            Self::Double { .. } => SeriesDataType::Double,
            Self::Boolean { .. } => SeriesDataType::Boolean,
        }
    }
}

//==================================================================================
// III. The Series Mapper
//==================================================================================

/// One named, typed column mapping over items of type `U` with context `C`.
pub struct SeriesMapper<U, C> {
    metadata: SeriesMetadata,
    pub(crate) kind: SeriesKind<U, C>,
}

impl<U, C> SeriesMapper<U, C> {
    pub fn metadata(&self) -> &SeriesMetadata {
        &self.metadata
    }

    pub(crate) fn new(name: &str, is_index: bool, is_default: bool, kind: SeriesKind<U, C>) -> Self {
        Self {
            metadata: SeriesMetadata::new(name, kind.data_type(), is_index, is_default),
            kind,
        }
    }

    /// Demotes the series to a non-default attribute. Index columns keep
    /// their always-selected status.
    pub(crate) fn mark_non_default(&mut self) {
        if !self.metadata.is_index {
            self.metadata.is_default = false;
        }
    }
}
